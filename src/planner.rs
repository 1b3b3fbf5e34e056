//! # Step Planner
//!
//! Pure, stateless derivations over a snapshot of the step catalog: which
//! steps a ticket's branch traverses, where the branch ends, which steps
//! form a parallel cohort, and ordinal adjacency within the branch.
//!
//! Everything here is a plain function of its arguments so the state
//! machine (and tests) can reason about progression without touching
//! storage. Callers hand in a freshly fetched catalog per operation; a
//! gapped or empty catalog is a configuration-management defect and is
//! not repaired here.

use crate::models::{StepConfiguration, TicketBranch};

/// Steps the given branch traverses, catalog order preserved.
pub fn applicable_steps(
    catalog: &[StepConfiguration],
    branch: TicketBranch,
) -> Vec<&StepConfiguration> {
    catalog
        .iter()
        .filter(|step| step.applicability.applies_to(branch))
        .collect()
}

/// Highest applicable step number for the branch; the completion
/// threshold. Returns 0 for an empty catalog.
pub fn max_applicable_step(catalog: &[StepConfiguration], branch: TicketBranch) -> i32 {
    applicable_steps(catalog, branch)
        .iter()
        .map(|step| step.step_number)
        .max()
        .unwrap_or(0)
}

/// Where a new ticket of the branch starts. Falls back to step 1 when the
/// catalog has no applicable steps, mirroring ticket creation in the
/// deployed system.
pub fn first_applicable_step(catalog: &[StepConfiguration], branch: TicketBranch) -> i32 {
    applicable_steps(catalog, branch)
        .first()
        .map_or(1, |step| step.step_number)
}

/// Step numbers sharing a parallel group, regardless of branch filter.
/// Cohort membership is branch-independent at this layer; callers apply
/// branch filtering separately where they need it.
pub fn parallel_cohort(catalog: &[StepConfiguration], group: &str) -> Vec<i32> {
    catalog
        .iter()
        .filter(|step| step.cohort_group() == Some(group))
        .map(|step| step.step_number)
        .collect()
}

/// Look up a step by ordinal.
pub fn step_config(catalog: &[StepConfiguration], step_number: i32) -> Option<&StepConfiguration> {
    catalog.iter().find(|step| step.step_number == step_number)
}

/// The applicable step following `step_number` in the branch sequence,
/// by position. `None` when the step is the last applicable one - or not
/// applicable at all - which both drive the Completed transition.
pub fn next_in_sequence(
    catalog: &[StepConfiguration],
    branch: TicketBranch,
    step_number: i32,
) -> Option<i32> {
    let applicable = applicable_steps(catalog, branch);
    let position = applicable
        .iter()
        .position(|step| step.step_number == step_number)?;
    applicable.get(position + 1).map(|step| step.step_number)
}

/// First applicable step with an ordinal strictly greater than
/// `step_number`; how the ticket leaves a completed parallel cohort.
pub fn next_applicable_after(
    catalog: &[StepConfiguration],
    branch: TicketBranch,
    step_number: i32,
) -> Option<i32> {
    applicable_steps(catalog, branch)
        .iter()
        .find(|step| step.step_number > step_number)
        .map(|step| step.step_number)
}

/// The applicable step immediately preceding `current_step`, used by the
/// return-to-previous correction. Falls back to step 1 when the current
/// step is first or absent from the branch sequence.
pub fn previous_applicable_before(
    catalog: &[StepConfiguration],
    branch: TicketBranch,
    current_step: i32,
) -> i32 {
    let applicable = applicable_steps(catalog, branch);
    match applicable
        .iter()
        .position(|step| step.step_number == current_step)
    {
        Some(position) if position > 0 => applicable[position - 1].step_number,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Applicability, EmployeeRole};
    use chrono::Utc;

    fn step(
        number: i32,
        applicability: Applicability,
        parallel_group: Option<&str>,
    ) -> StepConfiguration {
        StepConfiguration {
            id: number,
            step_number: number,
            step_name: format!("Step {number}"),
            description: String::new(),
            required_employee_role: EmployeeRole::Ver,
            applicability,
            is_parallel: parallel_group.is_some(),
            parallel_group: parallel_group.map(str::to_string),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn catalog() -> Vec<StepConfiguration> {
        vec![
            step(1, Applicability::LsOnly, Some("A")),
            step(2, Applicability::LsOnly, Some("A")),
            step(3, Applicability::Both, None),
            step(4, Applicability::NonLsOnly, None),
            step(5, Applicability::Both, None),
        ]
    }

    #[test]
    fn branch_filter_excludes_restricted_steps() {
        let catalog = catalog();
        let ls: Vec<i32> = applicable_steps(&catalog, TicketBranch::Ls)
            .iter()
            .map(|s| s.step_number)
            .collect();
        assert_eq!(ls, vec![1, 2, 3, 5]);

        let non_ls: Vec<i32> = applicable_steps(&catalog, TicketBranch::NonLs)
            .iter()
            .map(|s| s.step_number)
            .collect();
        assert_eq!(non_ls, vec![3, 4, 5]);
    }

    #[test]
    fn max_and_first_step_respect_the_branch() {
        let catalog = catalog();
        assert_eq!(max_applicable_step(&catalog, TicketBranch::Ls), 5);
        assert_eq!(max_applicable_step(&catalog, TicketBranch::NonLs), 5);
        assert_eq!(first_applicable_step(&catalog, TicketBranch::Ls), 1);
        assert_eq!(first_applicable_step(&catalog, TicketBranch::NonLs), 3);
    }

    #[test]
    fn empty_catalog_falls_back_to_step_one() {
        assert_eq!(first_applicable_step(&[], TicketBranch::Ls), 1);
        assert_eq!(max_applicable_step(&[], TicketBranch::Ls), 0);
    }

    #[test]
    fn cohort_membership_ignores_branch_filter() {
        let catalog = catalog();
        assert_eq!(parallel_cohort(&catalog, "A"), vec![1, 2]);
        assert_eq!(parallel_cohort(&catalog, "B"), Vec::<i32>::new());
    }

    #[test]
    fn sequence_adjacency_skips_inapplicable_steps() {
        let catalog = catalog();
        // Non-LS: 3 -> 4 -> 5
        assert_eq!(next_in_sequence(&catalog, TicketBranch::NonLs, 3), Some(4));
        // LS: step 4 does not exist, 3 -> 5
        assert_eq!(next_in_sequence(&catalog, TicketBranch::Ls, 3), Some(5));
        // Last applicable step has no successor
        assert_eq!(next_in_sequence(&catalog, TicketBranch::Ls, 5), None);
        // Step absent from the branch sequence has no successor either
        assert_eq!(next_in_sequence(&catalog, TicketBranch::Ls, 4), None);
    }

    #[test]
    fn next_after_cohort_is_ordinal_not_positional() {
        let catalog = catalog();
        assert_eq!(next_applicable_after(&catalog, TicketBranch::Ls, 2), Some(3));
        assert_eq!(next_applicable_after(&catalog, TicketBranch::NonLs, 2), Some(3));
        assert_eq!(next_applicable_after(&catalog, TicketBranch::Ls, 5), None);
    }

    #[test]
    fn previous_step_falls_back_to_one() {
        let catalog = catalog();
        assert_eq!(previous_applicable_before(&catalog, TicketBranch::Ls, 5), 3);
        assert_eq!(previous_applicable_before(&catalog, TicketBranch::NonLs, 4), 3);
        // First applicable step and unknown steps both fall back to 1
        assert_eq!(previous_applicable_before(&catalog, TicketBranch::Ls, 1), 1);
        assert_eq!(previous_applicable_before(&catalog, TicketBranch::Ls, 99), 1);
        // Non-LS: step 3 is first applicable
        assert_eq!(previous_applicable_before(&catalog, TicketBranch::NonLs, 3), 1);
    }
}
