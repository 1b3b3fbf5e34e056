//! Integration tests for the workflow service over the in-memory
//! repository: ticket lifecycle, authorization, idempotency, parallel
//! cohorts, corrections, and the read models.

mod common;

use common::{admin, employee, services_with_catalog, services_with_default_catalog, target};

use perdin_core::models::{EmployeeRole, TicketFilter};
use perdin_core::orchestration::{CreateTicketRequest, ProcessStepRequest};
use perdin_core::state_machine::{TicketState, WorkflowError};
use perdin_core::{FileReference, VarianceStatus};

fn create_request(is_ls: bool) -> CreateTicketRequest {
    CreateTicketRequest {
        activity_name: "Perjalanan Dinas Monitoring".to_string(),
        assignment_letter_number: "ST/001/2026".to_string(),
        uraian: None,
        start_date: None,
        is_ls,
        assigned_executor_id_1: None,
        assigned_executor_id_2: None,
    }
}

#[tokio::test]
async fn three_step_ticket_walks_to_completion() {
    let (workflow, _) = services_with_catalog(common::three_step_catalog()).await;
    let admin = admin();
    let ver = employee("Kusmono", EmployeeRole::Ver);
    let pprbpd = employee("Ilham", EmployeeRole::Pprbpd);
    let ok = employee("Mami", EmployeeRole::Ok);

    let ticket = workflow.create_ticket(&admin, create_request(false)).await.unwrap();
    assert_eq!(ticket.current_step, 1);
    assert_eq!(ticket.status, TicketState::Pending);

    // Step 1 by its role
    let updated = workflow
        .process_step(&ver, ticket.id, ProcessStepRequest::default())
        .await
        .unwrap();
    assert_eq!(updated.histories.len(), 1);
    assert_eq!(updated.histories[0].step_number, 1);
    assert_eq!(updated.ticket.current_step, 2);
    assert_eq!(updated.ticket.status, TicketState::InProgress);

    // Wrong role targeting an already-passed step: unauthorized, no row
    let err = workflow.process_step(&ok, ticket.id, target(1)).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Unauthorized { .. }));
    let unchanged = workflow.get_ticket(ticket.id).await.unwrap();
    assert_eq!(unchanged.histories.len(), 1);

    // Steps 2 and 3
    let updated = workflow
        .process_step(&pprbpd, ticket.id, ProcessStepRequest::default())
        .await
        .unwrap();
    assert_eq!(updated.ticket.current_step, 3);
    assert_eq!(updated.ticket.status, TicketState::InProgress);

    let updated = workflow
        .process_step(&ok, ticket.id, ProcessStepRequest::default())
        .await
        .unwrap();
    assert_eq!(updated.ticket.current_step, 4); // max + 1 sentinel
    assert_eq!(updated.ticket.status, TicketState::Completed);

    // Terminal: everything is rejected now
    let err = workflow
        .process_step(&ver, ticket.id, target(1))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AlreadyCompleted { .. }));
}

#[tokio::test]
async fn reprocessing_a_step_is_rejected_and_leaves_history_unchanged() {
    let (workflow, _) = services_with_catalog(common::three_step_catalog()).await;
    let ver = employee("Kusmono", EmployeeRole::Ver);

    let ticket = workflow.create_ticket(&admin(), create_request(false)).await.unwrap();
    workflow
        .process_step(&ver, ticket.id, ProcessStepRequest::default())
        .await
        .unwrap();

    let err = workflow.process_step(&ver, ticket.id, target(1)).await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::AlreadyProcessed { step_number: 1, .. }
    ));

    let after = workflow.get_ticket(ticket.id).await.unwrap();
    assert_eq!(after.histories.len(), 1);
    assert_eq!(after.ticket.current_step, 2);
}

#[tokio::test]
async fn parallel_cohort_gates_advancement_until_all_members_processed() {
    let (workflow, _) = services_with_default_catalog().await;
    let ver = employee("Kusmono", EmployeeRole::Ver);
    let pprbpd = employee("Ilham", EmployeeRole::Pprbpd);
    let komitmen = employee("Mami", EmployeeRole::Ok);

    let ticket = workflow.create_ticket(&admin(), create_request(true)).await.unwrap();
    assert_eq!(ticket.current_step, 1);

    // One cohort member alone does not advance the pointer
    let updated = workflow.process_step(&pprbpd, ticket.id, target(2)).await.unwrap();
    assert_eq!(updated.ticket.current_step, 1);
    assert_eq!(updated.ticket.status, TicketState::InProgress);

    let updated = workflow.process_step(&komitmen, ticket.id, target(3)).await.unwrap();
    assert_eq!(updated.ticket.current_step, 1);

    // The last member advances past the cohort max to step 4
    let updated = workflow.process_step(&ver, ticket.id, target(1)).await.unwrap();
    assert_eq!(updated.ticket.current_step, 4);
    assert_eq!(updated.ticket.status, TicketState::InProgress);
    assert_eq!(updated.histories.len(), 3);
}

#[tokio::test]
async fn non_ls_ticket_starts_past_the_ls_only_prefix() {
    let (workflow, _) = services_with_default_catalog().await;

    let ticket = workflow.create_ticket(&admin(), create_request(false)).await.unwrap();
    // Steps 1-5 are LS-only; the Non-LS branch begins at 6
    assert_eq!(ticket.current_step, 6);
    assert_eq!(ticket.status, TicketState::Pending);
}

#[tokio::test]
async fn non_ls_progression_skips_the_ls_only_refund_step() {
    let (workflow, _) = services_with_default_catalog().await;
    let ppk = employee("Asbari", EmployeeRole::Ppk);
    let ppd = employee("-", EmployeeRole::Ppd);

    let ticket = workflow.create_ticket(&admin(), create_request(false)).await.unwrap();

    // Fast-forward to step 11 with admin skips
    let admin = admin();
    for _ in 0..5 {
        workflow.admin_skip_step(&admin, ticket.id, None).await.unwrap();
    }
    let state = workflow.get_ticket(ticket.id).await.unwrap();
    assert_eq!(state.ticket.current_step, 11);

    workflow
        .process_step(&ppk, ticket.id, ProcessStepRequest::default())
        .await
        .unwrap();
    let updated = workflow
        .process_step(&ppd, ticket.id, ProcessStepRequest::default())
        .await
        .unwrap();
    // Step 13 is LS-only; Non-LS jumps from 12 straight to 14
    assert_eq!(updated.ticket.current_step, 14);
}

#[tokio::test]
async fn variance_notes_are_recorded_on_the_review_step() {
    let (workflow, _) = services_with_default_catalog().await;
    let ver = employee("Kusmono", EmployeeRole::Ver);
    let pprbpd = employee("Ilham", EmployeeRole::Pprbpd);
    let komitmen = employee("Mami", EmployeeRole::Ok);
    let ospm = employee("Operator SPM User", EmployeeRole::Ospm);
    let op = employee("-", EmployeeRole::Op);

    let ticket = workflow.create_ticket(&admin(), create_request(true)).await.unwrap();
    for (actor, step) in [(&ver, 1), (&pprbpd, 2), (&komitmen, 3)] {
        workflow.process_step(actor, ticket.id, target(step)).await.unwrap();
    }
    workflow.process_step(&ospm, ticket.id, ProcessStepRequest::default()).await.unwrap();
    workflow.process_step(&op, ticket.id, ProcessStepRequest::default()).await.unwrap();

    let updated = workflow
        .process_step(
            &ver,
            ticket.id,
            ProcessStepRequest {
                target_step: None,
                file: None,
                notes: Some(VarianceStatus::Lebih.tag_notes(Some("ada pengembalian"))),
            },
        )
        .await
        .unwrap();

    let review_row = updated.histories.iter().find(|h| h.step_number == 6).unwrap();
    let notes = review_row.notes.as_deref().unwrap();
    assert_eq!(notes, "[Selisih Lebih] ada pengembalian");
    assert_eq!(VarianceStatus::parse_notes(notes), Some(VarianceStatus::Lebih));
}

#[tokio::test]
async fn return_then_redo_reproduces_the_history_set() {
    let (workflow, _) = services_with_default_catalog().await;
    let ver = employee("Kusmono", EmployeeRole::Ver);
    let pprbpd = employee("Ilham", EmployeeRole::Pprbpd);

    let ticket = workflow.create_ticket(&admin(), create_request(false)).await.unwrap();
    workflow.process_step(&ver, ticket.id, ProcessStepRequest::default()).await.unwrap();
    let before = workflow
        .process_step(&pprbpd, ticket.id, ProcessStepRequest::default())
        .await
        .unwrap();
    assert_eq!(before.ticket.current_step, 8);
    let steps_before: Vec<i32> = before.histories.iter().map(|h| h.step_number).collect();

    // Return from 8 to 7: the step-7 row is retracted, a correction
    // marker appears in its place
    let returned = workflow
        .return_to_previous_step(&ver, ticket.id, "rincian biaya salah")
        .await
        .unwrap();
    assert_eq!(returned.ticket.current_step, 7);
    assert_eq!(returned.ticket.status, TicketState::InProgress);
    let marker = returned.histories.iter().find(|h| h.step_number == 7).unwrap();
    assert_eq!(
        marker.notes.as_deref(),
        Some("[DIKEMBALIKAN DARI STEP 8] rincian biaya salah")
    );

    // Redo step 7: the marker is consumed by the real record
    let redone = workflow
        .process_step(&pprbpd, ticket.id, ProcessStepRequest::default())
        .await
        .unwrap();
    assert_eq!(redone.ticket.current_step, 8);
    let redo_row = redone.histories.iter().find(|h| h.step_number == 7).unwrap();
    assert!(redo_row.notes.is_none());

    // History step set matches the pre-return state
    let steps_after: Vec<i32> = redone.histories.iter().map(|h| h.step_number).collect();
    assert_eq!(steps_after, steps_before);
}

#[tokio::test]
async fn return_requires_a_reason_and_a_step_to_return_to() {
    let (workflow, _) = services_with_default_catalog().await;
    let ver = employee("Kusmono", EmployeeRole::Ver);

    let ls_ticket = workflow.create_ticket(&admin(), create_request(true)).await.unwrap();
    let err = workflow
        .return_to_previous_step(&ver, ls_ticket.id, "alasan")
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::ValidationFailed { .. }));

    let non_ls = workflow.create_ticket(&admin(), create_request(false)).await.unwrap();
    let err = workflow
        .return_to_previous_step(&ver, non_ls.id, "  ")
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::ValidationFailed { .. }));
}

#[tokio::test]
async fn admin_skip_bypasses_roles_and_is_tagged_for_audit() {
    let (workflow, _) = services_with_catalog(common::three_step_catalog()).await;
    let admin = admin();

    let ticket = workflow.create_ticket(&admin, create_request(false)).await.unwrap();
    let updated = workflow.admin_skip_step(&admin, ticket.id, None).await.unwrap();

    assert_eq!(updated.ticket.current_step, 2);
    let row = &updated.histories[0];
    assert_eq!(row.processor_name, "[DEBUG] Admin User");
    assert_eq!(row.notes.as_deref(), Some("[Admin Skip]"));

    // Not available to non-admins
    let err = workflow
        .admin_skip_step(&employee("Kusmono", EmployeeRole::Ver), ticket.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Unauthorized { .. }));
}

#[tokio::test]
async fn ticket_numbers_are_sequential_within_a_year() {
    use chrono::TimeZone;

    let (workflow, _) = services_with_catalog(common::three_step_catalog()).await;
    let admin = admin();

    let date_2025 = chrono::Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap();
    let date_2026 = chrono::Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();

    let mut request = create_request(false);
    request.start_date = Some(date_2025);
    let first = workflow.create_ticket(&admin, request.clone()).await.unwrap();
    assert_eq!(first.ticket_number, "PD-202501");

    let second = workflow.create_ticket(&admin, request.clone()).await.unwrap();
    assert_eq!(second.ticket_number, "PD-202502");

    // A different start-date year starts its own sequence
    request.start_date = Some(date_2026);
    let third = workflow.create_ticket(&admin, request).await.unwrap();
    assert_eq!(third.ticket_number, "PD-202601");
}

#[tokio::test]
async fn signing_step_is_restricted_to_assigned_executors() {
    let (workflow, _) = services_with_default_catalog().await;
    let admin = admin();
    let assigned = employee("Pelaksana A", EmployeeRole::Ppd);
    let other_ppd = employee("Pelaksana B", EmployeeRole::Ppd);

    let mut request = create_request(false);
    request.assigned_executor_id_1 = Some(assigned.id);
    let ticket = workflow.create_ticket(&admin, request).await.unwrap();

    // Fast-forward the Non-LS branch to the signing step (12)
    for _ in 0..6 {
        workflow.admin_skip_step(&admin, ticket.id, None).await.unwrap();
    }
    let state = workflow.get_ticket(ticket.id).await.unwrap();
    assert_eq!(state.ticket.current_step, 12);

    let err = workflow
        .process_step(&other_ppd, ticket.id, ProcessStepRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Unauthorized { .. }));

    let updated = workflow
        .process_step(&assigned, ticket.id, ProcessStepRequest::default())
        .await
        .unwrap();
    assert_eq!(updated.ticket.current_step, 14);
}

#[tokio::test]
async fn actionable_tickets_follow_roles_cohorts_and_assignments() {
    let (workflow, _) = services_with_default_catalog().await;
    let admin = admin();
    let ver = employee("Kusmono", EmployeeRole::Ver);
    let pprbpd = employee("Ilham", EmployeeRole::Pprbpd);
    let ospm = employee("Operator SPM User", EmployeeRole::Ospm);

    let ls = workflow.create_ticket(&admin, create_request(true)).await.unwrap();
    let non_ls = workflow.create_ticket(&admin, create_request(false)).await.unwrap();

    // LS ticket sits in the opening cohort: both Ver and PPRBPD can act,
    // OSPM cannot yet. The Non-LS ticket waits at step 6 for Ver.
    let ver_tasks = workflow.actionable_tickets(&ver).await.unwrap();
    assert_eq!(ver_tasks.len(), 2);

    let pprbpd_tasks = workflow.actionable_tickets(&pprbpd).await.unwrap();
    assert_eq!(pprbpd_tasks.len(), 1);
    assert_eq!(pprbpd_tasks[0].ticket.id, ls.id);

    assert!(workflow.actionable_tickets(&ospm).await.unwrap().is_empty());

    // After PPRBPD's cohort step is recorded, their queue empties
    workflow.process_step(&pprbpd, ls.id, target(2)).await.unwrap();
    assert!(workflow.actionable_tickets(&pprbpd).await.unwrap().is_empty());

    // Admins have no task list
    let err = workflow.actionable_tickets(&admin).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Unauthorized { .. }));

    let _ = non_ls;
}

#[tokio::test]
async fn processed_by_lists_only_the_actors_tickets() {
    let (workflow, _) = services_with_catalog(common::three_step_catalog()).await;
    let admin = admin();
    let ver = employee("Kusmono", EmployeeRole::Ver);

    let worked = workflow.create_ticket(&admin, create_request(false)).await.unwrap();
    let untouched = workflow.create_ticket(&admin, create_request(false)).await.unwrap();
    workflow
        .process_step(&ver, worked.id, ProcessStepRequest::default())
        .await
        .unwrap();

    let history = workflow.processed_by(&ver).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].ticket.id, worked.id);
    let _ = untouched;
}

#[tokio::test]
async fn stats_count_by_status_and_list_recent_tickets() {
    let (workflow, _) = services_with_catalog(common::three_step_catalog()).await;
    let admin = admin();
    let ver = employee("Kusmono", EmployeeRole::Ver);

    let pending = workflow.create_ticket(&admin, create_request(false)).await.unwrap();
    let moving = workflow.create_ticket(&admin, create_request(false)).await.unwrap();
    workflow
        .process_step(&ver, moving.id, ProcessStepRequest::default())
        .await
        .unwrap();

    let stats = workflow.ticket_stats().await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.in_progress, 1);
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.recent_tickets.len(), 2);
    let _ = pending;
}

#[tokio::test]
async fn delete_ticket_is_admin_only_and_removes_history() {
    let (workflow, _) = services_with_catalog(common::three_step_catalog()).await;
    let admin = admin();
    let ver = employee("Kusmono", EmployeeRole::Ver);

    let ticket = workflow.create_ticket(&admin, create_request(false)).await.unwrap();
    workflow
        .process_step(&ver, ticket.id, ProcessStepRequest::default())
        .await
        .unwrap();

    let err = workflow.delete_ticket(&ver, ticket.id).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Unauthorized { .. }));

    workflow.delete_ticket(&admin, ticket.id).await.unwrap();
    let err = workflow.get_ticket(ticket.id).await.unwrap_err();
    assert!(matches!(err, WorkflowError::TicketNotFound(_)));

    // Nothing left for the actor's history either
    assert!(workflow.processed_by(&ver).await.unwrap().is_empty());
}

#[tokio::test]
async fn ticket_creation_requires_admin() {
    let (workflow, _) = services_with_catalog(common::three_step_catalog()).await;
    let err = workflow
        .create_ticket(&employee("Kusmono", EmployeeRole::Ver), create_request(false))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Unauthorized { .. }));
}

#[tokio::test]
async fn files_are_attached_to_history_rows() {
    let (workflow, _) = services_with_catalog(common::three_step_catalog()).await;
    let ver = employee("Kusmono", EmployeeRole::Ver);

    let ticket = workflow.create_ticket(&admin(), create_request(false)).await.unwrap();
    let updated = workflow
        .process_step(
            &ver,
            ticket.id,
            ProcessStepRequest {
                target_step: None,
                file: Some(FileReference {
                    url: "/uploads/rekap.pdf".to_string(),
                    original_name: "rekap.pdf".to_string(),
                }),
                notes: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.histories[0].file_url.as_deref(), Some("/uploads/rekap.pdf"));
    assert_eq!(updated.histories[0].file_name.as_deref(), Some("rekap.pdf"));
}

#[tokio::test]
async fn settings_round_trip_and_require_admin_for_writes() {
    let (workflow, _) = services_with_catalog(Vec::new()).await;
    let admin = admin();

    workflow
        .put_setting(&admin, "letter_number_format", "ST/{seq}/{year}")
        .await
        .unwrap();
    assert_eq!(
        workflow.get_setting("letter_number_format").await.unwrap().as_deref(),
        Some("ST/{seq}/{year}")
    );

    workflow
        .put_settings(
            &admin,
            &[
                ("office_name".to_string(), "Balai Monitor".to_string()),
                ("office_city".to_string(), "Surabaya".to_string()),
            ],
        )
        .await
        .unwrap();
    let all = workflow.all_settings().await.unwrap();
    assert_eq!(all.len(), 3);

    let err = workflow
        .put_setting(&employee("Kusmono", EmployeeRole::Ver), "k", "v")
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Unauthorized { .. }));
}

#[tokio::test]
async fn list_tickets_honors_status_filters() {
    let (workflow, _) = services_with_catalog(common::three_step_catalog()).await;
    let admin = admin();
    let ver = employee("Kusmono", EmployeeRole::Ver);

    let open = workflow.create_ticket(&admin, create_request(false)).await.unwrap();
    let moving = workflow.create_ticket(&admin, create_request(false)).await.unwrap();
    workflow
        .process_step(&ver, moving.id, ProcessStepRequest::default())
        .await
        .unwrap();

    let pending_only = workflow
        .list_tickets(&TicketFilter {
            status: Some(TicketState::Pending),
            ..TicketFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(pending_only.len(), 1);
    assert_eq!(pending_only[0].ticket.id, open.id);

    let active = workflow
        .list_tickets(&TicketFilter {
            exclude_completed: true,
            ..TicketFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(active.len(), 2);
}
