//! End-to-end walkthrough of an LS ticket over the in-memory repository:
//! seeds the default catalog, creates a ticket, processes the opening
//! parallel cohort, then every sequential step through completion,
//! exercising a correction along the way.
//!
//! ```bash
//! cargo run --bin demo
//! ```

use anyhow::Result;
use uuid::Uuid;

use perdin_core::logging::init_structured_logging;
use perdin_core::models::{Actor, EmployeeRole, SystemRole};
use perdin_core::orchestration::{
    CreateTicketRequest, ProcessStepRequest, StepConfigService, WorkflowService,
};
use perdin_core::repository::InMemoryTicketRepository;
use perdin_core::seed::default_step_catalog;
use perdin_core::{FileReference, VarianceStatus};

fn employee(name: &str, role: EmployeeRole) -> Actor {
    Actor {
        id: Uuid::new_v4(),
        name: name.to_string(),
        system_role: SystemRole::Employee,
        employee_role: Some(role),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_structured_logging();

    let repo = InMemoryTicketRepository::new();
    let steps = StepConfigService::new(repo.clone());
    let workflow = WorkflowService::new(repo);

    let admin = Actor {
        id: Uuid::new_v4(),
        name: "Admin User".to_string(),
        system_role: SystemRole::Admin,
        employee_role: None,
    };

    for step in default_step_catalog() {
        steps.create_step(&admin, step).await?;
    }

    let ticket = workflow
        .create_ticket(
            &admin,
            CreateTicketRequest {
                activity_name: "Perjalanan Dinas Monitoring Frekuensi".to_string(),
                assignment_letter_number: "ST/001/2026".to_string(),
                uraian: Some("Monitoring frekuensi radio wilayah timur".to_string()),
                start_date: None,
                is_ls: true,
                assigned_executor_id_1: None,
                assigned_executor_id_2: None,
            },
        )
        .await?;
    println!(
        "created {} (starts at step {}, status {})",
        ticket.ticket_number, ticket.current_step, ticket.status
    );

    // Opening cohort {1, 2, 3}: any order, the pointer waits for all three.
    let verifikator = employee("Kusmono", EmployeeRole::Ver);
    let pprbpd = employee("Ilham", EmployeeRole::Pprbpd);
    let komitmen = employee("Mami", EmployeeRole::Ok);
    for (actor, step) in [(&pprbpd, 2), (&komitmen, 3), (&verifikator, 1)] {
        let updated = workflow
            .process_step(
                actor,
                ticket.id,
                ProcessStepRequest {
                    target_step: Some(step),
                    file: None,
                    notes: None,
                },
            )
            .await?;
        println!(
            "step {step} recorded by {}; pointer at {}",
            actor.name, updated.ticket.current_step
        );
    }

    // Sequential tail of the LS branch.
    let remaining: Vec<(Actor, i32, Option<String>)> = vec![
        (employee("Operator SPM User", EmployeeRole::Ospm), 4, None),
        (employee("-", EmployeeRole::Op), 5, None),
        (
            verifikator.clone(),
            6,
            Some(VarianceStatus::Nihil.tag_notes(Some("berkas lengkap"))),
        ),
        (pprbpd.clone(), 7, None),
        (verifikator.clone(), 8, None),
        (employee("Operator SPBy User", EmployeeRole::Ospby), 9, None),
        (employee("Salma", EmployeeRole::Bp), 10, None),
        (employee("Asbari", EmployeeRole::Ppk), 11, None),
        (employee("-", EmployeeRole::Ppd), 12, None),
        (employee("Putri", EmployeeRole::Adk), 13, None),
        (employee("Sutrisno", EmployeeRole::Ksbu), 14, None),
    ];

    for (actor, step, notes) in remaining {
        let file = FileReference {
            url: format!("/uploads/step-{step}.pdf"),
            original_name: format!("step-{step}.pdf"),
        };
        let updated = workflow
            .process_step(
                &actor,
                ticket.id,
                ProcessStepRequest {
                    target_step: None,
                    file: Some(file),
                    notes,
                },
            )
            .await?;
        println!(
            "step {step} processed by {}; pointer at {} ({})",
            actor.name, updated.ticket.current_step, updated.ticket.status
        );
    }

    // A correction: the archivist sends the ticket back to KSBU, who
    // redoes the signature before the final archive step.
    let archivist = employee("Ilham", EmployeeRole::Pabpd);
    let ksbu = employee("Sutrisno", EmployeeRole::Ksbu);
    let returned = workflow
        .return_to_previous_step(&archivist, ticket.id, "Tanda tangan KSBU belum lengkap")
        .await?;
    println!(
        "returned to step {} ({})",
        returned.ticket.current_step, returned.ticket.status
    );
    workflow
        .process_step(&ksbu, ticket.id, ProcessStepRequest::default())
        .await?;
    let finished = workflow
        .process_step(&archivist, ticket.id, ProcessStepRequest::default())
        .await?;
    println!(
        "final step processed; pointer at {} ({})",
        finished.ticket.current_step, finished.ticket.status
    );

    let stats = workflow.ticket_stats().await?;
    println!(
        "dashboard: {} total, {} pending, {} in progress, {} completed",
        stats.total, stats.pending, stats.in_progress, stats.completed
    );

    Ok(())
}
