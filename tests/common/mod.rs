//! Shared fixtures for the integration tests: actors, catalogs, and
//! fully wired services over the in-memory repository.

#![allow(dead_code)]

use uuid::Uuid;

use perdin_core::models::{Actor, Applicability, EmployeeRole, NewStepConfiguration, SystemRole};
use perdin_core::orchestration::{ProcessStepRequest, StepConfigService, WorkflowService};
use perdin_core::repository::InMemoryTicketRepository;
use perdin_core::seed::default_step_catalog;

pub type TestWorkflow = WorkflowService<InMemoryTicketRepository>;
pub type TestSteps = StepConfigService<InMemoryTicketRepository>;

pub fn admin() -> Actor {
    Actor {
        id: Uuid::new_v4(),
        name: "Admin User".to_string(),
        system_role: SystemRole::Admin,
        employee_role: None,
    }
}

pub fn supervisor() -> Actor {
    Actor {
        id: Uuid::new_v4(),
        name: "Supervisor User".to_string(),
        system_role: SystemRole::Supervisor,
        employee_role: None,
    }
}

pub fn employee(name: &str, role: EmployeeRole) -> Actor {
    Actor {
        id: Uuid::new_v4(),
        name: name.to_string(),
        system_role: SystemRole::Employee,
        employee_role: Some(role),
    }
}

/// Three plain sequential steps applicable to both branches, one role
/// per station.
pub fn three_step_catalog() -> Vec<NewStepConfiguration> {
    [
        (1, EmployeeRole::Ver),
        (2, EmployeeRole::Pprbpd),
        (3, EmployeeRole::Ok),
    ]
    .into_iter()
    .map(|(step_number, required_employee_role)| NewStepConfiguration {
        step_number,
        step_name: format!("Step {step_number}"),
        description: String::new(),
        required_employee_role,
        applicability: Applicability::Both,
        is_parallel: false,
        parallel_group: None,
    })
    .collect()
}

/// Services over a shared in-memory repository seeded with the given
/// catalog.
pub async fn services_with_catalog(
    catalog: Vec<NewStepConfiguration>,
) -> (TestWorkflow, TestSteps) {
    let repo = InMemoryTicketRepository::new();
    let steps = StepConfigService::new(repo.clone());
    let seeder = admin();
    for step in catalog {
        steps
            .create_step(&seeder, step)
            .await
            .expect("seeding the step catalog should succeed");
    }
    (WorkflowService::new(repo), steps)
}

pub async fn services_with_default_catalog() -> (TestWorkflow, TestSteps) {
    services_with_catalog(default_step_catalog()).await
}

/// ProcessStep request targeting an explicit step, without file or notes.
pub fn target(step: i32) -> ProcessStepRequest {
    ProcessStepRequest {
        target_step: Some(step),
        file: None,
        notes: None,
    }
}
