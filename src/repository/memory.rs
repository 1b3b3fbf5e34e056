//! In-memory implementation of the repository contracts.
//!
//! Backs the test suite and the demo binary. One async mutex plays the
//! role of the database's row locks: a transaction owns the store for its
//! whole lifetime, mutates a working copy, and publishes it on commit, so
//! dropped transactions roll back exactly like their PostgreSQL
//! counterpart.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::models::ticket::TicketCounts;
use crate::models::{
    AppSetting, NewStepConfiguration, NewTicket, NewTicketHistory, StepConfiguration,
    StepConfigurationUpdate, Ticket, TicketFilter, TicketHistory, TicketPatch,
    TicketWithHistories,
};
use crate::state_machine::errors::validation_failed;
use crate::state_machine::{TicketState, WorkflowError, WorkflowResult};

use super::{TicketRepository, TicketTx};

#[derive(Debug, Clone, Default)]
struct Store {
    steps: Vec<StepConfiguration>,
    next_step_id: i32,
    tickets: Vec<Ticket>,
    histories: Vec<TicketHistory>,
    settings: BTreeMap<String, String>,
}

impl Store {
    fn sorted_steps(&self) -> Vec<StepConfiguration> {
        let mut steps = self.steps.clone();
        steps.sort_by_key(|s| s.step_number);
        steps
    }

    fn histories_for(&self, ticket_id: Uuid) -> Vec<TicketHistory> {
        let mut rows: Vec<TicketHistory> = self
            .histories
            .iter()
            .filter(|h| h.ticket_id == ticket_id)
            .cloned()
            .collect();
        rows.sort_by_key(|h| h.step_number);
        rows
    }
}

/// Repository over a shared in-memory store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTicketRepository {
    store: Arc<Mutex<Store>>,
}

impl InMemoryTicketRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct InMemoryTicketTx {
    guard: OwnedMutexGuard<Store>,
    work: Store,
}

#[async_trait]
impl TicketRepository for InMemoryTicketRepository {
    type Tx = InMemoryTicketTx;

    async fn begin(&self) -> WorkflowResult<Self::Tx> {
        let guard = Arc::clone(&self.store).lock_owned().await;
        let work = guard.clone();
        Ok(InMemoryTicketTx { guard, work })
    }

    async fn get_ticket(&self, id: Uuid) -> WorkflowResult<Option<TicketWithHistories>> {
        let store = self.store.lock().await;
        Ok(store.tickets.iter().find(|t| t.id == id).map(|ticket| {
            TicketWithHistories {
                ticket: ticket.clone(),
                histories: store.histories_for(id),
            }
        }))
    }

    async fn list_tickets(
        &self,
        filter: &TicketFilter,
    ) -> WorkflowResult<Vec<TicketWithHistories>> {
        let store = self.store.lock().await;
        let mut tickets: Vec<Ticket> = store
            .tickets
            .iter()
            .filter(|t| match filter.status {
                Some(status) => t.status == status,
                None => true,
            })
            .filter(|t| !filter.exclude_completed || t.status != TicketState::Completed)
            .filter(|t| match filter.processed_by {
                Some(user_id) => store
                    .histories
                    .iter()
                    .any(|h| h.ticket_id == t.id && h.processed_by_id == user_id),
                None => true,
            })
            .cloned()
            .collect();
        tickets.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.ticket_number.cmp(&a.ticket_number))
        });
        Ok(tickets
            .into_iter()
            .map(|ticket| {
                let histories = store.histories_for(ticket.id);
                TicketWithHistories { ticket, histories }
            })
            .collect())
    }

    async fn delete_ticket(&self, id: Uuid) -> WorkflowResult<bool> {
        let mut store = self.store.lock().await;
        let before = store.tickets.len();
        store.tickets.retain(|t| t.id != id);
        store.histories.retain(|h| h.ticket_id != id);
        Ok(store.tickets.len() < before)
    }

    async fn list_step_configurations(&self) -> WorkflowResult<Vec<StepConfiguration>> {
        Ok(self.store.lock().await.sorted_steps())
    }

    async fn get_step_configuration(
        &self,
        step_number: i32,
    ) -> WorkflowResult<Option<StepConfiguration>> {
        Ok(self
            .store
            .lock()
            .await
            .steps
            .iter()
            .find(|s| s.step_number == step_number)
            .cloned())
    }

    async fn ticket_counts(&self) -> WorkflowResult<TicketCounts> {
        let store = self.store.lock().await;
        let count_status = |status: TicketState| {
            store.tickets.iter().filter(|t| t.status == status).count() as i64
        };
        Ok(TicketCounts {
            total: store.tickets.len() as i64,
            pending: count_status(TicketState::Pending),
            in_progress: count_status(TicketState::InProgress),
            completed: count_status(TicketState::Completed),
        })
    }

    async fn get_setting(&self, key: &str) -> WorkflowResult<Option<AppSetting>> {
        Ok(self
            .store
            .lock()
            .await
            .settings
            .get(key)
            .map(|value| AppSetting {
                key: key.to_string(),
                value: value.clone(),
                updated_at: Utc::now(),
            }))
    }

    async fn all_settings(&self) -> WorkflowResult<HashMap<String, String>> {
        Ok(self
            .store
            .lock()
            .await
            .settings
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn put_setting(&self, key: &str, value: &str) -> WorkflowResult<AppSetting> {
        let mut store = self.store.lock().await;
        store.settings.insert(key.to_string(), value.to_string());
        Ok(AppSetting {
            key: key.to_string(),
            value: value.to_string(),
            updated_at: Utc::now(),
        })
    }
}

#[async_trait]
impl TicketTx for InMemoryTicketTx {
    async fn ticket_for_update(&mut self, id: Uuid) -> WorkflowResult<Option<Ticket>> {
        Ok(self.work.tickets.iter().find(|t| t.id == id).cloned())
    }

    async fn histories(&mut self, ticket_id: Uuid) -> WorkflowResult<Vec<TicketHistory>> {
        Ok(self.work.histories_for(ticket_id))
    }

    async fn count_history(
        &mut self,
        ticket_id: Uuid,
        step_numbers: &[i32],
    ) -> WorkflowResult<i64> {
        Ok(self
            .work
            .histories
            .iter()
            .filter(|h| h.ticket_id == ticket_id && step_numbers.contains(&h.step_number))
            .count() as i64)
    }

    async fn list_step_configurations(&mut self) -> WorkflowResult<Vec<StepConfiguration>> {
        Ok(self.work.sorted_steps())
    }

    async fn latest_ticket_number(&mut self, year: i32) -> WorkflowResult<Option<String>> {
        let prefix = format!("{}-{year}", crate::constants::TICKET_NUMBER_PREFIX);
        Ok(self
            .work
            .tickets
            .iter()
            .filter(|t| t.ticket_number.starts_with(&prefix))
            .map(|t| t.ticket_number.clone())
            .max())
    }

    async fn insert_ticket(&mut self, new_ticket: &NewTicket) -> WorkflowResult<Ticket> {
        let now = Utc::now();
        let ticket = Ticket {
            id: Uuid::new_v4(),
            ticket_number: new_ticket.ticket_number.clone(),
            activity_name: new_ticket.activity_name.clone(),
            assignment_letter_number: new_ticket.assignment_letter_number.clone(),
            uraian: new_ticket.uraian.clone(),
            start_date: new_ticket.start_date,
            is_ls: new_ticket.is_ls,
            current_step: new_ticket.current_step,
            status: new_ticket.status,
            assigned_executor_id_1: new_ticket.assigned_executor_id_1,
            assigned_executor_id_2: new_ticket.assigned_executor_id_2,
            created_by_id: new_ticket.created_by_id,
            created_at: now,
            updated_at: now,
        };
        self.work.tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn insert_history(
        &mut self,
        new_row: &NewTicketHistory,
    ) -> WorkflowResult<TicketHistory> {
        // Same backstop as the Postgres unique constraint.
        if self
            .work
            .histories
            .iter()
            .any(|h| h.ticket_id == new_row.ticket_id && h.step_number == new_row.step_number)
        {
            return Err(WorkflowError::AlreadyProcessed {
                ticket: new_row.ticket_id.to_string(),
                step_number: new_row.step_number,
            });
        }
        let row = TicketHistory {
            id: Uuid::new_v4(),
            ticket_id: new_row.ticket_id,
            step_number: new_row.step_number,
            processed_by_id: new_row.processed_by_id,
            processor_name: new_row.processor_name.clone(),
            file_url: new_row.file_url.clone(),
            file_name: new_row.file_name.clone(),
            notes: new_row.notes.clone(),
            processed_at: Utc::now(),
        };
        self.work.histories.push(row.clone());
        Ok(row)
    }

    async fn delete_history(&mut self, id: Uuid) -> WorkflowResult<()> {
        let before = self.work.histories.len();
        self.work.histories.retain(|h| h.id != id);
        if self.work.histories.len() == before {
            return Err(WorkflowError::HistoryNotFound(id));
        }
        Ok(())
    }

    async fn update_ticket(&mut self, id: Uuid, patch: TicketPatch) -> WorkflowResult<Ticket> {
        let ticket = self
            .work
            .tickets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(WorkflowError::TicketNotFound(id))?;
        ticket.current_step = patch.current_step;
        ticket.status = patch.status;
        ticket.updated_at = Utc::now();
        Ok(ticket.clone())
    }

    async fn find_step_by_id(&mut self, id: i32) -> WorkflowResult<Option<StepConfiguration>> {
        Ok(self.work.steps.iter().find(|s| s.id == id).cloned())
    }

    async fn find_step_by_number(
        &mut self,
        step_number: i32,
    ) -> WorkflowResult<Option<StepConfiguration>> {
        Ok(self
            .work
            .steps
            .iter()
            .find(|s| s.step_number == step_number)
            .cloned())
    }

    async fn insert_step(
        &mut self,
        new_step: &NewStepConfiguration,
    ) -> WorkflowResult<StepConfiguration> {
        if self
            .work
            .steps
            .iter()
            .any(|s| s.step_number == new_step.step_number)
        {
            return Err(validation_failed(format!(
                "step number {} already exists",
                new_step.step_number
            )));
        }
        let now = Utc::now();
        self.work.next_step_id += 1;
        let step = StepConfiguration {
            id: self.work.next_step_id,
            step_number: new_step.step_number,
            step_name: new_step.step_name.clone(),
            description: new_step.description.clone(),
            required_employee_role: new_step.required_employee_role,
            applicability: new_step.applicability,
            is_parallel: new_step.is_parallel,
            parallel_group: new_step.parallel_group.clone(),
            created_at: now,
            updated_at: now,
        };
        self.work.steps.push(step.clone());
        Ok(step)
    }

    async fn update_step(
        &mut self,
        id: i32,
        update: &StepConfigurationUpdate,
    ) -> WorkflowResult<StepConfiguration> {
        let step = self
            .work
            .steps
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(WorkflowError::StepNotFound(id))?;
        step.step_number = update.step_number;
        step.step_name = update.step_name.clone();
        step.description = update.description.clone();
        step.required_employee_role = update.required_employee_role;
        step.applicability = update.applicability;
        step.is_parallel = update.is_parallel;
        step.parallel_group = update.parallel_group.clone();
        step.updated_at = Utc::now();
        Ok(step.clone())
    }

    async fn delete_step(&mut self, id: i32) -> WorkflowResult<bool> {
        let before = self.work.steps.len();
        self.work.steps.retain(|s| s.id != id);
        Ok(self.work.steps.len() < before)
    }

    async fn set_step_number(&mut self, id: i32, step_number: i32) -> WorkflowResult<()> {
        let step = self
            .work
            .steps
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(WorkflowError::StepNotFound(id))?;
        step.step_number = step_number;
        step.updated_at = Utc::now();
        Ok(())
    }

    async fn commit(self) -> WorkflowResult<()> {
        let Self { mut guard, work } = self;
        *guard = work;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Applicability, EmployeeRole};

    fn new_step(number: i32) -> NewStepConfiguration {
        NewStepConfiguration {
            step_number: number,
            step_name: format!("Step {number}"),
            description: String::new(),
            required_employee_role: EmployeeRole::Ver,
            applicability: Applicability::Both,
            is_parallel: false,
            parallel_group: None,
        }
    }

    #[test]
    fn dropped_transaction_rolls_back() {
        tokio_test::block_on(async {
            let repo = InMemoryTicketRepository::new();

            let mut tx = repo.begin().await.unwrap();
            tx.insert_step(&new_step(1)).await.unwrap();
            drop(tx);
            assert!(repo.list_step_configurations().await.unwrap().is_empty());

            let mut tx = repo.begin().await.unwrap();
            tx.insert_step(&new_step(1)).await.unwrap();
            tx.commit().await.unwrap();
            assert_eq!(repo.list_step_configurations().await.unwrap().len(), 1);
        });
    }

    #[test]
    fn count_history_only_counts_the_requested_steps() {
        use crate::models::NewTicketHistory;
        use crate::state_machine::TicketState;

        tokio_test::block_on(async {
            let repo = InMemoryTicketRepository::new();
            let mut tx = repo.begin().await.unwrap();
            let ticket = tx
                .insert_ticket(&NewTicket {
                    ticket_number: "PD-202501".to_string(),
                    activity_name: "Monitoring".to_string(),
                    assignment_letter_number: "ST/001/2025".to_string(),
                    uraian: None,
                    start_date: Utc::now(),
                    is_ls: true,
                    current_step: 1,
                    status: TicketState::Pending,
                    assigned_executor_id_1: None,
                    assigned_executor_id_2: None,
                    created_by_id: Uuid::new_v4(),
                })
                .await
                .unwrap();

            for step_number in [1, 2, 5] {
                tx.insert_history(&NewTicketHistory {
                    ticket_id: ticket.id,
                    step_number,
                    processed_by_id: Uuid::new_v4(),
                    processor_name: "someone".to_string(),
                    file_url: None,
                    file_name: None,
                    notes: None,
                })
                .await
                .unwrap();
            }

            assert_eq!(tx.count_history(ticket.id, &[1, 2, 3]).await.unwrap(), 2);
            assert_eq!(tx.count_history(ticket.id, &[4]).await.unwrap(), 0);
        });
    }

    #[test]
    fn duplicate_step_numbers_are_rejected() {
        tokio_test::block_on(async {
            let repo = InMemoryTicketRepository::new();
            let mut tx = repo.begin().await.unwrap();
            tx.insert_step(&new_step(1)).await.unwrap();
            let err = tx.insert_step(&new_step(1)).await.unwrap_err();
            assert!(matches!(err, WorkflowError::ValidationFailed { .. }));
        });
    }
}
