use tracing::{info, instrument};

use crate::models::{
    Actor, NewStepConfiguration, StepConfiguration, StepConfigurationUpdate,
};
use crate::state_machine::errors::{unauthorized, validation_failed};
use crate::state_machine::{WorkflowError, WorkflowResult};

use crate::repository::{TicketRepository, TicketTx};

/// Administration of the step catalog.
///
/// Deleting or reordering steps renumbers the whole catalog to a dense
/// 1..N inside a single transaction, shifting through negative ordinals
/// first so the uniqueness constraint never trips mid-sweep. The catalog
/// invariant (contiguous from 1) therefore holds at every commit point.
#[derive(Debug, Clone)]
pub struct StepConfigService<R: TicketRepository> {
    repo: R,
}

impl<R: TicketRepository> StepConfigService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn list_steps(&self) -> WorkflowResult<Vec<StepConfiguration>> {
        self.repo.list_step_configurations().await
    }

    pub async fn get_step(&self, step_number: i32) -> WorkflowResult<StepConfiguration> {
        self.repo
            .get_step_configuration(step_number)
            .await?
            .ok_or(WorkflowError::StepNotFound(step_number))
    }

    #[instrument(skip(self, actor, new_step), fields(actor = %actor.name))]
    pub async fn create_step(
        &self,
        actor: &Actor,
        new_step: NewStepConfiguration,
    ) -> WorkflowResult<StepConfiguration> {
        require_admin(actor)?;
        validate_parallel_group(new_step.is_parallel, new_step.parallel_group.as_deref())?;

        let mut tx = self.repo.begin().await?;
        if tx.find_step_by_number(new_step.step_number).await?.is_some() {
            return Err(validation_failed(format!(
                "step number {} already exists",
                new_step.step_number
            )));
        }
        let step = tx.insert_step(&new_step).await?;
        tx.commit().await?;

        info!(step_number = step.step_number, step_name = %step.step_name, "step created");
        Ok(step)
    }

    #[instrument(skip(self, actor, update), fields(actor = %actor.name, step_id = id))]
    pub async fn update_step(
        &self,
        actor: &Actor,
        id: i32,
        update: StepConfigurationUpdate,
    ) -> WorkflowResult<StepConfiguration> {
        require_admin(actor)?;
        validate_parallel_group(update.is_parallel, update.parallel_group.as_deref())?;

        let mut tx = self.repo.begin().await?;
        if tx.find_step_by_id(id).await?.is_none() {
            return Err(WorkflowError::StepNotFound(id));
        }
        let step = tx.update_step(id, &update).await?;
        tx.commit().await?;
        Ok(step)
    }

    /// Delete a step and compact the remaining catalog to dense 1..N.
    #[instrument(skip(self, actor), fields(actor = %actor.name, step_id = id))]
    pub async fn delete_step(&self, actor: &Actor, id: i32) -> WorkflowResult<Vec<StepConfiguration>> {
        require_admin(actor)?;

        let mut tx = self.repo.begin().await?;
        if tx.find_step_by_id(id).await?.is_none() {
            return Err(WorkflowError::StepNotFound(id));
        }
        tx.delete_step(id).await?;
        let remaining = tx.list_step_configurations().await?;
        renumber_dense(&mut tx, &remaining).await?;
        let steps = tx.list_step_configurations().await?;
        tx.commit().await?;

        info!(step_id = id, remaining = steps.len(), "step deleted and catalog renumbered");
        Ok(steps)
    }

    /// Apply a new ordering given as `(id, step_number)` pairs.
    #[instrument(skip(self, actor, ordering), fields(actor = %actor.name))]
    pub async fn reorder_steps(
        &self,
        actor: &Actor,
        ordering: &[(i32, i32)],
    ) -> WorkflowResult<Vec<StepConfiguration>> {
        require_admin(actor)?;

        let mut tx = self.repo.begin().await?;
        // Two-phase shift: park every step on a negative ordinal, then
        // assign the requested numbers.
        for (id, step_number) in ordering {
            tx.set_step_number(*id, -step_number).await?;
        }
        for (id, step_number) in ordering {
            tx.set_step_number(*id, *step_number).await?;
        }
        let steps = tx.list_step_configurations().await?;
        tx.commit().await?;
        Ok(steps)
    }

    /// Compact the catalog to dense 1..N in its current order.
    #[instrument(skip(self, actor), fields(actor = %actor.name))]
    pub async fn renumber_steps(&self, actor: &Actor) -> WorkflowResult<Vec<StepConfiguration>> {
        require_admin(actor)?;

        let mut tx = self.repo.begin().await?;
        let steps = tx.list_step_configurations().await?;
        renumber_dense(&mut tx, &steps).await?;
        let steps = tx.list_step_configurations().await?;
        tx.commit().await?;
        Ok(steps)
    }
}

fn require_admin(actor: &Actor) -> WorkflowResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(unauthorized("only administrators may manage the step catalog"))
    }
}

fn validate_parallel_group(is_parallel: bool, parallel_group: Option<&str>) -> WorkflowResult<()> {
    match (is_parallel, parallel_group) {
        (true, None) => Err(validation_failed("parallel steps require a parallel group")),
        (false, Some(_)) => Err(validation_failed(
            "parallel group is only valid on parallel steps",
        )),
        _ => Ok(()),
    }
}

/// Renumber the given steps (already in catalog order) to 1..N with the
/// negative-shift two-phase sweep.
async fn renumber_dense<T: TicketTx>(
    tx: &mut T,
    steps: &[StepConfiguration],
) -> WorkflowResult<()> {
    for (index, step) in steps.iter().enumerate() {
        tx.set_step_number(step.id, -(index as i32 + 1)).await?;
    }
    for (index, step) in steps.iter().enumerate() {
        tx.set_step_number(step.id, index as i32 + 1).await?;
    }
    Ok(())
}
