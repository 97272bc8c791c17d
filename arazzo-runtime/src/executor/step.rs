use std::time::SystemTime;

use arazzo_model::{Criterion, Step, Workflow};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::criteria::evaluate_all;
use crate::executor::error::EngineError;
use crate::executor::types::{EngineConfig, ExecutionOutcome};
use crate::resolver::Resolver;
use crate::retry::{parse_retry_after, RetryConfig};
use crate::snapshot::TransactionSnapshot;

/// Performs one step's remote operation and judges the result.
///
/// Implementations make the transaction visible to the resolver while they
/// evaluate the step's success criteria, and return the outcome with the
/// step-level action already selected. [`conclude_step`] does the judging
/// part for any implementation that has a [`TransactionSnapshot`] in hand.
/// `config` is the running engine's configuration; delay hints are read
/// with its `retry` settings.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn execute(
        &self,
        workflow: &Workflow,
        step: &Step,
        resolver: &mut Resolver<'_>,
        config: &EngineConfig,
    ) -> Result<ExecutionOutcome, EngineError>;
}

/// Judges a finished transaction for `step`.
///
/// On success the step's outputs are published under
/// `$steps.<stepId>.outputs.<name>` before its `onSuccess` actions are
/// considered, so action criteria can read them.
pub fn conclude_step(
    step: &Step,
    snapshot: &TransactionSnapshot,
    resolver: &mut Resolver<'_>,
    retry: &RetryConfig,
) -> Result<ExecutionOutcome, EngineError> {
    let successful = evaluate_all(&step.success_criteria, resolver, Some(snapshot))?;
    debug!(step_id = %step.step_id, status = snapshot.status_code, successful, "step judged");

    if successful {
        for (name, expression) in &step.outputs {
            let value =
                resolver.resolve_value(&JsonValue::String(expression.clone()), Some(snapshot))?;
            resolver.publish(format!("$steps.{}.outputs.{name}", step.step_id), value);
        }
        let action = select_action(step, &step.on_success, |a| &a.criteria, resolver, snapshot)?;
        return Ok(ExecutionOutcome::Succeeded { action });
    }

    let action = select_action(step, &step.on_failure, |a| &a.criteria, resolver, snapshot)?;
    let retry_after = parse_retry_after(&snapshot.response, &retry.headers, SystemTime::now());
    Ok(ExecutionOutcome::Failed {
        action,
        retry_after,
    })
}

/// First action whose criteria all hold. An empty list selects nothing; a
/// non-empty list where nothing matches is a configuration error.
fn select_action<A: Clone>(
    step: &Step,
    actions: &[A],
    criteria: impl Fn(&A) -> &Option<Vec<Criterion>>,
    resolver: &mut Resolver<'_>,
    snapshot: &TransactionSnapshot,
) -> Result<Option<A>, EngineError> {
    if actions.is_empty() {
        return Ok(None);
    }
    for action in actions {
        let guard = criteria(action).as_deref().unwrap_or_default();
        if evaluate_all(guard, resolver, Some(snapshot))? {
            return Ok(Some(action.clone()));
        }
    }
    Err(EngineError::ActionCriteriaExhausted {
        step_id: step.step_id.clone(),
    })
}
