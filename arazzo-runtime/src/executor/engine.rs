use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use arazzo_model::{
    sort_by_dependencies, FailureAction, FailureKind, RetryPolicy, Step, SuccessAction,
    SuccessKind, Target, Workflow, WorkflowDocument,
};
use futures_util::future::BoxFuture;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::cache::ExpressionCache;
use crate::executor::error::EngineError;
use crate::executor::events::{ActionKind, Event, EventSink, TracingEventSink};
use crate::executor::step::StepExecutor;
use crate::executor::types::{EngineConfig, ExecutionOutcome, RunReport};
use crate::resolver::Resolver;
use crate::retry::decide_retry;

/// Walks a workflow's steps, applying success/failure actions, retries and
/// cross-workflow delegation.
pub struct Engine<'d> {
    document: &'d WorkflowDocument,
    executor: Arc<dyn StepExecutor>,
    config: EngineConfig,
    events: Arc<dyn EventSink>,
}

/// Where the cursor goes after a step.
enum Flow {
    Next,
    Jump(usize),
    End,
}

/// Per-invocation bookkeeping. Retry counters only ever grow.
struct RunState {
    run_id: Uuid,
    retries: BTreeMap<String, u32>,
    steps_executed: usize,
    retries_taken: usize,
}

impl<'d> Engine<'d> {
    pub fn new(
        document: &'d WorkflowDocument,
        executor: Arc<dyn StepExecutor>,
        config: EngineConfig,
    ) -> Self {
        Self {
            document,
            executor,
            config,
            events: Arc::new(TracingEventSink),
        }
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs one workflow over a fresh expression cache.
    pub async fn execute_workflow(
        &self,
        workflow_id: &str,
        inputs: JsonValue,
    ) -> Result<RunReport, EngineError> {
        let mut cache = ExpressionCache::new();
        self.execute_workflow_with_cache(workflow_id, inputs, &mut cache)
            .await
    }

    /// Runs one workflow over a caller-owned cache, so outputs published by
    /// earlier runs stay visible.
    pub async fn execute_workflow_with_cache(
        &self,
        workflow_id: &str,
        inputs: JsonValue,
        cache: &mut ExpressionCache,
    ) -> Result<RunReport, EngineError> {
        self.run(workflow_id, inputs, cache, 0, None).await
    }

    /// Runs every workflow in dependency order over one shared cache.
    /// `inputs` is keyed by workflow id; missing entries mean no inputs.
    pub async fn execute_document(
        &self,
        inputs: &BTreeMap<String, JsonValue>,
    ) -> Result<Vec<RunReport>, EngineError> {
        let order = sort_by_dependencies(&self.document.workflows)?;
        let mut cache = ExpressionCache::new();
        let mut reports = Vec::with_capacity(order.len());
        for workflow in order {
            let workflow_inputs = inputs
                .get(&workflow.workflow_id)
                .cloned()
                .unwrap_or_else(|| JsonValue::Object(Map::new()));
            reports.push(
                self.run(&workflow.workflow_id, workflow_inputs, &mut cache, 0, None)
                    .await?,
            );
        }
        Ok(reports)
    }

    // Boxed so nested runs can recurse.
    fn run<'a>(
        &'a self,
        workflow_id: &'a str,
        inputs: JsonValue,
        cache: &'a mut ExpressionCache,
        depth: usize,
        parent_run_id: Option<Uuid>,
    ) -> BoxFuture<'a, Result<RunReport, EngineError>> {
        Box::pin(async move {
            let workflow = self
                .document
                .workflow(workflow_id)
                .ok_or_else(|| EngineError::UnknownWorkflow(workflow_id.to_string()))?;
            if depth > self.config.max_delegation_depth {
                return Err(EngineError::DelegationDepth {
                    workflow_id: workflow_id.to_string(),
                    limit: self.config.max_delegation_depth,
                });
            }

            let run_id = Uuid::new_v4();
            self.events
                .emit(Event::RunStarted {
                    run_id,
                    workflow_id: workflow_id.to_string(),
                    parent_run_id,
                })
                .await;

            let result = self.drive(workflow, run_id, inputs, cache, depth).await;

            self.events
                .emit(Event::RunFinished {
                    run_id,
                    workflow_id: workflow_id.to_string(),
                    succeeded: result.is_ok(),
                })
                .await;
            result
        })
    }

    #[instrument(
        skip_all,
        fields(workflow_id = %workflow.workflow_id, run_id = %run_id, depth = depth)
    )]
    async fn drive(
        &self,
        workflow: &'d Workflow,
        run_id: Uuid,
        inputs: JsonValue,
        cache: &mut ExpressionCache,
        depth: usize,
    ) -> Result<RunReport, EngineError> {
        let mut resolver =
            Resolver::new(self.document, workflow.workflow_id.clone(), inputs, cache);
        let mut state = RunState {
            run_id,
            retries: BTreeMap::new(),
            steps_executed: 0,
            retries_taken: 0,
        };

        let mut cursor = 0;
        while let Some(step) = workflow.steps.get(cursor) {
            let flow = self
                .run_step(workflow, step, cursor, &mut resolver, &mut state, depth)
                .await?;
            cursor = match flow {
                Flow::Next => cursor + 1,
                Flow::Jump(index) => index,
                Flow::End => break,
            };
        }

        let outputs = resolve_outputs(workflow, &mut resolver)?;
        info!(
            steps = state.steps_executed,
            retries = state.retries_taken,
            "workflow completed"
        );
        Ok(RunReport {
            run_id,
            workflow_id: workflow.workflow_id.clone(),
            outputs,
            steps_executed: state.steps_executed,
            retries: state.retries_taken,
        })
    }

    async fn run_step(
        &self,
        workflow: &'d Workflow,
        step: &'d Step,
        cursor: usize,
        resolver: &mut Resolver<'_>,
        state: &mut RunState,
        depth: usize,
    ) -> Result<Flow, EngineError> {
        if let Some(target) = step.delegated_workflow() {
            self.delegate(step, target, resolver, state, depth).await?;
            state.steps_executed += 1;
            return Ok(Flow::Next);
        }

        self.events
            .emit(Event::StepStarted {
                run_id: state.run_id,
                step_id: step.step_id.clone(),
            })
            .await;
        let outcome = self
            .executor
            .execute(workflow, step, resolver, &self.config)
            .await?;
        state.steps_executed += 1;

        match outcome {
            ExecutionOutcome::Succeeded { action } => {
                self.events
                    .emit(Event::StepSucceeded {
                        run_id: state.run_id,
                        step_id: step.step_id.clone(),
                    })
                    .await;
                self.on_success(workflow, step, action, resolver, state, depth)
                    .await
            }
            ExecutionOutcome::Failed {
                action,
                retry_after,
            } => {
                self.events
                    .emit(Event::StepFailed {
                        run_id: state.run_id,
                        step_id: step.step_id.clone(),
                    })
                    .await;
                self.on_failure(
                    workflow,
                    step,
                    cursor,
                    action,
                    retry_after,
                    resolver,
                    state,
                    depth,
                )
                .await
            }
        }
    }

    /// Workflow-level actions come first; the first candidate decides.
    async fn on_success(
        &self,
        workflow: &'d Workflow,
        step: &Step,
        chosen: Option<SuccessAction>,
        resolver: &mut Resolver<'_>,
        state: &mut RunState,
        depth: usize,
    ) -> Result<Flow, EngineError> {
        let Some(action) = workflow.success_actions.iter().chain(chosen.as_ref()).next() else {
            return Ok(Flow::Next);
        };
        match action.kind()? {
            SuccessKind::End => {
                self.trigger(state, step, &action.name, ActionKind::End).await;
                Ok(Flow::End)
            }
            SuccessKind::Goto(target) => {
                self.trigger(state, step, &action.name, ActionKind::Goto).await;
                self.goto(workflow, target, resolver, state, depth).await
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn on_failure(
        &self,
        workflow: &'d Workflow,
        step: &Step,
        cursor: usize,
        chosen: Option<FailureAction>,
        hint: Option<Duration>,
        resolver: &mut Resolver<'_>,
        state: &mut RunState,
        depth: usize,
    ) -> Result<Flow, EngineError> {
        let Some(action) = workflow.failure_actions.iter().chain(chosen.as_ref()).next() else {
            return Err(EngineError::NoFailureAction {
                workflow_id: workflow.workflow_id.clone(),
                step_id: step.step_id.clone(),
            });
        };
        match action.kind()? {
            FailureKind::End => {
                self.trigger(state, step, &action.name, ActionKind::End).await;
                Ok(Flow::End)
            }
            FailureKind::Goto(target) => {
                self.trigger(state, step, &action.name, ActionKind::Goto).await;
                self.goto(workflow, target, resolver, state, depth).await
            }
            FailureKind::Retry(policy) => {
                self.trigger(state, step, &action.name, ActionKind::Retry).await;
                self.retry(workflow, step, cursor, policy, hint, resolver, state, depth)
                    .await
            }
        }
    }

    /// A step target moves the cursor; a workflow target runs that workflow
    /// to completion and ends this run.
    async fn goto(
        &self,
        workflow: &'d Workflow,
        target: Target<'_>,
        resolver: &mut Resolver<'_>,
        state: &mut RunState,
        depth: usize,
    ) -> Result<Flow, EngineError> {
        match target {
            Target::Step(step_id) => workflow
                .step_index(step_id)
                .map(Flow::Jump)
                .ok_or_else(|| EngineError::UnknownStep {
                    workflow_id: workflow.workflow_id.clone(),
                    step_id: step_id.to_string(),
                }),
            Target::Workflow(target_id) => {
                let inputs = resolver.inputs().clone();
                self.run(
                    target_id,
                    inputs,
                    resolver.cache_mut(),
                    depth + 1,
                    Some(state.run_id),
                )
                .await?;
                Ok(Flow::End)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn retry(
        &self,
        workflow: &'d Workflow,
        step: &Step,
        cursor: usize,
        policy: RetryPolicy<'_>,
        hint: Option<Duration>,
        resolver: &mut Resolver<'_>,
        state: &mut RunState,
        depth: usize,
    ) -> Result<Flow, EngineError> {
        let attempt = {
            let count = state.retries.entry(step.step_id.clone()).or_insert(0);
            *count += 1;
            *count
        };
        if attempt > policy.limit {
            return Err(EngineError::RetryLimitReached {
                workflow_id: workflow.workflow_id.clone(),
                step_id: step.step_id.clone(),
                limit: policy.limit,
            });
        }

        if let Some(hook) = policy.hook {
            self.run_retry_hook(workflow, hook, resolver, state, depth)
                .await?;
        }

        let decision = decide_retry(&self.config.retry, hint, policy.after);
        state.retries_taken += 1;
        self.events
            .emit(Event::RetryScheduled {
                run_id: state.run_id,
                step_id: step.step_id.clone(),
                attempt,
                delay: decision.delay,
            })
            .await;
        debug!(step_id = %step.step_id, reason = ?decision.reason, "waiting before retry");
        tokio::time::sleep(decision.delay).await;
        Ok(Flow::Jump(cursor))
    }

    /// Runs the step or workflow a RETRY names before retrying. Whatever
    /// action it would take is dropped; control always returns to the retry.
    async fn run_retry_hook(
        &self,
        workflow: &'d Workflow,
        hook: Target<'_>,
        resolver: &mut Resolver<'_>,
        state: &mut RunState,
        depth: usize,
    ) -> Result<(), EngineError> {
        match hook {
            Target::Step(step_id) => {
                let step = workflow
                    .step(step_id)
                    .ok_or_else(|| EngineError::UnknownStep {
                        workflow_id: workflow.workflow_id.clone(),
                        step_id: step_id.to_string(),
                    })?;
                if let Some(target) = step.delegated_workflow() {
                    self.delegate(step, target, resolver, state, depth).await?;
                } else {
                    let outcome = self
                        .executor
                        .execute(workflow, step, resolver, &self.config)
                        .await?;
                    if !matches!(outcome, ExecutionOutcome::Succeeded { action: None }) {
                        warn!(
                            hook = %step_id,
                            successful = outcome.is_successful(),
                            "pre-retry step outcome discarded"
                        );
                    }
                }
                state.steps_executed += 1;
            }
            Target::Workflow(target_id) => {
                let inputs = resolver.inputs().clone();
                self.run(
                    target_id,
                    inputs,
                    resolver.cache_mut(),
                    depth + 1,
                    Some(state.run_id),
                )
                .await?;
            }
        }
        Ok(())
    }

    async fn delegate(
        &self,
        step: &Step,
        target: &str,
        resolver: &mut Resolver<'_>,
        state: &RunState,
        depth: usize,
    ) -> Result<(), EngineError> {
        let inputs = delegation_inputs(step, resolver)?;
        self.events
            .emit(Event::WorkflowDelegated {
                run_id: state.run_id,
                step_id: step.step_id.clone(),
                workflow_id: target.to_string(),
            })
            .await;
        self.run(
            target,
            inputs,
            resolver.cache_mut(),
            depth + 1,
            Some(state.run_id),
        )
        .await?;
        Ok(())
    }

    async fn trigger(&self, state: &RunState, step: &Step, action: &str, kind: ActionKind) {
        self.events
            .emit(Event::ActionTriggered {
                run_id: state.run_id,
                step_id: step.step_id.clone(),
                action: action.to_string(),
                kind,
            })
            .await;
    }
}

/// A delegation step's parameters become the nested run's inputs; without
/// parameters the nested run sees the caller's inputs.
fn delegation_inputs(step: &Step, resolver: &mut Resolver<'_>) -> Result<JsonValue, EngineError> {
    if step.parameters.is_empty() {
        return Ok(resolver.inputs().clone());
    }
    let mut inputs = Map::new();
    for p in &step.parameters {
        inputs.insert(p.name.clone(), resolver.resolve_value(&p.value, None)?);
    }
    Ok(JsonValue::Object(inputs))
}

/// Resolves declared outputs, exposes each to `$outputs.<name>` for the rest
/// of the run and publishes it as `$workflows.<id>.outputs.<name>`.
fn resolve_outputs(
    workflow: &Workflow,
    resolver: &mut Resolver<'_>,
) -> Result<BTreeMap<String, String>, EngineError> {
    let mut outputs = BTreeMap::new();
    for (name, expression) in &workflow.outputs {
        let value = resolver
            .resolve_template(expression, None)
            .map_err(|source| EngineError::UnresolvedOutput {
                workflow_id: workflow.workflow_id.clone(),
                output: name.clone(),
                source,
            })?;
        resolver.record_output(name.clone(), JsonValue::String(value.clone()));
        resolver.publish(
            format!("$workflows.{}.outputs.{name}", workflow.workflow_id),
            JsonValue::String(value.clone()),
        );
        outputs.insert(name.clone(), value);
    }
    Ok(outputs)
}
