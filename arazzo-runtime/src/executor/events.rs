use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    RunStarted {
        run_id: Uuid,
        workflow_id: String,
        /// Set for delegated and GOTO-started runs.
        parent_run_id: Option<Uuid>,
    },
    RunFinished {
        run_id: Uuid,
        workflow_id: String,
        succeeded: bool,
    },
    StepStarted {
        run_id: Uuid,
        step_id: String,
    },
    StepSucceeded {
        run_id: Uuid,
        step_id: String,
    },
    StepFailed {
        run_id: Uuid,
        step_id: String,
    },
    ActionTriggered {
        run_id: Uuid,
        step_id: String,
        action: String,
        kind: ActionKind,
    },
    RetryScheduled {
        run_id: Uuid,
        step_id: String,
        attempt: u32,
        delay: Duration,
    },
    WorkflowDelegated {
        run_id: Uuid,
        step_id: String,
        workflow_id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    End,
    Goto,
    Retry,
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: Event);
}

pub struct CompositeEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl Default for CompositeEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

#[async_trait]
impl EventSink for CompositeEventSink {
    async fn emit(&self, event: Event) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }
}

/// Logs every event through `tracing`. The engine's default sink.
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: Event) {
        match event {
            Event::RunStarted {
                run_id,
                workflow_id,
                parent_run_id,
            } => {
                info!(%run_id, %workflow_id, parent_run_id = ?parent_run_id, "run started");
            }
            Event::RunFinished {
                run_id,
                workflow_id,
                succeeded: true,
            } => info!(%run_id, %workflow_id, "run finished"),
            Event::RunFinished {
                run_id,
                workflow_id,
                succeeded: false,
            } => warn!(%run_id, %workflow_id, "run aborted"),
            Event::StepStarted { run_id, step_id } => info!(%run_id, %step_id, "step started"),
            Event::StepSucceeded { run_id, step_id } => {
                info!(%run_id, %step_id, "step succeeded")
            }
            Event::StepFailed { run_id, step_id } => warn!(%run_id, %step_id, "step failed"),
            Event::ActionTriggered {
                run_id,
                step_id,
                action,
                kind,
            } => info!(%run_id, %step_id, %action, ?kind, "action triggered"),
            Event::RetryScheduled {
                run_id,
                step_id,
                attempt,
                delay,
            } => info!(
                %run_id,
                %step_id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retry scheduled"
            ),
            Event::WorkflowDelegated {
                run_id,
                step_id,
                workflow_id,
            } => info!(%run_id, %step_id, %workflow_id, "workflow delegated"),
        }
    }
}

pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: Event) {}
}
