use std::collections::BTreeMap;
use std::time::Duration;

use arazzo_model::{FailureAction, SuccessAction};
use uuid::Uuid;

use crate::retry::RetryConfig;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub retry: RetryConfig,
    /// Nested workflow runs allowed below a top-level run.
    pub max_delegation_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            max_delegation_depth: 32,
        }
    }
}

/// What a step execution produced, with the step-level action already chosen.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Succeeded {
        action: Option<SuccessAction>,
    },
    Failed {
        action: Option<FailureAction>,
        /// Delay hint read from the failed response.
        retry_after: Option<Duration>,
    },
}

impl ExecutionOutcome {
    pub fn succeeded() -> Self {
        ExecutionOutcome::Succeeded { action: None }
    }

    pub fn failed() -> Self {
        ExecutionOutcome::Failed {
            action: None,
            retry_after: None,
        }
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, ExecutionOutcome::Succeeded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub workflow_id: String,
    /// Declared workflow outputs, resolved.
    pub outputs: BTreeMap<String, String>,
    pub steps_executed: usize,
    pub retries: usize,
}
