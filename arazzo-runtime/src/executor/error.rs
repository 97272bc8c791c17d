use arazzo_model::{ActionError, SortError};

use crate::criteria::EvalError;
use crate::executor::transport::TransportError;
use crate::resolver::ResolveError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unknown workflow '{0}'")]
    UnknownWorkflow(String),
    #[error("workflow '{workflow_id}' has no step '{step_id}'")]
    UnknownStep {
        workflow_id: String,
        step_id: String,
    },
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Sort(#[from] SortError),
    #[error("step '{step_id}' of workflow '{workflow_id}' failed and no failure action applies")]
    NoFailureAction {
        workflow_id: String,
        step_id: String,
    },
    #[error("no action of step '{step_id}' matched its criteria")]
    ActionCriteriaExhausted { step_id: String },
    #[error("step '{step_id}' of workflow '{workflow_id}' reached its retry limit of {limit}")]
    RetryLimitReached {
        workflow_id: String,
        step_id: String,
        limit: u32,
    },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("delegating to workflow '{workflow_id}' exceeds the nesting limit of {limit}")]
    DelegationDepth { workflow_id: String, limit: usize },
    #[error("output '{output}' of workflow '{workflow_id}' could not be resolved: {source}")]
    UnresolvedOutput {
        workflow_id: String,
        output: String,
        #[source]
        source: ResolveError,
    },
    #[error("step '{step_id}' names neither an operation nor a workflow")]
    MissingOperation { step_id: String },
}
