mod actions;
mod common;
mod components;
mod criterion;
mod document;
mod parameter;
mod request_body;
mod source_description;
mod step;
mod workflow;

pub use actions::{
    ActionError, FailureAction, FailureActionType, FailureKind, RetryPolicy, SuccessAction,
    SuccessActionType, SuccessKind, Target, DEFAULT_RETRY_LIMIT,
};
pub use common::{AnyValue, Extensions, JsonSchema, RuntimeExpression};
pub use components::Components;
pub use criterion::{
    Criterion, CriterionExpressionLanguage, CriterionExpressionType, CriterionKind, CriterionType,
};
pub use document::WorkflowDocument;
pub use parameter::{Parameter, ParameterLocation};
pub use request_body::{PayloadReplacement, RequestBody};
pub use source_description::{SourceDescription, SourceDescriptionType};
pub use step::Step;
pub use workflow::Workflow;
