#![forbid(unsafe_code)]

//! In-memory Arazzo document graph, runtime-expression syntax, and
//! dependency ordering of workflows.
//!
//! Nothing here performs I/O: callers hand over an already-linked
//! [`WorkflowDocument`] and the runtime crate interprets it.

pub mod expressions;
pub mod planner;
pub mod types;

pub use crate::expressions::{
    parse_runtime_expr, parse_template, BodyPath, ExprError, JsonPointer, JsonPointerError,
    NamePath, PathSegment, RuntimeExpr, Segment, Source, Template, TemplateError,
};
pub use crate::planner::{sort_by_dependencies, sort_document_workflows, SortError};
pub use crate::types::{
    ActionError, Components, Criterion, CriterionKind, FailureAction, FailureKind, Parameter,
    ParameterLocation, RequestBody, RetryPolicy, SourceDescription, Step, SuccessAction,
    SuccessKind, Target, Workflow, WorkflowDocument, DEFAULT_RETRY_LIMIT,
};
