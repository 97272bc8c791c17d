#![forbid(unsafe_code)]

//! Interpreter for Arazzo workflow documents.
//!
//! The [`Engine`] walks a workflow's steps, hands each remote operation to a
//! [`StepExecutor`], and applies the resulting success or failure actions.
//! Runtime expressions are resolved by a [`Resolver`] backed by a shared
//! [`ExpressionCache`]; criteria are judged by [`evaluate_criterion`].

pub mod cache;
pub mod criteria;
pub mod executor;
pub mod resolver;
pub mod retry;
pub mod snapshot;
pub mod xml;

pub use crate::cache::ExpressionCache;
pub use crate::criteria::{evaluate_all, evaluate_criterion, EvalError};
pub use crate::executor::{
    conclude_step, ActionKind, CompositeEventSink, Engine, EngineConfig, EngineError, Event,
    EventSink, ExecutionOutcome, NoOpEventSink, ResolvedParameter, RunReport, StepExecutor,
    StepRequest, TracingEventSink, Transport, TransportError, TransportStepExecutor,
};
pub use crate::resolver::{stringify, ResolveError, Resolver};
pub use crate::snapshot::{HttpMessage, TransactionSnapshot};
pub use crate::xml::XmlError;
