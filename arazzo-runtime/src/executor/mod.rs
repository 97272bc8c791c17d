mod engine;
mod error;
pub mod events;
mod step;
mod transport;
mod types;

pub use engine::Engine;
pub use error::EngineError;
pub use events::{
    ActionKind, CompositeEventSink, Event, EventSink, NoOpEventSink, TracingEventSink,
};
pub use step::{conclude_step, StepExecutor};
pub use transport::{
    ResolvedParameter, StepRequest, Transport, TransportError, TransportStepExecutor,
};
pub use types::{EngineConfig, ExecutionOutcome, RunReport};
