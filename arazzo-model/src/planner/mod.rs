//! Ordering of workflows by their `dependsOn` declarations.

mod dependency;

pub use dependency::{sort_by_dependencies, sort_document_workflows, SortError};
