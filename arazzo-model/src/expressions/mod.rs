mod body_path;
mod json_pointer;
mod runtime;
mod template;

pub use body_path::{BodyPath, PathSegment};
pub use json_pointer::{JsonPointer, JsonPointerError};
pub use runtime::{parse_runtime_expr, ExprError, NamePath, RuntimeExpr, Source};
pub use template::{parse_template, Segment, Template, TemplateError};
