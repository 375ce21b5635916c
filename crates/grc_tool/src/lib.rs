//! grctool tool framework
//!
//! Named, parameterized operations behind one pipeline: parameters are
//! validated and normalized against a declared rule set, paths are confined
//! to the data directory, the handler runs, and the outcome is rendered as a
//! redacted JSON envelope carrying correlation metadata.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builtin;
pub mod context;
pub mod dispatch;
pub mod envelope;
pub mod normalize;
pub mod output;
pub mod params;
pub mod registry;
pub mod schema;
pub mod trait_;
pub mod validate;

pub use builtin::register_builtin_tools;
pub use context::{InvocationContext, ToolContext};
pub use dispatch::{DispatchError, Dispatcher, Invocation};
pub use envelope::{Envelope, ErrorCode, ToolError, ToolMeta};
pub use normalize::{normalize_reference, normalize_task_ref, ReferenceError, ReferenceKind};
pub use output::{JsonOutputWriter, OutputError, OutputWriter};
pub use params::{ParamValue, Params};
pub use registry::{
    RegistryError, RegistryStats, ToolEntry, ToolInfo, ToolRegistry, ToolRegistryBuilder,
};
pub use schema::{ParamType, RuleSet, ValidationRule};
pub use trait_::{
    AuthStatus, EvidenceSource, FailureKind, SourceKind, ToolFailure, ToolHandler, ToolOutput,
};
pub use validate::{check_path_safety, validate_parameters, ValidationResult};
