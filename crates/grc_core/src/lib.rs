//! grctool core types
//!
//! Pure types shared by every crate in the workspace: the correlation ID
//! threaded through one tool invocation, wall-clock and elapsed time, and
//! the core error type.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod id;
pub mod time;

// Re-exports
pub use error::{CoreError, CoreResult};
pub use id::CorrelationId;
pub use time::{Stopwatch, Timestamp};
