//! Domain types for session tasks.

mod error;
mod task;

pub use crate::ids::TaskId;
pub use error::{ParseTaskStatusError, TaskDomainError};
pub use task::{PersistedTaskData, Task, TaskStatus};
