//! Task orchestration services.

mod listing;

pub use listing::{TaskService, TaskServiceError, TaskServiceResult};
