pub mod task;

pub use task::{CreateTaskInput, SearchQuery, Task, UpdateTaskInput};
