pub mod model;

mod handler;

pub use handler::{create_task, get_tasks, update_task};
