pub mod model;

mod handler;

pub use handler::{create_message, get_messages};
