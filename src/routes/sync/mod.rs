pub mod model;

mod handler;

pub use handler::{import_frontend_data, sync_status};
