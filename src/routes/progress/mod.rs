pub mod model;

mod handler;

pub use handler::{get_progress_reports, review_progress, submit_progress};
