pub mod model;

mod handler;

pub use handler::{create_meeting, get_meetings, update_meeting_status};
