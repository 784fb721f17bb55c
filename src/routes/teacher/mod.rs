pub mod model;

mod handler;

pub use handler::{get_me, list_teachers, login, match_teachers, update_profile};
