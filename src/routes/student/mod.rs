pub mod model;

mod handler;

pub use handler::{get_me, login, register, search_students, update_profile};
