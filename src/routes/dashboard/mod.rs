pub mod model;

mod handler;

pub use handler::{
    confirm_clear_all, create_teacher, get_all_data, get_stats, login, request_clear_all,
};
