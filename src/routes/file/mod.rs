pub mod model;

mod handler;

pub use handler::{delete_file, get_files, share_file};
