pub mod model;

mod handler;

pub use handler::{
    generate_full_proposal, generate_title, get_my_proposal, improve_description, save_proposal,
    submit_proposal, suggest_keywords,
};
