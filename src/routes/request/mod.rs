pub mod model;

mod handler;

pub use handler::{
    finalize_request, get_group_requests, get_pending_admin_requests, get_teacher_requests,
    respond_request, send_request,
};
