pub mod model;

mod handler;

pub use handler::{
    cancel_invitation, create_group, get_group_invitations, get_my_group, get_my_invitations,
    invite_student, remove_member, respond_to_invitation,
};
