mod handler;
pub mod model;

pub use handler::{
    cancel_group_invite, create_group, decline_group_invite, delete_group, find_groups, get_group,
    get_group_invites, get_my_groups, invite_to_group, join_group, leave_group,
    remove_group_member, update_group, update_group_member,
};
