mod handler;
pub mod model;

pub use handler::{
    accept_invite, cancel_invite, create_game, decline_invite, delete_game, get_game,
    get_game_invites, get_my_games, invite_to_game, join_game, leave_game, set_game_list,
    update_game, update_game_member,
};
