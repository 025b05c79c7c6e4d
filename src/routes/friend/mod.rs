mod handler;
pub mod model;

pub use handler::{add_friend, find_friends, get_friends, remove_friend};
