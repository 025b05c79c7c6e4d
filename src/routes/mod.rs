pub mod feed;
pub mod friend;
pub mod game;
pub mod group;
pub mod list;
pub mod user;
