mod handler;
pub mod model;

pub use handler::{get_me, login, request_code, update_user};
