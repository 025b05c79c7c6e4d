mod handler;
pub mod model;

pub use handler::{create_list, delete_list, get_list, get_lists, update_list};
