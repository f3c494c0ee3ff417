pub mod file_handler;
pub mod share_handler;

pub use file_handler::*;
pub use share_handler::*;
