pub mod messages;
pub mod config;
pub mod utils;
pub mod models;

pub use messages::*;
pub use config::*;
pub use utils::*;
pub use models::*;
