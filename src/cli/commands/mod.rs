pub mod auth;
pub mod play;
pub mod rack;
pub mod utils;
