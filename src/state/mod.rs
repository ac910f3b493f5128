mod config;
pub mod rack;
pub mod store;

pub use config::Config;
pub use rack::{Rack, RackStore, RACK_SIZE};
pub use store::Store;
