//! A twelve-slot album changer driving a remote Spotify Connect device.

pub mod error;
pub mod playback;
pub mod provider;
pub mod state;

pub use error::{ChangerError, Result};
