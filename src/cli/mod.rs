pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "changer")]
#[command(about = "A twelve-disc album changer for Spotify Connect", long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding config.toml and the persisted rack
    #[arg(short, long, global = true, default_value = ".changer")]
    pub dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Authorize with Spotify
    Auth,

    /// Search the catalog and list matching albums
    Search {
        query: String,
    },

    /// Load an album into a rack slot (album id or open.spotify.com URL)
    Load {
        slot: usize,
        album: String,
    },

    /// Empty a rack slot
    Remove {
        slot: usize,
    },

    /// Show the rack
    Rack,

    /// Show or set the playback volume (0-100)
    Volume {
        percent: Option<u8>,
    },

    /// Forget stored credentials and the remembered device
    Logout,

    /// Start an interactive playback session
    Play {
        /// Slot to start from
        #[arg(short, long)]
        slot: Option<usize>,
    },
}
