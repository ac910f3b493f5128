pub mod spotify;
mod traits;
mod types;

pub use spotify::SpotifyProvider;
pub use traits::{fetch_album, group_by_album, lookup_album, Catalog};
pub use types::*;
