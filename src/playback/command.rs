use tokio::sync::oneshot;

use crate::error::Result;
use crate::playback::position::{Position, Status};
use crate::provider::Album;

pub(crate) type Reply<T> = oneshot::Sender<Result<T>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    NextTrack,
    PreviousTrack,
    NextAlbum,
    PreviousAlbum,
}

/// Outcome of a navigation command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved(Position),
    /// Nothing to move to; position unchanged.
    NoTarget,
    /// An automatic advance already moved past the position this command
    /// was issued against, so it was dropped.
    Coalesced,
}

pub(crate) enum Command {
    Initialize(Reply<()>),
    LoadAlbum {
        slot: usize,
        album: Album,
        reply: Reply<()>,
    },
    RemoveAlbum {
        slot: usize,
        reply: Reply<Option<Album>>,
    },
    TogglePlayPause(Reply<Status>),
    Navigate {
        step: Step,
        /// Generation of the snapshot the caller acted on.
        seen: u64,
        reply: Reply<Advance>,
    },
    SelectSlot {
        slot: usize,
        reply: Reply<()>,
    },
    SetVolume {
        percent: u8,
        reply: Reply<u8>,
    },
    Seek {
        position_ms: u64,
        reply: Reply<()>,
    },
    Disconnect(Reply<()>),
    Shutdown(oneshot::Sender<()>),
}
