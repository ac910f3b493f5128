mod command;
pub mod device;
pub mod orchestrator;
pub mod poll;
pub mod position;
pub mod sequencer;
pub mod spotify;

pub use command::{Advance, Step};
pub use device::{DeviceAdapter, DeviceBackend, DeviceReport, PlaybackState, DEFAULT_VOLUME};
pub use orchestrator::{Orchestrator, OrchestratorHandle, PlaybackSession, Snapshot};
pub use position::{Cause, Position, Status};
pub use spotify::SpotifyPlayer;
