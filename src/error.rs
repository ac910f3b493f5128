//! Error types for the changer

use thiserror::Error;

/// Errors surfaced by the orchestrator and its collaborators.
///
/// None of these are fatal: every failure leaves the rack and the persisted
/// volume untouched.
#[derive(Debug, Error)]
pub enum ChangerError {
    /// No device has ever reported ready, so there is nothing to play on
    #[error("No active device. Wait for the player to initialize.")]
    NoActiveDevice,

    /// Slot index outside the rack
    #[error("Invalid slot: {0} (rack has {} slots)", crate::state::RACK_SIZE)]
    InvalidSlot(usize),

    /// Transient failure talking to the device
    #[error("Device call failed: {0}")]
    DeviceCallFailed(String),

    /// The device session could not be established
    #[error("Device initialization failed: {0}")]
    InitializationFailed(String),

    /// Persistent store could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// Catalog lookup failed
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// The orchestrator task is no longer running
    #[error("Orchestrator is not running")]
    Closed,
}

impl ChangerError {
    pub(crate) fn device(err: anyhow::Error) -> Self {
        Self::DeviceCallFailed(format!("{err:#}"))
    }

    pub(crate) fn storage(err: anyhow::Error) -> Self {
        Self::Storage(format!("{err:#}"))
    }
}

/// Result type for changer operations
pub type Result<T> = std::result::Result<T, ChangerError>;
