use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ChangerError, Result};
use crate::provider::Album;
use crate::state::store::{Store, RACK_KEY};

pub const RACK_SIZE: usize = 12;

/// Twelve album slots. The slot count never changes; only contents are swapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Option<Album>>", into = "Vec<Option<Album>>")]
pub struct Rack {
    slots: [Option<Album>; RACK_SIZE],
}

impl Default for Rack {
    fn default() -> Self {
        Self {
            slots: Default::default(),
        }
    }
}

impl TryFrom<Vec<Option<Album>>> for Rack {
    type Error = String;

    fn try_from(slots: Vec<Option<Album>>) -> std::result::Result<Self, Self::Error> {
        let len = slots.len();
        let slots = slots
            .try_into()
            .map_err(|_| format!("rack must have {} slots, found {}", RACK_SIZE, len))?;
        Ok(Self { slots })
    }
}

impl From<Rack> for Vec<Option<Album>> {
    fn from(rack: Rack) -> Self {
        rack.slots.into()
    }
}

impl Rack {
    pub fn check_slot(slot: usize) -> Result<()> {
        if slot < RACK_SIZE {
            Ok(())
        } else {
            Err(ChangerError::InvalidSlot(slot))
        }
    }

    /// Album in `slot`, or `None` for an empty or out-of-range slot.
    pub fn get(&self, slot: usize) -> Option<&Album> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn is_playable(&self, slot: usize) -> bool {
        self.get(slot).is_some_and(Album::is_playable)
    }

    pub fn slots(&self) -> impl Iterator<Item = (usize, Option<&Album>)> {
        self.slots.iter().map(Option::as_ref).enumerate()
    }

    pub fn loaded_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn with_album(mut self, slot: usize, album: Album) -> Result<Self> {
        Self::check_slot(slot)?;
        self.slots[slot] = Some(album);
        Ok(self)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// The rack plus its write-through persistence.
pub struct RackStore {
    rack: Rack,
    store: Store,
}

impl RackStore {
    /// Restore the rack from the store. A missing or unreadable rack starts empty.
    pub fn open(store: Store) -> Self {
        let rack = match store.get::<Rack>(RACK_KEY) {
            Ok(Some(rack)) => {
                info!(loaded = rack.loaded_count(), "restored rack");
                rack
            }
            Ok(None) => Rack::default(),
            Err(e) => {
                warn!("Stored rack is unreadable, starting empty: {:#}", e);
                Rack::default()
            }
        };

        Self { rack, store }
    }

    pub fn rack(&self) -> &Rack {
        &self.rack
    }

    /// Put `album` in `slot`, replacing whatever was there.
    pub fn load(&mut self, slot: usize, album: Album) -> Result<()> {
        Rack::check_slot(slot)?;
        let mut next = self.rack.clone();
        next.slots[slot] = Some(album);
        self.commit(next)
    }

    /// Empty `slot`, returning what it held.
    pub fn remove(&mut self, slot: usize) -> Result<Option<Album>> {
        Rack::check_slot(slot)?;
        let mut next = self.rack.clone();
        let removed = next.slots[slot].take();
        self.commit(next)?;
        Ok(removed)
    }

    fn commit(&mut self, next: Rack) -> Result<()> {
        self.store
            .put(RACK_KEY, &next)
            .map_err(ChangerError::storage)?;
        self.rack = next;
        Ok(())
    }
}
