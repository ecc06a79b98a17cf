use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// The closed set of stateful scene object kinds tracked for save/load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatefulKind {
    LootContainer,
    ActionDoor,
    ActionObject,
    Enemy,
}

impl StatefulKind {
    pub const ALL: [StatefulKind; 4] = [
        StatefulKind::LootContainer,
        StatefulKind::ActionDoor,
        StatefulKind::ActionObject,
        StatefulKind::Enemy,
    ];
}

/// The persisted state of one tracked object, one variant per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StateRecord {
    LootContainer {
        load_id: u64,
        /// Dropped at runtime rather than authored into the scene; such
        /// containers are respawned on load instead of looked up.
        custom_drop: bool,
        items: Vec<String>,
    },
    ActionDoor {
        load_id: u64,
        open: bool,
        locked: bool,
    },
    ActionObject {
        load_id: u64,
        activated: bool,
    },
    Enemy {
        load_id: u64,
        mobile_id: u32,
        health: i32,
        position: [f32; 3],
    },
}

impl StateRecord {
    pub fn load_id(&self) -> u64 {
        match *self {
            StateRecord::LootContainer { load_id, .. }
            | StateRecord::ActionDoor { load_id, .. }
            | StateRecord::ActionObject { load_id, .. }
            | StateRecord::Enemy { load_id, .. } => load_id,
        }
    }

    pub fn kind(&self) -> StatefulKind {
        match self {
            StateRecord::LootContainer { .. } => StatefulKind::LootContainer,
            StateRecord::ActionDoor { .. } => StatefulKind::ActionDoor,
            StateRecord::ActionObject { .. } => StatefulKind::ActionObject,
            StateRecord::Enemy { .. } => StatefulKind::Enemy,
        }
    }

    pub fn is_custom_drop(&self) -> bool {
        matches!(
            self,
            StateRecord::LootContainer {
                custom_drop: true,
                ..
            }
        )
    }
}

/// The persisted state of the singleton player object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub position: [f32; 3],
    pub health: i32,
    pub gold: u32,
}

/// Capability of a scene object that takes part in save/load. The object
/// supplies its own bucket tag through [`StatefulObject::kind`]; the manager
/// never inspects concrete types.
pub trait StatefulObject {
    /// The non-zero identifier that survives save/load cycles.
    fn load_id(&self) -> u64;
    fn kind(&self) -> StatefulKind;
    /// Transient objects opt out of snapshots by returning false.
    fn should_save(&self) -> bool {
        true
    }
    fn capture(&self) -> StateRecord;
    fn apply(&mut self, record: &StateRecord);
}

/// Capability of the singleton player object.
pub trait PlayerObject {
    fn capture(&self) -> PlayerRecord;
    fn apply(&mut self, record: &PlayerRecord);
}

/// Creates live objects for records whose subject no longer exists in the
/// scene (slain-foe loot drops, dynamically spawned enemies). Returning
/// `None` declines the spawn and the record is skipped.
pub trait Spawner {
    fn spawn(&mut self, record: &StateRecord) -> Option<Box<dyn StatefulObject>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    /// The object or record carries load id 0, which is reserved.
    InvalidLoadId,
    /// A record handed to `restore` belongs to a different bucket.
    KindMismatch {
        expected: StatefulKind,
        found: StatefulKind,
    },
}

impl Display for StateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StateError::InvalidLoadId => write!(f, "object does not have a valid load id"),
            StateError::KindMismatch { expected, found } => {
                write!(f, "expected a {:?} record, found {:?}", expected, found)
            }
        }
    }
}

impl std::error::Error for StateError {}

type Bucket = HashMap<u64, Box<dyn StatefulObject>>;

/// Tracks live instances of the four stateful object kinds plus the player,
/// keyed by load id, and walks them to snapshot and restore scene state.
#[derive(Default)]
pub struct StateManager {
    buckets: [Bucket; 4],
    player: Option<Box<dyn PlayerObject>>,
}

impl StateManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a stateful object into the bucket its own kind names.
    ///
    /// A duplicate load id within the bucket is a scene-authoring mistake:
    /// the new object is dropped with a warning and the original stays
    /// tracked. Only a zero load id is a hard error.
    pub fn register(&mut self, object: Box<dyn StatefulObject>) -> Result<(), StateError> {
        if object.load_id() == 0 {
            return Err(StateError::InvalidLoadId);
        }
        let kind = object.kind();
        match self.buckets[kind as usize].entry(object.load_id()) {
            Entry::Occupied(_) => {
                log::warn!(
                    "Duplicate load id {} for {:?} object, it will not be tracked",
                    object.load_id(),
                    kind
                );
                Ok(())
            }
            Entry::Vacant(slot) => {
                slot.insert(object);
                Ok(())
            }
        }
    }

    pub fn register_player(&mut self, player: Box<dyn PlayerObject>) {
        self.player = Some(player);
    }

    pub fn deregister(&mut self, kind: StatefulKind, load_id: u64) -> Result<(), StateError> {
        if load_id == 0 {
            return Err(StateError::InvalidLoadId);
        }
        self.buckets[kind as usize].remove(&load_id);
        Ok(())
    }

    /// Deregisters an object by asking it for its own kind and load id.
    pub fn deregister_obj(&mut self, object: &dyn StatefulObject) -> Result<(), StateError> {
        self.deregister(object.kind(), object.load_id())
    }

    /// Empties every bucket; optionally drops the player as well.
    pub fn clear(&mut self, keep_player: bool) {
        if !keep_player {
            self.player = None;
        }
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }

    pub fn contains(&self, kind: StatefulKind, load_id: u64) -> bool {
        self.buckets[kind as usize].contains_key(&load_id)
    }

    pub fn len(&self, kind: StatefulKind) -> usize {
        self.buckets[kind as usize].len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|bucket| bucket.is_empty())
    }

    pub fn has_player(&self) -> bool {
        self.player.is_some()
    }

    /// State records for every tracked object in `kind` that wants to be
    /// saved, ordered by load id so snapshots are stable.
    pub fn snapshot(&self, kind: StatefulKind) -> Vec<StateRecord> {
        let mut records: Vec<StateRecord> = self.buckets[kind as usize]
            .values()
            .filter(|object| object.should_save())
            .map(|object| object.capture())
            .collect();
        records.sort_by_key(|record| record.load_id());
        records
    }

    pub fn snapshot_player(&self) -> Option<PlayerRecord> {
        self.player.as_ref().map(|player| player.capture())
    }

    /// Applies saved records to the live objects in `kind`.
    ///
    /// Records whose load id is not present are skipped, except enemies and
    /// custom-drop loot containers: those were created at runtime and are
    /// spawned afresh through `spawner`, registered, and then restored.
    pub fn restore(
        &mut self,
        kind: StatefulKind,
        records: &[StateRecord],
        spawner: &mut dyn Spawner,
    ) -> Result<(), StateError> {
        for record in records {
            if record.kind() != kind {
                return Err(StateError::KindMismatch {
                    expected: kind,
                    found: record.kind(),
                });
            }
            let load_id = record.load_id();
            if load_id == 0 {
                return Err(StateError::InvalidLoadId);
            }

            if let Some(object) = self.buckets[kind as usize].get_mut(&load_id) {
                object.apply(record);
            } else if kind == StatefulKind::Enemy || record.is_custom_drop() {
                let Some(mut object) = spawner.spawn(record) else {
                    log::warn!("Spawner declined {:?} record {}", kind, load_id);
                    continue;
                };
                object.apply(record);
                self.register(object)?;
            }
        }
        Ok(())
    }

    pub fn restore_player(&mut self, record: &PlayerRecord) {
        if let Some(player) = self.player.as_mut() {
            player.apply(record);
        }
    }
}
