//! Combat event bus.
//!
//! The combat core is headless; sounds, floating damage numbers and
//! UI reactions hang off these events instead of being called
//! directly. Publishing never blocks: when the channel is full the
//! event is dropped.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use ashfall_common::{EntityId, Millis};

use crate::entity::EnemyKind;
use crate::volumes::ProjectileKind;

/// Events emitted by the combat core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// An enemy entered the world
    EnemySpawned {
        /// Enemy id
        id: EntityId,
        /// Archetype
        kind: EnemyKind,
        /// Level rolled at spawn
        level: u32,
    },
    /// The player started a sword swing
    SwordSwung {
        /// Attacker id
        attacker: EntityId,
    },
    /// A projectile left its bow or caster
    ArrowFired {
        /// Attacker id
        attacker: EntityId,
        /// Arrow or death bullet
        kind: ProjectileKind,
    },
    /// A wizard summoned a thunder column
    ThunderSummoned {
        /// Caster id
        caster: EntityId,
    },
    /// The player's shield deflected a hit
    ShieldBlocked {
        /// Id of the enemy whose hit was blocked
        attacker: EntityId,
        /// Whether the block also stunned the attacker
        stunned: bool,
    },
    /// Damage was applied to an entity
    DamageDealt {
        /// Damaged entity
        target: EntityId,
        /// Damage after armor scaling
        amount: f32,
        /// Whether the hit was lethal
        lethal: bool,
    },
    /// The player gained experience from a kill
    ExperienceGained {
        /// Amount awarded
        amount: u32,
        /// Level-ups triggered by this award
        levels_gained: u32,
    },
    /// An enemy was killed
    EnemyKilled {
        /// Enemy id
        id: EntityId,
        /// Archetype
        kind: EnemyKind,
    },
    /// A dead enemy's corpse left the world
    EnemyDespawned {
        /// Enemy id
        id: EntityId,
        /// Archetype
        kind: EnemyKind,
        /// Corpse x position
        x: f32,
        /// Corpse y position
        y: f32,
    },
    /// The player died
    PlayerDied {
        /// Time of death
        at: Millis,
    },
    /// The player's death latency elapsed
    GameOver,
}

/// Event bus for broadcasting combat events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<CombatEvent>,
    /// Receiver for collecting events
    receiver: Receiver<CombatEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event to the bus.
    pub fn publish(&self, event: CombatEvent) {
        // Non-blocking send - if full, event is dropped
        let _ = self.sender.try_send(event);
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<CombatEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<CombatEvent> {
        self.sender.clone()
    }
}
