#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the gridvault simulation.
//!
//! This crate defines the vocabulary that connects the world, the systems,
//! and the adapters: object kinds, entity and theme identifiers, the discrete
//! action encoding, per-step result data, the typed options registry, the
//! named channel registry used to publish observations, and the scene
//! contract consumed by render backends. Everything here is plain data;
//! behaviour lives in the system crates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod channels;
pub mod options;
pub mod scene;

/// Maximum number of key/door themes a level may carry.
pub const MAX_THEMES: usize = 3;

/// Semantic kind attached to every grid cell and entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Open floor the agent can traverse.
    Space,
    /// Impassable terrain. Also the out-of-bounds default.
    Wall,
    /// Door cell or entity that blocks until its themed key is collected.
    LockedDoor,
    /// Collectible key that opens the door sharing its theme.
    Key,
    /// Level goal; touching it completes the level.
    Exit,
    /// Water hazard; touching it applies a reward penalty.
    Water,
    /// Fire hazard; touching it applies a reward penalty.
    Fire,
    /// The agent itself.
    Player,
    /// Decorative collected-key indicator pinned to the screen corner.
    RingIcon,
}

impl ObjectKind {
    /// Stable byte code used by the `state` info channel.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Space => 0,
            Self::Wall => 1,
            Self::LockedDoor => 2,
            Self::Key => 3,
            Self::Exit => 4,
            Self::Water => 5,
            Self::Fire => 6,
            Self::Player => 7,
            Self::RingIcon => 8,
        }
    }
}

/// Index distinguishing otherwise-identical keys and doors.
///
/// A key opens exactly the doors that share its theme. Valid themes are
/// `0..MAX_THEMES`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Theme(u8);

impl Theme {
    /// Creates a theme index with the provided numeric value.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the theme.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }

    /// Theme value widened for indexing per-theme arrays.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Unique identifier assigned to an entity by the world.
///
/// Identifiers are allocated from a monotonically increasing counter and are
/// never reused, so a stale identifier resolves to nothing rather than to a
/// different entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// One discrete agent action.
///
/// Actions `0..=8` map onto the 3x3 velocity lattice; the reserved value
/// [`Action::RESET`] requests a forced episode end and is substituted with
/// the configured default action before movement resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action(i32);

impl Action {
    /// Sentinel action that forces the current episode to end.
    pub const RESET: Self = Self(-1);

    /// Creates an action with the provided numeric value.
    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the action.
    #[must_use]
    pub const fn get(&self) -> i32 {
        self.0
    }

    /// Reports whether this is the reserved forced-reset sentinel.
    #[must_use]
    pub const fn is_reset(&self) -> bool {
        self.0 == Self::RESET.0
    }
}

/// Transient per-step result mutated by collision handlers.
///
/// Cleared at the start of every step before any handler runs; `reward`
/// accumulates additively across all handlers that fire within the step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StepData {
    /// Reward accumulated during the step.
    pub reward: f32,
    /// Indicates the episode ended during the step.
    pub done: bool,
    /// Indicates the level was completed during the step.
    pub level_complete: bool,
}

impl StepData {
    /// Resets all fields to their between-step defaults.
    pub fn clear(&mut self) {
        self.reward = 0.0;
        self.done = false;
        self.level_complete = false;
    }
}

/// Fatal configuration errors detected while constructing an environment.
///
/// Every variant indicates a programming or configuration mistake; none is
/// produced after setup has succeeded.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SetupError {
    /// A provided option name was never registered.
    #[error("unknown option `{name}`")]
    UnknownOption {
        /// Name supplied by the caller.
        name: String,
    },
    /// A provided option value disagrees with the registered kind.
    #[error("option `{name}` expects {expected}, got {found}")]
    OptionKindMismatch {
        /// Name supplied by the caller.
        name: String,
        /// Kind declared at registration.
        expected: &'static str,
        /// Kind of the provided value.
        found: &'static str,
    },
    /// Key/door counts violate `0 <= doors <= keys <= 3`.
    #[error("invalid counts: {num_keys} keys, {num_doors} doors (need 0 <= doors <= keys <= 3)")]
    InvalidCounts {
        /// Requested number of keys.
        num_keys: i32,
        /// Requested number of doors.
        num_doors: i32,
    },
    /// The requested world dimension is not an odd value of at least 3.
    #[error("invalid world dimension {dim} (need an odd value >= 3)")]
    InvalidWorldDim {
        /// Requested interior dimension.
        dim: i32,
    },
    /// The configured default action is outside the discrete action space.
    #[error("invalid default action {action} (valid actions are 0..=8)")]
    InvalidDefaultAction {
        /// Action value supplied by the caller.
        action: i32,
    },
    /// No game variant is registered under the requested name.
    #[error("unknown game `{name}`")]
    UnknownGame {
        /// Name supplied by the caller.
        name: String,
    },
    /// A channel name was registered twice.
    #[error("channel `{name}` registered twice")]
    DuplicateChannel {
        /// Name of the colliding channel.
        name: String,
    },
    /// A connect call referenced a channel that was never registered.
    #[error("no channel registered under `{name}`")]
    UnknownChannel {
        /// Name supplied by the caller.
        name: String,
    },
    /// Connected memory does not match the channel descriptor's byte length.
    #[error("channel `{name}` expects {expected} bytes, got {found}")]
    ChannelSizeMismatch {
        /// Name of the channel being connected.
        name: String,
        /// Byte length implied by the descriptor.
        expected: usize,
        /// Byte length of the provided memory.
        found: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::{Action, EntityId, ObjectKind, SetupError, StepData, Theme};
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn object_kind_codes_are_unique() {
        let kinds = [
            ObjectKind::Space,
            ObjectKind::Wall,
            ObjectKind::LockedDoor,
            ObjectKind::Key,
            ObjectKind::Exit,
            ObjectKind::Water,
            ObjectKind::Fire,
            ObjectKind::Player,
            ObjectKind::RingIcon,
        ];
        for (left, kind) in kinds.iter().enumerate() {
            for other in &kinds[left + 1..] {
                assert_ne!(kind.code(), other.code());
            }
        }
    }

    #[test]
    fn reset_sentinel_is_detected() {
        assert!(Action::RESET.is_reset());
        assert!(Action::new(-1).is_reset());
        assert!(!Action::new(0).is_reset());
        assert!(!Action::new(4).is_reset());
    }

    #[test]
    fn step_data_clear_restores_defaults() {
        let mut data = StepData {
            reward: 3.5,
            done: true,
            level_complete: true,
        };
        data.clear();
        assert_eq!(data, StepData::default());
    }

    #[test]
    fn theme_index_widens_value() {
        assert_eq!(Theme::new(2).index(), 2);
        assert_eq!(Theme::new(2).get(), 2);
    }

    #[test]
    fn object_kind_round_trips_through_bincode() {
        assert_round_trip(&ObjectKind::LockedDoor);
    }

    #[test]
    fn theme_round_trips_through_bincode() {
        assert_round_trip(&Theme::new(1));
    }

    #[test]
    fn entity_id_round_trips_through_bincode() {
        assert_round_trip(&EntityId::new(42));
    }

    #[test]
    fn action_round_trips_through_bincode() {
        assert_round_trip(&Action::RESET);
        assert_round_trip(&Action::new(7));
    }

    #[test]
    fn step_data_round_trips_through_bincode() {
        let data = StepData {
            reward: -1.0,
            done: true,
            level_complete: false,
        };
        assert_round_trip(&data);
    }

    #[test]
    fn setup_error_messages_name_the_contract() {
        let err = SetupError::UnknownOption {
            name: "wall_chance_typo".to_owned(),
        };
        assert_eq!(err.to_string(), "unknown option `wall_chance_typo`");

        let err = SetupError::ChannelSizeMismatch {
            name: "rgb".to_owned(),
            expected: 12_288,
            found: 4,
        };
        assert_eq!(err.to_string(), "channel `rgb` expects 12288 bytes, got 4");
    }
}
