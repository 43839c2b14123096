use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Slot layout of the 63-dimensional gameplay observation vector.
///
/// Entity groups are sorted nearest-first by the game, so the first slot of
/// each group is the nearest instance. Absent entities report distance 1.0.
pub mod offsets {
    pub const PLAYER_X: usize = 0;
    pub const PLAYER_Y: usize = 1;
    pub const PLAYER_ROTATION: usize = 2;
    pub const PLAYER_HEALTH: usize = 3;
    pub const PLAYER_SHIELDS: usize = 4;
    pub const PLAYER_SPEED: usize = 5;

    pub const ENEMY_BASE: usize = 6;
    pub const ENEMY_STRIDE: usize = 3;
    pub const ENEMY_COUNT: usize = 5;
    pub const NEAREST_ENEMY_DIST: usize = 6;
    pub const NEAREST_ENEMY_ANGLE: usize = 7;

    pub const ASTEROID_BASE: usize = 21;
    pub const ASTEROID_STRIDE: usize = 2;
    pub const ASTEROID_COUNT: usize = 5;
    pub const NEAREST_ASTEROID_DIST: usize = 21;
    pub const NEAREST_ASTEROID_ANGLE: usize = 22;

    pub const PRIMARY_COOLDOWN: usize = 31;
    pub const MISSILE_COOLDOWN: usize = 32;
    pub const MISSILE_AMMO: usize = 33;
    pub const LASER_COOLDOWN: usize = 34;
    pub const LASER_CHARGES: usize = 35;

    pub const TRACTOR_CHARGE: usize = 36;
    pub const TRACTOR_ACTIVE: usize = 37;

    pub const SCORE: usize = 38;
    pub const LEVEL: usize = 39;

    pub const BULLET_BASE: usize = 40;
    pub const BULLET_STRIDE: usize = 2;
    pub const BULLET_COUNT: usize = 5;
    pub const NEAREST_BULLET_DIST: usize = 40;
    pub const NEAREST_BULLET_ANGLE: usize = 41;

    pub const CARGO_DIST: usize = 50;
    pub const CARGO_ANGLE: usize = 51;
    pub const CARGO_HEALTH: usize = 52;
    pub const CARGO_DIRECTION: usize = 53;

    pub const CREW_SHIELDS_LOAD: usize = 54;
    pub const CREW_ENGINEERING_LOAD: usize = 55;
    pub const CREW_WEAPONS_LOAD: usize = 56;
    pub const CREW_NAVIGATION_LOAD: usize = 57;

    pub const UPGRADE_MENU: usize = 58;

    pub const POWERUP_BASE: usize = 59;
    pub const POWERUP_STRIDE: usize = 2;
    pub const POWERUP_COUNT: usize = 2;
}

/// Error raised when an observation, artifact or parameter block disagrees
/// with the schema it is supposed to conform to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaMismatch {
    /// Observation slice length differs from the schema's obs_dim
    ObservationLength { expected: usize, found: usize },
    /// Network or artifact dimensions differ from the schema
    Dimensions {
        expected_obs: usize,
        expected_actions: usize,
        found_obs: usize,
        found_actions: usize,
    },
    /// Schema version name is not known to this build
    UnknownVersion(String),
    /// Artifact does not carry the full set of parameter blocks
    BlockCount { expected: usize, found: usize },
    /// One parameter block's shape differs from the network's
    BlockShape {
        name: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    /// One parameter block's flat data length does not match its shape
    BlockLength {
        name: String,
        expected: usize,
        found: usize,
    },
    /// A named block does not belong to this network layout
    UnknownBlockName(String),
    /// Two blocks claim the same identity
    DuplicateBlockName(String),
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaMismatch::ObservationLength { expected, found } => {
                write!(
                    f,
                    "Observation has {} dimensions, schema expects {}",
                    found, expected
                )
            }
            SchemaMismatch::Dimensions {
                expected_obs,
                expected_actions,
                found_obs,
                found_actions,
            } => {
                write!(
                    f,
                    "Dimension mismatch: found {}x{}, schema expects {}x{}",
                    found_obs, found_actions, expected_obs, expected_actions
                )
            }
            SchemaMismatch::UnknownVersion(name) => {
                write!(f, "Unknown observation schema version '{}'", name)
            }
            SchemaMismatch::BlockCount { expected, found } => {
                write!(f, "Artifact has {} weight blocks, expected {}", found, expected)
            }
            SchemaMismatch::BlockShape {
                name,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Block '{}' has shape {:?}, expected {:?}",
                    name, found, expected
                )
            }
            SchemaMismatch::BlockLength {
                name,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Block '{}' carries {} values, expected {}",
                    name, found, expected
                )
            }
            SchemaMismatch::UnknownBlockName(name) => {
                write!(f, "Block name '{}' is not part of the network layout", name)
            }
            SchemaMismatch::DuplicateBlockName(name) => {
                write!(f, "Block name '{}' appears more than once", name)
            }
        }
    }
}

impl Error for SchemaMismatch {}

/// Versioned description of an observation/action contract.
///
/// Every component that touches raw vectors (generator, heuristic scorer,
/// network, artifact restore) is constructed against one of these and
/// validates against it instead of trusting bare array lengths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationSchema {
    version: String,
    obs_dim: usize,
    action_dim: usize,
    hidden_dim: usize,
}

impl ObservationSchema {
    /// Current gameplay schema: 63 observation slots, 20 actions.
    pub fn heuristic_v2() -> Self {
        Self {
            version: "heuristic-v2".to_string(),
            obs_dim: 63,
            action_dim: 20,
            hidden_dim: crate::config::constants::PRETRAIN_HIDDEN_DIM,
        }
    }

    /// Recorded-demonstration schema: 40 observation slots, 11 actions.
    pub fn demo_v1() -> Self {
        Self {
            version: "demo-v1".to_string(),
            obs_dim: 40,
            action_dim: 11,
            hidden_dim: crate::config::constants::DEMO_HIDDEN_DIM,
        }
    }

    /// Looks up a schema by its version name.
    pub fn by_name(name: &str) -> Result<Self, SchemaMismatch> {
        match name {
            "heuristic-v2" => Ok(Self::heuristic_v2()),
            "demo-v1" => Ok(Self::demo_v1()),
            other => Err(SchemaMismatch::UnknownVersion(other.to_string())),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn obs_dim(&self) -> usize {
        self.obs_dim
    }

    pub fn action_dim(&self) -> usize {
        self.action_dim
    }

    pub fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    /// Checks that an observation slice has exactly obs_dim entries.
    pub fn check_observation(&self, obs: &[f32]) -> Result<(), SchemaMismatch> {
        if obs.len() == self.obs_dim {
            Ok(())
        } else {
            Err(SchemaMismatch::ObservationLength {
                expected: self.obs_dim,
                found: obs.len(),
            })
        }
    }

    /// Checks a foreign (obs_dim, action_dim) pair against this schema.
    pub fn check_dims(&self, obs_dim: usize, action_dim: usize) -> Result<(), SchemaMismatch> {
        if obs_dim == self.obs_dim && action_dim == self.action_dim {
            Ok(())
        } else {
            Err(SchemaMismatch::Dimensions {
                expected_obs: self.obs_dim,
                expected_actions: self.action_dim,
                found_obs: obs_dim,
                found_actions: action_dim,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_schema_dimensions() {
        let schema = ObservationSchema::heuristic_v2();
        assert_eq!(schema.obs_dim(), 63);
        assert_eq!(schema.action_dim(), 20);
        assert_eq!(schema.hidden_dim(), 256);
        assert_eq!(schema.version(), "heuristic-v2");
    }

    #[test]
    fn test_demo_schema_dimensions() {
        let schema = ObservationSchema::demo_v1();
        assert_eq!(schema.obs_dim(), 40);
        assert_eq!(schema.action_dim(), 11);
        assert_eq!(schema.hidden_dim(), 128);
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(
            ObservationSchema::by_name("heuristic-v2").unwrap(),
            ObservationSchema::heuristic_v2()
        );
        assert!(matches!(
            ObservationSchema::by_name("heuristic-v1"),
            Err(SchemaMismatch::UnknownVersion(_))
        ));
    }

    #[test]
    fn test_observation_length_check() {
        let schema = ObservationSchema::heuristic_v2();
        assert!(schema.check_observation(&vec![0.0; 63]).is_ok());
        let err = schema.check_observation(&vec![0.0; 59]).unwrap_err();
        assert_eq!(
            err,
            SchemaMismatch::ObservationLength {
                expected: 63,
                found: 59
            }
        );
    }

    #[test]
    fn test_dimension_check() {
        let schema = ObservationSchema::demo_v1();
        assert!(schema.check_dims(40, 11).is_ok());
        assert!(schema.check_dims(63, 20).is_err());
    }
}
