use std::fmt;

use crate::agent::actions::DroidAction;
use crate::agent::heuristic::ObservationFields;
use crate::config::constants::*;

/// Behavioural groups the scoring rules belong to.
///
/// Blocks mirror the priorities of the hand-written game pilot: dodge fire
/// first, fight, escort cargo, mine, capture, retreat, manage crew, and
/// spend upgrades when the menu is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleBlock {
    BulletEvasion,
    Combat,
    CargoEscort,
    AsteroidMining,
    EnemyCapture,
    Survival,
    CrewManagement,
    UpgradeSelection,
}

impl fmt::Display for RuleBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleBlock::BulletEvasion => "Bullet Evasion",
            RuleBlock::Combat => "Combat",
            RuleBlock::CargoEscort => "Cargo Escort",
            RuleBlock::AsteroidMining => "Asteroid Mining",
            RuleBlock::EnemyCapture => "Enemy Capture",
            RuleBlock::Survival => "Survival",
            RuleBlock::CrewManagement => "Crew Management",
            RuleBlock::UpgradeSelection => "Upgrade Selection",
        };
        write!(f, "{}", name)
    }
}

/// One scoring rule: when `applies` holds for an observation, `weight` is
/// added to the score of `action`.
///
/// Rules are plain data so the full table can be enumerated, printed and
/// tested one record at a time.
pub struct ScoreRule {
    pub block: RuleBlock,
    pub action: DroidAction,
    pub weight: f64,
    pub applies: fn(&ObservationFields) -> bool,
}

impl fmt::Display for ScoreRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} +{:.1}", self.block, self.action, self.weight)
    }
}

/// The full scoring table.
///
/// Scores are additive across records, so several blocks can push the same
/// action in one observation. The upgrade records encode the menu priority
/// chain directly in their predicates: health before shields before cargo
/// ally before ally.
pub static SCORE_RULES: [ScoreRule; 26] = [
    // Bullet evasion: sidestep frontal fire, duck under or climb over the rest
    ScoreRule {
        block: RuleBlock::BulletEvasion,
        action: DroidAction::MoveLeft,
        weight: BULLET_EVADE_WEIGHT,
        applies: |o| {
            o.nearest_bullet_dist < BULLET_DANGER_RANGE
                && o.nearest_bullet_angle.abs() < BULLET_FRONTAL_BAND
        },
    },
    ScoreRule {
        block: RuleBlock::BulletEvasion,
        action: DroidAction::MoveRight,
        weight: BULLET_EVADE_WEIGHT,
        applies: |o| {
            o.nearest_bullet_dist < BULLET_DANGER_RANGE
                && o.nearest_bullet_angle.abs() < BULLET_FRONTAL_BAND
        },
    },
    ScoreRule {
        block: RuleBlock::BulletEvasion,
        action: DroidAction::MoveDown,
        weight: BULLET_EVADE_WEIGHT,
        applies: |o| {
            o.nearest_bullet_dist < BULLET_DANGER_RANGE
                && o.nearest_bullet_angle > BULLET_FRONTAL_BAND
                && o.nearest_bullet_angle < BULLET_VERTICAL_BAND
        },
    },
    ScoreRule {
        block: RuleBlock::BulletEvasion,
        action: DroidAction::MoveUp,
        weight: BULLET_EVADE_WEIGHT,
        applies: |o| {
            o.nearest_bullet_dist < BULLET_DANGER_RANGE
                && o.nearest_bullet_angle > -BULLET_VERTICAL_BAND
                && o.nearest_bullet_angle < -BULLET_FRONTAL_BAND
        },
    },
    // Combat: open fire inside engagement range, keep the nose on target
    ScoreRule {
        block: RuleBlock::Combat,
        action: DroidAction::ShootPrimary,
        weight: PRIMARY_FIRE_WEIGHT,
        applies: |o| o.nearest_enemy_dist < ENEMY_ENGAGE_RANGE && o.primary_ready,
    },
    ScoreRule {
        block: RuleBlock::Combat,
        action: DroidAction::ShootMissile,
        weight: MISSILE_FIRE_WEIGHT,
        applies: |o| {
            o.nearest_enemy_dist < ENEMY_ENGAGE_RANGE
                && o.missile_ready
                && o.nearest_enemy_dist < MISSILE_RANGE
        },
    },
    ScoreRule {
        block: RuleBlock::Combat,
        action: DroidAction::ShootLaser,
        weight: LASER_FIRE_WEIGHT,
        applies: |o| {
            o.nearest_enemy_dist < ENEMY_ENGAGE_RANGE
                && o.laser_ready
                && o.nearest_enemy_dist < LASER_RANGE
        },
    },
    ScoreRule {
        block: RuleBlock::Combat,
        action: DroidAction::RotateRight,
        weight: ROTATE_TRACK_WEIGHT,
        applies: |o| {
            o.nearest_enemy_dist < ENEMY_ENGAGE_RANGE && o.nearest_enemy_angle > ROTATE_DEADZONE
        },
    },
    ScoreRule {
        block: RuleBlock::Combat,
        action: DroidAction::RotateLeft,
        weight: ROTATE_TRACK_WEIGHT,
        applies: |o| {
            o.nearest_enemy_dist < ENEMY_ENGAGE_RANGE && o.nearest_enemy_angle < -ROTATE_DEADZONE
        },
    },
    // Cargo escort: close the gap to a healthy cargo ship that drifted away
    ScoreRule {
        block: RuleBlock::CargoEscort,
        action: DroidAction::MoveRight,
        weight: CARGO_PURSUIT_WEIGHT,
        applies: |o| o.cargo_needs_escort() && o.cargo_angle > CARGO_STEER_DEADZONE,
    },
    ScoreRule {
        block: RuleBlock::CargoEscort,
        action: DroidAction::MoveLeft,
        weight: CARGO_PURSUIT_WEIGHT,
        applies: |o| o.cargo_needs_escort() && o.cargo_angle < -CARGO_STEER_DEADZONE,
    },
    ScoreRule {
        block: RuleBlock::CargoEscort,
        action: DroidAction::MoveDown,
        weight: CARGO_PURSUIT_WEIGHT,
        applies: |o| {
            o.cargo_needs_escort()
                && o.cargo_angle > CARGO_VERTICAL_MIN
                && o.cargo_angle < CARGO_VERTICAL_MAX
        },
    },
    ScoreRule {
        block: RuleBlock::CargoEscort,
        action: DroidAction::MoveUp,
        weight: CARGO_PURSUIT_WEIGHT,
        applies: |o| {
            o.cargo_needs_escort()
                && o.cargo_angle > -CARGO_VERTICAL_MAX
                && o.cargo_angle < -CARGO_VERTICAL_MIN
        },
    },
    // Asteroid mining: chip close rocks, tractor the ones in the sweet spot
    ScoreRule {
        block: RuleBlock::AsteroidMining,
        action: DroidAction::ShootPrimary,
        weight: ASTEROID_FIRE_WEIGHT,
        applies: |o| o.nearest_asteroid_dist < ASTEROID_MINING_RANGE && o.primary_ready,
    },
    ScoreRule {
        block: RuleBlock::AsteroidMining,
        action: DroidAction::ActivateTractor,
        weight: TRACTOR_ASTEROID_WEIGHT,
        applies: |o| {
            o.nearest_asteroid_dist < ASTEROID_MINING_RANGE
                && o.tractor_ready
                && o.nearest_asteroid_dist > TRACTOR_ASTEROID_MIN
                && o.nearest_asteroid_dist < TRACTOR_ASTEROID_MAX
        },
    },
    // Enemy capture: drag mid-range enemies in with the tractor beam
    ScoreRule {
        block: RuleBlock::EnemyCapture,
        action: DroidAction::ActivateTractor,
        weight: TRACTOR_ENEMY_WEIGHT,
        applies: |o| {
            o.tractor_ready
                && o.nearest_enemy_dist > TRACTOR_ENEMY_MIN
                && o.nearest_enemy_dist < TRACTOR_ENEMY_MAX
        },
    },
    // Survival: break contact when hull or shields are low
    ScoreRule {
        block: RuleBlock::Survival,
        action: DroidAction::MoveLeft,
        weight: RETREAT_WEIGHT,
        applies: |o| o.needs_retreat() && o.nearest_enemy_angle > 0.0,
    },
    ScoreRule {
        block: RuleBlock::Survival,
        action: DroidAction::MoveRight,
        weight: RETREAT_WEIGHT,
        applies: |o| o.needs_retreat() && o.nearest_enemy_angle <= 0.0,
    },
    ScoreRule {
        block: RuleBlock::Survival,
        action: DroidAction::MoveDown,
        weight: RETREAT_WEIGHT,
        applies: |o| o.needs_retreat() && o.nearest_enemy_angle.abs() < RETREAT_FRONTAL_BAND,
    },
    // Crew management: staff whichever station covers the current problem
    ScoreRule {
        block: RuleBlock::CrewManagement,
        action: DroidAction::AssignCrewShields,
        weight: CREW_ASSIGN_WEIGHT,
        applies: |o| {
            o.player_shields < CREW_SHIELDS_NEED && o.crew_shields_load < CREW_LOAD_CAP
        },
    },
    ScoreRule {
        block: RuleBlock::CrewManagement,
        action: DroidAction::AssignCrewEngineering,
        weight: CREW_ASSIGN_WEIGHT,
        applies: |o| {
            o.player_health < CREW_ENGINEERING_NEED && o.crew_engineering_load < CREW_LOAD_CAP
        },
    },
    ScoreRule {
        block: RuleBlock::CrewManagement,
        action: DroidAction::AssignCrewWeapons,
        weight: CREW_ASSIGN_WEIGHT,
        applies: |o| {
            o.nearest_enemy_dist < ENEMY_ENGAGE_RANGE && o.crew_weapons_load < CREW_LOAD_CAP
        },
    },
    // Upgrade selection: priority chain, one pick per open menu
    ScoreRule {
        block: RuleBlock::UpgradeSelection,
        action: DroidAction::SelectUpgradeHealth,
        weight: UPGRADE_HEALTH_WEIGHT,
        applies: |o| o.upgrade_menu_open && o.player_health < UPGRADE_HEALTH_NEED,
    },
    ScoreRule {
        block: RuleBlock::UpgradeSelection,
        action: DroidAction::SelectUpgradeShields,
        weight: UPGRADE_SHIELDS_WEIGHT,
        applies: |o| {
            o.upgrade_menu_open
                && o.player_health >= UPGRADE_HEALTH_NEED
                && o.player_shields < UPGRADE_SHIELDS_NEED
        },
    },
    ScoreRule {
        block: RuleBlock::UpgradeSelection,
        action: DroidAction::SelectUpgradeCargoAlly,
        weight: UPGRADE_CARGO_ALLY_WEIGHT,
        applies: |o| {
            o.upgrade_menu_open
                && o.player_health >= UPGRADE_HEALTH_NEED
                && o.player_shields >= UPGRADE_SHIELDS_NEED
                && o.has_cargo
                && o.cargo_health < UPGRADE_CARGO_HEALTH_NEED
        },
    },
    ScoreRule {
        block: RuleBlock::UpgradeSelection,
        action: DroidAction::SelectUpgradeAlly,
        weight: UPGRADE_ALLY_WEIGHT,
        applies: |o| {
            o.upgrade_menu_open
                && o.player_health >= UPGRADE_HEALTH_NEED
                && o.player_shields >= UPGRADE_SHIELDS_NEED
                && !(o.has_cargo && o.cargo_health < UPGRADE_CARGO_HEALTH_NEED)
        },
    },
];
