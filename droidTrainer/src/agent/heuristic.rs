use rand::Rng;

use crate::agent::actions::DroidAction;
use crate::agent::rules::SCORE_RULES;
use crate::config::constants::*;
use crate::config::schema::{offsets, ObservationSchema, SchemaMismatch};

/// Gameplay features decoded from a raw observation vector.
///
/// The rule table operates on these instead of raw slot indices, so a layout
/// change only touches `decode`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservationFields {
    pub player_health: f32,
    pub player_shields: f32,
    pub nearest_enemy_dist: f32,
    pub nearest_enemy_angle: f32,
    pub nearest_asteroid_dist: f32,
    pub nearest_asteroid_angle: f32,
    pub nearest_bullet_dist: f32,
    pub nearest_bullet_angle: f32,
    pub primary_ready: bool,
    pub missile_ready: bool,
    pub laser_ready: bool,
    pub tractor_ready: bool,
    pub cargo_dist: f32,
    pub cargo_angle: f32,
    pub cargo_health: f32,
    pub has_cargo: bool,
    pub crew_shields_load: f32,
    pub crew_engineering_load: f32,
    pub crew_weapons_load: f32,
    pub upgrade_menu_open: bool,
}

impl ObservationFields {
    /// Decodes the slots the rule table cares about.
    ///
    /// The caller must have validated the slice length against the schema.
    pub fn decode(obs: &[f32]) -> Self {
        let tractor_active = obs[offsets::TRACTOR_ACTIVE] > FLAG_SET_THRESHOLD;
        let cargo_dist = obs[offsets::CARGO_DIST];
        Self {
            player_health: obs[offsets::PLAYER_HEALTH],
            player_shields: obs[offsets::PLAYER_SHIELDS],
            nearest_enemy_dist: obs[offsets::NEAREST_ENEMY_DIST],
            nearest_enemy_angle: obs[offsets::NEAREST_ENEMY_ANGLE],
            nearest_asteroid_dist: obs[offsets::NEAREST_ASTEROID_DIST],
            nearest_asteroid_angle: obs[offsets::NEAREST_ASTEROID_ANGLE],
            nearest_bullet_dist: obs[offsets::NEAREST_BULLET_DIST],
            nearest_bullet_angle: obs[offsets::NEAREST_BULLET_ANGLE],
            primary_ready: obs[offsets::PRIMARY_COOLDOWN] < WEAPON_READY_COOLDOWN,
            missile_ready: obs[offsets::MISSILE_COOLDOWN] < WEAPON_READY_COOLDOWN
                && obs[offsets::MISSILE_AMMO] > 0.0,
            laser_ready: obs[offsets::LASER_COOLDOWN] < WEAPON_READY_COOLDOWN
                && obs[offsets::LASER_CHARGES] > 0.0,
            tractor_ready: obs[offsets::TRACTOR_CHARGE] > TRACTOR_MIN_CHARGE && !tractor_active,
            cargo_dist,
            cargo_angle: obs[offsets::CARGO_ANGLE],
            cargo_health: obs[offsets::CARGO_HEALTH],
            has_cargo: cargo_dist < CARGO_ABSENT_SENTINEL,
            crew_shields_load: obs[offsets::CREW_SHIELDS_LOAD],
            crew_engineering_load: obs[offsets::CREW_ENGINEERING_LOAD],
            crew_weapons_load: obs[offsets::CREW_WEAPONS_LOAD],
            upgrade_menu_open: obs[offsets::UPGRADE_MENU] > FLAG_SET_THRESHOLD,
        }
    }

    /// A live cargo ship worth protecting has drifted out of escort range.
    pub(crate) fn cargo_needs_escort(&self) -> bool {
        self.has_cargo
            && self.cargo_health > CARGO_MIN_ESCORT_HEALTH
            && self.cargo_dist > CARGO_PURSUIT_RANGE
    }

    /// Hull or shields are critical with an enemy close enough to matter.
    pub(crate) fn needs_retreat(&self) -> bool {
        (self.player_health < LOW_HEALTH_THRESHOLD
            || self.player_shields < LOW_SHIELDS_THRESHOLD)
            && self.nearest_enemy_dist < RETREAT_ENEMY_RANGE
    }
}

/// Rule-based scoring pilot used as the imitation target.
///
/// Scores every action by summing the weights of all matching rules, adds a
/// small uniform tie-break noise and picks the argmax.
pub struct HeuristicPolicy {
    schema: ObservationSchema,
}

impl HeuristicPolicy {
    /// Builds the pilot for the given schema. Only the 63x20 gameplay
    /// schema is supported; anything else is rejected up front.
    pub fn new(schema: ObservationSchema) -> Result<Self, SchemaMismatch> {
        ObservationSchema::heuristic_v2().check_dims(schema.obs_dim(), schema.action_dim())?;
        Ok(Self { schema })
    }

    pub fn schema(&self) -> &ObservationSchema {
        &self.schema
    }

    /// Noiseless additive score for every action.
    pub fn score_actions(&self, obs: &[f32]) -> Result<Vec<f64>, SchemaMismatch> {
        self.schema.check_observation(obs)?;
        let fields = ObservationFields::decode(obs);
        let mut scores = vec![0.0; self.schema.action_dim()];
        for rule in SCORE_RULES.iter() {
            if (rule.applies)(&fields) {
                scores[rule.action.index()] += rule.weight;
            }
        }
        Ok(scores)
    }

    /// Scores, perturbs and picks the best action.
    pub fn select_action<R: Rng>(
        &self,
        obs: &[f32],
        rng: &mut R,
    ) -> Result<DroidAction, SchemaMismatch> {
        let mut scores = self.score_actions(obs)?;
        for score in scores.iter_mut() {
            *score += rng.gen_range(-SCORE_NOISE_AMPLITUDE..SCORE_NOISE_AMPLITUDE);
        }
        let mut best = 0;
        for (index, score) in scores.iter().enumerate() {
            if *score > scores[best] {
                best = index;
            }
        }
        // Index comes from the score vector, which is action_dim long
        Ok(DroidAction::from_index(best).unwrap_or(DroidAction::NoOp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Observation with nothing nearby, everything healthy and no weapons
    /// charged. No rule fires on this baseline.
    fn calm_observation() -> Vec<f32> {
        let mut obs = vec![0.0; 63];
        obs[offsets::PLAYER_HEALTH] = 1.0;
        obs[offsets::PLAYER_SHIELDS] = 1.0;
        for i in 0..offsets::ENEMY_COUNT {
            obs[offsets::ENEMY_BASE + i * offsets::ENEMY_STRIDE] = 1.0;
        }
        for i in 0..offsets::ASTEROID_COUNT {
            obs[offsets::ASTEROID_BASE + i * offsets::ASTEROID_STRIDE] = 1.0;
        }
        for i in 0..offsets::BULLET_COUNT {
            obs[offsets::BULLET_BASE + i * offsets::BULLET_STRIDE] = 1.0;
        }
        // Every cooldown hot, no ammo, no tractor charge
        obs[offsets::PRIMARY_COOLDOWN] = 1.0;
        obs[offsets::MISSILE_COOLDOWN] = 1.0;
        obs[offsets::LASER_COOLDOWN] = 1.0;
        obs[offsets::CARGO_DIST] = 1.0;
        obs[offsets::CREW_SHIELDS_LOAD] = 1.0;
        obs[offsets::CREW_ENGINEERING_LOAD] = 1.0;
        obs[offsets::CREW_WEAPONS_LOAD] = 1.0;
        for i in 0..offsets::POWERUP_COUNT {
            obs[offsets::POWERUP_BASE + i * offsets::POWERUP_STRIDE] = 1.0;
        }
        obs
    }

    #[test]
    fn test_decode_reads_expected_slots() {
        let mut obs = calm_observation();
        obs[offsets::PLAYER_HEALTH] = 0.25;
        obs[offsets::NEAREST_ENEMY_DIST] = 0.4;
        obs[offsets::NEAREST_ENEMY_ANGLE] = -0.3;
        obs[offsets::PRIMARY_COOLDOWN] = 0.05;
        obs[offsets::MISSILE_COOLDOWN] = 0.05;
        obs[offsets::MISSILE_AMMO] = 0.0;
        obs[offsets::TRACTOR_CHARGE] = 0.8;
        obs[offsets::TRACTOR_ACTIVE] = 0.0;
        obs[offsets::CARGO_DIST] = 0.5;
        obs[offsets::CARGO_HEALTH] = 0.9;

        let fields = ObservationFields::decode(&obs);
        assert_eq!(fields.player_health, 0.25);
        assert_eq!(fields.nearest_enemy_dist, 0.4);
        assert_eq!(fields.nearest_enemy_angle, -0.3);
        assert!(fields.primary_ready);
        // Cooldown is cold but there is no ammo left
        assert!(!fields.missile_ready);
        assert!(fields.tractor_ready);
        assert!(fields.has_cargo);
    }

    #[test]
    fn test_tractor_not_ready_while_active() {
        let mut obs = calm_observation();
        obs[offsets::TRACTOR_CHARGE] = 0.9;
        obs[offsets::TRACTOR_ACTIVE] = 1.0;
        assert!(!ObservationFields::decode(&obs).tractor_ready);
    }

    #[test]
    fn test_rejects_wrong_schema() {
        assert!(HeuristicPolicy::new(ObservationSchema::demo_v1()).is_err());
    }

    #[test]
    fn test_rejects_wrong_observation_length() {
        let policy = HeuristicPolicy::new(ObservationSchema::heuristic_v2()).unwrap();
        assert!(policy.score_actions(&vec![0.0; 59]).is_err());
    }

    #[test]
    fn test_frontal_bullet_forces_sidestep() {
        let policy = HeuristicPolicy::new(ObservationSchema::heuristic_v2()).unwrap();
        let mut obs = calm_observation();
        obs[offsets::NEAREST_BULLET_DIST] = 0.1;
        obs[offsets::NEAREST_BULLET_ANGLE] = 0.05;

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let action = policy.select_action(&obs, &mut rng).unwrap();
            assert!(
                action == DroidAction::MoveLeft || action == DroidAction::MoveRight,
                "expected a sidestep, got {}",
                action
            );
        }
    }

    #[test]
    fn test_open_menu_with_low_health_picks_health_upgrade() {
        let policy = HeuristicPolicy::new(ObservationSchema::heuristic_v2()).unwrap();
        let mut obs = calm_observation();
        obs[offsets::UPGRADE_MENU] = 1.0;
        obs[offsets::PLAYER_HEALTH] = 0.2;

        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let action = policy.select_action(&obs, &mut rng).unwrap();
            assert_eq!(action, DroidAction::SelectUpgradeHealth);
        }
    }

    #[test]
    fn test_selection_stays_within_noise_band() {
        let policy = HeuristicPolicy::new(ObservationSchema::heuristic_v2()).unwrap();
        // Two actions tie at the top, so noise decides between them
        let mut obs = calm_observation();
        obs[offsets::NEAREST_BULLET_DIST] = 0.1;
        obs[offsets::NEAREST_BULLET_ANGLE] = 0.0;

        let scores = policy.score_actions(&obs).unwrap();
        let top = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        let mut rng = StdRng::seed_from_u64(42);
        let mut seen_left = false;
        let mut seen_right = false;
        for _ in 0..10_000 {
            let action = policy.select_action(&obs, &mut rng).unwrap();
            let gap = top - scores[action.index()];
            assert!(gap < 0.1, "selected action trails the best by {}", gap);
            seen_left |= action == DroidAction::MoveLeft;
            seen_right |= action == DroidAction::MoveRight;
        }
        // Over ten thousand draws both tied actions should win sometimes
        assert!(seen_left && seen_right);
    }

    #[test]
    fn test_calm_observation_scores_zero() {
        let policy = HeuristicPolicy::new(ObservationSchema::heuristic_v2()).unwrap();
        let scores = policy.score_actions(&calm_observation()).unwrap();
        assert!(scores.iter().all(|s| *s == 0.0));
    }
}
