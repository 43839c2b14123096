use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::constants::*;
use crate::config::schema::{offsets, ObservationSchema, SchemaMismatch};

/// Seeded source of synthetic gameplay observations.
///
/// Draws each slot group from the same distributions the game's built-in
/// pretrainer uses, so the rule table sees realistic mixtures of threats,
/// cargo and menu states. Two generators with the same seed produce the
/// same sequence.
pub struct SyntheticGenerator {
    schema: ObservationSchema,
    rng: StdRng,
}

impl SyntheticGenerator {
    pub fn new(schema: ObservationSchema, seed: u64) -> Result<Self, SchemaMismatch> {
        ObservationSchema::heuristic_v2().check_dims(schema.obs_dim(), schema.action_dim())?;
        Ok(Self {
            schema,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Draws one observation vector.
    pub fn next_observation(&mut self) -> Vec<f32> {
        let mut obs = vec![0.0f32; self.schema.obs_dim()];

        // Player pose, vitals and speed
        obs[offsets::PLAYER_X] = self.rng.gen_range(-PLAYER_POS_RANGE..PLAYER_POS_RANGE);
        obs[offsets::PLAYER_Y] = self.rng.gen_range(-PLAYER_POS_RANGE..PLAYER_POS_RANGE);
        obs[offsets::PLAYER_ROTATION] = self.rng.gen::<f32>();
        obs[offsets::PLAYER_HEALTH] = self.rng.gen::<f32>();
        obs[offsets::PLAYER_SHIELDS] = self.rng.gen::<f32>();
        obs[offsets::PLAYER_SPEED] = self.rng.gen_range(PLAYER_SPEED_MIN..PLAYER_SPEED_MAX);

        // Enemies: distance, angle, health per slot
        for i in 0..offsets::ENEMY_COUNT {
            let base = offsets::ENEMY_BASE + i * offsets::ENEMY_STRIDE;
            if self.rng.gen::<f64>() < ENEMY_PRESENCE_PROB {
                obs[base] = self.rng.gen::<f32>() * ENEMY_DIST_SCALE;
                obs[base + 1] = self.rng.gen_range(-1.0..1.0);
                obs[base + 2] = self.rng.gen::<f32>();
            } else {
                obs[base] = ABSENT_DISTANCE;
            }
        }

        // Asteroids: distance, angle per slot
        for i in 0..offsets::ASTEROID_COUNT {
            let base = offsets::ASTEROID_BASE + i * offsets::ASTEROID_STRIDE;
            if self.rng.gen::<f64>() < ASTEROID_PRESENCE_PROB {
                obs[base] = self.rng.gen::<f32>() * ASTEROID_DIST_SCALE;
                obs[base + 1] = self.rng.gen_range(-1.0..1.0);
            } else {
                obs[base] = ABSENT_DISTANCE;
            }
        }

        // Weapon cooldowns and ammo
        for slot in offsets::PRIMARY_COOLDOWN..=offsets::LASER_CHARGES {
            obs[slot] = self.rng.gen::<f32>();
        }

        // Tractor beam
        obs[offsets::TRACTOR_CHARGE] = self.rng.gen::<f32>();
        obs[offsets::TRACTOR_ACTIVE] = if self.rng.gen::<f64>() < TRACTOR_ACTIVE_PROB {
            1.0
        } else {
            0.0
        };

        // Normalized score and level
        obs[offsets::SCORE] = self.rng.gen::<f32>() * SCORE_SCALE;
        obs[offsets::LEVEL] = self.rng.gen::<f32>() * LEVEL_SCALE;

        // Enemy bullets: distance, angle per slot
        for i in 0..offsets::BULLET_COUNT {
            let base = offsets::BULLET_BASE + i * offsets::BULLET_STRIDE;
            if self.rng.gen::<f64>() < BULLET_PRESENCE_PROB {
                obs[base] = self.rng.gen::<f32>() * BULLET_DIST_SCALE;
                obs[base + 1] = self.rng.gen_range(-1.0..1.0);
            } else {
                obs[base] = ABSENT_DISTANCE;
            }
        }

        // Cargo ship convoy slot
        if self.rng.gen::<f64>() < CARGO_PRESENCE_PROB {
            obs[offsets::CARGO_DIST] = self.rng.gen::<f32>() * CARGO_DIST_SCALE;
            obs[offsets::CARGO_ANGLE] = self.rng.gen_range(-1.0..1.0);
            obs[offsets::CARGO_HEALTH] = self.rng.gen_range(CARGO_HEALTH_MIN..1.0);
            obs[offsets::CARGO_DIRECTION] = if self.rng.gen::<f64>() < 0.5 { 1.0 } else { -1.0 };
        } else {
            obs[offsets::CARGO_DIST] = ABSENT_DISTANCE;
        }

        // Crew station loads
        for slot in offsets::CREW_SHIELDS_LOAD..=offsets::CREW_NAVIGATION_LOAD {
            obs[slot] = self.rng.gen::<f32>();
        }

        // Upgrade menu flag
        obs[offsets::UPGRADE_MENU] = if self.rng.gen::<f64>() < MENU_OPEN_PROB {
            1.0
        } else {
            0.0
        };

        // Powerups: distance, angle per slot
        for i in 0..offsets::POWERUP_COUNT {
            let base = offsets::POWERUP_BASE + i * offsets::POWERUP_STRIDE;
            if self.rng.gen::<f64>() < POWERUP_PRESENCE_PROB {
                obs[base] = self.rng.gen::<f32>() * POWERUP_DIST_SCALE;
                obs[base + 1] = self.rng.gen_range(-1.0..1.0);
            } else {
                obs[base] = ABSENT_DISTANCE;
                obs[base + 1] = 0.0;
            }
        }

        obs
    }
}
