// Constants module for the pretraining system
// Scoring weights, engagement thresholds, generator distributions and
// optimizer hyperparameters used across the crate

//---------------------------------------------------------------------
// Rule Score Weights
//---------------------------------------------------------------------
pub const BULLET_EVADE_WEIGHT: f64 = 3.0;
pub const PRIMARY_FIRE_WEIGHT: f64 = 4.0;
pub const MISSILE_FIRE_WEIGHT: f64 = 3.0;
pub const LASER_FIRE_WEIGHT: f64 = 2.0;
pub const ROTATE_TRACK_WEIGHT: f64 = 1.0;
pub const CARGO_PURSUIT_WEIGHT: f64 = 1.0;
pub const ASTEROID_FIRE_WEIGHT: f64 = 2.0;
pub const TRACTOR_ASTEROID_WEIGHT: f64 = 3.0;
pub const TRACTOR_ENEMY_WEIGHT: f64 = 2.0;
pub const RETREAT_WEIGHT: f64 = 2.0;
pub const CREW_ASSIGN_WEIGHT: f64 = 1.0;
pub const UPGRADE_HEALTH_WEIGHT: f64 = 3.0;
pub const UPGRADE_SHIELDS_WEIGHT: f64 = 2.0;
pub const UPGRADE_CARGO_ALLY_WEIGHT: f64 = 2.0;
pub const UPGRADE_ALLY_WEIGHT: f64 = 1.0;

//---------------------------------------------------------------------
// Engagement Thresholds
//---------------------------------------------------------------------
pub const BULLET_DANGER_RANGE: f32 = 0.3;
pub const BULLET_FRONTAL_BAND: f32 = 0.25;
pub const BULLET_VERTICAL_BAND: f32 = 0.75;
pub const ENEMY_ENGAGE_RANGE: f32 = 0.5;
pub const MISSILE_RANGE: f32 = 0.3;
pub const LASER_RANGE: f32 = 0.4;
pub const ROTATE_DEADZONE: f32 = 0.1;
pub const WEAPON_READY_COOLDOWN: f32 = 0.1;
pub const TRACTOR_MIN_CHARGE: f32 = 0.3;
pub const TRACTOR_ASTEROID_MIN: f32 = 0.2;
pub const TRACTOR_ASTEROID_MAX: f32 = 0.35;
pub const TRACTOR_ENEMY_MIN: f32 = 0.3;
pub const TRACTOR_ENEMY_MAX: f32 = 0.5;
pub const ASTEROID_MINING_RANGE: f32 = 0.4;
pub const CARGO_ABSENT_SENTINEL: f32 = 0.99;
pub const CARGO_MIN_ESCORT_HEALTH: f32 = 0.3;
pub const CARGO_PURSUIT_RANGE: f32 = 0.4;
pub const CARGO_STEER_DEADZONE: f32 = 0.1;
pub const CARGO_VERTICAL_MIN: f32 = 0.25;
pub const CARGO_VERTICAL_MAX: f32 = 0.5;
pub const LOW_HEALTH_THRESHOLD: f32 = 0.3;
pub const LOW_SHIELDS_THRESHOLD: f32 = 0.2;
pub const RETREAT_ENEMY_RANGE: f32 = 0.6;
pub const RETREAT_FRONTAL_BAND: f32 = 0.5;
pub const CREW_SHIELDS_NEED: f32 = 0.3;
pub const CREW_ENGINEERING_NEED: f32 = 0.4;
pub const CREW_LOAD_CAP: f32 = 0.8;
pub const UPGRADE_HEALTH_NEED: f32 = 0.5;
pub const UPGRADE_SHIELDS_NEED: f32 = 0.5;
pub const UPGRADE_CARGO_HEALTH_NEED: f32 = 0.7;
pub const FLAG_SET_THRESHOLD: f32 = 0.5;

//---------------------------------------------------------------------
// Tie-Break Noise
//---------------------------------------------------------------------
pub const SCORE_NOISE_AMPLITUDE: f64 = 0.05;

//---------------------------------------------------------------------
// Synthetic Distribution Constants
//---------------------------------------------------------------------
pub const ABSENT_DISTANCE: f32 = 1.0;
pub const PLAYER_POS_RANGE: f32 = 0.4;
pub const PLAYER_SPEED_MIN: f32 = 0.1;
pub const PLAYER_SPEED_MAX: f32 = 0.2;
pub const ENEMY_PRESENCE_PROB: f64 = 0.7;
pub const ENEMY_DIST_SCALE: f32 = 0.8;
pub const ASTEROID_PRESENCE_PROB: f64 = 0.5;
pub const ASTEROID_DIST_SCALE: f32 = 0.7;
pub const BULLET_PRESENCE_PROB: f64 = 0.3;
pub const BULLET_DIST_SCALE: f32 = 0.5;
pub const CARGO_PRESENCE_PROB: f64 = 0.5;
pub const CARGO_DIST_SCALE: f32 = 0.6;
pub const CARGO_HEALTH_MIN: f32 = 0.5;
pub const POWERUP_PRESENCE_PROB: f64 = 0.3;
pub const POWERUP_DIST_SCALE: f32 = 0.6;
pub const TRACTOR_ACTIVE_PROB: f64 = 0.1;
pub const MENU_OPEN_PROB: f64 = 0.1;
pub const SCORE_SCALE: f32 = 0.5;
pub const LEVEL_SCALE: f32 = 0.3;

//---------------------------------------------------------------------
// Network Dimensions
//---------------------------------------------------------------------
pub const PRETRAIN_HIDDEN_DIM: usize = 256;
pub const DEMO_HIDDEN_DIM: usize = 128;
pub const LAYER_NORM_EPS: f32 = 1e-5;

//---------------------------------------------------------------------
// Optimizer Constants
//---------------------------------------------------------------------
pub const FRESH_LEARNING_RATE: f64 = 0.001;
pub const RESUME_LEARNING_RATE: f64 = 0.0005;
pub const ADAM_BETA1: f64 = 0.9;
pub const ADAM_BETA2: f64 = 0.999;
pub const ADAM_EPS: f64 = 1e-8;
pub const GRAD_CLIP_MAX_NORM: f64 = 1.0;
pub const GRAD_CLIP_EPS: f64 = 1e-6;

//---------------------------------------------------------------------
// Schedule Constants
//---------------------------------------------------------------------
pub const PLATEAU_FACTOR: f64 = 0.5;
pub const PLATEAU_PATIENCE: u32 = 50;
pub const PLATEAU_REL_THRESHOLD: f64 = 1e-4;
pub const EARLY_STOP_PATIENCE: u32 = 200;
pub const EARLY_STOP_MIN_EPOCHS: u64 = 500;

//---------------------------------------------------------------------
// Reporting Intervals
//---------------------------------------------------------------------
pub const GENERATION_LOG_INTERVAL: usize = 5000;
pub const EPOCH_LOG_INTERVAL: u64 = 50;
pub const EVAL_SAMPLE_COUNT: usize = 100;
