//! Centralized game constants for the horde procedural core.
//!
//! Shared distances and timings used by several subsystems. Per-kind tuning
//! (leap impulses, pain thresholds, attack chances) lives with each kind's
//! profile, not here.

// =====================================================
// Simulation
// =====================================================

/// Fixed think interval in milliseconds (10 Hz server frame)
pub const FRAME_TIME_MS: u64 = 100;

/// Gravity acceleration in units per second squared
pub const GRAVITY_ACCEL: f32 = 800.0;

/// Minimum mass used for knockback scaling
pub const MIN_KNOCKBACK_MASS: f32 = 50.0;

/// Knockback velocity scale: kvel = dir * KNOCKBACK_SCALE * knockback / mass
pub const KNOCKBACK_SCALE: f32 = 500.0;

// =====================================================
// Movement & Placement
// =====================================================

/// Highest ledge a ground actor can step onto, and the flatness tolerance
pub const STEP_SIZE: f32 = 18.0;

/// How far a spawn volume is dropped along gravity looking for a floor
pub const DROP_DISTANCE: f32 = 256.0;

/// Increment used when probing upward for a free spawn position
pub const SPAWN_PROBE_STEP: f32 = 16.0;

/// Nudge applied opposite gravity when a drop starts inside geometry
pub const DROP_NUDGE: f32 = 1.0;

/// Largest correction tried when un-sticking an embedded volume
pub const FIX_STUCK_MAX: f32 = 16.0;

/// Back-off distance keeping trace end points off surfaces
pub const DIST_EPSILON: f32 = 0.03125;

/// Ground probe length used by the physics step
pub const GROUND_PROBE: f32 = 0.25;

/// Minimum alignment between a surface normal and "up" for it to count as floor
pub const MIN_FLOOR_NORMAL: f32 = 0.7;

/// Length of hitscan traces
pub const SHOT_RANGE: f32 = 8192.0;

// =====================================================
// Engagement Ranges (bounding-box gap distances)
// =====================================================

/// Default melee reach
pub const RANGE_MELEE: f32 = 20.0;

/// Upper bound of the "near" engagement band
pub const RANGE_NEAR: f32 = 440.0;

/// Upper bound of the "mid" engagement band
pub const RANGE_MID: f32 = 1000.0;

// =====================================================
// Timings (seconds)
// =====================================================

/// Default pain debounce
pub const PAIN_DEBOUNCE_SECS: f32 = 3.0;

/// Melee debounce applied after a whiff
pub const MELEE_DEBOUNCE_SECS: f32 = 1.0;

/// Seconds a target stays "recently seen" for sight bookkeeping
pub const SIGHT_MEMORY_SECS: f32 = 20.0;

/// Corpse lifetime before the slot is released
pub const CORPSE_LIFETIME_SECS: f32 = 10.0;

// =====================================================
// Horde Director
// =====================================================

/// Alive-monster cap while the match is still warming up
pub const WARMUP_MONSTER_CAP: usize = 30;

/// Spawn interval during warmup
pub const WARMUP_SPAWN_INTERVAL_SECS: f32 = 5.0;

/// Spawn interval bounds while a round is in progress
pub const ROUND_SPAWN_INTERVAL_SECS: (f32, f32) = (0.3, 0.5);

/// Retry delay after a failed in-round placement
pub const SPAWN_RETRY_SECS: f32 = 1.0;

/// Maximum companion drops per weighted entry
pub const MAX_COMPANION_DROPS: usize = 4;
