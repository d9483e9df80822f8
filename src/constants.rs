//! Field geometry, boost pad table, physics constants, and every detection
//! threshold used by the event detectors and analyzers.
//!
//! Coordinate system (RLBot standard):
//! - X-axis: -4096 to +4096 (side walls)
//! - Y-axis: -5120 to +5120 (goal lines), BLUE defends negative Y
//! - Z-axis: 0 to 2044 (floor to ceiling)

use crate::math::Vec3;
use serde::Serialize;

// Field boundaries
pub const SIDE_WALL_X: f32 = 4096.0;
pub const BACK_WALL_Y: f32 = 5120.0;
pub const CEILING_Z: f32 = 2044.0;

// Goal dimensions (GOAL_WIDTH is the half-width of the opening)
pub const GOAL_WIDTH: f32 = 892.755;
pub const GOAL_HEIGHT: f32 = 642.775;
pub const GOAL_DEPTH: f32 = 880.0;

// Ball / car rest state
pub const BALL_RADIUS: f32 = 93.15;
pub const BALL_SPAWN_Z: f32 = 93.15;
pub const CAR_REST_Z: f32 = 17.0;

// Simplified ball physics used by the prediction analyzer
pub const GRAVITY_Z: f32 = -650.0;
pub const BALL_DRAG: f32 = 0.03;
pub const BOUNCE_COEFFICIENT: f32 = 0.6;
pub const WALL_BOUNCE_COEFFICIENT: f32 = 0.7;

// Goal detection
pub const GOAL_LINE_THRESHOLD: f32 = BACK_WALL_Y - GOAL_DEPTH;
pub const GOAL_EXIT_THRESHOLD: f32 = GOAL_LINE_THRESHOLD - 200.0;
pub const GOAL_LOOKBACK_WINDOW_S: f64 = 1.0;
pub const MIN_SHOT_VELOCITY_UU_S: f32 = 500.0;

// Touch detection
pub const TOUCH_PROXIMITY_THRESHOLD: f32 = 200.0;
pub const TOUCH_DEBOUNCE_TIME: f64 = 0.2;
pub const TOUCH_LOCATION_EPS: f32 = 120.0;
pub const MIN_BALL_SPEED_FOR_TOUCH: f32 = 120.0;
pub const MIN_RELATIVE_SPEED_FOR_TOUCH: f32 = 180.0;
pub const WALL_PROXIMITY_THRESHOLD: f32 = 300.0;
pub const CEILING_HEIGHT_THRESHOLD: f32 = 1900.0;
pub const AERIAL_HEIGHT_THRESHOLD: f32 = 200.0;
pub const HALF_VOLLEY_HEIGHT: f32 = 150.0;

// Demolitions
pub const DEMO_POSITION_TOLERANCE: f32 = 500.0;

// Kickoffs
pub const KICKOFF_CENTER_POSITION: Vec3 = Vec3::new(0.0, 0.0, BALL_SPAWN_Z);
pub const KICKOFF_POSITION_TOLERANCE: f32 = 120.0;
pub const KICKOFF_HEIGHT_TOLERANCE: f32 = 60.0;
pub const KICKOFF_MAX_DURATION: f64 = 5.0;
pub const KICKOFF_MIN_COOLDOWN: f64 = 5.0;
pub const BALL_STATIONARY_THRESHOLD: f32 = 50.0;

// Challenges (50/50s)
pub const CHALLENGE_WINDOW_S: f64 = 1.2;
pub const CHALLENGE_RADIUS_UU: f32 = 1000.0;
pub const CHALLENGE_MIN_DISTANCE_UU: f32 = 200.0;
pub const CHALLENGE_MIN_BALL_SPEED_KPH: f64 = 15.0;
pub const NEUTRAL_RETOUCH_WINDOW_S: f64 = 0.25;
pub const RISK_LOW_BOOST_THRESHOLD: u8 = 20;
pub const RISK_AHEAD_OF_BALL_WEIGHT: f64 = 0.4;
pub const RISK_LOW_BOOST_WEIGHT: f64 = 0.3;
pub const RISK_LAST_MAN_WEIGHT: f64 = 0.3;

// Boost pickups
pub const BOOST_PICKUP_MIN_GAIN: f32 = 1.0;
pub const BIG_PAD_CAPACITY: f32 = 100.0;
pub const SMALL_PAD_CAPACITY: f32 = 12.0;
pub const BIG_PAD_RESPAWN_S: f64 = 10.0;
pub const SMALL_PAD_RESPAWN_S: f64 = 4.0;
pub const PAD_RESPAWN_TOLERANCE: f64 = 0.5;
pub const RESPAWN_BOOST_AMOUNT: f32 = 33.0;
pub const RESPAWN_DISTANCE_THRESHOLD: f32 = 500.0;
pub const BOOST_HISTORY_WINDOW_S: f64 = 0.4;
pub const BOOST_HISTORY_MAX_SAMPLES: usize = 48;
pub const BOOST_PICKUP_MERGE_WINDOW: f64 = 0.25;
pub const CHAIN_PAD_RADIUS: f32 = 900.0;
pub const BIG_PAD_MIN_GAIN: f32 = 45.0;
pub const PAD_NEUTRAL_TOLERANCE: f32 = 100.0;
pub const CENTERLINE_TOLERANCE: f32 = 100.0;
pub const MIN_ORIENTATION_SAMPLES: usize = 2;
pub const TEAM_SIDE_SAMPLE_FRAMES: usize = 120;

#[cfg(feature = "boost-debug")]
pub const DEBUG_BOOST_ENV: &str = "REPLAY_REPORT_BOOST_DEBUG";

/// A boost pad on the pitch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoostPad {
    pub pad_id: usize,
    pub position: Vec3,
    pub is_big: bool,
    pub radius: f32,
}

const fn big(pad_id: usize, x: f32, y: f32) -> BoostPad {
    BoostPad {
        pad_id,
        position: Vec3::new(x, y, 73.0),
        is_big: true,
        radius: 208.0,
    }
}

const fn small(pad_id: usize, x: f32, y: f32) -> BoostPad {
    BoostPad {
        pad_id,
        position: Vec3::new(x, y, 70.0),
        is_big: false,
        radius: 144.0,
    }
}

/// The 34 soccar boost pads, ordered by ascending (y, x). Indexes into this
/// table are the `pad_id` values carried by pickup events.
pub static BOOST_PADS: [BoostPad; 34] = [
    big(0, -3584.0, -4240.0),
    small(1, 0.0, -4240.0),
    big(2, 3584.0, -4240.0),
    small(3, -1792.0, -4184.0),
    small(4, 1792.0, -4184.0),
    small(5, -940.0, -3308.0),
    small(6, 940.0, -3308.0),
    small(7, 0.0, -2816.0),
    small(8, -3584.0, -2484.0),
    small(9, 3584.0, -2484.0),
    small(10, -1788.0, -2300.0),
    small(11, 1788.0, -2300.0),
    small(12, -2048.0, -1036.0),
    small(13, 2048.0, -1036.0),
    small(14, 0.0, -1024.0),
    big(15, -3584.0, 0.0),
    small(16, -1024.0, 0.0),
    small(17, 1024.0, 0.0),
    big(18, 3584.0, 0.0),
    small(19, 0.0, 1024.0),
    small(20, -2048.0, 1036.0),
    small(21, 2048.0, 1036.0),
    small(22, -1788.0, 2300.0),
    small(23, 1788.0, 2300.0),
    small(24, -3584.0, 2484.0),
    small(25, 3584.0, 2484.0),
    small(26, 0.0, 2816.0),
    small(27, -940.0, 3308.0),
    small(28, 940.0, 3308.0),
    small(29, -1792.0, 4184.0),
    small(30, 1792.0, 4184.0),
    big(31, -3584.0, 4240.0),
    small(32, 0.0, 4240.0),
    big(33, 3584.0, 4240.0),
];

/// Spatial heuristics for matching a player to a boost pad.
#[derive(Debug, Clone, Copy)]
pub struct PadEnvelope {
    pub radius: f32,
    pub max_distance: f32,
    pub height_tolerance: f32,
}

pub fn pad_envelope(pad: &BoostPad) -> PadEnvelope {
    let padding = if pad.is_big { 150.0 } else { 110.0 };
    let radius = pad.radius + padding;
    PadEnvelope {
        radius,
        max_distance: radius * 2.0 + 100.0,
        height_tolerance: if pad.is_big { 250.0 } else { 200.0 },
    }
}

pub fn pad_capacity(is_big: bool) -> f32 {
    if is_big {
        BIG_PAD_CAPACITY
    } else {
        SMALL_PAD_CAPACITY
    }
}

/// Field third along the Y axis, in absolute (not team-relative) terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldThird {
    Defensive,
    Neutral,
    Offensive,
}

/// Absolute field third of a position: negative Y is "defensive" from the
/// blue perspective. Callers flip for orange.
pub fn field_third(position: Vec3) -> FieldThird {
    if position.y < -BACK_WALL_Y / 3.0 {
        FieldThird::Defensive
    } else if position.y > BACK_WALL_Y / 3.0 {
        FieldThird::Offensive
    } else {
        FieldThird::Neutral
    }
}

pub fn is_in_bounds(position: Vec3) -> bool {
    (-SIDE_WALL_X..=SIDE_WALL_X).contains(&position.x)
        && (-BACK_WALL_Y..=BACK_WALL_Y).contains(&position.y)
        && (0.0..=CEILING_Z).contains(&position.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_table_shape() {
        assert_eq!(BOOST_PADS.len(), 34);
        assert_eq!(BOOST_PADS.iter().filter(|p| p.is_big).count(), 6);
        for (index, pad) in BOOST_PADS.iter().enumerate() {
            assert_eq!(pad.pad_id, index);
        }
    }

    #[test]
    fn pad_table_ordered_by_y_then_x() {
        for pair in BOOST_PADS.windows(2) {
            let (a, b) = (pair[0].position, pair[1].position);
            assert!(a.y < b.y || (a.y == b.y && a.x < b.x));
        }
    }

    #[test]
    fn thirds_split_the_pitch() {
        assert_eq!(
            field_third(Vec3::new(0.0, -4000.0, 0.0)),
            FieldThird::Defensive
        );
        assert_eq!(field_third(Vec3::new(0.0, 0.0, 0.0)), FieldThird::Neutral);
        assert_eq!(
            field_third(Vec3::new(0.0, 2000.0, 0.0)),
            FieldThird::Offensive
        );
    }
}
