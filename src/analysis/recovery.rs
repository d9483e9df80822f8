//! Recovery analysis: segment airborne episodes and grade each landing.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::math::{round2, round3, Vec3};
use crate::normalize::Frame;

const GROUND_HEIGHT_THRESHOLD: f32 = 30.0;
const AIRBORNE_MIN_HEIGHT: f32 = 50.0;
const STABLE_VELOCITY_THRESHOLD: f32 = 200.0;
const STABLE_FRAMES_REQUIRED: u32 = 2;
const WAVEDASH_WINDOW: f64 = 0.3;
const WAVEDASH_SPEED_BOOST: f32 = 1.15;
const MIN_AIRBORNE_TIME: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryQuality {
    Excellent,
    Good,
    Average,
    Poor,
    Failed,
}

impl RecoveryQuality {
    pub const ALL: [RecoveryQuality; 5] = [
        RecoveryQuality::Excellent,
        RecoveryQuality::Good,
        RecoveryQuality::Average,
        RecoveryQuality::Poor,
        RecoveryQuality::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RecoveryQuality::Excellent => "EXCELLENT",
            RecoveryQuality::Good => "GOOD",
            RecoveryQuality::Average => "AVERAGE",
            RecoveryQuality::Poor => "POOR",
            RecoveryQuality::Failed => "FAILED",
        }
    }
}

/// A recovery after an airborne episode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryEvent {
    pub timestamp: f64,
    pub player_id: String,
    pub landing_position: Vec3,
    pub landing_velocity: Vec3,
    pub quality: RecoveryQuality,
    pub time_airborne: f64,
    pub time_to_control: f64,
    pub peak_height: f64,
    pub speed_at_landing: f64,
    pub speed_after_recovery: f64,
    /// Post-recovery speed over landing speed; can exceed 1.0 with boost or a
    /// wavedash.
    pub momentum_retained: f64,
    pub was_wavedash: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecoveryStats {
    pub total_recoveries: u32,
    pub quality_distribution: BTreeMap<String, u32>,
    pub excellent_count: u32,
    pub poor_count: u32,
    pub average_momentum_retained: f64,
    pub wavedash_count: u32,
}

impl RecoveryStats {
    pub fn empty() -> Self {
        let mut stats = RecoveryStats::default();
        for quality in RecoveryQuality::ALL {
            stats
                .quality_distribution
                .insert(quality.as_str().to_string(), 0);
        }
        stats
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecoveryOutput {
    pub per_player: BTreeMap<String, RecoveryStats>,
    pub events: Vec<RecoveryEvent>,
}

/// Quality from weighted factors: time to control 40%, momentum retention
/// 40%, vertical landing speed 20%. A hard downward landing fails outright.
fn assess_quality(
    time_to_control: f64,
    momentum_retained: f64,
    landing_velocity: Vec3,
) -> RecoveryQuality {
    if landing_velocity.z < -800.0 {
        return RecoveryQuality::Failed;
    }

    let mut score = 0.0;
    if time_to_control < 0.1 {
        score += 0.4;
    } else if time_to_control < 0.2 {
        score += 0.3;
    } else if time_to_control < 0.4 {
        score += 0.2;
    } else if time_to_control < 0.6 {
        score += 0.1;
    }

    if momentum_retained >= 1.0 {
        score += 0.4;
    } else if momentum_retained >= 0.85 {
        score += 0.35;
    } else if momentum_retained >= 0.7 {
        score += 0.25;
    } else if momentum_retained >= 0.5 {
        score += 0.15;
    }

    if landing_velocity.z > -200.0 {
        score += 0.2;
    } else if landing_velocity.z > -400.0 {
        score += 0.15;
    } else if landing_velocity.z > -600.0 {
        score += 0.1;
    }

    if score >= 0.75 {
        RecoveryQuality::Excellent
    } else if score >= 0.55 {
        RecoveryQuality::Good
    } else if score >= 0.35 {
        RecoveryQuality::Average
    } else {
        RecoveryQuality::Poor
    }
}

#[derive(Default)]
struct RecoveryState {
    is_airborne: bool,
    airborne_start_time: f64,
    peak_height: f32,
    landed_time: Option<f64>,
    landing_position: Vec3,
    landing_velocity: Vec3,
    speed_at_landing: f32,
    stable_frames: u32,
    wavedash_detected: bool,
}

pub fn detect_recoveries_for_player(frames: &[Frame], player_id: &str) -> Vec<RecoveryEvent> {
    let mut events = Vec::new();
    let mut state = RecoveryState::default();
    let mut prev_velocity: Option<Vec3> = None;

    for frame in frames {
        let Some(player) = frame.player(player_id) else {
            continue;
        };
        let timestamp = frame.timestamp;
        let pos = player.position;
        let vel = player.velocity;
        let speed = vel.magnitude();
        let is_on_ground = pos.z < GROUND_HEIGHT_THRESHOLD || player.is_on_ground;

        if !state.is_airborne && !is_on_ground && pos.z > AIRBORNE_MIN_HEIGHT {
            state.is_airborne = true;
            state.airborne_start_time = timestamp;
            state.peak_height = pos.z;
            state.stable_frames = 0;
            state.wavedash_detected = false;
            // Jumping again before the previous recovery completed abandons it.
            state.landed_time = None;
        } else if state.is_airborne {
            state.peak_height = state.peak_height.max(pos.z);
            if is_on_ground {
                state.is_airborne = false;
                state.landed_time = Some(timestamp);
                state.landing_position = pos;
                state.landing_velocity = vel;
                state.speed_at_landing = speed;
            }
        }

        if let Some(landed_time) = state.landed_time {
            let since_landing = timestamp - landed_time;

            if !state.wavedash_detected
                && since_landing < WAVEDASH_WINDOW
                && speed > state.speed_at_landing * WAVEDASH_SPEED_BOOST
            {
                state.wavedash_detected = true;
            }

            if let Some(prev) = prev_velocity {
                if (vel - prev).magnitude() < STABLE_VELOCITY_THRESHOLD && is_on_ground {
                    state.stable_frames += 1;
                } else {
                    state.stable_frames = 0;
                }
            }

            if state.stable_frames >= STABLE_FRAMES_REQUIRED || since_landing > 1.0 {
                let time_airborne = landed_time - state.airborne_start_time;
                let time_to_control = timestamp - landed_time;

                if time_airborne >= MIN_AIRBORNE_TIME
                    && state.peak_height >= AIRBORNE_MIN_HEIGHT
                {
                    let momentum_retained = if state.speed_at_landing > 10.0 {
                        f64::from(speed / state.speed_at_landing)
                    } else {
                        1.0
                    };
                    let quality = assess_quality(
                        time_to_control,
                        momentum_retained,
                        state.landing_velocity,
                    );
                    events.push(RecoveryEvent {
                        timestamp: landed_time,
                        player_id: player_id.to_string(),
                        landing_position: state.landing_position,
                        landing_velocity: state.landing_velocity,
                        quality,
                        time_airborne: round3(time_airborne),
                        time_to_control: round3(time_to_control),
                        peak_height: round2(f64::from(state.peak_height)),
                        speed_at_landing: round2(f64::from(state.speed_at_landing)),
                        speed_after_recovery: round2(f64::from(speed)),
                        momentum_retained: round3(momentum_retained),
                        was_wavedash: state.wavedash_detected,
                    });
                }

                state.landed_time = None;
            }
        }

        prev_velocity = Some(vel);
    }

    events
}

/// Analyze recoveries for every player in one pass.
pub fn analyze_recoveries(frames: &[Frame]) -> RecoveryOutput {
    let mut player_ids: BTreeSet<String> = BTreeSet::new();
    for frame in frames {
        for player in &frame.players {
            player_ids.insert(player.player_id.clone());
        }
    }

    let mut per_player = BTreeMap::new();
    let mut all_events = Vec::new();

    for player_id in &player_ids {
        let events = detect_recoveries_for_player(frames, player_id);
        let mut stats = RecoveryStats::empty();
        let mut total_momentum = 0.0f64;
        for event in &events {
            *stats
                .quality_distribution
                .entry(event.quality.as_str().to_string())
                .or_insert(0) += 1;
            total_momentum += event.momentum_retained;
            if event.was_wavedash {
                stats.wavedash_count += 1;
            }
            match event.quality {
                RecoveryQuality::Excellent => stats.excellent_count += 1,
                RecoveryQuality::Poor | RecoveryQuality::Failed => stats.poor_count += 1,
                _ => {}
            }
        }
        stats.total_recoveries = events.len() as u32;
        if !events.is_empty() {
            // The summary average reflects momentum kept, not gained.
            let avg = (total_momentum / events.len() as f64).min(1.0);
            stats.average_momentum_retained = round3(avg);
        }
        per_player.insert(player_id.clone(), stats);
        all_events.extend(events);
    }

    all_events.sort_by(|a, b| {
        a.timestamp
            .partial_cmp(&b.timestamp)
            .expect("timestamps are finite")
            .then_with(|| a.player_id.cmp(&b.player_id))
    });

    RecoveryOutput {
        per_player,
        events: all_events,
    }
}
