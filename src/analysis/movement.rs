//! Movement and speed metrics: duration-weighted speed and height buckets,
//! powerslide and aerial accounting, average speed.

use serde::Serialize;

use crate::analysis::{find_player, frame_duration, team_player_ids, Scope};
use crate::events::types::EventsBundle;
use crate::math::{round2, UU_S_TO_KPH};
use crate::normalize::{Frame, PlayerFrame};

const SLOW_SPEED_UU_S: f32 = 500.0;
const BOOST_SPEED_UU_S: f32 = 1410.0;
const SUPERSONIC_SPEED_UU_S: f32 = 2300.0;

const GROUND_HEIGHT: f32 = 25.0;
const HIGH_AIR_HEIGHT: f32 = 500.0;

const MIN_POWERSLIDE_DURATION: f64 = 0.1;
const MIN_POWERSLIDE_ANGULAR_VELOCITY: f32 = 2.0;

const MIN_AERIAL_HEIGHT: f32 = 200.0;
const MIN_AERIAL_DURATION: f64 = 0.5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MovementStats {
    pub avg_speed_kph: f64,
    pub time_slow_s: f64,
    pub time_boost_speed_s: f64,
    pub time_supersonic_s: f64,
    pub time_ground_s: f64,
    pub time_low_air_s: f64,
    pub time_high_air_s: f64,
    pub powerslide_count: u32,
    pub powerslide_duration_s: f64,
    pub aerial_count: u32,
    pub aerial_time_s: f64,
}

pub fn analyze_movement(frames: &[Frame], _events: &EventsBundle, scope: Scope<'_>) -> MovementStats {
    if frames.is_empty() {
        return MovementStats::default();
    }
    match scope {
        Scope::Player(player_id) => analyze_player(frames, player_id),
        Scope::Team(team) => {
            let players = team_player_ids(frames, team);
            if players.is_empty() {
                return MovementStats::default();
            }
            let mut team_stats = MovementStats::default();
            for player_id in &players {
                let p = analyze_player(frames, player_id);
                team_stats.time_slow_s += p.time_slow_s;
                team_stats.time_boost_speed_s += p.time_boost_speed_s;
                team_stats.time_supersonic_s += p.time_supersonic_s;
                team_stats.time_ground_s += p.time_ground_s;
                team_stats.time_low_air_s += p.time_low_air_s;
                team_stats.time_high_air_s += p.time_high_air_s;
                team_stats.powerslide_count += p.powerslide_count;
                team_stats.powerslide_duration_s += p.powerslide_duration_s;
                team_stats.aerial_count += p.aerial_count;
                team_stats.aerial_time_s += p.aerial_time_s;
                team_stats.avg_speed_kph += p.avg_speed_kph;
            }
            team_stats.avg_speed_kph = round2(team_stats.avg_speed_kph / players.len() as f64);
            team_stats
        }
    }
}

fn analyze_player(frames: &[Frame], player_id: &str) -> MovementStats {
    let mut stats = MovementStats::default();

    let mut total_speed = 0.0f64;
    let mut frame_count = 0u64;

    let mut prev_player: Option<PlayerFrame> = None;
    let mut prev_timestamp: Option<f64> = None;
    let mut in_powerslide = false;
    let mut powerslide_start = 0.0f64;
    let mut in_aerial = false;
    let mut aerial_start = 0.0f64;

    for (index, frame) in frames.iter().enumerate() {
        let Some(player) = find_player(frame, player_id) else {
            continue;
        };

        let speed = player.velocity.magnitude();
        let height = player.position.z;
        total_speed += f64::from(speed);
        frame_count += 1;

        let dt = frame_duration(frames, index, prev_timestamp);

        if speed <= SLOW_SPEED_UU_S {
            stats.time_slow_s += dt;
        } else if speed < BOOST_SPEED_UU_S {
            stats.time_boost_speed_s += dt;
        } else if speed >= SUPERSONIC_SPEED_UU_S || player.is_supersonic {
            stats.time_supersonic_s += dt;
        } else {
            stats.time_boost_speed_s += dt;
        }

        if height <= GROUND_HEIGHT || player.is_on_ground {
            stats.time_ground_s += dt;
        } else if height <= HIGH_AIR_HEIGHT {
            stats.time_low_air_s += dt;
        } else {
            stats.time_high_air_s += dt;
        }

        let is_powersliding = detect_powerslide(player, prev_player.as_ref());
        if is_powersliding && !in_powerslide {
            in_powerslide = true;
            powerslide_start = frame.timestamp;
        } else if !is_powersliding && in_powerslide {
            let slide = frame.timestamp - powerslide_start;
            if slide >= MIN_POWERSLIDE_DURATION {
                stats.powerslide_count += 1;
                stats.powerslide_duration_s += slide;
            }
            in_powerslide = false;
        }

        let is_aerial = height >= MIN_AERIAL_HEIGHT && !player.is_on_ground;
        if is_aerial && !in_aerial {
            in_aerial = true;
            aerial_start = frame.timestamp;
        } else if !is_aerial && in_aerial {
            let air = frame.timestamp - aerial_start;
            if air >= MIN_AERIAL_DURATION {
                stats.aerial_count += 1;
                stats.aerial_time_s += air;
            }
            in_aerial = false;
        }

        prev_player = Some(player.clone());
        prev_timestamp = Some(frame.timestamp);
    }

    if let Some(last_t) = prev_timestamp {
        if in_powerslide {
            let slide = last_t - powerslide_start;
            if slide >= MIN_POWERSLIDE_DURATION {
                stats.powerslide_count += 1;
                stats.powerslide_duration_s += slide;
            }
        }
        if in_aerial {
            let air = last_t - aerial_start;
            if air >= MIN_AERIAL_DURATION {
                stats.aerial_count += 1;
                stats.aerial_time_s += air;
            }
        }
    }

    if frame_count > 0 {
        stats.avg_speed_kph = round2(total_speed / frame_count as f64 * UU_S_TO_KPH);
    }
    stats.time_slow_s = round2(stats.time_slow_s);
    stats.time_boost_speed_s = round2(stats.time_boost_speed_s);
    stats.time_supersonic_s = round2(stats.time_supersonic_s);
    stats.time_ground_s = round2(stats.time_ground_s);
    stats.time_low_air_s = round2(stats.time_low_air_s);
    stats.time_high_air_s = round2(stats.time_high_air_s);
    stats.powerslide_duration_s = round2(stats.powerslide_duration_s);
    stats.aerial_time_s = round2(stats.aerial_time_s);
    stats
}

/// Powersliding: on the ground with a high yaw rate.
fn detect_powerslide(current: &PlayerFrame, previous: Option<&PlayerFrame>) -> bool {
    let Some(previous) = previous else {
        return false;
    };
    if !current.is_on_ground {
        return false;
    }
    let dt = 0.033f32;
    let yaw_rate = (current.rotation.yaw - previous.rotation.yaw).abs() / dt;
    yaw_rate >= MIN_POWERSLIDE_ANGULAR_VELOCITY
}
