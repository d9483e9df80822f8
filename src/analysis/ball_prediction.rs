//! Ball-prediction reads: how well each player anticipates where the ball
//! is going.
//!
//! Every sample interval the ball is simulated forward with simplified
//! physics, the player's reachable intercept is computed, and the result is
//! compared to where the ball actually went half a second later.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::constants::{
    BACK_WALL_Y, BALL_DRAG, BALL_RADIUS, BOUNCE_COEFFICIENT, CEILING_Z, GOAL_HEIGHT, GOAL_WIDTH,
    GRAVITY_Z, SIDE_WALL_X, WALL_BOUNCE_COEFFICIENT,
};
use crate::math::{round2, round3, Vec3};
use crate::normalize::{Frame, PlayerFrame};

const EXCELLENT_READ_ERROR: f32 = 150.0;
const GOOD_READ_ERROR: f32 = 300.0;
const AVERAGE_READ_ERROR: f32 = 600.0;
const POOR_READ_ERROR: f32 = 1200.0;
const SAMPLE_INTERVAL_S: f64 = 0.5;
const LOOKAHEAD_S: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadQuality {
    Excellent,
    Good,
    Average,
    Poor,
    Whiff,
}

impl ReadQuality {
    pub const ALL: [ReadQuality; 5] = [
        ReadQuality::Excellent,
        ReadQuality::Good,
        ReadQuality::Average,
        ReadQuality::Poor,
        ReadQuality::Whiff,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReadQuality::Excellent => "EXCELLENT",
            ReadQuality::Good => "GOOD",
            ReadQuality::Average => "AVERAGE",
            ReadQuality::Poor => "POOR",
            ReadQuality::Whiff => "WHIFF",
        }
    }
}

/// One sampled read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadEvent {
    pub timestamp: f64,
    pub player_id: String,
    pub predicted_intercept: Vec3,
    pub actual_ball_position: Vec3,
    pub prediction_error: f64,
    pub read_quality: ReadQuality,
    pub was_proactive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BallPredictionStats {
    pub total_reads: u32,
    pub quality_distribution: BTreeMap<String, u32>,
    pub excellent_reads: u32,
    pub poor_reads: u32,
    pub average_prediction_error: f64,
    pub proactive_rate: f64,
}

impl BallPredictionStats {
    pub fn empty() -> Self {
        let mut stats = BallPredictionStats::default();
        for quality in ReadQuality::ALL {
            stats
                .quality_distribution
                .insert(quality.as_str().to_string(), 0);
        }
        stats
    }
}

#[derive(Debug, Clone, Default)]
pub struct BallPredictionOutput {
    pub per_player: BTreeMap<String, BallPredictionStats>,
    pub reads: Vec<ReadEvent>,
}

/// Simulate the ball forward with gravity, drag, and simple bounces.
pub fn predict_ball_position(position: Vec3, velocity: Vec3, time_delta: f64) -> Vec3 {
    let mut x = position.x;
    let mut y = position.y;
    let mut z = position.z;
    let mut vx = velocity.x;
    let mut vy = velocity.y;
    let mut vz = velocity.z;

    let dt: f64 = if time_delta < 0.5 {
        0.016
    } else if time_delta < 2.0 {
        0.033
    } else {
        0.066
    };

    let mut t = 0.0f64;
    while t < time_delta {
        let step = dt.min(time_delta - t) as f32;

        vz += GRAVITY_Z * step;

        let speed = (vx * vx + vy * vy + vz * vz).sqrt();
        if speed > 10.0 {
            let drag = 1.0 - BALL_DRAG * step;
            vx *= drag;
            vy *= drag;
            vz *= drag;
        }

        x += vx * step;
        y += vy * step;
        z += vz * step;

        if z < BALL_RADIUS {
            z = BALL_RADIUS;
            vz = -vz * BOUNCE_COEFFICIENT;
        }
        if z > CEILING_Z - BALL_RADIUS {
            z = CEILING_Z - BALL_RADIUS;
            vz = -vz * BOUNCE_COEFFICIENT;
        }
        if x > SIDE_WALL_X - BALL_RADIUS {
            x = SIDE_WALL_X - BALL_RADIUS;
            vx = -vx * WALL_BOUNCE_COEFFICIENT;
        } else if x < -SIDE_WALL_X + BALL_RADIUS {
            x = -SIDE_WALL_X + BALL_RADIUS;
            vx = -vx * WALL_BOUNCE_COEFFICIENT;
        }
        // Back walls bounce only outside the goal mouth.
        if y > BACK_WALL_Y - BALL_RADIUS {
            if x.abs() > GOAL_WIDTH || z > GOAL_HEIGHT {
                y = BACK_WALL_Y - BALL_RADIUS;
                vy = -vy * WALL_BOUNCE_COEFFICIENT;
            }
        } else if y < -BACK_WALL_Y + BALL_RADIUS && (x.abs() > GOAL_WIDTH || z > GOAL_HEIGHT) {
            y = -BACK_WALL_Y + BALL_RADIUS;
            vy = -vy * WALL_BOUNCE_COEFFICIENT;
        }

        t += f64::from(step);
    }

    Vec3::new(x, y, z)
}

/// Earliest simulated ball position the player could reach given their
/// current speed plus boost headroom.
fn intercept_point(player: &PlayerFrame, ball_pos: Vec3, ball_vel: Vec3) -> Vec3 {
    let player_speed = player.velocity.magnitude();
    let max_player_speed = (player_speed + 500.0).max(1400.0);

    let mut best_intercept = ball_pos;
    let mut best_time = 3.0f64;

    for t in [0.2, 0.4, 0.6, 0.8, 1.0, 1.5, 2.0, 2.5, 3.0] {
        let predicted = predict_ball_position(ball_pos, ball_vel, t);
        let distance = predicted.distance(player.position);
        let player_time = f64::from(distance / max_player_speed);
        if player_time <= t && t < best_time {
            best_time = t;
            best_intercept = predicted;
        }
    }

    best_intercept
}

fn assess_read(
    player: &PlayerFrame,
    predicted: Vec3,
    actual: Vec3,
) -> (ReadQuality, f32, bool) {
    let error = predicted.distance(actual);

    let to_predicted = predicted - player.position;
    let to_predicted_mag = to_predicted.magnitude();
    let vel_mag = player.velocity.magnitude();

    let mut proactive = false;
    if vel_mag > 100.0 && to_predicted_mag > 100.0 {
        let alignment = player.velocity.dot(to_predicted) / (vel_mag * to_predicted_mag);
        if alignment > 0.7 {
            proactive = true;
        }
    }

    let quality = if error < EXCELLENT_READ_ERROR {
        ReadQuality::Excellent
    } else if error < GOOD_READ_ERROR {
        ReadQuality::Good
    } else if error < AVERAGE_READ_ERROR {
        ReadQuality::Average
    } else if error < POOR_READ_ERROR {
        ReadQuality::Poor
    } else {
        ReadQuality::Whiff
    };

    (quality, error, proactive)
}

pub fn analyze_player_reads(frames: &[Frame], player_id: &str) -> Vec<ReadEvent> {
    let mut events = Vec::new();
    if frames.len() < 10 {
        return events;
    }

    let mut last_sample = -SAMPLE_INTERVAL_S;

    for (i, frame) in frames.iter().enumerate() {
        if frame.timestamp - last_sample < SAMPLE_INTERVAL_S {
            continue;
        }
        let Some(player) = frame.player(player_id) else {
            continue;
        };
        let Some(future) = frames[i + 1..]
            .iter()
            .find(|f| f.timestamp >= frame.timestamp + LOOKAHEAD_S)
        else {
            continue;
        };

        let intercept = intercept_point(player, frame.ball.position, frame.ball.velocity);
        let (quality, error, proactive) = assess_read(player, intercept, future.ball.position);

        events.push(ReadEvent {
            timestamp: frame.timestamp,
            player_id: player_id.to_string(),
            predicted_intercept: intercept,
            actual_ball_position: future.ball.position,
            prediction_error: round2(f64::from(error)),
            read_quality: quality,
            was_proactive: proactive,
        });

        last_sample = frame.timestamp;
    }

    events
}

/// One-pass read analysis for every player.
pub fn analyze_ball_prediction(frames: &[Frame]) -> BallPredictionOutput {
    let mut player_ids: BTreeSet<String> = BTreeSet::new();
    for frame in frames {
        for player in &frame.players {
            player_ids.insert(player.player_id.clone());
        }
    }

    let mut per_player = BTreeMap::new();
    let mut all_reads = Vec::new();

    for player_id in &player_ids {
        let reads = analyze_player_reads(frames, player_id);
        let mut stats = BallPredictionStats::empty();
        let mut total_error = 0.0f64;
        let mut proactive_count = 0u32;
        for read in &reads {
            *stats
                .quality_distribution
                .entry(read.read_quality.as_str().to_string())
                .or_insert(0) += 1;
            total_error += read.prediction_error;
            if read.was_proactive {
                proactive_count += 1;
            }
            match read.read_quality {
                ReadQuality::Excellent => stats.excellent_reads += 1,
                ReadQuality::Poor | ReadQuality::Whiff => stats.poor_reads += 1,
                _ => {}
            }
        }
        stats.total_reads = reads.len() as u32;
        if !reads.is_empty() {
            stats.average_prediction_error = round2(total_error / reads.len() as f64);
            stats.proactive_rate = round3(f64::from(proactive_count) / reads.len() as f64);
        }
        per_player.insert(player_id.clone(), stats);
        all_reads.extend(reads);
    }

    all_reads.sort_by(|a, b| {
        a.timestamp
            .partial_cmp(&b.timestamp)
            .expect("timestamps are finite")
            .then_with(|| a.player_id.cmp(&b.player_id))
    });

    BallPredictionOutput {
        per_player,
        reads: all_reads,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prediction_applies_gravity() {
        let predicted =
            predict_ball_position(Vec3::new(0.0, 0.0, 1000.0), Vec3::ZERO, 0.5);
        assert!(predicted.z < 1000.0);
    }

    #[test]
    fn prediction_bounces_off_floor() {
        let predicted =
            predict_ball_position(Vec3::new(0.0, 0.0, 100.0), Vec3::new(0.0, 0.0, -2000.0), 1.0);
        assert!(predicted.z >= BALL_RADIUS);
    }
}
