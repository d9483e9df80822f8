//! Mechanics detection: jumps, flips, wavedashes, aerials, half-flips, and
//! speedflips inferred from physics state.
//!
//! The detector carries a per-player state machine across frames tracking
//! airborne state and jump/flip exhaustion; mechanics register on z-velocity
//! spikes combined with rotation rates. State resets on landing.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::math::{normalize_angle, Vec3};
use crate::normalize::Frame;

const GROUND_HEIGHT_THRESHOLD: f32 = 25.0;
const JUMP_Z_VELOCITY_THRESHOLD: f32 = 292.0;
const FLIP_ANGULAR_THRESHOLD: f32 = 5.0;
const JUMP_COOLDOWN: f64 = 0.1;
const AERIAL_HEIGHT_THRESHOLD: f32 = 200.0;
const WAVEDASH_LANDING_WINDOW: f64 = 0.2;
const FLIP_CANCEL_PITCH_REVERSAL_THRESHOLD: f32 = 3.0;
const FLIP_CANCEL_WINDOW: f64 = 0.25;
const HALF_FLIP_YAW_CHANGE_THRESHOLD: f32 = 2.5;
const HALF_FLIP_DETECTION_WINDOW: f64 = 0.6;
const SPEEDFLIP_CANCEL_WINDOW: f64 = 0.20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MechanicType {
    Jump,
    DoubleJump,
    Flip,
    Wavedash,
    FlipCancel,
    Aerial,
    HalfFlip,
    Speedflip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlipDirection {
    Forward,
    Backward,
    Left,
    Right,
    Diagonal,
}

/// A detected mechanic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MechanicEvent {
    pub timestamp: f64,
    pub player_id: String,
    pub mechanic_type: MechanicType,
    pub position: Vec3,
    pub velocity: Vec3,
    pub direction: Option<FlipDirection>,
    pub height: f64,
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MechanicsStats {
    pub jump_count: u32,
    pub double_jump_count: u32,
    pub flip_count: u32,
    pub wavedash_count: u32,
    pub aerial_count: u32,
    pub halfflip_count: u32,
    pub speedflip_count: u32,
    pub flip_cancel_count: u32,
    pub total_mechanics: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamMechanicsStats {
    pub total_wavedashes: u32,
    pub total_halfflips: u32,
    pub total_speedflips: u32,
    pub total_aerials: u32,
    pub total_flips: u32,
    pub total_flip_cancels: u32,
}

#[derive(Debug, Clone, Default)]
pub struct MechanicsOutput {
    pub per_player: BTreeMap<String, MechanicsStats>,
    pub events: Vec<MechanicEvent>,
}

#[derive(Default)]
struct PlayerMechState {
    is_airborne: bool,
    airborne_start_time: Option<f64>,
    has_jumped: bool,
    has_double_jumped: bool,
    has_flipped: bool,
    last_ground_time: f64,

    prev_z_velocity: f32,
    prev_pitch: f32,
    prev_yaw: f32,
    prev_roll: f32,
    prev_pitch_rate: f32,

    flip_start_time: Option<f64>,
    flip_direction: Option<FlipDirection>,
    flip_cancel_detected: bool,
    initial_yaw: f32,

    last_aerial_time: Option<f64>,
    last_half_flip_time: Option<f64>,
    last_speedflip_time: Option<f64>,
}

fn flip_direction(pitch_rate: f32, yaw_rate: f32, roll_rate: f32) -> FlipDirection {
    if pitch_rate.abs() > roll_rate.abs() && pitch_rate.abs() > yaw_rate.abs() {
        if pitch_rate > 0.0 {
            FlipDirection::Forward
        } else {
            FlipDirection::Backward
        }
    } else if roll_rate.abs() > pitch_rate.abs() && roll_rate.abs() > yaw_rate.abs() {
        if roll_rate > 0.0 {
            FlipDirection::Left
        } else {
            FlipDirection::Right
        }
    } else {
        FlipDirection::Diagonal
    }
}

/// Detect mechanics for a single player across the frame list.
pub fn detect_mechanics_for_player(frames: &[Frame], player_id: &str) -> Vec<MechanicEvent> {
    let mut events: Vec<MechanicEvent> = Vec::new();
    let mut state = PlayerMechState::default();
    let mut prev_timestamp: Option<f64> = None;
    let mut have_prev_player = false;

    for frame in frames {
        let Some(player) = frame.player(player_id) else {
            prev_timestamp = Some(frame.timestamp);
            continue;
        };

        let timestamp = frame.timestamp;
        let pos = player.position;
        let vel = player.velocity;
        let (pitch, yaw, roll) = (
            player.rotation.pitch,
            player.rotation.yaw,
            player.rotation.roll,
        );

        let mut pitch_rate = 0.0f32;
        if have_prev_player {
            let dt = (timestamp - prev_timestamp.unwrap_or(timestamp)).max(0.001) as f32;
            pitch_rate = (pitch - state.prev_pitch) / dt;
            let yaw_rate = (yaw - state.prev_yaw) / dt;
            let roll_rate = (roll - state.prev_roll) / dt;

            let was_airborne = state.is_airborne;
            let is_on_ground = pos.z < GROUND_HEIGHT_THRESHOLD || player.is_on_ground;

            if is_on_ground && was_airborne {
                // Landing within the window of a flip start is a wavedash.
                if let Some(flip_start) = state.flip_start_time {
                    if timestamp - flip_start < WAVEDASH_LANDING_WINDOW {
                        events.push(MechanicEvent {
                            timestamp,
                            player_id: player_id.to_string(),
                            mechanic_type: MechanicType::Wavedash,
                            position: pos,
                            velocity: vel,
                            direction: state.flip_direction,
                            height: 0.0,
                            duration: Some(timestamp - flip_start),
                        });
                    }
                }
                state.is_airborne = false;
                state.has_jumped = false;
                state.has_double_jumped = false;
                state.has_flipped = false;
                state.airborne_start_time = None;
                state.flip_start_time = None;
                state.flip_cancel_detected = false;
                state.last_ground_time = timestamp;
            } else if !is_on_ground && !was_airborne {
                state.is_airborne = true;
                state.airborne_start_time = Some(timestamp);
            } else if !is_on_ground {
                let z_spike = vel.z - state.prev_z_velocity;
                let time_since_ground = timestamp - state.last_ground_time;

                if z_spike > JUMP_Z_VELOCITY_THRESHOLD && time_since_ground > JUMP_COOLDOWN {
                    let rot_rate = (pitch_rate * pitch_rate + roll_rate * roll_rate).sqrt();
                    if rot_rate > FLIP_ANGULAR_THRESHOLD {
                        if !state.has_flipped {
                            state.has_flipped = true;
                            state.flip_start_time = Some(timestamp);
                            state.flip_cancel_detected = false;
                            let direction = flip_direction(pitch_rate, yaw_rate, roll_rate);
                            state.flip_direction = Some(direction);
                            state.initial_yaw = yaw;
                            events.push(MechanicEvent {
                                timestamp,
                                player_id: player_id.to_string(),
                                mechanic_type: MechanicType::Flip,
                                position: pos,
                                velocity: vel,
                                direction: Some(direction),
                                height: f64::from(pos.z),
                                duration: None,
                            });
                        }
                    } else if !state.has_jumped {
                        state.has_jumped = true;
                        events.push(MechanicEvent {
                            timestamp,
                            player_id: player_id.to_string(),
                            mechanic_type: MechanicType::Jump,
                            position: pos,
                            velocity: vel,
                            direction: None,
                            height: f64::from(pos.z),
                            duration: None,
                        });
                    } else if !state.has_double_jumped && !state.has_flipped {
                        state.has_double_jumped = true;
                        events.push(MechanicEvent {
                            timestamp,
                            player_id: player_id.to_string(),
                            mechanic_type: MechanicType::DoubleJump,
                            position: pos,
                            velocity: vel,
                            direction: None,
                            height: f64::from(pos.z),
                            duration: None,
                        });
                    }
                }

                // Sustained high flight registers one aerial per second.
                if pos.z > AERIAL_HEIGHT_THRESHOLD && state.has_jumped {
                    if let Some(airborne_start) = state.airborne_start_time {
                        let airborne = timestamp - airborne_start;
                        let recent = state
                            .last_aerial_time
                            .map_or(false, |t| timestamp - t < 1.0);
                        if airborne > 0.5 && !recent {
                            state.last_aerial_time = Some(timestamp);
                            events.push(MechanicEvent {
                                timestamp,
                                player_id: player_id.to_string(),
                                mechanic_type: MechanicType::Aerial,
                                position: pos,
                                velocity: vel,
                                direction: None,
                                height: f64::from(pos.z),
                                duration: None,
                            });
                        }
                    }
                }

                // Flip cancel: pitch-rate reversal shortly after the flip.
                if state.has_flipped && !state.flip_cancel_detected {
                    if let Some(flip_start) = state.flip_start_time {
                        let flip_elapsed = timestamp - flip_start;
                        if flip_elapsed < FLIP_CANCEL_WINDOW {
                            let reversal = (pitch_rate - state.prev_pitch_rate).abs();
                            if reversal > FLIP_CANCEL_PITCH_REVERSAL_THRESHOLD {
                                state.flip_cancel_detected = true;
                                events.push(MechanicEvent {
                                    timestamp,
                                    player_id: player_id.to_string(),
                                    mechanic_type: MechanicType::FlipCancel,
                                    position: pos,
                                    velocity: vel,
                                    direction: state.flip_direction,
                                    height: f64::from(pos.z),
                                    duration: None,
                                });
                            }
                        }
                    }
                }

                if state.has_flipped && state.flip_cancel_detected {
                    if let Some(flip_start) = state.flip_start_time {
                        let flip_elapsed = timestamp - flip_start;

                        if state.flip_direction == Some(FlipDirection::Backward)
                            && flip_elapsed < HALF_FLIP_DETECTION_WINDOW
                        {
                            let yaw_change = normalize_angle(yaw - state.initial_yaw).abs();
                            let recent = state
                                .last_half_flip_time
                                .map_or(false, |t| (timestamp - t).abs() < 0.3);
                            if yaw_change > HALF_FLIP_YAW_CHANGE_THRESHOLD && !recent {
                                state.last_half_flip_time = Some(timestamp);
                                events.push(MechanicEvent {
                                    timestamp,
                                    player_id: player_id.to_string(),
                                    mechanic_type: MechanicType::HalfFlip,
                                    position: pos,
                                    velocity: vel,
                                    direction: Some(FlipDirection::Backward),
                                    height: f64::from(pos.z),
                                    duration: Some(flip_elapsed),
                                });
                            }
                        } else if state.flip_direction == Some(FlipDirection::Diagonal)
                            && flip_elapsed < SPEEDFLIP_CANCEL_WINDOW * 2.0
                        {
                            let recent = state
                                .last_speedflip_time
                                .map_or(false, |t| (timestamp - t).abs() < 0.3);
                            if !recent {
                                state.last_speedflip_time = Some(timestamp);
                                events.push(MechanicEvent {
                                    timestamp,
                                    player_id: player_id.to_string(),
                                    mechanic_type: MechanicType::Speedflip,
                                    position: pos,
                                    velocity: vel,
                                    direction: Some(FlipDirection::Diagonal),
                                    height: f64::from(pos.z),
                                    duration: Some(flip_elapsed),
                                });
                            }
                        }
                    }
                }
            }
        }

        state.prev_z_velocity = vel.z;
        state.prev_pitch = pitch;
        state.prev_yaw = yaw;
        state.prev_roll = roll;
        if have_prev_player {
            state.prev_pitch_rate = pitch_rate;
        }

        prev_timestamp = Some(timestamp);
        have_prev_player = true;
    }

    events
}

/// Detect mechanics for every player in one pass over the replay.
pub fn analyze_mechanics(frames: &[Frame]) -> MechanicsOutput {
    let mut player_ids: BTreeSet<String> = BTreeSet::new();
    for frame in frames {
        for player in &frame.players {
            player_ids.insert(player.player_id.clone());
        }
    }

    let mut per_player = BTreeMap::new();
    let mut all_events = Vec::new();

    for player_id in &player_ids {
        let events = detect_mechanics_for_player(frames, player_id);
        let mut stats = MechanicsStats::default();
        for event in &events {
            match event.mechanic_type {
                MechanicType::Jump => stats.jump_count += 1,
                MechanicType::DoubleJump => stats.double_jump_count += 1,
                MechanicType::Flip => stats.flip_count += 1,
                MechanicType::Wavedash => stats.wavedash_count += 1,
                MechanicType::Aerial => stats.aerial_count += 1,
                MechanicType::HalfFlip => stats.halfflip_count += 1,
                MechanicType::Speedflip => stats.speedflip_count += 1,
                MechanicType::FlipCancel => stats.flip_cancel_count += 1,
            }
            stats.total_mechanics += 1;
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

    MechanicsOutput {
        per_player,
        events: all_events,
    }
}

/// Sum a team's per-player counts into the team mechanics block.
pub fn team_mechanics(
    per_player: &BTreeMap<String, MechanicsStats>,
    team_player_ids: &[String],
) -> TeamMechanicsStats {
    let mut totals = TeamMechanicsStats::default();
    for player_id in team_player_ids {
        let Some(stats) = per_player.get(player_id) else {
            continue;
        };
        totals.total_wavedashes += stats.wavedash_count;
        totals.total_halfflips += stats.halfflip_count;
        totals.total_speedflips += stats.speedflip_count;
        totals.total_aerials += stats.aerial_count;
        totals.total_flips += stats.flip_count;
        totals.total_flip_cancels += stats.flip_cancel_count;
    }
    totals
}
