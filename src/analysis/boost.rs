//! Boost economy: collection rates, time at empty/full, overfill and waste.

use serde::Serialize;

use crate::analysis::{find_player, team_player_ids, Scope};
use crate::constants::{BIG_PAD_CAPACITY, SMALL_PAD_CAPACITY};
use crate::events::types::{BoostPickupEvent, EventsBundle, PadType};
use crate::identity::Team;
use crate::math::round2;
use crate::normalize::Frame;

const ZERO_BOOST_THRESHOLD: f64 = 3.0;
const FULL_BOOST_THRESHOLD: f64 = 99.0;
const OVERFILL_THRESHOLD: f64 = 80.0;
const OVERFILL_BASELINE: f64 = 85.0;
const SUPERSONIC_SPEED_THRESHOLD: f32 = 2300.0;
const WASTE_DETECTION_MIN_BOOST: f64 = 10.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoostStats {
    pub bpm: f64,
    pub bcpm: f64,
    pub avg_boost: f64,
    pub time_zero_boost_s: f64,
    pub time_hundred_boost_s: f64,
    pub amount_collected: f64,
    pub amount_stolen: f64,
    pub big_pads: u32,
    pub small_pads: u32,
    pub stolen_big_pads: u32,
    pub stolen_small_pads: u32,
    pub overfill: f64,
    pub waste: f64,
}

pub fn analyze_boost(frames: &[Frame], events: &EventsBundle, scope: Scope<'_>) -> BoostStats {
    let match_duration = match (frames.first(), frames.last()) {
        (Some(first), Some(last)) => last.timestamp - first.timestamp,
        _ => 0.0,
    };

    match scope {
        Scope::Player(player_id) => {
            analyze_player(frames, &events.boost_pickups, player_id, match_duration)
        }
        Scope::Team(team) => analyze_team(frames, &events.boost_pickups, team, match_duration),
    }
}

fn analyze_player(
    frames: &[Frame],
    pickups: &[BoostPickupEvent],
    player_id: &str,
    match_duration: f64,
) -> BoostStats {
    let mut stats = BoostStats::default();

    let mut total_boost = 0.0f64;
    let mut frame_count = 0u64;
    let mut prev_boost: Option<f64> = None;
    let mut prev_speed: Option<f32> = None;
    let mut prev_timestamp: Option<f64> = None;

    for frame in frames {
        let Some(player) = find_player(frame, player_id) else {
            continue;
        };
        frame_count += 1;
        let boost = f64::from(player.boost_amount);
        total_boost += boost;
        let speed = player.velocity.magnitude();

        if let Some(prev_t) = prev_timestamp {
            let dt = frame.timestamp - prev_t;
            if let Some(prev) = prev_boost {
                if prev <= ZERO_BOOST_THRESHOLD {
                    stats.time_zero_boost_s += dt;
                }
                if prev >= FULL_BOOST_THRESHOLD {
                    stats.time_hundred_boost_s += dt;
                }

                // Waste: boost burned while supersonic, or burned without a
                // commensurate gain in speed.
                if prev > boost {
                    let consumed = prev - boost;
                    if speed > SUPERSONIC_SPEED_THRESHOLD && consumed > WASTE_DETECTION_MIN_BOOST {
                        stats.waste += consumed * 0.7;
                    } else if let Some(prev_speed) = prev_speed {
                        if speed < prev_speed + 50.0 && consumed > WASTE_DETECTION_MIN_BOOST {
                            stats.waste += consumed * 0.3;
                        }
                    }
                }
            }
        }

        prev_boost = Some(boost);
        prev_speed = Some(speed);
        prev_timestamp = Some(frame.timestamp);
    }

    for pickup in pickups.iter().filter(|p| p.player_id == player_id) {
        let gain = resolve_pickup_gain(pickup);
        stats.amount_collected += gain;
        if pickup.stolen {
            stats.amount_stolen += gain;
        }
        match pickup.pad_type {
            PadType::Big => {
                stats.big_pads += 1;
                if pickup.stolen {
                    stats.stolen_big_pads += 1;
                }
            }
            PadType::Small => {
                stats.small_pads += 1;
                if pickup.stolen {
                    stats.stolen_small_pads += 1;
                }
            }
        }
        stats.overfill += compute_overfill(
            pickup.pad_type,
            pickup.boost_before,
            pickup.boost_after,
            gain,
        );
    }

    let minutes = (match_duration / 60.0).max(1.0);
    stats.bpm = round2(stats.amount_collected / minutes);
    stats.bcpm = round2(f64::from(stats.big_pads + stats.small_pads) / minutes);
    stats.avg_boost = if frame_count > 0 {
        round2(total_boost / frame_count as f64)
    } else {
        0.0
    };
    stats.time_zero_boost_s = round2(stats.time_zero_boost_s);
    stats.time_hundred_boost_s = round2(stats.time_hundred_boost_s);
    stats.amount_collected = round2(stats.amount_collected);
    stats.amount_stolen = round2(stats.amount_stolen);
    stats.overfill = round2(stats.overfill);
    stats.waste = round2(stats.waste);
    stats
}

fn analyze_team(
    frames: &[Frame],
    pickups: &[BoostPickupEvent],
    team: Team,
    match_duration: f64,
) -> BoostStats {
    let team_players = team_player_ids(frames, team);
    if team_players.is_empty() {
        return BoostStats::default();
    }

    let mut team_stats = BoostStats::default();
    for player_id in &team_players {
        let player = analyze_player(frames, pickups, player_id, match_duration);
        team_stats.amount_collected += player.amount_collected;
        team_stats.amount_stolen += player.amount_stolen;
        team_stats.big_pads += player.big_pads;
        team_stats.small_pads += player.small_pads;
        team_stats.stolen_big_pads += player.stolen_big_pads;
        team_stats.stolen_small_pads += player.stolen_small_pads;
        team_stats.overfill += player.overfill;
        team_stats.waste += player.waste;
        team_stats.time_zero_boost_s += player.time_zero_boost_s;
        team_stats.time_hundred_boost_s += player.time_hundred_boost_s;
        // Team average boost is the sum of player averages.
        team_stats.avg_boost += player.avg_boost;
    }

    let minutes = (match_duration / 60.0).max(1.0);
    team_stats.bpm = round2(team_stats.amount_collected / minutes);
    team_stats.bcpm = round2(f64::from(team_stats.big_pads + team_stats.small_pads) / minutes);
    team_stats.avg_boost = round2(team_stats.avg_boost);
    team_stats.amount_collected = round2(team_stats.amount_collected);
    team_stats.amount_stolen = round2(team_stats.amount_stolen);
    team_stats.overfill = round2(team_stats.overfill);
    team_stats.waste = round2(team_stats.waste);
    team_stats.time_zero_boost_s = round2(team_stats.time_zero_boost_s);
    team_stats.time_hundred_boost_s = round2(team_stats.time_hundred_boost_s);
    team_stats
}

/// Gain for a pickup, with fallbacks when the event carries partial data.
fn resolve_pickup_gain(pickup: &BoostPickupEvent) -> f64 {
    let capacity = match pickup.pad_type {
        PadType::Big => f64::from(BIG_PAD_CAPACITY),
        PadType::Small => f64::from(SMALL_PAD_CAPACITY),
    };
    if pickup.boost_gain >= 0.5 {
        return pickup.boost_gain;
    }

    match (pickup.boost_before, pickup.boost_after) {
        (Some(before), Some(after)) => {
            let diff = after - before;
            if diff > 0.5 {
                return diff;
            }
            available_capacity(before, capacity)
        }
        (Some(before), None) => available_capacity(before, capacity),
        (None, Some(after)) => {
            let estimated_before = (after - capacity).max(0.0);
            let diff = after - estimated_before;
            if diff > 0.5 {
                return diff;
            }
            available_capacity(estimated_before, capacity)
        }
        (None, None) => capacity,
    }
}

fn available_capacity(before: f64, capacity: f64) -> f64 {
    let available = (100.0 - before).max(0.0);
    if available > 0.5 {
        capacity.min(available)
    } else {
        0.0
    }
}

/// Wasted pad capacity when collecting near-full.
fn compute_overfill(
    pad_type: PadType,
    boost_before: Option<f64>,
    boost_after: Option<f64>,
    gain: f64,
) -> f64 {
    let capacity = match pad_type {
        PadType::Big => f64::from(BIG_PAD_CAPACITY),
        PadType::Small => f64::from(SMALL_PAD_CAPACITY),
    };
    let before = boost_before.unwrap_or(0.0);
    let after = boost_after.unwrap_or(before + gain);

    if pad_type == PadType::Small {
        if before >= OVERFILL_THRESHOLD {
            return (capacity - gain).max(0.0);
        }
        return 0.0;
    }

    if before < OVERFILL_THRESHOLD {
        return 0.0;
    }
    let baseline = before.max(OVERFILL_BASELINE);
    let used = (after - baseline).max(0.0);
    (capacity - used).max(0.0)
}
