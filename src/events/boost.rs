//! Boost pickup detection.
//!
//! Two pathways: when the parser supplies pad replication events, those are
//! authoritative (validated against per-pad respawn windows); otherwise a
//! legacy heuristic walks each player's boost deltas and scores every pad by
//! proximity, expected gain, and respawn availability.

use std::collections::{BTreeMap, VecDeque};

use crate::constants::{
    pad_capacity, pad_envelope, BIG_PAD_MIN_GAIN, BIG_PAD_RESPAWN_S, BOOST_HISTORY_MAX_SAMPLES,
    BOOST_HISTORY_WINDOW_S, BOOST_PADS, BOOST_PICKUP_MERGE_WINDOW, BOOST_PICKUP_MIN_GAIN,
    BoostPad, CHAIN_PAD_RADIUS, MIN_ORIENTATION_SAMPLES, PAD_NEUTRAL_TOLERANCE,
    PAD_RESPAWN_TOLERANCE, RESPAWN_BOOST_AMOUNT, RESPAWN_DISTANCE_THRESHOLD, SMALL_PAD_RESPAWN_S,
    TEAM_SIDE_SAMPLE_FRAMES,
};
use crate::events::types::{BoostPickupEvent, PadType};
use crate::identity::Team;
use crate::math::{round3, Vec3};
use crate::normalize::{Frame, PadEventStatus};

/// Detect boost pickups, preferring parser-provided pad events.
pub fn detect_boost_pickups(frames: &[Frame]) -> Vec<BoostPickupEvent> {
    if frames.is_empty() {
        return Vec::new();
    }

    if frames.iter().any(|f| !f.boost_pad_events.is_empty()) {
        if let Some(pickups) = detect_from_pad_events(frames) {
            return merge_pickups(pickups);
        }
        log::warn!("pad events lacked player attribution, falling back to delta heuristics");
    }

    merge_pickups(detect_from_deltas(frames))
}

/// Infer which half each team defends: the sign of the mean Y of that team's
/// players over the opening frames.
pub fn determine_team_sides(frames: &[Frame]) -> BTreeMap<Team, i8> {
    let mut samples: BTreeMap<Team, Vec<f32>> =
        [(Team::Blue, Vec::new()), (Team::Orange, Vec::new())].into();

    for frame in frames.iter().take(TEAM_SIDE_SAMPLE_FRAMES) {
        for player in &frame.players {
            samples
                .get_mut(&player.team)
                .expect("both teams sampled")
                .push(player.position.y);
        }
        if samples.values().all(|v| v.len() >= MIN_ORIENTATION_SAMPLES) {
            break;
        }
    }

    let mut sides = BTreeMap::new();
    for (team, ys) in samples {
        let default_side = if team == Team::Blue { -1 } else { 1 };
        if ys.len() < MIN_ORIENTATION_SAMPLES {
            sides.insert(team, default_side);
            continue;
        }
        let avg: f32 = ys.iter().sum::<f32>() / ys.len() as f32;
        sides.insert(team, if avg >= 0.0 { 1 } else { -1 });
    }
    sides
}

fn is_stolen_pad(pad: &BoostPad, team: Option<Team>, sides: &BTreeMap<Team, i8>) -> bool {
    let Some(team) = team else {
        return false;
    };
    if pad.position.y.abs() <= PAD_NEUTRAL_TOLERANCE {
        return false;
    }
    let defending_sign = sides
        .get(&team)
        .copied()
        .unwrap_or(if team == Team::Blue { -1 } else { 1 });
    if defending_sign > 0 {
        pad.position.y < -PAD_NEUTRAL_TOLERANCE
    } else {
        pad.position.y > PAD_NEUTRAL_TOLERANCE
    }
}

fn pad_type(pad: &BoostPad) -> PadType {
    if pad.is_big {
        PadType::Big
    } else {
        PadType::Small
    }
}

// Path A: parser pad events ------------------------------------------------

/// Returns `None` when any COLLECTED event cannot be attributed to a player,
/// which sends the whole detection through the legacy path instead.
fn detect_from_pad_events(frames: &[Frame]) -> Option<Vec<BoostPickupEvent>> {
    let team_sides = determine_team_sides(frames);
    let mut pickups = Vec::new();
    let mut player_boost: BTreeMap<String, f64> = BTreeMap::new();
    let mut pad_last_collect: BTreeMap<usize, f64> = BTreeMap::new();

    for (frame_index, frame) in frames.iter().enumerate() {
        for event in &frame.boost_pad_events {
            if event.status != PadEventStatus::Collected {
                continue;
            }
            let Ok(pad_index) = usize::try_from(event.pad_id) else {
                continue;
            };
            let Some(pad) = BOOST_PADS.get(pad_index) else {
                continue;
            };

            let player_id = event.player_id.clone()?;
            let player_frame = frame.player(&player_id);
            let player_team = event
                .player_team
                .or_else(|| player_frame.map(|p| p.team));

            let timestamp = event.timestamp.unwrap_or(frame.timestamp);
            let respawn = if pad.is_big {
                BIG_PAD_RESPAWN_S
            } else {
                SMALL_PAD_RESPAWN_S
            };
            if let Some(last) = pad_last_collect.get(&pad.pad_id) {
                if timestamp - last < respawn - PAD_RESPAWN_TOLERANCE {
                    continue;
                }
            }

            let capacity = f64::from(pad_capacity(pad.is_big));
            let previous = player_boost.get(&player_id).copied();
            let current = player_frame.map(|p| f64::from(p.boost_amount));

            let mut before = previous;
            let mut after = current;
            if before.is_none() {
                if let Some(after_val) = after {
                    before = Some((after_val - capacity).max(0.0));
                }
            }
            if after.is_none() {
                if let Some(before_val) = before {
                    after = Some((before_val + capacity).min(100.0));
                }
            }
            let before = before.unwrap_or(0.0);
            let available_room = (100.0 - before).max(0.0);
            let mut after = after.unwrap_or_else(|| {
                if available_room > 0.5 {
                    (before + capacity.min(available_room)).min(100.0)
                } else {
                    before
                }
            });

            let mut gain = (after - before).max(0.0);
            if gain < 0.5 {
                if available_room > 0.5 {
                    gain = capacity.min(available_room);
                    after = (before + gain).min(100.0);
                } else {
                    gain = 0.0;
                    after = before;
                }
            }

            pickups.push(BoostPickupEvent {
                t: timestamp,
                player_id: player_id.clone(),
                pad_type: pad_type(pad),
                stolen: is_stolen_pad(pad, player_team, &team_sides),
                pad_id: pad.pad_id,
                location: pad.position,
                frame: Some(frame_index),
                boost_before: Some(round3(before)),
                boost_after: Some(round3(after)),
                boost_gain: round3(gain),
            });
            player_boost.insert(player_id, after);
            pad_last_collect.insert(pad.pad_id, timestamp);
        }

        for player in &frame.players {
            player_boost.insert(player.player_id.clone(), f64::from(player.boost_amount));
        }
    }

    pickups.sort_by(|a, b| a.t.partial_cmp(&b.t).expect("timestamps are finite"));
    Some(pickups)
}

// Path B: boost delta heuristics -------------------------------------------

struct PlayerState {
    boost: Option<f64>,
    history: VecDeque<(f64, Vec3)>,
    was_demolished: bool,
    skip_respawn_gain: bool,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            boost: None,
            history: VecDeque::with_capacity(BOOST_HISTORY_MAX_SAMPLES),
            was_demolished: false,
            skip_respawn_gain: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, derive_new::new)]
struct PadState {
    available_at: f64,
    #[new(default)]
    last_pickup: Option<f64>,
}

fn detect_from_deltas(frames: &[Frame]) -> Vec<BoostPickupEvent> {
    let team_sides = determine_team_sides(frames);
    let mut pickups: Vec<BoostPickupEvent> = Vec::new();
    let mut player_states: BTreeMap<String, PlayerState> = BTreeMap::new();
    let mut recent_pickup_index: BTreeMap<(String, usize), (usize, f64)> = BTreeMap::new();
    let mut pad_states: Vec<PadState> = vec![PadState::new(0.0); BOOST_PADS.len()];

    #[cfg(feature = "boost-debug")]
    let mut debug_records: Vec<serde_json::Value> = Vec::new();

    for (frame_index, frame) in frames.iter().enumerate() {
        let frame_time = frame.timestamp;
        for player in &frame.players {
            let state = player_states.entry(player.player_id.clone()).or_default();

            state.history.push_back((frame_time, player.position));
            while state
                .history
                .front()
                .is_some_and(|(t, _)| frame_time - t > BOOST_HISTORY_WINDOW_S)
            {
                state.history.pop_front();
            }
            while state.history.len() > BOOST_HISTORY_MAX_SAMPLES {
                state.history.pop_front();
            }

            let current_boost = f64::from(player.boost_amount);
            if player.is_demolished {
                state.was_demolished = true;
                state.skip_respawn_gain = true;
            } else if state.was_demolished {
                state.was_demolished = false;
                state.skip_respawn_gain = true;
            }

            let Some(previous_boost) = state.boost else {
                state.boost = Some(current_boost);
                continue;
            };
            let boost_increase = current_boost - previous_boost;

            // A ~33 fill far from every pad is a respawn, not a pickup.
            if (boost_increase - f64::from(RESPAWN_BOOST_AMOUNT)).abs() <= 2.0 {
                let nearest = nearest_pad_distance(&state.history);
                if nearest > RESPAWN_DISTANCE_THRESHOLD {
                    state.boost = Some(current_boost);
                    continue;
                }
            }
            if state.skip_respawn_gain {
                if boost_increase > 0.0 && current_boost <= 35.0 {
                    state.skip_respawn_gain = false;
                    state.boost = Some(current_boost);
                    continue;
                }
                if boost_increase <= 0.0 {
                    state.boost = Some(current_boost);
                    continue;
                }
                state.skip_respawn_gain = false;
            }

            if boost_increase >= f64::from(BOOST_PICKUP_MIN_GAIN) {
                let matched_pad =
                    select_boost_pad(&state.history, previous_boost, boost_increase, &pad_states, frame_time)
                        .or_else(|| {
                            fallback_nearest_pad(&state.history, &pad_states, frame_time, boost_increase)
                        });

                let Some(matched_pad) = matched_pad else {
                    state.boost = Some(current_boost);
                    continue;
                };

                let pad_events = if matched_pad.is_big
                    || boost_increase <= f64::from(pad_capacity(matched_pad.is_big)) + 1.0
                {
                    let respawn = if matched_pad.is_big {
                        BIG_PAD_RESPAWN_S
                    } else {
                        SMALL_PAD_RESPAWN_S
                    };
                    pad_states[matched_pad.pad_id].available_at = frame_time + respawn;
                    pad_states[matched_pad.pad_id].last_pickup = Some(frame_time);
                    vec![BoostPickupEvent {
                        t: frame_time,
                        player_id: player.player_id.clone(),
                        pad_type: pad_type(matched_pad),
                        stolen: is_stolen_pad(matched_pad, Some(player.team), &team_sides),
                        pad_id: matched_pad.pad_id,
                        location: matched_pad.position,
                        frame: Some(frame_index),
                        boost_before: Some(previous_boost),
                        boost_after: Some(current_boost),
                        boost_gain: boost_increase.max(0.0),
                    }]
                } else {
                    small_pad_chain(
                        &state.history,
                        matched_pad,
                        &mut pad_states,
                        frame_time,
                        &player.player_id,
                        player.team,
                        &team_sides,
                        frame_index,
                        previous_boost,
                        current_boost,
                    )
                };

                for event in pad_events {
                    let key = (player.player_id.clone(), event.pad_id);
                    let merged = recent_pickup_index
                        .get(&key)
                        .filter(|(_, t)| frame_time - t <= BOOST_PICKUP_MERGE_WINDOW)
                        .map(|(idx, _)| *idx);
                    if let Some(event_idx) = merged {
                        let prev = &mut pickups[event_idx];
                        prev.boost_gain += event.boost_gain.max(0.0);
                        prev.boost_after = event.boost_after;
                        recent_pickup_index.insert(key, (event_idx, frame_time));
                    } else {
                        pickups.push(event);
                        recent_pickup_index.insert(key, (pickups.len() - 1, frame_time));
                    }

                    #[cfg(feature = "boost-debug")]
                    {
                        let last = pickups.last().expect("just pushed or merged");
                        debug_records.push(serde_json::json!({
                            "frame": frame_index,
                            "timestamp": frame_time,
                            "player_id": last.player_id,
                            "pad_id": last.pad_id,
                            "pad_type": last.pad_type,
                            "boost_before": last.boost_before,
                            "boost_after": last.boost_after,
                            "boost_delta": last.boost_gain,
                            "stolen": last.stolen,
                        }));
                    }
                }
            }

            state.boost = Some(current_boost);
        }
    }

    #[cfg(feature = "boost-debug")]
    write_debug_records(&debug_records);

    pickups
}

/// Score every available pad by distance, expected-gain error, and time since
/// the player was nearest; lowest score wins.
fn select_boost_pad(
    history: &VecDeque<(f64, Vec3)>,
    previous_boost: f64,
    boost_increase: f64,
    pad_states: &[PadState],
    timestamp: f64,
) -> Option<&'static BoostPad> {
    let previous_boost = previous_boost.clamp(0.0, 100.0);
    let available_room = (100.0 - previous_boost).max(0.0);

    let mut best_pad: Option<&'static BoostPad> = None;
    let mut best_score = f64::INFINITY;

    for pad in BOOST_PADS.iter() {
        let envelope = pad_envelope(pad);
        let (distance, closest_time, height_delta) = minimum_distance_to_pad(history, pad.position);
        if height_delta > envelope.height_tolerance {
            continue;
        }
        if pad_states[pad.pad_id].available_at - timestamp > PAD_RESPAWN_TOLERANCE {
            continue;
        }

        let distance_penalty = if distance > envelope.max_distance {
            f64::from((distance - envelope.max_distance) / envelope.radius.max(1.0))
        } else {
            0.0
        };

        let capacity = f64::from(pad_capacity(pad.is_big));
        let expected_gain = capacity.min(available_room);
        let gain_error = (boost_increase - expected_gain).abs();
        let mut gain_score = gain_error / expected_gain.max(1.0);
        if !pad.is_big && boost_increase >= 40.0 {
            gain_score += 2.0;
        }

        let inside_radius = distance <= envelope.radius;
        let time_in_envelope = (timestamp - closest_time).max(0.0);
        let mut score = f64::from(distance / envelope.radius.max(1.0))
            + 0.6 * gain_score
            + 0.1 * time_in_envelope
            + distance_penalty;
        if !inside_radius {
            score += 0.8;
        }
        if !pad.is_big && boost_increase >= f64::from(BIG_PAD_MIN_GAIN) {
            score += 12.0;
        }

        if score < best_score {
            best_score = score;
            best_pad = Some(pad);
        }
    }

    best_pad
}

/// Last-resort selection when nothing fits the radius constraints: nearest
/// pad weighted by how badly its capacity disagrees with the observed gain.
fn fallback_nearest_pad(
    history: &VecDeque<(f64, Vec3)>,
    pad_states: &[PadState],
    timestamp: f64,
    boost_increase: f64,
) -> Option<&'static BoostPad> {
    let (_, last_pos) = history.back()?;

    let mut best_pad: Option<&'static BoostPad> = None;
    let mut best_score = f64::INFINITY;
    for pad in BOOST_PADS.iter() {
        if pad_states[pad.pad_id].available_at - timestamp > PAD_RESPAWN_TOLERANCE {
            continue;
        }
        let envelope = pad_envelope(pad);
        let distance = last_pos.distance(pad.position);
        let mut distance_score = f64::from(distance / envelope.radius.max(1.0));
        if !pad.is_big {
            distance_score += 0.8;
        }
        let capacity = f64::from(pad_capacity(pad.is_big));
        let capacity_error = (boost_increase - capacity).abs() / capacity.max(1.0);
        let mut score = distance_score + 2.5 * capacity_error;
        if !pad.is_big && boost_increase >= 36.0 {
            score += 12.0;
        }
        if score < best_score {
            best_score = score;
            best_pad = Some(pad);
        }
    }
    best_pad.or_else(|| BOOST_PADS.first())
}

fn minimum_distance_to_pad(
    history: &VecDeque<(f64, Vec3)>,
    pad_position: Vec3,
) -> (f32, f64, f32) {
    let mut best_distance = f32::INFINITY;
    let mut best_time = history.back().map(|(t, _)| *t).unwrap_or(0.0);
    let mut best_height_delta = f32::INFINITY;
    for (t, position) in history {
        let distance = position.distance(pad_position);
        if distance < best_distance {
            best_distance = distance;
            best_time = *t;
            best_height_delta = (position.z - pad_position.z).abs();
        }
    }
    (best_distance, best_time, best_height_delta)
}

fn nearest_pad_distance(history: &VecDeque<(f64, Vec3)>) -> f32 {
    let Some((_, last_pos)) = history.back() else {
        return f32::INFINITY;
    };
    BOOST_PADS
        .iter()
        .map(|pad| last_pos.distance(pad.position))
        .fold(f32::INFINITY, f32::min)
}

/// Split a gain larger than one small pad across a chain of nearby small
/// pads, ordered by approach time; residual goes to the last pad.
#[allow(clippy::too_many_arguments)]
fn small_pad_chain(
    history: &VecDeque<(f64, Vec3)>,
    matched_pad: &'static BoostPad,
    pad_states: &mut [PadState],
    timestamp: f64,
    player_id: &str,
    player_team: Team,
    team_sides: &BTreeMap<Team, i8>,
    frame_index: usize,
    previous_boost: f64,
    current_boost: f64,
) -> Vec<BoostPickupEvent> {
    let mut remaining_gain = (current_boost - previous_boost).max(0.0);
    let mut current_level = previous_boost;

    let mut candidates: Vec<(f64, f32, &'static BoostPad)> = Vec::new();
    let mut seen = false;
    for pad in BOOST_PADS.iter().filter(|p| !p.is_big) {
        let (distance, closest_time, height_delta) = minimum_distance_to_pad(history, pad.position);
        if distance > CHAIN_PAD_RADIUS || height_delta > 260.0 {
            continue;
        }
        if timestamp < pad_states[pad.pad_id].available_at - PAD_RESPAWN_TOLERANCE {
            continue;
        }
        candidates.push((closest_time, distance, pad));
        seen = seen || pad.pad_id == matched_pad.pad_id;
    }
    if !seen {
        if let Some((t, pos)) = history.back() {
            candidates.push((*t, pos.distance(matched_pad.position), matched_pad));
        }
    }
    candidates.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .expect("times are finite")
            .then_with(|| a.1.partial_cmp(&b.1).expect("distances are finite"))
            .then_with(|| a.2.pad_id.cmp(&b.2.pad_id))
    });
    candidates.dedup_by_key(|(_, _, pad)| pad.pad_id);

    let mut events = Vec::new();
    for (_, _, pad) in &candidates {
        if remaining_gain <= 1.0 {
            break;
        }
        let available_room = (100.0 - current_level).max(0.0);
        if available_room <= 0.0 {
            break;
        }
        let gain = f64::from(pad_capacity(false))
            .min(remaining_gain)
            .min(available_room);
        if gain < 1.0 {
            continue;
        }
        events.push(BoostPickupEvent {
            t: timestamp,
            player_id: player_id.to_string(),
            pad_type: PadType::Small,
            stolen: is_stolen_pad(pad, Some(player_team), team_sides),
            pad_id: pad.pad_id,
            location: pad.position,
            frame: Some(frame_index),
            boost_before: Some(current_level),
            boost_after: Some((current_level + gain).min(100.0)),
            boost_gain: gain,
        });
        pad_states[pad.pad_id].available_at = timestamp + SMALL_PAD_RESPAWN_S;
        pad_states[pad.pad_id].last_pickup = Some(timestamp);
        current_level = (current_level + gain).min(100.0);
        remaining_gain = (remaining_gain - gain).max(0.0);
    }

    if remaining_gain > 1.0 {
        if let Some(last) = events.last_mut() {
            let updated_gain = (last.boost_gain + remaining_gain).min(100.0);
            last.boost_after = last.boost_before.map(|b| (b + updated_gain).min(100.0));
            last.boost_gain = updated_gain;
        }
    }

    if events.is_empty() {
        events.push(BoostPickupEvent {
            t: timestamp,
            player_id: player_id.to_string(),
            pad_type: PadType::Small,
            stolen: is_stolen_pad(matched_pad, Some(player_team), team_sides),
            pad_id: matched_pad.pad_id,
            location: matched_pad.position,
            frame: Some(frame_index),
            boost_before: Some(previous_boost),
            boost_after: Some(current_boost),
            boost_gain: (current_boost - previous_boost).max(0.0),
        });
        pad_states[matched_pad.pad_id].available_at = timestamp + SMALL_PAD_RESPAWN_S;
        pad_states[matched_pad.pad_id].last_pickup = Some(timestamp);
    }

    events
}

/// Collapse pickups for the same player and pad (or same spot) within the
/// merge window.
fn merge_pickups(pickups: Vec<BoostPickupEvent>) -> Vec<BoostPickupEvent> {
    if pickups.is_empty() {
        return pickups;
    }

    let mut sorted = pickups;
    sorted.sort_by(|a, b| a.t.partial_cmp(&b.t).expect("timestamps are finite"));

    let mut merged: Vec<BoostPickupEvent> = Vec::with_capacity(sorted.len());
    for event in sorted {
        let mergeable = merged.last().map_or(false, |last| {
            last.player_id == event.player_id
                && (event.t - last.t).abs() <= BOOST_PICKUP_MERGE_WINDOW
                && (last.pad_id == event.pad_id
                    || last.location.distance(event.location) <= 320.0)
        });
        if mergeable {
            let last = merged.last_mut().expect("checked non-empty");
            last.t = last.t.min(event.t);
            last.boost_gain += event.boost_gain.max(0.0);
            if event.boost_after.is_some() {
                last.boost_after = event.boost_after;
            }
            if last.boost_before.is_none() {
                last.boost_before = event.boost_before;
            }
        } else {
            merged.push(event);
        }
    }
    merged
}

#[cfg(feature = "boost-debug")]
fn write_debug_records(records: &[serde_json::Value]) {
    use crate::constants::DEBUG_BOOST_ENV;

    let Ok(path) = std::env::var(DEBUG_BOOST_ENV) else {
        return;
    };
    match serde_json::to_string_pretty(records) {
        Ok(payload) => {
            if let Err(error) = std::fs::write(&path, payload) {
                log::warn!("failed to write boost debug records to {path}: {error}");
            }
        }
        Err(error) => log::warn!("failed to serialize boost debug records: {error}"),
    }
}
