//! Possession and passing metrics from touch sequences.
//!
//! A team "has" the ball while its most recent touch is within
//! `POSSESSION_TAU_S` and the ball is not being driven hard into its own
//! half. Passes are same-team touch pairs within a window, completed when
//! the ball makes real forward progress.

use std::collections::BTreeMap;

use float_ord::FloatOrd;
use serde::Serialize;

use crate::analysis::{player_team_names, Scope};
use crate::events::types::{EventsBundle, TouchEvent};
use crate::identity::Team;
use crate::math::{round2, Vec3};
use crate::normalize::Frame;

const POSSESSION_TAU_S: f64 = 2.0;
const OWN_HALF_HIGH_SPEED_UU_S: f32 = 1200.0;
const PASS_WINDOW_S: f64 = 2.0;
const FORWARD_DELTA_MIN_UU: f32 = 200.0;
const GIVE_AND_GO_WINDOW_S: f64 = 3.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PassingStats {
    pub passes_completed: u32,
    pub passes_attempted: u32,
    pub passes_received: u32,
    pub turnovers: u32,
    pub give_and_go_count: u32,
    pub possession_time_s: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Counts {
    attempted: u32,
    completed: u32,
    received: u32,
    turnovers: u32,
    give_and_go: u32,
}

pub fn analyze_passing(frames: &[Frame], events: &EventsBundle, scope: Scope<'_>) -> PassingStats {
    let player_team = player_team_names(frames);

    let mut touches: Vec<&TouchEvent> = events.touches.iter().collect();
    touches.sort_by_key(|t| FloatOrd(t.t));

    let (blue_possession, orange_possession) = possession_time(frames, &touches, &player_team);
    let (team_counts, player_counts) = pass_metrics(&touches, &player_team);

    match scope {
        Scope::Player(player_id) => {
            let possession = match player_team.get(player_id) {
                Some(Team::Blue) => blue_possession,
                Some(Team::Orange) => orange_possession,
                None => 0.0,
            };
            let counts = player_counts.get(player_id).copied().unwrap_or_default();
            compose(counts, possession)
        }
        Scope::Team(team) => {
            let (counts, possession) = match team {
                Team::Blue => (team_counts[0], blue_possession),
                Team::Orange => (team_counts[1], orange_possession),
            };
            compose(counts, possession)
        }
    }
}

fn compose(counts: Counts, possession: f64) -> PassingStats {
    PassingStats {
        passes_completed: counts.completed,
        passes_attempted: counts.attempted,
        passes_received: counts.received,
        turnovers: counts.turnovers,
        give_and_go_count: counts.give_and_go,
        possession_time_s: round2(possession),
    }
}

fn possession_time(
    frames: &[Frame],
    touches: &[&TouchEvent],
    player_team: &BTreeMap<String, Team>,
) -> (f64, f64) {
    if frames.is_empty() {
        return (0.0, 0.0);
    }

    let mut blue = 0.0f64;
    let mut orange = 0.0f64;
    let mut last_touch: [Option<f64>; 2] = [None, None];
    let mut touch_i = 0usize;
    let n = frames.len();

    for (index, frame) in frames.iter().enumerate() {
        while touch_i < touches.len() && touches[touch_i].t <= frame.timestamp {
            if let Some(team) = player_team.get(&touches[touch_i].player_id) {
                last_touch[usize::from(team.index())] = Some(touches[touch_i].t);
            }
            touch_i += 1;
        }

        let dt = if index < n - 1 {
            frames[index + 1].timestamp - frame.timestamp
        } else if n >= 2 {
            frame.timestamp - frames[index - 1].timestamp
        } else {
            0.0
        };
        if dt <= 0.0 {
            continue;
        }

        let vy = frame.ball.velocity.y;
        let blue_recent = last_touch[0]
            .map_or(false, |t| frame.timestamp - t <= POSSESSION_TAU_S);
        let orange_recent = last_touch[1]
            .map_or(false, |t| frame.timestamp - t <= POSSESSION_TAU_S);

        if blue_recent && vy >= -OWN_HALF_HIGH_SPEED_UU_S {
            blue += dt;
        }
        if orange_recent && vy <= OWN_HALF_HIGH_SPEED_UU_S {
            orange += dt;
        }
    }

    (blue, orange)
}

fn pass_metrics(
    touches: &[&TouchEvent],
    player_team: &BTreeMap<String, Team>,
) -> ([Counts; 2], BTreeMap<String, Counts>) {
    let mut team_counts = [Counts::default(), Counts::default()];
    let mut player_counts: BTreeMap<String, Counts> = BTreeMap::new();

    // (from, to, t) of the last completed pass, for give-and-go detection.
    let mut last_completed: Option<(String, String, f64)> = None;

    for pair in touches.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if a.player_id == b.player_id {
            continue;
        }
        let (Some(&a_team), Some(&b_team)) = (
            player_team.get(&a.player_id),
            player_team.get(&b.player_id),
        ) else {
            continue;
        };

        if a_team != b_team {
            team_counts[usize::from(a_team.index())].turnovers += 1;
            player_counts.entry(a.player_id.clone()).or_default().turnovers += 1;
            continue;
        }

        let dt = b.t - a.t;
        if dt <= 0.0 || dt > PASS_WINDOW_S {
            continue;
        }

        let team_idx = usize::from(a_team.index());
        team_counts[team_idx].attempted += 1;
        player_counts.entry(a.player_id.clone()).or_default().attempted += 1;
        player_counts.entry(b.player_id.clone()).or_default();

        if !is_forward_progress(a.location, b.location, a_team) {
            continue;
        }

        team_counts[team_idx].completed += 1;
        team_counts[team_idx].received += 1;
        player_counts.entry(a.player_id.clone()).or_default().completed += 1;
        player_counts.entry(b.player_id.clone()).or_default().received += 1;

        if let Some((last_from, last_to, last_t)) = &last_completed {
            if *last_from == b.player_id
                && *last_to == a.player_id
                && a.t - last_t <= GIVE_AND_GO_WINDOW_S
            {
                team_counts[team_idx].give_and_go += 1;
                player_counts.entry(a.player_id.clone()).or_default().give_and_go += 1;
                player_counts.entry(b.player_id.clone()).or_default().give_and_go += 1;
            }
        }
        last_completed = Some((a.player_id.clone(), b.player_id.clone(), a.t));
    }

    (team_counts, player_counts)
}

/// Completed passes need both attack-direction progress and real planar
/// displacement.
fn is_forward_progress(from: Vec3, to: Vec3, team: Team) -> bool {
    let delta_x = to.x - from.x;
    let delta_y = to.y - from.y;
    let forward = match team {
        Team::Blue => delta_y,
        Team::Orange => -delta_y,
    };
    if forward < FORWARD_DELTA_MIN_UU {
        return false;
    }
    (delta_x * delta_x + delta_y * delta_y).sqrt() >= FORWARD_DELTA_MIN_UU
}
