//! Challenge (50/50) detection from successive opposing touches.

use std::collections::BTreeMap;

use float_ord::FloatOrd;

use crate::constants::{
    CHALLENGE_MIN_BALL_SPEED_KPH, CHALLENGE_MIN_DISTANCE_UU, CHALLENGE_RADIUS_UU,
    CHALLENGE_WINDOW_S, NEUTRAL_RETOUCH_WINDOW_S, RISK_AHEAD_OF_BALL_WEIGHT, RISK_LAST_MAN_WEIGHT,
    RISK_LOW_BOOST_THRESHOLD, RISK_LOW_BOOST_WEIGHT,
};
use crate::events::types::{ChallengeEvent, ChallengeOutcome, TouchEvent};
use crate::identity::Team;
use crate::math::{round3, Vec3};
use crate::normalize::{Frame, PlayerFrame};

/// Detect 50/50 challenge events from the sorted touch list.
pub fn detect_challenges(frames: &[Frame], touches: &[TouchEvent]) -> Vec<ChallengeEvent> {
    if touches.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<&TouchEvent> = touches.iter().collect();
    sorted.sort_by(|a, b| {
        FloatOrd(a.t)
            .cmp(&FloatOrd(b.t))
            .then_with(|| a.player_id.cmp(&b.player_id))
    });

    let player_team = player_teams(frames);
    let mut events = Vec::new();
    let mut i = 0usize;

    while i + 1 < sorted.len() {
        let first = sorted[i];
        let second = sorted[i + 1];

        if first.player_id == second.player_id {
            i += 1;
            continue;
        }
        let (Some(&team_first), Some(&team_second)) = (
            player_team.get(&first.player_id),
            player_team.get(&second.player_id),
        ) else {
            i += 1;
            continue;
        };
        if team_first == team_second {
            i += 1;
            continue;
        }

        let dt = second.t - first.t;
        if !(0.0..=CHALLENGE_WINDOW_S).contains(&dt) {
            i += 1;
            continue;
        }

        let separation = first.location.distance(second.location);
        if !(CHALLENGE_MIN_DISTANCE_UU..=CHALLENGE_RADIUS_UU).contains(&separation) {
            i += 1;
            continue;
        }

        if first.ball_speed_kph < CHALLENGE_MIN_BALL_SPEED_KPH
            && second.ball_speed_kph < CHALLENGE_MIN_BALL_SPEED_KPH
        {
            i += 1;
            continue;
        }

        // A rapid third touch near the contest makes it neutral.
        let mut used_third = false;
        if let Some(third) = sorted.get(i + 2) {
            if player_team.contains_key(&third.player_id)
                && third.t - second.t <= NEUTRAL_RETOUCH_WINDOW_S
                && second.location.distance(third.location) <= CHALLENGE_RADIUS_UU
            {
                used_third = true;
            }
        }

        // The later touch owns the contest, so from the first player's
        // perspective a decided challenge is a loss to the second team.
        let (outcome, winner_team) = if used_third {
            (ChallengeOutcome::Neutral, None)
        } else {
            (ChallengeOutcome::Loss, Some(team_second))
        };

        let midpoint = Vec3::new(
            (first.location.x + second.location.x) / 2.0,
            (first.location.y + second.location.y) / 2.0,
            (first.location.z + second.location.z) / 2.0,
        );
        let depth_m = f64::from(midpoint.y.abs()) * 0.019;

        let risk_first = challenge_risk(frames, &first.player_id, first.t, team_first);
        let risk_second = challenge_risk(frames, &second.player_id, second.t, team_second);

        events.push(ChallengeEvent {
            t: (first.t + second.t) / 2.0,
            first_player: first.player_id.clone(),
            second_player: second.player_id.clone(),
            first_team: team_first,
            second_team: team_second,
            outcome,
            winner_team,
            location: midpoint,
            depth_m: round3(depth_m),
            duration: round3(dt),
            risk_first: round3(risk_first),
            risk_second: round3(risk_second),
        });

        i += if used_third { 3 } else { 2 };
    }

    events
}

fn player_teams(frames: &[Frame]) -> BTreeMap<String, Team> {
    let mut teams = BTreeMap::new();
    for frame in frames {
        for player in &frame.players {
            teams
                .entry(player.player_id.clone())
                .or_insert(player.team);
        }
    }
    teams
}

fn nearest_frame<'f>(frames: &'f [Frame], timestamp: f64) -> Option<&'f Frame> {
    frames
        .iter()
        .min_by_key(|frame| FloatOrd((frame.timestamp - timestamp).abs()))
}

/// Risk in [0, 1]: weighted sum of ahead-of-ball, low boost, and last-man,
/// evaluated at the frame nearest the touch.
fn challenge_risk(frames: &[Frame], player_id: &str, timestamp: f64, team: Team) -> f64 {
    let Some(frame) = nearest_frame(frames, timestamp) else {
        return 0.0;
    };
    let Some(player) = frame.player(player_id) else {
        return 0.0;
    };
    risk_from_frame(player, frame.ball.position, team)
}

fn risk_from_frame(player: &PlayerFrame, ball_position: Vec3, team: Team) -> f64 {
    let (ahead, last_man) = match team {
        Team::Blue => (
            player.position.y > ball_position.y,
            player.position.y <= ball_position.y,
        ),
        Team::Orange => (
            player.position.y < ball_position.y,
            player.position.y >= ball_position.y,
        ),
    };

    let mut risk = 0.0;
    if ahead {
        risk += RISK_AHEAD_OF_BALL_WEIGHT;
    }
    if player.boost_amount <= RISK_LOW_BOOST_THRESHOLD {
        risk += RISK_LOW_BOOST_WEIGHT;
    }
    if last_man {
        risk += RISK_LAST_MAN_WEIGHT;
    }
    risk.clamp(0.0, 1.0)
}
