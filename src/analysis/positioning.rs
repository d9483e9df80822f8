//! Positioning: field occupancy, ball relationship, role percentages, and
//! the player-only rotation compliance score.

use serde::Serialize;

use crate::analysis::{find_player, frame_duration, team_player_ids, Scope};
use crate::constants::{field_third, FieldThird};
use crate::events::types::EventsBundle;
use crate::identity::Team;
use crate::math::round2;
use crate::normalize::Frame;

const DOUBLE_COMMIT_DISTANCE: f32 = 500.0;
const OVERCOMMIT_BOOST_THRESHOLD: u8 = 20;
const BALL_AHEAD_THRESHOLD: f32 = 50.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PositioningStats {
    pub time_offensive_half_s: f64,
    pub time_defensive_half_s: f64,
    pub time_offensive_third_s: f64,
    pub time_middle_third_s: f64,
    pub time_defensive_third_s: f64,
    pub behind_ball_pct: f64,
    pub ahead_ball_pct: f64,
    pub avg_distance_to_ball_m: f64,
    pub avg_distance_to_teammate_m: f64,
    pub first_man_pct: f64,
    pub second_man_pct: f64,
    /// Null when the team has fewer than three players.
    pub third_man_pct: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RotationCompliance {
    pub score_0_to_100: f64,
    pub flags: Vec<String>,
}

pub fn analyze_positioning(
    frames: &[Frame],
    _events: &EventsBundle,
    scope: Scope<'_>,
) -> PositioningStats {
    if frames.is_empty() {
        return PositioningStats::default();
    }
    match scope {
        Scope::Player(player_id) => analyze_player(frames, player_id),
        Scope::Team(team) => analyze_team(frames, team),
    }
}

fn analyze_player(frames: &[Frame], player_id: &str) -> PositioningStats {
    // Team and team size from the first frame the player appears in.
    let (player_team, team_size) = match frames.iter().find_map(|frame| {
        find_player(frame, player_id)
            .map(|p| (p.team, frame.team_players(p.team).count()))
    }) {
        Some(found) => found,
        None => return PositioningStats::default(),
    };

    let mut stats = PositioningStats::default();
    let mut total_frames = 0u64;
    let mut total_ball_distance = 0.0f64;
    let mut total_teammate_distance = 0.0f64;
    let mut teammate_distance_count = 0u64;
    let mut behind_frames = 0u64;
    let mut ahead_frames = 0u64;
    let mut first_man_frames = 0u64;
    let mut second_man_frames = 0u64;
    let mut third_man_frames = 0u64;
    let mut prev_timestamp: Option<f64> = None;

    for (index, frame) in frames.iter().enumerate() {
        let Some(player) = find_player(frame, player_id) else {
            continue;
        };
        total_frames += 1;
        let dt = frame_duration(frames, index, prev_timestamp);
        let position = player.position;

        let offensive = match player_team {
            Team::Blue => position.y > 0.0,
            Team::Orange => position.y < 0.0,
        };
        if offensive {
            stats.time_offensive_half_s += dt;
        } else {
            stats.time_defensive_half_s += dt;
        }

        // Thirds are team-relative: flip the absolute third for orange.
        let third = field_third(position);
        let relative = match (player_team, third) {
            (Team::Blue, t) => t,
            (Team::Orange, FieldThird::Defensive) => FieldThird::Offensive,
            (Team::Orange, FieldThird::Offensive) => FieldThird::Defensive,
            (Team::Orange, FieldThird::Neutral) => FieldThird::Neutral,
        };
        match relative {
            FieldThird::Defensive => stats.time_defensive_third_s += dt,
            FieldThird::Neutral => stats.time_middle_third_s += dt,
            FieldThird::Offensive => stats.time_offensive_third_s += dt,
        }

        let ball_position = frame.ball.position;
        let ball_distance = position.distance(ball_position);
        total_ball_distance += f64::from(ball_distance);

        let (behind, ahead) = match player_team {
            Team::Blue => (
                position.y < ball_position.y - BALL_AHEAD_THRESHOLD,
                position.y > ball_position.y + BALL_AHEAD_THRESHOLD,
            ),
            Team::Orange => (
                position.y > ball_position.y + BALL_AHEAD_THRESHOLD,
                position.y < ball_position.y - BALL_AHEAD_THRESHOLD,
            ),
        };
        if behind {
            behind_frames += 1;
        } else if ahead {
            ahead_frames += 1;
        }

        let teammates: Vec<_> = frame
            .team_players(player_team)
            .filter(|p| p.player_id != player_id)
            .collect();
        if teammates.is_empty() {
            first_man_frames += 1;
        } else {
            let mut closer = 0usize;
            for teammate in &teammates {
                let teammate_distance = position.distance(teammate.position);
                total_teammate_distance += f64::from(teammate_distance);
                teammate_distance_count += 1;
                if teammate.position.distance(ball_position) < ball_distance {
                    closer += 1;
                }
            }
            match closer {
                0 => first_man_frames += 1,
                1 => second_man_frames += 1,
                _ => third_man_frames += 1,
            }
        }

        prev_timestamp = Some(frame.timestamp);
    }

    if total_frames == 0 {
        return PositioningStats::default();
    }

    let total = total_frames as f64;
    stats.behind_ball_pct = round2(behind_frames as f64 / total * 100.0);
    stats.ahead_ball_pct = round2(ahead_frames as f64 / total * 100.0);
    stats.avg_distance_to_ball_m = round2(total_ball_distance / total / 100.0);
    stats.avg_distance_to_teammate_m = if teammate_distance_count > 0 {
        round2(total_teammate_distance / teammate_distance_count as f64 / 100.0)
    } else {
        0.0
    };
    stats.first_man_pct = round2(first_man_frames as f64 / total * 100.0);
    stats.second_man_pct = round2(second_man_frames as f64 / total * 100.0);
    stats.third_man_pct = if team_size >= 3 {
        Some(round2(third_man_frames as f64 / total * 100.0))
    } else {
        None
    };
    stats.time_offensive_half_s = round2(stats.time_offensive_half_s);
    stats.time_defensive_half_s = round2(stats.time_defensive_half_s);
    stats.time_offensive_third_s = round2(stats.time_offensive_third_s);
    stats.time_middle_third_s = round2(stats.time_middle_third_s);
    stats.time_defensive_third_s = round2(stats.time_defensive_third_s);
    stats
}

fn analyze_team(frames: &[Frame], team: Team) -> PositioningStats {
    let players = team_player_ids(frames, team);
    let team_size = players.len();
    if team_size == 0 {
        return PositioningStats::default();
    }

    let mut team_stats = PositioningStats {
        third_man_pct: if team_size >= 3 { Some(0.0) } else { None },
        ..PositioningStats::default()
    };

    for player_id in &players {
        let p = analyze_player(frames, player_id);
        team_stats.time_offensive_half_s += p.time_offensive_half_s;
        team_stats.time_defensive_half_s += p.time_defensive_half_s;
        team_stats.time_offensive_third_s += p.time_offensive_third_s;
        team_stats.time_middle_third_s += p.time_middle_third_s;
        team_stats.time_defensive_third_s += p.time_defensive_third_s;
        team_stats.behind_ball_pct += p.behind_ball_pct;
        team_stats.ahead_ball_pct += p.ahead_ball_pct;
        team_stats.avg_distance_to_ball_m += p.avg_distance_to_ball_m;
        team_stats.avg_distance_to_teammate_m += p.avg_distance_to_teammate_m;
        team_stats.first_man_pct += p.first_man_pct;
        team_stats.second_man_pct += p.second_man_pct;
        if let (Some(total), Some(player_pct)) = (team_stats.third_man_pct, p.third_man_pct) {
            team_stats.third_man_pct = Some(total + player_pct);
        }
    }

    let size = team_size as f64;
    team_stats.behind_ball_pct = round2(team_stats.behind_ball_pct / size);
    team_stats.ahead_ball_pct = round2(team_stats.ahead_ball_pct / size);
    team_stats.avg_distance_to_ball_m = round2(team_stats.avg_distance_to_ball_m / size);
    team_stats.avg_distance_to_teammate_m = round2(team_stats.avg_distance_to_teammate_m / size);
    team_stats.first_man_pct = round2(team_stats.first_man_pct / size);
    team_stats.second_man_pct = round2(team_stats.second_man_pct / size);
    team_stats.third_man_pct = team_stats.third_man_pct.map(|total| round2(total / size));
    team_stats.time_offensive_half_s = round2(team_stats.time_offensive_half_s);
    team_stats.time_defensive_half_s = round2(team_stats.time_defensive_half_s);
    team_stats.time_offensive_third_s = round2(team_stats.time_offensive_third_s);
    team_stats.time_middle_third_s = round2(team_stats.time_middle_third_s);
    team_stats.time_defensive_third_s = round2(team_stats.time_defensive_third_s);
    team_stats
}

/// Rotation compliance score for a single player: start at 100 and deduct
/// for double commits and last-man overcommits.
pub fn calculate_rotation_compliance(frames: &[Frame], player_id: &str) -> RotationCompliance {
    if frames.is_empty() {
        return RotationCompliance::default();
    }

    let Some(player_team) = frames
        .iter()
        .find_map(|frame| find_player(frame, player_id).map(|p| p.team))
    else {
        return RotationCompliance::default();
    };

    let mut double_commit_count = 0u64;
    let mut overcommit_count = 0u64;
    let mut total_frames = 0u64;

    for frame in frames {
        let Some(player) = find_player(frame, player_id) else {
            continue;
        };
        total_frames += 1;

        let ball_position = frame.ball.position;
        let teammates: Vec<_> = frame
            .team_players(player_team)
            .filter(|p| p.player_id != player_id)
            .collect();

        let mut close_to_ball = 0usize;
        if player.position.distance(ball_position) <= DOUBLE_COMMIT_DISTANCE {
            close_to_ball += 1;
        }
        for teammate in &teammates {
            if teammate.position.distance(ball_position) <= DOUBLE_COMMIT_DISTANCE {
                close_to_ball += 1;
            }
        }
        if close_to_ball >= 2 {
            double_commit_count += 1;
        }

        if !teammates.is_empty() {
            let (is_last_man, is_forward) = match player_team {
                Team::Blue => (
                    teammates.iter().all(|t| player.position.y <= t.position.y),
                    player.position.y > 0.0,
                ),
                Team::Orange => (
                    teammates.iter().all(|t| player.position.y >= t.position.y),
                    player.position.y < 0.0,
                ),
            };
            if is_last_man && is_forward && player.boost_amount < OVERCOMMIT_BOOST_THRESHOLD {
                overcommit_count += 1;
            }
        }
    }

    let mut score = 100.0;
    let mut flags = Vec::new();
    if total_frames > 0 {
        let double_commit_rate = double_commit_count as f64 / total_frames as f64;
        let overcommit_rate = overcommit_count as f64 / total_frames as f64;
        score -= double_commit_rate * 30.0;
        score -= overcommit_rate * 25.0;
        score = score.clamp(0.0, 100.0);

        if double_commit_rate > 0.1 {
            flags.push("double_commit".to_string());
        }
        if overcommit_rate > 0.05 {
            flags.push("last_man_overcommit".to_string());
        }
        if score < 70.0 {
            flags.push("poor_rotation".to_string());
        }
        if score < 50.0 {
            flags.push("critical_positioning".to_string());
        }
    }

    RotationCompliance {
        score_0_to_100: round2(score),
        flags,
    }
}
