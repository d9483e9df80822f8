//! Defensive positioning: last-defender roles, shadow angles, goal-mouth
//! coverage, and danger-zone time.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::constants::{BACK_WALL_Y, GOAL_HEIGHT, GOAL_WIDTH};
use crate::identity::Team;
use crate::math::{round2, Vec3};
use crate::normalize::{Frame, PlayerFrame, DEFAULT_FRAME_RATE};

const DEFENSIVE_THIRD_Y: f32 = BACK_WALL_Y * 0.33;
const PRESSURING_DISTANCE: f32 = 800.0;
const SHADOW_ANGLE_MAX: f64 = 45.0;
const COVERAGE_ANGLE_MAX: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DefensiveRole {
    LastDefender,
    SecondDefender,
    Pressuring,
    Shadow,
    Recovering,
    OutOfPosition,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DefensePlayerStats {
    pub time_as_last_defender: f64,
    pub time_out_of_position: f64,
    pub time_shadowing: f64,
    pub average_shadow_angle: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DefenseTeamStats {
    pub danger_zone_time: f64,
    pub danger_zone_pct: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DefenseOutput {
    pub per_team: BTreeMap<Team, DefenseTeamStats>,
    pub per_player: BTreeMap<String, DefensePlayerStats>,
}

fn own_goal_center(team: Team) -> Vec3 {
    match team {
        Team::Blue => Vec3::new(0.0, -BACK_WALL_Y, GOAL_HEIGHT / 2.0),
        Team::Orange => Vec3::new(0.0, BACK_WALL_Y, GOAL_HEIGHT / 2.0),
    }
}

fn distance_to_own_goal(position: Vec3, team: Team) -> f32 {
    position.distance(own_goal_center(team))
}

fn is_goal_side(player_pos: Vec3, ball_pos: Vec3, team: Team) -> bool {
    match team {
        Team::Blue => player_pos.y < ball_pos.y,
        Team::Orange => player_pos.y > ball_pos.y,
    }
}

/// Angular deviation of the player from the ball-to-own-goal line, in the
/// ground plane. Ball-side players score 180 minus the angle.
fn shadow_angle(player_pos: Vec3, ball_pos: Vec3, team: Team) -> f64 {
    let goal = own_goal_center(team);
    let ball_to_goal = Vec3::new(goal.x - ball_pos.x, goal.y - ball_pos.y, 0.0);
    let ball_to_player = Vec3::new(player_pos.x - ball_pos.x, player_pos.y - ball_pos.y, 0.0);

    let btg_mag = ball_to_goal.magnitude();
    let btp_mag = ball_to_player.magnitude();
    if btg_mag < 1.0 || btp_mag < 1.0 {
        return 90.0;
    }

    let cos_angle = (ball_to_goal.dot(ball_to_player) / (btg_mag * btp_mag)).clamp(-1.0, 1.0);
    let angle = f64::from(cos_angle.acos()).to_degrees();

    if !is_goal_side(player_pos, ball_pos, team) {
        return 180.0 - angle;
    }
    angle
}

/// Fraction of six goal-mouth sample points covered by at least one goal-side
/// defender within 30 degrees of the ball-goal axis.
fn defensive_coverage(defenders: &[&PlayerFrame], ball_pos: Vec3, team: Team) -> f64 {
    if defenders.is_empty() {
        return 0.0;
    }
    let goal_y = own_goal_center(team).y;
    let sample_points = [
        Vec3::new(-GOAL_WIDTH * 0.4, goal_y, GOAL_HEIGHT * 0.3),
        Vec3::new(0.0, goal_y, GOAL_HEIGHT * 0.3),
        Vec3::new(GOAL_WIDTH * 0.4, goal_y, GOAL_HEIGHT * 0.3),
        Vec3::new(-GOAL_WIDTH * 0.3, goal_y, GOAL_HEIGHT * 0.7),
        Vec3::new(0.0, goal_y, GOAL_HEIGHT * 0.7),
        Vec3::new(GOAL_WIDTH * 0.3, goal_y, GOAL_HEIGHT * 0.7),
    ];

    let mut covered = 0usize;
    for _point in &sample_points {
        for defender in defenders {
            if !is_goal_side(defender.position, ball_pos, team) {
                continue;
            }
            if shadow_angle(defender.position, ball_pos, team) < COVERAGE_ANGLE_MAX {
                covered += 1;
                break;
            }
        }
    }
    covered as f64 / sample_points.len() as f64
}

struct FrameSnapshot {
    is_danger_zone: bool,
    player_roles: Vec<(String, DefensiveRole)>,
}

fn analyze_frame(frame: &Frame, team: Team) -> FrameSnapshot {
    let ball_pos = frame.ball.position;
    let mut team_players: Vec<&PlayerFrame> = frame.team_players(team).collect();

    if team_players.is_empty() {
        return FrameSnapshot {
            is_danger_zone: true,
            player_roles: Vec::new(),
        };
    }

    team_players.sort_by(|a, b| {
        distance_to_own_goal(a.position, team)
            .partial_cmp(&distance_to_own_goal(b.position, team))
            .expect("distances are finite")
            .then_with(|| a.player_id.cmp(&b.player_id))
    });

    let mut player_roles = Vec::with_capacity(team_players.len());
    for (i, player) in team_players.iter().enumerate() {
        let ball_dist = player.position.distance(ball_pos);
        let role = if i == 0 {
            DefensiveRole::LastDefender
        } else if i == 1 {
            DefensiveRole::SecondDefender
        } else if ball_dist < PRESSURING_DISTANCE {
            DefensiveRole::Pressuring
        } else if is_goal_side(player.position, ball_pos, team) {
            if shadow_angle(player.position, ball_pos, team) < SHADOW_ANGLE_MAX {
                DefensiveRole::Shadow
            } else {
                DefensiveRole::Recovering
            }
        } else {
            DefensiveRole::OutOfPosition
        };
        player_roles.push((player.player_id.clone(), role));
    }

    let goal_side: Vec<&PlayerFrame> = team_players
        .iter()
        .copied()
        .filter(|p| is_goal_side(p.position, ball_pos, team))
        .collect();
    let coverage = defensive_coverage(&goal_side, ball_pos, team);

    let in_defensive_third = match team {
        Team::Blue => ball_pos.y < -DEFENSIVE_THIRD_Y,
        Team::Orange => ball_pos.y > DEFENSIVE_THIRD_Y,
    };

    FrameSnapshot {
        is_danger_zone: in_defensive_third && coverage < 0.5,
        player_roles,
    }
}

/// One-pass defensive analysis for both teams and every player.
pub fn analyze_defense(frames: &[Frame]) -> DefenseOutput {
    let mut per_player: BTreeMap<String, DefensePlayerStats> = BTreeMap::new();
    let mut shadow_angles: BTreeMap<String, (f64, u64)> = BTreeMap::new();
    for frame in frames {
        for player in &frame.players {
            per_player.entry(player.player_id.clone()).or_default();
        }
    }

    let estimated_fps = if frames.len() >= 2 {
        let total = frames[frames.len() - 1].timestamp - frames[0].timestamp;
        if total > 0.0 {
            ((frames.len() - 1) as f64 / total).max(1.0)
        } else {
            DEFAULT_FRAME_RATE
        }
    } else {
        DEFAULT_FRAME_RATE
    };
    let default_dt = 1.0 / estimated_fps;

    let mut prev_timestamp = frames.first().map(|f| f.timestamp).unwrap_or(0.0);
    let mut danger_time: BTreeMap<Team, f64> = [(Team::Blue, 0.0), (Team::Orange, 0.0)].into();

    for frame in frames {
        let mut dt = frame.timestamp - prev_timestamp;
        if !(0.0..=1.0).contains(&dt) {
            dt = default_dt;
        }

        for team in [Team::Blue, Team::Orange] {
            let snapshot = analyze_frame(frame, team);
            if snapshot.is_danger_zone {
                *danger_time.entry(team).or_insert(0.0) += dt;
            }

            for (player_id, role) in snapshot.player_roles {
                let Some(stats) = per_player.get_mut(&player_id) else {
                    continue;
                };
                match role {
                    DefensiveRole::LastDefender => stats.time_as_last_defender += dt,
                    DefensiveRole::OutOfPosition => stats.time_out_of_position += dt,
                    DefensiveRole::Shadow => {
                        stats.time_shadowing += dt;
                        if let Some(player) = frame.player(&player_id) {
                            let angle = shadow_angle(player.position, frame.ball.position, team);
                            let entry = shadow_angles.entry(player_id.clone()).or_insert((0.0, 0));
                            entry.0 += angle;
                            entry.1 += 1;
                        }
                    }
                    _ => {}
                }
            }
        }

        prev_timestamp = frame.timestamp;
    }

    let total_time = if frames.len() > 1 {
        (frames[frames.len() - 1].timestamp - frames[0].timestamp).max(0.1)
    } else {
        0.1
    };

    for (player_id, stats) in per_player.iter_mut() {
        stats.average_shadow_angle = shadow_angles
            .get(player_id)
            .filter(|(_, count)| *count > 0)
            .map(|(sum, count)| round2(sum / *count as f64));
        stats.time_as_last_defender = round2(stats.time_as_last_defender);
        stats.time_out_of_position = round2(stats.time_out_of_position);
        stats.time_shadowing = round2(stats.time_shadowing);
    }

    let per_team = danger_time
        .into_iter()
        .map(|(team, time)| {
            (
                team,
                DefenseTeamStats {
                    danger_zone_time: round2(time),
                    danger_zone_pct: round2(100.0 * time / total_time),
                },
            )
        })
        .collect();

    DefenseOutput {
        per_team,
        per_player,
    }
}
