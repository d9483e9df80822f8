//! Expected goals model.
//!
//! Base probability by shot type, then multiplicative factors for distance,
//! angle, speed, and defender coverage, clamped into [0.01, 0.95].

use std::collections::BTreeMap;

use float_ord::FloatOrd;
use serde::Serialize;

use crate::constants::{BACK_WALL_Y, GOAL_HEIGHT};
use crate::events::types::{TouchContext, TouchEvent, TouchOutcome};
use crate::identity::Team;
use crate::math::{round1, round2, round3, Vec3, UU_S_TO_KPH};
use crate::normalize::{Frame, PlayerFrame};

const OPTIMAL_DISTANCE_M: f64 = 15.0;
const MAX_DISTANCE_PENALTY_M: f64 = 80.0;
const MAX_ANGLE_PENALTY: f64 = 60.0;
const POWER_SHOT_SPEED_KPH: f64 = 100.0;
const OPTIMAL_SHOT_SPEED_KPH: f64 = 70.0;
const MIN_SHOT_SPEED_KPH: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShotType {
    Ground,
    Aerial,
    Wall,
    Ceiling,
    Redirect,
    PowerShot,
    Lob,
    Unknown,
}

fn base_xg(shot_type: ShotType) -> f64 {
    match shot_type {
        ShotType::Ground => 0.12,
        ShotType::Aerial => 0.08,
        ShotType::Wall => 0.06,
        ShotType::Ceiling => 0.04,
        ShotType::Redirect => 0.15,
        ShotType::PowerShot => 0.18,
        ShotType::Lob => 0.05,
        ShotType::Unknown => 0.08,
    }
}

/// One scored shot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShotXg {
    pub timestamp: f64,
    pub player_id: String,
    pub xg: f64,
    pub shot_type: ShotType,
    pub distance_m: f64,
    pub angle_degrees: f64,
    pub ball_speed_kph: f64,
    pub is_open_net: bool,
    pub defender_coverage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct XgPlayerStats {
    pub total_shots: u32,
    pub total_xg: f64,
    pub shots: Vec<ShotXg>,
}

#[derive(Debug, Clone, Default)]
pub struct XgOutput {
    pub per_player: BTreeMap<String, XgPlayerStats>,
    pub team_totals: BTreeMap<Team, f64>,
    pub total_shots: u32,
}

/// Center of the goal the shooter attacks: +Y for blue, -Y for orange.
fn opponent_goal_center(shooter_team: Team) -> Vec3 {
    match shooter_team {
        Team::Blue => Vec3::new(0.0, BACK_WALL_Y, GOAL_HEIGHT / 2.0),
        Team::Orange => Vec3::new(0.0, -BACK_WALL_Y, GOAL_HEIGHT / 2.0),
    }
}

fn goal_distance_m(position: Vec3, shooter_team: Team) -> f64 {
    f64::from(position.distance(opponent_goal_center(shooter_team))) / 100.0
}

fn goal_angle_degrees(position: Vec3, velocity: Vec3, shooter_team: Team) -> f64 {
    let to_goal = opponent_goal_center(shooter_team) - position;
    let to_goal_mag = to_goal.magnitude();
    let vel_mag = velocity.magnitude();
    if to_goal_mag < 1.0 || vel_mag < 1.0 {
        return 90.0;
    }
    let cos_angle = (to_goal.dot(velocity) / (to_goal_mag * vel_mag)).clamp(-1.0, 1.0);
    f64::from(cos_angle.acos()).to_degrees()
}

/// Coverage in [0, 1] from the best-placed goal-side defender able to reach
/// the projected shot in time; also reports whether the net is open.
fn defender_coverage(
    ball_position: Vec3,
    ball_velocity: Vec3,
    defenders: &[&PlayerFrame],
    shooter_team: Team,
) -> (f64, bool) {
    if defenders.is_empty() {
        return (0.0, true);
    }
    let ball_speed = ball_velocity.magnitude();
    if ball_speed < 10.0 {
        return (0.0, true);
    }

    let goal_y = opponent_goal_center(shooter_team).y;
    let dy = (goal_y - ball_position.y).abs();
    let vy = ball_velocity.y.abs();
    let time_to_goal = if vy < 10.0 { 5.0 } else { f64::from(dy / vy) };

    let mut best_coverage: Option<f64> = None;
    for defender in defenders {
        let between = if goal_y > 0.0 {
            ball_position.y < defender.position.y && defender.position.y < goal_y
        } else {
            goal_y < defender.position.y && defender.position.y < ball_position.y
        };
        if !between {
            continue;
        }

        let proj_x = ball_position.x + ball_velocity.x * time_to_goal as f32;
        let proj_z = ball_position.z + ball_velocity.z * time_to_goal as f32;
        let dx = defender.position.x - proj_x;
        let dz = defender.position.z - proj_z;
        let gap = f64::from((dx * dx + dz * dz).sqrt());

        let defender_speed = f64::from(defender.velocity.magnitude());
        let reach_time = gap / (defender_speed + 1000.0).max(1.0);
        if reach_time < time_to_goal {
            let coverage = (1.0 - reach_time / time_to_goal).min(1.0);
            best_coverage = Some(best_coverage.map_or(coverage, |b: f64| b.max(coverage)));
        }
    }

    match best_coverage {
        Some(coverage) => (coverage, coverage < 0.3),
        None => (0.0, true),
    }
}

fn classify_shot_type(
    ball_position: Vec3,
    ball_velocity: Vec3,
    touch_context: TouchContext,
) -> ShotType {
    match touch_context {
        TouchContext::Ceiling => return ShotType::Ceiling,
        TouchContext::Wall => return ShotType::Wall,
        TouchContext::Aerial => return ShotType::Aerial,
        // Half-volley touches score with the redirect base.
        TouchContext::HalfVolley => return ShotType::Redirect,
        TouchContext::Ground | TouchContext::Unknown => {}
    }

    let speed_kph = f64::from(ball_velocity.magnitude()) * UU_S_TO_KPH;
    let height = ball_position.z;

    if speed_kph > POWER_SHOT_SPEED_KPH && height < 200.0 {
        return ShotType::PowerShot;
    }
    if height > 800.0 {
        return ShotType::Aerial;
    }
    if height > 400.0 && ball_velocity.z > 500.0 {
        return ShotType::Lob;
    }
    if height < 150.0 {
        return ShotType::Ground;
    }
    ShotType::Unknown
}

/// Score one shot.
pub fn calculate_xg(
    ball_position: Vec3,
    ball_velocity: Vec3,
    shooter_team: Team,
    frame: Option<&Frame>,
    touch_context: TouchContext,
) -> ShotXg {
    let distance_m = goal_distance_m(ball_position, shooter_team);
    let angle_deg = goal_angle_degrees(ball_position, ball_velocity, shooter_team);
    let ball_speed_kph = f64::from(ball_velocity.magnitude()) * UU_S_TO_KPH;

    let defenders: Vec<&PlayerFrame> = frame
        .map(|f| f.players.iter().filter(|p| p.team != shooter_team).collect())
        .unwrap_or_default();
    let (coverage, is_open_net) =
        defender_coverage(ball_position, ball_velocity, &defenders, shooter_team);

    let shot_type = classify_shot_type(ball_position, ball_velocity, touch_context);
    let base = base_xg(shot_type);

    let distance_factor = if distance_m < OPTIMAL_DISTANCE_M {
        1.0 + 0.2 * (1.0 - distance_m / OPTIMAL_DISTANCE_M)
    } else if distance_m > MAX_DISTANCE_PENALTY_M {
        0.2
    } else {
        let range_pct =
            (distance_m - OPTIMAL_DISTANCE_M) / (MAX_DISTANCE_PENALTY_M - OPTIMAL_DISTANCE_M);
        1.0 - 0.7 * range_pct
    };

    let angle_factor = if angle_deg < 20.0 {
        1.0
    } else if angle_deg > MAX_ANGLE_PENALTY {
        0.15
    } else {
        1.0 - 0.75 * (angle_deg - 20.0) / (MAX_ANGLE_PENALTY - 20.0)
    };

    let speed_factor = if ball_speed_kph < MIN_SHOT_SPEED_KPH {
        0.4
    } else if ball_speed_kph < OPTIMAL_SHOT_SPEED_KPH {
        0.6 + 0.4 * (ball_speed_kph / OPTIMAL_SHOT_SPEED_KPH)
    } else {
        (1.0 + 0.003 * (ball_speed_kph - OPTIMAL_SHOT_SPEED_KPH)).min(1.3)
    };

    let defender_factor = if is_open_net {
        1.5
    } else {
        1.0 - 0.7 * coverage
    };

    let xg = (base * distance_factor * angle_factor * speed_factor * defender_factor)
        .clamp(0.01, 0.95);

    ShotXg {
        timestamp: 0.0,
        player_id: String::new(),
        xg: (xg * 10000.0).round() / 10000.0,
        shot_type,
        distance_m: round2(distance_m),
        angle_degrees: round1(angle_deg),
        ball_speed_kph: round1(ball_speed_kph),
        is_open_net,
        defender_coverage: round3(coverage),
    }
}

/// Score every SHOT touch against the nearest frame.
pub fn analyze_shots_xg(frames: &[Frame], touches: &[TouchEvent]) -> XgOutput {
    let mut player_teams: BTreeMap<String, Team> = BTreeMap::new();
    for frame in frames {
        for player in &frame.players {
            player_teams
                .entry(player.player_id.clone())
                .or_insert(player.team);
        }
    }

    let mut per_player: BTreeMap<String, XgPlayerStats> = BTreeMap::new();
    let mut team_totals: BTreeMap<Team, f64> = [(Team::Blue, 0.0), (Team::Orange, 0.0)].into();
    let mut total_shots = 0u32;

    for touch in touches {
        if touch.outcome != TouchOutcome::Shot {
            continue;
        }
        let Some(frame) = nearest_frame(frames, touch.t) else {
            continue;
        };
        let shooter_team = player_teams
            .get(&touch.player_id)
            .copied()
            .unwrap_or(Team::Blue);

        let mut shot = calculate_xg(
            frame.ball.position,
            frame.ball.velocity,
            shooter_team,
            Some(frame),
            touch.touch_context,
        );
        shot.timestamp = touch.t;
        shot.player_id = touch.player_id.clone();

        let entry = per_player.entry(touch.player_id.clone()).or_default();
        entry.total_shots += 1;
        entry.total_xg = round3(entry.total_xg + shot.xg);
        *team_totals.entry(shooter_team).or_insert(0.0) += shot.xg;
        entry.shots.push(shot);
        total_shots += 1;
    }

    for total in team_totals.values_mut() {
        *total = round3(*total);
    }

    XgOutput {
        per_player,
        team_totals,
        total_shots,
    }
}

fn nearest_frame<'f>(frames: &'f [Frame], timestamp: f64) -> Option<&'f Frame> {
    if frames.is_empty() {
        return None;
    }
    let idx = frames.partition_point(|f| f.timestamp < timestamp);
    let candidates = [idx.checked_sub(1), Some(idx)];
    candidates
        .into_iter()
        .flatten()
        .filter_map(|i| frames.get(i))
        .min_by_key(|f| FloatOrd((f.timestamp - timestamp).abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xg_clamps_into_valid_range() {
        let shot = calculate_xg(
            Vec3::new(0.0, 5000.0, 93.0),
            Vec3::new(0.0, 3000.0, 0.0),
            Team::Blue,
            None,
            TouchContext::Ground,
        );
        assert!(shot.xg >= 0.01 && shot.xg <= 0.95);
    }

    #[test]
    fn half_volley_maps_to_redirect_base() {
        let shot = calculate_xg(
            Vec3::new(0.0, 3000.0, 120.0),
            Vec3::new(0.0, 2000.0, 0.0),
            Team::Blue,
            None,
            TouchContext::HalfVolley,
        );
        assert_eq!(shot.shot_type, ShotType::Redirect);
    }

    #[test]
    fn far_wide_shots_score_below_close_center_shots() {
        let close = calculate_xg(
            Vec3::new(0.0, 3800.0, 93.0),
            Vec3::new(0.0, 2500.0, 0.0),
            Team::Blue,
            None,
            TouchContext::Ground,
        );
        let far = calculate_xg(
            Vec3::new(3000.0, -4000.0, 93.0),
            Vec3::new(-500.0, 2500.0, 0.0),
            Team::Blue,
            None,
            TouchContext::Ground,
        );
        assert!(close.xg > far.xg);
    }
}
