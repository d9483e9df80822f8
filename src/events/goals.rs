//! Goal detection.
//!
//! Prefers authoritative header goal frames when the header carries them;
//! otherwise falls back to tracking the ball across the goal line. Both
//! paths search backwards for the real shot velocity because the engine
//! resets ball physics the instant a goal registers.

use std::collections::BTreeMap;

use crate::constants::{
    GOAL_EXIT_THRESHOLD, GOAL_LINE_THRESHOLD, GOAL_LOOKBACK_WINDOW_S, MIN_SHOT_VELOCITY_UU_S,
    TOUCH_PROXIMITY_THRESHOLD,
};
use crate::events::types::GoalEvent;
use crate::identity::{self, Team};
use crate::math::{round2, round3, Vec3, UU_S_TO_KPH};
use crate::normalize::{measure_frame_rate, Frame};
use crate::parser::types::{GoalHeader, Header};

/// Detect goal events, preferring authoritative header metadata.
pub fn detect_goals(frames: &[Frame], header: Option<&Header>) -> Vec<GoalEvent> {
    if frames.is_empty() {
        return Vec::new();
    }

    match header {
        Some(header) if !header.goals.is_empty() => detect_from_header(frames, header),
        _ => detect_from_ball_path(frames, header),
    }
}

/// Most recent (time, team) of each player's last proximity to the ball.
#[derive(Default)]
struct TouchTracker {
    last_touch: BTreeMap<String, (f64, Team)>,
}

impl TouchTracker {
    fn observe(&mut self, frame: &Frame) {
        for player in &frame.players {
            let distance = player.position.distance(frame.ball.position);
            if distance < TOUCH_PROXIMITY_THRESHOLD {
                self.last_touch
                    .insert(player.player_id.clone(), (frame.timestamp, player.team));
            }
        }
    }

    /// Most recent toucher within `window` of `now`, then the most recent
    /// other toucher on `team` as the assist candidate.
    fn scorer_and_assist(&self, now: f64, window: f64) -> (Option<String>, Option<String>) {
        let mut recent: Vec<(&String, f64, Team)> = self
            .last_touch
            .iter()
            .filter(|(_, (t, _))| now - t < window)
            .map(|(pid, (t, team))| (pid, *t, *team))
            .collect();
        recent.sort_by(|a, b| b.1.partial_cmp(&a.1).expect("touch times are finite"));

        let Some((scorer, _, scorer_team)) = recent.first().cloned() else {
            return (None, None);
        };
        let assist = recent
            .iter()
            .skip(1)
            .find(|(pid, _, team)| *pid != scorer && *team == scorer_team)
            .map(|(pid, _, _)| (*pid).clone());
        (Some(scorer.clone()), assist)
    }

    /// Most recent toucher on `team` other than `scorer` within `window`.
    fn assist_for(&self, scorer: Option<&str>, team: Team, now: f64, window: f64) -> Option<String> {
        let mut candidates: Vec<(&String, f64)> = self
            .last_touch
            .iter()
            .filter(|(pid, (t, touch_team))| {
                Some(pid.as_str()) != scorer && *touch_team == team && now - t <= window
            })
            .map(|(pid, (t, _))| (pid, *t))
            .collect();
        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).expect("touch times are finite"));
        candidates.first().map(|(pid, _)| (*pid).clone())
    }

    fn clear(&mut self) {
        self.last_touch.clear();
    }
}

/// Scan backwards from the goal frame for the first velocity that still looks
/// like the shot, skipping the post-goal physics reset.
fn find_shot_velocity(frames: &[Frame], goal_frame_idx: usize, frame_rate: f64) -> Vec3 {
    if frames.is_empty() {
        return Vec3::ZERO;
    }
    let goal_frame_idx = goal_frame_idx.min(frames.len() - 1);
    let lookback = (GOAL_LOOKBACK_WINDOW_S * frame_rate) as usize;
    let start = goal_frame_idx.saturating_sub(lookback);

    for i in (start..goal_frame_idx).rev() {
        let velocity = frames[i].ball.velocity;
        if velocity.magnitude() >= MIN_SHOT_VELOCITY_UU_S {
            return velocity;
        }
    }
    frames[goal_frame_idx].ball.velocity
}

fn goal_line_y(team: Team) -> f32 {
    match team {
        Team::Blue => GOAL_LINE_THRESHOLD,
        Team::Orange => -GOAL_LINE_THRESHOLD,
    }
}

fn tickmark_lead(goal_frame: i64, highlight_frame: Option<i64>, frame_rate: f64) -> f64 {
    match highlight_frame {
        Some(highlight) if frame_rate > 0.0 => {
            round3((goal_frame - highlight).max(0) as f64 / frame_rate)
        }
        _ => 0.0,
    }
}

fn detect_from_header(frames: &[Frame], header: &Header) -> Vec<GoalEvent> {
    let identities = identity::build_player_identities(&header.players);
    let name_lookup: BTreeMap<String, &str> = identities
        .iter()
        .map(|id| (id.display_name.to_lowercase(), id.canonical_id.as_str()))
        .collect();

    let highlight_frames: Vec<i64> = header.highlights.iter().filter_map(|h| h.frame).collect();
    let frame_rate = measure_frame_rate(frames);

    let mut goals = Vec::new();
    let mut tracker = TouchTracker::default();
    let mut goal_index = 0usize;

    let resolve_scorer = |gh: &GoalHeader, team: Team| -> Option<String> {
        let sanitized = identity::sanitize_display_name(gh.player_name.as_deref()).to_lowercase();
        if let Some(canonical) = name_lookup.get(&sanitized) {
            return Some((*canonical).to_string());
        }
        identities
            .iter()
            .find(|id| id.team == team)
            .map(|id| id.canonical_id.clone())
    };

    let emit = |goal_index: usize, target_frame: i64, tracker: &TouchTracker| -> GoalEvent {
        let gh = &header.goals[goal_index];
        let frame_ref_idx = (target_frame.max(0) as usize).min(frames.len() - 1);
        let frame_ref = &frames[frame_ref_idx];
        let goal_time = frame_ref.timestamp;

        let team = Team::from_index(gh.player_team.unwrap_or(0));
        let scorer = resolve_scorer(gh, team);
        let assist = tracker.assist_for(scorer.as_deref(), team, goal_time, 6.0);

        let shot_velocity = find_shot_velocity(frames, frame_ref_idx, frame_rate);
        let distance_m =
            f64::from((goal_line_y(team) - frame_ref.ball.position.y).abs()) / 100.0;

        GoalEvent {
            t: goal_time,
            frame: Some(target_frame.max(0) as usize),
            on_target: scorer.is_some(),
            scorer,
            team,
            assist,
            shot_speed_kph: round2(f64::from(shot_velocity.magnitude()) * UU_S_TO_KPH),
            distance_m: round2(distance_m),
            tickmark_lead_seconds: tickmark_lead(
                target_frame,
                highlight_frames.get(goal_index).copied(),
                frame_rate,
            ),
        }
    };

    for (i, frame) in frames.iter().enumerate() {
        if frame.ball.position.y.abs() <= GOAL_LINE_THRESHOLD {
            tracker.observe(frame);
        }

        while goal_index < header.goals.len() {
            let Some(target_frame) = header.goals[goal_index].frame else {
                break;
            };
            if (i as i64) < target_frame {
                break;
            }
            goals.push(emit(goal_index, target_frame, &tracker));
            goal_index += 1;
        }

        if goal_index >= header.goals.len() {
            break;
        }
    }

    // Header goals whose frame index lies beyond the normalized frame list.
    while goal_index < header.goals.len() {
        let target_frame = header.goals[goal_index]
            .frame
            .unwrap_or(frames.len() as i64 - 1);
        goals.push(emit(goal_index, target_frame, &tracker));
        goal_index += 1;
    }

    goals
}

fn detect_from_ball_path(frames: &[Frame], header: Option<&Header>) -> Vec<GoalEvent> {
    let header_goal_frames: Vec<i64> = header
        .map(|h| h.goals.iter().filter_map(|g| g.frame).collect())
        .unwrap_or_default();
    let highlight_frames: Vec<i64> = header
        .map(|h| h.highlights.iter().filter_map(|h| h.frame).collect())
        .unwrap_or_default();

    let frame_rate = measure_frame_rate(frames);
    let mut goals = Vec::new();
    let mut tracker = TouchTracker::default();
    let mut goal_index = 0usize;
    let mut ball_inside_goal: Option<Team> = None;

    for (i, frame) in frames.iter().enumerate() {
        let ball_y = frame.ball.position.y;

        if ball_y.abs() <= GOAL_LINE_THRESHOLD {
            tracker.observe(frame);
        }

        let goal_team = if ball_y > GOAL_LINE_THRESHOLD {
            Some(Team::Blue)
        } else if ball_y < -GOAL_LINE_THRESHOLD {
            Some(Team::Orange)
        } else {
            None
        };

        // Re-arm once the ball fully leaves the goal volume.
        if goal_team.is_none() && ball_inside_goal.is_some() && ball_y.abs() <= GOAL_EXIT_THRESHOLD
        {
            ball_inside_goal = None;
        }

        if let (Some(team), None) = (goal_team, ball_inside_goal) {
            ball_inside_goal = Some(team);

            let (scorer, assist) = tracker.scorer_and_assist(frame.timestamp, 5.0);
            let shot_velocity = find_shot_velocity(frames, i, frame_rate);
            let distance_m = f64::from((ball_y - goal_line_y(team)).abs()) / 100.0;

            let goal_frame_reference = header_goal_frames.get(goal_index).copied().unwrap_or(i as i64);

            goals.push(GoalEvent {
                t: frame.timestamp,
                frame: Some(i),
                on_target: scorer.is_some(),
                scorer,
                team,
                assist,
                shot_speed_kph: round2(f64::from(shot_velocity.magnitude()) * UU_S_TO_KPH),
                distance_m: round2(distance_m),
                tickmark_lead_seconds: tickmark_lead(
                    goal_frame_reference,
                    highlight_frames.get(goal_index).copied(),
                    frame_rate,
                ),
            });
            goal_index += 1;
            tracker.clear();
        }
    }

    goals
}
