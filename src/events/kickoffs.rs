//! Kickoff detection and per-player approach classification.
//!
//! A kickoff window opens when the ball is reset to the center spot and
//! stationary, and closes when the ball leaves center or the window times
//! out. While the window is open, every player's movement, boost, and speed
//! profile is tracked so the approach can be classified afterwards.

use std::collections::BTreeMap;

use crate::constants::{
    BALL_STATIONARY_THRESHOLD, KICKOFF_CENTER_POSITION, KICKOFF_HEIGHT_TOLERANCE,
    KICKOFF_MAX_DURATION, KICKOFF_MIN_COOLDOWN, KICKOFF_POSITION_TOLERANCE,
    TOUCH_PROXIMITY_THRESHOLD,
};
use crate::events::types::{
    ApproachType, KickoffEvent, KickoffOutcome, KickoffPhase, KickoffPlayer, KickoffRole,
};
use crate::identity::Team;
use crate::math::{round2, round3, Vec3};
use crate::normalize::Frame;
use crate::parser::types::Header;

/// Detect kickoff events with enriched per-player metrics.
pub fn detect_kickoffs(frames: &[Frame], header: Option<&Header>) -> Vec<KickoffEvent> {
    if frames.is_empty() {
        return Vec::new();
    }

    let mut kickoffs = Vec::new();
    let mut state: Option<KickoffState> = None;
    let mut last_kickoff_end = -KICKOFF_MIN_COOLDOWN;

    for frame in frames {
        let ball = &frame.ball;
        let at_center = (ball.position.x - KICKOFF_CENTER_POSITION.x).abs()
            <= KICKOFF_POSITION_TOLERANCE
            && (ball.position.y - KICKOFF_CENTER_POSITION.y).abs() <= KICKOFF_POSITION_TOLERANCE
            && (ball.position.z - KICKOFF_CENTER_POSITION.z).abs() <= KICKOFF_HEIGHT_TOLERANCE;
        let ball_speed = ball.velocity.magnitude();
        let is_stationary = ball_speed < BALL_STATIONARY_THRESHOLD;

        if state.is_none()
            && at_center
            && is_stationary
            && (frame.timestamp - last_kickoff_end) >= KICKOFF_MIN_COOLDOWN
        {
            state = Some(KickoffState::start(frame));
            continue;
        }

        let Some(tracking) = state.as_mut() else {
            continue;
        };

        tracking.update(frame);

        let elapsed = frame.timestamp - tracking.t_start;
        let ball_left_center = !at_center || ball_speed > BALL_STATIONARY_THRESHOLD * 1.5;
        if ball_left_center || elapsed >= KICKOFF_MAX_DURATION {
            if let Some(event) = state.take().and_then(|s| s.finalize(frame, header)) {
                kickoffs.push(event);
                last_kickoff_end = frame.timestamp;
            }
        }
    }

    // Replay ended while the ball was still at center.
    if let (Some(tracking), Some(last)) = (state, frames.last()) {
        if let Some(event) = tracking.finalize(last, header) {
            kickoffs.push(event);
        }
    }

    kickoffs
}

struct PlayerTracking {
    team: Team,
    start_pos: Vec3,
    start_boost: f64,
    min_boost: f64,
    movement_start_time: Option<f64>,
    max_distance: f32,
    first_touch_time: Option<f64>,
    role: KickoffRole,
    /// (time relative to kickoff start, speed).
    velocities: Vec<(f64, f32)>,
    max_speed: f32,
    reached_ball: bool,
    moved_toward_ball: bool,
    moved_away_from_ball: bool,
    jumped: bool,
}

struct KickoffState {
    t_start: f64,
    players: BTreeMap<String, PlayerTracking>,
    player_order: Vec<String>,
    /// (player_id, team, relative time) of the earliest contact.
    first_touch: Option<(String, Team, f64)>,
}

impl KickoffState {
    fn start(frame: &Frame) -> Self {
        let mut players = BTreeMap::new();
        let mut player_order = Vec::new();

        for player in &frame.players {
            player_order.push(player.player_id.clone());
            players.insert(
                player.player_id.clone(),
                PlayerTracking {
                    team: player.team,
                    start_pos: player.position,
                    start_boost: f64::from(player.boost_amount),
                    min_boost: f64::from(player.boost_amount),
                    movement_start_time: None,
                    max_distance: 0.0,
                    first_touch_time: None,
                    role: KickoffRole::Back,
                    velocities: Vec::new(),
                    max_speed: 0.0,
                    reached_ball: false,
                    moved_toward_ball: false,
                    moved_away_from_ball: false,
                    jumped: false,
                },
            );
        }

        let mut state = Self {
            t_start: frame.timestamp,
            players,
            player_order,
            first_touch: None,
        };
        state.assign_roles();
        state
    }

    /// Per team, the player closest to the center spot is the goer; the rest
    /// classify by spawn layout.
    fn assign_roles(&mut self) {
        for team in [Team::Blue, Team::Orange] {
            let mut entries: Vec<(String, Vec3)> = self
                .players
                .iter()
                .filter(|(_, p)| p.team == team)
                .map(|(pid, p)| (pid.clone(), p.start_pos))
                .collect();
            entries.sort_by(|a, b| {
                let da = a.1.horizontal_magnitude();
                let db = b.1.horizontal_magnitude();
                da.partial_cmp(&db)
                    .expect("spawn distances are finite")
                    .then_with(|| a.0.cmp(&b.0))
            });

            for (ordinal, (pid, spawn)) in entries.iter().enumerate() {
                let role = classify_role(*spawn, ordinal);
                if let Some(tracking) = self.players.get_mut(pid) {
                    tracking.role = role;
                }
            }
        }
    }

    fn update(&mut self, frame: &Frame) {
        let ball = &frame.ball;
        let rel_time = frame.timestamp - self.t_start;

        for player in &frame.players {
            // Substitutes appearing mid-kickoff are ignored.
            let Some(tracking) = self.players.get_mut(&player.player_id) else {
                continue;
            };

            tracking.min_boost = tracking.min_boost.min(f64::from(player.boost_amount));
            let distance_from_start = player.position.distance(tracking.start_pos);
            tracking.max_distance = tracking.max_distance.max(distance_from_start);

            if tracking.movement_start_time.is_none() && distance_from_start > 150.0 {
                tracking.movement_start_time = Some(frame.timestamp);
            }

            let speed = player.velocity.magnitude();
            tracking.velocities.push((rel_time, speed));
            tracking.max_speed = tracking.max_speed.max(speed);

            let separation = player.position.distance(ball.position);
            if separation < TOUCH_PROXIMITY_THRESHOLD * 1.2 {
                tracking.reached_ball = true;
            }

            let start_dist = tracking.start_pos.distance(KICKOFF_CENTER_POSITION);
            let current_dist = player.position.distance(KICKOFF_CENTER_POSITION);
            if current_dist < start_dist - 100.0 {
                tracking.moved_toward_ball = true;
            }
            if current_dist > start_dist + 100.0 {
                tracking.moved_away_from_ball = true;
            }

            if !player.is_on_ground && player.position.z > 30.0 {
                tracking.jumped = true;
            }

            if separation < TOUCH_PROXIMITY_THRESHOLD * 0.9 {
                if tracking.first_touch_time.is_none() {
                    tracking.first_touch_time = Some(rel_time);
                }
                let earlier = self
                    .first_touch
                    .as_ref()
                    .map_or(true, |(_, _, t)| rel_time < *t);
                if earlier {
                    self.first_touch = Some((player.player_id.clone(), tracking.team, rel_time));
                }
            }
        }
    }

    fn finalize(self, frame: &Frame, header: Option<&Header>) -> Option<KickoffEvent> {
        let elapsed = frame.timestamp - self.t_start;
        if elapsed < 0.05 {
            return None;
        }

        let players = self
            .player_order
            .iter()
            .filter_map(|pid| {
                let tracking = self.players.get(pid)?;
                let boost_used = (tracking.start_boost - tracking.min_boost).max(0.0);
                Some(KickoffPlayer {
                    player_id: pid.clone(),
                    role: tracking.role,
                    boost_used: round2(boost_used),
                    approach_type: classify_approach(tracking),
                    time_to_first_touch: tracking.first_touch_time.map(round3),
                })
            })
            .collect();

        let outcome = match &self.first_touch {
            Some((_, Team::Blue, _)) => KickoffOutcome::FirstPossessionBlue,
            Some((_, Team::Orange, _)) => KickoffOutcome::FirstPossessionOrange,
            None => KickoffOutcome::Neutral,
        };

        Some(KickoffEvent {
            phase: determine_phase(self.t_start, header),
            t_start: self.t_start,
            players,
            outcome,
            first_touch_player: self.first_touch.as_ref().map(|(pid, _, _)| pid.clone()),
            time_to_first_touch: self.first_touch.as_ref().map(|(_, _, t)| round3(*t)),
        })
    }
}

fn classify_role(position: Vec3, ordinal: usize) -> KickoffRole {
    if ordinal == 0 {
        return KickoffRole::Go;
    }
    let x_abs = position.x.abs();
    let y_abs = position.y.abs();
    if x_abs >= 1700.0 && y_abs <= 3600.0 {
        KickoffRole::Wing
    } else if y_abs <= 3200.0 {
        KickoffRole::Cheat
    } else {
        KickoffRole::Back
    }
}

/// Classification priority: fakes, then delay, then speedflip, then standard
/// subtypes. First match wins.
fn classify_approach(tracking: &PlayerTracking) -> ApproachType {
    if let Some(fake) = classify_fake(tracking) {
        return fake;
    }
    if is_delay(tracking) {
        return ApproachType::Delay;
    }
    if is_speedflip(tracking) {
        return ApproachType::Speedflip;
    }
    let standard = classify_standard(tracking);
    if standard != ApproachType::Standard {
        return standard;
    }

    let boost_used = (tracking.start_boost - tracking.min_boost).max(0.0);
    if boost_used > 0.0 || tracking.max_distance > 150.0 {
        ApproachType::Standard
    } else {
        ApproachType::Unknown
    }
}

fn classify_fake(tracking: &PlayerTracking) -> Option<ApproachType> {
    if tracking.first_touch_time.is_some() {
        return None;
    }
    let boost_used = (tracking.start_boost - tracking.min_boost).max(0.0);

    if tracking.max_distance < 100.0 && boost_used < 5.0 {
        return Some(ApproachType::FakeStationary);
    }
    // Half-flip backward to grab corner boost.
    if tracking.moved_away_from_ball && !tracking.moved_toward_ball && tracking.max_distance > 300.0
    {
        return Some(ApproachType::FakeHalfflip);
    }
    if !tracking.reached_ball && tracking.moved_toward_ball && tracking.max_distance > 500.0 {
        return Some(ApproachType::FakeAggressive);
    }
    if !tracking.reached_ball && tracking.max_distance > 300.0 {
        return Some(ApproachType::FakeAggressive);
    }
    None
}

/// Delay kickoff: a fast approach that brakes hard right before contact.
fn is_delay(tracking: &PlayerTracking) -> bool {
    let Some(contact_time) = tracking.first_touch_time else {
        return false;
    };
    if tracking.velocities.is_empty() || tracking.max_speed < 1800.0 {
        return false;
    }

    let pre_contact: Vec<f32> = tracking
        .velocities
        .iter()
        .filter(|(t, _)| *t > contact_time - 0.5 && *t < contact_time)
        .map(|(_, v)| *v)
        .collect();
    if pre_contact.len() < 3 {
        return false;
    }

    let local_max = pre_contact.iter().cloned().fold(0.0f32, f32::max);
    let final_speed = *pre_contact.last().expect("checked non-empty");
    if local_max <= 0.0 {
        return false;
    }
    let speed_drop = (local_max - final_speed) / local_max;
    speed_drop > 0.30 && local_max > 1500.0
}

/// Speedflip: flip plus heavy boost usage, supersonic-range top speed, and a
/// fast first touch.
fn is_speedflip(tracking: &PlayerTracking) -> bool {
    if !tracking.jumped {
        return false;
    }
    let boost_used = (tracking.start_boost - tracking.min_boost).max(0.0);
    if boost_used < 20.0 || tracking.max_speed < 2000.0 {
        return false;
    }
    matches!(tracking.first_touch_time, Some(t) if t <= 2.7)
}

fn classify_standard(tracking: &PlayerTracking) -> ApproachType {
    let boost_used = (tracking.start_boost - tracking.min_boost).max(0.0);
    if !tracking.jumped {
        if boost_used > 10.0 {
            return ApproachType::StandardBoost;
        }
        return ApproachType::Standard;
    }
    if tracking.max_speed > 2100.0 {
        return ApproachType::StandardDiagonal;
    }
    ApproachType::StandardFrontflip
}

fn determine_phase(kickoff_start: f64, header: Option<&Header>) -> KickoffPhase {
    if let Some(header) = header {
        if header.overtime && kickoff_start >= header.match_length.max(300.0) {
            return KickoffPhase::Ot;
        }
    }
    if kickoff_start >= 300.0 {
        KickoffPhase::Ot
    } else {
        KickoffPhase::Initial
    }
}
