//! Touch detection with outcome and context classification.

use std::collections::BTreeMap;

use crate::constants::{
    AERIAL_HEIGHT_THRESHOLD, BACK_WALL_Y, CEILING_HEIGHT_THRESHOLD, GOAL_HEIGHT, GOAL_WIDTH,
    HALF_VOLLEY_HEIGHT, MIN_BALL_SPEED_FOR_TOUCH, MIN_RELATIVE_SPEED_FOR_TOUCH, SIDE_WALL_X,
    TOUCH_DEBOUNCE_TIME, TOUCH_LOCATION_EPS, TOUCH_PROXIMITY_THRESHOLD, WALL_PROXIMITY_THRESHOLD,
};
use crate::events::types::{TouchContext, TouchEvent, TouchOutcome};
use crate::identity::Team;
use crate::math::{relative_speed, round2, Vec3, UU_S_TO_KPH};
use crate::normalize::{Frame, PlayerFrame};

/// Detect player-ball contact events.
pub fn detect_touches(frames: &[Frame]) -> Vec<TouchEvent> {
    let mut touches: Vec<TouchEvent> = Vec::new();
    let mut last_touch: BTreeMap<String, (f64, Vec3)> = BTreeMap::new();
    let mut prev_ball_velocity: Option<Vec3> = None;
    let mut prev_ball_position: Option<Vec3> = None;
    let mut first_touch_recorded = false;

    for (frame_index, frame) in frames.iter().enumerate() {
        let ball_velocity = frame.ball.velocity;
        let ball_speed = ball_velocity.magnitude();

        for player in &frame.players {
            let distance = player.position.distance(frame.ball.position);
            if distance >= TOUCH_PROXIMITY_THRESHOLD {
                continue;
            }

            // Debounce repeated contacts in the same spot at low energy.
            if let Some((prev_t, prev_location)) = last_touch.get(&player.player_id) {
                let delta_t = frame.timestamp - prev_t;
                if delta_t < 0.05 {
                    continue;
                }
                let same_area = player.position.distance(*prev_location) <= TOUCH_LOCATION_EPS;
                if same_area && delta_t < TOUCH_DEBOUNCE_TIME {
                    let rel_speed = relative_speed(player.velocity, frame.ball.velocity);
                    if ball_speed < MIN_BALL_SPEED_FOR_TOUCH
                        && rel_speed < MIN_RELATIVE_SPEED_FOR_TOUCH
                    {
                        continue;
                    }
                }
            }

            let (outcome, is_save) =
                classify_outcome(player, frame, prev_ball_velocity, prev_ball_position);

            let is_first = !first_touch_recorded;
            first_touch_recorded = true;

            touches.push(TouchEvent {
                t: frame.timestamp,
                frame: Some(frame_index),
                player_id: player.player_id.clone(),
                location: player.position,
                ball_speed_kph: round2(f64::from(ball_speed) * UU_S_TO_KPH),
                outcome,
                is_save,
                touch_context: classify_context(player, frame.ball.position),
                car_height: round2(f64::from(player.position.z)),
                is_first_touch: is_first,
            });
            last_touch.insert(player.player_id.clone(), (frame.timestamp, player.position));
        }

        prev_ball_velocity = Some(ball_velocity);
        prev_ball_position = Some(frame.ball.position);
    }

    touches
}

pub fn is_toward_opponent_goal(team: Team, velocity: Vec3) -> bool {
    match team {
        Team::Blue => velocity.y > 250.0,
        Team::Orange => velocity.y < -250.0,
    }
}

pub fn is_toward_own_goal(team: Team, velocity: Vec3) -> bool {
    match team {
        Team::Blue => velocity.y < -400.0,
        Team::Orange => velocity.y > 400.0,
    }
}

pub fn is_in_defensive_third(team: Team, position: Vec3) -> bool {
    match team {
        Team::Blue => position.y <= -BACK_WALL_Y * 0.33,
        Team::Orange => position.y >= BACK_WALL_Y * 0.33,
    }
}

/// Would the current trajectory enter the opponent's goal mouth within 3.5 s?
pub fn is_shot_on_target(team: Team, position: Vec3, velocity: Vec3) -> bool {
    if !is_toward_opponent_goal(team, velocity) {
        return false;
    }
    let dy = velocity.y;
    if dy.abs() < 1e-6 {
        return false;
    }

    let goal_y = match team {
        Team::Blue => BACK_WALL_Y,
        Team::Orange => -BACK_WALL_Y,
    };
    let time_to_goal = (goal_y - position.y) / dy;
    if time_to_goal <= 0.0 || time_to_goal > 3.5 {
        return false;
    }

    let est_x = position.x + velocity.x * time_to_goal;
    let est_z = position.z + velocity.z * time_to_goal;
    est_x.abs() <= GOAL_WIDTH && est_z <= GOAL_HEIGHT
}

fn classify_outcome(
    player: &PlayerFrame,
    frame: &Frame,
    prev_ball_velocity: Option<Vec3>,
    prev_ball_position: Option<Vec3>,
) -> (TouchOutcome, bool) {
    let ball_velocity = frame.ball.velocity;
    let ball_speed = ball_velocity.magnitude();
    let team = player.team;

    if ball_speed > 1500.0 {
        return (TouchOutcome::Shot, false);
    }

    if is_shot_on_target(team, frame.ball.position, ball_velocity) && ball_speed >= 650.0 {
        return (TouchOutcome::Shot, false);
    }

    // A save: ball was heading at our goal from our defensive third, now it
    // is not.
    if let (Some(prev_velocity), Some(prev_position)) = (prev_ball_velocity, prev_ball_position) {
        if is_toward_own_goal(team, prev_velocity)
            && !is_toward_own_goal(team, ball_velocity)
            && is_in_defensive_third(team, prev_position)
        {
            return (TouchOutcome::Clear, true);
        }
    }

    if ball_speed > 900.0 && is_toward_opponent_goal(team, ball_velocity) {
        return (TouchOutcome::Pass, false);
    }

    if ball_speed < 250.0 {
        return (TouchOutcome::Dribble, false);
    }

    if ball_speed > 600.0 && is_toward_opponent_goal(team, ball_velocity) {
        return (TouchOutcome::Pass, false);
    }

    (TouchOutcome::Neutral, false)
}

fn classify_context(player: &PlayerFrame, ball_position: Vec3) -> TouchContext {
    let car_height = player.position.z;
    let car_x = player.position.x.abs();
    let car_y = player.position.y.abs();

    if car_height >= CEILING_HEIGHT_THRESHOLD {
        return TouchContext::Ceiling;
    }

    let near_side_wall = car_x >= SIDE_WALL_X - WALL_PROXIMITY_THRESHOLD;
    let near_back_wall = car_y >= BACK_WALL_Y - WALL_PROXIMITY_THRESHOLD;
    if (near_side_wall || near_back_wall) && car_height > 100.0 {
        return TouchContext::Wall;
    }

    if car_height >= AERIAL_HEIGHT_THRESHOLD && ball_position.z >= AERIAL_HEIGHT_THRESHOLD {
        return TouchContext::Aerial;
    }

    if car_height > 17.0 && car_height < HALF_VOLLEY_HEIGHT && !player.is_on_ground {
        return TouchContext::HalfVolley;
    }

    if car_height < 30.0 || player.is_on_ground {
        return TouchContext::Ground;
    }

    // Elevated but not clearly anything else: treat higher touches as aerial.
    if car_height >= 100.0 {
        return TouchContext::Aerial;
    }

    TouchContext::Ground
}
