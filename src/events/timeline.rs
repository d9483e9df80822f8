//! Timeline aggregation: every detected event flattened into one
//! chronologically sorted list.

use float_ord::FloatOrd;
use serde_json::json;

use crate::events::types::{EventsBundle, TimelineEvent, TimelineEventType, TouchOutcome};

/// Build the chronological timeline. Goals with an assist emit an auxiliary
/// ASSIST entry; shot and save touches emit SHOT/SAVE entries. Sorted by
/// (t, type) with the type name as the stable secondary key.
pub fn build_timeline(events: &EventsBundle) -> Vec<TimelineEvent> {
    let mut timeline = Vec::new();

    for goal in &events.goals {
        timeline.push(TimelineEvent {
            t: goal.t,
            frame: goal.frame,
            event_type: TimelineEventType::Goal,
            player_id: goal.scorer.clone(),
            team: Some(goal.team),
            data: json!({
                "shot_speed_kph": goal.shot_speed_kph,
                "distance_m": goal.distance_m,
                "assist": goal.assist,
            }),
        });
        if goal.assist.is_some() {
            timeline.push(TimelineEvent {
                t: goal.t,
                frame: goal.frame,
                event_type: TimelineEventType::Assist,
                player_id: goal.assist.clone(),
                team: Some(goal.team),
                data: json!({ "scorer": goal.scorer }),
            });
        }
    }

    for demo in &events.demos {
        timeline.push(TimelineEvent {
            t: demo.t,
            frame: None,
            event_type: TimelineEventType::Demo,
            player_id: Some(demo.victim.clone()),
            team: Some(demo.team_victim),
            data: json!({
                "attacker": demo.attacker,
                "location": demo.location,
            }),
        });
    }

    for kickoff in &events.kickoffs {
        timeline.push(TimelineEvent {
            t: kickoff.t_start,
            frame: None,
            event_type: TimelineEventType::Kickoff,
            player_id: None,
            team: None,
            data: json!({
                "phase": kickoff.phase,
                "players": kickoff.players,
                "outcome": kickoff.outcome,
            }),
        });
    }

    for pickup in &events.boost_pickups {
        timeline.push(TimelineEvent {
            t: pickup.t,
            frame: pickup.frame,
            event_type: TimelineEventType::BoostPickup,
            player_id: Some(pickup.player_id.clone()),
            team: None,
            data: json!({
                "pad_type": pickup.pad_type,
                "stolen": pickup.stolen,
                "location": pickup.location,
            }),
        });
    }

    for touch in &events.touches {
        timeline.push(TimelineEvent {
            t: touch.t,
            frame: touch.frame,
            event_type: TimelineEventType::Touch,
            player_id: Some(touch.player_id.clone()),
            team: None,
            data: json!({
                "location": touch.location,
                "ball_speed_kph": touch.ball_speed_kph,
                "outcome": touch.outcome,
            }),
        });

        if touch.outcome == TouchOutcome::Shot {
            timeline.push(TimelineEvent {
                t: touch.t,
                frame: touch.frame,
                event_type: TimelineEventType::Shot,
                player_id: Some(touch.player_id.clone()),
                team: None,
                data: json!({ "ball_speed_kph": touch.ball_speed_kph }),
            });
        }
        if touch.is_save {
            timeline.push(TimelineEvent {
                t: touch.t,
                frame: touch.frame,
                event_type: TimelineEventType::Save,
                player_id: Some(touch.player_id.clone()),
                team: None,
                data: json!({ "ball_speed_kph": touch.ball_speed_kph }),
            });
        }
    }

    for challenge in &events.challenges {
        timeline.push(TimelineEvent {
            t: challenge.t,
            frame: None,
            event_type: TimelineEventType::Challenge,
            player_id: Some(challenge.first_player.clone()),
            team: Some(challenge.first_team),
            data: json!({
                "second_player": challenge.second_player,
                "winner_team": challenge.winner_team,
                "outcome": challenge.outcome,
                "depth_m": challenge.depth_m,
                "duration_s": challenge.duration,
                "risk_first": challenge.risk_first,
                "risk_second": challenge.risk_second,
                "location": challenge.location,
            }),
        });
    }

    timeline.sort_by(|a, b| {
        FloatOrd(a.t)
            .cmp(&FloatOrd(b.t))
            .then_with(|| a.event_type.as_str().cmp(b.event_type.as_str()))
    });

    timeline
}
