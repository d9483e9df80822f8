//! Demolition detection from per-player state transitions.

use std::collections::BTreeMap;

use crate::constants::DEMO_POSITION_TOLERANCE;
use crate::events::types::DemoEvent;
use crate::normalize::Frame;

/// Detect demolition events: a player's demolished flag flipping false->true.
/// The attacker is the nearest non-demolished enemy within tolerance.
pub fn detect_demos(frames: &[Frame]) -> Vec<DemoEvent> {
    let mut demos = Vec::new();
    let mut previous_states: BTreeMap<String, bool> = BTreeMap::new();

    for frame in frames {
        for player in &frame.players {
            let was_demolished = previous_states
                .get(&player.player_id)
                .copied()
                .unwrap_or(false);

            if !was_demolished && player.is_demolished {
                let mut attacker = None;
                let mut attacker_team = None;
                let mut min_distance = f32::INFINITY;

                for other in &frame.players {
                    if other.player_id == player.player_id
                        || other.team == player.team
                        || other.is_demolished
                    {
                        continue;
                    }
                    let distance = player.position.distance(other.position);
                    if distance < DEMO_POSITION_TOLERANCE && distance < min_distance {
                        min_distance = distance;
                        attacker = Some(other.player_id.clone());
                        attacker_team = Some(other.team);
                    }
                }

                demos.push(DemoEvent {
                    t: frame.timestamp,
                    victim: player.player_id.clone(),
                    attacker,
                    team_attacker: attacker_team,
                    team_victim: player.team,
                    location: player.position,
                });
            }

            previous_states.insert(player.player_id.clone(), player.is_demolished);
        }
    }

    demos
}
