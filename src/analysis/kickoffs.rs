//! Aggregation of kickoff events: approach-type counts, first possession,
//! and average time to first touch.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analysis::{player_team_names, Scope};
use crate::events::types::{ApproachType, EventsBundle, KickoffOutcome};
use crate::identity::Team;
use crate::math::round2;
use crate::normalize::Frame;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KickoffStats {
    pub count: u32,
    pub first_possession: u32,
    pub neutral: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub avg_time_to_first_touch_s: f64,
    pub approach_types: BTreeMap<String, u32>,
}

impl KickoffStats {
    fn with_empty_approaches() -> Self {
        let mut stats = KickoffStats::default();
        for approach in [
            ApproachType::Standard,
            ApproachType::StandardDiagonal,
            ApproachType::StandardFrontflip,
            ApproachType::StandardBoost,
            ApproachType::Speedflip,
            ApproachType::Fake,
            ApproachType::FakeStationary,
            ApproachType::FakeHalfflip,
            ApproachType::FakeAggressive,
            ApproachType::Delay,
            ApproachType::Unknown,
        ] {
            stats.approach_types.insert(approach.as_str().to_string(), 0);
        }
        stats
    }
}

pub fn analyze_kickoffs(frames: &[Frame], events: &EventsBundle, scope: Scope<'_>) -> KickoffStats {
    if events.kickoffs.is_empty() {
        return KickoffStats::with_empty_approaches();
    }

    let player_team = player_team_names(frames);
    let mut stats = KickoffStats::with_empty_approaches();
    let mut times: Vec<f64> = Vec::new();

    for kickoff in &events.kickoffs {
        match scope {
            Scope::Player(player_id) => {
                let Some(entry) = kickoff.players.iter().find(|p| p.player_id == player_id)
                else {
                    continue;
                };
                stats.count += 1;
                if kickoff.outcome == KickoffOutcome::Neutral {
                    stats.neutral += 1;
                }
                let won_possession = match (kickoff.outcome, player_team.get(player_id)) {
                    (KickoffOutcome::FirstPossessionBlue, Some(Team::Blue)) => true,
                    (KickoffOutcome::FirstPossessionOrange, Some(Team::Orange)) => true,
                    _ => false,
                };
                if won_possession {
                    stats.first_possession += 1;
                }
                if let Some(t) = entry.time_to_first_touch {
                    times.push(t);
                }
                *stats
                    .approach_types
                    .entry(entry.approach_type.as_str().to_string())
                    .or_insert(0) += 1;
            }
            Scope::Team(team) => {
                stats.count += 1;
                match kickoff.outcome {
                    KickoffOutcome::Neutral => stats.neutral += 1,
                    KickoffOutcome::FirstPossessionBlue if team == Team::Blue => {
                        stats.first_possession += 1;
                    }
                    KickoffOutcome::FirstPossessionOrange if team == Team::Orange => {
                        stats.first_possession += 1;
                    }
                    _ => {}
                }
                for entry in &kickoff.players {
                    if player_team.get(&entry.player_id) != Some(&team) {
                        continue;
                    }
                    if let Some(t) = entry.time_to_first_touch {
                        times.push(t);
                    }
                    *stats
                        .approach_types
                        .entry(entry.approach_type.as_str().to_string())
                        .or_insert(0) += 1;
                }
            }
        }
    }

    if !times.is_empty() {
        stats.avg_time_to_first_touch_s = round2(times.iter().sum::<f64>() / times.len() as f64);
    }
    stats
}
