//! Aggregation of 50/50 challenge events into per-team / per-player metrics.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analysis::Scope;
use crate::events::types::{ChallengeOutcome, EventsBundle};
use crate::identity::Team;
use crate::math::{round1, round2};
use crate::normalize::Frame;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChallengeStats {
    pub contests: u32,
    pub wins: u32,
    pub losses: u32,
    pub neutral: u32,
    pub first_to_ball_pct: f64,
    pub challenge_depth_m: f64,
    pub risk_index_avg: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    contests: u32,
    wins: u32,
    losses: u32,
    neutral: u32,
    first_to_ball: u32,
    depth_sum: f64,
    risk_sum: f64,
    risk_count: u32,
}

impl Tally {
    fn compose(self) -> ChallengeStats {
        let first_pct = if self.contests > 0 {
            f64::from(self.first_to_ball) / f64::from(self.contests) * 100.0
        } else {
            0.0
        };
        let depth_avg = if self.contests > 0 {
            self.depth_sum / f64::from(self.contests)
        } else {
            0.0
        };
        let risk_avg = if self.risk_count > 0 {
            self.risk_sum / f64::from(self.risk_count)
        } else {
            0.0
        };
        ChallengeStats {
            contests: self.contests,
            wins: self.wins,
            losses: self.losses,
            neutral: self.neutral,
            first_to_ball_pct: round1(first_pct),
            challenge_depth_m: round2(depth_avg),
            risk_index_avg: round2(risk_avg),
        }
    }
}

pub fn analyze_challenges(
    _frames: &[Frame],
    events: &EventsBundle,
    scope: Scope<'_>,
) -> ChallengeStats {
    let mut team_tallies: BTreeMap<Team, Tally> =
        [(Team::Blue, Tally::default()), (Team::Orange, Tally::default())].into();
    let mut player_tallies: BTreeMap<String, Tally> = BTreeMap::new();

    for event in &events.challenges {
        {
            let first = team_tallies.entry(event.first_team).or_default();
            first.contests += 1;
            first.first_to_ball += 1;
            first.depth_sum += event.depth_m;
            first.risk_sum += event.risk_first;
            first.risk_count += 1;
        }
        {
            let second = team_tallies.entry(event.second_team).or_default();
            second.contests += 1;
            second.depth_sum += event.depth_m;
            second.risk_sum += event.risk_second;
            second.risk_count += 1;
        }
        match event.outcome {
            ChallengeOutcome::Win => {
                team_tallies.entry(event.first_team).or_default().wins += 1;
                team_tallies.entry(event.second_team).or_default().losses += 1;
            }
            ChallengeOutcome::Loss => {
                team_tallies.entry(event.first_team).or_default().losses += 1;
                team_tallies.entry(event.second_team).or_default().wins += 1;
            }
            ChallengeOutcome::Neutral => {
                team_tallies.entry(event.first_team).or_default().neutral += 1;
                team_tallies.entry(event.second_team).or_default().neutral += 1;
            }
        }

        {
            let first = player_tallies.entry(event.first_player.clone()).or_default();
            first.contests += 1;
            first.first_to_ball += 1;
            first.depth_sum += event.depth_m;
            first.risk_sum += event.risk_first;
            first.risk_count += 1;
        }
        {
            let second = player_tallies
                .entry(event.second_player.clone())
                .or_default();
            second.contests += 1;
            second.depth_sum += event.depth_m;
            second.risk_sum += event.risk_second;
            second.risk_count += 1;
        }
        match event.outcome {
            ChallengeOutcome::Win => {
                player_tallies.entry(event.first_player.clone()).or_default().wins += 1;
                player_tallies
                    .entry(event.second_player.clone())
                    .or_default()
                    .losses += 1;
            }
            ChallengeOutcome::Loss => {
                player_tallies
                    .entry(event.first_player.clone())
                    .or_default()
                    .losses += 1;
                player_tallies.entry(event.second_player.clone()).or_default().wins += 1;
            }
            ChallengeOutcome::Neutral => {
                player_tallies
                    .entry(event.first_player.clone())
                    .or_default()
                    .neutral += 1;
                player_tallies
                    .entry(event.second_player.clone())
                    .or_default()
                    .neutral += 1;
            }
        }
    }

    match scope {
        Scope::Player(player_id) => player_tallies
            .get(player_id)
            .copied()
            .unwrap_or_default()
            .compose(),
        Scope::Team(team) => team_tallies
            .get(&team)
            .copied()
            .unwrap_or_default()
            .compose(),
    }
}
