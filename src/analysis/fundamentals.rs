//! Core performance metrics counted from events: goals, assists, shots,
//! saves, demolitions, score, and shooting percentage.

use serde::Serialize;

use crate::analysis::{player_team_names, Scope};
use crate::events::types::{EventsBundle, TouchOutcome};
use crate::identity::Team;
use crate::math::round2;
use crate::normalize::Frame;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FundamentalsStats {
    pub goals: u32,
    pub assists: u32,
    pub shots: u32,
    pub saves: u32,
    pub demos_inflicted: u32,
    pub demos_taken: u32,
    pub score: u32,
    pub shooting_percentage: f64,
}

pub fn analyze_fundamentals(
    frames: &[Frame],
    events: &EventsBundle,
    scope: Scope<'_>,
) -> FundamentalsStats {
    let teams = player_team_names(frames);
    let matches_player = |player: Option<&str>, team: Option<Team>| -> bool {
        match scope {
            Scope::Player(pid) => player == Some(pid),
            Scope::Team(filter) => team == Some(filter),
        }
    };

    let mut stats = FundamentalsStats::default();

    for goal in &events.goals {
        if matches_player(goal.scorer.as_deref(), Some(goal.team)) {
            stats.goals += 1;
        }
        if let Some(assist) = &goal.assist {
            if matches_player(Some(assist), Some(goal.team)) {
                stats.assists += 1;
            }
        }
    }

    for demo in &events.demos {
        if let Some(attacker) = &demo.attacker {
            if matches_player(Some(attacker), demo.team_attacker) {
                stats.demos_inflicted += 1;
            }
        }
        if matches_player(Some(&demo.victim), Some(demo.team_victim)) {
            stats.demos_taken += 1;
        }
    }

    for touch in &events.touches {
        let touch_team = teams.get(&touch.player_id).copied();
        if !matches_player(Some(&touch.player_id), touch_team) {
            continue;
        }
        if touch.outcome == TouchOutcome::Shot {
            stats.shots += 1;
        }
        if touch.is_save {
            stats.saves += 1;
        }
    }

    if stats.shots > 0 {
        stats.shooting_percentage =
            round2(f64::from(stats.goals) / f64::from(stats.shots) * 100.0);
    }

    stats.score = 100 * stats.goals
        + 50 * stats.assists
        + 20 * stats.shots
        + 75 * stats.saves
        + 25 * stats.demos_inflicted;

    stats
}
