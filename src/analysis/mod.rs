//! Analyzers and the aggregator that orchestrates them.
//!
//! Every analyzer is a pure function of (frames, events) with an optional
//! player or team scope; empty inputs yield the zero record. The aggregator
//! runs the expensive whole-replay analyzers once, caches their outputs, and
//! splices the cached sub-records into each scoped result.

pub mod ball_prediction;
pub mod boost;
pub mod challenges;
pub mod defense;
pub mod fundamentals;
pub mod heatmaps;
pub mod kickoffs;
pub mod mechanics;
pub mod movement;
pub mod passing;
pub mod positioning;
pub mod recovery;
pub mod xg;

use std::collections::BTreeMap;

use serde::Serialize;

pub use ball_prediction::{analyze_ball_prediction, BallPredictionStats, ReadQuality};
pub use boost::{analyze_boost, BoostStats};
pub use challenges::{analyze_challenges, ChallengeStats};
pub use defense::{analyze_defense, DefenseOutput, DefensePlayerStats, DefenseTeamStats};
pub use fundamentals::{analyze_fundamentals, FundamentalsStats};
pub use heatmaps::{generate_heatmaps, Heatmaps};
pub use kickoffs::{analyze_kickoffs, KickoffStats};
pub use mechanics::{analyze_mechanics, MechanicsStats, TeamMechanicsStats};
pub use movement::{analyze_movement, MovementStats};
pub use passing::{analyze_passing, PassingStats};
pub use positioning::{analyze_positioning, calculate_rotation_compliance, PositioningStats,
    RotationCompliance};
pub use recovery::{analyze_recoveries, RecoveryQuality, RecoveryStats};
pub use xg::{analyze_shots_xg, XgPlayerStats};

use crate::events::types::EventsBundle;
use crate::identity::Team;
use crate::normalize::{Frame, PlayerFrame};
use crate::parser::types::Header;

/// Scope for the per-entity analyzers.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    Player(&'a str),
    Team(Team),
}

/// Complete analysis block for one team.
#[derive(Debug, Clone, Serialize)]
pub struct TeamAnalysis {
    pub fundamentals: FundamentalsStats,
    pub boost: BoostStats,
    pub movement: MovementStats,
    pub positioning: PositioningStats,
    pub passing: PassingStats,
    pub challenges: ChallengeStats,
    pub kickoffs: KickoffStats,
    pub defense: DefenseTeamStats,
    pub mechanics: TeamMechanicsStats,
    pub total_xg: f64,
}

/// Complete analysis block for one player.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerAnalysis {
    pub fundamentals: FundamentalsStats,
    pub boost: BoostStats,
    pub movement: MovementStats,
    pub positioning: PositioningStats,
    pub passing: PassingStats,
    pub challenges: ChallengeStats,
    pub kickoffs: KickoffStats,
    pub heatmaps: Heatmaps,
    pub rotation_compliance: RotationCompliance,
    pub mechanics: MechanicsStats,
    pub recovery: RecoveryStats,
    pub xg: XgPlayerStats,
    pub defense: DefensePlayerStats,
    pub ball_prediction: BallPredictionStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerTeamAnalysis {
    pub blue: TeamAnalysis,
    pub orange: TeamAnalysis,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutput {
    pub per_team: PerTeamAnalysis,
    /// Keyed by canonical player id.
    pub per_player: BTreeMap<String, PlayerAnalysis>,
    #[serde(skip)]
    pub warnings: Vec<String>,
}

/// Aggregate all analysis for a replay.
pub fn aggregate_analysis(
    frames: &[Frame],
    events: &EventsBundle,
    _header: Option<&Header>,
) -> AnalysisOutput {
    let mut warnings = Vec::new();
    if frames.is_empty() || (frames.len() == 1 && frames[0].players.is_empty()) {
        warnings.push("no_frame_data_available".to_string());
    }

    // First appearance in the frames determines each player's team.
    let players = extract_players_from_frames(frames);

    // Whole-replay analyzers run once; their outputs are spliced below.
    let cached_mechanics = analyze_mechanics(frames);
    let cached_recoveries = analyze_recoveries(frames);
    let cached_defense = analyze_defense(frames);
    let cached_ball_prediction = analyze_ball_prediction(frames);
    let cached_xg = analyze_shots_xg(frames, &events.touches);

    let analyze_team = |team: Team| -> TeamAnalysis {
        let team_players: Vec<String> = players
            .iter()
            .filter(|(_, t)| **t == team)
            .map(|(pid, _)| pid.clone())
            .collect();
        TeamAnalysis {
            fundamentals: analyze_fundamentals(frames, events, Scope::Team(team)),
            boost: analyze_boost(frames, events, Scope::Team(team)),
            movement: analyze_movement(frames, events, Scope::Team(team)),
            positioning: analyze_positioning(frames, events, Scope::Team(team)),
            passing: analyze_passing(frames, events, Scope::Team(team)),
            challenges: analyze_challenges(frames, events, Scope::Team(team)),
            kickoffs: analyze_kickoffs(frames, events, Scope::Team(team)),
            defense: cached_defense
                .per_team
                .get(&team)
                .cloned()
                .unwrap_or_default(),
            mechanics: mechanics::team_mechanics(&cached_mechanics.per_player, &team_players),
            total_xg: cached_xg.team_totals.get(&team).copied().unwrap_or(0.0),
        }
    };

    let per_team = PerTeamAnalysis {
        blue: analyze_team(Team::Blue),
        orange: analyze_team(Team::Orange),
    };

    let mut per_player = BTreeMap::new();
    for player_id in players.keys() {
        let scope = Scope::Player(player_id);
        per_player.insert(
            player_id.clone(),
            PlayerAnalysis {
                fundamentals: analyze_fundamentals(frames, events, scope),
                boost: analyze_boost(frames, events, scope),
                movement: analyze_movement(frames, events, scope),
                positioning: analyze_positioning(frames, events, scope),
                passing: analyze_passing(frames, events, scope),
                challenges: analyze_challenges(frames, events, scope),
                kickoffs: analyze_kickoffs(frames, events, scope),
                heatmaps: generate_heatmaps(frames, player_id, events),
                rotation_compliance: calculate_rotation_compliance(frames, player_id),
                mechanics: cached_mechanics
                    .per_player
                    .get(player_id)
                    .cloned()
                    .unwrap_or_default(),
                recovery: cached_recoveries
                    .per_player
                    .get(player_id)
                    .cloned()
                    .unwrap_or_else(RecoveryStats::empty),
                xg: cached_xg
                    .per_player
                    .get(player_id)
                    .cloned()
                    .unwrap_or_default(),
                defense: cached_defense
                    .per_player
                    .get(player_id)
                    .cloned()
                    .unwrap_or_default(),
                ball_prediction: cached_ball_prediction
                    .per_player
                    .get(player_id)
                    .cloned()
                    .unwrap_or_else(BallPredictionStats::empty),
            },
        );
    }

    AnalysisOutput {
        per_team,
        per_player,
        warnings,
    }
}

/// Unique players and their teams, first appearance winning.
pub fn extract_players_from_frames(frames: &[Frame]) -> BTreeMap<String, Team> {
    let mut players = BTreeMap::new();
    for frame in frames {
        for player in &frame.players {
            players
                .entry(player.player_id.clone())
                .or_insert(player.team);
        }
    }
    players
}

/// Player id -> team for everyone seen in the frames.
pub fn player_team_names(frames: &[Frame]) -> BTreeMap<String, Team> {
    extract_players_from_frames(frames)
}

/// Sorted canonical ids of one team's players.
pub fn team_player_ids(frames: &[Frame], team: Team) -> Vec<String> {
    extract_players_from_frames(frames)
        .into_iter()
        .filter(|(_, t)| *t == team)
        .map(|(pid, _)| pid)
        .collect()
}

pub(crate) fn find_player<'f>(frame: &'f Frame, player_id: &str) -> Option<&'f PlayerFrame> {
    frame.player(player_id)
}

/// Duration represented by frame `index`: time to the next frame, falling
/// back to the previous interval, then a 30 Hz default.
pub(crate) fn frame_duration(frames: &[Frame], index: usize, prev_timestamp: Option<f64>) -> f64 {
    if index + 1 < frames.len() {
        let next_dt = frames[index + 1].timestamp - frames[index].timestamp;
        if next_dt > 0.0 {
            return next_dt;
        }
    }
    if let Some(prev) = prev_timestamp {
        let prev_dt = frames[index].timestamp - prev;
        if prev_dt > 0.0 {
            return prev_dt;
        }
    }
    0.033
}
