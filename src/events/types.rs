//! Event records emitted by the detectors.
//!
//! All events are immutable once detected. Enum values serialize in
//! UPPER_CASE to match the report schema.

use serde::Serialize;

use crate::identity::Team;
use crate::math::Vec3;

/// Goal event with scorer and shot metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalEvent {
    /// Timestamp from match start.
    pub t: f64,
    pub frame: Option<usize>,
    pub scorer: Option<String>,
    pub team: Team,
    pub assist: Option<String>,
    pub shot_speed_kph: f64,
    pub distance_m: f64,
    pub on_target: bool,
    pub tickmark_lead_seconds: f64,
}

/// Demolition event with victim and attacker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoEvent {
    pub t: f64,
    pub victim: String,
    pub attacker: Option<String>,
    pub team_attacker: Option<Team>,
    pub team_victim: Team,
    pub location: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KickoffPhase {
    Initial,
    Ot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KickoffRole {
    Go,
    Cheat,
    Wing,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApproachType {
    Standard,
    StandardDiagonal,
    StandardFrontflip,
    StandardBoost,
    Speedflip,
    Fake,
    FakeStationary,
    FakeHalfflip,
    FakeAggressive,
    Delay,
    Unknown,
}

impl ApproachType {
    pub fn as_str(self) -> &'static str {
        match self {
            ApproachType::Standard => "STANDARD",
            ApproachType::StandardDiagonal => "STANDARD_DIAGONAL",
            ApproachType::StandardFrontflip => "STANDARD_FRONTFLIP",
            ApproachType::StandardBoost => "STANDARD_BOOST",
            ApproachType::Speedflip => "SPEEDFLIP",
            ApproachType::Fake => "FAKE",
            ApproachType::FakeStationary => "FAKE_STATIONARY",
            ApproachType::FakeHalfflip => "FAKE_HALFFLIP",
            ApproachType::FakeAggressive => "FAKE_AGGRESSIVE",
            ApproachType::Delay => "DELAY",
            ApproachType::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KickoffOutcome {
    FirstPossessionBlue,
    FirstPossessionOrange,
    Neutral,
    GoalFor,
    GoalAgainst,
}

/// Per-player kickoff analysis carried inside a [`KickoffEvent`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KickoffPlayer {
    pub player_id: String,
    pub role: KickoffRole,
    pub boost_used: f64,
    pub approach_type: ApproachType,
    pub time_to_first_touch: Option<f64>,
}

/// Kickoff event with per-player analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KickoffEvent {
    pub phase: KickoffPhase,
    pub t_start: f64,
    pub players: Vec<KickoffPlayer>,
    pub outcome: KickoffOutcome,
    pub first_touch_player: Option<String>,
    pub time_to_first_touch: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PadType {
    Big,
    Small,
}

/// Boost pad pickup event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoostPickupEvent {
    pub t: f64,
    pub player_id: String,
    pub pad_type: PadType,
    /// True when collected on the opponent half.
    pub stolen: bool,
    /// Index into the field pad table.
    pub pad_id: usize,
    pub location: Vec3,
    pub frame: Option<usize>,
    pub boost_before: Option<f64>,
    pub boost_after: Option<f64>,
    pub boost_gain: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TouchOutcome {
    Shot,
    Pass,
    Clear,
    Dribble,
    Neutral,
}

/// Context of a ball touch based on car state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TouchContext {
    Ground,
    Aerial,
    Wall,
    Ceiling,
    HalfVolley,
    Unknown,
}

/// Player-ball contact event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TouchEvent {
    pub t: f64,
    pub frame: Option<usize>,
    pub player_id: String,
    pub location: Vec3,
    pub ball_speed_kph: f64,
    pub outcome: TouchOutcome,
    pub is_save: bool,
    pub touch_context: TouchContext,
    pub car_height: f64,
    pub is_first_touch: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeOutcome {
    Win,
    Loss,
    Neutral,
}

/// 50/50 contest event between opposing players. `outcome` is from the first
/// player's perspective.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChallengeEvent {
    /// Midpoint of the two contest touches.
    pub t: f64,
    pub first_player: String,
    pub second_player: String,
    pub first_team: Team,
    pub second_team: Team,
    pub outcome: ChallengeOutcome,
    pub winner_team: Option<Team>,
    pub location: Vec3,
    pub depth_m: f64,
    pub duration: f64,
    pub risk_first: f64,
    pub risk_second: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimelineEventType {
    Goal,
    Assist,
    Demo,
    Kickoff,
    BoostPickup,
    Touch,
    Shot,
    Save,
    Challenge,
}

impl TimelineEventType {
    /// Serialized name, used as the stable secondary sort key.
    pub fn as_str(self) -> &'static str {
        match self {
            TimelineEventType::Goal => "GOAL",
            TimelineEventType::Assist => "ASSIST",
            TimelineEventType::Demo => "DEMO",
            TimelineEventType::Kickoff => "KICKOFF",
            TimelineEventType::BoostPickup => "BOOST_PICKUP",
            TimelineEventType::Touch => "TOUCH",
            TimelineEventType::Shot => "SHOT",
            TimelineEventType::Save => "SAVE",
            TimelineEventType::Challenge => "CHALLENGE",
        }
    }
}

/// Timeline entry for chronological event aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEvent {
    pub t: f64,
    pub frame: Option<usize>,
    #[serde(rename = "type")]
    pub event_type: TimelineEventType,
    pub player_id: Option<String>,
    pub team: Option<Team>,
    pub data: serde_json::Value,
}

/// All detected events for one replay, grouped by class.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventsBundle {
    pub goals: Vec<GoalEvent>,
    pub demos: Vec<DemoEvent>,
    pub kickoffs: Vec<KickoffEvent>,
    pub boost_pickups: Vec<BoostPickupEvent>,
    pub touches: Vec<TouchEvent>,
    pub challenges: Vec<ChallengeEvent>,
}
