//! Normalization layer: parser output -> canonical frames.
//!
//! Everything downstream of this module works with [`Frame`] values in the
//! standard coordinate system, canonical player ids, and a timeline sorted by
//! timestamp. Frames that fail field coercion are skipped, never fatal; an
//! empty stream yields a single sentinel frame at t=0.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::constants::{BACK_WALL_Y, BALL_SPAWN_Z, CAR_REST_Z, CEILING_Z, SIDE_WALL_X};
use crate::identity::{self, PlayerIdentity, Team};
use crate::math::{Rotation, Vec3};
use crate::parser::types::{Header, RawFrame, RawPadEvent, RawVec};

pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// Ball state at a specific frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BallFrame {
    pub position: Vec3,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl BallFrame {
    pub fn at_kickoff() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, BALL_SPAWN_Z),
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }
}

/// Player state at a specific frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerFrame {
    pub player_id: String,
    pub team: Team,
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Rotation,
    /// Clamped to 0..=100.
    pub boost_amount: u8,
    pub is_supersonic: bool,
    pub is_on_ground: bool,
    pub is_demolished: bool,
}

/// Status of a pad replication event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PadEventStatus {
    Collected,
    Respawned,
}

/// Boost pad replication event resolved to canonical ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PadEvent {
    pub pad_id: i64,
    pub status: PadEventStatus,
    pub player_id: Option<String>,
    pub player_team: Option<Team>,
    pub timestamp: Option<f64>,
}

/// Canonical frame: all game state at one point in time. Players are sorted
/// by canonical id for stable iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub timestamp: f64,
    pub ball: BallFrame,
    pub players: Vec<PlayerFrame>,
    pub boost_pad_events: Vec<PadEvent>,
}

impl Frame {
    pub fn sentinel() -> Self {
        Self {
            timestamp: 0.0,
            ball: BallFrame::at_kickoff(),
            players: Vec::new(),
            boost_pad_events: Vec::new(),
        }
    }

    pub fn player(&self, player_id: &str) -> Option<&PlayerFrame> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    pub fn team_players(&self, team: Team) -> impl Iterator<Item = &PlayerFrame> {
        self.players.iter().filter(move |p| p.team == team)
    }
}

/// The normalization output: canonical frames plus the identity table used to
/// resolve them.
#[derive(Debug, Clone)]
pub struct NormalizedReplay {
    pub frames: Vec<Frame>,
    pub identities: Vec<PlayerIdentity>,
    pub alias_lookup: BTreeMap<String, String>,
    pub frame_rate: f64,
    pub dropped_frames: usize,
}

/// Measure the actual frame rate from timestamps: 1 / median positive delta,
/// clamped into [1, 240]. Falls back to 30 Hz when unmeasurable.
pub fn measure_frame_rate(frames: &[Frame]) -> f64 {
    if frames.len() < 2 {
        return DEFAULT_FRAME_RATE;
    }

    let mut deltas: Vec<f64> = frames
        .windows(2)
        .map(|pair| pair[1].timestamp - pair[0].timestamp)
        .filter(|delta| *delta > 0.0)
        .collect();
    if deltas.is_empty() {
        return DEFAULT_FRAME_RATE;
    }

    deltas.sort_by(|a, b| a.partial_cmp(b).expect("frame deltas are finite"));
    let mid = deltas.len() / 2;
    let median = if deltas.len() % 2 == 0 {
        (deltas[mid - 1] + deltas[mid]) / 2.0
    } else {
        deltas[mid]
    };
    if median <= 0.0 {
        return DEFAULT_FRAME_RATE;
    }
    (1.0 / median).clamp(1.0, 240.0)
}

/// Transform a raw vector into field coordinates, clamping each axis into the
/// pitch bounds extended by 10% to absorb parser jitter.
pub fn to_field_coords(vec: Option<RawVec>) -> Vec3 {
    let Some(raw) = vec else {
        return Vec3::ZERO;
    };
    let v = raw.resolve();
    if !v.x.is_finite() || !v.y.is_finite() || !v.z.is_finite() {
        return Vec3::ZERO;
    }
    Vec3::new(
        v.x.clamp(-SIDE_WALL_X * 1.1, SIDE_WALL_X * 1.1),
        v.y.clamp(-BACK_WALL_Y * 1.1, BACK_WALL_Y * 1.1),
        v.z.clamp(-100.0, CEILING_Z * 2.0),
    )
}

/// Build the canonical frame list from header and raw frames.
pub fn build_frames(header: &Header, raw_frames: &[RawFrame]) -> NormalizedReplay {
    let identities = identity::build_player_identities(&header.players);
    let mut alias_lookup = identity::build_alias_lookup(&identities);

    augment_aliases_from_frames(raw_frames, &identities, &mut alias_lookup);

    let team_by_id: BTreeMap<&str, Team> = identities
        .iter()
        .map(|identity| (identity.canonical_id.as_str(), identity.team))
        .collect();

    let mut frames = Vec::with_capacity(raw_frames.len());
    let mut dropped = 0usize;

    for raw in raw_frames {
        match assemble_frame(raw, &alias_lookup, &team_by_id) {
            Some(frame) => frames.push(frame),
            None => dropped += 1,
        }
    }

    frames.sort_by(|a, b| {
        a.timestamp
            .partial_cmp(&b.timestamp)
            .expect("timestamps are finite")
    });

    if frames.is_empty() {
        frames.push(Frame::sentinel());
    }

    let frame_rate = measure_frame_rate(&frames);
    NormalizedReplay {
        frames,
        identities,
        alias_lookup,
        frame_rate,
        dropped_frames: dropped,
    }
}

/// Sample the first few frames for player ids the header does not know about
/// and map them to header identities positionally.
fn augment_aliases_from_frames(
    raw_frames: &[RawFrame],
    identities: &[PlayerIdentity],
    alias_lookup: &mut BTreeMap<String, String>,
) {
    let mut frame_ids: Vec<String> = Vec::new();
    for raw in raw_frames.iter().take(10) {
        for player in &raw.players {
            if let Some(player_id) = &player.player_id {
                if !frame_ids.contains(player_id) {
                    frame_ids.push(player_id.clone());
                }
            }
        }
    }
    frame_ids.sort();

    for (index, frame_id) in frame_ids.iter().enumerate() {
        if alias_lookup.contains_key(frame_id) {
            continue;
        }
        if let Some(identity) = identities.get(index) {
            log::debug!(
                "aliasing frame player {:?} to header identity {:?}",
                frame_id,
                identity.canonical_id
            );
            alias_lookup.insert(frame_id.clone(), identity.canonical_id.clone());
        }
    }
}

fn assemble_frame(
    raw: &RawFrame,
    alias_lookup: &BTreeMap<String, String>,
    team_by_id: &BTreeMap<&str, Team>,
) -> Option<Frame> {
    if !raw.timestamp.is_finite() {
        return None;
    }

    let ball = match &raw.ball {
        Some(raw_ball) => BallFrame {
            position: if raw_ball.position.is_some() {
                to_field_coords(raw_ball.position)
            } else {
                Vec3::new(0.0, 0.0, BALL_SPAWN_Z)
            },
            velocity: to_field_coords(raw_ball.velocity),
            angular_velocity: to_field_coords(raw_ball.angular_velocity),
        },
        None => BallFrame::at_kickoff(),
    };

    let mut players = Vec::with_capacity(raw.players.len());
    for raw_player in &raw.players {
        let Some(raw_id) = &raw_player.player_id else {
            continue;
        };
        let player_id = alias_lookup.get(raw_id).cloned().unwrap_or_else(|| {
            log::debug!("unaliased frame player id {:?}", raw_id);
            raw_id.clone()
        });

        let team = match raw_player.team {
            Some(index) => Team::from_index(index),
            None => team_by_id.get(player_id.as_str()).copied().unwrap_or(Team::Blue),
        };

        let boost = raw_player
            .boost_amount
            .filter(|b| b.is_finite())
            .map(|b| b.clamp(0.0, 100.0).round() as u8)
            .unwrap_or(33);

        players.push(PlayerFrame {
            player_id,
            team,
            position: if raw_player.position.is_some() {
                to_field_coords(raw_player.position)
            } else {
                Vec3::new(0.0, 0.0, CAR_REST_Z)
            },
            velocity: to_field_coords(raw_player.velocity),
            rotation: raw_player
                .rotation
                .map(|r| r.resolve())
                .unwrap_or_default(),
            boost_amount: boost,
            is_supersonic: raw_player.is_supersonic.unwrap_or(false),
            is_on_ground: raw_player.is_on_ground.unwrap_or(true),
            is_demolished: raw_player.is_demolished.unwrap_or(false),
        });
    }
    players.sort_by(|a, b| a.player_id.cmp(&b.player_id));

    let boost_pad_events = raw
        .boost_pad_events
        .iter()
        .filter_map(|event| resolve_pad_event(event, alias_lookup))
        .collect();

    Some(Frame {
        timestamp: raw.timestamp,
        ball,
        players,
        boost_pad_events,
    })
}

fn resolve_pad_event(
    raw: &RawPadEvent,
    alias_lookup: &BTreeMap<String, String>,
) -> Option<PadEvent> {
    let status = match raw.status.to_uppercase().as_str() {
        "COLLECTED" => PadEventStatus::Collected,
        "RESPAWNED" => PadEventStatus::Respawned,
        other => {
            log::debug!("unknown pad event status {:?}", other);
            return None;
        }
    };

    let player_id = raw
        .player_id
        .clone()
        .or_else(|| raw.player_index.map(|index| format!("player_{index}")))
        .map(|id| alias_lookup.get(&id).cloned().unwrap_or(id));

    Some(PadEvent {
        pad_id: raw.pad_id?,
        status,
        player_id,
        player_team: raw.player_team.map(Team::from_index),
        timestamp: raw.timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::types::{PlayerInfo, RawBall, RawPlayer};

    fn raw_frame(t: f64, ball_y: f32) -> RawFrame {
        RawFrame {
            timestamp: t,
            ball: Some(RawBall {
                position: Some(Vec3::new(0.0, ball_y, 93.15).into()),
                velocity: None,
                angular_velocity: None,
            }),
            players: Vec::new(),
            boost_pad_events: Vec::new(),
        }
    }

    #[test]
    fn frame_rate_uses_median_delta() {
        let header = Header::default();
        let raws: Vec<RawFrame> = (0..10).map(|i| raw_frame(i as f64 / 30.0, 0.0)).collect();
        let normalized = build_frames(&header, &raws);
        assert!((normalized.frame_rate - 30.0).abs() < 0.5);
    }

    #[test]
    fn empty_stream_yields_sentinel() {
        let normalized = build_frames(&Header::default(), &[]);
        assert_eq!(normalized.frames.len(), 1);
        assert_eq!(normalized.frames[0].timestamp, 0.0);
        assert_eq!(normalized.frames[0].ball.position.z, BALL_SPAWN_Z);
        assert!(normalized.frames[0].players.is_empty());
    }

    #[test]
    fn positions_clamp_into_extended_bounds() {
        let clamped = to_field_coords(Some(Vec3::new(9999.0, -9999.0, 9000.0).into()));
        assert_eq!(clamped.x, SIDE_WALL_X * 1.1);
        assert_eq!(clamped.y, -BACK_WALL_Y * 1.1);
        assert_eq!(clamped.z, CEILING_Z * 2.0);
    }

    #[test]
    fn frame_player_ids_resolve_through_aliases() {
        let header = Header {
            players: vec![PlayerInfo {
                name: "Solo".to_string(),
                team: Some(1),
                platform_ids: [("steam".to_string(), "42".to_string())].into(),
                ..PlayerInfo::default()
            }],
            ..Header::default()
        };
        let mut raw = raw_frame(0.0, 0.0);
        raw.players.push(RawPlayer {
            player_id: Some("car_7".to_string()),
            boost_amount: Some(140.0),
            ..RawPlayer::default()
        });
        let normalized = build_frames(&header, &[raw]);
        let player = &normalized.frames[0].players[0];
        assert_eq!(player.player_id, "steam:42");
        assert_eq!(player.team, Team::Orange);
        assert_eq!(player.boost_amount, 100);
    }
}
