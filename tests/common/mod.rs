#![allow(dead_code)]

use std::path::Path;

use replay_report::normalize::{BallFrame, Frame, PlayerFrame};
use replay_report::parser::types::{
    Header, NetworkFrames, PlayerInfo, RawBall, RawFrame, RawPlayer,
};
use replay_report::{ReplayParser, ReportResult, Rotation, Team, Vec3};

pub fn ball(position: Vec3, velocity: Vec3) -> BallFrame {
    BallFrame {
        position,
        velocity,
        angular_velocity: Vec3::ZERO,
    }
}

pub fn ball_at_kickoff() -> BallFrame {
    ball(Vec3::new(0.0, 0.0, 93.15), Vec3::ZERO)
}

pub fn player(id: &str, team: Team, position: Vec3, velocity: Vec3, boost: u8) -> PlayerFrame {
    PlayerFrame {
        player_id: id.to_string(),
        team,
        position,
        velocity,
        rotation: Rotation::default(),
        boost_amount: boost,
        is_supersonic: false,
        is_on_ground: true,
        is_demolished: false,
    }
}

pub fn frame(timestamp: f64, ball: BallFrame, mut players: Vec<PlayerFrame>) -> Frame {
    players.sort_by(|a, b| a.player_id.cmp(&b.player_id));
    Frame {
        timestamp,
        ball,
        players,
        boost_pad_events: Vec::new(),
    }
}

pub fn header_1v1(blue_name: &str, orange_name: &str) -> Header {
    Header {
        team_size: 1,
        players: vec![
            PlayerInfo {
                name: blue_name.to_string(),
                team: Some(0),
                ..PlayerInfo::default()
            },
            PlayerInfo {
                name: orange_name.to_string(),
                team: Some(1),
                ..PlayerInfo::default()
            },
        ],
        ..Header::default()
    }
}

/// Convert normalized frames back to the raw shapes a parser would emit, so
/// pipeline tests can drive the full normalize/detect/report path.
pub fn to_raw_frames(frames: &[Frame]) -> Vec<RawFrame> {
    frames
        .iter()
        .map(|f| RawFrame {
            timestamp: f.timestamp,
            ball: Some(RawBall {
                position: Some(f.ball.position.into()),
                velocity: Some(f.ball.velocity.into()),
                angular_velocity: Some(f.ball.angular_velocity.into()),
            }),
            players: f
                .players
                .iter()
                .map(|p| RawPlayer {
                    player_id: Some(p.player_id.clone()),
                    team: Some(p.team.index()),
                    position: Some(p.position.into()),
                    velocity: Some(p.velocity.into()),
                    rotation: Some(p.rotation.into()),
                    boost_amount: Some(f32::from(p.boost_amount)),
                    is_supersonic: Some(p.is_supersonic),
                    is_on_ground: Some(p.is_on_ground),
                    is_demolished: Some(p.is_demolished),
                })
                .collect(),
            boost_pad_events: Vec::new(),
        })
        .collect()
}

/// Parser returning canned header and frames, mirroring the mock adapters
/// used to seed the end-to-end scenarios.
pub struct MockParser {
    pub header: Header,
    pub frames: Option<Vec<RawFrame>>,
}

impl MockParser {
    pub fn header_only(header: Header) -> Self {
        Self {
            header,
            frames: None,
        }
    }

    pub fn with_frames(header: Header, frames: Vec<RawFrame>) -> Self {
        Self {
            header,
            frames: Some(frames),
        }
    }
}

impl ReplayParser for MockParser {
    fn parse_header(&self, _path: &Path) -> ReportResult<Header> {
        Ok(self.header.clone())
    }

    fn parse_network(&self, _path: &Path) -> ReportResult<Option<NetworkFrames>> {
        Ok(self.frames.clone().map(|frames| NetworkFrames {
            frames,
            sample_rate: 30.0,
            warnings: Vec::new(),
        }))
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    fn supports_network_parsing(&self) -> bool {
        self.frames.is_some()
    }
}
