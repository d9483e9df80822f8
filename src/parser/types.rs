//! Data types at the parser boundary.
//!
//! [`Header`] and the raw frame shapes are what an adapter hands to the
//! pipeline. Raw vectors and rotations are deliberately permissive: parser
//! backends disagree on whether a vector is a struct or a 3-tuple and whether
//! a rotation is Euler angles or a legacy xyz vector, so both shapes
//! deserialize here and the normalization layer resolves them once.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::math::{Rotation, Vec3};

/// Information about a player taken from the replay header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub name: String,
    /// 0 = BLUE, 1 = ORANGE.
    pub team: Option<u8>,
    #[serde(default)]
    pub score: i32,
    /// Platform tag -> platform id, e.g. {"steam": "7656..."}.
    #[serde(default)]
    pub platform_ids: BTreeMap<String, String>,
    /// Opaque camera settings blob, passed through to the report.
    #[serde(default)]
    pub camera: serde_json::Value,
    /// Opaque loadout blob, passed through to the report.
    #[serde(default)]
    pub loadout: serde_json::Value,
}

/// Goal info extracted from the header properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalHeader {
    pub frame: Option<i64>,
    pub player_name: Option<String>,
    pub player_team: Option<u8>,
}

/// Replay highlight tick mark.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub frame: Option<i64>,
    pub ball_name: Option<String>,
    pub car_name: Option<String>,
}

/// Header information extracted from a replay file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Header {
    pub playlist_id: Option<String>,
    pub map_name: Option<String>,
    #[serde(default)]
    pub team_size: u32,
    #[serde(default)]
    pub team0_score: u32,
    #[serde(default)]
    pub team1_score: u32,
    /// Match length in seconds.
    #[serde(default)]
    pub match_length: f64,
    pub engine_build: Option<String>,
    pub match_guid: Option<String>,
    #[serde(default)]
    pub overtime: bool,
    #[serde(default)]
    pub mutators: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub players: Vec<PlayerInfo>,
    #[serde(default)]
    pub goals: Vec<GoalHeader>,
    #[serde(default)]
    pub highlights: Vec<Highlight>,
    #[serde(default)]
    pub quality_warnings: Vec<String>,
}

/// A vector as a parser may deliver it: component struct or 3-tuple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawVec {
    Components { x: f32, y: f32, z: f32 },
    Triple([f32; 3]),
}

impl RawVec {
    pub fn resolve(self) -> Vec3 {
        match self {
            RawVec::Components { x, y, z } => Vec3::new(x, y, z),
            RawVec::Triple([x, y, z]) => Vec3::new(x, y, z),
        }
    }
}

impl From<Vec3> for RawVec {
    fn from(v: Vec3) -> Self {
        RawVec::Components {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

/// A rotation as a parser may deliver it: Euler record or legacy vector with
/// x=pitch, y=yaw, z=roll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRotation {
    Euler { pitch: f32, yaw: f32, roll: f32 },
    Legacy { x: f32, y: f32, z: f32 },
    Triple([f32; 3]),
}

impl RawRotation {
    pub fn resolve(self) -> Rotation {
        match self {
            RawRotation::Euler { pitch, yaw, roll } => Rotation::new(pitch, yaw, roll),
            RawRotation::Legacy { x, y, z } => Rotation::new(x, y, z),
            RawRotation::Triple([pitch, yaw, roll]) => Rotation::new(pitch, yaw, roll),
        }
    }
}

impl From<Rotation> for RawRotation {
    fn from(r: Rotation) -> Self {
        RawRotation::Euler {
            pitch: r.pitch,
            yaw: r.yaw,
            roll: r.roll,
        }
    }
}

/// Ball state in a raw frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBall {
    pub position: Option<RawVec>,
    pub velocity: Option<RawVec>,
    pub angular_velocity: Option<RawVec>,
}

/// Player state in a raw frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPlayer {
    pub player_id: Option<String>,
    pub team: Option<u8>,
    pub position: Option<RawVec>,
    pub velocity: Option<RawVec>,
    pub rotation: Option<RawRotation>,
    #[serde(alias = "boost")]
    pub boost_amount: Option<f32>,
    pub is_supersonic: Option<bool>,
    pub is_on_ground: Option<bool>,
    pub is_demolished: Option<bool>,
}

/// Boost pad replication event passed through from the parser when available.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPadEvent {
    pub pad_id: Option<i64>,
    /// "COLLECTED" or "RESPAWNED".
    #[serde(default)]
    pub status: String,
    pub player_id: Option<String>,
    pub player_index: Option<usize>,
    pub player_team: Option<u8>,
    pub timestamp: Option<f64>,
}

/// One raw network frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    #[serde(alias = "time")]
    pub timestamp: f64,
    pub ball: Option<RawBall>,
    #[serde(default)]
    pub players: Vec<RawPlayer>,
    #[serde(default)]
    pub boost_pad_events: Vec<RawPadEvent>,
}

/// Network frame data from an adapter, with diagnostics from the parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkFrames {
    pub frames: Vec<RawFrame>,
    #[serde(default)]
    pub sample_rate: f64,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_vec_accepts_both_shapes() {
        let from_struct: RawVec = serde_json::from_str(r#"{"x":1.0,"y":2.0,"z":3.0}"#).unwrap();
        let from_triple: RawVec = serde_json::from_str("[1.0,2.0,3.0]").unwrap();
        assert_eq!(from_struct.resolve(), from_triple.resolve());
    }

    #[test]
    fn raw_rotation_legacy_maps_to_euler() {
        let legacy: RawRotation = serde_json::from_str(r#"{"x":0.1,"y":0.2,"z":0.3}"#).unwrap();
        let rotation = legacy.resolve();
        assert_eq!(rotation.pitch, 0.1);
        assert_eq!(rotation.yaw, 0.2);
        assert_eq!(rotation.roll, 0.3);
    }

    #[test]
    fn raw_frame_accepts_time_alias() {
        let frame: RawFrame = serde_json::from_str(r#"{"time": 1.5}"#).unwrap();
        assert_eq!(frame.timestamp, 1.5);
    }
}
