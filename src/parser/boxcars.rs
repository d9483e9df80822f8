//! Replay adapter built on the [`boxcars`] decoder.
//!
//! The header path reads the property table; the network path replays the
//! actor graph frame by frame through an [`ActorStateModeler`], maintaining
//! the links between player, car, and car-component actors so each frame can
//! be flattened into a [`RawFrame`]. Boost amounts are only replicated on
//! change, so the modeler carries a derived value that decays while the
//! boost component is active.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use crate::error::{ReportError, ReportResult};
use crate::math::Vec3;
use crate::parser::types::{
    GoalHeader, Header, Highlight, NetworkFrames, PlayerInfo, RawBall, RawFrame, RawPlayer,
    RawRotation, RawVec,
};
use crate::parser::ReplayParser;

static BALL_TYPES: [&str; 5] = [
    "Archetypes.Ball.Ball_Default",
    "Archetypes.Ball.Ball_Basketball",
    "Archetypes.Ball.Ball_Puck",
    "Archetypes.Ball.CubeBall",
    "Archetypes.Ball.Ball_Breakout",
];

static BOOST_TYPE: &str = "Archetypes.CarComponents.CarComponent_Boost";
static CAR_TYPE: &str = "Archetypes.Car.Car_Default";
static PLAYER_TYPE: &str = "TAGame.Default__PRI_TA";

static BOOST_AMOUNT_KEY: &str = "TAGame.CarComponent_Boost_TA:ReplicatedBoostAmount";
static COMPONENT_ACTIVE_KEY: &str = "TAGame.CarComponent_TA:ReplicatedActive";
static DEMOLISH_KEY: &str = "TAGame.Car_TA:ReplicatedDemolish";
static DEMOLISH_GOAL_EXPLOSION_KEY: &str = "TAGame.Car_TA:ReplicatedDemolishGoalExplosion";
static PLAYER_REPLICATION_KEY: &str = "Engine.Pawn:PlayerReplicationInfo";
static RIGID_BODY_STATE_KEY: &str = "TAGame.RBActor_TA:ReplicatedRBState";
static TEAM_KEY: &str = "Engine.PlayerReplicationInfo:Team";
static UNIQUE_ID_KEY: &str = "Engine.PlayerReplicationInfo:UniqueId";
static VEHICLE_KEY: &str = "TAGame.CarComponent_TA:Vehicle";

/// Boost drain rate in replicated byte units (0-255) per second.
static BOOST_USED_PER_SECOND: f32 = 80.0 / 0.93;

static SUPERSONIC_SPEED: f32 = 2300.0;
static ON_GROUND_Z: f32 = 25.0;

#[derive(Debug, Clone)]
struct ActorState {
    attributes: HashMap<boxcars::ObjectId, boxcars::Attribute>,
    derived_boost: Option<(u8, f32)>,
    object_id: boxcars::ObjectId,
}

impl ActorState {
    fn new(new_actor: &boxcars::NewActor) -> Self {
        Self {
            attributes: HashMap::new(),
            derived_boost: None,
            object_id: new_actor.object_id,
        }
    }
}

#[derive(Default)]
struct ActorStateModeler {
    actor_states: HashMap<boxcars::ActorId, ActorState>,
    actor_ids_by_type: HashMap<boxcars::ObjectId, Vec<boxcars::ActorId>>,
}

impl ActorStateModeler {
    fn process_frame(&mut self, frame: &boxcars::Frame) {
        for actor_id in &frame.deleted_actors {
            if let Some(state) = self.actor_states.remove(actor_id) {
                if let Some(ids) = self.actor_ids_by_type.get_mut(&state.object_id) {
                    ids.retain(|id| id != actor_id);
                }
            }
        }
        for new_actor in &frame.new_actors {
            if !self.actor_states.contains_key(&new_actor.actor_id) {
                self.actor_states
                    .insert(new_actor.actor_id, ActorState::new(new_actor));
                self.actor_ids_by_type
                    .entry(new_actor.object_id)
                    .or_default()
                    .push(new_actor.actor_id);
            }
        }
        for update in &frame.updated_actors {
            if let Some(state) = self.actor_states.get_mut(&update.actor_id) {
                state
                    .attributes
                    .insert(update.object_id, update.attribute.clone());
            } else {
                log::debug!("update for unknown actor {:?}", update.actor_id);
            }
        }
    }
}

pub struct BoxcarsParser;

struct NetworkProcessor<'a> {
    replay: &'a boxcars::Replay,
    modeler: ActorStateModeler,
    object_id_to_name: HashMap<boxcars::ObjectId, String>,
    name_to_object_id: HashMap<String, boxcars::ObjectId>,
    ball_actor_id: Option<boxcars::ActorId>,
    player_to_actor_id: BTreeMap<String, boxcars::ActorId>,
    player_to_car: HashMap<boxcars::ActorId, boxcars::ActorId>,
    player_to_team: HashMap<boxcars::ActorId, boxcars::ActorId>,
    car_to_boost: HashMap<boxcars::ActorId, boxcars::ActorId>,
    demolished_cars: HashSet<boxcars::ActorId>,
    dropped_frames: usize,
}

impl<'a> NetworkProcessor<'a> {
    fn new(replay: &'a boxcars::Replay) -> Self {
        let mut object_id_to_name = HashMap::new();
        let mut name_to_object_id = HashMap::new();
        for (id, name) in replay.objects.iter().enumerate() {
            let object_id = boxcars::ObjectId(id as i32);
            object_id_to_name.insert(object_id, name.clone());
            name_to_object_id.insert(name.clone(), object_id);
        }
        Self {
            replay,
            modeler: ActorStateModeler::default(),
            object_id_to_name,
            name_to_object_id,
            ball_actor_id: None,
            player_to_actor_id: BTreeMap::new(),
            player_to_car: HashMap::new(),
            player_to_team: HashMap::new(),
            car_to_boost: HashMap::new(),
            demolished_cars: HashSet::new(),
            dropped_frames: 0,
        }
    }

    fn run(mut self) -> NetworkFrames {
        let Some(network) = self.replay.network_frames.as_ref() else {
            return NetworkFrames {
                frames: Vec::new(),
                sample_rate: 0.0,
                warnings: vec!["replay_has_no_network_frames".to_string()],
            };
        };

        let t0 = network.frames.first().map(|f| f.time).unwrap_or(0.0);
        let mut raw_frames = Vec::with_capacity(network.frames.len());

        for frame in &network.frames {
            self.modeler.process_frame(frame);
            self.update_mappings(frame);
            self.update_ball_id(frame);
            self.update_boost_amounts(frame);
            self.update_demolished(frame);

            match self.flatten_frame(frame, t0) {
                Some(raw) => raw_frames.push(raw),
                None => self.dropped_frames += 1,
            }
        }

        let mut warnings = Vec::new();
        if self.dropped_frames > 0 {
            warnings.push(format!(
                "dropped_{}_frames_without_game_state",
                self.dropped_frames
            ));
        }
        NetworkFrames {
            frames: raw_frames,
            sample_rate: 0.0,
            warnings,
        }
    }

    fn object_id_for(&self, name: &str) -> Option<boxcars::ObjectId> {
        self.name_to_object_id.get(name).copied()
    }

    fn actor_ids_by_type(&self, name: &str) -> &[boxcars::ActorId] {
        self.object_id_for(name)
            .and_then(|object_id| self.modeler.actor_ids_by_type.get(&object_id))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    fn actor_attribute(
        &self,
        actor_id: boxcars::ActorId,
        property: &str,
    ) -> Option<&boxcars::Attribute> {
        let object_id = self.object_id_for(property)?;
        self.modeler
            .actor_states
            .get(&actor_id)?
            .attributes
            .get(&object_id)
    }

    fn update_mappings(&mut self, frame: &boxcars::Frame) {
        for update in &frame.updated_actors {
            let Some(property) = self.object_id_to_name.get(&update.object_id) else {
                continue;
            };
            match property.as_str() {
                p if p == UNIQUE_ID_KEY => {
                    if self
                        .actor_ids_by_type(PLAYER_TYPE)
                        .contains(&update.actor_id)
                    {
                        if let boxcars::Attribute::UniqueId(unique_id) = &update.attribute {
                            let player_id = format_remote_id(&unique_id.remote_id);
                            self.player_to_actor_id.insert(player_id, update.actor_id);
                        }
                    }
                }
                p if p == TEAM_KEY => {
                    if let boxcars::Attribute::ActiveActor(team) = &update.attribute {
                        self.player_to_team.insert(update.actor_id, team.actor);
                    }
                }
                p if p == PLAYER_REPLICATION_KEY => {
                    if self.actor_ids_by_type(CAR_TYPE).contains(&update.actor_id) {
                        if let boxcars::Attribute::ActiveActor(player) = &update.attribute {
                            // A fresh car for the player clears any demolition.
                            if let Some(old_car) = self.player_to_car.insert(player.actor, update.actor_id)
                            {
                                if old_car != update.actor_id {
                                    self.demolished_cars.remove(&old_car);
                                }
                            }
                        }
                    }
                }
                p if p == VEHICLE_KEY => {
                    if self
                        .actor_ids_by_type(BOOST_TYPE)
                        .contains(&update.actor_id)
                    {
                        if let boxcars::Attribute::ActiveActor(car) = &update.attribute {
                            self.car_to_boost.insert(car.actor, update.actor_id);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn update_ball_id(&mut self, frame: &boxcars::Frame) {
        if let Some(actor_id) = self.ball_actor_id {
            if frame.deleted_actors.contains(&actor_id) {
                self.ball_actor_id = None;
            }
        }
        if self.ball_actor_id.is_none() {
            self.ball_actor_id = BALL_TYPES
                .iter()
                .flat_map(|ball_type| self.actor_ids_by_type(ball_type))
                .next()
                .copied();
        }
    }

    /// Boost amounts only replicate on change; between replications the
    /// active component drains at a fixed rate.
    fn update_boost_amounts(&mut self, frame: &boxcars::Frame) {
        let boost_actor_ids: Vec<boxcars::ActorId> = self.actor_ids_by_type(BOOST_TYPE).to_vec();
        let amount_object = self.object_id_for(BOOST_AMOUNT_KEY);
        let active_object = self.object_id_for(COMPONENT_ACTIVE_KEY);

        for actor_id in boost_actor_ids {
            let Some(state) = self.modeler.actor_states.get_mut(&actor_id) else {
                continue;
            };
            let replicated = amount_object
                .and_then(|object_id| state.attributes.get(&object_id))
                .and_then(|attribute| match attribute {
                    boxcars::Attribute::Byte(b) => Some(*b),
                    boxcars::Attribute::ReplicatedBoost(rb) => Some(rb.boost_amount),
                    _ => None,
                })
                .unwrap_or(0);
            let is_active = active_object
                .and_then(|object_id| state.attributes.get(&object_id))
                .and_then(|attribute| match attribute {
                    boxcars::Attribute::Byte(b) => Some(*b % 2 == 1),
                    _ => None,
                })
                .unwrap_or(false);

            let mut current = match state.derived_boost {
                Some((last_replicated, derived)) if last_replicated == replicated => derived,
                _ => f32::from(replicated),
            };
            if is_active {
                current -= frame.delta * BOOST_USED_PER_SECOND;
            }
            state.derived_boost = Some((replicated, current.max(0.0)));
        }
    }

    fn update_demolished(&mut self, frame: &boxcars::Frame) {
        for update in &frame.updated_actors {
            let Some(property) = self.object_id_to_name.get(&update.object_id) else {
                continue;
            };
            if property == DEMOLISH_KEY || property == DEMOLISH_GOAL_EXPLOSION_KEY {
                self.demolished_cars.insert(update.actor_id);
            }
        }
    }

    fn team_index_for_player(&self, player_actor: boxcars::ActorId) -> Option<u8> {
        let team_actor = self.player_to_team.get(&player_actor)?;
        let team_state = self.modeler.actor_states.get(team_actor)?;
        let name = self.object_id_to_name.get(&team_state.object_id)?;
        if name.ends_with('0') {
            Some(0)
        } else if name.ends_with('1') {
            Some(1)
        } else {
            None
        }
    }

    fn rigid_body(&self, actor_id: boxcars::ActorId) -> Option<&boxcars::RigidBody> {
        match self.actor_attribute(actor_id, RIGID_BODY_STATE_KEY)? {
            boxcars::Attribute::RigidBody(rb) => Some(rb),
            _ => None,
        }
    }

    fn boost_percent(&self, car_actor: boxcars::ActorId) -> Option<f32> {
        let boost_actor = self.car_to_boost.get(&car_actor)?;
        let state = self.modeler.actor_states.get(boost_actor)?;
        let (_, derived) = state.derived_boost?;
        Some((derived / 255.0 * 100.0).clamp(0.0, 100.0))
    }

    fn flatten_frame(&self, frame: &boxcars::Frame, t0: f32) -> Option<RawFrame> {
        let ball = self
            .ball_actor_id
            .and_then(|actor_id| self.rigid_body(actor_id))
            .filter(|rb| !rb.sleeping)
            .map(|rb| RawBall {
                position: Some(vector_to_raw(&rb.location)),
                velocity: rb.linear_velocity.as_ref().map(vector_to_raw),
                angular_velocity: rb.angular_velocity.as_ref().map(vector_to_raw),
            });

        let mut players = Vec::with_capacity(self.player_to_actor_id.len());
        for (player_id, player_actor) in &self.player_to_actor_id {
            let Some(car_actor) = self.player_to_car.get(player_actor) else {
                continue;
            };
            let Some(rb) = self.rigid_body(*car_actor) else {
                continue;
            };
            let velocity = rb
                .linear_velocity
                .map(|v| Vec3::new(v.x, v.y, v.z))
                .unwrap_or(Vec3::ZERO);
            players.push(RawPlayer {
                player_id: Some(player_id.clone()),
                team: self.team_index_for_player(*player_actor),
                position: Some(vector_to_raw(&rb.location)),
                velocity: Some(velocity.into()),
                rotation: Some(quaternion_to_raw(&rb.rotation)),
                boost_amount: self.boost_percent(*car_actor),
                is_supersonic: Some(velocity.magnitude() >= SUPERSONIC_SPEED),
                is_on_ground: Some(rb.location.z < ON_GROUND_Z),
                is_demolished: Some(self.demolished_cars.contains(car_actor)),
            });
        }

        if ball.is_none() && players.is_empty() {
            return None;
        }

        Some(RawFrame {
            timestamp: f64::from(frame.time - t0),
            ball,
            players,
            boost_pad_events: Vec::new(),
        })
    }
}

fn vector_to_raw(v: &boxcars::Vector3f) -> RawVec {
    Vec3::new(v.x, v.y, v.z).into()
}

fn quaternion_to_raw(q: &boxcars::Quaternion) -> RawRotation {
    let quat = glam::Quat::from_xyzw(q.x, q.y, q.z, q.w);
    let (yaw, pitch, roll) = quat.to_euler(glam::EulerRot::ZYX);
    RawRotation::Euler { pitch, yaw, roll }
}

fn format_remote_id(remote_id: &boxcars::RemoteId) -> String {
    match remote_id {
        boxcars::RemoteId::Steam(id) => format!("steam:{id}"),
        boxcars::RemoteId::Epic(id) => format!("epic:{id}"),
        boxcars::RemoteId::Xbox(id) => format!("xbox:{id}"),
        boxcars::RemoteId::PlayStation(ps4) => format!("psn:{}", ps4.online_id),
        boxcars::RemoteId::PsyNet(psy) => format!("psn:{}", psy.online_id),
        boxcars::RemoteId::Switch(switch) => format!("switch:{}", switch.online_id),
        boxcars::RemoteId::SplitScreen(id) => format!("splitscreen:{id}"),
        other => format!("remote:{other:?}"),
    }
}

fn platform_tag(platform: &str) -> Option<&'static str> {
    match platform {
        "OnlinePlatform_Steam" => Some("steam"),
        "OnlinePlatform_Epic" => Some("epic"),
        "OnlinePlatform_PS4" => Some("psn"),
        "OnlinePlatform_Dingo" => Some("xbox"),
        "OnlinePlatform_Switch" => Some("switch"),
        _ => None,
    }
}

fn prop<'p>(props: &'p [(String, boxcars::HeaderProp)], name: &str) -> Option<&'p boxcars::HeaderProp> {
    props
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
}

fn prop_i64(props: &[(String, boxcars::HeaderProp)], name: &str) -> Option<i64> {
    match prop(props, name)? {
        boxcars::HeaderProp::Int(v) => Some(i64::from(*v)),
        boxcars::HeaderProp::QWord(v) => Some(*v as i64),
        _ => None,
    }
}

fn prop_f64(props: &[(String, boxcars::HeaderProp)], name: &str) -> Option<f64> {
    match prop(props, name)? {
        boxcars::HeaderProp::Float(v) => Some(f64::from(*v)),
        boxcars::HeaderProp::Int(v) => Some(f64::from(*v)),
        _ => None,
    }
}

fn prop_string(props: &[(String, boxcars::HeaderProp)], name: &str) -> Option<String> {
    match prop(props, name)? {
        boxcars::HeaderProp::Str(v) => Some(v.clone()),
        boxcars::HeaderProp::Name(v) => Some(v.clone()),
        _ => None,
    }
}

fn header_players(props: &[(String, boxcars::HeaderProp)]) -> Vec<PlayerInfo> {
    let Some(boxcars::HeaderProp::Array(rows)) = prop(props, "PlayerStats") else {
        return Vec::new();
    };

    rows.iter()
        .map(|row| {
            let mut platform_ids = BTreeMap::new();
            let online_id = prop_i64(row, "OnlineID").unwrap_or(0);
            if online_id != 0 {
                let tag = match prop(row, "Platform") {
                    Some(boxcars::HeaderProp::Byte {
                        value: Some(platform),
                        ..
                    }) => platform_tag(platform),
                    _ => None,
                };
                if let Some(tag) = tag {
                    platform_ids.insert(tag.to_string(), online_id.to_string());
                }
            }
            PlayerInfo {
                name: prop_string(row, "Name").unwrap_or_default(),
                team: prop_i64(row, "Team").map(|t| t as u8),
                score: prop_i64(row, "Score").unwrap_or(0) as i32,
                platform_ids,
                camera: serde_json::Value::Null,
                loadout: serde_json::Value::Null,
            }
        })
        .collect()
}

fn header_goals(props: &[(String, boxcars::HeaderProp)]) -> Vec<GoalHeader> {
    let Some(boxcars::HeaderProp::Array(rows)) = prop(props, "Goals") else {
        return Vec::new();
    };
    rows.iter()
        .map(|row| GoalHeader {
            frame: prop_i64(row, "frame"),
            player_name: prop_string(row, "PlayerName"),
            player_team: prop_i64(row, "PlayerTeam").map(|t| t as u8),
        })
        .collect()
}

fn header_highlights(props: &[(String, boxcars::HeaderProp)]) -> Vec<Highlight> {
    let Some(boxcars::HeaderProp::Array(rows)) = prop(props, "HighLights") else {
        return Vec::new();
    };
    rows.iter()
        .map(|row| Highlight {
            frame: prop_i64(row, "frame"),
            ball_name: prop_string(row, "BallName"),
            car_name: prop_string(row, "CarName"),
        })
        .collect()
}

impl BoxcarsParser {
    fn parse_replay(&self, path: &Path, network: bool) -> ReportResult<boxcars::Replay> {
        let data = std::fs::read(path)?;
        let mut builder = boxcars::ParserBuilder::new(&data).on_error_check_crc();
        builder = if network {
            builder.must_parse_network_data()
        } else {
            builder.never_parse_network_data()
        };
        builder.parse().map_err(|e| {
            if network {
                ReportError::network_parse(e.to_string())
            } else {
                ReportError::header_parse(e.to_string())
            }
        })
    }

    fn header_from_replay(&self, replay: &boxcars::Replay) -> Header {
        let props = &replay.properties;
        let num_frames = prop_i64(props, "NumFrames").unwrap_or(0);
        let record_fps = prop_f64(props, "RecordFPS").unwrap_or(30.0);
        let match_length = if record_fps > 0.0 {
            num_frames as f64 / record_fps
        } else {
            0.0
        };

        Header {
            playlist_id: prop_string(props, "MatchType"),
            map_name: prop_string(props, "MapName"),
            team_size: prop_i64(props, "TeamSize").unwrap_or(0) as u32,
            team0_score: prop_i64(props, "Team0Score").unwrap_or(0) as u32,
            team1_score: prop_i64(props, "Team1Score").unwrap_or(0) as u32,
            match_length,
            engine_build: prop_string(props, "BuildVersion"),
            match_guid: prop_string(props, "MatchGuid"),
            overtime: false,
            mutators: BTreeMap::new(),
            players: header_players(props),
            goals: header_goals(props),
            highlights: header_highlights(props),
            quality_warnings: Vec::new(),
        }
    }
}

impl ReplayParser for BoxcarsParser {
    fn parse_header(&self, path: &Path) -> ReportResult<Header> {
        let replay = self.parse_replay(path, false)?;
        Ok(self.header_from_replay(&replay))
    }

    fn parse_network(&self, path: &Path) -> ReportResult<Option<NetworkFrames>> {
        match self.parse_replay(path, true) {
            Ok(replay) => Ok(Some(NetworkProcessor::new(&replay).run())),
            Err(error) => {
                log::warn!("network parse failed: {error}");
                Ok(Some(NetworkFrames {
                    frames: Vec::new(),
                    sample_rate: 0.0,
                    warnings: vec![format!("network_parse_failed: {error}")],
                }))
            }
        }
    }

    fn name(&self) -> &'static str {
        "boxcars"
    }

    fn supports_network_parsing(&self) -> bool {
        true
    }
}
