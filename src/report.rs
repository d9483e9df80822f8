//! Report assembly: the full pipeline from a replay path to the final
//! schema-validated JSON document.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::analysis::aggregate_analysis;
use crate::constants::{BACK_WALL_Y, CEILING_Z, SIDE_WALL_X};
use crate::events::{build_timeline, detect_all, EventsBundle};
use crate::normalize::build_frames;
use crate::parser::types::Header;
use crate::parser::ReplayParser;
use crate::schema::{validate_report, SCHEMA_VERSION};

/// Options for report generation.
#[derive(Debug, Clone, Default, derive_new::new)]
pub struct ReportOptions {
    /// Timestamp stamped into `generated_at_utc`. Defaults to now; pass a
    /// fixed value to make repeated runs byte-identical.
    pub generated_at: Option<DateTime<Utc>>,
    /// Skip network parsing even when the adapter supports it.
    #[new(default)]
    pub header_only: bool,
}

/// The `{"error": ..., "details": ...}` failure shape.
pub fn error_document(details: impl std::fmt::Display) -> Value {
    json!({
        "error": "unreadable_replay_file",
        "details": details.to_string(),
    })
}

/// SHA-256 hex digest of the replay bytes, used as the replay id.
pub fn replay_id_for_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Generate a schema-conformant replay report.
///
/// Returns either the success document or the error shape; this function
/// never panics on malformed replays.
pub fn generate_report(
    path: &Path,
    parser: &dyn ReplayParser,
    options: &ReportOptions,
) -> Value {
    let replay_id = std::fs::read(path)
        .map(|bytes| replay_id_for_bytes(&bytes))
        .unwrap_or_else(|_| "unknown".to_string());

    let mut warnings: Vec<String> = Vec::new();

    let (header, parsed_header) = match parser.parse_header(path) {
        Ok(header) => (header, true),
        Err(error) => {
            log::warn!("header parse failed, continuing header-only: {error}");
            warnings.push("parsed_with_fallback_header_only".to_string());
            (Header::default(), false)
        }
    };
    warnings.extend(header.quality_warnings.iter().cloned());

    let raw_frames = if options.header_only || !parser.supports_network_parsing() {
        None
    } else {
        match parser.parse_network(path) {
            Ok(Some(network)) => {
                warnings.extend(network.warnings.iter().cloned());
                if network.frames.is_empty() {
                    None
                } else {
                    Some(network.frames)
                }
            }
            Ok(None) => None,
            Err(error) => {
                log::warn!("network parse failed: {error}");
                None
            }
        }
    };

    let parsed_network_data = raw_frames.is_some();
    if !parsed_network_data {
        warnings.push("network_data_unparsed_fallback_header_only".to_string());
    }

    let normalized = build_frames(&header, raw_frames.as_deref().unwrap_or(&[]));
    if normalized.dropped_frames > 0 {
        warnings.push(format!(
            "dropped_{}_malformed_frames",
            normalized.dropped_frames
        ));
    }

    // In header-only mode the sentinel frame carries no game state; event
    // detection only runs over real network frames.
    let events = if parsed_network_data {
        detect_all(&normalized.frames, Some(&header))
    } else {
        EventsBundle::default()
    };
    let timeline = build_timeline(&events);

    let analysis = aggregate_analysis(&normalized.frames, &events, Some(&header));
    warnings.extend(analysis.warnings.iter().cloned());

    let generated_at = options
        .generated_at
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    let metadata = json!({
        "engine_build": header.engine_build.clone().unwrap_or_else(|| "unknown".to_string()),
        "playlist": header.playlist_id.clone().unwrap_or_else(|| "UNKNOWN".to_string()),
        "map": header.map_name.clone().unwrap_or_else(|| "unknown".to_string()),
        "team_size": header.team_size.max(1),
        "overtime": header.overtime,
        "mutators": header.mutators,
        "match_guid": header.match_guid.clone().unwrap_or_else(|| "unknown".to_string()),
        "duration_seconds": header.match_length,
        "recorded_frame_hz": normalized.frame_rate,
        "total_frames": normalized.frames.len().max(1),
        "coordinate_reference": {
            "side_wall_x": SIDE_WALL_X,
            "back_wall_y": BACK_WALL_Y,
            "ceiling_z": CEILING_Z,
        },
    });

    let quality = json!({
        "parser": {
            "name": parser.name(),
            "version": env!("CARGO_PKG_VERSION"),
            "backend_chain": parser.backend_chain(),
            "parsed_header": parsed_header,
            "parsed_network_data": parsed_network_data,
            "crc_checked": false,
        },
        "warnings": warnings,
    });

    let mut blue_players: Vec<&str> = Vec::new();
    let mut orange_players: Vec<&str> = Vec::new();
    let mut players_block = Vec::new();
    for identity in &normalized.identities {
        match identity.team {
            crate::identity::Team::Blue => blue_players.push(&identity.canonical_id),
            crate::identity::Team::Orange => orange_players.push(&identity.canonical_id),
        }
        let header_player = header.players.get(identity.header_index);
        players_block.push(json!({
            "player_id": identity.canonical_id,
            "display_name": identity.display_name,
            "team": identity.team,
            "platform_ids": identity.platform_ids,
            "camera": header_player.map(|p| p.camera.clone()).unwrap_or(Value::Null),
            "loadout": header_player.map(|p| p.loadout.clone()).unwrap_or(Value::Null),
        }));
    }

    let teams = json!({
        "blue": {
            "name": "BLUE",
            "score": header.team0_score,
            "players": blue_players,
        },
        "orange": {
            "name": "ORANGE",
            "score": header.team1_score,
            "players": orange_players,
        },
    });

    let events_block = json!({
        "timeline": timeline,
        "goals": events.goals,
        "demos": events.demos,
        "kickoffs": events.kickoffs,
        "boost_pickups": events.boost_pickups,
        "touches": events.touches,
        "challenges": events.challenges,
    });

    let analysis_block = json!({
        "per_team": analysis.per_team,
        "per_player": analysis.per_player,
    });

    let document = json!({
        "replay_id": replay_id,
        "source_file": path.display().to_string(),
        "schema_version": SCHEMA_VERSION,
        "generated_at_utc": generated_at,
        "metadata": metadata,
        "quality": quality,
        "teams": teams,
        "players": players_block,
        "events": events_block,
        "analysis": analysis_block,
    });

    match validate_report(&document) {
        Ok(()) => document,
        Err(error) => {
            log::error!("assembled report failed validation: {error}");
            error_document(error)
        }
    }
}
