//! Structural validation of the assembled report document.
//!
//! The report is built from typed structs, so shape errors indicate a code
//! bug; validation is the last line of defense before the document leaves
//! the pipeline, and the only stage allowed to fail the whole invocation.

use serde_json::Value;

use crate::error::{ReportError, ReportResult};

pub const SCHEMA_VERSION: &str = "1.0.0";

const REQUIRED_TOP_LEVEL: [&str; 9] = [
    "replay_id",
    "source_file",
    "schema_version",
    "generated_at_utc",
    "metadata",
    "quality",
    "teams",
    "players",
    "events",
];

const REQUIRED_METADATA: [&str; 10] = [
    "engine_build",
    "playlist",
    "map",
    "team_size",
    "overtime",
    "mutators",
    "match_guid",
    "duration_seconds",
    "recorded_frame_hz",
    "total_frames",
];

const TIMELINE_TYPES: [&str; 9] = [
    "GOAL",
    "ASSIST",
    "DEMO",
    "KICKOFF",
    "BOOST_PICKUP",
    "TOUCH",
    "SHOT",
    "SAVE",
    "CHALLENGE",
];

/// Validate a report document. Accepts either the success shape or the
/// `{"error": ..., "details": ...}` error shape.
pub fn validate_report(document: &Value) -> ReportResult<()> {
    let Some(object) = document.as_object() else {
        return Err(ReportError::schema_validation("report must be a JSON object"));
    };

    if object.contains_key("error") {
        if !object.contains_key("details") {
            return Err(ReportError::schema_validation(
                "error report is missing 'details'",
            ));
        }
        return Ok(());
    }

    for field in REQUIRED_TOP_LEVEL {
        if !object.contains_key(field) {
            return Err(ReportError::schema_validation(format!(
                "missing required field {field:?}"
            )));
        }
    }
    if !object.contains_key("analysis") {
        return Err(ReportError::schema_validation("missing required field \"analysis\""));
    }

    validate_schema_version(object.get("schema_version"))?;

    let metadata = object
        .get("metadata")
        .and_then(Value::as_object)
        .ok_or_else(|| ReportError::schema_validation("metadata must be an object"))?;
    for field in REQUIRED_METADATA {
        if !metadata.contains_key(field) {
            return Err(ReportError::schema_validation(format!(
                "metadata missing required field {field:?}"
            )));
        }
    }

    let teams = object
        .get("teams")
        .and_then(Value::as_object)
        .ok_or_else(|| ReportError::schema_validation("teams must be an object"))?;
    for color in ["blue", "orange"] {
        let team = teams
            .get(color)
            .and_then(Value::as_object)
            .ok_or_else(|| {
                ReportError::schema_validation(format!("teams.{color} must be an object"))
            })?;
        let score = team.get("score").and_then(Value::as_i64).ok_or_else(|| {
            ReportError::schema_validation(format!("teams.{color}.score must be an integer"))
        })?;
        if score < 0 {
            return Err(ReportError::schema_validation(format!(
                "teams.{color}.score must be non-negative"
            )));
        }
    }

    validate_events(object.get("events"), teams)?;
    Ok(())
}

fn validate_schema_version(version: Option<&Value>) -> ReportResult<()> {
    let Some(version) = version.and_then(Value::as_str) else {
        return Err(ReportError::schema_validation("schema_version must be a string"));
    };
    let parts: Vec<&str> = version.split('.').collect();
    let valid = parts.len() == 3
        && parts.iter().all(|p| p.parse::<u64>().is_ok())
        && parts[0] == "1";
    if !valid {
        return Err(ReportError::schema_validation(format!(
            "schema_version {version:?} does not match major version 1 semver"
        )));
    }
    Ok(())
}

fn validate_events(
    events: Option<&Value>,
    teams: &serde_json::Map<String, Value>,
) -> ReportResult<()> {
    let Some(events) = events.and_then(Value::as_object) else {
        return Err(ReportError::schema_validation("events must be an object"));
    };

    let timeline = events
        .get("timeline")
        .and_then(Value::as_array)
        .ok_or_else(|| ReportError::schema_validation("events.timeline must be an array"))?;

    let mut prev: Option<(f64, String)> = None;
    for entry in timeline {
        let t = entry.get("t").and_then(Value::as_f64).ok_or_else(|| {
            ReportError::schema_validation("timeline entries must carry a numeric 't'")
        })?;
        let event_type = entry
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ReportError::schema_validation("timeline entries must carry 'type'"))?;
        if !TIMELINE_TYPES.contains(&event_type) {
            return Err(ReportError::schema_validation(format!(
                "unknown timeline event type {event_type:?}"
            )));
        }
        if let Some((prev_t, prev_type)) = &prev {
            let ordered = t > *prev_t
                || (t == *prev_t && event_type >= prev_type.as_str());
            if !ordered {
                return Err(ReportError::schema_validation(
                    "timeline is not sorted by (t, type)",
                ));
            }
        }
        prev = Some((t, event_type.to_string()));
    }

    // Goal totals must reconcile with the team scores whenever goal events
    // were actually detected (header-only reports carry scores but no
    // events).
    let goals = events
        .get("goals")
        .and_then(Value::as_array)
        .ok_or_else(|| ReportError::schema_validation("events.goals must be an array"))?;
    if !goals.is_empty() {
        let mut blue_goals = 0i64;
        let mut orange_goals = 0i64;
        for goal in goals {
            match goal.get("team").and_then(Value::as_str) {
                Some("BLUE") => blue_goals += 1,
                Some("ORANGE") => orange_goals += 1,
                other => {
                    return Err(ReportError::schema_validation(format!(
                        "goal event has invalid team {other:?}"
                    )));
                }
            }
        }
        let blue_score = teams
            .get("blue")
            .and_then(|t| t.get("score"))
            .and_then(Value::as_i64)
            .unwrap_or(0);
        let orange_score = teams
            .get("orange")
            .and_then(|t| t.get("score"))
            .and_then(Value::as_i64)
            .unwrap_or(0);
        if blue_goals != blue_score || orange_goals != orange_score {
            return Err(ReportError::schema_validation(format!(
                "goal events ({blue_goals}/{orange_goals}) disagree with team scores \
                 ({blue_score}/{orange_score})"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_shape_is_valid() {
        let doc = json!({"error": "unreadable_replay_file", "details": "truncated"});
        assert!(validate_report(&doc).is_ok());
    }

    #[test]
    fn missing_top_level_field_is_rejected() {
        let doc = json!({"replay_id": "abc"});
        assert!(validate_report(&doc).is_err());
    }

    #[test]
    fn semver_major_must_be_one() {
        assert!(validate_schema_version(Some(&json!("1.0.0"))).is_ok());
        assert!(validate_schema_version(Some(&json!("2.0.0"))).is_err());
        assert!(validate_schema_version(Some(&json!("1.0"))).is_err());
    }
}
