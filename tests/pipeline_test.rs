mod common;

use std::path::Path;

use chrono::{TimeZone, Utc};
use common::{ball, frame, header_1v1, player, to_raw_frames, MockParser};
use replay_report::parser::types::GoalHeader;
use replay_report::{generate_report, ReportOptions, Team, Vec3};

fn fixed_options() -> ReportOptions {
    ReportOptions {
        generated_at: Some(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()),
        header_only: false,
    }
}

/// Scenario A: a direct shot crossing the orange goal line, attributed from
/// header goal metadata.
fn direct_shot_parser() -> MockParser {
    let mut frames = Vec::new();
    let fps = 30.0;
    let total = 70usize;
    for i in 0..total {
        let t = i as f64 / fps;
        let ball_y = (500.0 + 2500.0 * t as f32).min(5200.0);
        frames.push(frame(
            t,
            ball(Vec3::new(0.0, ball_y, 93.15), Vec3::new(0.0, 2500.0, 0.0)),
            vec![
                player(
                    "slug:b1",
                    Team::Blue,
                    Vec3::new(0.0, -1000.0 + 2000.0 * t as f32, 17.0),
                    Vec3::new(0.0, 2000.0, 0.0),
                    33,
                ),
                player(
                    "slug:o1",
                    Team::Orange,
                    Vec3::new(2000.0, 4000.0, 17.0),
                    Vec3::ZERO,
                    33,
                ),
            ],
        ));
    }

    // The last frame is the one the header reports the goal on.
    let goal_frame = (total - 1) as i64;
    let mut header = header_1v1("B1", "O1");
    header.team0_score = 1;
    header.match_length = 300.0;
    header.goals = vec![GoalHeader {
        frame: Some(goal_frame),
        player_name: Some("B1".to_string()),
        player_team: Some(0),
    }];

    let raw = to_raw_frames(&frames);
    MockParser::with_frames(header, raw)
}

#[test]
fn scenario_a_single_goal_direct_shot() {
    let parser = direct_shot_parser();
    let report = generate_report(Path::new("direct_shot.replay"), &parser, &fixed_options());

    assert!(
        report.get("error").is_none(),
        "expected a success report, got {report}"
    );

    let goals = report["events"]["goals"].as_array().unwrap();
    assert_eq!(goals.len(), 1);
    let goal = &goals[0];
    assert_eq!(goal["scorer"], "slug:b1");
    assert_eq!(goal["team"], "BLUE");
    assert_eq!(goal["on_target"], true);

    let shot_speed = goal["shot_speed_kph"].as_f64().unwrap();
    assert!(
        (shot_speed - 171.0).abs() < 1.0,
        "shot speed should be ~171 kph, got {shot_speed}"
    );

    let distance_m = goal["distance_m"].as_f64().unwrap();
    assert!(
        (distance_m - 9.6).abs() < 0.5,
        "distance should be ~9.6 m, got {distance_m}"
    );

    assert_eq!(report["teams"]["blue"]["score"], 1);
    assert_eq!(report["teams"]["orange"]["score"], 0);

    // The scorer's fundamentals pick the goal up as well.
    let blue_fundamentals = &report["analysis"]["per_player"]["slug:b1"]["fundamentals"];
    assert_eq!(blue_fundamentals["goals"], 1);
}

#[test]
fn scenario_f_header_only_degraded_mode() {
    let mut header = header_1v1("B1", "O1");
    header.team0_score = 2;
    header.team1_score = 1;
    let parser = MockParser::header_only(header);

    let report = generate_report(Path::new("missing.replay"), &parser, &fixed_options());

    assert!(report.get("error").is_none(), "got error: {report}");
    assert_eq!(report["events"]["timeline"].as_array().unwrap().len(), 0);
    assert_eq!(report["teams"]["blue"]["score"], 2);
    assert_eq!(report["teams"]["orange"]["score"], 1);

    let warnings = report["quality"]["warnings"].as_array().unwrap();
    assert!(
        warnings
            .iter()
            .any(|w| w == "network_data_unparsed_fallback_header_only"),
        "expected header-only warning, got {warnings:?}"
    );

    // Zero records, not missing records.
    let blue = &report["analysis"]["per_team"]["blue"];
    assert_eq!(blue["fundamentals"]["goals"], 0);
    assert_eq!(blue["boost"]["bpm"], 0.0);
    assert_eq!(blue["movement"]["aerial_count"], 0);
}

#[test]
fn identical_inputs_produce_identical_reports() {
    let options = fixed_options();

    let first = generate_report(
        Path::new("det.replay"),
        &direct_shot_parser(),
        &options,
    );
    let second = generate_report(
        Path::new("det.replay"),
        &direct_shot_parser(),
        &options,
    );

    let first_json = serde_json::to_string(&first).unwrap();
    let second_json = serde_json::to_string(&second).unwrap();
    assert_eq!(first_json, second_json);
}

#[test]
fn timeline_is_sorted_by_time_then_type() {
    let parser = direct_shot_parser();
    let report = generate_report(Path::new("sorted.replay"), &parser, &fixed_options());

    let timeline = report["events"]["timeline"].as_array().unwrap();
    let keys: Vec<(f64, String)> = timeline
        .iter()
        .map(|e| {
            (
                e["t"].as_f64().unwrap(),
                e["type"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    for pair in keys.windows(2) {
        assert!(
            pair[0].0 < pair[1].0 || (pair[0].0 == pair[1].0 && pair[0].1 <= pair[1].1),
            "timeline out of order: {pair:?}"
        );
    }
}

#[test]
fn report_carries_required_top_level_fields() {
    let parser = direct_shot_parser();
    let report = generate_report(Path::new("fields.replay"), &parser, &fixed_options());

    for field in [
        "replay_id",
        "source_file",
        "schema_version",
        "generated_at_utc",
        "metadata",
        "quality",
        "teams",
        "players",
        "events",
        "analysis",
    ] {
        assert!(report.get(field).is_some(), "missing field {field}");
    }
    assert_eq!(report["schema_version"], "1.0.0");
    assert_eq!(
        report["metadata"]["coordinate_reference"]["back_wall_y"],
        5120.0
    );
}

#[test]
fn players_block_uses_canonical_ids() {
    let parser = direct_shot_parser();
    let report = generate_report(Path::new("ids.replay"), &parser, &fixed_options());

    let players = report["players"].as_array().unwrap();
    assert_eq!(players.len(), 2);
    assert_eq!(players[0]["player_id"], "slug:b1");
    assert_eq!(players[0]["team"], "BLUE");
    assert_eq!(players[1]["player_id"], "slug:o1");

    let blue_roster = report["teams"]["blue"]["players"].as_array().unwrap();
    assert_eq!(blue_roster.len(), 1);
    assert_eq!(blue_roster[0], "slug:b1");
}
