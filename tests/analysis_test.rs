mod common;

use common::{ball, ball_at_kickoff, frame, player};
use replay_report::analysis::{
    aggregate_analysis, analyze_boost, analyze_challenges, analyze_fundamentals,
    analyze_movement, analyze_passing, analyze_positioning, analyze_shots_xg,
    calculate_rotation_compliance, generate_heatmaps, Scope,
};
use replay_report::analysis::mechanics::analyze_mechanics;
use replay_report::analysis::recovery::analyze_recoveries;
use replay_report::events::types::{
    BoostPickupEvent, ChallengeEvent, ChallengeOutcome, EventsBundle, GoalEvent, PadType,
    TouchContext, TouchEvent, TouchOutcome,
};
use replay_report::normalize::Frame;
use replay_report::{Team, Vec3};

fn touch(t: f64, player_id: &str, location: Vec3, ball_speed_kph: f64) -> TouchEvent {
    TouchEvent {
        t,
        frame: None,
        player_id: player_id.to_string(),
        location,
        ball_speed_kph,
        outcome: TouchOutcome::Neutral,
        is_save: false,
        touch_context: TouchContext::Ground,
        car_height: f64::from(location.z),
        is_first_touch: false,
    }
}

fn cruising_frames(player_id: &str, team: Team, speed: f32, count: usize) -> Vec<Frame> {
    (0..count)
        .map(|i| {
            let t = i as f64 / 30.0;
            frame(
                t,
                ball_at_kickoff(),
                vec![player(
                    player_id,
                    team,
                    Vec3::new(0.0, -2000.0 + speed * t as f32, 17.0),
                    Vec3::new(0.0, speed, 0.0),
                    50,
                )],
            )
        })
        .collect()
}

#[test]
fn fundamentals_counts_and_score_formula() {
    let frames = cruising_frames("slug:b1", Team::Blue, 1000.0, 5);
    let mut shot = touch(3.0, "slug:b1", Vec3::new(0.0, 2000.0, 93.0), 120.0);
    shot.outcome = TouchOutcome::Shot;
    let mut save = touch(8.0, "slug:b1", Vec3::new(0.0, -4500.0, 93.0), 60.0);
    save.outcome = TouchOutcome::Clear;
    save.is_save = true;

    let events = EventsBundle {
        goals: vec![GoalEvent {
            t: 4.0,
            frame: Some(100),
            scorer: Some("slug:b1".to_string()),
            team: Team::Blue,
            assist: None,
            shot_speed_kph: 150.0,
            distance_m: 12.0,
            on_target: true,
            tickmark_lead_seconds: 0.0,
        }],
        touches: vec![shot, save],
        ..EventsBundle::default()
    };

    let stats = analyze_fundamentals(&frames, &events, Scope::Player("slug:b1"));
    assert_eq!(stats.goals, 1);
    assert_eq!(stats.shots, 1);
    assert_eq!(stats.saves, 1);
    // 100 goals + 20 shots + 75 saves
    assert_eq!(stats.score, 195);
    assert_eq!(stats.shooting_percentage, 100.0);

    let team_stats = analyze_fundamentals(&frames, &events, Scope::Team(Team::Blue));
    assert_eq!(team_stats.goals, 1);
}

#[test]
fn movement_buckets_are_duration_weighted() {
    let frames = cruising_frames("slug:b1", Team::Blue, 1000.0, 31);
    let stats = analyze_movement(&frames, &EventsBundle::default(), Scope::Player("slug:b1"));

    // 31 frames at 30 Hz ~ 1 second, all at boost speed on the ground.
    assert!(stats.time_boost_speed_s > 0.9 && stats.time_boost_speed_s < 1.2);
    assert_eq!(stats.time_supersonic_s, 0.0);
    assert!(stats.time_ground_s > 0.9);
    assert!((stats.avg_speed_kph - 68.4).abs() < 0.5);
}

#[test]
fn positioning_single_player_is_always_first_man() {
    let frames = cruising_frames("slug:b1", Team::Blue, 500.0, 10);
    let stats = analyze_positioning(&frames, &EventsBundle::default(), Scope::Player("slug:b1"));

    assert_eq!(stats.first_man_pct, 100.0);
    assert_eq!(stats.second_man_pct, 0.0);
    assert_eq!(stats.third_man_pct, None, "1v1 has no third man");
    assert_eq!(stats.behind_ball_pct, 100.0);
}

#[test]
fn role_percentages_sum_to_one_hundred() {
    let mut frames = Vec::new();
    for i in 0..20usize {
        let t = i as f64 / 30.0;
        frames.push(frame(
            t,
            ball(Vec3::new(0.0, 2000.0, 93.15), Vec3::ZERO),
            vec![
                player("slug:b1", Team::Blue, Vec3::new(0.0, 1000.0, 17.0), Vec3::ZERO, 50),
                player("slug:b2", Team::Blue, Vec3::new(0.0, -1000.0, 17.0), Vec3::ZERO, 50),
                player("slug:b3", Team::Blue, Vec3::new(0.0, -3000.0, 17.0), Vec3::ZERO, 50),
                player("slug:o1", Team::Orange, Vec3::new(0.0, 4000.0, 17.0), Vec3::ZERO, 50),
            ],
        ));
    }

    for pid in ["slug:b1", "slug:b2", "slug:b3"] {
        let stats = analyze_positioning(&frames, &EventsBundle::default(), Scope::Player(pid));
        let total = stats.first_man_pct + stats.second_man_pct + stats.third_man_pct.unwrap();
        assert!(
            (total - 100.0).abs() < 0.5,
            "{pid}: role percentages sum to {total}"
        );
    }
}

#[test]
fn rotation_compliance_score_stays_in_range() {
    // Two blue players parked on the ball the whole time: constant double
    // commits drag the score down but never below zero.
    let mut frames = Vec::new();
    for i in 0..30usize {
        frames.push(frame(
            i as f64 / 30.0,
            ball_at_kickoff(),
            vec![
                player("slug:b1", Team::Blue, Vec3::new(100.0, 0.0, 17.0), Vec3::ZERO, 10),
                player("slug:b2", Team::Blue, Vec3::new(-100.0, 0.0, 17.0), Vec3::ZERO, 10),
            ],
        ));
    }

    let compliance = calculate_rotation_compliance(&frames, "slug:b1");
    assert!(compliance.score_0_to_100 <= 100.0);
    assert!(compliance.score_0_to_100 >= 0.0);
    assert!(compliance.flags.contains(&"double_commit".to_string()));
}

#[test]
fn passing_counts_completed_forward_passes_and_give_and_go() {
    let frames = vec![frame(
        0.0,
        ball_at_kickoff(),
        vec![
            player("slug:b1", Team::Blue, Vec3::new(0.0, -2000.0, 17.0), Vec3::ZERO, 50),
            player("slug:b2", Team::Blue, Vec3::new(0.0, -1000.0, 17.0), Vec3::ZERO, 50),
        ],
    )];

    let events = EventsBundle {
        touches: vec![
            touch(1.0, "slug:b1", Vec3::new(0.0, -2000.0, 93.0), 50.0),
            touch(2.0, "slug:b2", Vec3::new(0.0, -1000.0, 93.0), 50.0),
            touch(3.5, "slug:b1", Vec3::new(0.0, 0.0, 93.0), 50.0),
        ],
        ..EventsBundle::default()
    };

    let team = analyze_passing(&frames, &events, Scope::Team(Team::Blue));
    assert_eq!(team.passes_attempted, 2);
    assert_eq!(team.passes_completed, 2);
    assert_eq!(team.give_and_go_count, 1);

    let passer = analyze_passing(&frames, &events, Scope::Player("slug:b1"));
    assert_eq!(passer.passes_completed, 1);
    assert_eq!(passer.passes_received, 1);
}

#[test]
fn turnovers_count_against_the_losing_team() {
    let frames = vec![frame(
        0.0,
        ball_at_kickoff(),
        vec![
            player("slug:b1", Team::Blue, Vec3::new(0.0, -500.0, 17.0), Vec3::ZERO, 50),
            player("slug:o1", Team::Orange, Vec3::new(0.0, 500.0, 17.0), Vec3::ZERO, 50),
        ],
    )];
    let events = EventsBundle {
        touches: vec![
            touch(1.0, "slug:b1", Vec3::new(0.0, 0.0, 93.0), 50.0),
            touch(1.5, "slug:o1", Vec3::new(0.0, 300.0, 93.0), 50.0),
        ],
        ..EventsBundle::default()
    };

    let blue = analyze_passing(&frames, &events, Scope::Team(Team::Blue));
    assert_eq!(blue.turnovers, 1);
    let orange = analyze_passing(&frames, &events, Scope::Team(Team::Orange));
    assert_eq!(orange.turnovers, 0);
}

#[test]
fn boost_overfill_on_near_full_big_pad() {
    let frames = cruising_frames("slug:b1", Team::Blue, 1000.0, 5);
    let events = EventsBundle {
        boost_pickups: vec![BoostPickupEvent {
            t: 0.05,
            player_id: "slug:b1".to_string(),
            pad_type: PadType::Big,
            stolen: false,
            pad_id: 0,
            location: Vec3::new(-3584.0, -4240.0, 73.0),
            frame: Some(1),
            boost_before: Some(90.0),
            boost_after: Some(100.0),
            boost_gain: 10.0,
        }],
        ..EventsBundle::default()
    };

    let stats = analyze_boost(&frames, &events, Scope::Player("slug:b1"));
    assert_eq!(stats.big_pads, 1);
    assert_eq!(stats.amount_collected, 10.0);
    // Used 100 - max(90, 85) = 10 of the pad's 100 capacity.
    assert_eq!(stats.overfill, 90.0);
}

#[test]
fn challenge_aggregation_assigns_win_to_second_team() {
    let frames = vec![frame(
        0.0,
        ball_at_kickoff(),
        vec![
            player("slug:b1", Team::Blue, Vec3::new(0.0, -500.0, 17.0), Vec3::ZERO, 50),
            player("slug:o1", Team::Orange, Vec3::new(0.0, 500.0, 17.0), Vec3::ZERO, 50),
        ],
    )];
    let events = EventsBundle {
        challenges: vec![ChallengeEvent {
            t: 10.0,
            first_player: "slug:b1".to_string(),
            second_player: "slug:o1".to_string(),
            first_team: Team::Blue,
            second_team: Team::Orange,
            outcome: ChallengeOutcome::Loss,
            winner_team: Some(Team::Orange),
            location: Vec3::new(0.0, 0.0, 93.0),
            depth_m: 1.0,
            duration: 0.5,
            risk_first: 0.4,
            risk_second: 0.3,
        }],
        ..EventsBundle::default()
    };

    let blue = analyze_challenges(&frames, &events, Scope::Team(Team::Blue));
    assert_eq!(blue.contests, 1);
    assert_eq!(blue.losses, 1);
    assert_eq!(blue.first_to_ball_pct, 100.0);

    let orange = analyze_challenges(&frames, &events, Scope::Team(Team::Orange));
    assert_eq!(orange.wins, 1);
}

#[test]
fn xg_accumulates_per_player_and_team() {
    let frames = vec![frame(
        5.0,
        ball(Vec3::new(0.0, 3500.0, 93.15), Vec3::new(0.0, 2200.0, 0.0)),
        vec![player(
            "slug:b1",
            Team::Blue,
            Vec3::new(0.0, 3300.0, 17.0),
            Vec3::new(0.0, 1500.0, 0.0),
            50,
        )],
    )];
    let mut shot = touch(5.0, "slug:b1", Vec3::new(0.0, 3300.0, 93.0), 150.0);
    shot.outcome = TouchOutcome::Shot;

    let output = analyze_shots_xg(&frames, &[shot]);
    let stats = output.per_player.get("slug:b1").unwrap();
    assert_eq!(stats.total_shots, 1);
    assert!(stats.total_xg >= 0.01 && stats.total_xg <= 0.95);
    assert!(output.team_totals[&Team::Blue] > 0.0);
    assert_eq!(output.team_totals[&Team::Orange], 0.0);

    let shot_record = &stats.shots[0];
    assert!(shot_record.angle_degrees >= 0.0 && shot_record.angle_degrees <= 180.0);
    assert!(shot_record.distance_m > 0.0);
}

#[test]
fn heatmap_grids_are_normalized() {
    let frames = cruising_frames("slug:b1", Team::Blue, 800.0, 40);
    let events = EventsBundle {
        touches: vec![touch(0.5, "slug:b1", Vec3::new(0.0, -1500.0, 93.0), 50.0)],
        ..EventsBundle::default()
    };

    let heatmaps = generate_heatmaps(&frames, "slug:b1", &events);
    let occupancy_sum: f32 = heatmaps
        .position_occupancy_grid
        .values
        .iter()
        .flatten()
        .sum();
    assert!((occupancy_sum - 1.0).abs() < 1e-4);

    let touch_max = heatmaps
        .touch_density_grid
        .values
        .iter()
        .flatten()
        .cloned()
        .fold(0.0f32, f32::max);
    assert_eq!(touch_max, 1.0);
    assert_eq!(heatmaps.position_occupancy_grid.x_bins, 24);
    assert_eq!(heatmaps.position_occupancy_grid.y_bins, 16);
}

#[test]
fn mechanics_detects_a_plain_jump() {
    let mut frames = Vec::new();
    // On the ground, then airborne with a z-velocity spike and no rotation.
    frames.push(frame(
        0.0,
        ball_at_kickoff(),
        vec![player("slug:b1", Team::Blue, Vec3::new(0.0, 0.0, 17.0), Vec3::ZERO, 50)],
    ));
    let mut airborne = player(
        "slug:b1",
        Team::Blue,
        Vec3::new(0.0, 0.0, 40.0),
        Vec3::new(0.0, 0.0, 10.0),
        50,
    );
    airborne.is_on_ground = false;
    frames.push(frame(0.15, ball_at_kickoff(), vec![airborne.clone()]));
    let mut rising = airborne.clone();
    rising.position = Vec3::new(0.0, 0.0, 80.0);
    rising.velocity = Vec3::new(0.0, 0.0, 420.0);
    frames.push(frame(0.3, ball_at_kickoff(), vec![rising]));

    let output = analyze_mechanics(&frames);
    let stats = output.per_player.get("slug:b1").unwrap();
    assert_eq!(stats.jump_count, 1);
    assert_eq!(stats.flip_count, 0);
}

#[test]
fn recovery_detected_after_landing() {
    let mut frames = Vec::new();
    // Airborne arc, then a soft landing followed by stable rolling.
    let heights = [17.0f32, 120.0, 300.0, 400.0, 300.0, 120.0, 17.0, 17.0, 17.0, 17.0];
    for (i, z) in heights.iter().enumerate() {
        let t = i as f64 * 0.1;
        let mut p = player(
            "slug:b1",
            Team::Blue,
            Vec3::new(0.0, 0.0, *z),
            Vec3::new(800.0, 0.0, if *z > 17.0 { -150.0 } else { 0.0 }),
            50,
        );
        p.is_on_ground = *z <= 17.0;
        frames.push(frame(t, ball_at_kickoff(), vec![p]));
    }

    let output = analyze_recoveries(&frames);
    let stats = output.per_player.get("slug:b1").unwrap();
    assert_eq!(stats.total_recoveries, 1);
    assert!(stats.average_momentum_retained > 0.9);
}

#[test]
fn aggregator_splices_cached_sub_records() {
    let frames = cruising_frames("slug:b1", Team::Blue, 900.0, 20);
    let events = EventsBundle::default();

    let output = aggregate_analysis(&frames, &events, None);
    assert!(output.per_player.contains_key("slug:b1"));
    let player = output.per_player.get("slug:b1").unwrap();
    assert_eq!(player.fundamentals.goals, 0);
    assert_eq!(player.mechanics.total_mechanics, 0);
    assert_eq!(player.recovery.total_recoveries, 0);
    assert_eq!(player.ball_prediction.quality_distribution.len(), 5);
    assert!(player.rotation_compliance.score_0_to_100 <= 100.0);

    // Blue team block reflects its lone player; orange is the zero record.
    assert!(output.per_team.blue.movement.time_ground_s > 0.0);
    assert_eq!(output.per_team.orange.movement.time_ground_s, 0.0);
    assert_eq!(output.per_team.orange.fundamentals.score, 0);
}
