mod common;

use common::{ball, ball_at_kickoff, frame, player};
use replay_report::events::types::{
    ApproachType, ChallengeOutcome, KickoffOutcome, KickoffRole, PadType, TouchContext,
    TouchEvent, TouchOutcome,
};
use replay_report::events::{
    build_timeline, detect_boost_pickups, detect_challenges, detect_demos, detect_goals,
    detect_kickoffs, detect_touches, EventsBundle,
};
use replay_report::normalize::{Frame, PadEvent, PadEventStatus};
use replay_report::{Team, Vec3};

/// Scenario B: a speedflip kickoff by the lone blue player.
#[test]
fn scenario_b_kickoff_speedflip() {
    let fps = 30.0;
    let spawn = Vec3::new(-2048.0, -2560.0, 17.0);
    let contact = Vec3::new(0.0, -150.0, 17.0);
    let mut frames: Vec<Frame> = Vec::new();

    for i in 0..90usize {
        let t = i as f64 / fps;
        let progress = (t / 2.5).min(1.0) as f32;
        let position = Vec3::new(
            spawn.x + (contact.x - spawn.x) * progress,
            spawn.y + (contact.y - spawn.y) * progress,
            if (0.3..0.6).contains(&t) { 60.0 } else { 17.0 },
        );
        let speed = if t < 0.5 { 1200.0 } else { 2300.0 };
        let boost = if t < 1.0 { 33 - (25.0 * t) as u8 } else { 8 };

        let mut blue = player(
            "slug:b1",
            Team::Blue,
            position,
            Vec3::new(0.6 * speed, 0.8 * speed, 0.0),
            boost,
        );
        blue.is_on_ground = !(0.3..0.6).contains(&t);
        let orange = player(
            "slug:o1",
            Team::Orange,
            Vec3::new(2048.0, 2560.0, 17.0),
            Vec3::ZERO,
            33,
        );

        // Ball leaves the center spot shortly after the first touch.
        let ball_frame = if t < 2.55 {
            ball_at_kickoff()
        } else {
            ball(Vec3::new(200.0, 200.0, 93.15), Vec3::new(600.0, 600.0, 0.0))
        };

        frames.push(frame(t, ball_frame, vec![blue, orange]));
    }

    let kickoffs = detect_kickoffs(&frames, None);
    assert_eq!(kickoffs.len(), 1, "expected exactly one kickoff window");

    let kickoff = &kickoffs[0];
    assert_eq!(kickoff.outcome, KickoffOutcome::FirstPossessionBlue);
    assert_eq!(kickoff.first_touch_player.as_deref(), Some("slug:b1"));

    let blue_entry = kickoff
        .players
        .iter()
        .find(|p| p.player_id == "slug:b1")
        .unwrap();
    assert_eq!(blue_entry.role, KickoffRole::Go);
    assert_eq!(blue_entry.approach_type, ApproachType::Speedflip);
    assert!(blue_entry.time_to_first_touch.unwrap() <= 2.7);
    assert!(blue_entry.boost_used >= 20.0);

    let orange_entry = kickoff
        .players
        .iter()
        .find(|p| p.player_id == "slug:o1")
        .unwrap();
    assert_eq!(orange_entry.approach_type, ApproachType::FakeStationary);
}

/// Scenario C: driving through the blue-side corner big pad.
#[test]
fn scenario_c_big_corner_pickup() {
    let pad_position = Vec3::new(-3584.0, -4200.0, 17.0);
    let frames = vec![
        frame(
            0.0,
            ball_at_kickoff(),
            vec![player(
                "slug:b1",
                Team::Blue,
                pad_position,
                Vec3::new(1000.0, 0.0, 0.0),
                20,
            )],
        ),
        frame(
            0.033,
            ball_at_kickoff(),
            vec![player(
                "slug:b1",
                Team::Blue,
                pad_position,
                Vec3::new(1000.0, 0.0, 0.0),
                100,
            )],
        ),
    ];

    let pickups = detect_boost_pickups(&frames);
    assert_eq!(pickups.len(), 1);
    let pickup = &pickups[0];
    assert_eq!(pickup.pad_type, PadType::Big);
    assert!((pickup.boost_gain - 80.0).abs() < 0.01);
    assert!(!pickup.stolen, "own-half pad must not count as stolen");
    assert_eq!(pickup.boost_before, Some(20.0));
    assert_eq!(pickup.boost_after, Some(100.0));
}

/// Scenario D: demolition with the attacker 400 UU away.
#[test]
fn scenario_d_demo_attribution() {
    let victim = player(
        "slug:o1",
        Team::Orange,
        Vec3::new(0.0, 0.0, 17.0),
        Vec3::ZERO,
        33,
    );
    let attacker = player(
        "slug:b1",
        Team::Blue,
        Vec3::new(0.0, 400.0, 17.0),
        Vec3::new(2300.0, 0.0, 0.0),
        33,
    );
    let mut demolished = victim.clone();
    demolished.is_demolished = true;
    let frames = vec![
        frame(0.0, ball_at_kickoff(), vec![victim, attacker.clone()]),
        frame(0.033, ball_at_kickoff(), vec![demolished, attacker]),
    ];

    let demos = detect_demos(&frames);
    assert_eq!(demos.len(), 1);
    let demo = &demos[0];
    assert_eq!(demo.victim, "slug:o1");
    assert_eq!(demo.attacker.as_deref(), Some("slug:b1"));
    assert_eq!(demo.team_victim, Team::Orange);
    assert_eq!(demo.team_attacker, Some(Team::Blue));
}

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
        car_height: location.z.into(),
        is_first_touch: false,
    }
}

/// Scenario E: a rapid same-side retouch turns the contest neutral.
#[test]
fn scenario_e_challenge_neutral() {
    let frames = vec![frame(
        10.0,
        ball_at_kickoff(),
        vec![
            player("slug:b1", Team::Blue, Vec3::new(0.0, -100.0, 17.0), Vec3::ZERO, 50),
            player("slug:o1", Team::Orange, Vec3::new(0.0, 500.0, 17.0), Vec3::ZERO, 50),
            player("slug:o2", Team::Orange, Vec3::new(0.0, 700.0, 17.0), Vec3::ZERO, 50),
        ],
    )];

    let touches = vec![
        touch(10.0, "slug:b1", Vec3::new(0.0, 0.0, 93.0), 40.0),
        touch(10.6, "slug:o1", Vec3::new(0.0, 500.0, 93.0), 40.0),
        touch(10.75, "slug:o2", Vec3::new(0.0, 600.0, 93.0), 30.0),
    ];

    let challenges = detect_challenges(&frames, &touches);
    assert_eq!(challenges.len(), 1);
    let challenge = &challenges[0];
    assert_eq!(challenge.outcome, ChallengeOutcome::Neutral);
    assert_eq!(challenge.winner_team, None);
    assert_eq!(challenge.first_player, "slug:b1");
    assert_eq!(challenge.second_player, "slug:o1");
    assert!((challenge.t - 10.3).abs() < 1e-9);
}

/// Goal detection falls back to ball-line crossing without header goals.
#[test]
fn goal_fallback_detects_line_crossing() {
    let fps = 30.0;
    let mut frames = Vec::new();
    for i in 0..80usize {
        let t = i as f64 / fps;
        let ball_y = (3000.0 + 2000.0 * t as f32).min(4900.0);
        let shooter_y = ball_y - 150.0;
        frames.push(frame(
            t,
            ball(Vec3::new(0.0, ball_y, 93.15), Vec3::new(0.0, 2000.0, 0.0)),
            vec![player(
                "slug:b1",
                Team::Blue,
                Vec3::new(0.0, shooter_y, 17.0),
                Vec3::new(0.0, 2000.0, 0.0),
                33,
            )],
        ));
    }

    let goals = detect_goals(&frames, None);
    assert_eq!(goals.len(), 1);
    assert_eq!(goals[0].team, Team::Blue);
    assert_eq!(goals[0].scorer.as_deref(), Some("slug:b1"));
    assert!(goals[0].shot_speed_kph > 100.0);
}

#[test]
fn fast_touches_classify_as_shots() {
    let frames = vec![
        frame(
            0.0,
            ball(Vec3::new(0.0, 0.0, 93.15), Vec3::ZERO),
            vec![player(
                "slug:b1",
                Team::Blue,
                Vec3::new(0.0, -150.0, 17.0),
                Vec3::new(0.0, 1000.0, 0.0),
                33,
            )],
        ),
        frame(
            0.1,
            ball(Vec3::new(0.0, 100.0, 93.15), Vec3::new(0.0, 2000.0, 0.0)),
            vec![player(
                "slug:b1",
                Team::Blue,
                Vec3::new(0.0, 0.0, 17.0),
                Vec3::new(0.0, 1000.0, 0.0),
                33,
            )],
        ),
    ];

    let touches = detect_touches(&frames);
    assert!(!touches.is_empty());
    assert!(touches[0].is_first_touch);
    assert!(
        touches.iter().any(|t| t.outcome == TouchOutcome::Shot),
        "2000 uu/s ball speed must classify as a shot"
    );
}

#[test]
fn defensive_redirect_counts_as_save() {
    // Ball heading into the blue goal from deep in the defensive third, then
    // redirected away by the defender.
    let frames = vec![
        frame(
            0.0,
            ball(Vec3::new(0.0, -4000.0, 93.15), Vec3::new(0.0, -1200.0, 0.0)),
            vec![player(
                "slug:b1",
                Team::Blue,
                Vec3::new(0.0, -4100.0, 17.0),
                Vec3::ZERO,
                33,
            )],
        ),
        frame(
            0.1,
            ball(Vec3::new(0.0, -4050.0, 93.15), Vec3::new(0.0, 800.0, 0.0)),
            vec![player(
                "slug:b1",
                Team::Blue,
                Vec3::new(0.0, -4100.0, 17.0),
                Vec3::ZERO,
                33,
            )],
        ),
    ];

    let touches = detect_touches(&frames);
    let save = touches.iter().find(|t| t.is_save);
    assert!(save.is_some(), "expected a save touch, got {touches:?}");
    assert_eq!(save.unwrap().outcome, TouchOutcome::Clear);
}

#[test]
fn timeline_emits_auxiliary_shot_and_save_entries() {
    let mut shot = touch(5.0, "slug:b1", Vec3::new(0.0, 0.0, 93.0), 120.0);
    shot.outcome = TouchOutcome::Shot;
    let mut save = touch(7.0, "slug:o1", Vec3::new(0.0, 4000.0, 93.0), 80.0);
    save.outcome = TouchOutcome::Clear;
    save.is_save = true;

    let events = EventsBundle {
        touches: vec![shot, save],
        ..EventsBundle::default()
    };

    let timeline = build_timeline(&events);
    let types: Vec<&str> = timeline
        .iter()
        .map(|e| e.event_type.as_str())
        .collect();
    assert_eq!(types, vec!["SHOT", "TOUCH", "SAVE", "TOUCH"]);
}

#[test]
fn pad_events_respect_respawn_windows() {
    // Parser-provided pad events: a second COLLECTED on the same big pad
    // inside its respawn window is a replication artifact and is dropped.
    let collect = |t: f64| PadEvent {
        pad_id: 0,
        status: PadEventStatus::Collected,
        player_id: Some("slug:b1".to_string()),
        player_team: Some(Team::Blue),
        timestamp: Some(t),
    };

    let mut first = frame(
        0.0,
        ball_at_kickoff(),
        vec![player(
            "slug:b1",
            Team::Blue,
            Vec3::new(-3584.0, -4240.0, 17.0),
            Vec3::ZERO,
            20,
        )],
    );
    first.boost_pad_events.push(collect(0.0));
    let mut second = frame(
        2.0,
        ball_at_kickoff(),
        vec![player(
            "slug:b1",
            Team::Blue,
            Vec3::new(-3584.0, -4240.0, 17.0),
            Vec3::ZERO,
            100,
        )],
    );
    second.boost_pad_events.push(collect(2.0));

    let pickups = detect_boost_pickups(&[first, second]);
    assert_eq!(pickups.len(), 1, "respawn violation must drop the event");
    assert_eq!(pickups[0].pad_type, PadType::Big);
    assert_eq!(pickups[0].pad_id, 0);
}
