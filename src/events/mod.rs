//! Event detection: deterministic state machines over the canonical frame
//! list, plus the timeline builder that merges every event class into one
//! chronological stream.

pub mod boost;
pub mod challenges;
pub mod demos;
pub mod goals;
pub mod kickoffs;
pub mod timeline;
pub mod touches;
pub mod types;

pub use boost::{detect_boost_pickups, determine_team_sides};
pub use challenges::detect_challenges;
pub use demos::detect_demos;
pub use goals::detect_goals;
pub use kickoffs::detect_kickoffs;
pub use timeline::build_timeline;
pub use touches::detect_touches;
pub use types::*;

use crate::normalize::Frame;
use crate::parser::types::Header;

/// Run every detector over the frame list and collect the results.
pub fn detect_all(frames: &[Frame], header: Option<&Header>) -> EventsBundle {
    let goals = detect_goals(frames, header);
    let demos = detect_demos(frames);
    let kickoffs = detect_kickoffs(frames, header);
    let boost_pickups = detect_boost_pickups(frames);
    let touches = detect_touches(frames);
    let challenges = detect_challenges(frames, &touches);

    EventsBundle {
        goals,
        demos,
        kickoffs,
        boost_pickups,
        touches,
        challenges,
    }
}
