//! # replay-report
//!
//! [`replay-report`](crate) turns a single Rocket League replay file into a
//! deterministic, schema-conformant JSON report: per-frame physics are
//! normalized into a canonical frame stream, deterministic state machines
//! extract the discrete events of the match (goals, demos, kickoffs, boost
//! pickups, touches, challenges), and a family of single-pass analyzers
//! derives per-player and per-team metrics from frames and events.
//!
//! ## Overview of Key Components
//!
//! - **[`parser`]**: replay files enter only through the
//!   [`ReplayParser`] trait. [`BoxcarsParser`] is the full adapter built on
//!   the [`boxcars`] decoder, modeling the actor graph frame by frame;
//!   [`NullParser`] is the header-only fallback.
//!
//! - **[`normalize`]**: parser output becomes canonical [`Frame`] values —
//!   standard coordinates, canonical player identities resolved through an
//!   alias table, timestamps sorted, boost clamped. An empty stream yields a
//!   single sentinel frame so every downstream component has a legitimate
//!   degenerate input.
//!
//! - **[`events`]**: each detector folds a small state machine over the
//!   frame list and emits immutable event records; the timeline builder
//!   merges all of them into one list sorted by `(t, type)`.
//!
//! - **[`analysis`]**: pure analyzers over `(frames, events)` with player or
//!   team scope. The aggregator runs the expensive whole-replay analyzers
//!   (mechanics, recovery, defense, xG, ball prediction) once and splices
//!   the cached results into each scope.
//!
//! - **[`report`]**: assembles the final document and validates it with
//!   [`schema::validate_report`] before returning. Unrecoverable failures
//!   produce the `{"error": "unreadable_replay_file", ...}` shape instead.
//!
//! ## Getting a report
//!
//! ```no_run
//! use replay_report::{generate_report, BoxcarsParser, ReportOptions};
//!
//! fn report_json(path: std::path::PathBuf) -> anyhow::Result<String> {
//!     let report = generate_report(&path, &BoxcarsParser, &ReportOptions::default());
//!     Ok(serde_json::to_string_pretty(&report)?)
//! }
//! ```
//!
//! Identical input bytes produce byte-identical output as long as the caller
//! pins `generated_at` in [`ReportOptions`].

pub mod analysis;
pub mod constants;
pub mod error;
pub mod events;
pub mod identity;
pub mod math;
pub mod normalize;
pub mod parser;
pub mod report;
pub mod schema;

pub use crate::error::{ReportError, ReportErrorVariant, ReportResult};
pub use crate::events::EventsBundle;
pub use crate::identity::{PlayerIdentity, Team};
pub use crate::math::{Rotation, Vec3};
pub use crate::normalize::{build_frames, measure_frame_rate, Frame, NormalizedReplay};
pub use crate::parser::boxcars::BoxcarsParser;
pub use crate::parser::null::NullParser;
pub use crate::parser::types::{Header, NetworkFrames, PlayerInfo};
pub use crate::parser::ReplayParser;
pub use crate::report::{error_document, generate_report, replay_id_for_bytes, ReportOptions};
pub use crate::schema::{validate_report, SCHEMA_VERSION};
