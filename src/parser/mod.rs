//! Parser adapters.
//!
//! The pipeline consumes replay files only through the [`ReplayParser`]
//! trait: `parse_header` is required, `parse_network` may return `None` when
//! the adapter has no network support. [`boxcars::BoxcarsParser`] is the
//! full adapter built on the boxcars decoder; [`null::NullParser`] is the
//! header-only fallback used for degraded mode and tests.

pub mod boxcars;
pub mod null;
pub mod types;

use std::path::Path;

use crate::error::ReportResult;
use types::{Header, NetworkFrames};

pub trait ReplayParser {
    /// Parse header information from a replay file. Fails with
    /// [`crate::ReportErrorVariant::HeaderParse`] on unrecoverable issues.
    fn parse_header(&self, path: &Path) -> ReportResult<Header>;

    /// Parse network frame data. `Ok(None)` means this adapter does not
    /// support network parsing; an empty [`NetworkFrames`] with warnings
    /// means it tried and failed.
    fn parse_network(&self, path: &Path) -> ReportResult<Option<NetworkFrames>>;

    /// Identifier used in the report's quality block.
    fn name(&self) -> &'static str;

    fn supports_network_parsing(&self) -> bool;

    /// Ordered backend identifiers for adapters that chain implementations.
    fn backend_chain(&self) -> Vec<&'static str> {
        vec![self.name()]
    }
}
