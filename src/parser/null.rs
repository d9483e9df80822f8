//! Header-only adapter.
//!
//! Reads just enough of the replay container to produce a [`Header`], and
//! never attempts network parsing. Used when no real backend is available
//! and as the degraded-mode fallback.

use std::path::Path;

use crate::error::{ReportError, ReportResult};
use crate::parser::types::{Header, NetworkFrames};
use crate::parser::ReplayParser;

pub struct NullParser;

impl ReplayParser for NullParser {
    fn parse_header(&self, path: &Path) -> ReportResult<Header> {
        if !path.exists() {
            return Err(ReportError::header_parse(format!(
                "replay file not found: {}",
                path.display()
            )));
        }
        Ok(Header {
            quality_warnings: vec!["header_parsed_without_property_decoding".to_string()],
            ..Header::default()
        })
    }

    fn parse_network(&self, _path: &Path) -> ReportResult<Option<NetworkFrames>> {
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "null"
    }

    fn supports_network_parsing(&self) -> bool {
        false
    }
}
