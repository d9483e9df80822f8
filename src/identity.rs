//! Canonical player identities.
//!
//! Header player entries and network-frame actor ids rarely agree on how a
//! player is named. This module resolves both into one canonical id per
//! player, with an alias table so every downstream component only ever sees
//! canonical ids.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::parser::types::PlayerInfo;

/// Platform precedence for canonical id selection.
const PLATFORM_PRIORITY: [&str; 10] = [
    "steam",
    "epic",
    "psn",
    "ps4",
    "ps5",
    "xbox",
    "xboxone",
    "xboxseries",
    "switch",
    "nintendo",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Team {
    Blue,
    Orange,
}

impl Team {
    pub fn from_index(index: u8) -> Team {
        if index == 0 {
            Team::Blue
        } else {
            Team::Orange
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Team::Blue => 0,
            Team::Orange => 1,
        }
    }

    pub fn opponent(self) -> Team {
        match self {
            Team::Blue => Team::Orange,
            Team::Orange => Team::Blue,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Team::Blue => "BLUE",
            Team::Orange => "ORANGE",
        }
    }
}

/// Resolved identity metadata for a replay participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerIdentity {
    pub canonical_id: String,
    pub display_name: String,
    pub team: Team,
    pub platform_ids: BTreeMap<String, String>,
    pub slug: String,
    pub header_index: usize,
    pub aliases: BTreeSet<String>,
}

/// Trim whitespace and strip control characters from a display name.
pub fn sanitize_display_name(raw_name: Option<&str>) -> String {
    let Some(raw) = raw_name else {
        return "Unknown".to_string();
    };

    let normalized: String = raw.nfkc().collect();
    let cleaned = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        "Unknown".to_string()
    } else {
        cleaned
    }
}

/// Create a lowercase slug suitable for fallback identifiers.
pub fn slugify_display_name(raw_name: Option<&str>) -> String {
    let cleaned = sanitize_display_name(raw_name).to_lowercase();
    let ascii: String = cleaned.nfkd().filter(|c| c.is_ascii()).collect();

    let mut slug = String::with_capacity(ascii.len());
    let mut last_dash = true;
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "player".to_string()
    } else {
        slug
    }
}

/// Resolve player identities with platform precedence and sanitized fallbacks.
pub fn build_player_identities(players: &[PlayerInfo]) -> Vec<PlayerIdentity> {
    let mut identities = Vec::with_capacity(players.len());
    let mut used_ids: BTreeSet<String> = BTreeSet::new();

    for (index, player) in players.iter().enumerate() {
        let platform_ids = collect_platform_ids(player);
        let display_name = sanitize_display_name(Some(&player.name));
        let slug = slugify_display_name(Some(&player.name));
        let candidate = select_preferred_identifier(&platform_ids, &slug);
        let canonical_id = make_unique(candidate, &mut used_ids);
        let team = Team::from_index(player.team.unwrap_or(0));
        let aliases = collect_aliases(&canonical_id, &slug, index, &platform_ids);
        identities.push(PlayerIdentity {
            canonical_id,
            display_name,
            team,
            platform_ids,
            slug,
            header_index: index,
            aliases,
        });
    }

    identities
}

/// Produce an alias -> canonical_id mapping for quick resolution.
pub fn build_alias_lookup(identities: &[PlayerIdentity]) -> BTreeMap<String, String> {
    let mut alias_map = BTreeMap::new();
    for identity in identities {
        for alias in &identity.aliases {
            alias_map
                .entry(alias.clone())
                .or_insert_with(|| identity.canonical_id.clone());
        }
    }
    alias_map
}

fn collect_platform_ids(player: &PlayerInfo) -> BTreeMap<String, String> {
    let mut platform_ids = BTreeMap::new();
    for (key, value) in &player.platform_ids {
        let norm_key = key.to_lowercase();
        let norm_value = value.trim();
        if !norm_key.is_empty() && !norm_value.is_empty() {
            platform_ids.insert(norm_key, norm_value.to_string());
        }
    }
    platform_ids
}

fn select_preferred_identifier(platform_ids: &BTreeMap<String, String>, slug: &str) -> String {
    for platform in PLATFORM_PRIORITY {
        if let Some(value) = platform_ids.get(platform) {
            return format!("{platform}:{value}");
        }
    }
    if let Some((platform, value)) = platform_ids.iter().next() {
        return format!("{platform}:{value}");
    }
    format!("slug:{slug}")
}

fn make_unique(candidate: String, used_ids: &mut BTreeSet<String>) -> String {
    if used_ids.insert(candidate.clone()) {
        return candidate;
    }
    let mut suffix = 2;
    loop {
        let alternate = format!("{candidate}-{suffix}");
        if used_ids.insert(alternate.clone()) {
            return alternate;
        }
        suffix += 1;
    }
}

fn collect_aliases(
    canonical_id: &str,
    slug: &str,
    index: usize,
    platform_ids: &BTreeMap<String, String>,
) -> BTreeSet<String> {
    let mut aliases = BTreeSet::new();
    aliases.insert(canonical_id.to_string());
    aliases.insert(slug.to_string());
    aliases.insert(format!("slug:{slug}"));
    aliases.insert(format!("player_{index}"));
    for (platform, value) in platform_ids {
        aliases.insert(value.clone());
        aliases.insert(format!("{platform}:{value}"));
    }
    aliases
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, team: u8, platform_ids: &[(&str, &str)]) -> PlayerInfo {
        PlayerInfo {
            name: name.to_string(),
            team: Some(team),
            platform_ids: platform_ids
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..PlayerInfo::default()
        }
    }

    #[test]
    fn platform_precedence_prefers_steam() {
        let players = vec![info("Scrub", 0, &[("epic", "e1"), ("steam", "7656")])];
        let identities = build_player_identities(&players);
        assert_eq!(identities[0].canonical_id, "steam:7656");
    }

    #[test]
    fn slug_fallback_and_collision_suffix() {
        let players = vec![info("Dot .", 0, &[]), info("dot", 1, &[])];
        let identities = build_player_identities(&players);
        assert_eq!(identities[0].canonical_id, "slug:dot");
        assert_eq!(identities[1].canonical_id, "slug:dot-2");
    }

    #[test]
    fn sanitize_collapses_whitespace_and_defaults() {
        assert_eq!(sanitize_display_name(Some("  a \t b ")), "a b");
        assert_eq!(sanitize_display_name(Some("   ")), "Unknown");
        assert_eq!(sanitize_display_name(None), "Unknown");
    }

    #[test]
    fn alias_lookup_resolves_positional_names() {
        let players = vec![info("One", 0, &[("steam", "1")])];
        let identities = build_player_identities(&players);
        let lookup = build_alias_lookup(&identities);
        assert_eq!(lookup.get("player_0"), Some(&"steam:1".to_string()));
        assert_eq!(lookup.get("1"), Some(&"steam:1".to_string()));
    }
}
