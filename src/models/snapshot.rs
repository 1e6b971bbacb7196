//! Snapshot of everything observed about the game server in one poll.
//!
//! Field names serialise in camelCase so the state file mirrors the shape of
//! the documents the server publishes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name prefix that marks a mod entry as downloadable content.
pub const DLC_PREFIX: &str = "pdlc_";

/// The full normalized state observed from one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Snapshot {
    pub server: ServerInfo,

    /// Installed mods and DLCs keyed by content hash
    pub mods: BTreeMap<String, ModInfo>,

    pub slots: Slots,

    pub career_savegame: CareerSavegame,
}

impl Snapshot {
    /// Mods of the given kind, in key order.
    pub fn mods_of(&self, kind: ModKind) -> impl Iterator<Item = &ModInfo> {
        self.mods.values().filter(move |m| m.kind() == kind)
    }

    /// Number of installed mods of the given kind.
    pub fn mod_count(&self, kind: ModKind) -> usize {
        self.mods_of(kind).count()
    }

    /// Forget who is connected.
    pub fn clear_slots(&mut self) {
        self.slots = Slots::default();
    }
}

/// Server identity and reachability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerInfo {
    pub game: String,
    pub version: String,
    pub name: String,
    pub map_name: String,
    pub online: bool,
    pub unreachable: bool,
}

/// One entry of the server's mod list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModInfo {
    /// Content hash, unique per mod version
    pub hash: String,

    /// Display text shown by the server
    pub text: String,

    /// Internal mod name, shared across versions of the same mod
    pub name: String,

    pub version: String,
    pub author: String,
}

impl ModInfo {
    /// DLCs are mod entries whose name carries the reserved prefix.
    pub fn is_dlc(&self) -> bool {
        self.name.starts_with(DLC_PREFIX)
    }

    pub fn kind(&self) -> ModKind {
        if self.is_dlc() { ModKind::Dlc } else { ModKind::Mod }
    }
}

/// Reporting channel for a mod entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModKind {
    Dlc,
    Mod,
}

impl ModKind {
    /// Noun used in notifications.
    pub fn noun(self) -> &'static str {
        match self {
            ModKind::Dlc => "DLC",
            ModKind::Mod => "mod",
        }
    }

    /// Emoji shortcode used in notifications.
    pub fn emoji(self) -> &'static str {
        match self {
            ModKind::Dlc => ":cd:",
            ModKind::Mod => ":joystick:",
        }
    }

    /// Largest itemized block (in characters) emitted before collapsing to counts.
    pub fn character_budget(self) -> usize {
        match self {
            ModKind::Dlc => 300,
            ModKind::Mod => 1200,
        }
    }
}

/// Player slots and who occupies them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Slots {
    pub num_used: u32,
    pub capacity: u32,
    pub players: BTreeMap<String, Player>,
}

/// A connected player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    #[serde(default)]
    pub name: String,

    /// When the player was first seen in the current session; the load time
    /// when the stored entry lacks it
    #[serde(with = "chrono::serde::ts_milliseconds", default = "Utc::now")]
    pub first_seen: DateTime<Utc>,
}

impl Player {
    pub fn new(name: impl Into<String>, first_seen: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            first_seen,
        }
    }
}

/// Statistics read from the career savegame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CareerSavegame {
    pub money: i64,

    /// Total play time in minutes
    pub play_time: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_mod(hash: &str, name: &str) -> ModInfo {
        ModInfo {
            hash: hash.to_string(),
            text: name.to_string(),
            name: name.to_string(),
            version: "1.0.0.0".to_string(),
            author: "Giants".to_string(),
        }
    }

    #[test]
    fn test_dlc_classification() {
        assert!(make_mod("a", "pdlc_claasPack").is_dlc());
        assert!(!make_mod("b", "FS22_pdlc_lookalike").is_dlc());
        assert_eq!(make_mod("c", "FS22_Courseplay").kind(), ModKind::Mod);
    }

    #[test]
    fn test_mod_counts_by_kind() {
        let mut snapshot = Snapshot::default();
        for m in [
            make_mod("1", "pdlc_a"),
            make_mod("2", "FS22_b"),
            make_mod("3", "FS22_c"),
        ] {
            snapshot.mods.insert(m.hash.clone(), m);
        }
        assert_eq!(snapshot.mod_count(ModKind::Dlc), 1);
        assert_eq!(snapshot.mod_count(ModKind::Mod), 2);
    }

    #[test]
    fn test_state_file_shape() {
        let mut snapshot = Snapshot::default();
        snapshot.server.map_name = "Elmcreek".to_string();
        snapshot.slots.players.insert(
            "Alice".to_string(),
            Player::new("Alice", DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()),
        );

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["server"]["mapName"], "Elmcreek");
        assert_eq!(json["careerSavegame"]["playTime"], 0);
        assert_eq!(json["slots"]["numUsed"], 0);
        assert_eq!(json["slots"]["players"]["Alice"]["firstSeen"], 1_700_000_000_000i64);
    }

    #[test]
    fn test_player_without_first_seen_keeps_document() {
        let before = Utc::now();
        let snapshot: Snapshot = serde_json::from_str(
            r#"{
                "server": {"name": "Farm", "online": true},
                "slots": {"numUsed": 1, "players": {"Alice": {"name": "Alice"}}},
                "careerSavegame": {"money": 42}
            }"#,
        )
        .unwrap();

        assert_eq!(snapshot.server.name, "Farm");
        assert_eq!(snapshot.slots.num_used, 1);
        assert_eq!(snapshot.career_savegame.money, 42);
        let alice = &snapshot.slots.players["Alice"];
        assert_eq!(alice.name, "Alice");
        assert!(alice.first_seen >= before - chrono::Duration::seconds(1));
    }

    #[test]
    fn test_partial_document_merges_over_defaults() {
        let snapshot: Snapshot =
            serde_json::from_str(r#"{"server": {"name": "Farm", "online": true}}"#).unwrap();
        assert_eq!(snapshot.server.name, "Farm");
        assert!(snapshot.server.online);
        assert!(!snapshot.server.unreachable);
        assert!(snapshot.mods.is_empty());
        assert_eq!(snapshot.career_savegame, CareerSavegame::default());
    }
}
