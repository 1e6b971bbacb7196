//! Diff calculation between consecutive snapshots.
//!
//! Computes what changed on the server between two polls: reachability,
//! server identity, installed mods and DLCs, savegame statistics and who is
//! connected. The result feeds the notification formatter.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};

use crate::models::{ModInfo, ModKind, Player, Snapshot};
use crate::utils::text::compare_case_insensitive;

/// Server attributes whose changes are announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerField {
    Game,
    Version,
    Name,
    MapName,
}

/// Mod changes of one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModChanges {
    /// Newly installed mods
    pub added: Vec<ModInfo>,
    /// New versions of mods that were already installed
    pub updated: Vec<ModInfo>,
    /// Mods no longer installed
    pub removed: Vec<ModInfo>,
}

impl ModChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Savegame money before and after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoneyDelta {
    pub previous: i64,
    pub current: i64,
}

impl MoneyDelta {
    /// Signed change, widened so any two balances fit.
    pub fn difference(&self) -> i128 {
        i128::from(self.current) - i128::from(self.previous)
    }

    pub fn is_increase(&self) -> bool {
        self.current > self.previous
    }
}

/// A player who disconnected since the last poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartedPlayer {
    pub name: String,
    /// Rounded minutes between first sighting and this poll
    pub session_minutes: i64,
}

/// Who connected and disconnected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerChanges {
    pub joined: Vec<Player>,
    pub left: Vec<DepartedPlayer>,
}

impl PlayerChanges {
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}

/// Everything that changed between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    /// The server went from offline to online
    pub came_online: bool,
    /// Server attributes with a new, non-empty value
    pub server_changed: Vec<ServerField>,
    pub dlcs: ModChanges,
    pub mods: ModChanges,
    pub money: Option<MoneyDelta>,
    /// New total play time in minutes, if it changed
    pub play_time: Option<i64>,
    pub players: PlayerChanges,
    /// Clock of the poll that produced the current snapshot
    pub observed_at: DateTime<Utc>,
}

impl ChangeSet {
    /// An empty change set observed at the given time.
    pub fn empty(observed_at: DateTime<Utc>) -> Self {
        Self {
            came_online: false,
            server_changed: Vec::new(),
            dlcs: ModChanges::default(),
            mods: ModChanges::default(),
            money: None,
            play_time: None,
            players: PlayerChanges::default(),
            observed_at,
        }
    }

    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        !self.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        !self.came_online
            && self.server_changed.is_empty()
            && self.dlcs.is_empty()
            && self.mods.is_empty()
            && self.money.is_none()
            && self.play_time.is_none()
            && self.players.is_empty()
    }

    /// Mod changes for one category.
    pub fn mods_of(&self, kind: ModKind) -> &ModChanges {
        match kind {
            ModKind::Dlc => &self.dlcs,
            ModKind::Mod => &self.mods,
        }
    }

    /// Whether the server summary line is warranted.
    pub fn server_updated(&self) -> bool {
        !self.server_changed.is_empty() || !self.dlcs.is_empty() || !self.mods.is_empty()
    }
}

/// Calculate what changed from `previous` to `current`.
///
/// `now` is the poll time used to measure how long departed players stayed.
pub fn diff(previous: &Snapshot, current: &Snapshot, now: DateTime<Utc>) -> ChangeSet {
    ChangeSet {
        came_online: !previous.server.online && current.server.online,
        server_changed: server_changes(previous, current),
        dlcs: classify_mods(&previous.mods, &current.mods, ModKind::Dlc),
        mods: classify_mods(&previous.mods, &current.mods, ModKind::Mod),
        money: (previous.career_savegame.money != current.career_savegame.money).then_some(
            MoneyDelta {
                previous: previous.career_savegame.money,
                current: current.career_savegame.money,
            },
        ),
        play_time: (previous.career_savegame.play_time != current.career_savegame.play_time)
            .then_some(current.career_savegame.play_time),
        players: player_changes(&previous.slots.players, &current.slots.players, now),
        observed_at: now,
    }
}

fn server_changes(previous: &Snapshot, current: &Snapshot) -> Vec<ServerField> {
    let (before, after) = (&previous.server, &current.server);
    [
        (ServerField::Game, &before.game, &after.game),
        (ServerField::Version, &before.version, &after.version),
        (ServerField::Name, &before.name, &after.name),
        (ServerField::MapName, &before.map_name, &after.map_name),
    ]
    .into_iter()
    .filter(|(_, old, new)| !new.is_empty() && old != new)
    .map(|(field, _, _)| field)
    .collect()
}

/// Classify mod changes of one category in three passes.
///
/// 1. Index the previous entries by mod name.
/// 2. A hash that is new is an update when its name was already installed,
///    otherwise an addition.
/// 3. A hash that disappeared is a removal unless an update in pass 2
///    carries the same name.
pub fn classify_mods(
    previous: &BTreeMap<String, ModInfo>,
    current: &BTreeMap<String, ModInfo>,
    kind: ModKind,
) -> ModChanges {
    let previous_names: HashSet<&str> = previous
        .values()
        .filter(|m| m.kind() == kind)
        .map(|m| m.name.as_str())
        .collect();

    let mut changes = ModChanges::default();
    for info in current.values().filter(|m| m.kind() == kind) {
        if previous.contains_key(&info.hash) {
            continue;
        }
        if previous_names.contains(info.name.as_str()) {
            changes.updated.push(info.clone());
        } else {
            changes.added.push(info.clone());
        }
    }

    let updated_names: HashSet<&str> = changes.updated.iter().map(|m| m.name.as_str()).collect();
    let removed: Vec<ModInfo> = previous
        .values()
        .filter(|m| m.kind() == kind)
        .filter(|m| !current.contains_key(&m.hash))
        .filter(|m| !updated_names.contains(m.name.as_str()))
        .cloned()
        .collect();
    changes.removed = removed;

    for list in [&mut changes.added, &mut changes.updated, &mut changes.removed] {
        list.sort_by(|a, b| compare_case_insensitive(&a.text, &b.text));
    }
    changes
}

fn player_changes(
    previous: &BTreeMap<String, Player>,
    current: &BTreeMap<String, Player>,
    now: DateTime<Utc>,
) -> PlayerChanges {
    let mut joined: Vec<Player> = current
        .iter()
        .filter(|(name, _)| !previous.contains_key(*name))
        .map(|(_, p)| p.clone())
        .collect();
    joined.sort_by(|a, b| compare_case_insensitive(&a.name, &b.name));

    let mut left: Vec<DepartedPlayer> = previous
        .iter()
        .filter(|(name, _)| !current.contains_key(*name))
        .map(|(name, p)| DepartedPlayer {
            name: name.clone(),
            session_minutes: session_minutes(p.first_seen, now),
        })
        .collect();
    left.sort_by(|a, b| compare_case_insensitive(&a.name, &b.name));

    PlayerChanges { joined, left }
}

/// Whole minutes between two instants, rounded to nearest, never negative.
fn session_minutes(first_seen: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (now - first_seen).num_milliseconds().max(0);
    (millis + 30_000) / 60_000
}
