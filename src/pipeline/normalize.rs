//! Conversion of raw feed documents into a [`Snapshot`].
//!
//! Values that only make sense with history are merged from the previous
//! snapshot here: blank server attributes keep their old value and players
//! who stay online keep their first-seen time.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{CareerSavegame, ModInfo, Player, ServerInfo, Slots, Snapshot};
use crate::services::{RawStatus, StatusSource};
use crate::utils::parse_leading_int;
use crate::utils::xml::XmlElement;

/// Fetch both feeds and normalize them against the previous snapshot.
///
/// `Err` means the server was unreachable; `Ok(None)` means it answered with
/// something that does not look like a running server.
pub async fn fetch_and_normalize(
    source: &dyn StatusSource,
    previous: &Snapshot,
    now: DateTime<Utc>,
) -> Result<Option<Snapshot>> {
    let raw = source.fetch().await?;
    Ok(normalize(&raw, previous, now))
}

/// Build a snapshot from parsed feed documents.
pub fn normalize(raw: &RawStatus, previous: &Snapshot, now: DateTime<Utc>) -> Option<Snapshot> {
    let stats = raw
        .server_stats
        .as_ref()
        .filter(|root| root.name == "Server" && !root.attributes.is_empty())?;
    let savegame = raw
        .career_savegame
        .as_ref()
        .filter(|root| root.name == "careerSavegame")?;

    let server = ServerInfo {
        game: attr_or(stats, "game", &previous.server.game),
        version: attr_or(stats, "version", &previous.server.version),
        name: attr_or(stats, "name", &previous.server.name),
        map_name: attr_or(stats, "mapName", &previous.server.map_name),
        online: true,
        unreachable: false,
    };

    Some(Snapshot {
        server,
        mods: normalize_mods(stats),
        slots: normalize_slots(stats, &previous.slots.players, now),
        career_savegame: CareerSavegame {
            money: statistic(savegame, "money"),
            play_time: statistic(savegame, "playTime"),
        },
    })
}

fn attr_or(element: &XmlElement, key: &str, fallback: &str) -> String {
    element
        .attr(key)
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Zero, one or many `Mod` entries all come out as a map keyed by hash.
fn normalize_mods(stats: &XmlElement) -> BTreeMap<String, ModInfo> {
    let Some(list) = stats.child("Mods") else {
        return BTreeMap::new();
    };

    list.children_named("Mod")
        .filter_map(|entry| {
            let Some(hash) = entry.attr("hash").filter(|h| !h.is_empty()) else {
                log::debug!("Skipping mod entry without hash: {:?}", entry.attributes);
                return None;
            };
            let info = ModInfo {
                hash: hash.to_string(),
                text: entry.inner_text().unwrap_or_default().to_string(),
                name: entry.attr("name").unwrap_or_default().to_string(),
                version: entry.attr("version").unwrap_or_default().to_string(),
                author: entry.attr("author").unwrap_or_default().to_string(),
            };
            Some((info.hash.clone(), info))
        })
        .collect()
}

fn normalize_slots(
    stats: &XmlElement,
    previous_players: &BTreeMap<String, Player>,
    now: DateTime<Utc>,
) -> Slots {
    let Some(slots) = stats.child("Slots") else {
        return Slots::default();
    };

    let players = slots
        .children_named("Player")
        .filter_map(XmlElement::inner_text)
        .map(|name| {
            let first_seen = previous_players
                .get(name)
                .map_or(now, |player| player.first_seen);
            (name.to_string(), Player::new(name, first_seen))
        })
        .collect();

    Slots {
        num_used: count_attr(slots, "numUsed"),
        capacity: count_attr(slots, "capacity"),
        players,
    }
}

fn count_attr(element: &XmlElement, key: &str) -> u32 {
    element
        .attr(key)
        .and_then(parse_leading_int)
        .map_or(0, |n| n.clamp(0, i64::from(u32::MAX)) as u32)
}

fn statistic(savegame: &XmlElement, key: &str) -> i64 {
    savegame
        .find(&["statistics", key])
        .and_then(XmlElement::inner_text)
        .and_then(parse_leading_int)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const STATS: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="no" ?>
<Server game="Farming Simulator 22" version="1.14.0.0" name="Sunny Acres" mapName="Elmcreek" dayTime="46920000" mapOverviewFilename="" mapSize="2048">
    <Slots capacity="16" numUsed="2">
        <Player isUsed="true" isAdmin="false" uptime="22" x="1" y="2" z="3">Alice</Player>
        <Player isUsed="true" isAdmin="true" uptime="93">bob</Player>
        <Player isUsed="false"/>
    </Slots>
    <Mods>
        <Mod name="FS22_Courseplay" author="Courseplay.devTeam" version="7.3.0.1" hash="aa11" hasMultiplayerSupport="true">Courseplay</Mod>
        <Mod name="pdlc_claasPack" author="GIANTS Software" version="1.0.0.0" hash="bb22" hasMultiplayerSupport="true">CLAAS Harvest Pack</Mod>
    </Mods>
</Server>"#;

    const SAVEGAME: &str = r#"<careerSavegame revision="2" valid="true">
    <statistics>
        <money>1500</money>
        <playTime>600.25</playTime>
    </statistics>
</careerSavegame>"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn raw(stats: &str, savegame: &str) -> RawStatus {
        RawStatus::from_markup(stats, savegame)
    }

    #[test]
    fn test_full_document() {
        let snapshot = normalize(&raw(STATS, SAVEGAME), &Snapshot::default(), now()).unwrap();

        assert_eq!(snapshot.server.name, "Sunny Acres");
        assert_eq!(snapshot.server.map_name, "Elmcreek");
        assert!(snapshot.server.online);
        assert!(!snapshot.server.unreachable);

        assert_eq!(snapshot.mods.len(), 2);
        assert_eq!(snapshot.mods["aa11"].text, "Courseplay");
        assert!(snapshot.mods["bb22"].is_dlc());

        assert_eq!(snapshot.slots.num_used, 2);
        assert_eq!(snapshot.slots.capacity, 16);
        let names: Vec<_> = snapshot.slots.players.keys().cloned().collect();
        assert_eq!(names, vec!["Alice", "bob"]);
        assert_eq!(snapshot.slots.players["Alice"].first_seen, now());

        assert_eq!(snapshot.career_savegame.money, 1500);
        assert_eq!(snapshot.career_savegame.play_time, 600);
    }

    #[test]
    fn test_missing_root_is_offline() {
        assert!(normalize(&raw("<Server/>", SAVEGAME), &Snapshot::default(), now()).is_none());
        assert!(normalize(&raw("garbage", SAVEGAME), &Snapshot::default(), now()).is_none());
        assert!(normalize(&raw(STATS, "garbage"), &Snapshot::default(), now()).is_none());
        assert!(normalize(&RawStatus::default(), &Snapshot::default(), now()).is_none());
    }

    #[test]
    fn test_blank_attributes_keep_previous_values() {
        let mut previous = Snapshot::default();
        previous.server.game = "Farming Simulator 22".to_string();
        previous.server.version = "1.13.0.0".to_string();
        previous.server.map_name = "Silverrun Forest".to_string();

        let stats = r#"<Server name="Sunny Acres" version="" game=""><Slots capacity="4" numUsed="0"/></Server>"#;
        let snapshot = normalize(&raw(stats, SAVEGAME), &previous, now()).unwrap();

        assert_eq!(snapshot.server.name, "Sunny Acres");
        assert_eq!(snapshot.server.game, "Farming Simulator 22");
        assert_eq!(snapshot.server.version, "1.13.0.0");
        assert_eq!(snapshot.server.map_name, "Silverrun Forest");
    }

    #[test]
    fn test_mod_list_shapes() {
        let none = r#"<Server name="s"><Slots capacity="1" numUsed="0"/></Server>"#;
        let empty = r#"<Server name="s"><Mods/></Server>"#;
        let one = r#"<Server name="s"><Mods><Mod name="FS22_a" hash="h1" version="1" author="x">A</Mod></Mods></Server>"#;

        let count = |stats: &str| {
            normalize(&raw(stats, SAVEGAME), &Snapshot::default(), now())
                .unwrap()
                .mods
                .len()
        };
        assert_eq!(count(none), 0);
        assert_eq!(count(empty), 0);
        assert_eq!(count(one), 1);
        assert_eq!(count(STATS), 2);
    }

    #[test]
    fn test_first_seen_carried_forward() {
        let earlier = now() - Duration::minutes(45);
        let mut previous = Snapshot::default();
        previous
            .slots
            .players
            .insert("Alice".to_string(), Player::new("Alice", earlier));

        let snapshot = normalize(&raw(STATS, SAVEGAME), &previous, now()).unwrap();
        assert_eq!(snapshot.slots.players["Alice"].first_seen, earlier);
        assert_eq!(snapshot.slots.players["bob"].first_seen, now());
    }

    #[test]
    fn test_first_seen_stable_across_many_polls() {
        let start = now();
        let mut snapshot = normalize(&raw(STATS, SAVEGAME), &Snapshot::default(), start).unwrap();
        for i in 1..=10 {
            let later = start + Duration::minutes(i);
            snapshot = normalize(&raw(STATS, SAVEGAME), &snapshot, later).unwrap();
        }
        assert_eq!(snapshot.slots.players["Alice"].first_seen, start);
        assert_eq!(snapshot.slots.players["bob"].first_seen, start);
    }

    #[test]
    fn test_non_numeric_statistics_default_to_zero() {
        let savegame = "<careerSavegame><statistics><money>lots</money></statistics></careerSavegame>";
        let snapshot = normalize(&raw(STATS, savegame), &Snapshot::default(), now()).unwrap();
        assert_eq!(snapshot.career_savegame.money, 0);
        assert_eq!(snapshot.career_savegame.play_time, 0);
    }
}
