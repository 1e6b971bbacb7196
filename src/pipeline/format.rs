//! Rendering of a [`ChangeSet`] into a single notification message.
//!
//! Blocks are emitted in a fixed order: back online, server summary, DLCs,
//! mods, money, play time, player summary, joins, leaves. Mod and DLC blocks
//! collapse to counts when the itemized list exceeds the category budget.

use std::fmt::Write;

use crate::models::{ModInfo, ModKind, Snapshot};
use crate::pipeline::diff::{ChangeSet, ModChanges};
use crate::utils::text::{format_list, format_minutes, group_thousands, sort_case_insensitive};

/// Render the changes, or `None` when there is nothing to announce.
pub fn format_changes(changes: &ChangeSet, current: &Snapshot) -> Option<String> {
    if changes.is_empty() {
        return None;
    }

    let mut out = String::new();

    if changes.came_online {
        out.push_str(":tractor: The server is **back online**!\n");
    }

    if changes.server_updated() {
        out.push_str(&server_summary(current));
        out.push_str(&mod_block(changes.mods_of(ModKind::Dlc), ModKind::Dlc));
        out.push_str(&mod_block(changes.mods_of(ModKind::Mod), ModKind::Mod));
    }

    if let Some(money) = changes.money {
        let (arrow, sign) = if money.is_increase() {
            (":arrow_up_small:", "+")
        } else {
            (":arrow_down_small:", "-")
        };
        let _ = writeln!(
            out,
            ":moneybag: Savegame Money: {} **{}** ({}{}).",
            arrow,
            group_thousands(money.current),
            sign,
            group_thousands(money.difference().abs()),
        );
    }

    if let Some(play_time) = changes.play_time {
        let _ = writeln!(
            out,
            ":watch: Savegame Play Time: **{}**.",
            format_minutes(play_time)
        );
    }

    out.push_str(&player_block(changes, current));

    let message = out.trim();
    (!message.is_empty()).then(|| message.to_string())
}

fn server_summary(current: &Snapshot) -> String {
    let server = &current.server;
    let dlc_count = current.mod_count(ModKind::Dlc);
    let mod_count = current.mod_count(ModKind::Mod);
    format!(
        ":tractor: The server **{}** has been updated: {} ({}), Map: {}, DLC{}: {}, Mod{}: {}\n",
        server.name,
        server.game,
        server.version,
        server.map_name,
        plural_suffix(dlc_count),
        dlc_count,
        plural_suffix(mod_count),
        mod_count,
    )
}

/// Itemized block for one category, or the count-only form over budget.
fn mod_block(changes: &ModChanges, kind: ModKind) -> String {
    let itemized = itemized_mods(changes, kind);
    if itemized.chars().count() <= kind.character_budget() {
        itemized
    } else {
        mod_counts(changes, kind)
    }
}

fn itemized_mods(changes: &ModChanges, kind: ModKind) -> String {
    let mut out = String::new();
    let groups: [(&[ModInfo], String, &str); 3] = [
        (&changes.added, new_header(changes.added.len(), kind), ":star2:"),
        (&changes.updated, updated_header(changes.updated.len(), kind), ":star:"),
        (&changes.removed, removed_header(changes.removed.len(), kind), ":x:"),
    ];

    for (items, header, marker) in groups {
        if items.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{header}:");
        for item in items {
            let _ = writeln!(
                out,
                "    {} **{} {}** by {} (`{}`)",
                marker, item.text, item.version, item.author, item.hash
            );
        }
    }
    out
}

fn mod_counts(changes: &ModChanges, kind: ModKind) -> String {
    let mut out = String::new();
    if !changes.added.is_empty() {
        let _ = writeln!(out, "{}.", new_header(changes.added.len(), kind));
    }
    if !changes.updated.is_empty() {
        let _ = writeln!(out, "{}.", updated_header(changes.updated.len(), kind));
    }
    if !changes.removed.is_empty() {
        let _ = writeln!(out, "{}.", removed_header(changes.removed.len(), kind));
    }
    out
}

fn new_header(count: usize, kind: ModKind) -> String {
    format!(
        "{} The server has **{}** new {}{}",
        kind.emoji(),
        count,
        kind.noun(),
        plural_suffix(count)
    )
}

fn updated_header(count: usize, kind: ModKind) -> String {
    format!(
        "{} The server has **{}** updated {}{}",
        kind.emoji(),
        count,
        kind.noun(),
        plural_suffix(count)
    )
}

fn removed_header(count: usize, kind: ModKind) -> String {
    format!(
        "{} The server had **{}** {}{} removed",
        kind.emoji(),
        count,
        kind.noun(),
        plural_suffix(count)
    )
}

fn player_block(changes: &ChangeSet, current: &Snapshot) -> String {
    let players = &changes.players;
    if players.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    let slots = &current.slots;
    let online = if slots.num_used > 0 {
        let mut names: Vec<String> = slots.players.keys().cloned().collect();
        sort_case_insensitive(&mut names);
        format!(": **{}**", format_list(&names))
    } else {
        String::new()
    };
    let _ = writeln!(
        out,
        ":farmer: **{}** of {} players online{} (<t:{}>).",
        slots.num_used,
        slots.capacity,
        online,
        changes.observed_at.timestamp()
    );

    for player in &players.joined {
        let _ = writeln!(out, "    :arrow_right: **{}** just joined the server.", player.name);
    }
    for player in &players.left {
        let _ = writeln!(
            out,
            "    :arrow_left: **{}** just left the server after playing for **{}**.",
            player.name,
            format_minutes(player.session_minutes)
        );
    }
    out
}

fn plural_suffix(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}
