// src/utils/text.rs

//! Text helpers for notification rendering.

/// `1 minute` / `2 minutes`.
pub fn plural(count: i64, unit: &str) -> String {
    format!("{} {}{}", count, unit, if count == 1 { "" } else { "s" })
}

/// Render a duration in minutes as days, hours and minutes.
///
/// Leading zero units are omitted; minutes are always shown.
pub fn format_minutes(minutes: i64) -> String {
    let minutes = minutes.max(0);
    let days = minutes / 1440;
    let hours = (minutes % 1440) / 60;
    let rest = minutes % 60;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&plural(days, "day"));
        out.push_str(", ");
    }
    if days > 0 || hours > 0 {
        out.push_str(&plural(hours, "hour"));
        out.push_str(" and ");
    }
    out.push_str(&plural(rest, "minute"));
    out
}

/// Join names into an English conjunctive list: `A`, `A and B`, `A, B, and C`.
pub fn format_list<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [] => String::new(),
        [one] => one.as_ref().to_string(),
        [first, second] => format!("{} and {}", first.as_ref(), second.as_ref()),
        [init @ .., last] => {
            let head: Vec<&str> = init.iter().map(AsRef::as_ref).collect();
            format!("{}, and {}", head.join(", "), last.as_ref())
        }
    }
}

/// Sort names case-insensitively, falling back to the exact text for ties.
pub fn sort_case_insensitive(names: &mut [String]) {
    names.sort_by(|a, b| compare_case_insensitive(a, b));
}

/// Case-insensitive ordering with a stable tie-break on the exact text.
pub fn compare_case_insensitive(a: &str, b: &str) -> std::cmp::Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Group digits in threes with commas: `1234567` → `1,234,567`.
pub fn group_thousands(value: impl Into<i128>) -> String {
    let value = value.into();
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Parse the leading base-10 integer of a string.
///
/// Leading whitespace and a sign are accepted and parsing stops at the first
/// non-digit, so `"12.7"` yields 12. Returns `None` when no digit is found.
pub fn parse_leading_int(input: &str) -> Option<i64> {
    let s = input.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let magnitude: i64 = rest[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
