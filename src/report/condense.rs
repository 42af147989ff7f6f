//! Condensed rendering of numbers and durations for narrow columns

use crate::slurm::TimeLimit;

/// Renders `value` right-justified in `width` characters. Values with more digits than
/// the column has room for are scaled down and given a `k`, `m`, or `g` suffix, depending
/// on how many digits they exceed the width by. Values that cannot be condensed are printed
/// in full, overflowing the column.
pub fn condense(value: u64, width: usize) -> String {
    let plain = value.to_string();
    let width = width.max(1);
    let inner = width - 1;

    match plain.len().saturating_sub(width) {
        1 | 2 => format!("{:>inner$}k", value / 1_000),
        3 => format!("{:>inner$.1}m", value as f64 / 1_000_000.0),
        4 | 5 => format!("{:>inner$}m", value / 1_000_000),
        6 => format!("{:>inner$.1}g", value as f64 / 1_000_000_000.0),
        7 | 8 => format!("{:>inner$}g", value / 1_000_000_000),
        _ => format!("{:>width$}", plain),
    }
}

/// Renders `value` without padding, condensing values with five or more digits
pub fn condense_label(value: u64) -> String {
    let plain = value.to_string();
    match plain.len() {
        5 | 6 => format!("{}k", value / 1_000),
        7 => format!("{:.1}m", value as f64 / 1_000_000.0),
        8 | 9 => format!("{}m", value / 1_000_000),
        10 => format!("{:.1}g", value as f64 / 1_000_000_000.0),
        11 | 12 => format!("{}g", value / 1_000_000_000),
        _ => plain,
    }
}

/// Renders a time limit in `width` characters, either verbally (`2 days 3 hour`) if that
/// fits, or as `DAYS-HH:MM`. Unlimited and unset limits are rendered as a dash.
pub fn duration(limit: TimeLimit, width: usize, as_date: bool) -> String {
    let minutes = match limit {
        TimeLimit::Minutes(minutes) => minutes,
        TimeLimit::Unlimited | TimeLimit::Unset => return format!("{:^width$}", "-"),
    };

    let days = minutes / 1440;
    let hours = (minutes % 1440) / 60;
    let mins = minutes % 60;
    let date = format!("{:>4}-{:02}:{:02}", days, hours, mins);

    if as_date {
        return format!("{:>width$}", date);
    }

    let mut parts = Vec::new();
    if days != 0 {
        parts.push(format!("{} days", days));
    }
    if hours != 0 {
        parts.push(format!("{} hour", hours));
    }
    if mins != 0 || parts.is_empty() {
        parts.push(format!("{} mins", mins));
    }

    let verbal = parts.join(" ");
    // The verbal form needs room for a trailing space
    if verbal.len() + 1 < width {
        format!("{:>width$}", verbal)
    } else {
        format!("{:>width$}", date)
    }
}

/// Renders a duration without padding, for machine readable output
pub fn duration_label(limit: TimeLimit) -> String {
    match limit {
        TimeLimit::Minutes(minutes) => format!(
            "{}-{:02}:{:02}",
            minutes / 1440,
            (minutes % 1440) / 60,
            minutes % 60
        ),
        TimeLimit::Unlimited => "UNLIMITED".to_string(),
        TimeLimit::Unset => "-".to_string(),
    }
}
