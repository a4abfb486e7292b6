// Listing column formatting

use chrono::{DateTime, Utc};

const UNITS: &[char] = &['K', 'M', 'G', 'T', 'P', 'E'];

/// Human readable size: bytes below 1 KiB, otherwise two decimals under 10,
/// one decimal under 100 and none above (e.g. "1.50 KB", "12.3 MB", "512 GB").
pub fn human_file_size(size: u64) -> String {
    if size < 1024 {
        return format!("{} B", size);
    }

    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = value.round();
    let formatted = if rounded < 10.0 {
        format!("{:.2}", value)
    } else if rounded < 100.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", rounded)
    };
    format!("{} {}B", formatted, UNITS[unit - 1])
}

/// "Last Modified" column text
pub fn format_modified(modified: &DateTime<Utc>, format: &str) -> String {
    modified.format(format).to_string()
}
