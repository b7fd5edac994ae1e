use std::time::Duration;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub fn truncate_unicode(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > max_width.saturating_sub(1) {
            result.push('\u{2026}');
            break;
        }
        result.push(ch);
        width += ch_width;
    }
    result
}

/// Pads (or truncates) to an exact display width.
pub fn pad_unicode(s: &str, width: usize) -> String {
    let truncated = truncate_unicode(s, width);
    let pad = width.saturating_sub(truncated.width());
    format!("{truncated}{}", " ".repeat(pad))
}

/// KB/s below 1000, MB/s from there up.
pub fn format_rate(kbs: f64) -> String {
    if kbs >= 1000.0 {
        format!("{:.2} MB/s", kbs / 1024.0)
    } else {
        format!("{:.1} KB/s", kbs)
    }
}

/// "used/total GB" with one decimal.
pub fn format_memory_gb(used: u64, total: u64) -> String {
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;
    format!("{:.1}/{:.1} GB", used as f64 / GB, total as f64 / GB)
}

pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let minutes = (secs % 3600) / 60;
    format!("{days}d {hours}h {minutes}m")
}

pub fn format_frequency(mhz: Option<f64>) -> String {
    match mhz {
        Some(mhz) => format!("{mhz:.0} MHz"),
        None => "N/A".to_string(),
    }
}
