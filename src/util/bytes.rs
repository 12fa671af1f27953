//! Human-readable byte counts for form messages.

const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];

/// Format a byte count in IEC units with at most one decimal, e.g. `5 MiB` or `1.5 KiB`.
pub fn format_size(bytes: u64) -> String {
    let mut unit = 0;
    let mut scale: u64 = 1;
    while unit + 1 < UNITS.len() && bytes >= scale * 1024 {
        scale *= 1024;
        unit += 1;
    }

    let tenths = (bytes * 10 + scale / 2) / scale;
    if tenths % 10 == 0 {
        format!("{} {}", tenths / 10, UNITS[unit])
    } else {
        format!("{}.{} {}", tenths / 10, tenths % 10, UNITS[unit])
    }
}
