const SIZE_UNITS: &[&str] = &["Bytes", "KB", "MB", "GB"];
const UNIT_SIZE: f64 = 1024.0;

/// Human readable file size: `0 Bytes`, `500 Bytes`, `1.5 KB`, `2.25 MB`.
/// At most two decimals, trailing zeros dropped. Sizes past GB stay in GB.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= UNIT_SIZE && unit_index < SIZE_UNITS.len() - 1 {
        size /= UNIT_SIZE;
        unit_index += 1;
    }

    let fixed = format!("{:.2}", size);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, SIZE_UNITS[unit_index])
}

/// `245` -> `4h 5m`
pub fn format_minutes(minutes: u64) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}
