//! Lap time rendering

/// Rendering used for zero, absent or unknown times
pub const ZERO_TIME: &str = "00:00.000";

/// Render milliseconds as `MM:SS.mmm`. Minutes keep growing past 99.
///
/// ```rust
/// use lapgate::race::format_time;
///
/// assert_eq!(format_time(83_456), "01:23.456");
/// assert_eq!(format_time(0), "00:00.000");
/// ```
pub fn format_time(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;
    format!("{minutes:02}:{seconds:02}.{millis:03}")
}

/// Render a signed difference; `None` stands for an infinitely slow racer.
pub fn format_delta(delta: Option<i64>) -> String {
    match delta {
        None | Some(0) => ZERO_TIME.to_string(),
        Some(ms) if ms < 0 => format!("-{}", format_time(ms.unsigned_abs())),
        Some(ms) => format_time(ms.unsigned_abs()),
    }
}

/// Lap-count deficit, `+1 Lap` or `+N Laps`
pub fn format_lap_deficit(laps: u32) -> String {
    if laps == 1 { "+1 Lap".to_string() } else { format!("+{laps} Laps") }
}
