//! Display formatting for result rows.
//!
//! Frame numbers are turned into clock strings and video links here so the
//! CLI and any other frontend render them the same way.

/// Format whole seconds as `M:SS`.
///
/// # Examples
/// ```
/// use valo_types::formatting::format_duration;
/// assert_eq!(format_duration(0), "0:00");
/// assert_eq!(format_duration(125), "2:05");
/// ```
pub fn format_duration(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Format whole seconds as `H:MM:SS`, dropping the hour when zero.
///
/// # Examples
/// ```
/// use valo_types::formatting::format_timestamp;
/// assert_eq!(format_timestamp(59), "0:59");
/// assert_eq!(format_timestamp(3_725), "1:02:05");
/// ```
pub fn format_timestamp(secs: u64) -> String {
    let hours = secs / 3600;
    if hours == 0 {
        return format_duration(secs);
    }
    format!("{}:{:02}:{:02}", hours, (secs % 3600) / 60, secs % 60)
}

/// Convert an absolute frame number to whole seconds, rounding down.
///
/// Non-positive frames and frame rates yield 0.
pub fn frame_to_secs(frame: i64, fps: f64) -> u64 {
    if frame <= 0 || fps <= 0.0 {
        return 0;
    }
    (frame as f64 / fps).floor() as u64
}

/// Extract the video id from a `watch?v=<id>` style link.
///
/// # Examples
/// ```
/// use valo_types::formatting::video_id;
/// assert_eq!(video_id("https://www.youtube.com/watch?v=abc123"), Some("abc123"));
/// assert_eq!(video_id("https://www.youtube.com/watch?v=abc123&t=5"), Some("abc123"));
/// assert_eq!(video_id("https://example.com/video"), None);
/// ```
pub fn video_id(vod_link: &str) -> Option<&str> {
    let id = vod_link.split('=').nth(1)?;
    let id = id.split('&').next().unwrap_or(id).trim();
    if id.is_empty() { None } else { Some(id) }
}

/// Link to the watch page, optionally at a timestamp.
pub fn watch_link(video_id: &str, secs: Option<u64>) -> String {
    match secs {
        Some(t) if t > 0 => format!("https://www.youtube.com/watch?v={video_id}&t={t}"),
        _ => format!("https://www.youtube.com/watch?v={video_id}"),
    }
}

/// Link for an embedded player, optionally starting at a timestamp.
pub fn embed_link(video_id: &str, secs: Option<u64>) -> String {
    match secs {
        Some(t) if t > 0 => format!("https://www.youtube.com/embed/{video_id}?start={t}&rel=0"),
        _ => format!("https://www.youtube.com/embed/{video_id}?rel=0"),
    }
}
