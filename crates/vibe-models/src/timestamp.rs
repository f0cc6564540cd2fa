//! Frame time markers.

/// Default spacing between extracted frames, in seconds.
pub const DEFAULT_FRAME_INTERVAL_SECS: u32 = 2;

/// Render the `MM:SS` marker for a frame index.
///
/// Minutes are not wrapped into hours; a 90 minute video yields `"90:00"`.
///
/// # Examples
/// ```
/// use vibe_models::timestamp::frame_timestamp;
/// assert_eq!(frame_timestamp(0, 2), "00:00");
/// assert_eq!(frame_timestamp(31, 2), "01:02");
/// ```
pub fn frame_timestamp(index: u32, interval_secs: u32) -> String {
    let total = index as u64 * interval_secs as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_timestamp() {
        assert_eq!(frame_timestamp(0, DEFAULT_FRAME_INTERVAL_SECS), "00:00");
        assert_eq!(frame_timestamp(1, DEFAULT_FRAME_INTERVAL_SECS), "00:02");
        assert_eq!(frame_timestamp(30, DEFAULT_FRAME_INTERVAL_SECS), "01:00");
        assert_eq!(frame_timestamp(2700, DEFAULT_FRAME_INTERVAL_SECS), "90:00");
    }
}
