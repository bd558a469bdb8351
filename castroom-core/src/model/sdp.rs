/// Bitrate ceiling injected into the video section of outbound offers, kbps.
pub const VIDEO_BITRATE_CAP_KBPS: u32 = 8_000;

/// Inserts a `b=AS:` bandwidth line after each video media id line.
///
/// Applied to an offer before it is handed to the broker; sections other
/// than video are left untouched.
pub fn with_video_bitrate_cap(sdp: &str, kbps: u32) -> String {
    let mut out = String::with_capacity(sdp.len() + 16);
    for line in sdp.split_inclusive('\n') {
        out.push_str(line);
        if line.trim_end_matches(['\r', '\n']) == "a=mid:video" {
            out.push_str(&format!("b=AS:{kbps}\r\n"));
        }
    }
    out
}
