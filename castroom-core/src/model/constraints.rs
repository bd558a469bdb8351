use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplaySurface {
    Monitor,
    Window,
    Browser,
}

/// Hint applied to a video track so the encoder favors legibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentHint {
    Detail,
    Motion,
    Text,
}

/// Constraints requested when acquiring a display capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConstraints {
    pub ideal_width: u32,
    pub max_width: u32,
    pub ideal_height: u32,
    pub max_height: u32,
    pub ideal_frame_rate: u32,
    pub max_frame_rate: u32,
    pub display_surface: DisplaySurface,
    pub audio: bool,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 1920,
            max_width: 2560,
            ideal_height: 1080,
            max_height: 1440,
            ideal_frame_rate: 25,
            max_frame_rate: 30,
            display_surface: DisplaySurface::Monitor,
            audio: true,
        }
    }
}

/// Secondary constraint pass applied to the acquired video track.
///
/// Failure of this pass is non-fatal; the stream is shared as acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackConstraints {
    pub ideal_width: u32,
    pub min_width: u32,
    pub ideal_height: u32,
    pub min_height: u32,
    pub ideal_frame_rate: u32,
    pub min_frame_rate: u32,
}

impl TrackConstraints {
    pub fn refinement() -> Self {
        Self {
            ideal_width: 1920,
            min_width: 1280,
            ideal_height: 1080,
            min_height: 720,
            ideal_frame_rate: 24,
            min_frame_rate: 15,
        }
    }
}
