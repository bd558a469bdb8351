mod backoff;
mod config;
mod constraints;
mod error;
mod identity;
mod link;
mod sdp;

pub use backoff::{MAX_RECONNECT_ATTEMPTS, ReconnectState};
pub use config::{
    BrokerConfig, BundlePolicy, ICE_CANDIDATE_POOL_SIZE, IceServerConfig, RtcpMuxPolicy,
    STUN_SERVERS, SdpSemantics,
};
pub use constraints::{CaptureConstraints, ContentHint, DisplaySurface, TrackConstraints};
pub use error::{BrokerError, CaptureError, PlaybackError, RoomCodeError, TransientCause};
pub use identity::{PeerIdentity, RoomCode, room_from_link, share_link};
pub use link::{LinkPhase, LinkSignal, LinkTransition};
pub use sdp::{VIDEO_BITRATE_CAP_KBPS, with_video_bitrate_cap};
