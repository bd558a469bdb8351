pub mod broker;
pub mod media;
pub mod notify;
pub mod session;

pub use broker::{
    Broker, BrokerSession, CallHandle, CallId, LoopbackBroker, SdpTransform, SessionEvent,
};
pub use media::{
    CaptureEvent, CaptureSource, DummyCaptureSource, DummySink, DummyTrack, LocalStream,
    MediaTrack, RemoteStream, TrackKind, VideoSink,
};
pub use notify::{Notice, NoticeAction, NoticeKind, Notifier};
pub use session::{
    HostCommand, HostHandle, HostSession, HostStatus, InteractionFlag, PlaybackNegotiator,
    PlaybackState, Registry, TimerEvent, ViewerCommand, ViewerHandle, ViewerSession, ViewerStatus,
};
