/// Commands the embedding UI sends to a host session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    /// Begin display capture and fan the stream out to viewers.
    StartCapture,
    /// Stop capture, closing every outbound call.
    StopCapture,
    /// Tear the whole session down.
    EndSession,
}

/// Commands the embedding UI sends to a viewer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerCommand {
    ToggleMute,
    /// A tap on the video surface.
    SurfaceTapped,
    /// First interaction anywhere on the page.
    PageInteracted,
    Leave,
}
