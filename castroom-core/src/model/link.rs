/// Lifecycle of one data link, host or viewer side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPhase {
    Opening,
    Open,
    ClosedClean,
    ClosedError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSignal {
    Opened,
    Errored,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTransition {
    Entered(LinkPhase),
    Ignored,
}

impl LinkPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, LinkPhase::ClosedClean | LinkPhase::ClosedError)
    }

    /// Feeds one lifecycle signal to the link.
    ///
    /// Error and close are mutually exclusive terminal signals; anything
    /// delivered after a terminal phase is ignored, so exactly one teardown
    /// path runs per link instance.
    pub fn apply(self, signal: LinkSignal) -> LinkTransition {
        if self.is_terminal() {
            return LinkTransition::Ignored;
        }
        match signal {
            LinkSignal::Opened if self == LinkPhase::Opening => {
                LinkTransition::Entered(LinkPhase::Open)
            }
            LinkSignal::Opened => LinkTransition::Ignored,
            LinkSignal::Errored => LinkTransition::Entered(LinkPhase::ClosedError),
            LinkSignal::Closed => LinkTransition::Entered(LinkPhase::ClosedClean),
        }
    }
}
