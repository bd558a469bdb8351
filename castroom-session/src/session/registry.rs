use castroom_core::PeerIdentity;

/// Viewer identities with an open data link to this host.
///
/// Set semantics; arrival order is kept for display only.
#[derive(Debug, Default)]
pub struct Registry {
    members: Vec<PeerIdentity>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an identity; a no-op when already present.
    pub fn add(&mut self, identity: PeerIdentity) -> bool {
        if self.members.contains(&identity) {
            return false;
        }
        self.members.push(identity);
        true
    }

    /// Removes an identity; a no-op when absent.
    pub fn remove(&mut self, identity: &PeerIdentity) -> bool {
        let before = self.members.len();
        self.members.retain(|member| member != identity);
        self.members.len() != before
    }

    pub fn contains(&self, identity: &PeerIdentity) -> bool {
        self.members.contains(identity)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn members(&self) -> &[PeerIdentity] {
        &self.members
    }
}
