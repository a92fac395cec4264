//! The logical player a connection speaks for.

use mazelink_protocol::PlayerName;

/// A player's identity as seen by the relay.
///
/// The binding between an identity and a connection lives in the
/// [`SessionDirectory`](crate::SessionDirectory), not on the connection,
/// so nothing here refers to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerIdentity {
    name: PlayerName,
    /// Assigned by the downstream authority, at most once.
    authority_id: Option<u64>,
}

impl PlayerIdentity {
    /// Creates an identity with no authority id yet.
    pub fn new(name: PlayerName) -> Self {
        Self {
            name,
            authority_id: None,
        }
    }

    /// The current display name.
    pub fn name(&self) -> &PlayerName {
        &self.name
    }

    /// The authority-assigned id, if one has been assigned.
    pub fn authority_id(&self) -> Option<u64> {
        self.authority_id
    }

    /// Records the authority id. Returns the id already present if it
    /// differs from `id`, leaving the identity unchanged.
    pub(crate) fn set_authority_id(&mut self, id: u64) -> Result<(), u64> {
        match self.authority_id {
            Some(current) if current != id => Err(current),
            _ => {
                self.authority_id = Some(id);
                Ok(())
            }
        }
    }
}
