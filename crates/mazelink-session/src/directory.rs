//! The session directory: which connection speaks for which player.
//!
//! # Concurrency note
//!
//! `SessionDirectory` is NOT thread-safe by itself; it uses plain
//! `HashMap`s. The relay owns one instance behind a mutex and never holds
//! that lock across an `.await`.

use std::collections::HashMap;

use mazelink_protocol::PlayerName;
use mazelink_transport::ConnectionId;

use crate::{PlayerIdentity, SessionError};

/// Bidirectional mapping between live connections and player identities.
///
/// ## Lifecycle
///
/// ```text
/// register(c, "Bob") ──→ [c ↔ Bob] ──register(c, "Ann")──→ [c ↔ Ann]
///                            │                                  │
///                            └──── unregister_by_connection(c) ─┘
///                                              │
///                                              ▼
///                                          [unbound]
/// ```
///
/// At most one identity is bound to a connection, and (since names are
/// unique) at most one connection holds a name.
#[derive(Debug, Default)]
pub struct SessionDirectory {
    /// Identity per connection.
    by_connection: HashMap<ConnectionId, PlayerIdentity>,

    /// Reverse index from name to connection. Kept in sync with
    /// `by_connection`: every mutation touches both maps or neither.
    by_name: HashMap<PlayerName, ConnectionId>,
}

impl SessionDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `conn`, replacing any earlier binding of `conn`.
    ///
    /// Returns the name previously bound to `conn`, if any; the caller
    /// decides whether that makes this a rename. Registering the name a
    /// connection already holds leaves its identity untouched. A different
    /// name replaces the old identity outright (authority id included).
    ///
    /// # Errors
    /// [`SessionError::NameTaken`] if another connection holds `name`.
    /// The directory is unchanged in that case.
    pub fn register(
        &mut self,
        conn: ConnectionId,
        name: PlayerName,
    ) -> Result<Option<PlayerName>, SessionError> {
        if let Some(&holder) = self.by_name.get(&name) {
            if holder != conn {
                return Err(SessionError::NameTaken { name, holder });
            }
            // Same connection, same name.
            return Ok(Some(name));
        }

        let previous = self
            .by_connection
            .insert(conn, PlayerIdentity::new(name.clone()))
            .map(|old| {
                self.by_name.remove(old.name());
                old.name().clone()
            });
        self.by_name.insert(name.clone(), conn);

        match &previous {
            Some(old) => tracing::info!(%conn, %old, new = %name, "player renamed"),
            None => tracing::info!(%conn, %name, "player registered"),
        }
        Ok(previous)
    }

    /// Removes the binding for `conn`, returning the name it held.
    ///
    /// Absence is not an error: unbinding a connection that never
    /// registered returns `None`.
    pub fn unregister_by_connection(
        &mut self,
        conn: ConnectionId,
    ) -> Option<PlayerName> {
        let identity = self.by_connection.remove(&conn)?;
        self.by_name.remove(identity.name());
        tracing::info!(%conn, name = %identity.name(), "player unregistered");
        Some(identity.name().clone())
    }

    /// Looks up the name bound to a connection.
    pub fn find_name_by_connection(
        &self,
        conn: ConnectionId,
    ) -> Option<&PlayerName> {
        self.by_connection.get(&conn).map(PlayerIdentity::name)
    }

    /// Looks up the connection holding a name.
    pub fn find_connection_by_name(&self, name: &str) -> Option<ConnectionId> {
        self.by_name.get(name).copied()
    }

    /// Returns the full identity bound to a connection.
    pub fn identity(&self, conn: ConnectionId) -> Option<&PlayerIdentity> {
        self.by_connection.get(&conn)
    }

    /// Records the authority-assigned id for the player on `conn`.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] if nothing is bound to `conn`
    /// - [`SessionError::AuthorityIdAlreadySet`] if a different id was
    ///   already assigned
    pub fn assign_authority_id(
        &mut self,
        conn: ConnectionId,
        id: u64,
    ) -> Result<(), SessionError> {
        let identity = self
            .by_connection
            .get_mut(&conn)
            .ok_or(SessionError::NotFound(conn))?;
        identity.set_authority_id(id).map_err(|current| {
            SessionError::AuthorityIdAlreadySet {
                name: identity.name().clone(),
                current,
            }
        })
    }

    /// Number of bound connections.
    pub fn len(&self) -> usize {
        self.by_connection.len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.by_connection.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(port: u16) -> ConnectionId {
        ConnectionId::new(std::net::SocketAddr::from(([127, 0, 0, 1], port)))
    }

    fn name(s: &str) -> PlayerName {
        PlayerName::new(s).unwrap()
    }

    /// Both lookup directions agree for every binding.
    fn assert_consistent(dir: &SessionDirectory) {
        assert_eq!(dir.by_connection.len(), dir.by_name.len());
        for (c, identity) in &dir.by_connection {
            assert_eq!(dir.by_name.get(identity.name()), Some(c));
        }
    }

    #[test]
    fn test_register_is_visible_both_ways() {
        let mut dir = SessionDirectory::new();
        assert_eq!(dir.register(conn(1), name("Alice")), Ok(None));

        assert_eq!(dir.find_name_by_connection(conn(1)), Some(&name("Alice")));
        assert_eq!(dir.find_connection_by_name("Alice"), Some(conn(1)));
        assert_eq!(dir.len(), 1);
        assert_consistent(&dir);
    }

    #[test]
    fn test_unregister_removes_both_directions() {
        let mut dir = SessionDirectory::new();
        dir.register(conn(1), name("Alice")).unwrap();

        assert_eq!(dir.unregister_by_connection(conn(1)), Some(name("Alice")));
        assert_eq!(dir.find_name_by_connection(conn(1)), None);
        assert_eq!(dir.find_connection_by_name("Alice"), None);
        assert!(dir.is_empty());
        assert_consistent(&dir);
    }

    #[test]
    fn test_unregister_unknown_connection_is_noop() {
        let mut dir = SessionDirectory::new();
        dir.register(conn(1), name("Alice")).unwrap();

        assert_eq!(dir.unregister_by_connection(conn(2)), None);
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn test_register_replaces_previous_binding() {
        let mut dir = SessionDirectory::new();
        dir.register(conn(1), name("Bob")).unwrap();

        let previous = dir.register(conn(1), name("Robert")).unwrap();
        assert_eq!(previous, Some(name("Bob")));
        assert_eq!(dir.find_name_by_connection(conn(1)), Some(&name("Robert")));
        assert_eq!(dir.find_connection_by_name("Bob"), None);
        assert_eq!(dir.find_connection_by_name("Robert"), Some(conn(1)));
        assert_consistent(&dir);
    }

    #[test]
    fn test_rename_frees_the_old_name_for_others() {
        let mut dir = SessionDirectory::new();
        dir.register(conn(1), name("Bob")).unwrap();
        dir.register(conn(1), name("Robert")).unwrap();

        assert_eq!(dir.register(conn(2), name("Bob")), Ok(None));
        assert_consistent(&dir);
    }

    #[test]
    fn test_name_collision_is_rejected() {
        let mut dir = SessionDirectory::new();
        dir.register(conn(1), name("Bob")).unwrap();

        let err = dir.register(conn(2), name("Bob")).unwrap_err();
        assert_eq!(
            err,
            SessionError::NameTaken {
                name: name("Bob"),
                holder: conn(1),
            }
        );
        // The loser keeps nothing; the winner keeps its binding.
        assert_eq!(dir.find_name_by_connection(conn(2)), None);
        assert_eq!(dir.find_connection_by_name("Bob"), Some(conn(1)));
        assert_consistent(&dir);
    }

    #[test]
    fn test_collision_keeps_losers_existing_binding() {
        let mut dir = SessionDirectory::new();
        dir.register(conn(1), name("Bob")).unwrap();
        dir.register(conn(2), name("Ann")).unwrap();

        assert!(dir.register(conn(2), name("Bob")).is_err());
        assert_eq!(dir.find_name_by_connection(conn(2)), Some(&name("Ann")));
        assert_consistent(&dir);
    }

    #[test]
    fn test_reregistering_same_name_keeps_identity() {
        let mut dir = SessionDirectory::new();
        dir.register(conn(1), name("Bob")).unwrap();
        dir.assign_authority_id(conn(1), 3).unwrap();

        assert_eq!(dir.register(conn(1), name("Bob")), Ok(Some(name("Bob"))));
        assert_eq!(dir.identity(conn(1)).unwrap().authority_id(), Some(3));
    }

    #[test]
    fn test_rename_drops_authority_id() {
        let mut dir = SessionDirectory::new();
        dir.register(conn(1), name("Bob")).unwrap();
        dir.assign_authority_id(conn(1), 3).unwrap();

        dir.register(conn(1), name("Robert")).unwrap();
        assert_eq!(dir.identity(conn(1)).unwrap().authority_id(), None);
    }

    #[test]
    fn test_assign_authority_id_errors() {
        let mut dir = SessionDirectory::new();
        assert_eq!(
            dir.assign_authority_id(conn(1), 1),
            Err(SessionError::NotFound(conn(1)))
        );

        dir.register(conn(1), name("Bob")).unwrap();
        dir.assign_authority_id(conn(1), 1).unwrap();
        assert_eq!(
            dir.assign_authority_id(conn(1), 2),
            Err(SessionError::AuthorityIdAlreadySet {
                name: name("Bob"),
                current: 1,
            })
        );
    }

    #[test]
    fn test_many_connections_stay_consistent() {
        let mut dir = SessionDirectory::new();
        for port in 1..=20 {
            dir.register(conn(port), name(&format!("p{port}"))).unwrap();
        }
        for port in (1..=20).step_by(2) {
            dir.unregister_by_connection(conn(port));
        }
        for port in (2..=20).step_by(4) {
            dir.register(conn(port), name(&format!("renamed{port}")))
                .unwrap();
        }
        assert_eq!(dir.len(), 10);
        assert_consistent(&dir);
    }
}
