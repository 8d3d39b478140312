use crate::*;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;

/// An externally verified credential identifying a natural person.
/// Opaque to this crate; immutable once created.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Identity(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Identity(id.to_string())
    }
}

/// The unique display name bound to one identity for voting purposes.
/// Never deleted, never reassigned.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VoterHandle {
    pub name: String,
    pub owning_identity: Identity,
    pub registered_at: Timestamp,
}

/// Binds verified identities to voting handles. One handle per identity,
/// globally unique handle names.
#[derive(Default)]
pub struct IdentityRegistry {
    handles: IndexMap<Identity, VoterHandle>,
    names: HashMap<String, Identity>,
    events: EventLog,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the identity ↔ handle binding.
    pub fn register(
        &mut self,
        identity: Identity,
        name: &str,
        now: Timestamp,
    ) -> Result<&VoterHandle, Error> {
        if name.is_empty() {
            return Err(ValidationError::InvalidHandle(name.to_string()).into());
        }
        if self.handles.contains_key(&identity) {
            return Err(StateError::AlreadyRegistered.into());
        }
        if self.names.contains_key(name) {
            return Err(ValidationError::InvalidHandle(name.to_string()).into());
        }

        let handle = VoterHandle {
            name: name.to_string(),
            owning_identity: identity.clone(),
            registered_at: now,
        };
        self.names.insert(name.to_string(), identity.clone());
        self.events.emit(Event::IdentityRegistered {
            identity: identity.clone(),
            handle: name.to_string(),
            timestamp: now,
        });
        log::info!("registered voter handle {:?} for identity {}", name, identity);

        Ok(self.handles.entry(identity).or_insert(handle))
    }

    /// Pure read; `None` if the identity never registered.
    pub fn lookup(&self, identity: &Identity) -> Option<&VoterHandle> {
        self.handles.get(identity)
    }

    /// Reverse lookup by handle name.
    pub fn lookup_name(&self, name: &str) -> Option<&VoterHandle> {
        self.names.get(name).and_then(|id| self.handles.get(id))
    }

    pub fn is_registered(&self, identity: &Identity) -> bool {
        self.handles.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        let mut registry = IdentityRegistry::new();
        let alice = Identity::from("id-alice");

        let handle = registry.register(alice.clone(), "alice.vote", 100).unwrap();
        assert_eq!(handle.name, "alice.vote");
        assert_eq!(handle.owning_identity, alice);
        assert_eq!(handle.registered_at, 100);

        assert!(registry.is_registered(&alice));
        assert_eq!(registry.lookup(&alice).unwrap().name, "alice.vote");
        assert_eq!(
            registry.lookup_name("alice.vote").unwrap().owning_identity,
            alice
        );
        assert_eq!(registry.len(), 1);

        let events = registry.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::IdentityRegistered { .. }));
    }

    #[test]
    fn empty_handle_rejected() {
        let mut registry = IdentityRegistry::new();
        let err = registry.register(Identity::from("id-a"), "", 0).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::InvalidHandle(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn handle_names_are_globally_unique() {
        let mut registry = IdentityRegistry::new();
        registry
            .register(Identity::from("id-a"), "shared.vote", 0)
            .unwrap();

        let err = registry
            .register(Identity::from("id-b"), "shared.vote", 1)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::InvalidHandle(_))
        ));
        assert!(!registry.is_registered(&Identity::from("id-b")));
    }

    #[test]
    fn one_handle_per_identity() {
        let mut registry = IdentityRegistry::new();
        let alice = Identity::from("id-alice");
        registry.register(alice.clone(), "first.vote", 0).unwrap();

        let err = registry.register(alice.clone(), "second.vote", 1).unwrap_err();
        assert!(matches!(err, Error::State(StateError::AlreadyRegistered)));

        // The original binding is untouched.
        assert_eq!(registry.lookup(&alice).unwrap().name, "first.vote");
        assert!(registry.lookup_name("second.vote").is_none());
    }

    #[test]
    fn lookup_unregistered_is_none() {
        let registry = IdentityRegistry::new();
        assert!(registry.lookup(&Identity::from("nobody")).is_none());
        assert!(!registry.is_registered(&Identity::from("nobody")));
    }
}
