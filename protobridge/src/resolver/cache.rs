//! Per-run resolution cache
//!
//! Maps a struct's canonical identity to the message resolved for it, remembers which messages
//! have been written out, tracks the identities whose fields are being walked right now, and owns
//! the (schema package, message name) registry used to detect collisions.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use error_stack::Report;

use crate::descriptor::QualifiedName;
use crate::error::{Error, Result};
use crate::schema::{Message, MessageRef};

#[derive(Debug)]
pub(crate) struct CacheEntry {
    pub message: Rc<Message>,
    pub emitted: bool,
}

/// What a message name in a schema package was claimed for
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NameOwner {
    Struct(QualifiedName),
    /// Request or response message of the named method
    Method(String),
}

#[derive(Debug, Default)]
pub(crate) struct ResolutionCache {
    entries:     HashMap<QualifiedName, CacheEntry>,
    /// Identities in the order their messages were completed
    order:       Vec<QualifiedName>,
    in_progress: HashSet<QualifiedName>,
    names:       HashMap<(String, String), NameOwner>,
}

impl ResolutionCache {
    pub(crate) fn len(&self) -> usize { self.entries.len() }

    pub(crate) fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub(crate) fn get(&self, id: &QualifiedName) -> Option<&Rc<Message>> {
        self.entries.get(id).map(|entry| &entry.message)
    }

    /// Resolved or currently being resolved further up the stack
    pub(crate) fn is_known(&self, id: &QualifiedName) -> bool {
        self.entries.contains_key(id) || self.in_progress.contains(id)
    }

    pub(crate) fn is_in_progress(&self, id: &QualifiedName) -> bool {
        self.in_progress.contains(id)
    }

    pub(crate) fn begin(&mut self, id: &QualifiedName) { self.in_progress.insert(id.clone()); }

    /// Store a completed message; ends its in-progress state
    pub(crate) fn finish(&mut self, message: Message) -> Rc<Message> {
        let id = message.id.clone();
        self.in_progress.remove(&id);
        let message = Rc::new(message);
        tracing::trace!("Cached message {} for {id}", message.name);
        if self
            .entries
            .insert(
                id.clone(),
                CacheEntry {
                    message: Rc::clone(&message),
                    emitted: false,
                },
            )
            .is_none()
        {
            self.order.push(id);
        }
        message
    }

    /// Reserve `name` in `package`; the same owner may claim it again
    pub(crate) fn claim_name(&mut self, package: &str, name: &str, owner: NameOwner) -> Result<()> {
        let key = (package.to_string(), name.to_string());
        match self.names.get(&key) {
            Some(existing) if *existing != owner => Err(Report::new(Error::NameCollision {
                package: package.to_string(),
                name:    name.to_string(),
            })
            .attach(format!("already used by {existing:?}, requested by {owner:?}"))),
            Some(_) => Ok(()),
            None => {
                self.names.insert(key, owner);
                Ok(())
            }
        }
    }

    /// Record that the message text has been written; `false` when it already was
    pub(crate) fn mark_emitted(&mut self, id: &QualifiedName) -> bool {
        self.entries
            .get_mut(id)
            .is_some_and(|entry| !std::mem::replace(&mut entry.emitted, true))
    }

    /// Messages completed after the cache held `count` entries
    pub(crate) fn completed_since(&self, count: usize) -> Vec<MessageRef> {
        self.order
            .iter()
            .skip(count)
            .filter_map(|id| self.entries.get(id))
            .map(|entry| entry.message.reference())
            .collect()
    }

    /// Every cached message in completion order
    pub(crate) fn messages(&self) -> impl Iterator<Item = &Rc<Message>> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|entry| &entry.message))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;

    fn message(name: &str) -> Message {
        Message::new(
            QualifiedName::new("example.org/app", "example.org/app/account", name),
            "account".to_string(),
            name.to_string(),
            Vec::new(),
        )
    }

    #[test]
    fn test_in_progress_until_finished() {
        let mut cache = ResolutionCache::default();
        let id = message("Node").id;
        assert!(!cache.is_known(&id));

        cache.begin(&id);
        assert!(cache.is_known(&id));
        assert!(cache.is_in_progress(&id));
        assert!(cache.get(&id).is_none());

        cache.finish(message("Node"));
        assert!(!cache.is_in_progress(&id));
        assert_eq!(cache.get(&id).unwrap().name, "Node");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_emitted_once() {
        let mut cache = ResolutionCache::default();
        let id = cache.finish(message("Account")).id.clone();
        assert!(cache.mark_emitted(&id));
        assert!(!cache.mark_emitted(&id));
        assert!(!cache.mark_emitted(&QualifiedName::new("m", "m/p", "Unknown")));
    }

    #[test]
    fn test_completed_since_preserves_order() {
        let mut cache = ResolutionCache::default();
        cache.finish(message("A"));
        let count = cache.len();
        cache.finish(message("C"));
        cache.finish(message("B"));
        let names: Vec<String> = cache
            .completed_since(count)
            .into_iter()
            .map(|reference| reference.name)
            .collect();
        assert_eq!(names, vec!["C", "B"]);
    }

    #[test]
    fn test_name_claims() {
        let mut cache = ResolutionCache::default();
        let id = message("LoginRequest").id;
        cache
            .claim_name("account", "LoginRequest", NameOwner::Struct(id.clone()))
            .unwrap();
        cache
            .claim_name("account", "LoginRequest", NameOwner::Struct(id))
            .unwrap();
        cache
            .claim_name("other", "LoginRequest", NameOwner::Method("Login".to_string()))
            .unwrap();

        let error = cache
            .claim_name("account", "LoginRequest", NameOwner::Method("Login".to_string()))
            .unwrap_err();
        assert!(matches!(
            error.current_context(),
            Error::NameCollision { name, .. } if name == "LoginRequest"
        ));
    }
}
