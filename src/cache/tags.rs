//! Invalidation tags and the tag -> keys index

use std::collections::{HashMap, HashSet};
use std::fmt;

use super::key::QueryKey;

/// Which slice of a resource kind a tag covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagId {
    /// Every list query of the kind
    List,
    /// One record
    Item(u32),
}

/// Label attached to cache entries so a mutation can mark them stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    kind: &'static str,
    id: TagId,
}

impl Tag {
    pub const fn list(kind: &'static str) -> Self {
        Self {
            kind,
            id: TagId::List,
        }
    }

    pub const fn item(kind: &'static str, id: u32) -> Self {
        Self {
            kind,
            id: TagId::Item(id),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn id(&self) -> TagId {
        self.id
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            TagId::List => write!(f, "{}-list", self.kind),
            TagId::Item(id) => write!(f, "{}-item:{}", self.kind, id),
        }
    }
}

/// Maps each tag to the cache keys currently providing it.
#[derive(Debug, Default)]
pub(crate) struct TagIndex {
    by_tag: HashMap<Tag, HashSet<QueryKey>>,
}

impl TagIndex {
    /// Re-point `key` from its previous tag set to a new one.
    pub(crate) fn replace(&mut self, key: &QueryKey, old: &HashSet<Tag>, new: &HashSet<Tag>) {
        for tag in old.difference(new) {
            self.unlink(tag, key);
        }
        for tag in new {
            self.by_tag.entry(*tag).or_default().insert(key.clone());
        }
    }

    pub(crate) fn remove(&mut self, key: &QueryKey, tags: &HashSet<Tag>) {
        for tag in tags {
            self.unlink(tag, key);
        }
    }

    /// Union of keys holding any of `tags`.
    pub(crate) fn keys_for(&self, tags: &[Tag]) -> HashSet<QueryKey> {
        tags.iter()
            .filter_map(|tag| self.by_tag.get(tag))
            .flat_map(|keys| keys.iter().cloned())
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        self.by_tag.clear();
    }

    pub(crate) fn tag_count(&self) -> usize {
        self.by_tag.len()
    }

    fn unlink(&mut self, tag: &Tag, key: &QueryKey) {
        if let Some(keys) = self.by_tag.get_mut(tag) {
            keys.remove(key);
            if keys.is_empty() {
                self.by_tag.remove(tag);
            }
        }
    }
}
