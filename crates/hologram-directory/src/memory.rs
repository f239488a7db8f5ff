//! An in-process directory.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;

use crate::{
    Directory, DirectoryConnector, DirectoryError, Entry, ErrorKind, ModifyRequest,
    SearchRequest,
};

/// A directory held entirely in memory.
///
/// Clones share the same entries, so a `MemoryDirectory` can be handed
/// to the user cache and the server while a test keeps a handle to seed
/// or inspect it. It also acts as its own [`DirectoryConnector`].
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: RwLock<Vec<Entry>>,
    searches: AtomicUsize,
    modifies: AtomicUsize,
}

impl MemoryDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory pre-populated with `entries`.
    pub fn with_entries(entries: Vec<Entry>) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: RwLock::new(entries),
                ..Inner::default()
            }),
        }
    }

    /// Adds an entry, replacing any entry with the same DN.
    pub async fn insert(&self, entry: Entry) {
        let mut entries = self.inner.entries.write().await;
        entries.retain(|e| !e.dn.eq_ignore_ascii_case(&entry.dn));
        entries.push(entry);
    }

    /// Returns a copy of the entry with the given DN.
    pub async fn get(&self, dn: &str) -> Option<Entry> {
        let entries = self.inner.entries.read().await;
        entries.iter().find(|e| e.dn.eq_ignore_ascii_case(dn)).cloned()
    }

    /// Number of searches served so far.
    pub fn search_count(&self) -> usize {
        self.inner.searches.load(Ordering::SeqCst)
    }

    /// Number of modifications applied so far.
    pub fn modify_count(&self) -> usize {
        self.inner.modifies.load(Ordering::SeqCst)
    }
}

/// `dn` is `base` or lies beneath it.
fn in_subtree(dn: &str, base: &str) -> bool {
    if base.is_empty() {
        return true;
    }
    let dn = dn.to_ascii_lowercase();
    let base = base.to_ascii_lowercase();
    dn == base || dn.ends_with(&format!(",{base}"))
}

impl Directory for MemoryDirectory {
    async fn search(&self, req: &SearchRequest) -> Result<Vec<Entry>, DirectoryError> {
        self.inner.searches.fetch_add(1, Ordering::SeqCst);
        let entries = self.inner.entries.read().await;
        let found: Vec<Entry> = entries
            .iter()
            .filter(|e| in_subtree(&e.dn, &req.base_dn) && req.filter.matches(e))
            .map(|e| e.project(&req.attributes))
            .collect();
        tracing::trace!(filter = %req.filter, count = found.len(), "memory directory search");
        Ok(found)
    }

    async fn modify(&self, req: &ModifyRequest) -> Result<(), DirectoryError> {
        let mut entries = self.inner.entries.write().await;
        let entry = entries
            .iter_mut()
            .find(|e| e.dn.eq_ignore_ascii_case(&req.dn))
            .ok_or_else(|| DirectoryError::new(ErrorKind::NotFound, format!("no such entry: {}", req.dn)))?;

        // LDAP refuses to add a value that is already present.
        for (attribute, values) in &req.adds {
            if let Some(dup) = values
                .iter()
                .find(|v| entry.attribute_values(attribute).contains(v))
            {
                return Err(DirectoryError::new(
                    ErrorKind::Protocol,
                    format!("attribute {attribute} already has value {dup}"),
                ));
            }
        }
        for (attribute, values) in &req.adds {
            entry.add_values(attribute, values.iter().cloned());
        }

        self.inner.modifies.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl DirectoryConnector for MemoryDirectory {
    type Connection = MemoryDirectory;

    async fn connect(&self) -> Result<Self::Connection, DirectoryError> {
        Ok(self.clone())
    }
}
