//! [`DirectoryUserCache`]: users and groups loaded from a directory.
//!
//! # Generations
//!
//! A refresh never edits the cache in place. It builds a complete new
//! [`Snapshot`] (every user, every group) from two directory searches and
//! then swaps the pointer. A connection that grabbed the old snapshot
//! keeps a consistent view until it is done with it.
//!
//! ```text
//! refresh():  search groups ──→ search users ──→ build Snapshot ──→ swap
//!                    (only when directory roles are enabled)
//! ```
//!
//! # Concurrency note
//!
//! Two locks, with different jobs:
//! - `snapshot` (`RwLock<Arc<Snapshot>>`) is held only to clone or
//!   replace the `Arc`, never across a directory call. Readers are never
//!   stuck behind a slow search.
//! - `refresh_lock` (`Mutex<()>`) is held for a whole refresh. Concurrent
//!   triggers (timer, SIGHUP, a cache miss) queue up behind each other
//!   instead of interleaving their searches.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use hologram_directory::{Directory, DirectorySchema, Entry, Filter, SearchRequest};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::keys::parse_public_key;
use crate::{Authenticator, CacheError, ChallengeSignature, Group, Stats, User, UserCache};

/// Session duration used when a group does not specify one.
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 3600;

// ---------------------------------------------------------------------------
// CacheConfig
// ---------------------------------------------------------------------------

/// How the cache reads users and roles out of the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Where to search and which attributes to read.
    pub schema: DirectorySchema,

    /// Load role-granting groups and per-user default roles from the
    /// directory. When off, users have no groups and every user's default
    /// role is `default_role`.
    pub enable_directory_roles: bool,

    /// Default role for users without their own.
    pub default_role: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            schema: DirectorySchema::default(),
            enable_directory_roles: false,
            default_role: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// DirectoryUserCache
// ---------------------------------------------------------------------------

/// One generation of cached users, keyed by username.
#[derive(Default)]
struct Snapshot {
    users: BTreeMap<String, Arc<User>>,
}

/// A [`UserCache`] backed by a [`Directory`].
pub struct DirectoryUserCache<D> {
    directory: D,
    config: CacheConfig,
    stats: Arc<dyn Stats>,
    snapshot: RwLock<Arc<Snapshot>>,
    refresh_lock: Mutex<()>,
}

impl<D: Directory> DirectoryUserCache<D> {
    /// Creates an empty cache. Nothing is read until the first refresh.
    pub fn new(directory: D, config: CacheConfig, stats: Arc<dyn Stats>) -> Self {
        Self {
            directory,
            config,
            stats,
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Creates a cache and performs the initial refresh.
    pub async fn load(
        directory: D,
        config: CacheConfig,
        stats: Arc<dyn Stats>,
    ) -> Result<Self, CacheError> {
        let cache = Self::new(directory, config, stats);
        cache.rebuild().await?;
        Ok(cache)
    }

    /// The directory this cache reads from.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Every user in the current generation, ordered by username.
    pub async fn users(&self) -> Vec<Arc<User>> {
        self.current().await.users.values().cloned().collect()
    }

    async fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.snapshot.read().await)
    }

    /// Builds a fresh generation and swaps it in.
    async fn rebuild(&self) -> Result<(), CacheError> {
        let _guard = self.refresh_lock.lock().await;
        let start = Instant::now();

        let groups = if self.config.enable_directory_roles {
            self.load_groups().await?
        } else {
            HashMap::new()
        };
        let users = self.load_users(&groups).await?;

        tracing::debug!(users = users.len(), groups = groups.len(), "user cache rebuilt");
        *self.snapshot.write().await = Arc::new(Snapshot { users });
        self.stats.timing("cache.refresh", start.elapsed());
        Ok(())
    }

    async fn load_groups(&self) -> Result<HashMap<String, Arc<Group>>, CacheError> {
        let schema = &self.config.schema;
        let mut req = SearchRequest::new(
            &schema.base_dn,
            Filter::equality("objectClass", &schema.group_class),
        )
        .attribute(&schema.role_attr);
        if let Some(timeout_attr) = &schema.role_timeout_attr {
            req = req.attribute(timeout_attr);
        }

        let entries = self.directory.search(&req).await?;
        let groups = entries
            .into_iter()
            .map(|entry| {
                let group = Group {
                    session_timeout_secs: self.group_timeout(&entry),
                    role_arns: entry.attribute_values(&schema.role_attr).to_vec(),
                    dn: entry.dn,
                };
                tracing::debug!(dn = %group.dn, roles = ?group.role_arns, timeout = group.session_timeout_secs, "group cached");
                (group.dn.clone(), Arc::new(group))
            })
            .collect();
        Ok(groups)
    }

    fn group_timeout(&self, entry: &Entry) -> u64 {
        let Some(raw) = self
            .config
            .schema
            .role_timeout_attr
            .as_deref()
            .and_then(|attr| entry.attribute_value(attr))
        else {
            return DEFAULT_SESSION_TIMEOUT_SECS;
        };

        raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(dn = %entry.dn, timeout = %raw, "unparsable group timeout, using default");
            DEFAULT_SESSION_TIMEOUT_SECS
        })
    }

    async fn load_users(
        &self,
        groups: &HashMap<String, Arc<Group>>,
    ) -> Result<BTreeMap<String, Arc<User>>, CacheError> {
        let schema = &self.config.schema;
        let req = SearchRequest::new(&schema.base_dn, Filter::present(&schema.pub_keys_attr))
            .attribute(&schema.pub_keys_attr)
            .attribute(&schema.user_attr)
            .attribute(&schema.member_of_attr)
            .attribute(&schema.default_role_attr);

        let entries = self.directory.search(&req).await?;
        let mut users = BTreeMap::new();
        for entry in entries {
            let Some(username) = entry.attribute_value(&schema.user_attr) else {
                tracing::warn!(dn = %entry.dn, "entry has no username attribute, skipping");
                continue;
            };
            let user = self.build_user(username, &entry, groups);
            tracing::debug!(%username, keys = user.ssh_public_keys.len(), "user cached");
            users.insert(username.to_string(), Arc::new(user));
        }
        Ok(users)
    }

    fn build_user(
        &self,
        username: &str,
        entry: &Entry,
        groups: &HashMap<String, Arc<Group>>,
    ) -> User {
        let schema = &self.config.schema;
        let ssh_public_keys = entry
            .attribute_values(&schema.pub_keys_attr)
            .iter()
            .filter_map(|raw| match parse_public_key(raw) {
                Ok(key) => Some(key),
                Err(e) => {
                    tracing::warn!(%username, key = %raw, error = %e, "unparsable SSH key, skipping");
                    None
                }
            })
            .collect();

        if !self.config.enable_directory_roles {
            return User {
                username: username.to_string(),
                ssh_public_keys,
                groups: Vec::new(),
                default_role: self.config.default_role.clone(),
            };
        }

        let user_groups = entry
            .attribute_values(&schema.member_of_attr)
            .iter()
            .filter_map(|dn| {
                let group = groups.get(dn).cloned();
                if group.is_none() {
                    tracing::warn!(%username, group = %dn, "member of unknown group, skipping");
                }
                group
            })
            .collect();

        let default_role = entry
            .attribute_value(&schema.default_role_attr)
            .filter(|role| !role.is_empty())
            .unwrap_or(self.config.default_role.as_str())
            .to_string();

        User {
            username: username.to_string(),
            ssh_public_keys,
            groups: user_groups,
            default_role,
        }
    }
}

/// First user with a key that verifies `signature` over `challenge`.
fn scan(
    snapshot: &Snapshot,
    challenge: &[u8],
    signature: &ssh_key::Signature,
) -> Option<Arc<User>> {
    snapshot
        .users
        .values()
        .find(|user| {
            user.ssh_public_keys
                .iter()
                .any(|key| crate::verify_signature(key, challenge, signature))
        })
        .cloned()
}

impl<D: Directory> Authenticator for DirectoryUserCache<D> {
    async fn authenticate(
        &self,
        challenge: &[u8],
        signature: &ChallengeSignature,
    ) -> Result<Option<Arc<User>>, CacheError> {
        let Some(sig) = signature.to_ssh_signature() else {
            tracing::debug!(format = %signature.format, "malformed signature");
            return Ok(None);
        };

        if let Some(user) = scan(&*self.current().await, challenge, &sig) {
            return Ok(Some(user));
        }

        // The key may have been added to the directory since the last
        // refresh. Reload once and look again.
        tracing::debug!("no cached key verified, refreshing from the directory");
        self.stats.counter("cache.miss", 1);
        self.rebuild().await?;
        Ok(scan(&*self.current().await, challenge, &sig))
    }
}

impl<D: Directory> UserCache for DirectoryUserCache<D> {
    async fn refresh(&self) -> Result<(), CacheError> {
        self.rebuild().await
    }

    async fn find_user(&self, username: &str) -> Option<Arc<User>> {
        self.current().await.users.get(username).cloned()
    }
}
