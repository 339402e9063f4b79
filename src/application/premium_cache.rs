//! Premium-status cache.
//!
//! Short-lived per-user cache of the entitlement answer served by the status
//! query. Writers that change a user's billing state invalidate the entry;
//! entries older than the TTL are treated as absent.
//!
//! A reader that fills the cache from the store takes a [`CacheTicket`]
//! first. Any invalidation bumps the cache generation, and a write-back
//! holding an older ticket is dropped, so an answer computed before a
//! webhook landed is never cached after it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::domain::foundation::UserId;

#[derive(Debug, Clone, Copy)]
struct Entry {
    premium: bool,
    stored_at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<UserId, Entry>,
    generation: u64,
}

/// Cache generation observed before a store read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTicket {
    generation: u64,
}

/// TTL cache of `user -> premium`.
#[derive(Debug, Clone)]
pub struct PremiumCache {
    inner: Arc<RwLock<Inner>>,
    ttl: Duration,
}

impl PremiumCache {
    /// Create a cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            ttl,
        }
    }

    /// Cached answer for `user`, if present and fresh.
    pub async fn get(&self, user: &UserId) -> Option<bool> {
        let inner = self.inner.read().await;
        inner
            .entries
            .get(user)
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.premium)
    }

    /// Take before reading the store; pass to [`put_if_current`](Self::put_if_current).
    pub async fn ticket(&self) -> CacheTicket {
        CacheTicket {
            generation: self.inner.read().await.generation,
        }
    }

    pub async fn put(&self, user: &UserId, premium: bool) {
        let mut inner = self.inner.write().await;
        self.insert(&mut inner, user, premium);
    }

    /// Stores the answer unless an invalidation happened since `ticket`.
    ///
    /// Returns whether the entry was written.
    pub async fn put_if_current(&self, ticket: CacheTicket, user: &UserId, premium: bool) -> bool {
        let mut inner = self.inner.write().await;
        if inner.generation != ticket.generation {
            tracing::debug!(user_id = %user, "Skipped premium cache write after invalidation");
            return false;
        }
        self.insert(&mut inner, user, premium);
        true
    }

    pub async fn invalidate(&self, user: &UserId) {
        let mut inner = self.inner.write().await;
        inner.generation = inner.generation.wrapping_add(1);
        if inner.entries.remove(user).is_some() {
            tracing::debug!(user_id = %user, "Invalidated premium cache entry");
        }
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.generation = inner.generation.wrapping_add(1);
        inner.entries.clear();
    }

    /// Number of entries, fresh or stale.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn insert(&self, inner: &mut Inner, user: &UserId, premium: bool) {
        // Drop stale entries while we hold the lock so the map stays bounded
        // by the number of users active within one TTL.
        let ttl = self.ttl;
        inner.entries.retain(|_, e| e.stored_at.elapsed() < ttl);
        inner.entries.insert(
            user.clone(),
            Entry {
                premium,
                stored_at: Instant::now(),
            },
        );
    }
}

impl Default for PremiumCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn put_then_get_returns_value() {
        let cache = PremiumCache::default();
        cache.put(&user("u1"), true).await;

        assert_eq!(cache.get(&user("u1")).await, Some(true));
        assert_eq!(cache.get(&user("u2")).await, None);
    }

    #[tokio::test]
    async fn invalidate_removes_only_that_user() {
        let cache = PremiumCache::default();
        cache.put(&user("u1"), true).await;
        cache.put(&user("u2"), false).await;

        cache.invalidate(&user("u1")).await;

        assert_eq!(cache.get(&user("u1")).await, None);
        assert_eq!(cache.get(&user("u2")).await, Some(false));
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let cache = PremiumCache::new(Duration::ZERO);
        cache.put(&user("u1"), true).await;

        assert_eq!(cache.get(&user("u1")).await, None);
    }

    #[tokio::test]
    async fn put_evicts_stale_entries() {
        let cache = PremiumCache::new(Duration::ZERO);
        cache.put(&user("u1"), true).await;
        cache.put(&user("u2"), true).await;

        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn write_back_after_invalidation_is_dropped() {
        let cache = PremiumCache::default();
        let ticket = cache.ticket().await;

        cache.invalidate(&user("u1")).await;

        assert!(!cache.put_if_current(ticket, &user("u1"), false).await);
        assert_eq!(cache.get(&user("u1")).await, None);
    }

    #[tokio::test]
    async fn write_back_with_current_ticket_is_stored() {
        let cache = PremiumCache::default();
        cache.invalidate(&user("u1")).await;
        let ticket = cache.ticket().await;

        assert!(cache.put_if_current(ticket, &user("u1"), true).await);
        assert_eq!(cache.get(&user("u1")).await, Some(true));
    }

    #[tokio::test]
    async fn clear_empties_cache() {
        let cache = PremiumCache::default();
        cache.put(&user("u1"), true).await;
        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
