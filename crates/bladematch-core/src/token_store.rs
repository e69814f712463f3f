//! Bounded session-token store.
//!
//! Control surfaces such as inline buttons carry only a few dozen bytes, so
//! selection state lives here and the button carries a short opaque token.
//!
//! - Tokens are base-36 strings derived from a monotonic counter passed
//!   through a seeded bijective mix: unique for the process lifetime, not
//!   guessable in sequence.
//! - Entries are immutable `Arc` snapshots. `put` never deduplicates.
//! - Capacity is enforced by LRU eviction; `get` promotes.
//! - Unknown and evicted tokens are indistinguishable (`None`).

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::selection::SessionPayload;

/// Opaque handle to a stored [`SessionPayload`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionToken(pub String);

impl SessionToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn generate(seed: u64, counter: u64) -> Self {
        Self(to_base36(mix(counter ^ seed)))
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// splitmix64 finalizer; a bijection on `u64`.
fn mix(mut x: u64) -> u64 {
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::with_capacity(13);
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}

/// Store counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenStoreStats {
    pub issued: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub live: usize,
    pub capacity: usize,
}

impl TokenStoreStats {
    /// Hit rate in [0.0, 1.0]; 0.0 before any lookup.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let rate = self.hits as f64 / total as f64;
            rate
        }
    }
}

struct Inner {
    entries: LruCache<String, Arc<SessionPayload>>,
    next: u64,
    stats: TokenStoreStats,
}

/// Thread-safe token ↔ payload map with LRU eviction.
pub struct SessionTokenStore {
    inner: Mutex<Inner>,
    seed: u64,
}

impl SessionTokenStore {
    /// Store with a random seed. A capacity of 0 is raised to 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_seed(capacity, rand::random())
    }

    /// Store with a fixed seed, for reproducible tokens.
    #[must_use]
    pub fn with_seed(capacity: usize, seed: u64) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                next: 0,
                stats: TokenStoreStats {
                    capacity: capacity.get(),
                    ..TokenStoreStats::default()
                },
            }),
            seed,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store a snapshot and mint a fresh token for it.
    pub fn put(&self, payload: impl Into<SessionPayload>) -> SessionToken {
        let payload = Arc::new(payload.into());
        let mut inner = self.lock();
        let token = SessionToken::generate(self.seed, inner.next);
        inner.next += 1;
        inner.stats.issued += 1;
        if let Some((evicted, _)) = inner.entries.push(token.0.clone(), payload) {
            if evicted != token.0 {
                inner.stats.evictions += 1;
                tracing::trace!(token = %evicted, "Evicted session token");
            }
        }
        token
    }

    /// Look a token up, promoting it to most recently used.
    pub fn get(&self, token: &str) -> Option<Arc<SessionPayload>> {
        let mut inner = self.lock();
        let found = inner.entries.get(token).cloned();
        if found.is_some() {
            inner.stats.hits += 1;
        } else {
            inner.stats.misses += 1;
        }
        found
    }

    /// Whether a token is live, without promoting it.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.lock().entries.contains(token)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn stats(&self) -> TokenStoreStats {
        let inner = self.lock();
        TokenStoreStats {
            live: inner.entries.len(),
            ..inner.stats
        }
    }
}

impl fmt::Debug for SessionTokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokenStore")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
