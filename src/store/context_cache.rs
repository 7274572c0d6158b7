// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

pub const DEFAULT_CONTEXT_TTL: Duration = Duration::from_secs(5 * 60);

pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { now: Mutex::new(Instant::now()) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Keyed store with per-entry expiry. Concurrent writers to one key: last writer wins.
pub trait ContextCache<V>: Send + Sync {
    fn put(&self, key: String, value: V, ttl: Duration);

    /// Returns the value unless it is missing or expired.
    fn get(&self, key: &str) -> Option<V>;
}

/// Opaque id for a new cache entry.
pub fn new_context_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// In-process [`ContextCache`]. Expiry is lazy: checked on `get`, swept on `put`.
#[derive(Debug)]
pub struct MemoryContextCache<V> {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V> MemoryContextCache<V> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock, entries: Mutex::new(HashMap::new()) }
    }

    /// Number of stored entries, expired ones included until the next sweep.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry<V>>> {
        // A panic while holding the lock cannot leave a half-written entry behind.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<V> Default for MemoryContextCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ContextCache<V> for MemoryContextCache<V>
where
    V: Clone + Send,
{
    fn put(&self, key: String, value: V, ttl: Duration) {
        let now = self.clock.now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let swept = before - entries.len();
        debug!(key = %key, ttl_secs = ttl.as_secs(), swept, "context cache put");
        entries.insert(key, Entry { value, expires_at: now + ttl });
    }

    fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                debug!(key, "context cache hit");
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                debug!(key, "context cache expired");
                None
            }
            None => {
                debug!(key, "context cache miss");
                None
            }
        }
    }
}
