//! In-process storage (single instance, development and tests)

use std::collections::hash_map::RandomState;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info};

use super::r#trait::{CounterStore, OtpStore, UserDirectory};
use crate::auth::{
    errors::AuthError,
    types::{UserPage, UserRecord},
    validators::mask_phone,
};

const SHARD_COUNT: usize = 16;

/// `Instant::now() + lifetime`, or a config error when the lifetime is unrepresentable
fn deadline(lifetime: Duration) -> Result<Instant, AuthError> {
    Instant::now()
        .checked_add(lifetime)
        .ok_or_else(|| AuthError::Config(format!("lifetime {:?} is out of range", lifetime)))
}

/// Phone-keyed map split across independently locked shards
struct ShardedMap<V> {
    shards: Vec<Mutex<HashMap<String, V>>>,
    hasher: RandomState,
}

impl<V> ShardedMap<V> {
    fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect(),
            hasher: RandomState::new(),
        }
    }

    fn shard(&self, key: &str) -> &Mutex<HashMap<String, V>> {
        let idx = self.hasher.hash_one(key) as usize % self.shards.len();
        &self.shards[idx]
    }

    /// Drop every entry for which `keep` is false, returning how many went
    fn retain(&self, mut keep: impl FnMut(&V) -> bool) -> usize {
        let mut removed = 0;
        for shard in &self.shards {
            let mut map = shard.lock();
            let before = map.len();
            map.retain(|_, v| keep(v));
            removed += before - map.len();
        }
        removed
    }
}

#[derive(Debug, Clone)]
struct OtpEntry {
    code: String,
    expires_at: Instant,
}

/// In-memory OTP store. Expiry is checked on every read; `purge_expired` only reclaims memory.
pub struct MemoryOtpStore {
    entries: ShardedMap<OtpEntry>,
}

impl Default for MemoryOtpStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryOtpStore {
    pub fn new() -> Self {
        Self {
            entries: ShardedMap::new(),
        }
    }

    /// Remove expired records
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let removed = self.entries.retain(|entry| now < entry.expires_at);
        debug!(removed, "purged expired otp records");
        removed
    }
}

#[async_trait]
impl OtpStore for MemoryOtpStore {
    async fn set(&self, phone: &str, code: &str, ttl: Duration) -> Result<(), AuthError> {
        let entry = OtpEntry {
            code: code.to_string(),
            expires_at: deadline(ttl)?,
        };
        self.entries.shard(phone).lock().insert(phone.to_string(), entry);
        Ok(())
    }

    async fn get(&self, phone: &str) -> Result<String, AuthError> {
        let mut shard = self.entries.shard(phone).lock();
        let found = shard
            .get(phone)
            .map(|entry| (Instant::now() < entry.expires_at, entry.code.clone()));

        match found {
            Some((true, code)) => Ok(code),
            Some((false, _)) => {
                // lazy eviction
                shard.remove(phone);
                Err(AuthError::OtpNotFoundOrExpired)
            }
            None => Err(AuthError::OtpNotFoundOrExpired),
        }
    }

    async fn delete(&self, phone: &str) -> Result<bool, AuthError> {
        Ok(self.entries.shard(phone).lock().remove(phone).is_some())
    }
}

#[derive(Debug, Clone, Copy)]
struct Counter {
    count: i64,
    window_ends: Instant,
}

/// In-memory fixed-window counters. Increment and window start share one critical section.
pub struct MemoryCounterStore {
    counters: ShardedMap<Counter>,
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self {
            counters: ShardedMap::new(),
        }
    }

    /// Remove counters whose window has closed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        self.counters.retain(|counter| now < counter.window_ends)
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn incr_in_window(&self, key: &str, window: Duration) -> Result<i64, AuthError> {
        let window_ends = deadline(window)?;
        let now = Instant::now();
        let mut shard = self.counters.shard(key).lock();

        let counter = shard.entry(key.to_string()).or_insert(Counter {
            count: 0,
            window_ends,
        });
        if now >= counter.window_ends {
            // previous window closed, this hit anchors a new one
            *counter = Counter {
                count: 0,
                window_ends,
            };
        }
        counter.count += 1;

        Ok(counter.count)
    }

    async fn reset(&self, key: &str) -> Result<(), AuthError> {
        self.counters.shard(key).lock().remove(key);
        Ok(())
    }
}

#[derive(Default)]
struct DirectoryInner {
    by_id: BTreeMap<u64, UserRecord>,
    by_phone: HashMap<String, u64>,
    next_id: u64,
}

/// In-memory user directory
#[derive(Default)]
pub struct MemoryUserDirectory {
    inner: RwLock<DirectoryInner>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn get_or_create(&self, phone: &str) -> Result<UserRecord, AuthError> {
        let mut inner = self.inner.write();

        if let Some(user) = inner.by_phone.get(phone).and_then(|id| inner.by_id.get(id)) {
            return Ok(user.clone());
        }

        inner.next_id += 1;
        let user = UserRecord {
            id: inner.next_id,
            phone: phone.to_string(),
            registered_at: chrono::Utc::now(),
        };
        inner.by_phone.insert(user.phone.clone(), user.id);
        inner.by_id.insert(user.id, user.clone());

        info!(user_id = user.id, phone = %mask_phone(phone), "user registered");
        Ok(user)
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.inner.read().by_id.get(&id).cloned())
    }

    async fn list(&self, page: u32, limit: u32, search: Option<&str>) -> Result<UserPage, AuthError> {
        let inner = self.inner.read();
        let matching: Vec<&UserRecord> = inner
            .by_id
            .values()
            .filter(|u| search.map_or(true, |s| u.phone.contains(s)))
            .collect();

        let offset = (page.max(1) as usize - 1) * limit as usize;
        let users = matching
            .iter()
            .skip(offset)
            .take(limit as usize)
            .map(|u| (*u).clone())
            .collect();

        Ok(UserPage {
            users,
            total: matching.len() as u64,
        })
    }
}
