use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// LRU map from SQL text to a prepared statement handle.
///
/// Each hit stamps the entry with a monotonically increasing tick; an insert past capacity
/// evicts the entry with the oldest stamp. Capacity is at least one.
#[derive(Debug)]
pub(super) struct StatementCache<S> {
    inner: Mutex<Entries<S>>,
}

#[derive(Debug)]
struct Entries<S> {
    capacity: usize,
    tick: u64,
    map: HashMap<String, Entry<S>>,
}

#[derive(Debug)]
struct Entry<S> {
    stmt: S,
    last_used: u64,
}

impl<S: Clone> StatementCache<S> {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Entries {
                capacity: capacity.max(1),
                tick: 0,
                map: HashMap::with_capacity(capacity),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries<S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn get(&self, sql: &str) -> Option<S> {
        self.lock().hit(sql)
    }

    /// Insert unless another caller prepared the same SQL first; returns the cached handle.
    pub(super) fn insert_if_absent(&self, sql: String, stmt: S) -> S {
        let mut entries = self.lock();
        if let Some(existing) = entries.hit(&sql) {
            return existing;
        }
        if entries.map.len() >= entries.capacity {
            entries.evict_oldest();
        }
        let last_used = entries.next_tick();
        entries.map.insert(
            sql,
            Entry {
                stmt: stmt.clone(),
                last_used,
            },
        );
        stmt
    }

    pub(super) fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub(super) fn clear(&self) {
        self.lock().map.clear();
    }
}

impl<S: Clone> Entries<S> {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn hit(&mut self, sql: &str) -> Option<S> {
        let tick = self.next_tick();
        let entry = self.map.get_mut(sql)?;
        entry.last_used = tick;
        Some(entry.stmt.clone())
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .map
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(sql, _)| sql.clone());
        if let Some(sql) = oldest {
            self.map.remove(&sql);
        }
    }
}

#[derive(Debug)]
pub(super) enum StmtCacheProbe<S> {
    Disabled,
    Hit(S),
    Miss,
}
