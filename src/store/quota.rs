//! Quota accounting per scope.

use std::collections::HashMap;
use std::fmt;

use crate::{PicvaultError, Result};

/// Unit over which quota is tracked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The whole store (single-tenant mode).
    Global,
    /// One account (multi-tenant mode).
    Account(String),
}

/// Used and allowed bytes for one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    /// Bytes consumed by live records.
    pub used_bytes: u64,
    /// Configured ceiling.
    pub limit_bytes: u64,
}

impl Usage {
    /// Bytes still available.
    pub fn remaining(&self) -> u64 {
        self.limit_bytes.saturating_sub(self.used_bytes)
    }

    /// Percentage of the limit in use, 0.0 to 100.0.
    pub fn percent_used(&self) -> f64 {
        if self.limit_bytes == 0 {
            return 100.0;
        }
        (self.used_bytes as f64 / self.limit_bytes as f64 * 100.0).min(100.0)
    }
}

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} GB / {:.2} GB",
            self.used_bytes as f64 / GIB,
            self.limit_bytes as f64 / GIB
        )
    }
}

/// Tracks bytes consumed per scope against a single configured limit.
///
/// The ledger holds no lock of its own; it lives inside the store's index
/// state so every change commits together with the record it accounts for.
#[derive(Debug, Clone)]
pub struct QuotaLedger {
    limit_bytes: u64,
    used: HashMap<Scope, u64>,
}

impl QuotaLedger {
    /// Create an empty ledger with the given per-scope limit.
    pub fn new(limit_bytes: u64) -> Self {
        Self {
            limit_bytes,
            used: HashMap::new(),
        }
    }

    /// Rebuild a ledger from the live record set.
    pub fn from_entries<I>(limit_bytes: u64, entries: I) -> Self
    where
        I: IntoIterator<Item = (Scope, u64)>,
    {
        let mut ledger = Self::new(limit_bytes);
        for (scope, size) in entries {
            *ledger.used.entry(scope).or_insert(0) += size;
        }
        ledger
    }

    /// Check that `delta` more bytes fit in `scope` without committing.
    pub fn check(&self, scope: &Scope, delta: u64) -> Result<()> {
        let used = self.used_bytes(scope);
        match used.checked_add(delta) {
            Some(total) if total <= self.limit_bytes => Ok(()),
            _ => Err(PicvaultError::QuotaExceeded {
                requested: delta,
                used,
                limit: self.limit_bytes,
            }),
        }
    }

    /// Commit `delta` bytes to `scope`, failing if the limit would be exceeded.
    pub fn reserve(&mut self, scope: &Scope, delta: u64) -> Result<()> {
        self.check(scope, delta)?;
        *self.used.entry(scope.clone()).or_insert(0) += delta;
        Ok(())
    }

    /// Return `delta` bytes to `scope`. Never goes below zero.
    pub fn release(&mut self, scope: &Scope, delta: u64) {
        if let Some(used) = self.used.get_mut(scope) {
            *used = used.saturating_sub(delta);
            if *used == 0 {
                self.used.remove(scope);
            }
        }
    }

    /// Bytes currently used in `scope`.
    pub fn used_bytes(&self, scope: &Scope) -> u64 {
        self.used.get(scope).copied().unwrap_or(0)
    }

    /// Usage snapshot for `scope`.
    pub fn usage(&self, scope: &Scope) -> Usage {
        Usage {
            used_bytes: self.used_bytes(scope),
            limit_bytes: self.limit_bytes,
        }
    }
}
