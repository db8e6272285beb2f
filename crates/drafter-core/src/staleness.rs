//! Staleness evaluation over the dependency graph and store timestamps.

use crate::error::Result;
use crate::graph::DependencyGraph;
use crate::keys::Key;
use crate::storage::ContentStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    NotGenerated,
    Fresh,
    /// A direct dependency was written after this key.
    Stale,
    /// Newer than every direct dependency, but something further upstream
    /// is stale, so regenerating upstream will make this key stale.
    UpstreamStale,
}

impl Freshness {
    /// Whether an outdated-only regeneration should revisit the key.
    pub fn is_outdated(self) -> bool {
        matches!(self, Freshness::Stale | Freshness::UpstreamStale)
    }
}

/// Evaluates staleness for one snapshot of the store.
///
/// A key is stale iff some direct dependency was written after it. Keys
/// without versions are never stale, and dependencies without versions are
/// skipped. Stale ancestors beyond the first hop are reported separately by
/// [`StalenessEvaluator::has_stale_upstream`].
pub struct StalenessEvaluator<'a, S: ContentStore + ?Sized> {
    graph: &'a DependencyGraph,
    store: &'a S,
    stale: HashMap<Key, bool>,
    upstream: HashMap<Key, bool>,
}

impl<'a, S: ContentStore + ?Sized> StalenessEvaluator<'a, S> {
    pub fn new(graph: &'a DependencyGraph, store: &'a S) -> Self {
        Self {
            graph,
            store,
            stale: HashMap::new(),
            upstream: HashMap::new(),
        }
    }

    pub fn is_stale(&mut self, key: Key) -> Result<bool> {
        if let Some(stale) = self.stale.get(&key) {
            return Ok(*stale);
        }
        let stale = match self.store.get_timestamp(key)? {
            None => false,
            Some(own) => self.newer_dependency(key, own)?,
        };
        self.stale.insert(key, stale);
        Ok(stale)
    }

    /// True when any ancestor of `key`, at any depth, is stale.
    pub fn has_stale_upstream(&mut self, key: Key) -> Result<bool> {
        if let Some(found) = self.upstream.get(&key) {
            return Ok(*found);
        }
        let mut found = false;
        for dep in self.graph.dependencies_of(key) {
            let upstream = dep.timestamp_key();
            // The graph is acyclic, so this recursion terminates.
            if self.is_stale(upstream)? || self.has_stale_upstream(upstream)? {
                found = true;
                break;
            }
        }
        self.upstream.insert(key, found);
        Ok(found)
    }

    pub fn status(&mut self, key: Key) -> Result<Freshness> {
        if self.store.get_timestamp(key)?.is_none() {
            return Ok(Freshness::NotGenerated);
        }
        Ok(if self.is_stale(key)? {
            Freshness::Stale
        } else if self.has_stale_upstream(key)? {
            Freshness::UpstreamStale
        } else {
            Freshness::Fresh
        })
    }

    fn newer_dependency(&self, key: Key, own: DateTime<Utc>) -> Result<bool> {
        for dep in self.graph.dependencies_of(key) {
            let upstream = dep.timestamp_key();
            let Some(ts) = self.store.get_timestamp(upstream)? else {
                continue;
            };
            if ts > own {
                log::debug!("{} is stale: {} changed at {}", key, upstream, ts);
                return Ok(true);
            }
        }
        Ok(false)
    }
}
