use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::RwLock;

use crate::feature_state::{FeatureEnvironment, FeatureState, FeatureValueType};
use crate::holder::FeatureStateHolder;

/// A signal from the update source (poller or push listener): either a fresh
/// snapshot of feature groups, or notice that a fetch failed. Failure carries
/// no payload.
#[derive(Clone, Debug)]
pub enum UpdateSignal {
    /// A successful fetch. The payload may be empty, which still counts as a
    /// complete zero-feature snapshot.
    Features(Vec<FeatureEnvironment>),
    Failed,
}

/// FeatureRepository is the locally queryable, versioned view of the features
/// the update source has delivered so far. One instance exists per SDK
/// client; it lives for the client's lifetime.
///
/// Readers and the update source may use the repository concurrently. Each
/// key's holder is replaced by a single `Arc` swap, so a per-key read is
/// always internally consistent; cross-key consistency within one batch is
/// not guaranteed.
pub struct FeatureRepository {
    features: RwLock<HashMap<String, Arc<FeatureStateHolder>>>,
    ready: AtomicBool,
}

impl Default for FeatureRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureRepository {
    pub fn new() -> Self {
        FeatureRepository {
            features: RwLock::new(HashMap::new()),
            ready: AtomicBool::new(false),
        }
    }

    /// The single ingestion entry point, called by the update source with the
    /// outcome of each fetch.
    ///
    /// A successful snapshot (even an empty one) marks the repository ready.
    /// A failure marks it not ready but leaves cached data in place, so
    /// callers can keep serving stale values while the readiness flag tells
    /// them not to trust freshness.
    pub fn notify(&self, signal: UpdateSignal) {
        match signal {
            UpdateSignal::Features(environments) => {
                debug!("received snapshot of {} feature group(s)", environments.len());
                for environment in environments {
                    for state in environment.features.unwrap_or_default() {
                        self.feature_update(state);
                    }
                }
                self.ready.store(true, Ordering::SeqCst);
            }
            UpdateSignal::Failed => {
                warn!("update source reported a failure, repository is no longer ready");
                self.ready.store(false, Ordering::SeqCst);
            }
        }
    }

    /// Whether at least one successful snapshot has arrived since the last
    /// failure. Callers should check this before treating a miss from
    /// [FeatureRepository::feature] as authoritative.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// The current holder for `key`, or `None` if the key has never been
    /// seen. Before the repository is ready a miss may simply mean the
    /// initial snapshot has not arrived yet.
    pub fn feature(&self, key: &str) -> Option<Arc<FeatureStateHolder>> {
        self.features.read().get(key).cloned()
    }

    pub fn get_flag(&self, key: &str) -> Option<bool> {
        self.feature(key).and_then(|holder| holder.get_boolean())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.feature(key).and_then(|holder| holder.get_string())
    }

    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.feature(key).and_then(|holder| holder.get_number())
    }

    pub fn get_raw_json(&self, key: &str) -> Option<String> {
        self.feature(key).and_then(|holder| holder.get_raw_json())
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.feature(key).map_or(false, |holder| holder.is_set())
    }

    /// Every known feature key with its current value rendered as a string,
    /// primarily for passing down the line in headers.
    pub fn simple_features(&self) -> HashMap<String, Option<String>> {
        self.features
            .read()
            .iter()
            .map(|(key, holder)| {
                let value = match holder.feature_type() {
                    FeatureValueType::Boolean => holder.get_boolean().map(|b| b.to_string()),
                    FeatureValueType::String => holder.get_string(),
                    FeatureValueType::Number => holder.get_number().map(|n| n.to_string()),
                    FeatureValueType::Json => holder.get_raw_json(),
                };
                (key.clone(), value)
            })
            .collect()
    }

    /// Number of distinct feature keys seen so far. The cache is
    /// monotone-growing: keys are never removed.
    pub fn len(&self) -> usize {
        self.features.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.read().is_empty()
    }

    // Applies the last-writer-wins merge rule for one record. The decision
    // and the replacement happen under one write-lock acquisition, so
    // concurrent ingestion calls cannot interleave at the single-key level.
    fn feature_update(&self, state: FeatureState) {
        let incoming = match FeatureStateHolder::try_from(state) {
            Ok(holder) => holder,
            Err(incomplete) => {
                warn!("discarding feature state record: {}", incomplete);
                return;
            }
        };

        let mut features = self.features.write();
        if let Some(existing) = features.get(incoming.key()) {
            if incoming.version() < existing.version() {
                // stale or out-of-order, never regress a key's revision
                return;
            }
            if incoming.version() == existing.version() && incoming.value() == existing.value() {
                // exact duplicate, keep the existing holder so readers
                // retain a stable reference
                return;
            }
        }
        features.insert(incoming.key().to_owned(), Arc::new(incoming));
    }
}
