//! # Module Aggregator / 模块汇总器
//!
//! Per-module pass/fail/skip counters shared by every worker. Each module has
//! its own atomic counters behind a concurrent map, so increments on
//! different modules never contend and increments on the same module are
//! never lost.
//!
//! 所有工作线程共享的按模块通过/失败/跳过计数器。

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::core::models::{ModuleStats, Status, module_name_for};

#[derive(Debug, Default)]
struct Counters {
    passed: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

impl Counters {
    fn bump(&self, status: Status) {
        let counter = match status {
            Status::Pass => &self.passed,
            Status::Fail => &self.failed,
            Status::Skipped => &self.skipped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn load(&self) -> ModuleStats {
        ModuleStats {
            passed: self.passed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

/// Thread-safe per-module statistics.
#[derive(Debug, Default)]
pub struct ModuleAggregator {
    modules: DashMap<String, Counters>,
}

impl ModuleAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one outcome to `module`, creating its counters on first use.
    pub fn increment(&self, module: &str, status: Status) {
        if let Some(counters) = self.modules.get(module) {
            counters.bump(status);
            return;
        }
        self.modules
            .entry(module.to_string())
            .or_default()
            .bump(status);
        debug!(module, "module counters created");
    }

    /// Records a raw result line (`PASS`, `FAIL`, `SKIP` or `SKIPPED`, any
    /// case) under the module derived from `test_name`. Unknown statuses are
    /// logged and ignored.
    pub fn record_test_result(&self, test_name: &str, status: &str) -> bool {
        match status.parse::<Status>() {
            Ok(status) => {
                self.increment(&module_name_for(test_name), status);
                true
            }
            Err(_) => {
                warn!(test_name, status, "ignoring result with unknown status");
                false
            }
        }
    }

    pub fn get(&self, module: &str) -> Option<ModuleStats> {
        self.modules.get(module).map(|c| c.load())
    }

    /// A point-in-time copy of every module, ordered by name.
    pub fn snapshot(&self) -> BTreeMap<String, ModuleStats> {
        self.modules
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load()))
            .collect()
    }

    /// Sum over all modules.
    pub fn totals(&self) -> ModuleStats {
        self.modules
            .iter()
            .fold(ModuleStats::default(), |acc, entry| acc + entry.value().load())
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
