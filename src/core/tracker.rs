//! # Step Tracker Module / 步骤跟踪模块
//!
//! The step tracker collects steps from many concurrently running tests. Every
//! test execution is keyed by its test case id and lives in its own cell, so
//! workers recording steps for different tests only meet briefly on the map
//! shard lookup. Within one execution, steps are appended under the cell's
//! mutex: numbering, deduplication and the sticky FAIL rollup all happen
//! inside that one critical section.
//!
//! Completion is decided once per execution. The first caller that sees the
//! observed step count reach the expected count flips the cell's
//! `completed` flag, sets the end time, and commits the rollup status to the
//! module aggregator. Losing racers do nothing, so module counters are
//! committed exactly once per execution.
//!
//! 步骤跟踪器收集来自多个并发运行测试的步骤。每个测试执行以其测试用例 ID
//! 为键，存放在各自的单元中。单个执行内的步骤编号、去重以及"失败优先"的
//! 状态汇总都在该单元的互斥锁内完成。每个执行只会完成一次，
//! 模块统计也只会提交一次。

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::core::aggregator::ModuleAggregator;
use crate::core::context::EvidenceSource;
use crate::core::models::{ExecutionState, Status, Step, StepRecord, TestExecution};

/// What happened to a recorded step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// An identical (action, expected) step already exists; nothing changed.
    Duplicate,
    /// The step was appended with this number.
    Appended { step: u32 },
    /// The step was appended and completed its execution; `status` was
    /// committed to the module aggregator.
    Completed { step: u32, status: Status },
}

#[derive(Debug)]
struct ExecutionCell {
    seq: u64,
    completed: AtomicBool,
    inner: Mutex<TestExecution>,
}

impl ExecutionCell {
    fn new(seq: u64, execution: TestExecution) -> Self {
        Self {
            seq,
            completed: AtomicBool::new(false),
            inner: Mutex::new(execution),
        }
    }

    /// Claims the one-time completion of this execution.
    fn claim_completion(&self) -> bool {
        self.completed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Concurrent registry of test executions.
/// 测试执行的并发注册表。
#[derive(Debug)]
pub struct StepTracker {
    executions: DashMap<String, Arc<ExecutionCell>>,
    next_seq: AtomicU64,
    modules: Arc<ModuleAggregator>,
}

impl Default for StepTracker {
    fn default() -> Self {
        Self::new(Arc::new(ModuleAggregator::new()))
    }
}

impl StepTracker {
    pub fn new(modules: Arc<ModuleAggregator>) -> Self {
        Self {
            executions: DashMap::new(),
            next_seq: AtomicU64::new(0),
            modules,
        }
    }

    /// The aggregator completed executions are committed to.
    pub fn modules(&self) -> &Arc<ModuleAggregator> {
        &self.modules
    }

    fn cell_for(&self, record: &StepRecord) -> Arc<ExecutionCell> {
        if let Some(cell) = self.executions.get(&record.test_case_id) {
            return Arc::clone(cell.value());
        }
        let cell = self
            .executions
            .entry(record.test_case_id.clone())
            .or_insert_with(|| {
                debug!(test_case_id = %record.test_case_id, module = %record.module, "new test execution");
                Arc::new(ExecutionCell::new(
                    self.next_seq.fetch_add(1, Ordering::Relaxed),
                    TestExecution::new(
                        record.module.as_str(),
                        record.scenario_id.as_str(),
                        record.test_case_id.as_str(),
                        record.description.as_str(),
                        Status::Pass,
                    ),
                ))
            });
        Arc::clone(cell.value())
    }

    /// Records one step of a running test.
    ///
    /// The execution is created on the first step of its test case id. A step
    /// whose (action, expected) pair is already present is not appended, but
    /// still raises the expected step count. Evidence
    /// comes from the record itself or, failing that, from `evidence`; a
    /// capture failure is logged and the step is recorded without evidence.
    pub fn record_step(
        &self,
        record: StepRecord,
        evidence: Option<&dyn EvidenceSource>,
    ) -> RecordOutcome {
        let cell = self.cell_for(&record);

        let committed = {
            let mut execution = cell.inner.lock();

            // Every call counts toward the expected steps, duplicates included.
            execution.expected_steps += 1;
            if let Some(existing) = execution.find_duplicate(&record.action, &record.expected) {
                debug!(
                    test_case_id = %record.test_case_id,
                    step = existing.number,
                    action = %record.action,
                    "duplicate step ignored"
                );
                return RecordOutcome::Duplicate;
            }

            let number = record
                .step_hint
                .unwrap_or(0)
                .max(execution.observed_steps() + 1);

            let evidence = record.evidence.or_else(|| {
                let source = evidence?;
                match source.capture_evidence() {
                    Ok(reference) => Some(reference),
                    Err(e) => {
                        warn!(test_case_id = %record.test_case_id, step = number, "evidence capture failed: {e}");
                        None
                    }
                }
            });

            execution.steps.push(Step {
                number,
                action: record.action,
                expected: record.expected,
                actual: record.actual,
                status: record.status,
                evidence,
            });
            if record.status == Status::Fail {
                execution.status = Status::Fail;
            }
            execution.declared_steps = execution.declared_steps.max(record.expected_total);

            if execution.observed_steps() < execution.completion_threshold() {
                return RecordOutcome::Appended { step: number };
            }
            if !cell.claim_completion() {
                debug!(test_case_id = %record.test_case_id, step = number, "step appended after completion");
                return RecordOutcome::Appended { step: number };
            }
            execution.ended_at = Some(chrono::Local::now());
            execution.state = ExecutionState::Complete;
            (execution.module.clone(), execution.status, number)
        };

        let (module, status, step) = committed;
        self.modules.increment(&module, status);
        info!(test_case_id = %record.test_case_id, module = %module, %status, "test execution complete");
        RecordOutcome::Completed { step, status }
    }

    /// Records a boolean check as a step, choosing the actual text by outcome.
    pub fn update_step(
        &self,
        record: StepRecord,
        passed: bool,
        on_fail: &str,
        on_pass: &str,
        evidence: Option<&dyn EvidenceSource>,
    ) -> RecordOutcome {
        let record = if passed {
            record.actual(on_pass).status(Status::Pass)
        } else {
            record.actual(on_fail).status(Status::Fail)
        };
        self.record_step(record, evidence)
    }

    /// Forces completion of an open execution, committing its current rollup.
    ///
    /// Returns `false` when the execution is unknown or already complete.
    pub fn finalize(&self, test_case_id: &str) -> bool {
        let Some(cell) = self.executions.get(test_case_id).map(|c| Arc::clone(c.value())) else {
            return false;
        };
        let (module, status) = {
            let mut execution = cell.inner.lock();
            if !cell.claim_completion() {
                return false;
            }
            execution.ended_at = Some(chrono::Local::now());
            execution.state = ExecutionState::Complete;
            (execution.module.clone(), execution.status)
        };
        self.modules.increment(&module, status);
        info!(test_case_id, module = %module, %status, "test execution finalized");
        true
    }

    /// Registers a whole test execution with a known outcome and no steps.
    ///
    /// The execution is complete on arrival and its status is committed
    /// immediately. A test case id that is already registered is rejected
    /// with a warning.
    pub fn add_test_execution(
        &self,
        module: &str,
        scenario_id: &str,
        test_case_id: &str,
        description: &str,
        status: Status,
    ) -> bool {
        match self.executions.entry(test_case_id.to_string()) {
            Entry::Occupied(_) => {
                warn!(test_case_id, "test execution already registered; ignoring");
                false
            }
            Entry::Vacant(vacant) => {
                let mut execution =
                    TestExecution::new(module, scenario_id, test_case_id, description, status);
                execution.ended_at = Some(execution.started_at);
                execution.state = ExecutionState::Complete;
                let cell = ExecutionCell::new(self.next_seq.fetch_add(1, Ordering::Relaxed), execution);
                cell.completed.store(true, Ordering::Release);
                vacant.insert(Arc::new(cell));
                self.modules.increment(module, status);
                debug!(test_case_id, module, %status, "test execution added");
                true
            }
        }
    }

    /// Marks a test case as skipped.
    pub fn mark_skipped(&self, module: &str, test_case_id: &str, reason: &str) -> bool {
        self.add_test_execution(module, "", test_case_id, reason, Status::Skipped)
    }

    /// A copy of one execution.
    pub fn get(&self, test_case_id: &str) -> Option<TestExecution> {
        let cell = self.executions.get(test_case_id).map(|c| Arc::clone(c.value()))?;
        let execution = cell.inner.lock().clone();
        Some(execution)
    }

    /// Copies of all executions in the order they were first seen.
    pub fn executions(&self) -> Vec<TestExecution> {
        let mut cells: Vec<Arc<ExecutionCell>> = self
            .executions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        cells.sort_by_key(|cell| cell.seq);
        cells.iter().map(|cell| cell.inner.lock().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.executions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }
}
