// Copyright (c) The suite-monitor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deduplication and classification of test results.

use std::collections::HashSet;
use suite_monitor_metadata::{TestExecution, TestExecutionStatus, TestId};

/// How a recorded test is counted in the report.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TestOutcome {
    /// The test passed.
    Passed,

    /// The test reached any other terminal status.
    Failed,
}

impl TestOutcome {
    fn from_status(status: &TestExecutionStatus) -> Self {
        if status.is_passed() {
            Self::Passed
        } else {
            Self::Failed
        }
    }
}

/// A test whose terminal status has been recorded.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecordedTest {
    /// The test execution identifier.
    pub id: TestId,

    /// The name of the test.
    pub name: String,

    /// The terminal status the test was first observed with.
    pub status: TestExecutionStatus,
}

impl RecordedTest {
    fn new(test: &TestExecution) -> Self {
        Self {
            id: test.id.clone(),
            name: test.test_name.clone(),
            status: test.status.clone(),
        }
    }
}

/// Test results accumulated over a monitoring session.
///
/// Both lists are in discovery order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ExecutionReport {
    /// Tests that passed.
    pub passed: Vec<RecordedTest>,

    /// Tests that failed, were canceled, or errored.
    pub failed: Vec<RecordedTest>,
}

impl ExecutionReport {
    /// Returns the total number of recorded tests.
    pub fn total(&self) -> usize {
        self.passed.len() + self.failed.len()
    }

    /// Returns true if no failed tests were recorded.
    pub fn all_passed(&self) -> bool {
        self.failed.is_empty()
    }

    /// Iterates over every recorded test, passed tests first.
    pub fn iter(&self) -> impl Iterator<Item = &RecordedTest> {
        self.passed.iter().chain(&self.failed)
    }
}

/// Records each test the first time it is observed in a terminal status.
///
/// Every recorded id is kept in a seen-set, so later observations of the same test are ignored
/// regardless of the status they carry.
#[derive(Debug, Default)]
pub struct ResultCollector {
    seen: HashSet<TestId>,
    report: ExecutionReport,
}

impl ResultCollector {
    /// Creates a new, empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `test` if its status is in `terminal_statuses` and it hasn't been recorded before.
    ///
    /// Returns the outcome if the test was recorded by this call.
    pub fn record(
        &mut self,
        test: &TestExecution,
        terminal_statuses: &HashSet<TestExecutionStatus>,
    ) -> Option<TestOutcome> {
        if !terminal_statuses.contains(&test.status) || self.seen.contains(&test.id) {
            return None;
        }

        self.seen.insert(test.id.clone());
        let outcome = TestOutcome::from_status(&test.status);
        let bucket = match outcome {
            TestOutcome::Passed => &mut self.report.passed,
            TestOutcome::Failed => &mut self.report.failed,
        };
        bucket.push(RecordedTest::new(test));
        Some(outcome)
    }

    /// Returns the number of distinct tests recorded so far.
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Returns the report accumulated so far.
    pub fn report(&self) -> &ExecutionReport {
        &self.report
    }

    /// Consumes the collector, returning the accumulated report.
    pub fn into_report(self) -> ExecutionReport {
        self.report
    }
}
