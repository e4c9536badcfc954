// Copyright (c) The suite-monitor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use smol_str::SmolStr;
use std::{convert::Infallible, fmt, str::FromStr};

macro_rules! id_type {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
        #[serde(transparent)]
        pub struct $name(SmolStr);

        impl $name {
            /// Creates a new identifier.
            pub fn new(id: &str) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserializer.deserialize_any(IdVisitor).map(Self)
            }
        }
    };
}

id_type! {
    /// The identifier of a test suite: the thing that gets triggered.
    SuiteId
}

id_type! {
    /// The identifier of one execution of a test suite, returned by the trigger request.
    ExecutionId
}

id_type! {
    /// The identifier of a single test execution within a suite execution.
    TestId
}

// The service has been observed to send identifiers both as strings and as integers.
struct IdVisitor;

impl de::Visitor<'_> for IdVisitor {
    type Value = SmolStr;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a string or an integer identifier")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(v.into())
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(SmolStr::new(v.to_string()))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(SmolStr::new(v.to_string()))
    }
}

/// The status of a suite execution, as reported by the service.
///
/// Statuses the service may add in the future are preserved verbatim in
/// [`Other`](Self::Other), so that they can still be named in configuration.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum SuiteExecutionStatus {
    /// The execution is queued.
    Pending,

    /// The execution is in progress.
    Running,

    /// The execution finished. This is the only successful terminal status by default.
    Completed,

    /// The execution finished with failures.
    Failed,

    /// The execution was canceled.
    Canceled,

    /// The service hit an internal error while running the execution.
    Error,

    /// Any other status.
    Other(SmolStr),
}

impl SuiteExecutionStatus {
    /// Returns the wire representation of this status.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Error => "error",
            Self::Other(other) => other,
        }
    }
}

impl FromStr for SuiteExecutionStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "canceled" => Self::Canceled,
            "error" => Self::Error,
            other => Self::Other(other.into()),
        };
        Ok(status)
    }
}

/// The status of a single test execution, as reported by the service.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum TestExecutionStatus {
    /// The test has not started yet.
    Pending,

    /// The test is in progress.
    Running,

    /// The test passed.
    Passed,

    /// The test failed.
    Failed,

    /// The test was canceled.
    Canceled,

    /// The service hit an internal error while running the test.
    Error,

    /// Any other status.
    Other(SmolStr),
}

impl TestExecutionStatus {
    /// Returns the wire representation of this status.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Error => "error",
            Self::Other(other) => other,
        }
    }

    /// Returns true if this status is [`Passed`](Self::Passed).
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl FromStr for TestExecutionStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "passed" => Self::Passed,
            "failed" => Self::Failed,
            "canceled" => Self::Canceled,
            "error" => Self::Error,
            other => Self::Other(other.into()),
        };
        Ok(status)
    }
}

macro_rules! string_status_impls {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
                match s.parse() {
                    Ok(status) => Ok(status),
                    Err(never) => match never {},
                }
            }
        }
    };
}

string_status_impls!(SuiteExecutionStatus);
string_status_impls!(TestExecutionStatus);

/// A suite execution, as returned by the trigger request.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SuiteExecution {
    /// The execution identifier, used for all subsequent polls.
    pub id: ExecutionId,

    /// The initial status of the execution, if the service reported one.
    #[serde(default)]
    pub status: Option<SuiteExecutionStatus>,
}

/// The suite-level part of a poll response.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SuiteExecutionState {
    /// The current status of the suite execution. A missing or `null` status is never
    /// terminal.
    #[serde(default)]
    pub status: Option<SuiteExecutionStatus>,
}

/// A single test execution within a suite execution.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestExecution {
    /// The test execution identifier.
    pub id: TestId,

    /// The human-readable name of the test. Tests that have not finished may not have one yet.
    #[serde(default)]
    pub test_name: String,

    /// The current status of the test.
    pub status: TestExecutionStatus,
}

/// The response to a poll: the suite state plus every test execution known so far.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSnapshot {
    /// The state of the suite execution as a whole.
    pub test_suite_execution: SuiteExecutionState,

    /// All test executions, in the order the service returned them.
    #[serde(default)]
    pub test_executions: Vec<TestExecution>,
}
