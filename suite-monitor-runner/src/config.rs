// Copyright (c) The suite-monitor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for suite-monitor.

use crate::{
    api::PathTemplate,
    errors::{ConfigParseError, ConfigParseErrorKind, ProfileNotFound},
};
use camino::Utf8Path;
use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::{collections::HashMap, num::NonZeroUsize, time::Duration};
use suite_monitor_metadata::{SuiteExecutionStatus, TestExecutionStatus};

/// Overall configuration for suite-monitor.
///
/// This is the root data structure for suite-monitor configuration. Settings are grouped into
/// [profiles](MonitorProfile), obtained through the [`profile`](Self::profile) method.
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    inner: MonitorConfigImpl,
}

impl MonitorConfig {
    /// The default location of the config within the path: `.config/suite-monitor.toml`, used to
    /// read the config from the given directory.
    pub const CONFIG_PATH: &'static str = ".config/suite-monitor.toml";

    /// Contains the default config as a TOML file.
    ///
    /// User configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// The name of the default profile.
    pub const DEFAULT_PROFILE: &'static str = "default";

    /// Reads the config from the given file, or if not specified from `.config/suite-monitor.toml`
    /// in `current_dir`.
    ///
    /// If no config file is specified and `current_dir` doesn't have `.config/suite-monitor.toml`,
    /// uses the default config options.
    pub fn from_sources(
        current_dir: impl AsRef<Utf8Path>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = current_dir.as_ref().join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let inner = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(config_file.clone(), kind))?;

        let config = Self { inner };
        config
            .validate()
            .map_err(|kind| ConfigParseError::new(config_file, kind))?;
        Ok(config)
    }

    /// Returns the default suite-monitor config.
    pub fn default_config() -> Self {
        let config = Self::make_default_config()
            .build()
            .expect("default config is always valid");

        let inner = config
            .try_deserialize()
            .expect("default config is always valid");
        Self { inner }
    }

    /// Returns the profile with the given name, or an error if a profile was specified but not
    /// found.
    pub fn profile(&self, name: impl AsRef<str>) -> Result<MonitorProfile<'_>, ProfileNotFound> {
        let name = name.as_ref();
        let custom_profile = self.inner.profiles.get(name)?;
        Ok(MonitorProfile {
            name: name.to_owned(),
            default_profile: &self.inner.profiles.default,
            custom_profile,
        })
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<MonitorConfigImpl, ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|err| ConfigParseErrorKind::BuildError(Box::new(err)))?;

        serde_path_to_error::deserialize(config)
            .map_err(|err| ConfigParseErrorKind::DeserializeError(Box::new(err)))
    }

    // Checks settings that serde can't express, for every profile as it would be resolved.
    fn validate(&self) -> Result<(), ConfigParseErrorKind> {
        let profiles = &self.inner.profiles;
        let all_profiles = std::iter::once((Self::DEFAULT_PROFILE, None)).chain(
            profiles
                .other
                .iter()
                .map(|(name, profile)| (name.as_str(), Some(profile))),
        );

        for (name, custom_profile) in all_profiles {
            let profile = MonitorProfile {
                name: name.to_owned(),
                default_profile: &profiles.default,
                custom_profile,
            };

            for template in [profile.trigger_path(), profile.poll_path()] {
                template
                    .check()
                    .map_err(|err| ConfigParseErrorKind::InvalidPathTemplate {
                        profile_name: name.to_owned(),
                        err,
                    })?;
            }

            let terminal_statuses = profile.terminal_suite_statuses();
            if !terminal_statuses.contains(profile.success_status()) {
                return Err(ConfigParseErrorKind::SuccessStatusNotTerminal {
                    profile_name: name.to_owned(),
                    success_status: profile.success_status().clone(),
                    terminal_statuses: terminal_statuses.to_vec(),
                });
            }
        }

        Ok(())
    }
}

/// A configuration profile for suite-monitor. Contains all settings used by the trigger client
/// and the execution monitor.
///
/// Returned by [`MonitorConfig::profile`].
#[derive(Clone, Debug)]
pub struct MonitorProfile<'cfg> {
    name: String,
    default_profile: &'cfg DefaultProfileImpl,
    custom_profile: Option<&'cfg CustomProfileImpl>,
}

impl<'cfg> MonitorProfile<'cfg> {
    /// Returns the name of this profile.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the default API base URL, or `None` if the base URL must be provided as an input.
    pub fn api_base_url(&self) -> Option<&'cfg str> {
        let url = self
            .custom_profile
            .and_then(|profile| profile.api_base_url.as_deref())
            .unwrap_or(&self.default_profile.api_base_url)
            .trim();
        (!url.is_empty()).then_some(url)
    }

    /// Returns the maximum number of polls.
    pub fn max_attempts(&self) -> NonZeroUsize {
        self.custom_profile
            .and_then(|profile| profile.max_attempts)
            .unwrap_or(self.default_profile.max_attempts)
    }

    /// Returns the time to wait between polls.
    pub fn wait_interval(&self) -> Duration {
        self.custom_profile
            .and_then(|profile| profile.wait_interval)
            .unwrap_or(self.default_profile.wait_interval)
    }

    /// Returns the timeout for an individual HTTP request.
    pub fn request_timeout(&self) -> Duration {
        self.custom_profile
            .and_then(|profile| profile.request_timeout)
            .unwrap_or(self.default_profile.request_timeout)
    }

    /// Returns the suite status that makes a run successful.
    pub fn success_status(&self) -> &'cfg SuiteExecutionStatus {
        self.custom_profile
            .and_then(|profile| profile.success_status.as_ref())
            .unwrap_or(&self.default_profile.success_status)
    }

    /// Returns the suite statuses that end monitoring.
    pub fn terminal_suite_statuses(&self) -> &'cfg [SuiteExecutionStatus] {
        self.custom_profile
            .and_then(|profile| profile.terminal_suite_statuses.as_deref())
            .unwrap_or(&self.default_profile.terminal_suite_statuses)
    }

    /// Returns the test statuses that cause a test result to be recorded.
    pub fn terminal_test_statuses(&self) -> &'cfg [TestExecutionStatus] {
        self.custom_profile
            .and_then(|profile| profile.terminal_test_statuses.as_deref())
            .unwrap_or(&self.default_profile.terminal_test_statuses)
    }

    /// Returns the path template used to start a suite execution.
    pub fn trigger_path(&self) -> PathTemplate {
        let template = self
            .custom_profile
            .and_then(|profile| profile.trigger_path.as_deref())
            .unwrap_or(&self.default_profile.trigger_path);
        PathTemplate::new("trigger-path", template, "suite_id")
    }

    /// Returns the path template used to poll a suite execution.
    pub fn poll_path(&self) -> PathTemplate {
        let template = self
            .custom_profile
            .and_then(|profile| profile.poll_path.as_deref())
            .unwrap_or(&self.default_profile.poll_path);
        PathTemplate::new("poll-path", template, "execution_id")
    }

    /// Returns the width of the name column in the summary table.
    pub fn name_column_width(&self) -> usize {
        self.custom_profile
            .and_then(|profile| profile.report.name_column_width)
            .unwrap_or(self.default_profile.report.name_column_width)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct MonitorConfigImpl {
    #[serde(rename = "profile")]
    profiles: MonitorProfilesImpl,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct MonitorProfilesImpl {
    default: DefaultProfileImpl,
    #[serde(flatten)]
    other: HashMap<String, CustomProfileImpl>,
}

impl MonitorProfilesImpl {
    fn get(&self, profile: &str) -> Result<Option<&CustomProfileImpl>, ProfileNotFound> {
        let custom_profile = match profile {
            MonitorConfig::DEFAULT_PROFILE => None,
            other => Some(
                self.other
                    .get(other)
                    .ok_or_else(|| ProfileNotFound::new(profile, self.all_profiles()))?,
            ),
        };
        Ok(custom_profile)
    }

    fn all_profiles(&self) -> impl Iterator<Item = &str> {
        self.other
            .keys()
            .map(|key| key.as_str())
            .chain(std::iter::once(MonitorConfig::DEFAULT_PROFILE))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DefaultProfileImpl {
    api_base_url: String,
    max_attempts: NonZeroUsize,
    #[serde(with = "humantime_serde")]
    wait_interval: Duration,
    success_status: SuiteExecutionStatus,
    terminal_suite_statuses: Vec<SuiteExecutionStatus>,
    terminal_test_statuses: Vec<TestExecutionStatus>,
    trigger_path: String,
    poll_path: String,
    #[serde(with = "humantime_serde")]
    request_timeout: Duration,
    report: DefaultReportImpl,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DefaultReportImpl {
    name_column_width: usize,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CustomProfileImpl {
    #[serde(default)]
    api_base_url: Option<String>,
    #[serde(default)]
    max_attempts: Option<NonZeroUsize>,
    #[serde(default, with = "humantime_serde::option")]
    wait_interval: Option<Duration>,
    #[serde(default)]
    success_status: Option<SuiteExecutionStatus>,
    #[serde(default)]
    terminal_suite_statuses: Option<Vec<SuiteExecutionStatus>>,
    #[serde(default)]
    terminal_test_statuses: Option<Vec<TestExecutionStatus>>,
    #[serde(default)]
    trigger_path: Option<String>,
    #[serde(default)]
    poll_path: Option<String>,
    #[serde(default, with = "humantime_serde::option")]
    request_timeout: Option<Duration>,
    #[serde(default)]
    report: CustomReportImpl,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CustomReportImpl {
    #[serde(default)]
    name_column_width: Option<usize>,
}
