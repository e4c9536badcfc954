// Copyright (c) The suite-monitor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::{Args, ValueEnum};
use owo_colors::{OwoColorize, Style, style};
use std::{
    fmt,
    io::{BufWriter, Write},
};
use tracing::{
    Event, Level, Metadata, Subscriber,
    field::{Field, Visit},
    level_filters::LevelFilter,
    warn,
};
use tracing_subscriber::{
    Layer,
    filter::{ParseError, Targets},
    fmt::{FmtContext, FormatEvent, FormatFields, format},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// The log target for messages printed without an `error:`/`warning:` heading.
pub(crate) const NO_HEADING_TARGET: &str = "suite_monitor::no_heading";

/// The environment variable used to filter log output.
const LOG_ENV: &str = "SUITE_MONITOR_LOG";

pub(crate) mod clap_styles {
    use clap::builder::{
        Styles,
        styling::{AnsiColor, Effects, Style},
    };

    const HEADER: Style = AnsiColor::Green.on_default().effects(Effects::BOLD);
    const USAGE: Style = AnsiColor::Green.on_default().effects(Effects::BOLD);
    const LITERAL: Style = AnsiColor::Cyan.on_default().effects(Effects::BOLD);
    const PLACEHOLDER: Style = AnsiColor::Cyan.on_default();
    const ERROR: Style = AnsiColor::Red.on_default().effects(Effects::BOLD);
    const VALID: Style = AnsiColor::Cyan.on_default().effects(Effects::BOLD);
    const INVALID: Style = AnsiColor::Yellow.on_default().effects(Effects::BOLD);

    pub(crate) const fn style() -> Styles {
        Styles::styled()
            .header(HEADER)
            .usage(USAGE)
            .literal(LITERAL)
            .placeholder(PLACEHOLDER)
            .error(ERROR)
            .valid(VALID)
            .invalid(INVALID)
    }
}

#[derive(Copy, Clone, Debug, Args)]
#[command(next_help_heading = "Output options")]
#[must_use]
pub(crate) struct OutputOpts {
    /// Report every status poll and show debug logs
    #[arg(long, short, env = "SUITE_MONITOR_VERBOSE")]
    pub(crate) verbose: bool,

    /// Produce color output: auto, always, never
    #[arg(
        long,
        value_enum,
        default_value_t,
        hide_possible_values = true,
        value_name = "WHEN",
        env = "SUITE_MONITOR_COLOR"
    )]
    pub(crate) color: Color,
}

impl OutputOpts {
    pub(crate) fn init(self) -> OutputContext {
        let OutputOpts { verbose, color } = self;

        color.init(verbose);

        OutputContext { verbose, color }
    }
}

/// Output settings, initialized once at startup.
#[derive(Copy, Clone, Debug)]
#[must_use]
pub struct OutputContext {
    pub(crate) verbose: bool,
    pub(crate) color: Color,
}

impl OutputContext {
    /// Returns general stderr styles for the current output context.
    pub fn stderr_styles(&self) -> StderrStyles {
        let mut styles = StderrStyles::default();

        if self.color.should_colorize(supports_color::Stream::Stderr) {
            styles.colorize();
        }

        styles
    }
}

/// When to produce color output.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
#[must_use]
pub enum Color {
    #[default]
    Auto,
    Always,
    Never,
}

static INIT_LOGGER: std::sync::Once = std::sync::Once::new();

/// Formats log records as `heading: message` lines.
///
/// Records sent to [`NO_HEADING_TARGET`] are printed as is: they carry summary tables and error
/// chains. Debug records, only shown with `--verbose` or `SUITE_MONITOR_LOG`, name the module they
/// came from so HTTP traffic can be told apart from monitor progress.
struct SimpleFormatter {
    styles: LogStyles,
}

impl SimpleFormatter {
    fn write_heading(&self, metadata: &Metadata<'_>, mut writer: impl fmt::Write) -> fmt::Result {
        if metadata.target() == NO_HEADING_TARGET {
            return Ok(());
        }
        match *metadata.level() {
            Level::ERROR => write!(writer, "{}: ", "error".style(self.styles.error)),
            Level::WARN => write!(writer, "{}: ", "warning".style(self.styles.warning)),
            Level::INFO => write!(writer, "{}: ", "info".style(self.styles.info)),
            Level::DEBUG | Level::TRACE => write!(
                writer,
                "{} [{}]: ",
                "debug".style(self.styles.debug),
                metadata.target()
            ),
        }
    }
}

impl<S, N> FormatEvent<S, N> for SimpleFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        self.write_heading(event.metadata(), &mut writer)?;

        let mut visitor = MessageVisitor {
            writer: &mut writer,
            error: None,
        };
        event.record(&mut visitor);
        if let Some(error) = visitor.error {
            return Err(error);
        }

        writeln!(writer)
    }
}

struct MessageVisitor<'writer, 'a> {
    writer: &'a mut format::Writer<'writer>,
    error: Option<fmt::Error>,
}

impl Visit for MessageVisitor<'_, '_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message"
            && let Err(error) = write!(self.writer, "{value:?}")
        {
            self.error = Some(error);
        }
    }
}

/// Builds the log filter from the value of [`LOG_ENV`].
///
/// An empty value means `info`, raised to `debug` for suite-monitor's own crates in verbose mode.
/// An invalid value falls back to the same default and returns the parse error.
fn log_filter(value: &str, verbose: bool) -> (Targets, Option<ParseError>) {
    let default = || {
        let targets = Targets::new().with_default(LevelFilter::INFO);
        if verbose {
            targets
                .with_target("suite_monitor", LevelFilter::DEBUG)
                .with_target("suite_monitor_runner", LevelFilter::DEBUG)
        } else {
            targets
        }
    };

    if value.is_empty() {
        return (default(), None);
    }
    match value.parse::<Targets>() {
        Ok(targets) => (targets, None),
        Err(error) => (default(), Some(error)),
    }
}

impl Color {
    pub(crate) fn init(self, verbose: bool) {
        let mut log_styles = LogStyles::default();
        if self.should_colorize(supports_color::Stream::Stderr) {
            log_styles.colorize();
        }

        INIT_LOGGER.call_once(|| {
            let value = std::env::var_os(LOG_ENV).unwrap_or_default();
            let value = value.to_string_lossy();
            let (targets, parse_error) = log_filter(&value, verbose);

            let layer = tracing_subscriber::fmt::layer()
                .event_format(SimpleFormatter { styles: log_styles })
                .with_writer(std::io::stderr)
                .with_filter(targets);

            tracing_subscriber::registry().with(layer).init();

            if let Some(error) = parse_error {
                warn!("ignoring invalid {LOG_ENV} value `{value}`: {error}");
            }
        });
    }

    pub(crate) fn should_colorize(self, stream: supports_color::Stream) -> bool {
        match self {
            Color::Auto => supports_color::on_cached(stream).is_some(),
            Color::Always => true,
            Color::Never => false,
        }
    }
}

#[derive(Debug, Default)]
struct LogStyles {
    error: Style,
    warning: Style,
    info: Style,
    debug: Style,
}

impl LogStyles {
    fn colorize(&mut self) {
        self.error = style().red().bold();
        self.warning = style().yellow().bold();
        self.info = style().bold();
        self.debug = style().dimmed();
    }
}

/// Styles for error messages printed to stderr.
#[derive(Debug, Default)]
pub struct StderrStyles {
    pub(crate) bold: Style,
    pub(crate) warning_text: Style,
}

impl StderrStyles {
    fn colorize(&mut self) {
        self.bold = style().bold();
        self.warning_text = style().yellow();
    }
}

/// Where command output goes.
///
/// The summary table goes to stdout, as does the GitHub Actions failure annotation. Progress
/// lines go to stderr.
#[derive(Default)]
pub enum OutputWriter {
    /// The process's stdout and stderr.
    #[default]
    Normal,
    /// Output captured in memory.
    #[cfg(test)]
    Test {
        /// Captured stdout.
        stdout: Vec<u8>,
        /// Captured stderr.
        stderr: Vec<u8>,
    },
}

impl OutputWriter {
    pub(crate) fn stdout_writer(&mut self) -> StreamWriter<'_> {
        match self {
            Self::Normal => StreamWriter::new(BufWriter::new(std::io::stdout())),
            #[cfg(test)]
            Self::Test { stdout, .. } => StreamWriter::new(stdout),
        }
    }

    pub(crate) fn stderr_writer(&mut self) -> StreamWriter<'_> {
        match self {
            Self::Normal => StreamWriter::new(BufWriter::new(std::io::stderr())),
            #[cfg(test)]
            Self::Test { stderr, .. } => StreamWriter::new(stderr),
        }
    }
}

/// A writer for one of the streams of an [`OutputWriter`].
pub(crate) struct StreamWriter<'a> {
    inner: Box<dyn Write + 'a>,
}

impl<'a> StreamWriter<'a> {
    fn new(inner: impl Write + 'a) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl Write for StreamWriter<'_> {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.inner.write(data)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
