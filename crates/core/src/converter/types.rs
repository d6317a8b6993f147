//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::ConverterError;
use super::time::{format_duration, format_seconds, parse_timestamp};

/// Progress key carrying the encoder's elapsed media time.
pub const OUT_TIME_KEY: &str = "out_time";

/// Progress key carrying the encoder's phase.
pub const PHASE_KEY: &str = "progress";

/// Phase value emitted once the encoder is done.
pub const PHASE_END: &str = "end";

/// Logical role of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputRole {
    /// The audio stream.
    Content,
    /// The cover image.
    Thumbnail,
}

impl InputRole {
    /// Returns the role name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Thumbnail => "thumbnail",
        }
    }
}

impl fmt::Display for InputRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input files of one conversion, keyed by role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionInputs {
    paths: BTreeMap<InputRole, PathBuf>,
}

impl ConversionInputs {
    /// Creates inputs from a content and a thumbnail path.
    pub fn new(content: impl Into<PathBuf>, thumbnail: impl Into<PathBuf>) -> Self {
        Self::default()
            .with(InputRole::Content, content)
            .with(InputRole::Thumbnail, thumbnail)
    }

    /// Sets the path for a role.
    pub fn with(mut self, role: InputRole, path: impl Into<PathBuf>) -> Self {
        self.paths.insert(role, path.into());
        self
    }

    /// Returns the path for a role.
    pub fn get(&self, role: InputRole) -> Option<&Path> {
        self.paths.get(&role).map(PathBuf::as_path)
    }

    /// Resolves every role to an absolute path.
    ///
    /// The files do not need to exist yet; only the path itself is checked.
    pub fn resolve(&self) -> Result<ResolvedInputs, ConverterError> {
        let content = Self::absolute(InputRole::Content, self.get(InputRole::Content))?;
        let thumbnail = Self::absolute(InputRole::Thumbnail, self.get(InputRole::Thumbnail))?;
        Ok(ResolvedInputs { content, thumbnail })
    }

    fn absolute(role: InputRole, path: Option<&Path>) -> Result<PathBuf, ConverterError> {
        let path = path.ok_or_else(|| ConverterError::invalid_path(role.as_str(), "no path given"))?;
        if path.as_os_str().is_empty() {
            return Err(ConverterError::invalid_path(role.as_str(), "path is empty"));
        }
        std::path::absolute(path)
            .map_err(|e| ConverterError::invalid_path(role.as_str(), e.to_string()))
    }
}

/// Inputs after absolute-path resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInputs {
    pub content: PathBuf,
    pub thumbnail: PathBuf,
}

/// Point-in-time view of a conversion's progress, sent to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    /// Completion percentage, 0-100.
    pub percent: f64,
    /// Media seconds processed so far.
    pub current_secs: f64,
    /// Total media duration.
    pub duration_secs: f64,
    /// Whether the encoder reported the end phase.
    pub finished: bool,
}

/// Progress of one encoder invocation.
///
/// Elapsed time and percentage only ever grow, the percentage stays within
/// `[0, 100]`, and once `finished` is set no further line is applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressState {
    duration_secs: f64,
    current_secs: f64,
    percent: f64,
    last_line: String,
    finished: bool,
    wall_clock: Option<Duration>,
    output_path: Option<PathBuf>,
}

impl ProgressState {
    /// Creates a fresh state for a source of `duration_secs` seconds.
    ///
    /// A non-positive duration is treated as unknown and the percentage
    /// stays at zero.
    pub fn new(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            current_secs: 0.0,
            percent: 0.0,
            last_line: String::new(),
            finished: false,
            wall_clock: None,
            output_path: None,
        }
    }

    /// Applies one raw progress line. Returns whether the tracked progress changed.
    pub fn update(&mut self, line: &str) -> bool {
        if self.finished {
            return false;
        }

        self.last_line.clear();
        self.last_line.push_str(line);

        let Some((key, value)) = line.split_once('=') else {
            return false;
        };

        match key {
            OUT_TIME_KEY => self.advance(parse_timestamp(value)),
            PHASE_KEY if value == PHASE_END => {
                self.finished = true;
                true
            }
            _ => false,
        }
    }

    fn advance(&mut self, secs: f64) -> bool {
        // Written so that a NaN duration also counts as unknown.
        if !(self.duration_secs > 0.0) || secs <= self.current_secs {
            return false;
        }

        self.current_secs = secs;
        let percent = (secs / self.duration_secs * 100.0).clamp(0.0, 100.0);
        if percent > self.percent {
            self.percent = percent;
        }
        true
    }

    /// Records the outcome of a clean encoder exit.
    pub(crate) fn complete(&mut self, wall_clock: Duration, output_path: PathBuf) {
        self.wall_clock = Some(wall_clock);
        self.output_path = Some(output_path);
    }

    /// Total source duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Media seconds processed so far.
    pub fn current_secs(&self) -> f64 {
        self.current_secs
    }

    /// Completion percentage, 0-100.
    pub fn percent(&self) -> f64 {
        self.percent
    }

    /// Most recent raw line received from the encoder.
    pub fn last_line(&self) -> &str {
        &self.last_line
    }

    /// Whether the encoder reported the end phase.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Wall-clock run time, set after a clean exit.
    pub fn wall_clock(&self) -> Option<Duration> {
        self.wall_clock
    }

    /// Produced artifact, set after a clean exit.
    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    /// Current values as a snapshot.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            percent: self.percent,
            current_secs: self.current_secs,
            duration_secs: self.duration_secs,
            finished: self.finished,
        }
    }
}

impl fmt::Display for ProgressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Progress: {:.2}%. Current Time: {}. Duration: {:.2}s. Finished: {}. Elapsed Time: {}. Current Line: {}",
            self.percent,
            format_seconds(self.current_secs),
            self.duration_secs,
            self.finished,
            self.wall_clock.map(format_duration).unwrap_or_default(),
            self.last_line,
        )
    }
}
