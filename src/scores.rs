//! Append-only score log: one `<name>, <points> points, <secs> sec` line per finished session.

use crate::game::SessionSummary;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default log file, relative to the working directory.
pub const DEFAULT_SCORE_FILE: &str = "Scores.txt";

#[derive(Debug, Error)]
pub enum ScoreLogError {
    #[error("cannot write score log {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot read score log {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One parsed line of the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreEntry {
    pub username: String,
    pub points: u32,
    pub game_time: u32,
}

impl ScoreEntry {
    pub fn new(username: &str, summary: SessionSummary) -> Self {
        Self {
            username: username.to_string(),
            points: summary.points,
            game_time: summary.game_time,
        }
    }

    /// Log line without the trailing newline.
    pub fn to_line(&self) -> String {
        format!(
            "{}, {} points, {} sec",
            self.username, self.points, self.game_time
        )
    }

    /// Parse a log line. The name may itself contain commas, so fields are taken from the right.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (rest, time) = line.rsplit_once(", ")?;
        let (username, points) = rest.rsplit_once(", ")?;
        let game_time = time.strip_suffix(" sec")?.trim().parse().ok()?;
        let points = points.strip_suffix(" points")?.trim().parse().ok()?;
        Some(Self {
            username: username.to_string(),
            points,
            game_time,
        })
    }
}

/// The score log at a fixed path.
#[derive(Debug, Clone)]
pub struct ScoreLog {
    path: PathBuf,
}

impl ScoreLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one session. Earlier lines are never touched.
    pub fn append(&self, entry: &ScoreEntry) -> Result<(), ScoreLogError> {
        let write_err = |source| ScoreLogError::Write {
            path: self.path.clone(),
            source,
        };
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_err)?;
        writeln!(f, "{}", entry.to_line()).map_err(write_err)?;
        Ok(())
    }

    /// All well-formed entries; a missing file is an empty log.
    pub fn read(&self) -> Result<Vec<ScoreEntry>, ScoreLogError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ScoreLogError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        Ok(content.lines().filter_map(ScoreEntry::parse).collect())
    }

    /// Highest points ever logged, 0 when the log is empty or unreadable.
    pub fn best_points(&self) -> u32 {
        match self.read() {
            Ok(entries) => entries.iter().map(|e| e.points).max().unwrap_or(0),
            Err(e) => {
                tracing::warn!(error = %e, "score log unreadable");
                0
            }
        }
    }
}
