// rust/ckpt-core/src/command.rs

//! Command descriptors and dispatch status.
//!
//! A [`CommandDescriptor`] identifies one checkpoint, restart or test
//! operation. Its artifact path is a pure function of the scratch
//! directory, logical name, rank and version:
//!
//! ```text
//! {scratch}/{name}-{rank}-{version}.dat
//! ```

use std::fmt;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use crate::error::{CkptError, Result};

/// Extension used for every artifact produced by the client.
pub const ARTIFACT_EXTENSION: &str = "dat";

/// Outcome reported by a module or by the external engine.
///
/// Statuses are ordered by severity, so aggregating several reports is a
/// `max`. [`Status::SUCCESS`] is below every other code; non-zero codes rank
/// by magnitude, with a negative code just below the positive code of the
/// same magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(i32);

impl Status {
    pub const SUCCESS: Status = Status(0);
    pub const FAILURE: Status = Status(1);

    pub const fn from_code(code: i32) -> Self {
        Self(code)
    }

    pub const fn code(self) -> i32 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Folds another report into this one, keeping the most severe.
    #[must_use]
    pub fn merge(self, other: Status) -> Status {
        self.max(other)
    }
}

impl Status {
    fn severity(self) -> (bool, u32, i32) {
        (self.0 != 0, self.0.unsigned_abs(), self.0)
    }
}

impl Ord for Status {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.severity().cmp(&other.severity())
    }
}

impl PartialOrd for Status {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::SUCCESS
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::SUCCESS => write!(f, "SUCCESS"),
            Self::FAILURE => write!(f, "FAILURE"),
            Status(code) => write!(f, "{code}"),
        }
    }
}

/// What a descriptor asks the persistence side to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Checkpoint,
    Restart,
    /// Probe the engine or modules without moving artifact bytes.
    Test,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Checkpoint => "CHECKPOINT",
            Self::Restart => "RESTART",
            Self::Test => "TEST",
        };
        f.write_str(s)
    }
}

/// Immutable record of one checkpoint/restart operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    origin_rank: i32,
    kind: CommandKind,
    name: String,
    version: i32,
    artifact_path: PathBuf,
}

impl CommandDescriptor {
    /// Builds a descriptor for `name` at `version`, issued by `rank`.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is empty or contains a path separator,
    /// since either would break the one-file-per-version layout.
    pub fn build(
        rank: i32,
        kind: CommandKind,
        name: &str,
        version: i32,
        scratch_dir: &Path,
    ) -> Result<Self> {
        if name.is_empty() {
            return Err(CkptError::descriptor("checkpoint name must not be empty"));
        }
        if name.contains(MAIN_SEPARATOR) || name.contains('/') {
            return Err(CkptError::descriptor(format!(
                "checkpoint name '{name}' must not contain a path separator"
            )));
        }

        let artifact_path = scratch_dir.join(artifact_file_name(name, rank, version));

        Ok(Self {
            origin_rank: rank,
            kind,
            name: name.to_string(),
            version,
            artifact_path,
        })
    }

    pub fn origin_rank(&self) -> i32 {
        self.origin_rank
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    /// File name of the artifact, without the scratch directory.
    pub fn file_name(&self) -> String {
        artifact_file_name(&self.name, self.origin_rank, self.version)
    }
}

impl fmt::Display for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} v{} rank {} -> {}",
            self.kind,
            self.name,
            self.version,
            self.origin_rank,
            self.artifact_path.display()
        )
    }
}

/// `{name}-{rank}-{version}.dat`
pub fn artifact_file_name(name: &str, rank: i32, version: i32) -> String {
    format!("{name}-{rank}-{version}.{ARTIFACT_EXTENSION}")
}

/// Recovers the version from a file name produced by [`artifact_file_name`]
/// for the given `name` and `rank`. Returns `None` for any other file.
pub fn parse_artifact_version(file_name: &str, name: &str, rank: i32) -> Option<i32> {
    let stem = file_name.strip_suffix(&format!(".{ARTIFACT_EXTENSION}"))?;
    let rest = stem.strip_prefix(&format!("{name}-{rank}-"))?;
    rest.parse().ok()
}
