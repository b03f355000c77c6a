use std::fmt;

/// Kind of filesystem edit observed for a single source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EditKind {
    Add,
    Del,
    Chg,
}

impl fmt::Display for EditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EditKind::Add => "ADD",
            EditKind::Del => "DEL",
            EditKind::Chg => "CHG",
        };
        f.write_str(s)
    }
}

/// Whether a build mode keeps dependency data between passes.
///
/// - `Full`: every pass compiles everything; nothing is remembered.
/// - `Incremental`: TargetToSources / SourceToTargets and the previous
///   context chain survive between passes so that only affected sources are
///   recompiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    #[default]
    Full,
    Incremental,
}

/// Overall result of one build or incremental pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    /// Every rule processed all of its files without a reported failure.
    Success,
    /// At least one file failed; other files and rules still ran.
    Failed,
}

impl BuildStatus {
    pub fn from_success(ok: bool) -> Self {
        if ok { BuildStatus::Success } else { BuildStatus::Failed }
    }

    pub fn is_success(self) -> bool {
        matches!(self, BuildStatus::Success)
    }

    /// Label printed after a full build.
    pub fn full_build_label(self) -> &'static str {
        match self {
            BuildStatus::Success => "SUCCESS",
            BuildStatus::Failed => "FAILED",
        }
    }

    /// Label printed after an incremental pass.
    pub fn incremental_label(self) -> &'static str {
        match self {
            BuildStatus::Success => "COMPLETED",
            BuildStatus::Failed => "INCOMPLETE",
        }
    }
}
