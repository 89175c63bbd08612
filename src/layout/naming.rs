use std::fmt;
use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;

use crate::foundation::error::{QcError, QcResult};

const SUBJECT_PATTERN: &str = r"^sub-[A-Za-z0-9]+$";
const SESSION_PATTERN: &str = r"ses-(\d+)";

static SUBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SUBJECT_PATTERN).expect("static subject regex"));
static SESSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SESSION_PATTERN).expect("static session regex"));

/// Marker that visit directory names carry after the subject id.
pub const VISIT_MARKER: &str = "T1w_";

/// A BIDS subject identifier such as `sub-07`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubjectId(String);

impl SubjectId {
    /// Parse an exact `sub-<label>` token.
    pub fn parse(s: &str) -> QcResult<Self> {
        if SUBJECT_RE.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(QcError::pattern_mismatch(SUBJECT_PATTERN, s))
        }
    }

    /// Subject id named by the last segment of `dir`.
    pub fn from_dir(dir: &Path) -> QcResult<Self> {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse(&name)
            .map_err(|_| QcError::pattern_mismatch(SUBJECT_PATTERN, dir.display().to_string()))
    }

    /// First path component that is a subject id, with its index among the components.
    pub fn find_in_path(path: &Path) -> Option<(usize, Self)> {
        path.components().enumerate().find_map(|(i, c)| match c {
            Component::Normal(s) => Self::parse(&s.to_string_lossy()).ok().map(|id| (i, id)),
            _ => None,
        })
    }

    /// The full `sub-<label>` token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a directory name matches the visit glob `<subject>*T1w_*`.
    pub fn matches_visit_dir(&self, name: &str) -> bool {
        name.strip_prefix(self.as_str())
            .is_some_and(|rest| rest.contains(VISIT_MARKER))
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A session identifier such as `ses-03`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// First `ses-<digits>` token inside `s`.
    pub fn find_in(s: &str) -> QcResult<Self> {
        SESSION_RE
            .find(s)
            .map(|m| Self(m.as_str().to_string()))
            .ok_or_else(|| QcError::pattern_mismatch(SESSION_PATTERN, s))
    }

    /// The full `ses-<digits>` token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parsed name of a longitudinal visit output directory, e.g. `sub-01_ses-03_T1w_1`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisitName {
    /// Directory name as found on disk.
    pub dir_name: String,
    /// Name without its trailing `_`-separated token (`sub-01_ses-03_T1w`); prefix of every
    /// file inside the visit directory.
    pub base: String,
    /// Session the visit belongs to.
    pub session: SessionId,
}

impl VisitName {
    /// Parse a visit directory name.
    pub fn parse(dir_name: &str) -> QcResult<Self> {
        let base = match dir_name.rsplit_once('_') {
            Some((head, _)) => head.to_string(),
            None => String::new(),
        };
        let session = SessionId::find_in(&base)
            .map_err(|_| QcError::pattern_mismatch(SESSION_PATTERN, dir_name))?;
        Ok(Self {
            dir_name: dir_name.to_string(),
            base,
            session,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layout/naming.rs"]
mod tests;
