use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ReleaseError, Result};

/// Fixed name of the version file inside the source tree.
pub const VERSION_FILE_NAME: &str = "version.ini";

/// Classification of a version bump, controlling which numeric field
/// increments and the tag suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseKind {
    Release,
    Beta,
    Alpha,
}

impl ReleaseKind {
    /// Tag suffix for this kind: `None` for full releases, the literal
    /// lowercase word for pre-releases.
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            ReleaseKind::Release => None,
            ReleaseKind::Beta => Some("beta"),
            ReleaseKind::Alpha => Some("alpha"),
        }
    }
}

impl FromStr for ReleaseKind {
    type Err = ReleaseError;

    /// Case-insensitive parse. Anything but release/beta/alpha is a typed
    /// error.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "RELEASE" => Ok(ReleaseKind::Release),
            "BETA" => Ok(ReleaseKind::Beta),
            "ALPHA" => Ok(ReleaseKind::Alpha),
            _ => Err(ReleaseError::UnknownReleaseKind(s.to_string())),
        }
    }
}

impl fmt::Display for ReleaseKind {
    /// Upper-case form, as stored in the `type` key of the version file.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReleaseKind::Release => "RELEASE",
            ReleaseKind::Beta => "BETA",
            ReleaseKind::Alpha => "ALPHA",
        };
        write!(f, "{}", name)
    }
}

/// Semantic version state of the source tree.
///
/// Convention (not enforced): the patch number is even for BETA versions and
/// odd for ALPHA versions, because every non-alpha release is immediately
/// followed by an autogenerated alpha bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRecord {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub kind: ReleaseKind,
}

impl VersionRecord {
    pub fn new(major: u32, minor: u32, patch: u32, kind: ReleaseKind) -> Self {
        VersionRecord {
            major,
            minor,
            patch,
            kind,
        }
    }

    /// Apply one increment rule in place:
    ///
    /// | kind    | minor     | patch      | kind set to |
    /// |---------|-----------|------------|-------------|
    /// | RELEASE | +1        | reset to 0 | RELEASE     |
    /// | BETA    | unchanged | +1         | BETA        |
    /// | ALPHA   | unchanged | +1         | ALPHA       |
    pub fn increase(&mut self, kind: ReleaseKind) {
        match kind {
            ReleaseKind::Release => {
                self.minor += 1;
                self.patch = 0;
            }
            ReleaseKind::Beta | ReleaseKind::Alpha => {
                self.patch += 1;
            }
        }
        self.kind = kind;
    }

    /// Derive the display tag: `v<major>.<minor>.<patch>[.suffix]`,
    /// e.g. `v3.7.0` or `v3.6.2.beta`.
    pub fn tag(&self) -> String {
        match self.kind.suffix() {
            Some(suffix) => format!("v{}.{}.{}.{}", self.major, self.minor, self.patch, suffix),
            None => format!("v{}.{}.{}", self.major, self.minor, self.patch),
        }
    }
}

/// The persisted version record: a `[version]` section with keys `major`,
/// `minor`, `patch` and `type` in `<source>/version.ini`.
///
/// The file is plain INI as written by stock key-value config writers, so it
/// is parsed here directly instead of through the TOML layer (`type = ALPHA`
/// is not valid TOML).
#[derive(Debug, Clone)]
pub struct VersionFile {
    source_path: PathBuf,
    pub record: VersionRecord,
}

impl VersionFile {
    /// Load the version file from a source directory.
    pub fn load(source_path: &Path) -> Result<Self> {
        let path = source_path.join(VERSION_FILE_NAME);
        let text = fs::read_to_string(&path).map_err(|e| {
            ReleaseError::version_file(format!("cannot read {}: {}", path.display(), e))
        })?;
        let record = parse_version_ini(&text)?;
        Ok(VersionFile {
            source_path: source_path.to_path_buf(),
            record,
        })
    }

    /// Write the record back to `<source>/version.ini`.
    pub fn save(&self) -> Result<()> {
        fs::write(self.path(), serialize_version_ini(&self.record))?;
        Ok(())
    }

    /// Full path of the persisted file.
    pub fn path(&self) -> PathBuf {
        self.source_path.join(VERSION_FILE_NAME)
    }

    /// Directory containing the version file (the source tree root).
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }
}

/// Parse the `[version]` section of an INI document.
///
/// Blank lines and `#`/`;` comments are skipped, unknown keys and foreign
/// sections are ignored. All four keys must be present.
fn parse_version_ini(text: &str) -> Result<VersionRecord> {
    let mut in_version = false;
    let mut major: Option<u32> = None;
    let mut minor: Option<u32> = None;
    let mut patch: Option<u32> = None;
    let mut kind: Option<ReleaseKind> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') {
            in_version = line.eq_ignore_ascii_case("[version]");
            continue;
        }
        if !in_version {
            continue;
        }
        let (key, value) = line.split_once('=').ok_or_else(|| {
            ReleaseError::version_file(format!("malformed line in version file: '{}'", line))
        })?;
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "major" => major = Some(parse_number("major", value)?),
            "minor" => minor = Some(parse_number("minor", value)?),
            "patch" => patch = Some(parse_number("patch", value)?),
            "type" => kind = Some(value.parse()?),
            _ => {}
        }
    }

    match (major, minor, patch, kind) {
        (Some(major), Some(minor), Some(patch), Some(kind)) => {
            Ok(VersionRecord::new(major, minor, patch, kind))
        }
        _ => Err(ReleaseError::version_file(
            "incomplete [version] section: need major, minor, patch and type",
        )),
    }
}

fn parse_number(key: &str, value: &str) -> Result<u32> {
    value
        .parse::<u32>()
        .map_err(|_| ReleaseError::version_file(format!("invalid {} number: '{}'", key, value)))
}

/// Serialize a record in the same shape config writers produce, so the file
/// round-trips cleanly through other tooling reading it.
fn serialize_version_ini(record: &VersionRecord) -> String {
    format!(
        "[version]\nmajor = {}\nminor = {}\npatch = {}\ntype = {}\n\n",
        record.major, record.minor, record.patch, record.kind
    )
}
