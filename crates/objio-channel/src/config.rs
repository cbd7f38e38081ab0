use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use objio_types::{ChecksumAlgorithm, ObjectRef, OptionError};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::ChannelResult;

/// Caller-side bound on a blocking wait.
///
/// In TOML a limit is written as a positive number of minutes or the string
/// `"unbounded"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawWaitLimit", into = "RawWaitLimit")]
pub enum WaitLimit {
    Bounded(Duration),
    /// Block until the operation resolves.
    Unbounded,
}

impl WaitLimit {
    pub fn minutes(minutes: u64) -> Self {
        Self::Bounded(Duration::from_secs(minutes.saturating_mul(60)))
    }
}

impl From<Option<Duration>> for WaitLimit {
    fn from(limit: Option<Duration>) -> Self {
        limit.map_or(Self::Unbounded, Self::Bounded)
    }
}

impl From<Duration> for WaitLimit {
    fn from(limit: Duration) -> Self {
        Self::Bounded(limit)
    }
}

impl fmt::Display for WaitLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(limit) => write!(f, "{limit:?}"),
            Self::Unbounded => f.write_str("unbounded"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawWaitLimit {
    Minutes(u64),
    Keyword(String),
}

impl TryFrom<RawWaitLimit> for WaitLimit {
    type Error = String;

    fn try_from(raw: RawWaitLimit) -> Result<Self, Self::Error> {
        match raw {
            RawWaitLimit::Minutes(0) => Err("timeout must be a positive number of minutes".into()),
            RawWaitLimit::Minutes(minutes) => Ok(Self::minutes(minutes)),
            RawWaitLimit::Keyword(word) if word == "unbounded" => Ok(Self::Unbounded),
            RawWaitLimit::Keyword(word) => Err(format!("unknown timeout value '{word}'")),
        }
    }
}

// Serialized at minute granularity, rounding sub-minute limits up.
impl From<WaitLimit> for RawWaitLimit {
    fn from(limit: WaitLimit) -> Self {
        match limit {
            WaitLimit::Bounded(limit) => Self::Minutes(limit.as_secs().div_ceil(60).max(1)),
            WaitLimit::Unbounded => Self::Keyword("unbounded".into()),
        }
    }
}

/// The three wait tiers. Resolved once per channel and never changed while
/// the channel is alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Metadata probes (default: 1 minute).
    pub probe: WaitLimit,
    /// Bulk downloads into a scratch file (default: 3 minutes).
    pub bulk_download: WaitLimit,
    /// Bulk uploads and appending writes (default: 5 minutes).
    pub bulk_upload: WaitLimit,
}

impl TimeoutConfig {
    /// Every tier unbounded.
    pub fn unbounded() -> Self {
        Self {
            probe: WaitLimit::Unbounded,
            bulk_download: WaitLimit::Unbounded,
            bulk_upload: WaitLimit::Unbounded,
        }
    }

    pub fn with_probe(mut self, limit: impl Into<WaitLimit>) -> Self {
        self.probe = limit.into();
        self
    }

    pub fn with_bulk_download(mut self, limit: impl Into<WaitLimit>) -> Self {
        self.bulk_download = limit.into();
        self
    }

    pub fn with_bulk_upload(mut self, limit: impl Into<WaitLimit>) -> Self {
        self.bulk_upload = limit.into();
        self
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            probe: WaitLimit::minutes(1),
            bulk_download: WaitLimit::minutes(3),
            bulk_upload: WaitLimit::minutes(5),
        }
    }
}

fn default_integrity_check_algorithm() -> String {
    ChecksumAlgorithm::Disabled.name().to_string()
}

/// Configuration shared by every channel opened against one store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Name of the integrity-check algorithm for bulk uploads. Validated when
    /// a channel is opened.
    #[serde(default = "default_integrity_check_algorithm")]
    pub integrity_check_algorithm: String,
    /// Directory for scratch files; the system temp dir when unset.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

impl ChannelConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(document: &str) -> ChannelResult<Self> {
        Ok(toml::from_str(document)?)
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_integrity_check_algorithm(mut self, name: impl Into<String>) -> Self {
        self.integrity_check_algorithm = name.into();
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// The configured algorithm, parsed.
    pub fn checksum_algorithm(&self) -> Result<ChecksumAlgorithm, OptionError> {
        self.integrity_check_algorithm.parse()
    }

    /// Create an exclusively owned scratch file for `object`.
    ///
    /// The file name ends with the object's final key segment so scratch
    /// files are recognizable on disk.
    pub(crate) fn scratch_file(&self, object: &ObjectRef) -> ChannelResult<NamedTempFile> {
        let suffix = object
            .key()
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .map(|name| format!("-{name}"))
            .unwrap_or_default();
        let mut builder = tempfile::Builder::new();
        builder.prefix("objio-").suffix(&suffix);
        let file = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(file)
    }

    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch_dir.as_deref()
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            timeouts: TimeoutConfig::default(),
            integrity_check_algorithm: default_integrity_check_algorithm(),
            scratch_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tiers() {
        let t = TimeoutConfig::default();
        assert_eq!(t.probe, WaitLimit::Bounded(Duration::from_secs(60)));
        assert_eq!(t.bulk_download, WaitLimit::Bounded(Duration::from_secs(180)));
        assert_eq!(t.bulk_upload, WaitLimit::Bounded(Duration::from_secs(300)));
    }

    #[test]
    fn tiers_are_independently_overridable() {
        let t = TimeoutConfig::default()
            .with_probe(None)
            .with_bulk_upload(Duration::from_millis(10));
        assert_eq!(t.probe, WaitLimit::Unbounded);
        assert_eq!(t.bulk_download, WaitLimit::minutes(3));
        assert_eq!(t.bulk_upload, WaitLimit::Bounded(Duration::from_millis(10)));
    }

    #[test]
    fn default_config() {
        let c = ChannelConfig::default();
        assert_eq!(c.timeouts, TimeoutConfig::default());
        assert_eq!(c.integrity_check_algorithm, "disabled");
        assert_eq!(c.checksum_algorithm(), Ok(ChecksumAlgorithm::Disabled));
        assert!(c.scratch_dir().is_none());
    }

    #[test]
    fn parse_toml() {
        let c = ChannelConfig::from_toml_str(
            r#"
            integrity_check_algorithm = "CRC32C"
            scratch_dir = "/var/tmp/objio"

            [timeouts]
            probe = 2
            bulk_download = "unbounded"
            "#,
        )
        .unwrap();
        assert_eq!(c.checksum_algorithm(), Ok(ChecksumAlgorithm::Crc32c));
        assert_eq!(c.timeouts.probe, WaitLimit::minutes(2));
        assert_eq!(c.timeouts.bulk_download, WaitLimit::Unbounded);
        assert_eq!(c.timeouts.bulk_upload, WaitLimit::minutes(5));
        assert_eq!(c.scratch_dir(), Some(Path::new("/var/tmp/objio")));
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(ChannelConfig::from_toml_str("").unwrap(), ChannelConfig::default());
    }

    #[test]
    fn zero_minutes_is_rejected() {
        assert!(ChannelConfig::from_toml_str("[timeouts]\nprobe = 0\n").is_err());
    }

    #[test]
    fn unknown_keyword_is_rejected() {
        assert!(ChannelConfig::from_toml_str("[timeouts]\nprobe = \"forever\"\n").is_err());
    }

    #[test]
    fn unknown_algorithm_surfaces_on_parse() {
        let c = ChannelConfig::default().with_integrity_check_algorithm("invalid");
        assert_eq!(
            c.checksum_algorithm().unwrap_err().to_string(),
            "unknown integrity check algorithm 'invalid'"
        );
    }

    #[test]
    fn serialize_round_trip() {
        let c = ChannelConfig::default()
            .with_timeouts(TimeoutConfig::default().with_bulk_download(None));
        let text = toml::to_string(&c).unwrap();
        assert_eq!(ChannelConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn scratch_file_lives_in_configured_dir() {
        let dir = tempfile::tempdir().unwrap();
        let c = ChannelConfig::default().with_scratch_dir(dir.path());
        let file = c.scratch_file(&ObjectRef::new("b", "dir/report.csv")).unwrap();
        assert!(file.path().starts_with(dir.path()));
        let name = file.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("objio-"));
        assert!(name.ends_with("-report.csv"));
    }
}
