use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OptionError;

/// Integrity-check algorithm attached to bulk uploads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChecksumAlgorithm {
    Crc32,
    Crc32c,
    Crc64Nvme,
    /// No checksum is computed or sent.
    #[default]
    Disabled,
}

impl ChecksumAlgorithm {
    /// Canonical name, as accepted by [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            Self::Crc32 => "CRC32",
            Self::Crc32c => "CRC32C",
            Self::Crc64Nvme => "CRC64NVME",
            Self::Disabled => "disabled",
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = OptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Crc32, Self::Crc32c, Self::Crc64Nvme, Self::Disabled]
            .into_iter()
            .find(|alg| alg.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| OptionError::UnknownChecksumAlgorithm(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_names() {
        assert_eq!("CRC32".parse(), Ok(ChecksumAlgorithm::Crc32));
        assert_eq!("CRC32C".parse(), Ok(ChecksumAlgorithm::Crc32c));
        assert_eq!("CRC64NVME".parse(), Ok(ChecksumAlgorithm::Crc64Nvme));
        assert_eq!("disabled".parse(), Ok(ChecksumAlgorithm::Disabled));
    }

    #[test]
    fn parsing_ignores_ascii_case() {
        assert_eq!("crc32c".parse(), Ok(ChecksumAlgorithm::Crc32c));
        assert_eq!("DISABLED".parse(), Ok(ChecksumAlgorithm::Disabled));
    }

    #[test]
    fn unknown_name_is_rejected_with_compat_message() {
        let err = "invalid".parse::<ChecksumAlgorithm>().unwrap_err();
        assert_eq!(err.to_string(), "unknown integrity check algorithm 'invalid'");
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for alg in [
            ChecksumAlgorithm::Crc32,
            ChecksumAlgorithm::Crc32c,
            ChecksumAlgorithm::Crc64Nvme,
            ChecksumAlgorithm::Disabled,
        ] {
            assert_eq!(alg.to_string().parse(), Ok(alg));
        }
    }

    #[test]
    fn default_is_disabled() {
        assert_eq!(ChecksumAlgorithm::default(), ChecksumAlgorithm::Disabled);
        assert!(!ChecksumAlgorithm::Disabled.is_enabled());
        assert!(ChecksumAlgorithm::Crc32.is_enabled());
    }
}
