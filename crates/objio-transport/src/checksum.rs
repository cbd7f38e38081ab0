use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use crc::{Algorithm, Crc, CRC_32_ISCSI};
use objio_types::ChecksumAlgorithm;

/// CRC-64/NVME catalogue parameters.
const CRC_64_NVME: Algorithm<u64> = Algorithm {
    width: 64,
    poly: 0xad93_d235_94c9_3659,
    init: 0xffff_ffff_ffff_ffff,
    refin: true,
    refout: true,
    xorout: 0xffff_ffff_ffff_ffff,
    check: 0xae8b_1486_0a79_9888,
    residue: 0xf310_303b_2b6f_6e42,
};

const CRC32C: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);
const CRC64NVME: Crc<u64> = Crc::<u64>::new(&CRC_64_NVME);

/// An integrity checksum as carried on an upload.
///
/// `value` is the base64 encoding of the big-endian checksum bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Checksum {
    pub algorithm: ChecksumAlgorithm,
    pub value: String,
}

impl Checksum {
    /// Compute the checksum of `data`. Returns `None` when disabled.
    pub fn compute(algorithm: ChecksumAlgorithm, data: &[u8]) -> Option<Self> {
        let value = match algorithm {
            ChecksumAlgorithm::Crc32 => STANDARD.encode(crc32fast::hash(data).to_be_bytes()),
            ChecksumAlgorithm::Crc32c => STANDARD.encode(CRC32C.checksum(data).to_be_bytes()),
            ChecksumAlgorithm::Crc64Nvme => {
                STANDARD.encode(CRC64NVME.checksum(data).to_be_bytes())
            }
            ChecksumAlgorithm::Disabled => return None,
        };
        Some(Self { algorithm, value })
    }

    /// Returns `true` if `data` produces this checksum.
    pub fn verify(&self, data: &[u8]) -> bool {
        Self::compute(self.algorithm, data).is_some_and(|actual| actual.value == self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECK_INPUT: &[u8] = b"123456789";

    #[test]
    fn crc32_check_value() {
        let checksum = Checksum::compute(ChecksumAlgorithm::Crc32, CHECK_INPUT).unwrap();
        assert_eq!(checksum.value, "y/Q5Jg==");
    }

    #[test]
    fn crc32c_check_value() {
        let checksum = Checksum::compute(ChecksumAlgorithm::Crc32c, CHECK_INPUT).unwrap();
        assert_eq!(checksum.value, "4waSgw==");
    }

    #[test]
    fn crc64nvme_check_value() {
        let checksum = Checksum::compute(ChecksumAlgorithm::Crc64Nvme, CHECK_INPUT).unwrap();
        assert_eq!(checksum.value, "rosUhgp5mIg=");
    }

    #[test]
    fn disabled_produces_nothing() {
        assert!(Checksum::compute(ChecksumAlgorithm::Disabled, CHECK_INPUT).is_none());
    }

    #[test]
    fn verify_detects_tampering() {
        let checksum = Checksum::compute(ChecksumAlgorithm::Crc32c, b"payload").unwrap();
        assert!(checksum.verify(b"payload"));
        assert!(!checksum.verify(b"pay1oad"));
    }

    #[test]
    fn empty_input() {
        let checksum = Checksum::compute(ChecksumAlgorithm::Crc32, b"").unwrap();
        assert_eq!(checksum.value, "AAAAAA==");
    }
}
