//! Foundation types for objio.
//!
//! objio exposes file-like channels over a remote whole-object store. This
//! crate holds the vocabulary shared by the transport and channel crates:
//!
//! - [`ObjectRef`] -- immutable `(bucket, key)` pair naming a remote object
//! - [`OpenOption`] / [`OpenOptions`] -- the composable open-option set
//! - [`ByteRange`] -- byte-range restriction for staged downloads
//! - [`ChecksumAlgorithm`] -- integrity-check algorithm selection

pub mod error;
pub mod integrity;
pub mod object;
pub mod options;

pub use error::OptionError;
pub use integrity::ChecksumAlgorithm;
pub use object::ObjectRef;
pub use options::{ByteRange, OpenOption, OpenOptions, StandardOption};
