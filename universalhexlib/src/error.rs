//! The `error` module defines the [`UniversalHexError`] enum that describes the errors that
//! can occur when building or parsing Intel HEX records, and when packing or separating
//! Universal Hex files.
//! It contains the two pieces of information:
//! 1. When the error occurs, e.g., during creating a record, parsing it, or converting a hex.
//! 2. What kind of error was encountered (via [`UniversalHexErrorKind`] enum).
//!
//! Every kind also belongs to one [`ErrorCategory`], so callers can tell apart values out of
//! range, malformed text and hex files that do not have the expected container structure.

use crate::record::RecordType;
use thiserror::Error;

/// Broad classification of an error kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// A numeric field is out of its allowed bounds (address, board id, byte count...).
    Range,
    /// Malformed text: bad hex, bad record shape, invalid record type, misplaced EoF...
    Format,
    /// Container-level problems: empty input, missing Universal Hex signature...
    Structural,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UniversalHexError {
    #[error("Error encountered during creation of hex record:\n{0}")]
    CreateRecordError(UniversalHexErrorKind),
    #[error("Error encountered during record parsing:\n{0}")]
    ParseRecordError(UniversalHexErrorKind),
    #[error("Error encountered during Universal Hex conversion:\n{0}")]
    ConversionError(UniversalHexErrorKind),
}

impl UniversalHexError {
    /// The underlying error kind.
    #[must_use]
    pub const fn kind(&self) -> &UniversalHexErrorKind {
        match self {
            Self::CreateRecordError(kind)
            | Self::ParseRecordError(kind)
            | Self::ConversionError(kind) => kind,
        }
    }

    /// Shorthand for `self.kind().category()`.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.kind().category()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UniversalHexErrorKind {
    /// Hex string has an odd number of characters
    #[error("Hex string has an odd number of characters: {0}")]
    HexStringOddLength(String),
    /// Hex string contains non-hexadecimal characters
    #[error("Hex string contains invalid character(s): {0}")]
    HexStringInvalidCharacters(String),
    /// Number does not fit in an unsigned byte
    #[error("Number to convert to hex does not fit in an unsigned byte: {0}")]
    ByteOutOfRange(u32),
    /// Record address does not fit in 16 bits
    #[error("Record ({0:?}) address out of range: {1}")]
    AddressOutOfRange(RecordType, u32),
    /// Record data field is larger than the supported maximum
    #[error("Record ({0:?}) data has too many bytes ({1}).")]
    DataTooLong(RecordType, usize),
    /// Provided or parsed record type does not exist
    #[error("Record type '{0}' is not valid.")]
    InvalidRecordType(String),
    /// Record does not begin with a ':'
    #[error("Record does not start with a \":\": {0}")]
    MissingStartCode(String),
    /// Record is shorter than the smallest valid
    #[error("Record length too small: {0}")]
    RecordTooShort(String),
    /// Record is longer than the largest valid
    #[error("Record length is too large: {0}")]
    RecordTooLong(String),
    /// Record could not be decoded into bytes
    #[error("Could not parse Intel Hex record \"{0}\": {1}")]
    RecordNotHex(String, Box<UniversalHexErrorKind>),
    /// Record byte buffer length differs from what its byte count indicates
    #[error(
        "Parsed record \"{record}\" length does not match the byte count.\n\tExpected: {expected}; Length: {actual}."
    )]
    RecordInvalidPayloadLength {
        record: String,
        expected: usize,
        actual: usize,
    },
    /// Address for an Extended Linear Address record is not a 32-bit value
    #[error("Address '{0}' for Extended Linear Address record is out of range.")]
    LinearAddressOutOfRange(u64),
    /// Record cannot be converted from Extended Segment to Extended Linear Address
    #[error("Invalid Extended Segment Address record: {0}")]
    InvalidExtendedSegmentAddress(String),
    /// Board ID does not fit in 16 bits
    #[error("Board ID out of range when creating Block Start record: {0}")]
    BoardIdOutOfRange(u32),
    /// Data records are larger than the custom records can pad for
    #[error("Intel Hex record data size is too large: {0}")]
    DataFieldTooLarge(usize),
    /// End Of File record found before the last record
    #[error("EoF record found at record {index} of {total} in Board ID {board_id} hex")]
    EndOfFileNotLast {
        index: usize,
        total: usize,
        board_id: u32,
    },
    /// Hex comes from MakeCode for micro:bit V1 and carries data after the EoF record
    #[error(
        "Board ID {0} Hex is from MakeCode, import this hex into the MakeCode editor to create a Universal Hex."
    )]
    MakeCodeForV1Hex(u32),
    /// Input hex is a Universal Hex already
    #[error("Board ID {0} Hex is already a Universal Hex.")]
    AlreadyUniversalHex(u32),
    /// Universal Hex has no records
    #[error("Empty Universal Hex.")]
    EmptyUniversalHex,
    /// Universal Hex does not open with ELA + Block Start or close with EoF
    #[error("Universal Hex format invalid.")]
    InvalidUniversalHexFormat,
    /// Block Start record data field is not 4 bytes
    #[error("Block Start record invalid: {0}")]
    InvalidBlockStart(String),
    /// Boundary size cannot hold a fragment
    #[error("Boundary size must be an even number of at least {min} characters, found {size}")]
    InvalidBoundarySize { size: usize, min: usize },
}

impl UniversalHexErrorKind {
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::ByteOutOfRange(_)
            | Self::AddressOutOfRange(..)
            | Self::DataTooLong(..)
            | Self::LinearAddressOutOfRange(_)
            | Self::BoardIdOutOfRange(_)
            | Self::DataFieldTooLarge(_)
            | Self::InvalidBoundarySize { .. } => ErrorCategory::Range,
            Self::HexStringOddLength(_)
            | Self::HexStringInvalidCharacters(_)
            | Self::InvalidRecordType(_)
            | Self::MissingStartCode(_)
            | Self::RecordTooShort(_)
            | Self::RecordTooLong(_)
            | Self::RecordNotHex(..)
            | Self::RecordInvalidPayloadLength { .. }
            | Self::InvalidExtendedSegmentAddress(_)
            | Self::EndOfFileNotLast { .. }
            | Self::MakeCodeForV1Hex(_)
            | Self::InvalidBlockStart(_) => ErrorCategory::Format,
            Self::AlreadyUniversalHex(_)
            | Self::EmptyUniversalHex
            | Self::InvalidUniversalHexFormat => ErrorCategory::Structural,
        }
    }
}
