//! The `record` module defines the [`Record`] and [`RecordType`] which are used for parsing
//! (and generating) Intel HEX records, including the custom record types used to build a
//! Universal Hex.
//!
//! Records are handled as text lines without line terminators, e.g. `:00000001FF`.

use crate::error::{UniversalHexError, UniversalHexErrorKind};
use crate::utils;

/// The maximum data bytes per record is 0xFF. 16 and 32 bytes are the two most common
/// lengths, but DAPLink does not support more than 32 bytes.
pub const RECORD_DATA_MAX_BYTES: usize = 32;

mod ranges {
    use std::ops::Range;
    pub const RECORD_TYPE_RANGE: Range<usize> = 7..9;
}
pub(crate) mod sizes {
    use super::RECORD_DATA_MAX_BYTES;

    pub const START_CODE_LEN: usize = 1;
    pub const CHECKSUM_LEN: usize = 2;
    pub const DATA_STR_INDEX: usize = START_CODE_LEN + 2 + 4 + 2; // len + addr + rtype
    pub const MIN_RECORD_STR_LEN: usize = DATA_STR_INDEX + CHECKSUM_LEN;
    pub const MAX_RECORD_STR_LEN: usize = MIN_RECORD_STR_LEN + RECORD_DATA_MAX_BYTES * 2;
}

pub use sizes::{MAX_RECORD_STR_LEN, MIN_RECORD_STR_LEN};

/// Start code of every record.
pub const START_CODE: char = ':';

const END_OF_FILE_RECORD: &str = ":00000001FF";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordType {
    Data = 0x00,
    EndOfFile = 0x01,
    ExtendedSegmentAddress = 0x02,
    StartSegmentAddress = 0x03,
    ExtendedLinearAddress = 0x04,
    StartLinearAddress = 0x05,
    // Universal Hex custom types
    BlockStart = 0x0A,
    BlockEnd = 0x0B,
    PaddedData = 0x0C,
    CustomData = 0x0D,
    OtherData = 0x0E,
}

impl TryFrom<u8> for RecordType {
    type Error = UniversalHexError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Data),
            0x01 => Ok(Self::EndOfFile),
            0x02 => Ok(Self::ExtendedSegmentAddress),
            0x03 => Ok(Self::StartSegmentAddress),
            0x04 => Ok(Self::ExtendedLinearAddress),
            0x05 => Ok(Self::StartLinearAddress),
            0x0A => Ok(Self::BlockStart),
            0x0B => Ok(Self::BlockEnd),
            0x0C => Ok(Self::PaddedData),
            0x0D => Ok(Self::CustomData),
            0x0E => Ok(Self::OtherData),
            _ => Err(UniversalHexError::ParseRecordError(
                UniversalHexErrorKind::InvalidRecordType(format!("{value:02X}")),
            )),
        }
    }
}

/// Fields of a single Intel HEX record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub length: u8,
    pub address: u16,
    pub rtype: RecordType,
    pub data: Vec<u8>,
    pub checksum: u8,
}

impl Record {
    /// Calculate the checksum byte (LSB of the two's complement of the sum) of a byte slice.
    ///
    /// # Example
    /// ```
    /// use universalhexlib::Record;
    ///
    /// // :00000001FF
    /// assert_eq!(Record::calculate_checksum(&[0x00, 0x00, 0x00, 0x01]), 0xFF);
    /// ```
    #[must_use]
    pub fn calculate_checksum(data: &[u8]) -> u8 {
        let sum = data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        (!sum).wrapping_add(1) // two's complement
    }

    /// Create the record string from address, type and data slice.
    ///
    /// # Errors
    /// - Returns an error if the address does not fit in 16 bits
    /// - Returns an error if the data has more than [`RECORD_DATA_MAX_BYTES`] bytes
    ///
    /// # Example
    /// ```
    /// use universalhexlib::{Record, RecordType};
    ///
    /// let record = Record::create(0xF870, RecordType::Data, &[0, 0, 0, 0]).unwrap();
    /// assert_eq!(record, ":04F870000000000094");
    /// ```
    #[allow(clippy::cast_possible_truncation)]
    pub fn create(address: u32, rtype: RecordType, data: &[u8]) -> Result<String, UniversalHexError> {
        if address > u32::from(u16::MAX) {
            return Err(UniversalHexError::CreateRecordError(
                UniversalHexErrorKind::AddressOutOfRange(rtype, address),
            ));
        }
        let length = data.len();
        if length > RECORD_DATA_MAX_BYTES {
            return Err(UniversalHexError::CreateRecordError(
                UniversalHexErrorKind::DataTooLong(rtype, length),
            ));
        }

        let header = [
            length as u8,
            (address >> 8) as u8,
            (address & 0xFF) as u8,
            rtype as u8,
        ];
        let content = utils::concat_byte_arrays(&[&header, data]);
        let checksum = Self::calculate_checksum(&content);

        Ok(format!(
            "{START_CODE}{}{checksum:02X}",
            utils::hex_str_from_bytes(&content)
        ))
    }

    /// Parse the record string into a `Record`.
    ///
    /// The checksum is extracted but not verified, see [`Record::has_valid_checksum`].
    ///
    /// # Errors
    /// - Returns an error if the record has an invalid length or start code
    /// - Returns an error if the record is not made of hex characters
    /// - Returns an error if the record type is not valid
    /// - Returns an error if the record length does not match its byte count
    pub fn parse(line: &str) -> Result<Self, UniversalHexError> {
        validate_record(line)?;

        // Start code is ASCII, so slicing after it is safe
        let bytes = utils::bytes_from_hex_str(&line[sizes::START_CODE_LEN..])
            .map_err(|err| not_hex_error(line, err))?;

        let length = bytes[0];
        let address = u16::from_be_bytes([bytes[1], bytes[2]]);
        let rtype = RecordType::try_from(bytes[3])?;

        let data_start = 4;
        let checksum_index = data_start + length as usize;
        let expected = checksum_index + 1;
        if bytes.len() != expected {
            return Err(UniversalHexError::ParseRecordError(
                UniversalHexErrorKind::RecordInvalidPayloadLength {
                    record: line.to_string(),
                    expected,
                    actual: bytes.len(),
                },
            ));
        }

        Ok(Self {
            length,
            address,
            rtype,
            data: bytes[data_start..checksum_index].to_vec(),
            checksum: bytes[checksum_index],
        })
    }

    /// Check that all record bytes, checksum included, add up to zero.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn has_valid_checksum(&self) -> bool {
        let header = [
            self.length,
            (self.address >> 8) as u8,
            (self.address & 0xFF) as u8,
            self.rtype as u8,
        ];
        let content = utils::concat_byte_arrays(&[&header, &self.data]);
        Self::calculate_checksum(&content) == self.checksum
    }
}

fn not_hex_error(line: &str, err: UniversalHexError) -> UniversalHexError {
    let UniversalHexError::ParseRecordError(kind) = err else {
        return err;
    };
    UniversalHexError::ParseRecordError(UniversalHexErrorKind::RecordNotHex(
        line.to_string(),
        Box::new(kind),
    ))
}

/// Check that an Intel HEX record has a valid length and starts with a colon.
///
/// # Errors
/// Returns an error describing the first rule the record breaks.
pub fn validate_record(line: &str) -> Result<(), UniversalHexError> {
    let kind = if line.len() < MIN_RECORD_STR_LEN {
        UniversalHexErrorKind::RecordTooShort(line.to_string())
    } else if line.len() > MAX_RECORD_STR_LEN {
        UniversalHexErrorKind::RecordTooLong(line.to_string())
    } else if !line.starts_with(START_CODE) {
        UniversalHexErrorKind::MissingStartCode(line.to_string())
    } else {
        return Ok(());
    };
    Err(UniversalHexError::ParseRecordError(kind))
}

/// Retrieve the record type from a record line.
///
/// # Errors
/// Returns an error if the record shape is invalid or the type is not a known [`RecordType`].
///
/// # Example
/// ```
/// use universalhexlib::{RecordType, record::get_record_type};
///
/// assert_eq!(get_record_type(":0400000A9901C0DEBA").unwrap(), RecordType::BlockStart);
/// ```
pub fn get_record_type(line: &str) -> Result<RecordType, UniversalHexError> {
    validate_record(line)?;
    let invalid = || {
        UniversalHexError::ParseRecordError(UniversalHexErrorKind::InvalidRecordType(
            line.to_string(),
        ))
    };
    let type_str = line.get(ranges::RECORD_TYPE_RANGE).ok_or_else(invalid)?;
    let value = u8::from_str_radix(type_str, 16).map_err(|_| invalid())?;
    RecordType::try_from(value).map_err(|_| invalid())
}

/// Retrieve the data field of a record line.
///
/// Records too short to contain a data field give an empty vector.
///
/// # Errors
/// Returns an error if the data field is not valid hex.
pub fn get_record_data(line: &str) -> Result<Vec<u8>, UniversalHexError> {
    let data_end = line.len().saturating_sub(sizes::CHECKSUM_LEN);
    if data_end <= sizes::DATA_STR_INDEX {
        return Ok(Vec::new());
    }
    let data_str = line.get(sizes::DATA_STR_INDEX..data_end).ok_or_else(|| {
        UniversalHexError::ParseRecordError(UniversalHexErrorKind::RecordNotHex(
            line.to_string(),
            Box::new(UniversalHexErrorKind::HexStringInvalidCharacters(
                line.to_string(),
            )),
        ))
    })?;
    utils::bytes_from_hex_str(data_str).map_err(|err| not_hex_error(line, err))
}

/// End Of File record, always the same.
#[must_use]
pub const fn end_of_file_record() -> &'static str {
    END_OF_FILE_RECORD
}

/// Create an Extended Linear Address record from a full 32-bit address.
/// Only the upper 16 bits of the address end up in the record.
///
/// # Errors
/// Returns an error if the address does not fit in 32 bits.
///
/// # Example
/// ```
/// use universalhexlib::record::ext_lin_address_record;
///
/// assert_eq!(ext_lin_address_record(0x3_1234).unwrap(), ":020000040003F7");
/// ```
#[allow(clippy::cast_possible_truncation)]
pub fn ext_lin_address_record(address: u64) -> Result<String, UniversalHexError> {
    if address > u64::from(u32::MAX) {
        return Err(UniversalHexError::CreateRecordError(
            UniversalHexErrorKind::LinearAddressOutOfRange(address),
        ));
    }
    Record::create(
        0,
        RecordType::ExtendedLinearAddress,
        &[(address >> 24) as u8, (address >> 16) as u8],
    )
}

/// Convert an Extended Segment Address record into the equivalent Extended Linear Address
/// record. Only segments aligned to a 64K boundary have an equivalent.
///
/// # Errors
/// Returns an error if the record is not a valid Extended Segment Address record or its
/// segment cannot be expressed as a linear upper address.
///
/// # Example
/// ```
/// use universalhexlib::record::convert_ext_seg_to_lin_address_record;
///
/// assert_eq!(
///     convert_ext_seg_to_lin_address_record(":020000021000EC").unwrap(),
///     ":020000040001F9"
/// );
/// ```
pub fn convert_ext_seg_to_lin_address_record(line: &str) -> Result<String, UniversalHexError> {
    let invalid = || {
        UniversalHexError::ConversionError(UniversalHexErrorKind::InvalidExtendedSegmentAddress(
            line.to_string(),
        ))
    };
    let record = Record::parse(line).map_err(|_| invalid())?;
    if record.rtype != RecordType::ExtendedSegmentAddress
        || record.address != 0
        || record.data.len() != 2
    {
        return Err(invalid());
    }
    let segment = u16::from_be_bytes([record.data[0], record.data[1]]);
    if segment & 0x0FFF != 0 {
        return Err(invalid());
    }
    ext_lin_address_record(u64::from(segment) << 4)
}

/// Create a Block Start (custom) record embedding the board ID.
///
/// # Errors
/// Returns an error if the board ID does not fit in 16 bits.
///
/// # Example
/// ```
/// use universalhexlib::record::block_start_record;
///
/// assert_eq!(block_start_record(0x9901).unwrap(), ":0400000A9901C0DEBA");
/// ```
pub fn block_start_record(board_id: u32) -> Result<String, UniversalHexError> {
    let id = u16::try_from(board_id).map_err(|_| {
        UniversalHexError::CreateRecordError(UniversalHexErrorKind::BoardIdOutOfRange(board_id))
    })?;
    let [hi, lo] = id.to_be_bytes();
    Record::create(0, RecordType::BlockStart, &[hi, lo, 0xC0, 0xDE])
}

/// Create a Block End (custom) record. Its data field is ignored by consumers and only
/// used for padding.
///
/// # Errors
/// Returns an error if `pad_len` is larger than [`RECORD_DATA_MAX_BYTES`].
pub fn block_end_record(pad_len: usize) -> Result<String, UniversalHexError> {
    match pad_len {
        // Blocks of full 16 byte records plus one address record
        0x04 => Ok(String::from(":0400000BFFFFFFFFF5")),
        // Blocks of ten full 16 byte records
        0x0C => Ok(String::from(":0C00000BFFFFFFFFFFFFFFFFFFFFFFFFF5")),
        _ => padding_record(RecordType::BlockEnd, pad_len),
    }
}

/// Create a Padded Data (custom) record, whose data is ignored and only fills space.
///
/// # Errors
/// Returns an error if `pad_len` is larger than [`RECORD_DATA_MAX_BYTES`].
pub fn padded_data_record(pad_len: usize) -> Result<String, UniversalHexError> {
    padding_record(RecordType::PaddedData, pad_len)
}

fn padding_record(rtype: RecordType, pad_len: usize) -> Result<String, UniversalHexError> {
    if pad_len > RECORD_DATA_MAX_BYTES {
        return Err(UniversalHexError::CreateRecordError(
            UniversalHexErrorKind::DataTooLong(rtype, pad_len),
        ));
    }
    Record::create(0, rtype, &[0xFF; RECORD_DATA_MAX_BYTES][..pad_len])
}

/// Rebuild a record with a different record type, keeping its address and data.
///
/// # Errors
/// Returns an error if the record cannot be parsed.
///
/// # Example
/// ```
/// use universalhexlib::{RecordType, record::convert_record_to};
///
/// assert_eq!(
///     convert_record_to(":105D3000E060E3802046FFF765FF0123A1881A4653", RecordType::CustomData).unwrap(),
///     ":105D300DE060E3802046FFF765FF0123A1881A4646"
/// );
/// ```
pub fn convert_record_to(line: &str, rtype: RecordType) -> Result<String, UniversalHexError> {
    let record = Record::parse(line)?;
    Record::create(u32::from(record.address), rtype, &record.data)
}

/// Split an Intel HEX string into its record lines, dropping carriage returns and
/// empty lines.
#[must_use]
pub fn hex_to_records(hex: &str) -> Vec<String> {
    hex.split('\n')
        .map(|line| line.replace('\r', ""))
        .filter(|line| !line.is_empty())
        .collect()
}

/// Find the largest data field length from the beginning of a list of records.
///
/// Scanning starts assuming 16 bytes and stops once more than 10 records with the
/// maximum length found so far have been seen.
///
/// # Errors
/// Returns an error if the length found is larger than [`RECORD_DATA_MAX_BYTES`].
pub fn find_data_field_length<S: AsRef<str>>(records: &[S]) -> Result<usize, UniversalHexError> {
    let mut max_data_bytes = 16;
    let mut max_data_bytes_count = 0;
    for record in records {
        let data_bytes = record.as_ref().len().saturating_sub(MIN_RECORD_STR_LEN) / 2;
        if data_bytes > max_data_bytes {
            max_data_bytes = data_bytes;
            max_data_bytes_count = 0;
        } else if data_bytes == max_data_bytes {
            max_data_bytes_count += 1;
        }
        if max_data_bytes_count > 10 {
            break;
        }
    }
    if max_data_bytes > RECORD_DATA_MAX_BYTES {
        return Err(UniversalHexError::ConversionError(
            UniversalHexErrorKind::DataFieldTooLarge(max_data_bytes),
        ));
    }
    Ok(max_data_bytes)
}
