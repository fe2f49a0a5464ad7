//! Conversions between byte arrays and uppercase hexadecimal strings.

use crate::error::{UniversalHexError, UniversalHexErrorKind};
use std::fmt::Write;

/// Decode a single ASCII hex digit.
const fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// Convert a hex string into a byte vector. An empty string gives an empty vector.
///
/// # Errors
/// Returns an error if the string has an odd number of characters or if any
/// of them is not a hexadecimal digit.
///
/// # Example
/// ```
/// use universalhexlib::utils::bytes_from_hex_str;
///
/// assert_eq!(bytes_from_hex_str("00FFa5").unwrap(), vec![0x00, 0xFF, 0xA5]);
/// ```
pub fn bytes_from_hex_str(hex: &str) -> Result<Vec<u8>, UniversalHexError> {
    if hex.len() % 2 != 0 {
        return Err(UniversalHexError::ParseRecordError(
            UniversalHexErrorKind::HexStringOddLength(hex.to_string()),
        ));
    }

    hex.as_bytes()
        .chunks_exact(2)
        .map(|pair| match (nibble(pair[0]), nibble(pair[1])) {
            (Some(hi), Some(lo)) => Ok((hi << 4) | lo),
            _ => Err(UniversalHexError::ParseRecordError(
                UniversalHexErrorKind::HexStringInvalidCharacters(hex.to_string()),
            )),
        })
        .collect()
}

/// Convert a byte slice into an uppercase hex string, two characters per byte.
///
/// # Example
/// ```
/// use universalhexlib::utils::hex_str_from_bytes;
///
/// assert_eq!(hex_str_from_bytes(&[0x0A, 0xC0, 0xDE]), "0AC0DE");
/// assert_eq!(hex_str_from_bytes(&[]), "");
/// ```
#[must_use]
pub fn hex_str_from_bytes(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        // Writing into a String cannot fail
        let _ = write!(s, "{b:02X}");
    }
    s
}

/// Convert a number into a two digit uppercase hex string, optionally prefixed with `0x`.
///
/// # Errors
/// Returns an error if the number does not fit in an unsigned byte.
///
/// # Example
/// ```
/// use universalhexlib::utils::byte_to_hex_str;
///
/// assert_eq!(byte_to_hex_str(0x0F, false).unwrap(), "0F");
/// assert_eq!(byte_to_hex_str(0xAB, true).unwrap(), "0xAB");
/// assert!(byte_to_hex_str(0x100, false).is_err());
/// ```
pub fn byte_to_hex_str(byte: u32, prefix: bool) -> Result<String, UniversalHexError> {
    let byte = u8::try_from(byte).map_err(|_| {
        UniversalHexError::CreateRecordError(UniversalHexErrorKind::ByteOutOfRange(byte))
    })?;
    Ok(if prefix {
        format!("0x{byte:02X}")
    } else {
        format!("{byte:02X}")
    })
}

/// Concatenate byte arrays keeping their order.
#[must_use]
pub fn concat_byte_arrays(arrays: &[&[u8]]) -> Vec<u8> {
    let mut combined = Vec::with_capacity(arrays.iter().map(|a| a.len()).sum());
    for array in arrays {
        combined.extend_from_slice(array);
    }
    combined
}
