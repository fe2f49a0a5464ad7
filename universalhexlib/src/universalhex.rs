//! Convert between standard Intel HEX strings and Universal Hex strings.
//!
//! A Universal Hex multiplexes several Intel HEX images, each tagged with a Board ID, into a
//! single file. Every image is packed into boundary-aligned fragments opened by an Extended
//! Linear Address and a Block Start record, and closed by a Block End record.
//!
//! Two packing formats exist:
//! - **sections**: each image is aligned to the boundary once, at its end (preferred).
//! - **blocks**: each image is split into independent 512 character blocks.

use crate::error::{UniversalHexError, UniversalHexErrorKind};
use crate::record::{
    RecordType, block_end_record, block_start_record, convert_ext_seg_to_lin_address_record,
    convert_record_to, end_of_file_record, ext_lin_address_record, find_data_field_length,
    get_record_data, get_record_type, hex_to_records, padded_data_record, MAX_RECORD_STR_LEN,
};
use tracing::{debug, trace, warn};

/// Default alignment, in characters including new lines, of Universal Hex blocks and sections.
pub const BLOCK_SIZE: usize = 512;

/// Smallest boundary able to hold a fragment header, the largest record and a Block End.
pub const MIN_BOUNDARY_SIZE: usize = 128;

/// Board IDs of micro:bit V1 variants. Their hexes keep the standard Data record type.
pub const V1_BOARD_IDS: [u32; 2] = [0x9900, 0x9901];

/// Board IDs of micro:bit V2 variants.
pub const V2_BOARD_IDS: [u32; 4] = [0x9903, 0x9904, 0x9905, 0x9906];

const ELA_RECORD_BEGINNING: &str = ":02000004";
const BLOCK_START_RECORD_BEGINNING: &str = ":0400000A";
// Extended Linear Address to 0x2000_0000 (RAM), used by MakeCode to store project metadata
const MAKECODE_RAM_ELA_RECORD: &str = ":020000042000DA";

/// Board IDs used to target each micro:bit version.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MicrobitBoardId {
    V1 = 0x9900,
    V2 = 0x9903,
}

impl From<MicrobitBoardId> for u32 {
    fn from(id: MicrobitBoardId) -> Self {
        id as Self
    }
}

/// An Intel HEX string paired with the Board ID of its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndividualHex {
    pub hex: String,
    pub board_id: u32,
}

impl IndividualHex {
    pub fn new(hex: impl Into<String>, board_id: impl Into<u32>) -> Self {
        Self {
            hex: hex.into(),
            board_id: board_id.into(),
        }
    }
}

/// Universal Hex packing format.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum PackingFormat {
    /// Align the whole image once, at its end.
    #[default]
    Sections,
    /// Split the image into independent boundary sized blocks.
    Blocks,
}

/// Records of a fragment being packed and their length in characters, new lines included.
#[derive(Debug, Default)]
struct Fragment {
    lines: Vec<String>,
    len: usize,
}

impl Fragment {
    fn add_record(&mut self, record: String) {
        self.add_length(&record);
        self.lines.push(record);
    }

    fn add_length(&mut self, record: &str) {
        self.len += record.len() + 1;
    }

    fn chars_to_boundary(&self, boundary: usize) -> usize {
        (boundary - self.len % boundary) % boundary
    }
}

/// Converts an Intel HEX string into the Universal Hex "blocks" format, with 512 character
/// blocks and the custom record types.
///
/// The output is not a full Universal Hex but one part of it, ready to be merged with
/// [`create_universal_hex`]. An empty hex gives an empty string.
///
/// # Errors
/// - Returns an error if the Board ID does not fit in 16 bits
/// - Returns an error if there is an End Of File record before the end of the hex
/// - Returns an error if the hex is already a Universal Hex
/// - Returns an error if a record is malformed
pub fn hex_to_custom_format_blocks(hex: &str, board_id: u32) -> Result<String, UniversalHexError> {
    pack_blocks(hex, board_id, BLOCK_SIZE)
}

/// Converts an Intel HEX string into the Universal Hex "sections" format, aligning the
/// whole image to a 512 character boundary.
///
/// The output is not a full Universal Hex but one part of it, ready to be merged with
/// [`create_universal_hex`]. An empty hex gives an empty string.
///
/// # Errors
/// - Returns an error if the Board ID does not fit in 16 bits
/// - Returns an error if there is an End Of File record before the end of the hex
/// - Returns an error if the hex is already a Universal Hex
/// - Returns an error if a record is malformed
pub fn hex_to_custom_format_section(
    hex: &str,
    board_id: u32,
) -> Result<String, UniversalHexError> {
    pack_section(hex, board_id, BLOCK_SIZE)
}

fn pack_blocks(hex: &str, board_id: u32, block_size: usize) -> Result<String, UniversalHexError> {
    // Hex files for V1 boards keep using the standard Data record type
    let replace_data_record = !V1_BOARD_IDS.contains(&board_id);

    let start_record = block_start_record(board_id)?;
    let mut current_ext_addr = ext_lin_address_record(0)?;
    let end_record_base_len = block_end_record(0)?.len();
    let pad_record_base_len = padded_data_record(0)?.len();

    let records = hex_to_records(hex);
    let padding_capacity = find_data_field_length(&records)?;

    if records.is_empty() {
        return Ok(String::new());
    }
    ensure_not_universal(&records, board_id)?;
    debug!(
        board_id,
        records = records.len(),
        block_size,
        "packing hex into blocks"
    );

    let mut lines: Vec<String> = Vec::new();
    let mut ih = 0;
    while ih < records.len() {
        // An address record opening the block is not repeated after the Block Start
        match get_record_type(&records[ih])? {
            RecordType::ExtendedLinearAddress => {
                current_ext_addr.clone_from(&records[ih]);
                ih += 1;
            }
            RecordType::ExtendedSegmentAddress => {
                current_ext_addr = convert_ext_seg_to_lin_address_record(&records[ih])?;
                ih += 1;
            }
            _ => {}
        }

        let mut block = Fragment::default();
        block.add_record(current_ext_addr.clone());
        block.add_record(start_record.clone());
        block.len += end_record_base_len + 1;
        let first_record = ih;

        let mut end_of_file = false;
        while let Some(line) = records.get(ih) {
            if block.len + line.len() + 1 > block_size {
                break;
            }
            ih += 1;
            let record = match get_record_type(line)? {
                RecordType::Data if replace_data_record => {
                    convert_record_to(line, RecordType::CustomData)?
                }
                RecordType::ExtendedLinearAddress => {
                    current_ext_addr.clone_from(line);
                    line.clone()
                }
                RecordType::ExtendedSegmentAddress => {
                    current_ext_addr = convert_ext_seg_to_lin_address_record(line)?;
                    current_ext_addr.clone()
                }
                RecordType::EndOfFile => {
                    end_of_file = true;
                    break;
                }
                _ => line.clone(),
            };
            block.add_record(record);
        }

        if end_of_file {
            if ih != records.len() {
                return Err(misplaced_eof_error(&records, ih, board_id));
            }
            // Already accounted for when checking the EoF record fits in the block
            block.lines.push(block_end_record(0)?);
            block.lines.push(end_of_file_record().to_string());
        } else {
            if let Some(line) = records.get(ih).filter(|_| ih == first_record) {
                // Nothing fits, the record would never be packed
                return Err(UniversalHexError::ConversionError(
                    UniversalHexErrorKind::RecordTooLong(line.clone()),
                ));
            }
            while block_size - block.len > padding_capacity * 2 {
                let pad_len = (block_size - block.len - (pad_record_base_len + 1)) / 2;
                block.add_record(padded_data_record(pad_len.min(padding_capacity))?);
            }
            // TODO: an odd number of remaining characters leaves the block one short
            block.lines.push(block_end_record((block_size - block.len) / 2)?);
        }

        trace!(
            board_id,
            records = block.lines.len(),
            end_of_file,
            "packed block"
        );
        lines.append(&mut block.lines);
    }
    lines.push(String::new());

    Ok(lines.join("\n"))
}

fn pack_section(hex: &str, board_id: u32, boundary: usize) -> Result<String, UniversalHexError> {
    let records = hex_to_records(hex);
    if records.is_empty() {
        return Ok(String::new());
    }
    ensure_not_universal(&records, board_id)?;
    debug!(
        board_id,
        records = records.len(),
        boundary,
        "packing hex into a section"
    );

    let mut section = Fragment::default();
    let mut ih = 0;

    // Without an opening address record the section starts at 0x0
    match get_record_type(&records[0])? {
        RecordType::ExtendedLinearAddress => {
            section.add_record(records[0].clone());
            ih += 1;
        }
        RecordType::ExtendedSegmentAddress => {
            section.add_record(convert_ext_seg_to_lin_address_record(&records[0])?);
            ih += 1;
        }
        _ => section.add_record(ext_lin_address_record(0)?),
    }
    section.add_record(block_start_record(board_id)?);

    let replace_data_record = !V1_BOARD_IDS.contains(&board_id);
    let mut end_of_file = false;
    while let Some(line) = records.get(ih) {
        ih += 1;
        let record = match get_record_type(line)? {
            RecordType::Data if replace_data_record => {
                convert_record_to(line, RecordType::CustomData)?
            }
            RecordType::ExtendedSegmentAddress => convert_ext_seg_to_lin_address_record(line)?,
            RecordType::EndOfFile => {
                end_of_file = true;
                break;
            }
            _ => line.clone(),
        };
        section.add_record(record);
    }
    if ih != records.len() {
        return Err(misplaced_eof_error(&records, ih, board_id));
    }

    // Minimum Block End length, its padding is added below
    section.add_length(&block_end_record(0)?);

    let record_no_data_len = padded_data_record(0)?.len() + 1;
    let record_data_max_bytes = find_data_field_length(&records)?;
    let padding_capacity_chars = record_data_max_bytes * 2;
    let mut chars_needed = section.chars_to_boundary(boundary);
    while chars_needed > padding_capacity_chars {
        let byte_len = (chars_needed - record_no_data_len) >> 1;
        section.add_record(padded_data_record(byte_len.min(record_data_max_bytes))?);
        chars_needed = section.chars_to_boundary(boundary);
    }
    section.lines.push(block_end_record(chars_needed >> 1)?);
    if end_of_file {
        section.lines.push(end_of_file_record().to_string());
    }
    section.lines.push(String::new());

    trace!(board_id, len = section.len, end_of_file, "packed section");
    Ok(section.lines.join("\n"))
}

fn ensure_not_universal(records: &[String], board_id: u32) -> Result<(), UniversalHexError> {
    if is_universal_hex_records(records) {
        return Err(UniversalHexError::ConversionError(
            UniversalHexErrorKind::AlreadyUniversalHex(board_id),
        ));
    }
    Ok(())
}

fn misplaced_eof_error(records: &[String], index: usize, board_id: u32) -> UniversalHexError {
    // MakeCode hexes for V1 carry their project metadata after the EoF record
    let kind = if is_makecode_for_v1_hex_records(records) {
        UniversalHexErrorKind::MakeCodeForV1Hex(board_id)
    } else {
        UniversalHexErrorKind::EndOfFileNotLast {
            index,
            total: records.len(),
            board_id,
        }
    };
    UniversalHexError::ConversionError(kind)
}

/// Creates a Universal Hex from a list of Intel HEX strings and their Board IDs.
///
/// The End Of File record is removed from all but the last image, so the output holds a
/// single one. An empty list gives an empty string.
///
/// # Errors
/// Returns an error if any of the images cannot be packed.
///
/// # Example
/// ```
/// use universalhexlib::{IndividualHex, MicrobitBoardId, PackingFormat, create_universal_hex, is_universal_hex};
///
/// let v1 = ":020000040000FA\n:0400000000000000FC\n:00000001FF\n";
/// let v2 = ":020000040000FA\n:0400000000000000FC\n:00000001FF\n";
/// let universal = create_universal_hex(
///     &[
///         IndividualHex::new(v1, MicrobitBoardId::V1),
///         IndividualHex::new(v2, MicrobitBoardId::V2),
///     ],
///     PackingFormat::Sections,
/// )
/// .unwrap();
///
/// assert!(is_universal_hex(&universal));
/// assert!(universal.ends_with(":00000001FF\n"));
/// ```
pub fn create_universal_hex(
    hexes: &[IndividualHex],
    format: PackingFormat,
) -> Result<String, UniversalHexError> {
    pack_universal_hex(hexes, format, BLOCK_SIZE)
}

fn pack_universal_hex(
    hexes: &[IndividualHex],
    format: PackingFormat,
    boundary: usize,
) -> Result<String, UniversalHexError> {
    let Some((last, rest)) = hexes.split_last() else {
        return Ok(String::new());
    };
    let pack = |individual: &IndividualHex| match format {
        PackingFormat::Sections => pack_section(&individual.hex, individual.board_id, boundary),
        PackingFormat::Blocks => pack_blocks(&individual.hex, individual.board_id, boundary),
    };
    let eof_nl_record = format!("{}\n", end_of_file_record());

    let mut universal = String::new();
    for individual in rest {
        let custom_hex = pack(individual)?;
        universal.push_str(
            custom_hex
                .strip_suffix(eof_nl_record.as_str())
                .unwrap_or(&custom_hex),
        );
    }
    // The last image gets a guaranteed EoF record
    let last_custom_hex = pack(last)?;
    universal.push_str(&last_custom_hex);
    if !last_custom_hex.ends_with(&eof_nl_record) {
        universal.push_str(&eof_nl_record);
    }

    debug!(
        images = hexes.len(),
        ?format,
        len = universal.len(),
        "created Universal Hex"
    );
    Ok(universal)
}

/// Checks if the provided hex string is a Universal Hex.
///
/// Only the opening Extended Linear Address and Block Start records are looked at, any line
/// ending is accepted. The string is not split into records, so this is a cheap probe.
///
/// # Example
/// ```
/// use universalhexlib::is_universal_hex;
///
/// assert!(is_universal_hex(":020000040000FA\r\n:0400000A9900C0DEBB\r\n"));
/// assert!(!is_universal_hex(":020000040000FA\n:00000001FF\n"));
/// assert!(!is_universal_hex(""));
/// ```
#[must_use]
pub fn is_universal_hex(hex: &str) -> bool {
    if !hex.starts_with(ELA_RECORD_BEGINNING) {
        return false;
    }
    // Find the start of the next record, line endings are unknown
    let bytes = hex.as_bytes();
    let mut i = ELA_RECORD_BEGINNING.len();
    loop {
        i += 1;
        if bytes.get(i) == Some(&b':') || i >= MAX_RECORD_STR_LEN + 3 {
            break;
        }
    }
    bytes.get(i..i + BLOCK_START_RECORD_BEGINNING.len())
        == Some(BLOCK_START_RECORD_BEGINNING.as_bytes())
}

/// Checks if a list of records has the Universal Hex signature: an Extended Linear Address
/// and a Block Start record at the beginning and an End Of File record at the end.
#[must_use]
pub fn is_universal_hex_records<S: AsRef<str>>(records: &[S]) -> bool {
    let has_type = |record: &S, rtype: RecordType| {
        get_record_type(record.as_ref()).is_ok_and(|found| found == rtype)
    };
    match records {
        [first, second, .., last] => {
            has_type(first, RecordType::ExtendedLinearAddress)
                && has_type(second, RecordType::BlockStart)
                && has_type(last, RecordType::EndOfFile)
        }
        _ => false,
    }
}

/// Checks if a list of records belongs to a hex from MakeCode for micro:bit V1.
///
/// These hexes store the project metadata after the End Of File record, either as Other
/// Data records or in RAM (Extended Linear Address 0x2000_0000). Older versions keep the
/// RAM metadata before a trailing End Of File record.
#[must_use]
pub fn is_makecode_for_v1_hex_records<S: AsRef<str>>(records: &[S]) -> bool {
    let eof_index = records
        .iter()
        .position(|record| record.as_ref() == end_of_file_record());
    let start = match eof_index {
        Some(i) if i + 1 == records.len() => usize::from(i > 0),
        Some(i) => i + 1,
        None => 0,
    };
    records.iter().skip(start).any(|record| {
        let record = record.as_ref();
        record == MAKECODE_RAM_ELA_RECORD
            || get_record_type(record).is_ok_and(|rtype| rtype == RecordType::OtherData)
    })
}

/// Checks if the hex string is an Intel HEX file from MakeCode for micro:bit V1.
#[must_use]
pub fn is_makecode_for_v1_hex(hex: &str) -> bool {
    is_makecode_for_v1_hex_records(&hex_to_records(hex))
}

/// Records collected for one Board ID while separating a Universal Hex.
#[derive(Debug)]
struct BoardHex {
    board_id: u32,
    last_ext_addr: String,
    records: Vec<String>,
}

fn current_board(
    boards: &mut [BoardHex],
    current: Option<usize>,
) -> Result<&mut BoardHex, UniversalHexError> {
    current
        .and_then(|index| boards.get_mut(index))
        .ok_or(UniversalHexError::ConversionError(
            UniversalHexErrorKind::InvalidUniversalHexFormat,
        ))
}

/// Separates a Universal Hex into its individual Intel HEX strings, in the order their
/// Board IDs first appear.
///
/// # Errors
/// - Returns an error if the Universal Hex is empty
/// - Returns an error if the hex does not have the Universal Hex signature
/// - Returns an error if a Block Start record data is not 4 bytes long
/// - Returns an error if a record is malformed
pub fn separate_universal_hex(
    universal_hex: &str,
) -> Result<Vec<IndividualHex>, UniversalHexError> {
    let records = hex_to_records(universal_hex);
    if records.is_empty() {
        return Err(UniversalHexError::ConversionError(
            UniversalHexErrorKind::EmptyUniversalHex,
        ));
    }
    if !is_universal_hex_records(&records) {
        return Err(UniversalHexError::ConversionError(
            UniversalHexErrorKind::InvalidUniversalHexFormat,
        ));
    }

    let mut boards: Vec<BoardHex> = Vec::new();
    let mut current: Option<usize> = None;
    let mut i = 0;
    while i < records.len() {
        let record = &records[i];
        match get_record_type(record)? {
            RecordType::Data
            | RecordType::EndOfFile
            | RecordType::ExtendedSegmentAddress
            | RecordType::StartSegmentAddress
            | RecordType::StartLinearAddress => {
                current_board(&mut boards, current)?
                    .records
                    .push(record.clone());
            }
            RecordType::CustomData => {
                let data_record = convert_record_to(record, RecordType::Data)?;
                current_board(&mut boards, current)?
                    .records
                    .push(data_record);
            }
            RecordType::ExtendedLinearAddress => {
                // Start of a new block when followed by a Block Start record
                let block_start = records.get(i + 1).filter(|next| {
                    get_record_type(next).is_ok_and(|rtype| rtype == RecordType::BlockStart)
                });
                if let Some(block_start) = block_start {
                    let data = get_record_data(block_start)?;
                    let [id_hi, id_lo, _, _] = data[..] else {
                        return Err(UniversalHexError::ConversionError(
                            UniversalHexErrorKind::InvalidBlockStart(block_start.clone()),
                        ));
                    };
                    let board_id = (u32::from(id_hi) << 8) | u32::from(id_lo);
                    let index = boards
                        .iter()
                        .position(|board| board.board_id == board_id)
                        .unwrap_or_else(|| {
                            boards.push(BoardHex {
                                board_id,
                                last_ext_addr: record.clone(),
                                records: vec![record.clone()],
                            });
                            boards.len() - 1
                        });
                    current = Some(index);
                    i += 1;
                }
                let board = current_board(&mut boards, current)?;
                if board.last_ext_addr != *record {
                    board.last_ext_addr.clone_from(record);
                    board.records.push(record.clone());
                }
            }
            _ => {}
        }
        i += 1;
    }

    let hexes: Vec<IndividualHex> = boards
        .into_iter()
        .map(|mut board| {
            // Every hex, and not just the last one, must end with an EoF record
            if board.records.last().map(String::as_str) != Some(end_of_file_record()) {
                warn!(
                    board_id = board.board_id,
                    "hex without End Of File record, appending one"
                );
                board.records.push(end_of_file_record().to_string());
            }
            let mut hex = board.records.join("\n");
            hex.push('\n');
            IndividualHex {
                hex,
                board_id: board.board_id,
            }
        })
        .collect();

    debug!(boards = hexes.len(), "separated Universal Hex");
    Ok(hexes)
}

/// Configurable Universal Hex creation.
///
/// # Example
/// ```
/// use universalhexlib::{MicrobitBoardId, PackingFormat, UniversalHexBuilder, separate_universal_hex};
///
/// let hex = ":020000040000FA\n:0400000000000000FC\n:00000001FF\n";
/// let universal = UniversalHexBuilder::new()
///     .add_hex(hex, MicrobitBoardId::V1)
///     .add_hex(hex, MicrobitBoardId::V2)
///     .set_format(PackingFormat::Blocks)
///     .build()
///     .unwrap();
///
/// let hexes = separate_universal_hex(&universal).unwrap();
/// assert_eq!(hexes.len(), 2);
/// assert_eq!(hexes[1].hex, hex);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniversalHexBuilder {
    hexes: Vec<IndividualHex>,
    format: PackingFormat,
    boundary_size: usize,
}

impl Default for UniversalHexBuilder {
    fn default() -> Self {
        Self {
            hexes: Vec::new(),
            format: PackingFormat::default(),
            boundary_size: BLOCK_SIZE,
        }
    }
}

impl UniversalHexBuilder {
    /// Sections format, 512 character boundary and no hexes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an Intel HEX string and its Board ID. Hexes keep the order they are added in.
    pub fn add_hex(&mut self, hex: impl Into<String>, board_id: impl Into<u32>) -> &mut Self {
        self.hexes.push(IndividualHex::new(hex, board_id));
        self
    }

    pub fn set_format(&mut self, format: PackingFormat) -> &mut Self {
        self.format = format;
        self
    }

    /// Set the alignment of blocks and sections, in characters including new lines.
    ///
    /// # Errors
    /// Returns an error if the size is odd or smaller than [`MIN_BOUNDARY_SIZE`].
    pub fn set_boundary_size(&mut self, size: usize) -> Result<&mut Self, UniversalHexError> {
        if size < MIN_BOUNDARY_SIZE || size % 2 != 0 {
            return Err(UniversalHexError::ConversionError(
                UniversalHexErrorKind::InvalidBoundarySize {
                    size,
                    min: MIN_BOUNDARY_SIZE,
                },
            ));
        }
        self.boundary_size = size;
        Ok(self)
    }

    #[must_use]
    pub fn hexes(&self) -> &[IndividualHex] {
        &self.hexes
    }

    #[must_use]
    pub const fn format(&self) -> PackingFormat {
        self.format
    }

    #[must_use]
    pub const fn boundary_size(&self) -> usize {
        self.boundary_size
    }

    /// Create the Universal Hex from the hexes added so far.
    ///
    /// # Errors
    /// Returns an error if any of the hexes cannot be packed.
    pub fn build(&self) -> Result<String, UniversalHexError> {
        pack_universal_hex(&self.hexes, self.format, self.boundary_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    const PAD_16: &str = ":1000000CFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF4";

    fn lines(records: &[&str]) -> String {
        records.iter().map(|r| format!("{r}\n")).collect()
    }

    fn small_hex() -> String {
        lines(&[
            ":020000040000FA",
            ":10F39000002070470E207047002803D00A490861FA",
            ":10F3E00010C9121FA342F8D018BA21BA884201D915",
            ":020000040003F7",
            ":103F40006A4623C210A82A46FF21808A0C9B02F0F1",
        ])
    }

    /// Records filling exactly one block when packed with a V1 Board ID
    fn exact_block_records() -> Vec<&'static str> {
        vec![
            ":020000040003F7",
            ":108D800003F09F928E203D20496D6167652E444916",
            ":108D9000414D4F4E440AF09F8FA0203D20496D6108",
            ":108DA00067652E484F5553450AFFFFFFFFFFFFFF42",
            ":108DB000FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFC3",
            ":108DC000FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFB3",
            ":108DD000FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFA3",
            ":108DE000FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF93",
            ":108DF000FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF83",
            ":01F80000FDFF0A",
            ":020000041000EA",
            ":1010C0007CB0EE17FFFFFFFF0A0000000000E30006",
            ":0C10D000FFFFFFFF2D6D0300000000007B",
        ]
    }

    /// Hex with Extended Linear Address records inside and at the start of blocks
    fn ela_hex_records() -> Vec<&'static str> {
        vec![
            ":10558000002EEDD1E9E70020EAE7C0464302F0B57E",
            ":1055900042005D0AC30F4802440A4800120E000E82",
            ":1055A000C90FFF2A1FD0FF2822D0002A09D16E423E",
            ":1055B0006E4100280FD1002C0DD10020002D09D004",
            ":1055C00005E0002801D1002C01D08B4213D05842B5",
            ":1055D00001231843F0BD002EF7D04842414101207D",
            ":1055E00049420843F6E7002DDDD002204042F1E7B2",
            ":1055F000002CDAD0F9E78242E9DC04DBA542E6D8E8",
            ":105600000020A542E6D25842434101205B421843A4",
            ":020000040002F8",
            ":10561000E0E7C0464302F0B542004C005E0AC30F0B",
            ":105620004802120E450A240EC90FFF2A17D0FF2C7C",
            ":1056300019D0002A0BD170427041002C17D00028DD",
            ":1056400007D048424141012049420843F0BD002CA7",
            ":1056500013D08B4214D0584201231843F6E702209E",
            ":10566000002EF3D1E3E70220002DEFD1E1E7002D7A",
            ":10567000E5D10020002EE9D0EDE7002DE9D1EAE7E1",
            ":10568000A242E8DC04DBAE42E5D80020AE42DDD227",
            ":105690005842434101205B421843D7E7F0B55746D3",
            ":1056A0004E4645464300E0B446028846760A1F0E41",
            ":1056B000C40F002F47D0FF2F25D0002380259A4606",
            ":06F80000FDFFFFFFFFFF0A",
            ":020000040003F7",
            ":1056C0009946F600ED042E437F3F434642465D0275",
            ":1056D000D20F5B006D0A1B0E904640D0FF2B39D0D5",
            ":1056E00080220020ED00D20415437F3BFB18424688",
            ":1056F0005746591C62408C4607430F2F5CD86F49B0",
            ":00000001FF",
        ]
    }

    fn ela_hex() -> String {
        format!(":020000040000FA\n{}", lines(&ela_hex_records()))
    }

    #[test]
    fn test_blocks_pads_to_512() {
        // Arrange
        let mut expected = vec![
            ":020000040000FA",
            ":0400000A9903C0DEB8",
            ":10F3900D002070470E207047002803D00A490861ED",
            ":10F3E00D10C9121FA342F8D018BA21BA884201D908",
            ":020000040003F7",
            ":103F400D6A4623C210A82A46FF21808A0C9B02F0E4",
        ];
        expected.extend([PAD_16; 7]);
        expected.push(":0400000BFFFFFFFFF5");

        // Act
        let blocks = hex_to_custom_format_blocks(&small_hex(), 0x9903).unwrap();
        let section = hex_to_custom_format_section(&small_hex(), 0x9903).unwrap();

        // Assert
        assert_eq!(blocks, lines(&expected));
        assert_eq!(blocks.len(), 512);
        // A single block and a section are identical
        assert_eq!(section, blocks);
    }

    #[test]
    fn test_blocks_fits_exactly() {
        // Arrange
        let hex = lines(&exact_block_records());
        let mut expected = exact_block_records();
        expected.insert(1, ":0400000A9901C0DEBA");
        expected.push(":0000000BF5");

        // Act
        let result = hex_to_custom_format_blocks(&hex, 0x9901).unwrap();

        // Assert
        assert_eq!(result, lines(&expected));
        assert_eq!(result.len(), 512);
    }

    #[test]
    fn test_blocks_one_byte_too_large() {
        // Arrange
        let mut records = exact_block_records();
        records[9] = ":03F80000FDFFFF0A";
        let hex = lines(&records);

        let mut expected = records[..12].to_vec();
        expected.insert(1, ":0400000A9901C0DEBA");
        expected.push(":0B00000CFFFFFFFFFFFFFFFFFFFFFFF4");
        expected.push(":0000000BF5");
        // Second block with the last record plus padding
        expected.push(":020000041000EA");
        expected.push(":0400000A9901C0DEBA");
        expected.push(":0C10D000FFFFFFFF2D6D0300000000007B");
        expected.extend([PAD_16; 9]);
        expected.push(":1000000BFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5");

        // Act
        let result = hex_to_custom_format_blocks(&hex, 0x9901).unwrap();

        // Assert
        assert_eq!(result, lines(&expected));
        assert_eq!(result.len(), 1024);
    }

    #[test]
    fn test_section_one_byte_too_large() {
        // Arrange
        let mut records = exact_block_records();
        records[9] = ":03F80000FDFFFF0A";
        let hex = lines(&records);

        let mut expected = records.clone();
        expected.insert(1, ":0400000A9901C0DEBA");
        expected.extend([PAD_16; 11]);
        expected.push(":0D00000BFFFFFFFFFFFFFFFFFFFFFFFFFFF5");

        // Act
        let result = hex_to_custom_format_section(&hex, 0x9901).unwrap();

        // Assert
        assert_eq!(result, lines(&expected));
        assert_eq!(result.len(), 1024);
    }

    #[test]
    fn test_v1_board_ids_keep_data_records() {
        for board_id in V1_BOARD_IDS {
            // Arrange
            let block_start = block_start_record(board_id).unwrap();
            let mut expected = vec![
                ":020000040000FA",
                block_start.as_str(),
                ":10F39000002070470E207047002803D00A490861FA",
                ":10F3E00010C9121FA342F8D018BA21BA884201D915",
                ":020000040003F7",
                ":103F40006A4623C210A82A46FF21808A0C9B02F0F1",
            ];
            expected.extend([PAD_16; 7]);
            expected.push(":0400000BFFFFFFFFF5");

            // Act
            let blocks = hex_to_custom_format_blocks(&small_hex(), board_id).unwrap();
            let section = hex_to_custom_format_section(&small_hex(), board_id).unwrap();

            // Assert
            assert_eq!(blocks, lines(&expected));
            assert_eq!(section, lines(&expected));
        }
    }

    #[test]
    fn test_other_board_ids_change_data_record_type() {
        // Arrange
        let hex = format!("{}:00000001FF\n", small_hex());
        let cases = [
            (0x9903, ":0400000A9903C0DEB8"),
            (0x9904, ":0400000A9904C0DEB7"),
            (0x9910, ":0400000A9910C0DEAB"),
            (0x0000, ":0400000A0000C0DE54"),
            (0xFFFF, ":0400000AFFFFC0DE56"),
        ];

        for (board_id, block_start) in cases {
            let expected = lines(&[
                ":020000040000FA",
                block_start,
                ":10F3900D002070470E207047002803D00A490861ED",
                ":10F3E00D10C9121FA342F8D018BA21BA884201D908",
                ":020000040003F7",
                ":103F400D6A4623C210A82A46FF21808A0C9B02F0E4",
                ":0000000BF5",
                ":00000001FF",
            ]);

            // Act
            let result = hex_to_custom_format_blocks(&hex, board_id).unwrap();

            // Assert
            assert_eq!(result, expected, "Board ID {board_id:#06X}");
        }
    }

    #[test]
    fn test_board_id_out_of_range() {
        let err = hex_to_custom_format_blocks(&small_hex(), 0x1_0000).unwrap_err();
        assert!(err.to_string().contains("Board ID out of range"));
        let err = hex_to_custom_format_section(&small_hex(), 0x1_0000).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Range);
    }

    #[test]
    fn test_eof_placed_after_block_if_it_fits() {
        // Arrange
        let hex = lines(&[
            ":020000040000FA",
            ":109C40001ED0A180287A012805D00320A0715F488A",
            ":109C5000EF22817F6FE70220F8E721462846029A2B",
            ":020000040003F7",
            ":1072400019D0134B9C421BD00123A54206D0180035",
            ":00000001FF",
        ]);
        let header = [
            ":020000040000FA",
            ":0400000A9903C0DEB8",
            ":109C400D1ED0A180287A012805D00320A0715F487D",
            ":109C500DEF22817F6FE70220F8E721462846029A1E",
            ":020000040003F7",
            ":1072400D19D0134B9C421BD00123A54206D0180028",
        ];
        let mut expected_blocks = header.to_vec();
        expected_blocks.extend([":0000000BF5", ":00000001FF"]);
        let mut expected_section = header.to_vec();
        expected_section.extend([PAD_16; 7]);
        expected_section.extend([":0400000BFFFFFFFFF5", ":00000001FF"]);

        // Act
        let blocks = hex_to_custom_format_blocks(&hex, 0x9903).unwrap();
        let section = hex_to_custom_format_section(&hex, 0x9903).unwrap();

        // Assert
        assert_eq!(blocks, lines(&expected_blocks));
        assert_eq!(section, lines(&expected_section));
        // The EoF record sits after the aligned section
        assert_eq!(section.len(), 512 + ":00000001FF\n".len());
    }

    #[test]
    fn test_eof_placed_in_new_block_if_it_does_not_fit() {
        // Arrange
        let mut records = exact_block_records();
        records[9] = ":02F80000FDFF0A";
        records.push(":00000001FF");
        let hex = lines(&records);

        let mut expected = records[..13].to_vec();
        expected.insert(1, ":0400000A9901C0DEBA");
        expected.push(":0000000BF5");
        // Second block with only the EoF record
        expected.extend([
            ":020000041000EA",
            ":0400000A9901C0DEBA",
            ":0000000BF5",
            ":00000001FF",
        ]);

        // Act
        let result = hex_to_custom_format_blocks(&hex, 0x9901).unwrap();

        // Assert
        assert_eq!(result, lines(&expected));
    }

    #[test]
    fn test_blocks_ext_lin_address_records() {
        // Arrange
        let records = ela_hex_records();
        let hex = lines(&records);

        // First block starts at Extended Linear Address 0
        let mut expected = vec![":020000040000FA", ":0400000A9901C0DEBA"];
        expected.extend(&records[..11]);
        expected.push(":0400000BFFFFFFFFF5");
        // Second block opens with the address record found inside the first one
        expected.extend([":020000040002F8", ":0400000A9901C0DEBA"]);
        expected.extend(&records[11..22]);
        expected.push(":0000000BF5");
        // Third block opens with its first record, not repeated
        expected.extend([":020000040003F7", ":0400000A9901C0DEBA"]);
        expected.extend(&records[23..27]);
        expected.extend([":0000000BF5", ":00000001FF"]);

        // Act
        let result = hex_to_custom_format_blocks(&hex, 0x9901).unwrap();

        // Assert
        assert_eq!(result, lines(&expected));
    }

    #[test]
    fn test_section_ext_lin_address_records() {
        // Arrange
        let records = ela_hex_records();
        let hex = lines(&records);

        let mut expected = vec![":020000040000FA", ":0400000A9901C0DEBA"];
        expected.extend(&records[..27]);
        expected.extend([PAD_16; 8]);
        expected.extend([":0C00000BFFFFFFFFFFFFFFFFFFFFFFFFF5", ":00000001FF"]);

        // Act
        let result = hex_to_custom_format_section(&hex, 0x9901).unwrap();

        // Assert
        assert_eq!(result, lines(&expected));
        assert_eq!((result.len() - ":00000001FF\n".len()) % BLOCK_SIZE, 0);
    }

    #[test]
    fn test_ext_segment_address_records_converted() {
        // Arrange
        let hex = lines(&[
            ":020000021000EC",
            ":10000000C0070000D1060000D1000000B1060000CA",
            ":020000022000DC",
            ":10000000C0070000D1060000D1000000B1060000CA",
            ":00000001FF",
        ]);

        // Act
        let blocks = hex_to_custom_format_blocks(&hex, 0x9900).unwrap();
        let section = hex_to_custom_format_section(&hex, 0x9900).unwrap();

        // Assert
        for result in [blocks, section] {
            let records = hex_to_records(&result);
            assert_eq!(records[0], ":020000040001F9");
            assert_eq!(records[1], ":0400000A9900C0DEBB");
            assert_eq!(records[3], ":020000040002F8");
            assert!(!result.contains(":02000002"));
        }
    }

    #[test]
    fn test_invalid_ext_segment_address_record() {
        let hex = lines(&[":0200000270018C", ":00000001FF"]);
        for result in [
            hex_to_custom_format_blocks(&hex, 0x9903),
            hex_to_custom_format_section(&hex, 0x9903),
        ] {
            let err = result.unwrap_err();
            assert!(
                err.to_string()
                    .contains("Invalid Extended Segment Address record")
            );
        }
    }

    #[test]
    fn test_section_keeps_start_address_records() {
        // Arrange
        let hex = lines(&[
            ":020000040000FA",
            ":10000000C0070000D1060000D1000000B1060000CA",
            ":0400000500018E6107",
            ":00000001FF",
        ]);

        // Act
        let section = hex_to_custom_format_section(&hex, 0x9900).unwrap();

        // Assert
        let records = hex_to_records(&section);
        assert_eq!(records[3], ":0400000500018E6107");
    }

    #[test]
    fn test_odd_padding_is_rounded_down() {
        // Arrange: a record with a trailing space leaves an odd number of characters
        let hex = ":020000040000FA\n:10F39000002070470E207047002803D00A490861FA \n";
        let mut expected = vec![
            ":020000040000FA",
            ":0400000A9900C0DEBB",
            ":10F39000002070470E207047002803D00A490861FA ",
        ];
        expected.extend([PAD_16; 9]);
        expected.push(":0B00000BFFFFFFFFFFFFFFFFFFFFFFF5");

        // Act
        let blocks = hex_to_custom_format_blocks(hex, 0x9900).unwrap();
        let section = hex_to_custom_format_section(hex, 0x9900).unwrap();

        // Assert
        assert_eq!(blocks, lines(&expected));
        assert_eq!(blocks.len(), BLOCK_SIZE - 1);
        assert_eq!(section, blocks);
    }

    #[test]
    fn test_empty_hex_gives_empty_output() {
        assert_eq!(hex_to_custom_format_blocks("", 0x9903), Ok(String::new()));
        assert_eq!(hex_to_custom_format_section("", 0x9903), Ok(String::new()));
        assert_eq!(
            hex_to_custom_format_section("\r\n\n", 0x9903),
            Ok(String::new())
        );
    }

    #[test]
    fn test_eof_not_last() {
        // Arrange
        let hex = lines(&[
            ":020000040000FA",
            ":10000000C0070000D1060000D1000000B1060000CA",
            ":00000001FF",
            ":10001000C0070000D1060000D1000000B1060000BA",
        ]);
        let expected = UniversalHexError::ConversionError(UniversalHexErrorKind::EndOfFileNotLast {
            index: 3,
            total: 4,
            board_id: 0x9903,
        });

        // Act & Assert
        assert_eq!(hex_to_custom_format_blocks(&hex, 0x9903), Err(expected.clone()));
        assert_eq!(hex_to_custom_format_section(&hex, 0x9903), Err(expected));
    }

    #[test]
    fn test_makecode_v1_hex_rejected() {
        // Arrange: project metadata as Other Data records after the EoF
        let hex = lines(&[
            ":020000040000FA",
            ":10000000C0070000D1060000D1000000B1060000CA",
            ":00000001FF",
            ":1002800EE4EA519366D2B52AA5EE1DBDD0414C5578",
        ]);

        // Act
        let err = hex_to_custom_format_section(&hex, 0x9900).unwrap_err();

        // Assert
        assert_eq!(
            err,
            UniversalHexError::ConversionError(UniversalHexErrorKind::MakeCodeForV1Hex(0x9900))
        );
        assert!(err.to_string().contains("is from MakeCode"));
        assert!(hex_to_custom_format_blocks(&hex, 0x9900)
            .unwrap_err()
            .to_string()
            .contains("is from MakeCode"));
    }

    #[test]
    fn test_already_universal_hex_rejected() {
        // Arrange
        let universal = hex_to_custom_format_section(
            &format!("{}:00000001FF\n", small_hex()),
            0x9903,
        )
        .unwrap();

        // Act
        let err = hex_to_custom_format_blocks(&universal, 0x9900).unwrap_err();

        // Assert
        assert_eq!(
            err,
            UniversalHexError::ConversionError(UniversalHexErrorKind::AlreadyUniversalHex(0x9900))
        );
        assert_eq!(err.category(), ErrorCategory::Structural);
        assert!(hex_to_custom_format_section(&universal, 0x9900).is_err());
    }

    #[test]
    fn test_is_makecode_for_v1_hex() {
        let ram_before_eof = lines(&[
            ":020000040000FA",
            ":10000000C0070000D1060000D1000000B1060000CA",
            ":020000042000DA",
            ":10000000C0070000D1060000D1000000B1060000CA",
            ":00000001FF",
        ]);
        let ram_after_eof = lines(&[
            ":020000040000FA",
            ":10000000C0070000D1060000D1000000B1060000CA",
            ":00000001FF",
            ":020000042000DA",
            ":10000000C0070000D1060000D1000000B1060000CA",
        ]);
        let other_data = lines(&[
            ":020000040000FA",
            ":00000001FF",
            ":1002800EE4EA519366D2B52AA5EE1DBDD0414C5578",
        ]);
        assert!(is_makecode_for_v1_hex(&ram_before_eof));
        assert!(is_makecode_for_v1_hex(&ram_after_eof));
        assert!(is_makecode_for_v1_hex(&other_data));
        assert!(!is_makecode_for_v1_hex(&small_hex()));
        assert!(!is_makecode_for_v1_hex(&format!("{}:00000001FF\n", small_hex())));
        assert!(!is_makecode_for_v1_hex(""));
    }

    #[test]
    fn test_create_universal_hex_empty() {
        assert_eq!(
            create_universal_hex(&[], PackingFormat::Sections),
            Ok(String::new())
        );
        assert_eq!(
            create_universal_hex(&[], PackingFormat::Blocks),
            Ok(String::new())
        );
    }

    #[test]
    fn test_create_universal_hex_single_eof() {
        // Arrange
        let hex = format!("{}:00000001FF\n", small_hex());
        let hexes = [
            IndividualHex::new(hex.clone(), MicrobitBoardId::V1),
            IndividualHex::new(hex.clone(), MicrobitBoardId::V2),
        ];

        for format in [PackingFormat::Sections, PackingFormat::Blocks] {
            // Act
            let universal = create_universal_hex(&hexes, format).unwrap();

            // Assert
            assert!(is_universal_hex(&universal));
            assert_eq!(universal.matches(":00000001FF").count(), 1);
            assert!(universal.ends_with(":00000001FF\n"));
            let v1_part = hex_to_custom_format_section(&hex, 0x9900).unwrap();
            if format == PackingFormat::Sections {
                assert!(universal.starts_with(v1_part.trim_end_matches(":00000001FF\n")));
            }
        }
    }

    #[test]
    fn test_create_universal_hex_appends_missing_eof() {
        // Arrange
        let hexes = [IndividualHex::new(small_hex(), 0x9903_u32)];

        // Act
        let universal = create_universal_hex(&hexes, PackingFormat::Sections).unwrap();

        // Assert
        let section = hex_to_custom_format_section(&small_hex(), 0x9903).unwrap();
        assert_eq!(universal, format!("{section}:00000001FF\n"));
    }

    #[test]
    fn test_is_universal_hex() {
        // Arrange
        let records = [
            ":020000040000FA",
            ":0400000A9900C0DEBB",
            ":1000000000400020218E01005D8E01005F8E010006",
            ":1000100000000000000000000000000000000000E0",
            ":0C00000BFFFFFFFFFFFFFFFFFFFFFFFFF5",
            ":00000001FF",
        ];
        let unix = lines(&records);
        let windows = unix.replace('\n', "\r\n");

        // Act & Assert
        assert!(is_universal_hex(&unix));
        assert!(is_universal_hex(&windows));
        assert!(!is_universal_hex(""));
        assert!(!is_universal_hex(&small_hex()));
        assert!(!is_universal_hex("This is just a random string"));
        assert!(!is_universal_hex(
            ":02000004\nThis is just a random string, nor a record."
        ));
    }

    #[test]
    fn test_is_universal_hex_records() {
        assert!(!is_universal_hex_records::<&str>(&[]));
        assert!(!is_universal_hex_records(&[":020000040000FA"]));
        assert!(is_universal_hex_records(&[
            ":020000040000FA",
            ":0400000A9900C0DEBB",
            ":00000001FF",
        ]));
        assert!(!is_universal_hex_records(&[
            ":020000040000FA",
            ":0400000A9900C0DEBB",
        ]));
        assert!(!is_universal_hex_records(&[
            ":020000040000FA",
            ":00000001FF",
        ]));
    }

    #[test]
    fn test_separate_empty() {
        let err = separate_universal_hex("").unwrap_err();
        assert_eq!(
            err,
            UniversalHexError::ConversionError(UniversalHexErrorKind::EmptyUniversalHex)
        );
        assert_eq!(err.category(), ErrorCategory::Structural);
        assert!(err.to_string().contains("Empty"));
    }

    #[test]
    fn test_separate_normal_hex() {
        let hex = lines(&[
            ":020000040000FA",
            ":10558000002EEDD1E9E70020EAE7C0464302F0B57E",
            ":1055900042005D0AC30F4802440A4800120E000E82",
            ":00000001FF",
        ]);
        let err = separate_universal_hex(&hex).unwrap_err();
        assert!(err.to_string().contains("format invalid"));
    }

    #[test]
    fn test_separate_malformed_block_start() {
        for block_start in [":0400000A9901BA", ":0300000A9901C099"] {
            // Arrange
            let universal = lines(&[
                ":020000040003F7",
                block_start,
                ":1056C0009946F600ED042E437F3F434642465D0275",
                ":0000000BF5",
                ":00000001FF",
            ]);

            // Act
            let err = separate_universal_hex(&universal).unwrap_err();

            // Assert
            assert_eq!(err.category(), ErrorCategory::Format);
            assert!(
                err.to_string()
                    .contains(&format!("Block Start record invalid: {block_start}"))
            );
        }
    }

    #[test]
    fn test_separate_ensures_eof_records() {
        // Arrange
        let first_block = lines(&[
            ":020000040002F8",
            ":0400000A9901C0DEBA",
            ":105620004802120E450A240EC90FFF2A17D0FF2C7C",
            ":1056300019D0002A0BD170427041002C17D00028DD",
            ":06F80000FDFFFFFFFFFF0A",
            ":0000000BF5",
        ]);
        let first_hex = lines(&[
            ":020000040002F8",
            ":105620004802120E450A240EC90FFF2A17D0FF2C7C",
            ":1056300019D0002A0BD170427041002C17D00028DD",
            ":06F80000FDFFFFFFFFFF0A",
            ":00000001FF",
        ]);
        let second_block = lines(&[
            ":020000040003F7",
            ":0400000A9903C0DEB8",
            ":1056C00D9946F600ED042E437F3F434642465D0268",
            ":1056D000D20F5B006D0A1B0E904640D0FF2B39D0D5",
            ":0000000BF5",
            ":00000001FF",
        ]);
        let second_hex = lines(&[
            ":020000040003F7",
            ":1056C0009946F600ED042E437F3F434642465D0275",
            ":1056D000D20F5B006D0A1B0E904640D0FF2B39D0D5",
            ":00000001FF",
        ]);

        // Act
        let result = separate_universal_hex(&(first_block + &second_block)).unwrap();

        // Assert
        assert_eq!(
            result,
            vec![
                IndividualHex::new(first_hex, 0x9901u32),
                IndividualHex::new(second_hex, 0x9903u32),
            ]
        );
    }

    #[test]
    fn test_separate_keeps_first_seen_board_order() {
        // Arrange
        let hex_a = lines(&[
            ":020000040000FA",
            ":10000000C0070000D1060000D1000000B1060000CA",
            ":00000001FF",
        ]);
        let universal = create_universal_hex(
            &[
                IndividualHex::new(hex_a.clone(), 0x9906u32),
                IndividualHex::new(hex_a.clone(), 0x0001u32),
                IndividualHex::new(hex_a.clone(), 0x9900u32),
            ],
            PackingFormat::Blocks,
        )
        .unwrap();

        // Act
        let result = separate_universal_hex(&universal).unwrap();

        // Assert
        let board_ids: Vec<u32> = result.iter().map(|ih| ih.board_id).collect();
        assert_eq!(board_ids, vec![0x9906, 0x0001, 0x9900]);
        assert!(result.iter().all(|ih| ih.hex == hex_a));
    }

    #[test]
    fn test_loopback_blocks() {
        // Arrange
        let hex = ela_hex();
        let universal = hex_to_custom_format_blocks(&hex, 0x9901).unwrap();

        // Act
        let result = separate_universal_hex(&universal).unwrap();

        // Assert
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].hex, hex);
    }

    #[test]
    fn test_loopback_inserts_missing_ext_lin_address() {
        // Arrange
        let hex = lines(&ela_hex_records()[..9]);

        for format in [PackingFormat::Sections, PackingFormat::Blocks] {
            let universal = create_universal_hex(
                &[
                    IndividualHex::new(hex.clone(), 1u32),
                    IndividualHex::new(hex.clone(), 2u32),
                ],
                format,
            )
            .unwrap();

            // Act
            let result = separate_universal_hex(&universal).unwrap();

            // Assert
            let expected = format!(":020000040000FA\n{hex}:00000001FF\n");
            assert_eq!(result[0], IndividualHex::new(expected.clone(), 1u32));
            assert_eq!(result[1], IndividualHex::new(expected, 2u32));
        }
    }

    #[test]
    fn test_builder_defaults() {
        let builder = UniversalHexBuilder::new();
        assert_eq!(builder.format(), PackingFormat::Sections);
        assert_eq!(builder.boundary_size(), BLOCK_SIZE);
        assert!(builder.hexes().is_empty());
        assert_eq!(builder.build(), Ok(String::new()));
        assert_eq!(builder, UniversalHexBuilder::default());
    }

    #[test]
    fn test_builder_matches_create_universal_hex() {
        // Arrange
        let hex = lines(&ela_hex_records());
        let hexes = [
            IndividualHex::new(hex.clone(), MicrobitBoardId::V1),
            IndividualHex::new(hex.clone(), MicrobitBoardId::V2),
        ];

        for format in [PackingFormat::Sections, PackingFormat::Blocks] {
            // Act
            let built = UniversalHexBuilder::new()
                .add_hex(hex.clone(), MicrobitBoardId::V1)
                .add_hex(hex.clone(), MicrobitBoardId::V2)
                .set_format(format)
                .build();

            // Assert
            assert_eq!(built, create_universal_hex(&hexes, format));
        }
    }

    #[test]
    fn test_builder_boundary_size() {
        // Arrange
        let hex = ela_hex();
        let mut builder = UniversalHexBuilder::new();
        builder.add_hex(hex.clone(), 0x9903u32);
        builder.set_boundary_size(1024).unwrap();

        // Act
        let universal = builder.build().unwrap();

        // Assert
        let eof_len = ":00000001FF\n".len();
        assert_eq!((universal.len() - eof_len) % 1024, 0);
        let hexes = separate_universal_hex(&universal).unwrap();
        assert_eq!(hexes[0].hex, hex);

        // Blocks are aligned one by one
        builder.set_format(PackingFormat::Blocks);
        builder.set_boundary_size(MIN_BOUNDARY_SIZE).unwrap();
        let universal = builder.build().unwrap();
        let records = hex_to_records(&universal);
        let block_starts = records
            .iter()
            .filter(|r| r.starts_with(BLOCK_START_RECORD_BEGINNING))
            .count();
        assert!(block_starts > 10);
        assert_eq!(separate_universal_hex(&universal).unwrap()[0].hex, hex);
    }

    #[test]
    fn test_builder_invalid_boundary_size() {
        let mut builder = UniversalHexBuilder::new();
        for size in [0, 2, MIN_BOUNDARY_SIZE - 2, 513] {
            let err = builder.set_boundary_size(size).unwrap_err();
            assert_eq!(
                err,
                UniversalHexError::ConversionError(UniversalHexErrorKind::InvalidBoundarySize {
                    size,
                    min: MIN_BOUNDARY_SIZE,
                })
            );
            assert_eq!(err.category(), ErrorCategory::Range);
        }
        assert_eq!(builder.boundary_size(), BLOCK_SIZE);
    }

    #[test]
    fn test_microbit_board_ids() {
        assert_eq!(u32::from(MicrobitBoardId::V1), 0x9900);
        assert_eq!(u32::from(MicrobitBoardId::V2), 0x9903);
        assert!(V1_BOARD_IDS.contains(&u32::from(MicrobitBoardId::V1)));
        assert!(V2_BOARD_IDS.contains(&u32::from(MicrobitBoardId::V2)));
    }
}
