//! # `universalhexlib`
//!
//! `universalhexlib` is a Rust library for building and parsing Intel HEX records, and for
//! combining several Intel HEX files into a single Universal Hex (and back).
//!
//! The library provides:
//! - Record codec for standard and Universal Hex custom records (via [`Record`] struct and
//!   the [`record`] module functions).
//! - Universal Hex creation ([`create_universal_hex`], [`UniversalHexBuilder`]) and
//!   separation ([`separate_universal_hex`]).
//! - Error handling with [`UniversalHexError`].
//!
//! ## Example
//!
//! ```
//! use universalhexlib::{IndividualHex, MicrobitBoardId, PackingFormat};
//! use universalhexlib::{create_universal_hex, separate_universal_hex};
//!
//! let v1_hex = ":020000040000FA\n:0400000000000000FC\n:00000001FF\n";
//! let v2_hex = ":020000040001F9\n:0400000001020304F2\n:00000001FF\n";
//!
//! let universal = create_universal_hex(
//!     &[
//!         IndividualHex::new(v1_hex, MicrobitBoardId::V1),
//!         IndividualHex::new(v2_hex, MicrobitBoardId::V2),
//!     ],
//!     PackingFormat::Sections,
//! )
//! .unwrap();
//!
//! let hexes = separate_universal_hex(&universal).unwrap();
//! assert_eq!(hexes[0].hex, v1_hex);
//! assert_eq!(hexes[1].hex, v2_hex);
//! ```

mod error;
pub mod record;
mod universalhex;
pub mod utils;

// Public APIs
pub use error::{ErrorCategory, UniversalHexError, UniversalHexErrorKind};
pub use record::{Record, RecordType};
pub use universalhex::{
    BLOCK_SIZE, IndividualHex, MIN_BOUNDARY_SIZE, MicrobitBoardId, PackingFormat,
    UniversalHexBuilder, V1_BOARD_IDS, V2_BOARD_IDS, create_universal_hex,
    hex_to_custom_format_blocks, hex_to_custom_format_section, is_makecode_for_v1_hex,
    is_makecode_for_v1_hex_records, is_universal_hex, is_universal_hex_records,
    separate_universal_hex,
};
