use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use universalhexlib::{
    IndividualHex, MicrobitBoardId, PackingFormat, UniversalHexBuilder, V1_BOARD_IDS,
    V2_BOARD_IDS, is_makecode_for_v1_hex, is_universal_hex, separate_universal_hex,
};

const DEFAULT_UNIVERSAL_PATH: &str = "universal.hex";
const DEFAULT_V1_PATH: &str = "v1-intel.hex";
const DEFAULT_V2_PATH: &str = "v2-intel.hex";

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");

    println!(" ------------------------------------------------------------------");
    println!("|  Universal Hex Utility  | v{version} - Copyright (c) 2026 Ihar Hlukhau |");
    println!(" ------------------------------------------------------------------");
    println!("\nUsage:");
    println!("  uhexcli info <input>");
    println!("  uhexcli combine --v1 <input> --v2 <input> [options]");
    println!("  uhexcli split --universal <input> [options]");
    println!("\nOptions:");
    println!("  --universal <path>   Universal Hex output for combine (default: {DEFAULT_UNIVERSAL_PATH})");
    println!("  --v1 <path>          micro:bit V1 hex output for split (default: {DEFAULT_V1_PATH})");
    println!("  --v2 <path>          micro:bit V2 hex output for split (default: {DEFAULT_V2_PATH})");
    println!("  --blocks             Use the 512-byte blocks format instead of sections");
    println!("  --overwrite          Replace output files that already exist");
    println!("\nExamples:");
    println!("  uhexcli info universal.hex");
    println!("  uhexcli combine --v1 microbit-v1.hex --v2 microbit-v2.hex");
    println!("  uhexcli combine --v1 v1.hex --v2 v2.hex --universal out.hex --blocks --overwrite");
    println!("  uhexcli split --universal universal.hex --v1 v1.hex --v2 v2.hex");
}

fn main() {
    let args: Vec<String> = env::args().collect();

    println!();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = &args[1];

    // Dispatch and immediately handle results
    if let Err(e) = run_dispatch(command, &args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_dispatch(cmd: &str, args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        "help" | "-h" | "--help" => {
            print_usage();
            Ok(())
        }
        "info" => {
            // Guard: Check args count
            let path_str = args.get(2).ok_or("Missing input file path")?;

            // Guard: File must exist
            let abs_path =
                validate_exists(path_str).map_err(|_| format!("File not found: {path_str}"))?;

            run_info(&abs_path)
        }
        "combine" => {
            // Guard: Check both input hexes given and exist
            let v1_str = get_flag_value(args, "--v1").ok_or("Missing '--v1' input hex path")?;
            let v2_str = get_flag_value(args, "--v2").ok_or("Missing '--v2' input hex path")?;
            let v1_path = validate_exists(&v1_str)?;
            let v2_path = validate_exists(&v2_str)?;

            // Guard: Do not replace an existing output unless asked to
            let out_path = PathBuf::from(
                get_flag_value(args, "--universal")
                    .unwrap_or_else(|| DEFAULT_UNIVERSAL_PATH.to_string()),
            );
            let overwrite = has_flag(args, "--overwrite");
            validate_writable(&out_path, overwrite)?;

            let format = if has_flag(args, "--blocks") {
                PackingFormat::Blocks
            } else {
                PackingFormat::Sections
            };

            run_combine(&v1_path, &v2_path, &out_path, format)
        }
        "split" => {
            // Guard: Check input Universal Hex given and exists
            let in_str = get_flag_value(args, "--universal")
                .ok_or("Missing '--universal' input hex path")?;
            let in_path = validate_exists(&in_str)?;

            // Guard: Do not replace existing outputs unless asked to
            let v1_path = PathBuf::from(
                get_flag_value(args, "--v1").unwrap_or_else(|| DEFAULT_V1_PATH.to_string()),
            );
            let v2_path = PathBuf::from(
                get_flag_value(args, "--v2").unwrap_or_else(|| DEFAULT_V2_PATH.to_string()),
            );
            let overwrite = has_flag(args, "--overwrite");
            validate_writable(&v1_path, overwrite)?;
            validate_writable(&v2_path, overwrite)?;

            run_split(&in_path, &v1_path, &v2_path)
        }
        _ => {
            print_usage();
            process::exit(1);
        }
    }
}

fn run_info(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let hex = fs::read_to_string(path)?;

    println!("File Path:      {}", path.display());
    println!("File Size:      {} bytes", hex.len());

    if is_universal_hex(&hex) {
        let hexes = separate_universal_hex(&hex)?;
        let board_ids = hexes
            .iter()
            .map(|ih| format!("0x{:04X}", ih.board_id))
            .collect::<Vec<_>>()
            .join(", ");
        println!("Universal Hex:  yes");
        println!("Board IDs:      {board_ids}");
    } else {
        println!("Universal Hex:  no");
        if is_makecode_for_v1_hex(&hex) {
            println!("MakeCode V1:    yes");
        }
    }
    Ok(())
}

fn run_combine(
    v1_path: &PathBuf,
    v2_path: &PathBuf,
    out_path: &PathBuf,
    format: PackingFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let v1_hex = fs::read_to_string(v1_path)?;
    let v2_hex = fs::read_to_string(v2_path)?;

    let universal = UniversalHexBuilder::new()
        .add_hex(v1_hex, MicrobitBoardId::V1)
        .add_hex(v2_hex, MicrobitBoardId::V2)
        .set_format(format)
        .build()?;
    fs::write(out_path, universal)?;

    // Validate output file was written
    let out_abs_path = validate_exists(&out_path.to_string_lossy())?;

    println!(
        "Combined {} + {} -> {}",
        v1_path.display(),
        v2_path.display(),
        out_abs_path.display()
    );
    Ok(())
}

fn run_split(
    in_path: &PathBuf,
    v1_path: &PathBuf,
    v2_path: &PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let universal = fs::read_to_string(in_path)?;
    let hexes = separate_universal_hex(&universal)?;

    // Guard: Only micro:bit V1 + V2 Universal Hexes are supported
    if hexes.len() != 2 {
        return Err(format!(
            "Universal Hex should contain only two micro:bit targets (V1 and V2), found {}",
            hexes.len()
        )
        .into());
    }
    let v1 = find_board(&hexes, &V1_BOARD_IDS)
        .ok_or("Universal Hex does not contain a micro:bit V1 hex")?;
    let v2 = find_board(&hexes, &V2_BOARD_IDS)
        .ok_or("Universal Hex does not contain a micro:bit V2 hex")?;

    fs::write(v1_path, &v1.hex)?;
    fs::write(v2_path, &v2.hex)?;

    // Validate output files were written
    let v1_abs_path = validate_exists(&v1_path.to_string_lossy())?;
    let v2_abs_path = validate_exists(&v2_path.to_string_lossy())?;

    println!(
        "Split {} -> {} + {}",
        in_path.display(),
        v1_abs_path.display(),
        v2_abs_path.display()
    );
    Ok(())
}

// =============================== HELPER FUNCTIONS ===============================

/// Find the hex targeting any of the given Board IDs
fn find_board<'a>(hexes: &'a [IndividualHex], board_ids: &[u32]) -> Option<&'a IndividualHex> {
    hexes.iter().find(|ih| board_ids.contains(&ih.board_id))
}

/// Validate that a path exists and is a file. Returns absolute path.
fn validate_exists(path_str: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = PathBuf::from(path_str);
    if !path.exists() {
        return Err(format!("File not found: {path_str}").into());
    }
    if !path.is_file() {
        return Err(format!("Path is not a file: {path_str}").into());
    }
    // Return absolute path
    Ok(fs::canonicalize(path)?)
}

/// Validate that an output path can be written, i.e. it does not exist or can be replaced
fn validate_writable(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.is_dir() {
        return Err(format!("Output path is a directory: {}", path.display()).into());
    }
    if path.exists() && !overwrite {
        return Err(format!(
            "Output file already exists: {}. Use '--overwrite' to replace it",
            path.display()
        )
        .into());
    }
    Ok(())
}

/// Find the value after a specific flag (e.g., "--v1 microbit-v1.hex")
fn get_flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|pos| args.get(pos + 1))
        .filter(|value| !value.starts_with("--"))
        .cloned()
}

/// Check if a flag without value is present
fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| arg == flag)
}
