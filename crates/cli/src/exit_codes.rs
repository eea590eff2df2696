//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                                  |
//! |---------|-----------|----------------------------------------------|
//! | 0       | Universal | Success                                      |
//! | 1       | Universal | General error (unspecified)                  |
//! | 2       | Universal | CLI usage error (bad args, missing file)     |
//! | 3-4     | Universal | Input file I/O and parse errors              |
//! | 30-39   | script    | Edit script replay codes                     |
//! | 40-49   | api       | Test case API: auth, save outcome, network   |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0-4)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Cannot read or write a local file (script, snapshot, schema, output).
pub const EXIT_IO: u8 = 3;

/// Local file is not valid JSON / TOML or has the wrong shape.
pub const EXIT_PARSE: u8 = 4;

// =============================================================================
// Script (30-39)
// =============================================================================

/// An edit script operation was rejected by the grid (validation failure,
/// clipboard mismatch, unknown record). Nothing from that op was applied.
pub const EXIT_SCRIPT_REJECTED: u8 = 30;

// =============================================================================
// API (40-49)
// =============================================================================

/// No saved token, or the server rejected it (401/403).
pub const EXIT_API_NOT_AUTH: u8 = 40;

/// Save finished with some records saved and some failed.
/// Failed records are listed on stderr (or in the JSON report).
pub const EXIT_SAVE_PARTIAL: u8 = 41;

/// Save finished with every record failed.
pub const EXIT_SAVE_FAILED: u8 = 42;

/// Network error or unexpected response while talking to the API.
pub const EXIT_API_NETWORK: u8 = 43;
