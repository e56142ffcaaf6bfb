//! Constants for the download module (timeouts, file naming).

/// Default per-attempt request timeout (120 seconds, PDFs can be large).
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// HTTP connect timeout (30 seconds), capped by the request timeout.
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of characters kept from a sanitized title.
pub const MAX_FILENAME_CHARS: usize = 200;

/// Maximum byte length of a sanitized title, leaving room for `.pdf` and
/// the in-progress suffix under a 255-byte name limit.
pub const MAX_FILENAME_BYTES: usize = 240;

/// Placeholder for characters that are unsafe in file names.
pub const FILENAME_PLACEHOLDER: char = '_';

/// Prefix of the in-progress files a download streams into.
pub const PARTIAL_PREFIX: &str = ".papercrawl-";

/// Suffix of the in-progress files a download streams into.
pub const PARTIAL_SUFFIX: &str = ".part";
