//! Order export CSV parser with encoding and delimiter auto-detection.
//!
//! Turns raw bytes into [`SourceRow`]s. Values are kept verbatim as strings;
//! all interpretation happens later in the mapping rules.

use std::path::Path;

use tracing::{debug, warn};

use crate::error::{CsvError, CsvResult};
use crate::models::SourceRow;

/// Bytes sampled for charset detection
const DETECTION_SAMPLE: usize = 64 * 1024;

/// Candidate delimiters, in tie-break order
const DELIMITERS: [char; 4] = [',', ';', '\t', '|'];

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed source rows
    pub rows: Vec<SourceRow>,
    /// Detected encoding
    pub encoding: String,
    /// Detected or explicit delimiter
    pub delimiter: char,
    /// Column headers, trimmed
    pub headers: Vec<String>,
    /// Records the csv reader rejected
    pub skipped: usize,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let sample = &bytes[..bytes.len().min(DETECTION_SAMPLE)];
    let charset = chardet::detect(sample).0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" | "utf-8-sig" => "utf-8".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes with the given encoding label.
///
/// Unknown labels and invalid UTF-8 fall back to a lossy UTF-8 decode.
/// A leading byte order mark is removed.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).into_owned(),
        // WHATWG maps latin-1 onto windows-1252, a superset for printable bytes
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        label => match encoding_rs::Encoding::for_label(label.as_bytes()) {
            Some(encoding) => encoding.decode(bytes).0.into_owned(),
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    };

    match decoded.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => decoded,
    }
}

/// Detect the delimiter by counting occurrences in the header line.
///
/// Falls back to `,` when no candidate appears.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best = ',';
    let mut best_count = 0;
    for &candidate in &DELIMITERS {
        let count = first_line.matches(candidate).count();
        if count > best_count {
            best_count = count;
            best = candidate;
        }
    }

    best
}

/// Parse a CSV string into source rows with an explicit delimiter.
///
/// # Example
/// ```ignore
/// use order_migrate::parser::csv_to_rows;
///
/// let rows = csv_to_rows("IncrementId,Email\n100001,a@b.co", ',').unwrap();
/// assert_eq!(rows[0].get("Email"), "a@b.co");
/// ```
pub fn csv_to_rows(content: &str, delimiter: char) -> CsvResult<Vec<SourceRow>> {
    parse_string_with_metadata(content, delimiter, "utf-8".to_string()).map(|r| r.rows)
}

/// Parse a file, auto-detecting the encoding and, unless given, the delimiter.
pub fn parse_file<P: AsRef<Path>>(path: P, delimiter: Option<char>) -> CsvResult<ParseResult> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| CsvError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_bytes(&bytes, delimiter)
}

/// Parse raw bytes, auto-detecting the encoding and, unless given, the delimiter.
pub fn parse_bytes(bytes: &[u8], delimiter: Option<char>) -> CsvResult<ParseResult> {
    if bytes.is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));
    debug!(encoding = %encoding, delimiter = ?delimiter, "detected CSV format");

    parse_string_with_metadata(&content, delimiter, encoding)
}

/// Parse decoded CSV content and return rows with metadata.
pub fn parse_string_with_metadata(
    content: &str,
    delimiter: char,
    encoding: String,
) -> CsvResult<ParseResult> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }
    if !delimiter.is_ascii() {
        return Err(CsvError::InvalidDelimiter(delimiter));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut rows = Vec::new();
    let mut skipped = 0;

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                warn!(line, error = %e, "skipping unreadable record");
                skipped += 1;
                continue;
            }
        };

        // whitespace-only line
        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }

        let row: SourceRow = headers
            .iter()
            .zip(record.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, value)| (header.as_str(), value))
            .collect();
        rows.push(row);
    }

    Ok(ParseResult {
        rows,
        encoding,
        delimiter,
        headers,
        skipped,
    })
}
