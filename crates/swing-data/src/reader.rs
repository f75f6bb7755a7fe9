//! CSV session file discovery and loading.
//!
//! Each launch-monitor export is one session. Files are read into
//! [`RawRow`]s keyed by their original header text; mapping headers onto
//! shot fields is left to the normalizer.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use swing_core::error::{Result, SwingError};
use swing_core::normalize::RawRow;
use tracing::{debug, warn};

// ── Discovery ─────────────────────────────────────────────────────────────────

/// Find all `.csv` files directly under `data_path`, sorted by path.
pub fn find_csv_files(data_path: &Path) -> Vec<PathBuf> {
    if !data_path.exists() {
        warn!("Data path does not exist: {}", data_path.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_path)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Session id of a file: its stem.
pub fn session_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Human-readable label for a session file stem.
///
/// A stem with exactly one `__` separator is read as `<day>__<time>`: the day
/// is capitalized and the time has `_` replaced by `:` and is upper-cased, so
/// `saturday__05_46_pm` becomes `Saturday 05:46 PM`. Times of the form
/// `h_mm_am` are zero-padded. Any other stem is returned unchanged.
pub fn parse_session_label(stem: &str) -> String {
    static TIME_RE: OnceLock<Regex> = OnceLock::new();
    let time_re = TIME_RE.get_or_init(|| {
        Regex::new(r"(?i)^(\d{1,2})_(\d{2})_(am|pm)$").expect("regex is valid")
    });

    let parts: Vec<&str> = stem.split("__").collect();
    let [day, time] = parts.as_slice() else {
        return stem.to_string();
    };

    let mut chars = day.chars();
    let day: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    };
    let time = match time_re.captures(time) {
        Some(caps) => format!("{:0>2}:{} {}", &caps[1], &caps[2], caps[3].to_uppercase()),
        None => time.replace('_', ":").to_uppercase(),
    };
    format!("{} {}", day, time)
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Field delimiter for a header line: `;` when it outnumbers `,`.
pub fn detect_delimiter(header_line: &str) -> u8 {
    let semicolons = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// Read every data row of a session file.
///
/// The file is streamed, so [`SwingError::SessionTooLarge`] is raised as soon
/// as more than `max_records` rows are seen. Fails with
/// [`SwingError::MalformedSession`] when the file has no header row or is not
/// valid CSV.
pub fn read_session_rows(path: &Path, session_id: &str, max_records: usize) -> Result<Vec<RawRow>> {
    let file = File::open(path).map_err(|source| SwingError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_session_reader(BufReader::new(file), session_id, max_records)
}

/// Parse CSV bytes held in memory; see [`read_session_rows`].
pub fn parse_session_csv(content: &[u8], session_id: &str, max_records: usize) -> Result<Vec<RawRow>> {
    parse_session_reader(content, session_id, max_records)
}

/// Parse a CSV stream; see [`read_session_rows`].
///
/// Cells that are not valid UTF-8 are decoded as Latin-1, which is how
/// exports written by older Windows tools encode `°`.
pub fn parse_session_reader<R: BufRead>(
    mut reader: R,
    session_id: &str,
    max_records: usize,
) -> Result<Vec<RawRow>> {
    let malformed = |reason: String| SwingError::MalformedSession {
        session_id: session_id.to_string(),
        reason,
    };

    // Leading blank lines are dropped; the header line is fed back to csv.
    let mut header_line = Vec::new();
    loop {
        header_line.clear();
        if reader.read_until(b'\n', &mut header_line)? == 0 {
            return Err(malformed("file has no header row".to_string()));
        }
        if let Some(rest) = header_line.strip_prefix(UTF8_BOM) {
            header_line = rest.to_vec();
        }
        if !decode_cell(&header_line).trim().is_empty() {
            break;
        }
    }
    let delimiter = detect_delimiter(&decode_cell(&header_line));

    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(Cursor::new(header_line).chain(reader));

    let headers: Vec<String> = csv_reader
        .byte_headers()
        .map_err(|e| malformed(e.to_string()))?
        .iter()
        .map(decode_cell)
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(malformed("file has no header row".to_string()));
    }

    let mut rows = Vec::new();
    for (position, record) in csv_reader.byte_records().enumerate() {
        if position >= max_records {
            return Err(SwingError::SessionTooLarge {
                session_id: session_id.to_string(),
                limit: max_records,
            });
        }
        let record = record.map_err(|e| malformed(e.to_string()))?;
        let row = headers
            .iter()
            .zip(record.iter())
            .filter(|(header, _)| !header.is_empty())
            .fold(RawRow::new(position), |row, (header, value)| {
                row.with_cell(header.as_str(), decode_cell(value))
            });
        rows.push(row);
    }

    debug!(
        "Session {}: {} rows, delimiter {:?}",
        session_id,
        rows.len(),
        delimiter as char
    );
    Ok(rows)
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// UTF-8 when valid, Latin-1 otherwise.
fn decode_cell(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
