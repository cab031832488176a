use std::path::Path;

use chrono::Utc;
use encoding_rs::SHIFT_JIS;
use sha2::{Digest, Sha256};

use crate::error::{LeadError, Result};
use crate::models::{Dataset, Row, Scalar};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Share of U+FFFD above which a Shift-JIS decode is considered wrong.
const REPLACEMENT_TOLERANCE: f64 = 0.01;

/// Decode form exports: Shift-JIS first, UTF-8 when Shift-JIS clearly does not fit.
pub fn decode(bytes: &[u8]) -> String {
    let (text, encoding, had_errors) = SHIFT_JIS.decode(bytes);
    if encoding != SHIFT_JIS {
        // A byte-order mark picked the encoding.
        return text.into_owned();
    }

    let total = text.chars().count().max(1);
    let replaced = text.chars().filter(|c| *c == char::REPLACEMENT_CHARACTER).count();
    let ratio = replaced as f64 / total as f64;
    let valid_utf8 = std::str::from_utf8(bytes).is_ok();

    if ratio > REPLACEMENT_TOLERANCE || (had_errors && valid_utf8) {
        tracing::debug!(replaced, total, "falling back to UTF-8");
        let utf8 = String::from_utf8_lossy(bytes);
        return utf8.trim_start_matches('\u{feff}').to_string();
    }
    text.into_owned()
}

/// Make header names unique by suffixing repeats with ` (2)`, ` (3)`, ...
fn dedupe_headers(raw: Vec<String>) -> Vec<String> {
    let mut headers: Vec<String> = Vec::with_capacity(raw.len());
    for name in raw {
        if !headers.contains(&name) {
            headers.push(name);
            continue;
        }
        let mut n = 2;
        let unique = loop {
            let candidate = format!("{name} ({n})");
            if !headers.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        tracing::warn!(header = %name, renamed = %unique, "duplicate header renamed");
        headers.push(unique);
    }
    headers
}

// ---------------------------------------------------------------------------
// Table parsing
// ---------------------------------------------------------------------------

/// What to do with a row that has fewer fields than the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortRowPolicy {
    /// Fail the whole ingest (file upload).
    Reject,
    /// Drop the row and keep going (spreadsheet fetch).
    Skip,
}

pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    pub warnings: Vec<String>,
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(|f| f.is_empty())
}

pub fn parse_table(text: &str, policy: ShortRowPolicy) -> Result<ParsedTable> {
    if text.trim().is_empty() {
        return Err(LeadError::EmptyFile);
    }

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut records = rdr.records();
    let header_record = loop {
        match records.next() {
            Some(record) => {
                let record = record?;
                if !is_blank(&record) {
                    break record;
                }
            }
            None => return Err(LeadError::MissingHeaders),
        }
    };
    let headers = dedupe_headers(header_record.iter().map(str::to_string).collect());
    let width = headers.len();

    let mut rows = Vec::new();
    let mut warnings = Vec::new();
    for record in records {
        let record = record?;
        if is_blank(&record) {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.len() < width {
            match policy {
                ShortRowPolicy::Reject => {
                    return Err(LeadError::ShortRow {
                        line,
                        expected: width,
                        actual: record.len(),
                    })
                }
                ShortRowPolicy::Skip => {
                    let msg = format!(
                        "line {line}: skipped, {} fields for {width} columns",
                        record.len()
                    );
                    tracing::warn!("{msg}");
                    warnings.push(msg);
                    continue;
                }
            }
        }
        if record.len() > width {
            let msg = format!(
                "line {line}: {} fields for {width} columns, extra fields dropped",
                record.len()
            );
            tracing::warn!("{msg}");
            warnings.push(msg);
        }

        let cells = record.iter().take(width).map(Scalar::from_raw).collect();
        rows.push(Row::new(cells));
    }

    if rows.is_empty() {
        return Err(LeadError::NoDataRows);
    }

    Ok(ParsedTable {
        headers,
        rows,
        warnings,
    })
}

// ---------------------------------------------------------------------------
// load_file
// ---------------------------------------------------------------------------

pub struct LoadResult {
    pub dataset: Dataset,
    pub warnings: Vec<String>,
}

pub fn dataset_from_bytes(bytes: &[u8], source: &str, policy: ShortRowPolicy) -> Result<LoadResult> {
    if bytes.is_empty() {
        return Err(LeadError::EmptyFile);
    }
    let text = decode(bytes);
    let table = parse_table(&text, policy)?;
    tracing::info!(
        source,
        columns = table.headers.len(),
        rows = table.rows.len(),
        warnings = table.warnings.len(),
        "parsed table"
    );
    Ok(LoadResult {
        dataset: Dataset {
            headers: table.headers,
            rows: table.rows,
            source: source.to_string(),
            ingested_at: Utc::now(),
            checksum: Some(compute_checksum(bytes)),
        },
        warnings: table.warnings,
    })
}

pub fn load_file(file_path: &Path) -> Result<LoadResult> {
    let bytes = std::fs::read(file_path)?;
    let source = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.csv");
    dataset_from_bytes(&bytes, source, ShortRowPolicy::Reject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(text: &str) -> Result<ParsedTable> {
        parse_table(text, ShortRowPolicy::Reject)
    }

    #[test]
    fn test_decode_shift_jis() {
        let (bytes, _, _) = SHIFT_JIS.encode("日時,何を見て知った？\n2024-11-02,インスタ\n");
        let text = decode(&bytes);
        assert!(text.starts_with("日時,何を見て知った？"));
    }

    #[test]
    fn test_decode_utf8_with_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("日時,媒体\n".as_bytes());
        assert_eq!(decode(&bytes), "日時,媒体\n");
    }

    #[test]
    fn test_decode_utf8_without_bom() {
        let text = "タイムスタンプ,何を見て知った？,希望家賃上限（管理費込）\n2024-11-02,Instagram,~150,000円\n";
        assert_eq!(decode(text.as_bytes()), text);
    }

    #[test]
    fn test_decode_ascii_is_unchanged() {
        assert_eq!(decode(b"a,b\n1,2\n"), "a,b\n1,2\n");
    }

    #[test]
    fn test_parse_basic_and_trimmed() {
        let table = parse("name , value\n alice , 1 \n\nbob,2\n").unwrap();
        assert_eq!(table.headers, vec!["name", "value"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].text(0), "alice");
        assert_eq!(table.rows[0].text(1), "1");
    }

    #[test]
    fn test_parse_quotes_and_line_endings() {
        let table = parse("a,b\r\n\"x, y\",\"say \"\"hi\"\"\"\r\n\"multi\nline\",z\r").unwrap();
        assert_eq!(table.rows[0].text(0), "x, y");
        assert_eq!(table.rows[0].text(1), "say \"hi\"");
        assert_eq!(table.rows[1].text(0), "multi\nline");
    }

    #[test]
    fn test_parse_blank_cells_are_empty() {
        let table = parse("a,b\n1,\n").unwrap();
        assert_eq!(table.rows[0].get(1), &Scalar::Empty);
    }

    #[test]
    fn test_short_row_rejected_with_line() {
        let err = parse("a,b,c\n1,2,3\n4,5\n").err().unwrap();
        match err {
            LeadError::ShortRow { line, expected, actual } => {
                assert_eq!(line, 3);
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_short_row_skipped_for_fetch() {
        let table = parse_table("a,b,c\n1,2,3\n4,5\n", ShortRowPolicy::Skip).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.warnings.len(), 1);
    }

    #[test]
    fn test_long_row_truncated_with_warning() {
        let table = parse("a,b\n1,2,3\n").unwrap();
        assert_eq!(table.rows[0].len(), 2);
        assert_eq!(table.warnings.len(), 1);
    }

    #[test]
    fn test_header_only_and_empty() {
        assert!(matches!(parse("a,b\n"), Err(LeadError::NoDataRows)));
        assert!(matches!(parse("  \n\n"), Err(LeadError::EmptyFile)));
        assert!(matches!(
            dataset_from_bytes(b"", "x.csv", ShortRowPolicy::Reject),
            Err(LeadError::EmptyFile)
        ));
    }

    #[test]
    fn test_duplicate_headers_renamed() {
        let table = parse("a,a,b,a\n1,2,3,4\n").unwrap();
        assert_eq!(table.headers, vec!["a", "a (2)", "b", "a (3)"]);
    }

    #[test]
    fn test_load_file_sets_checksum_and_source() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"date,channel\n2024-11-02,Instagram\n").unwrap();
        let result = load_file(f.path()).unwrap();
        assert_eq!(result.dataset.rows.len(), 1);
        assert_eq!(result.dataset.checksum.as_deref().map(str::len), Some(64));
        assert!(!result.dataset.source.is_empty());
    }

    #[test]
    fn test_checksum_is_stable() {
        assert_eq!(compute_checksum(b"abc"), compute_checksum(b"abc"));
        assert_ne!(compute_checksum(b"abc"), compute_checksum(b"abd"));
    }
}
