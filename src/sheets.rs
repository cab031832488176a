use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::error::{LeadError, Result};
use crate::importer::{self, LoadResult, ParsedTable, ShortRowPolicy};
use crate::models::Dataset;

pub const DEFAULT_SPREADSHEET_ID: &str = "1Q-5OdrksGEg7rmxj-uxK_kcbREivBx8udFIf41R3rmA";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const CHUNK_SIZE: usize = 16 * 1024;

/// Headers the form has used over time, mapped to the current name.
const HEADER_RENAMES: &[(&str, &str)] = &[("希望家賃(管理費込)", "希望家賃上限（管理費込）")];

/// Shared flag checked between body chunks; setting it aborts the fetch.
///
/// Meant for embedders that run `fetch_sheet` on a worker thread. The CLI
/// passes a fresh token and never cancels it; there the request timeout bounds
/// the fetch and Ctrl-C ends the process.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn export_url(spreadsheet_id: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{spreadsheet_id}/export?format=csv")
}

/// Parse the exported sheet. Short rows are dropped with a warning.
pub fn parse_sheet_text(text: &str) -> Result<ParsedTable> {
    let lines = text.lines().filter(|l| !l.trim().is_empty()).count();
    if lines < 2 {
        return Err(LeadError::NoData);
    }
    let mut table = match importer::parse_table(text, ShortRowPolicy::Skip) {
        Err(LeadError::NoDataRows | LeadError::MissingHeaders | LeadError::EmptyFile) => {
            return Err(LeadError::NoData)
        }
        other => other?,
    };
    for header in &mut table.headers {
        if let Some((_, renamed)) = HEADER_RENAMES.iter().find(|(old, _)| *old == header.as_str()) {
            tracing::debug!(from = %header, to = *renamed, "renamed header");
            *header = renamed.to_string();
        }
    }
    Ok(table)
}

fn read_body(mut body: impl Read, cancel: &CancelToken) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        if cancel.is_cancelled() {
            return Err(LeadError::Cancelled);
        }
        let n = body.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..n]);
    }
    Ok(data)
}

/// Download the spreadsheet's CSV export and build a dataset from it.
pub fn fetch_sheet(spreadsheet_id: &str, cancel: &CancelToken) -> Result<LoadResult> {
    let url = export_url(spreadsheet_id);
    tracing::info!(%url, "fetching spreadsheet");

    let client = reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()?;
    if cancel.is_cancelled() {
        return Err(LeadError::Cancelled);
    }
    let resp = client.get(&url).send()?;
    let status = resp.status();
    if !status.is_success() {
        return Err(LeadError::Fetch(status.as_u16()));
    }

    let bytes = read_body(resp, cancel)?;
    let text = String::from_utf8_lossy(&bytes);
    let table = parse_sheet_text(text.trim_start_matches('\u{feff}'))?;
    tracing::info!(
        rows = table.rows.len(),
        skipped = table.warnings.len(),
        "spreadsheet loaded"
    );

    Ok(LoadResult {
        dataset: Dataset {
            headers: table.headers,
            rows: table.rows,
            source: format!("Google Sheets ({spreadsheet_id})"),
            ingested_at: Utc::now(),
            checksum: Some(importer::compute_checksum(&bytes)),
        },
        warnings: table.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_url() {
        assert_eq!(
            export_url(DEFAULT_SPREADSHEET_ID),
            "https://docs.google.com/spreadsheets/d/1Q-5OdrksGEg7rmxj-uxK_kcbREivBx8udFIf41R3rmA/export?format=csv"
        );
    }

    #[test]
    fn test_parse_renames_legacy_rent_header() {
        let table = parse_sheet_text("日時,希望家賃(管理費込)\n2024-11-02,15万\n").unwrap();
        assert_eq!(table.headers, vec!["日時", "希望家賃上限（管理費込）"]);
    }

    #[test]
    fn test_parse_skips_short_rows() {
        let table = parse_sheet_text("a,b,c\n1,2,3\n4\n5,6,7\n").unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.warnings.len(), 1);
    }

    #[test]
    fn test_parse_needs_two_lines() {
        assert!(matches!(parse_sheet_text("a,b\n"), Err(LeadError::NoData)));
        assert!(matches!(parse_sheet_text(""), Err(LeadError::NoData)));
        assert!(matches!(parse_sheet_text("a,b,c\n1\n"), Err(LeadError::NoData)));
    }

    #[test]
    fn test_cancel_token_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_read_body_stops_when_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        let body: &[u8] = b"a,b\n1,2\n";
        assert!(matches!(read_body(body, &token), Err(LeadError::Cancelled)));
    }

    #[test]
    fn test_read_body_collects_all_chunks() {
        let token = CancelToken::new();
        let payload = vec![b'x'; CHUNK_SIZE * 2 + 10];
        let data = read_body(payload.as_slice(), &token).unwrap();
        assert_eq!(data.len(), payload.len());
    }
}
