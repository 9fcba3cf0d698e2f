use crate::{replace_file, sibling_path};
use scout_core::{timestamp, AnalysisRecord, CoreError, ErrorExt, Finding, StorageError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A row of one of the result tables.
pub trait TableRow {
    const HEADERS: &'static [&'static str];

    fn to_record(&self) -> Vec<String>;
}

impl TableRow for Finding {
    const HEADERS: &'static [&'static str] = &[
        "ticker",
        "tweet_text",
        "tweet_id",
        "tweet_url",
        "created_at",
        "exchanges_mentioned",
        "likes",
        "retweets",
    ];

    fn to_record(&self) -> Vec<String> {
        vec![
            self.ticker.to_string(),
            self.text.clone(),
            self.post_id.clone(),
            self.permalink.clone(),
            timestamp::format(&self.created_at),
            self.exchanges_joined(),
            self.likes.to_string(),
            self.retweets.to_string(),
        ]
    }
}

impl TableRow for AnalysisRecord {
    const HEADERS: &'static [&'static str] = &[
        "ticker",
        "exchanges",
        "tweet_count",
        "analysis_time",
        "mention_count",
        "likely_new_listing",
        "sentiment_score",
        "key_points",
        "red_flags",
        "listing_status",
        "recommendation",
        "brief_summary",
    ];

    fn to_record(&self) -> Vec<String> {
        vec![
            self.ticker.to_string(),
            self.exchanges.clone(),
            self.tweet_count.to_string(),
            timestamp::format(&self.analysis_time),
            self.mention_count.to_string(),
            self.likely_new_listing
                .map(|value| value.to_string())
                .unwrap_or_default(),
            self.sentiment_score
                .map(|value| value.to_string())
                .unwrap_or_default(),
            self.key_points.clone(),
            self.red_flags.clone(),
            self.listing_status.clone(),
            self.recommendation.clone(),
            self.brief_summary.clone(),
        ]
    }
}

/// Headers plus rows, all as text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column(column)?;
        self.rows.get(row)?.get(index).map(String::as_str)
    }
}

/// Reads a table. An absent or blank file is an empty table.
pub async fn read_table(path: &Path) -> Result<Table, StorageError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Table::default()),
        Err(e) => {
            return Err(StorageError::ReadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        }
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Table::default());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes.as_slice());
    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(Table { headers, rows })
}

/// Concatenates `rows` under the existing rows of `existing`. Known columns
/// come first in their canonical order; columns only the existing table has
/// are kept after them and left blank for new rows.
pub fn merge_rows<R: TableRow>(existing: Table, rows: &[R]) -> Table {
    let mut headers: Vec<String> = R::HEADERS.iter().map(|h| h.to_string()).collect();
    for header in &existing.headers {
        if !headers.contains(header) {
            headers.push(header.clone());
        }
    }

    let positions: Vec<Option<usize>> = headers
        .iter()
        .map(|header| existing.column(header))
        .collect();

    let mut merged = Vec::with_capacity(existing.rows.len() + rows.len());
    for old in &existing.rows {
        merged.push(
            positions
                .iter()
                .map(|position| {
                    position
                        .and_then(|index| old.get(index).cloned())
                        .unwrap_or_default()
                })
                .collect(),
        );
    }
    for row in rows {
        let mut record = row.to_record();
        record.resize(headers.len(), String::new());
        merged.push(record);
    }

    Table {
        headers,
        rows: merged,
    }
}

fn encode(table: &Table, path: &Path) -> Result<Vec<u8>, StorageError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.into_inner().map_err(|e| StorageError::WriteFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Read-merge-write append. A table that cannot be parsed is moved aside to
/// `<name>.corrupt` and replaced; a file that cannot be read is an error.
pub async fn append_rows<R: TableRow>(path: &Path, rows: &[R]) -> Result<usize, CoreError> {
    let existing = match read_table(path).await {
        Ok(table) => table,
        Err(e @ StorageError::Csv(_)) => {
            CoreError::Storage(e).log_warn();
            let aside = sibling_path(path, ".corrupt");
            warn!(
                "Moving unreadable table {} to {}",
                path.display(),
                aside.display()
            );
            tokio::fs::rename(path, &aside).await?;
            Table::default()
        }
        Err(e) => return Err(e.into()),
    };

    let merged = merge_rows(existing, rows);
    let contents = encode(&merged, path)?;
    replace_file(path, &contents).await?;
    Ok(merged.rows.len())
}

/// The two result tables: findings and analyses.
#[derive(Debug, Clone)]
pub struct ResultSink {
    findings_path: PathBuf,
    analysis_path: PathBuf,
}

impl ResultSink {
    pub fn new(findings_path: impl Into<PathBuf>, analysis_path: impl Into<PathBuf>) -> Self {
        Self {
            findings_path: findings_path.into(),
            analysis_path: analysis_path.into(),
        }
    }

    pub fn findings_path(&self) -> &Path {
        &self.findings_path
    }

    pub fn analysis_path(&self) -> &Path {
        &self.analysis_path
    }

    pub async fn append_findings(&self, findings: &[Finding]) -> Result<(), CoreError> {
        if findings.is_empty() {
            return Ok(());
        }
        let total = append_rows(&self.findings_path, findings).await?;
        info!(
            "Saved {} new findings to {} ({} rows total)",
            findings.len(),
            self.findings_path.display(),
            total
        );
        Ok(())
    }

    pub async fn append_analyses(&self, records: &[AnalysisRecord]) -> Result<(), CoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let total = append_rows(&self.analysis_path, records).await?;
        info!(
            "Saved {} analyses to {} ({} rows total)",
            records.len(),
            self.analysis_path.display(),
            total
        );
        Ok(())
    }
}
