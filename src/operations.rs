// 🏗️ Operations Parser - provisioning history rows from the operations table
//
// Expected layout (no header required), produced by e.g.:
//   select id, type, state, instance_id, created_at, updated_at,
//          provisioning_parameters->'ers_context'->'subaccount_id',
//          provisioning_parameters->'ers_context'->'globalaccount_id'
//   from operations where type in ('provision','deprovision')
//   order by instance_id, created_at;

use crate::error::AuditError;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Fixed column count of an operations row
pub const OPERATION_COLUMNS: usize = 8;

// ============================================================================
// CORE TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    Provision,
    Deprovision,
    Other(String),
}

impl OperationType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "provision" => OperationType::Provision,
            "deprovision" => OperationType::Deprovision,
            other => OperationType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OperationType::Provision => "provision",
            OperationType::Deprovision => "deprovision",
            OperationType::Other(raw) => raw,
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of provisioning history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    pub operation_type: OperationType,
    pub state: String,
    pub instance_id: String,
    pub created_at: String,
    pub updated_at: String,
    /// Quotes stripped
    pub subaccount_id: String,
    /// Quotes stripped
    pub global_account_id: String,
    /// 1-based line in the source file
    pub line: u64,
}

impl Operation {
    /// Build from one record, validating the column count
    pub fn from_record(record: &csv::StringRecord, line: u64) -> Result<Self, AuditError> {
        if record.len() != OPERATION_COLUMNS {
            return Err(AuditError::InputFormat {
                line,
                reason: format!(
                    "expected {} columns, found {}",
                    OPERATION_COLUMNS,
                    record.len()
                ),
            });
        }

        let field = |i: usize| record.get(i).unwrap_or_default().to_string();

        let subaccount_id = strip_quotes(&field(6));
        if subaccount_id.is_empty() {
            return Err(AuditError::InputFormat {
                line,
                reason: "empty subaccount id".to_string(),
            });
        }

        Ok(Operation {
            id: field(0),
            operation_type: OperationType::parse(&field(1)),
            state: field(2),
            instance_id: field(3),
            created_at: field(4),
            updated_at: field(5),
            subaccount_id,
            global_account_id: strip_quotes(&field(7)),
            line,
        })
    }

    /// `updated_at` earlier than `created_at`, when both parse
    pub fn has_timestamp_anomaly(&self) -> bool {
        match (parse_timestamp(&self.created_at), parse_timestamp(&self.updated_at)) {
            (Some(created), Some(updated)) => updated < created,
            _ => false,
        }
    }
}

/// JSON-extracted columns arrive as `"value"`; strip the surrounding quotes
pub fn strip_quotes(raw: &str) -> String {
    raw.trim_matches('"').to_string()
}

/// Timestamps as exported by Postgres or as RFC 3339
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    // psql prints offsets as +00 / +0000 / +00:00
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

// ============================================================================
// LOADING
// ============================================================================

/// Parse every row; the first malformed row aborts with its line number
pub fn parse_operations<R: Read>(reader: R) -> Result<Vec<Operation>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut operations = Vec::new();

    for (index, result) in rdr.records().enumerate() {
        let fallback_line = index as u64 + 1;
        let record = result.with_context(|| format!("Failed to read operations row {}", fallback_line))?;
        let line = record
            .position()
            .map(|pos| pos.line())
            .unwrap_or(fallback_line);

        operations.push(Operation::from_record(&record, line)?);
    }

    Ok(operations)
}

/// Load the operations extract from disk
pub fn load_operations(path: &Path) -> Result<Vec<Operation>> {
    if !path.exists() {
        return Err(AuditError::MissingFile {
            path: path.to_path_buf(),
        }
        .into());
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    parse_operations(file).with_context(|| format!("Failed to parse {}", path.display()))
}

// ============================================================================
// TESTS
// ============================================================================
