// 🔍 Subaccount Diff - runtimes whose subaccount is not registered in EDP
//
// Known set: EDP export (JSON array of objects with a `name` field).
// Candidates: KCP runtime listing, e.g.
//   ./kcp rt -o custom=Subaccount:subAccountID,InstanceID:instanceID,... > skr-subaccounts.txt
// First whitespace token of each line is the subaccount id.

use crate::error::AuditError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::{debug, info};

// ============================================================================
// KNOWN SUBACCOUNTS (EDP side)
// ============================================================================

#[derive(Debug, Deserialize)]
struct EdpDataTenant {
    name: String,
}

/// Subaccount ids registered in EDP. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct KnownSubaccounts {
    names: HashSet<String>,
}

impl KnownSubaccounts {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KnownSubaccounts {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Exact match, no normalization
    pub fn contains(&self, subaccount_id: &str) -> bool {
        self.names.contains(subaccount_id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Parse the EDP export from any reader
pub fn parse_known_subaccounts<R: std::io::Read>(reader: R) -> Result<KnownSubaccounts> {
    let tenants: Vec<EdpDataTenant> =
        serde_json::from_reader(reader).context("EDP export is not a JSON array of {name}")?;

    Ok(KnownSubaccounts::new(tenants.into_iter().map(|t| t.name)))
}

/// Load the EDP export from disk
pub fn load_known_subaccounts(path: &Path) -> Result<KnownSubaccounts> {
    if !path.exists() {
        return Err(AuditError::MissingFile {
            path: path.to_path_buf(),
        }
        .into());
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    let known = parse_known_subaccounts(BufReader::new(file))
        .with_context(|| format!("Failed to parse JSON from {}", path.display()))?;

    debug!(count = known.len(), path = %path.display(), "loaded EDP subaccounts");
    Ok(known)
}

// ============================================================================
// DIFF
// ============================================================================

/// Candidate lines whose subaccount is unknown, in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubaccountDiff {
    pub missing_lines: Vec<String>,
    pub missing_ids: Vec<String>,
}

impl SubaccountDiff {
    /// Always equals `missing_lines.len()`
    pub fn count(&self) -> usize {
        self.missing_lines.len()
    }

    /// `'a', 'b'` - ready to paste into a follow-up SQL `in (...)`
    pub fn joined_ids(&self) -> String {
        self.missing_ids
            .iter()
            .map(|id| format!("'{}'", id))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Missing lines, then count, then joined ids
    pub fn render<W: Write>(&self, out: &mut W) -> Result<()> {
        for line in &self.missing_lines {
            writeln!(out, "{}", line)?;
        }
        writeln!(out, "{}", self.count())?;
        writeln!(out, "{}", self.joined_ids())?;
        Ok(())
    }
}

/// Leading whitespace-delimited token
fn leading_identifier(line: &str) -> &str {
    line.split_whitespace().next().unwrap_or("")
}

/// Stream candidate lines and collect those not in `known`
///
/// Duplicates are kept: every occurrence is listed and counted.
pub fn diff_candidates<R: BufRead>(known: &KnownSubaccounts, candidates: R) -> Result<SubaccountDiff> {
    let mut diff = SubaccountDiff::default();

    for (index, line) in candidates.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read candidate line {}", index + 1))?;
        let line = line.trim();
        let subaccount_id = leading_identifier(line);

        if !known.contains(subaccount_id) {
            diff.missing_lines.push(line.to_string());
            diff.missing_ids.push(subaccount_id.to_string());
        }
    }

    Ok(diff)
}

/// Load both sources, diff them, and print the result
pub fn run_subaccount_diff<W: Write>(
    edp_path: &Path,
    candidates_path: &Path,
    out: &mut W,
) -> Result<SubaccountDiff> {
    let known = load_known_subaccounts(edp_path)?;

    if !candidates_path.exists() {
        return Err(AuditError::MissingFile {
            path: candidates_path.to_path_buf(),
        }
        .into());
    }
    let file = File::open(candidates_path)
        .with_context(|| format!("Failed to open file: {}", candidates_path.display()))?;

    let diff = diff_candidates(&known, BufReader::new(file))?;
    diff.render(out)?;

    info!(
        known = known.len(),
        missing = diff.count(),
        "subaccount diff complete"
    );

    Ok(diff)
}

// ============================================================================
// TESTS
// ============================================================================
