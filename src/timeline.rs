// ⏰ Subaccount Timelines - operations grouped per subaccount, oldest first
//
// Each timeline stays sorted by created_at after every append.
// Printing collapses consecutive re-emissions of the same (instance, type)
// and reports which provisioned instances were never deprovisioned.

use crate::operations::{Operation, OperationType};
use anyhow::Result;
use indexmap::IndexMap;
use std::io::Write;
use tracing::warn;

// ============================================================================
// SUBACCOUNT TIMELINE
// ============================================================================

#[derive(Debug, Clone)]
pub struct SubaccountTimeline {
    pub subaccount_id: String,
    /// Taken from the first operation seen for this subaccount
    pub global_account_id: String,
    operations: Vec<Operation>,
}

impl SubaccountTimeline {
    pub fn new(subaccount_id: impl Into<String>, global_account_id: impl Into<String>) -> Self {
        SubaccountTimeline {
            subaccount_id: subaccount_id.into(),
            global_account_id: global_account_id.into(),
            operations: Vec::new(),
        }
    }

    /// Append and re-sort; equal timestamps keep arrival order
    pub fn append(&mut self, operation: Operation) {
        self.operations.push(operation);
        self.operations.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    }

    /// All operations, sorted by created_at
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Operations whose (instance_id, type) differs from the previous printed one
    pub fn condensed(&self) -> Vec<&Operation> {
        let mut printed: Vec<&Operation> = Vec::new();

        for op in &self.operations {
            let repeat = printed.last().map_or(false, |last| {
                last.instance_id == op.instance_id && last.operation_type == op.operation_type
            });
            if !repeat {
                printed.push(op);
            }
        }

        printed
    }

    /// Provisioned instances with no later deprovision, in first-provision order
    pub fn still_exists(&self) -> StillExists {
        let mut existing = StillExists::default();

        for op in self.condensed() {
            match op.operation_type {
                OperationType::Provision => existing.insert(&op.instance_id, &op.created_at),
                OperationType::Deprovision => existing.remove(&op.instance_id),
                OperationType::Other(_) => {}
            }
        }

        existing
    }

    pub fn render<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(
            out,
            "Subaccount '{}' (GID={}):",
            self.subaccount_id, self.global_account_id
        )?;

        for op in self.condensed() {
            writeln!(
                out,
                "    {}\t{}\t{}\t{}",
                op.created_at, op.instance_id, op.operation_type, op.id
            )?;
        }

        writeln!(out, "    Still exists: {}", self.still_exists())?;
        Ok(())
    }
}

// ============================================================================
// STILL EXISTS (instance_id -> provisioning created_at)
// ============================================================================

/// Insertion-ordered; re-inserting a key keeps its position
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StillExists {
    entries: IndexMap<String, String>,
}

impl StillExists {
    fn insert(&mut self, instance_id: &str, created_at: &str) {
        self.entries
            .insert(instance_id.to_string(), created_at.to_string());
    }

    fn remove(&mut self, instance_id: &str) {
        self.entries.shift_remove(instance_id);
    }

    pub fn get(&self, instance_id: &str) -> Option<&str> {
        self.entries.get(instance_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(id, at)| (id.as_str(), at.as_str()))
    }
}

impl std::fmt::Display for StillExists {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (i, (id, created_at)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{}': '{}'", id, created_at)?;
        }
        f.write_str("}")
    }
}

// ============================================================================
// TIMELINES (grouped, first-seen order)
// ============================================================================

/// Operation whose updated_at precedes its created_at
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampAnomaly {
    pub subaccount_id: String,
    pub operation_id: String,
    pub line: u64,
}

/// Keyed by subaccount id, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct Timelines {
    timelines: IndexMap<String, SubaccountTimeline>,
    anomalies: Vec<TimestampAnomaly>,
}

impl Timelines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_operations<I: IntoIterator<Item = Operation>>(operations: I) -> Self {
        let mut timelines = Timelines::new();
        for op in operations {
            timelines.add(op);
        }
        timelines
    }

    pub fn add(&mut self, operation: Operation) {
        // Flagged only; ordering stays by created_at
        if operation.has_timestamp_anomaly() {
            warn!(
                subaccount = %operation.subaccount_id,
                operation = %operation.id,
                line = operation.line,
                created_at = %operation.created_at,
                updated_at = %operation.updated_at,
                "updated_at precedes created_at"
            );
            self.anomalies.push(TimestampAnomaly {
                subaccount_id: operation.subaccount_id.clone(),
                operation_id: operation.id.clone(),
                line: operation.line,
            });
        }

        self.timelines
            .entry(operation.subaccount_id.clone())
            .or_insert_with(|| {
                SubaccountTimeline::new(
                    operation.subaccount_id.clone(),
                    operation.global_account_id.clone(),
                )
            })
            .append(operation);
    }

    pub fn get(&self, subaccount_id: &str) -> Option<&SubaccountTimeline> {
        self.timelines.get(subaccount_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubaccountTimeline> {
        self.timelines.values()
    }

    pub fn subaccount_ids(&self) -> impl Iterator<Item = &str> {
        self.timelines.keys().map(String::as_str)
    }

    pub fn anomalies(&self) -> &[TimestampAnomaly] {
        &self.anomalies
    }

    pub fn len(&self) -> usize {
        self.timelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timelines.is_empty()
    }

    pub fn render<W: Write>(&self, out: &mut W) -> Result<()> {
        for timeline in self.iter() {
            timeline.render(out)?;
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
