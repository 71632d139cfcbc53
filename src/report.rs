// 📊 Operations Report - timeline summary, then optional EDP suggestions
//
// Phase 1: load operations, group per subaccount, print condensed timelines.
// Phase 2: look up each subaccount's runtime and print register commands.

use crate::config::AuditConfig;
use crate::operations::load_operations;
use crate::registry::RuntimeRegistry;
use crate::suggestions::{build_suggestions, SuggestionOutcome};
use crate::timeline::Timelines;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::io::Write;
use tracing::info;

#[derive(Debug, Clone)]
pub struct OperationsReport {
    pub timelines: Timelines,
    /// Empty when Phase 2 did not run
    pub suggestions: Vec<SuggestionOutcome>,
    pub generated_at: DateTime<Utc>,
}

impl OperationsReport {
    pub fn summary(&self) -> String {
        let skipped = self
            .suggestions
            .iter()
            .filter(|o| matches!(o, SuggestionOutcome::Skipped { .. }))
            .count();

        format!(
            "Operations report at {}: {} subaccounts, {} timestamp anomalies, {} suggestions ({} skipped)",
            self.generated_at.to_rfc3339(),
            self.timelines.len(),
            self.timelines.anomalies().len(),
            self.suggestions.len() - skipped,
            skipped
        )
    }
}

/// Run both phases. Pass `None` as registry to stop after Phase 1.
pub fn run_operations_report<W: Write>(
    config: &AuditConfig,
    registry: Option<&dyn RuntimeRegistry>,
    out: &mut W,
) -> Result<OperationsReport> {
    let operations = load_operations(&config.operations_path)?;
    info!(
        operations = operations.len(),
        path = %config.operations_path.display(),
        "loaded operations"
    );

    let timelines = Timelines::from_operations(operations);
    timelines.render(out)?;

    let suggestions = match registry {
        Some(registry) => {
            let outcomes =
                build_suggestions(&timelines, registry, &config.registry.header_sentinel);
            for outcome in &outcomes {
                outcome.render(out, &config.suggestions)?;
            }
            outcomes
        }
        None => Vec::new(),
    };

    let report = OperationsReport {
        timelines,
        suggestions,
        generated_at: Utc::now(),
    };
    info!("{}", report.summary());

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AuditError, RegistryError};
    use crate::registry::RuntimeRecord;

    struct FixedRegistry;

    impl RuntimeRegistry for FixedRegistry {
        fn lookup(&self, subaccount_id: &str) -> Result<RuntimeRecord, RegistryError> {
            if subaccount_id == "S2" {
                return Err(RegistryError::Timeout(std::time::Duration::from_secs(3)));
            }
            Ok(RuntimeRecord {
                sub_account_region: "cf-eu10".to_string(),
                global_account_id: "ga-1".to_string(),
                service_plan_name: "azure".to_string(),
            })
        }
    }

    const OPERATIONS: &str = "\
id,type,state,instance_id,created_at,updated_at,subid,globid
op-2,provision,succeeded,inst1,2024-01-01 10:00:00,2024-01-01 10:05:00,\"\"\"S1\"\"\",\"\"\"ga-1\"\"\"
op-1,provision,succeeded,inst1,2024-01-01 10:00:00,2024-01-01 10:05:00,\"\"\"S1\"\"\",\"\"\"ga-1\"\"\"
op-3,deprovision,succeeded,inst1,2024-02-01 10:00:00,2024-02-01 10:05:00,\"\"\"S1\"\"\",\"\"\"ga-1\"\"\"
op-4,provision,succeeded,inst2,2024-03-01 10:00:00,2024-03-01 10:05:00,\"\"\"S2\"\"\",\"\"\"ga-2\"\"\"
";

    fn config_with(operations: &str) -> (tempfile::TempDir, AuditConfig) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("operations.csv");
        std::fs::write(&path, operations).unwrap();

        let config = AuditConfig {
            operations_path: path,
            ..AuditConfig::default()
        };
        (dir, config)
    }

    #[test]
    fn test_phase_one_only() {
        let (_dir, config) = config_with(OPERATIONS);

        let mut out = Vec::new();
        let report = run_operations_report(&config, None, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(report.timelines.len(), 3);
        assert!(report.suggestions.is_empty());
        assert!(text.contains(
            "Subaccount 'S1' (GID=ga-1):\n\
             \x20   2024-01-01 10:00:00\tinst1\tprovision\top-2\n\
             \x20   2024-02-01 10:00:00\tinst1\tdeprovision\top-3\n\
             \x20   Still exists: {}\n"
        ));
        assert!(text.contains("    Still exists: {'inst2': '2024-03-01 10:00:00'}\n"));
        assert!(!text.contains("register"));
    }

    #[test]
    fn test_both_phases() {
        let (_dir, config) = config_with(OPERATIONS);

        let mut out = Vec::new();
        let report = run_operations_report(&config, Some(&FixedRegistry), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        // Header row never queried
        assert_eq!(report.suggestions.len(), 2);
        assert!(!text.contains("SID: subid"));
        assert!(text.contains("./edp register S1 cf-eu10 standard\n"));
        assert!(text.contains("# SKIPPED SID: S2 reason: registry command timed out after 3s\n"));
        assert!(report.summary().contains("1 suggestions (1 skipped)"));
    }

    #[test]
    fn test_malformed_row_aborts() {
        let (_dir, config) = config_with("op-1,provision,succeeded\n");

        let err = run_operations_report(&config, None, &mut Vec::new()).unwrap_err();
        let format_error = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<AuditError>());
        assert!(matches!(
            format_error,
            Some(AuditError::InputFormat { line: 1, .. })
        ));
    }
}
