// 📋 Registration Suggestions - reviewable EDP register commands per subaccount
//
// Output is meant to be redirected into a shell script and reviewed.
// Nothing here executes a registration.

use crate::config::SuggestionConfig;
use crate::registry::{RuntimeRecord, RuntimeRegistry};
use crate::timeline::Timelines;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use tracing::{info, warn};

// ============================================================================
// PLAN TYPE
// ============================================================================

/// EDP plan tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanType {
    Free,
    Tdd,
    Standard,
}

impl PlanType {
    /// Total: "free" → free, "azure_lite" → tdd, anything else → standard
    pub fn from_plan_name(plan: &str) -> Self {
        match plan {
            "free" => PlanType::Free,
            "azure_lite" => PlanType::Tdd,
            _ => PlanType::Standard,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Free => "free",
            PlanType::Tdd => "tdd",
            PlanType::Standard => "standard",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ENVIRONMENT KEY (what the registrator stores for the region)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvironmentKey {
    CloudFoundry,
    Kubernetes,
    Neo,
}

impl EnvironmentKey {
    /// By region prefix; unknown prefixes fall back to CF
    pub fn from_region(region: &str) -> Self {
        match region.split('-').next().unwrap_or_default() {
            "cf" => EnvironmentKey::CloudFoundry,
            "k8s" => EnvironmentKey::Kubernetes,
            "neo" => EnvironmentKey::Neo,
            _ => {
                warn!(region, "region does not fit any environment, CF is used");
                EnvironmentKey::CloudFoundry
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentKey::CloudFoundry => "CF",
            EnvironmentKey::Kubernetes => "KUBERNETES",
            EnvironmentKey::Neo => "NEO",
        }
    }
}

// ============================================================================
// SUGGESTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationSuggestion {
    pub subaccount_id: String,
    pub global_account_id: String,
    pub plan: String,
    pub plan_type: PlanType,
    pub region: String,
    pub environment: EnvironmentKey,
}

impl RegistrationSuggestion {
    pub fn from_record(subaccount_id: &str, record: RuntimeRecord) -> Self {
        RegistrationSuggestion {
            subaccount_id: subaccount_id.to_string(),
            plan_type: PlanType::from_plan_name(&record.service_plan_name),
            environment: EnvironmentKey::from_region(&record.sub_account_region),
            global_account_id: record.global_account_id,
            plan: record.service_plan_name,
            region: record.sub_account_region,
        }
    }

    pub fn render<W: Write>(&self, out: &mut W, config: &SuggestionConfig) -> Result<()> {
        writeln!(out, "\n")?;
        writeln!(
            out,
            "# SID: {} GID: {} plan: {} plantype: {} region: {} env: {}",
            self.subaccount_id,
            self.global_account_id,
            self.plan,
            self.plan_type,
            self.region,
            self.environment.as_str()
        )?;
        writeln!(out, "echo \"registering SID={}\"", self.subaccount_id)?;
        writeln!(
            out,
            "{} register {} {} {}",
            config.edp_binary, self.subaccount_id, self.region, self.plan_type
        )?;
        if config.emit_verification {
            writeln!(out, "{} get {}", config.edp_binary, self.subaccount_id)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SuggestionOutcome {
    Ready(RegistrationSuggestion),
    /// Lookup failed; the run continues with the next subaccount
    Skipped { subaccount_id: String, reason: String },
}

impl SuggestionOutcome {
    pub fn render<W: Write>(&self, out: &mut W, config: &SuggestionConfig) -> Result<()> {
        match self {
            SuggestionOutcome::Ready(suggestion) => suggestion.render(out, config),
            SuggestionOutcome::Skipped {
                subaccount_id,
                reason,
            } => {
                writeln!(out, "\n")?;
                writeln!(out, "# SKIPPED SID: {} reason: {}", subaccount_id, reason)?;
                Ok(())
            }
        }
    }
}

/// Look up every subaccount (except the header sentinel), one at a time
pub fn build_suggestions<R: RuntimeRegistry + ?Sized>(
    timelines: &Timelines,
    registry: &R,
    header_sentinel: &str,
) -> Vec<SuggestionOutcome> {
    let mut outcomes = Vec::new();

    for subaccount_id in timelines.subaccount_ids() {
        if subaccount_id == header_sentinel {
            continue;
        }

        match registry.lookup(subaccount_id) {
            Ok(record) => {
                outcomes.push(SuggestionOutcome::Ready(RegistrationSuggestion::from_record(
                    subaccount_id,
                    record,
                )));
            }
            Err(e) => {
                warn!(subaccount = subaccount_id, error = %e, "runtime lookup failed, skipping");
                outcomes.push(SuggestionOutcome::Skipped {
                    subaccount_id: subaccount_id.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let skipped = outcomes
        .iter()
        .filter(|o| matches!(o, SuggestionOutcome::Skipped { .. }))
        .count();
    info!(
        suggested = outcomes.len() - skipped,
        skipped, "registration suggestions built"
    );

    outcomes
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use crate::operations::{Operation, OperationType};
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct MockRegistry {
        records: HashMap<String, RuntimeRecord>,
        calls: RefCell<Vec<String>>,
    }

    impl MockRegistry {
        fn new(entries: &[(&str, &str, &str)]) -> Self {
            let records = entries
                .iter()
                .map(|(sid, region, plan)| {
                    (
                        sid.to_string(),
                        RuntimeRecord {
                            sub_account_region: region.to_string(),
                            global_account_id: format!("ga-{}", sid),
                            service_plan_name: plan.to_string(),
                        },
                    )
                })
                .collect();
            MockRegistry {
                records,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl RuntimeRegistry for MockRegistry {
        fn lookup(&self, subaccount_id: &str) -> Result<RuntimeRecord, RegistryError> {
            self.calls.borrow_mut().push(subaccount_id.to_string());
            self.records
                .get(subaccount_id)
                .cloned()
                .ok_or(RegistryError::NoRuntime)
        }
    }

    fn op(subaccount: &str) -> Operation {
        Operation {
            id: format!("op-{}", subaccount),
            operation_type: OperationType::Provision,
            state: "succeeded".to_string(),
            instance_id: format!("inst-{}", subaccount),
            created_at: "2024-01-01".to_string(),
            updated_at: "2024-01-01".to_string(),
            subaccount_id: subaccount.to_string(),
            global_account_id: "ga".to_string(),
            line: 1,
        }
    }

    #[test]
    fn test_plan_classification() {
        assert_eq!(PlanType::from_plan_name("free"), PlanType::Free);
        assert_eq!(PlanType::from_plan_name("azure_lite"), PlanType::Tdd);
        assert_eq!(PlanType::from_plan_name("azure"), PlanType::Standard);
        assert_eq!(PlanType::from_plan_name("aws"), PlanType::Standard);
        assert_eq!(PlanType::from_plan_name("Free"), PlanType::Standard);
        assert_eq!(PlanType::from_plan_name(""), PlanType::Standard);
        assert_eq!(PlanType::Tdd.to_string(), "tdd");
    }

    #[test]
    fn test_environment_key() {
        assert_eq!(EnvironmentKey::from_region("cf-eu10"), EnvironmentKey::CloudFoundry);
        assert_eq!(EnvironmentKey::from_region("k8s-us1"), EnvironmentKey::Kubernetes);
        assert_eq!(EnvironmentKey::from_region("neo-eu1"), EnvironmentKey::Neo);
        assert_eq!(EnvironmentKey::from_region("eu-west"), EnvironmentKey::CloudFoundry);
    }

    #[test]
    fn test_render_suggestion() {
        let suggestion = RegistrationSuggestion::from_record(
            "sub-1",
            RuntimeRecord {
                sub_account_region: "cf-eu10".to_string(),
                global_account_id: "ga-1".to_string(),
                service_plan_name: "azure_lite".to_string(),
            },
        );

        let mut out = Vec::new();
        suggestion.render(&mut out, &SuggestionConfig::default()).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\n\n# SID: sub-1 GID: ga-1 plan: azure_lite plantype: tdd region: cf-eu10 env: CF\n\
             echo \"registering SID=sub-1\"\n\
             ./edp register sub-1 cf-eu10 tdd\n"
        );
    }

    #[test]
    fn test_render_with_verification() {
        let suggestion = RegistrationSuggestion::from_record(
            "sub-1",
            RuntimeRecord {
                sub_account_region: "cf-us10".to_string(),
                global_account_id: "ga-1".to_string(),
                service_plan_name: "free".to_string(),
            },
        );
        let config = SuggestionConfig {
            edp_binary: "edp".to_string(),
            emit_verification: true,
        };

        let mut out = Vec::new();
        suggestion.render(&mut out, &config).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("edp register sub-1 cf-us10 free\n"));
        assert!(text.ends_with("edp get sub-1\n"));
    }

    #[test]
    fn test_build_skips_sentinel_and_isolates_failures() {
        let timelines = Timelines::from_operations(vec![op("subid"), op("S1"), op("S2"), op("S3")]);
        let registry = MockRegistry::new(&[("S1", "cf-eu10", "free"), ("S3", "cf-us10", "aws")]);

        let outcomes = build_suggestions(&timelines, &registry, "subid");

        assert_eq!(*registry.calls.borrow(), vec!["S1", "S2", "S3"]);
        assert_eq!(outcomes.len(), 3);

        match &outcomes[0] {
            SuggestionOutcome::Ready(s) => {
                assert_eq!(s.subaccount_id, "S1");
                assert_eq!(s.plan_type, PlanType::Free);
                assert_eq!(s.global_account_id, "ga-S1");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(matches!(
            &outcomes[1],
            SuggestionOutcome::Skipped { subaccount_id, .. } if subaccount_id == "S2"
        ));
        match &outcomes[2] {
            SuggestionOutcome::Ready(s) => assert_eq!(s.plan_type, PlanType::Standard),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_render_skipped() {
        let outcome = SuggestionOutcome::Skipped {
            subaccount_id: "S2".to_string(),
            reason: "no runtime found for subaccount".to_string(),
        };

        let mut out = Vec::new();
        outcome.render(&mut out, &SuggestionConfig::default()).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\n\n# SKIPPED SID: S2 reason: no runtime found for subaccount\n"
        );
    }
}
