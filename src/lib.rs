// Subaccount Audit - Core Library
// EDP registration diff and operations report, used by the CLI and tests

pub mod config;
pub mod error;
pub mod logging;
pub mod subaccounts;    // EDP export vs live runtimes
pub mod operations;     // operations table rows
pub mod timeline;       // per-subaccount history
pub mod registry;       // KCP runtime lookup
pub mod suggestions;    // EDP register commands
pub mod report;

// Re-export commonly used types
pub use config::{AuditConfig, RegistryConfig, SuggestionConfig};
pub use error::{AuditError, RegistryError};
pub use subaccounts::{
    KnownSubaccounts, SubaccountDiff,
    load_known_subaccounts, parse_known_subaccounts, diff_candidates, run_subaccount_diff,
};
pub use operations::{Operation, OperationType, load_operations, parse_operations};
pub use timeline::{SubaccountTimeline, StillExists, Timelines, TimestampAnomaly};
pub use registry::{KcpCli, RuntimeRecord, RuntimeRegistry, parse_runtime_response};
pub use suggestions::{
    EnvironmentKey, PlanType, RegistrationSuggestion, SuggestionOutcome, build_suggestions,
};
pub use report::{OperationsReport, run_operations_report};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
