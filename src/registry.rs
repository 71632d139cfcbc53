// 🛰️ Runtime Registry - live lookup of a subaccount's runtime via KCP CLI
//
// The report only needs region, global account and plan. The lookup is
// behind a trait so tests (and other transports) can replace the CLI.

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use serde::Deserialize;
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

// ============================================================================
// CORE TYPES
// ============================================================================

/// What the report needs from a runtime record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeRecord {
    pub sub_account_region: String,
    pub global_account_id: String,
    pub service_plan_name: String,
}

/// Read-only lookup of a subaccount's runtime
pub trait RuntimeRegistry {
    fn lookup(&self, subaccount_id: &str) -> Result<RuntimeRecord, RegistryError>;
}

// ============================================================================
// RESPONSE PARSING
// ============================================================================

#[derive(Debug, Deserialize)]
struct RuntimesPage {
    data: Vec<RuntimeDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeDto {
    sub_account_region: String,
    #[serde(rename = "globalAccountID")]
    global_account_id: String,
    service_plan_name: String,
}

/// Parse `kcp rt -o json` output; the first runtime wins
pub fn parse_runtime_response(body: &str) -> Result<RuntimeRecord, RegistryError> {
    let page: RuntimesPage = serde_json::from_str(body)
        .map_err(|e| RegistryError::InvalidResponse(e.to_string()))?;

    let first = page.data.into_iter().next().ok_or(RegistryError::NoRuntime)?;

    Ok(RuntimeRecord {
        sub_account_region: first.sub_account_region,
        global_account_id: first.global_account_id,
        service_plan_name: first.service_plan_name,
    })
}

// ============================================================================
// KCP CLI
// ============================================================================

/// Runs `<kcp> rt -s <sid> -o json` with a fixed environment and a deadline
#[derive(Debug, Clone)]
pub struct KcpCli {
    pub binary: PathBuf,
    pub config_file: PathBuf,
    pub home_dir: PathBuf,
    pub timeout: Duration,
}

impl KcpCli {
    /// A bare binary name is resolved against this process's PATH,
    /// since the child runs with a cleared environment
    pub fn from_config(config: &RegistryConfig) -> Self {
        let path_var = std::env::var_os("PATH");
        KcpCli {
            binary: resolve_program(&config.kcp_binary, path_var.as_deref()),
            config_file: config.kcp_config.clone(),
            home_dir: config.home_dir.clone(),
            timeout: config.timeout(),
        }
    }

    fn command(&self, subaccount_id: &str) -> Command {
        // env_clear drops PATH, so `binary` must already be resolved
        let mut cmd = Command::new(&self.binary);
        cmd.args(["rt", "-s", subaccount_id, "-o", "json"])
            .env_clear()
            .env("KCPCONFIG", &self.config_file)
            .env("HOME", &self.home_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl RuntimeRegistry for KcpCli {
    fn lookup(&self, subaccount_id: &str) -> Result<RuntimeRecord, RegistryError> {
        debug!(subaccount = subaccount_id, binary = %self.binary.display(), "querying kcp");

        let output = run_with_timeout(self.command(subaccount_id), self.timeout)?;
        parse_runtime_response(&output)
    }
}

/// First `<dir>/<program>` on the search path that is a file.
/// Paths with a directory part, and names not found, are returned unchanged.
pub fn resolve_program(program: &Path, search_path: Option<&OsStr>) -> PathBuf {
    if program.components().count() != 1 || program.is_absolute() {
        return program.to_path_buf();
    }

    search_path
        .into_iter()
        .flat_map(std::env::split_paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
        .unwrap_or_else(|| program.to_path_buf())
}

/// Spawn, drain stdout/stderr on helper threads, kill on deadline
fn run_with_timeout(mut cmd: Command, timeout: Duration) -> Result<String, RegistryError> {
    let mut child = cmd.spawn().map_err(RegistryError::Spawn)?;

    let stdout = child.stdout.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = String::new();
            pipe.read_to_string(&mut buf).map(|_| buf)
        })
    });
    let stderr = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = String::new();
            let _ = pipe.read_to_string(&mut buf);
            buf
        })
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait().map_err(RegistryError::Wait)? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(RegistryError::Timeout(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = match stdout {
        Some(handle) => handle
            .join()
            .map_err(|_| RegistryError::InvalidResponse("stdout reader panicked".to_string()))?
            .map_err(|e| RegistryError::InvalidResponse(format!("unreadable stdout: {}", e)))?,
        None => String::new(),
    };
    let stderr = stderr
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();

    if !status.success() {
        return Err(RegistryError::NonZeroExit {
            status: status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(stdout)
}

// ============================================================================
// TESTS
// ============================================================================
