use anyhow::Result;
use std::env;
use std::io::{self, Write};
use std::process;
use tracing::info;

use subaccount_audit::{
    logging, run_operations_report, run_subaccount_diff, AuditConfig, KcpCli, RuntimeRegistry,
    VERSION,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let command = match args.get(1).map(String::as_str) {
        Some(command @ ("diff" | "report")) => command,
        _ => {
            print_usage();
            process::exit(1);
        }
    };

    let config = AuditConfig::from_env()?;
    logging::init_logging(&config.log_level)?;
    info!(version = VERSION, command, "subaccount-audit starting");

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        "diff" => run_diff(&config, &mut out)?,
        _ => run_report(&config, &mut out)?,
    }

    out.flush()?;
    Ok(())
}

fn run_diff<W: Write>(config: &AuditConfig, out: &mut W) -> Result<()> {
    run_subaccount_diff(
        &config.edp_subaccounts_path,
        &config.skr_subaccounts_path,
        out,
    )?;
    Ok(())
}

fn run_report<W: Write>(config: &AuditConfig, out: &mut W) -> Result<()> {
    let kcp = KcpCli::from_config(&config.registry);
    let registry: Option<&dyn RuntimeRegistry> = if config.registry.enabled {
        Some(&kcp)
    } else {
        info!("registry lookups disabled, timelines only");
        None
    };

    run_operations_report(config, registry, out)?;
    Ok(())
}

fn print_usage() {
    eprintln!("subaccount-audit {}", VERSION);
    eprintln!();
    eprintln!("Usage: subaccount-audit <diff|report>");
    eprintln!("  diff    list runtimes whose subaccount is not registered in EDP");
    eprintln!("  report  per-subaccount operations timeline and EDP register suggestions");
    eprintln!();
    eprintln!(
        "Config: ${} or ./{} (KCP_BINARY and KCPCONFIG override the registry section)",
        subaccount_audit::config::CONFIG_ENV,
        subaccount_audit::config::DEFAULT_CONFIG_FILE
    );
}
