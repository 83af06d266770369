//! CLI argument parsing and the top-level run.

pub mod args;

use std::process::ExitCode;
use std::time::Duration;

use args::Cli;
use checksoa_client::{
    load_resolvers, split_server_list, AddressFamily, CheckConfig, CheckError, MasterSpec, SoaChecker,
    MIN_BUFSIZE,
};
use checksoa_core::{fqdn, DriftPolicy, Status};
use clap::error::ErrorKind;
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::output::{format_timestamp, OutputFormat, Reporter};

/// Run the CLI application.
pub async fn run() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.kind() == ErrorKind::DisplayVersion {
                Status::Ok
            } else {
                Status::InvocationError
            };
            // Nothing more useful to do if stderr is gone.
            let _ = err.print();
            return ExitCode::from(code.code());
        }
    };

    init_logging(cli.verbose);
    if cli.no_color {
        colored::control::set_override(false);
    }

    let zone = fqdn(&cli.zone);
    let timestamp = format_timestamp(chrono::Utc::now());
    let format = OutputFormat::from_json_flag(cli.json);
    let show_nsid = cli.nsid;
    let mut reporter = Reporter::new(std::io::stdout(), format, &zone, &timestamp, show_nsid, cli.sort);

    let outcome = match prepare(&cli) {
        Ok(config) => {
            if let Err(err) = reporter.begin() {
                warn!(error = %err, "failed to write header");
            }
            SoaChecker::from_config(&config).run(&config, &mut reporter).await
        }
        Err(err) => Err(err),
    };

    let (status, written) = match outcome {
        Ok(report) => (report.status, reporter.finish(&report)),
        Err(err) => (err.status(), reporter.fatal(&err)),
    };
    if let Err(err) = written {
        warn!(error = %err, "failed to write report");
    }

    ExitCode::from(status.code())
}

/// Merge flags, the config file and resolv.conf into a run configuration
fn prepare(cli: &Cli) -> Result<CheckConfig, CheckError> {
    let file = Config::load(cli.config.as_deref())
        .map_err(|e| CheckError::Invocation(format!("{e:#}")))?;

    let mut config = check_config(cli, &file)?;
    config.validate()?;

    let resolv_conf = cli.resolv_conf.as_deref().or(file.resolv_conf.as_deref());
    config.resolvers = load_resolvers(resolv_conf)?;

    debug!(?config, "configuration");
    Ok(config)
}

/// Build the run configuration from flags, falling back to the config file
fn check_config(cli: &Cli, file: &Config) -> Result<CheckConfig, CheckError> {
    let mut config = CheckConfig::new(&cli.zone, Vec::new());

    config.family = AddressFamily::from_flags(cli.ipv4, cli.ipv6)?;
    config.master = cli.master.as_deref().map(MasterSpec::parse);
    config.additional = cli.additional.as_deref().map(split_server_list).unwrap_or_default();
    config.skip_advertised = cli.no_advertised;
    config.drift = DriftPolicy::new(cli.drift);
    config.sort = cli.sort || cli.json;
    if let Some(parallel) = cli.parallel.or(file.parallel) {
        at_least("parallel", parallel, 1)?;
        config.parallel = usize::try_from(parallel).unwrap_or(usize::MAX);
    }

    let mut query = config
        .query
        .authentic_data(cli.ad)
        .checking_disabled(cli.cd)
        .tcp(cli.tcp || file.tcp)
        .nsid(cli.nsid || file.nsid);
    if let Some(secs) = cli.timeout.or(file.timeout) {
        at_least("timeout", secs, 1)?;
        query = query.timeout(Duration::from_secs(secs));
    }
    if let Some(retries) = cli.retries.or(file.retries) {
        at_least("retries", retries, 1)?;
        query = query.retries(retries);
    }
    if let Some(bufsize) = cli.bufsize.or(file.bufsize) {
        at_least("bufsize", bufsize, MIN_BUFSIZE)?;
        query = query.bufsize(bufsize);
    }
    if let Some(port) = cli.port.or(file.port) {
        query = query.port(port);
    }
    config.query = query;

    Ok(config)
}

/// Config file values don't pass through clap's range checks
fn at_least<T: PartialOrd + std::fmt::Display>(key: &str, value: T, min: T) -> Result<(), CheckError> {
    if value < min {
        return Err(CheckError::Invocation(format!("{key} must be at least {min}, got {value}")));
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
