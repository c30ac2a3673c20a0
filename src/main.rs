/*!
 * uidaudit CLI - Command Line Interface
 *
 * Drift report on stdout, failed hosts and diagnostics on stderr.
 */

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use tracing::{error, warn};
use uidaudit::{
    cli_style::{self, print_error, print_warning},
    config::{AuditConfig, IdPolicy, LogLevel, OutputFormat},
    error::{AuditError, Result, EXIT_INTERRUPTED, EXIT_SUCCESS},
    logging, run_audit, ProcessTransport, Reporter,
};

#[derive(Parser)]
#[command(name = "uidaudit")]
#[command(version, about = "Report accounts whose UID or GID differs across a fleet of hosts", long_about = None)]
struct Cli {
    /// File with one host per line
    #[arg(short = 'f', long = "file", value_name = "HOSTS")]
    hosts_file: Option<PathBuf>,

    /// Staging directory for per-host captures (removed after the run)
    #[arg(short = 'd', long = "dir", value_name = "DIR")]
    staging_dir: Option<PathBuf>,

    /// Number of hosts queried at once
    #[arg(short = 'w', long = "workers", value_name = "N")]
    workers: Option<usize>,

    /// Per-host timeout in seconds (0 = no timeout)
    #[arg(short = 't', long = "timeout", value_name = "SECS")]
    timeout: Option<u64>,

    /// Remote transport program
    #[arg(long, value_name = "PROG")]
    transport: Option<String>,

    /// Argument passed to the transport before the host name (repeatable)
    #[arg(long = "transport-arg", value_name = "ARG", allow_hyphen_values = true)]
    transport_args: Vec<String>,

    /// Command run on every host
    #[arg(long, value_name = "CMD")]
    remote_command: Option<String>,

    /// Drop lines whose uid or gid is not a number
    #[arg(long)]
    strict_ids: bool,

    /// Also report GID drift
    #[arg(long)]
    gid: bool,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,

    /// Show a progress bar on stderr
    #[arg(long = "progress")]
    show_progress: bool,

    /// Print a run summary on stderr
    #[arg(long)]
    stat: bool,

    /// Log level
    #[arg(long, value_enum)]
    log_level: Option<LogLevelArg>,

    /// Write logs to a file as JSON
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Verbose logging (debug level)
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Print the effective configuration as TOML
    ShowConfig,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            if e.is_fatal() {
                error!(category = %e.category(), "{}", e);
            } else {
                warn!(category = %e.category(), "{}", e);
            }
            print_error(&e.to_string(), hint_for(&e));
            if matches!(e, AuditError::MissingHostList) {
                let _ = Cli::command().write_help(&mut io::stderr());
            }
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let mut cli = Cli::parse();
    let base_config = load_config(cli.config.as_deref());
    let command = cli.command.take();
    let config = apply_cli(base_config, cli);

    if let Some(command) = command {
        return handle_subcommand(command, &config);
    }

    // Checked before logging so a bad invocation leaves nothing behind
    if config.hosts_file.is_none() {
        return Err(AuditError::MissingHostList);
    }

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    if let Err(e) = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    }) {
        warn!("could not install interrupt handler: {}", e);
    }

    let transport = ProcessTransport::from_config(&config);
    let run = run_audit(&config, &transport, &interrupted)?;

    let reporter = Reporter::from_config(&config);
    let written = reporter.write_report(
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
        &run.registry,
        &run.failures,
    );

    for diagnostic in &run.diagnostics {
        print_warning(diagnostic);
    }
    written?;

    if config.show_stats {
        let table = cli_style::run_summary_table(&run, config.report_gid);
        let mut stderr = io::stderr().lock();
        writeln!(stderr)?;
        writeln!(stderr, "{}", table)?;
    }

    if run.interrupted {
        print_warning(&AuditError::Interrupted.to_string());
        return Ok(EXIT_INTERRUPTED);
    }

    Ok(EXIT_SUCCESS)
}

fn load_config(path: Option<&Path>) -> AuditConfig {
    match path {
        Some(path) => AuditConfig::from_file(path).unwrap_or_else(|e| {
            print_warning(&format!("Failed to load config file: {}", e));
            AuditConfig::default()
        }),
        None => AuditConfig::default(),
    }
}

/// Layer command-line flags over a loaded configuration
fn apply_cli(mut config: AuditConfig, cli: Cli) -> AuditConfig {
    if let Some(hosts_file) = cli.hosts_file {
        config.hosts_file = Some(hosts_file);
    }
    if let Some(staging_dir) = cli.staging_dir {
        config.staging_dir = staging_dir;
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(transport) = cli.transport {
        config.transport = transport;
    }
    if !cli.transport_args.is_empty() {
        config.transport_args = cli.transport_args;
    }
    if let Some(remote_command) = cli.remote_command {
        config.remote_command = remote_command;
    }
    if cli.strict_ids {
        config.id_policy = IdPolicy::Numeric;
    }
    if cli.json {
        config.format = OutputFormat::Json;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log;
    }
    config.report_gid |= cli.gid;
    config.show_progress |= cli.show_progress;
    config.show_stats |= cli.stat;
    config.verbose |= cli.verbose;
    config
}

fn handle_subcommand(command: Commands, config: &AuditConfig) -> Result<i32> {
    match command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "uidaudit", &mut io::stdout());
        }
        Commands::ShowConfig => {
            print!("{}", config.to_toml()?);
        }
    }
    Ok(EXIT_SUCCESS)
}

fn hint_for(error: &AuditError) -> Option<&'static str> {
    match error {
        AuditError::MissingHostList => Some("Pass -f HOSTS or set hosts_file in the --config file"),
        AuditError::HostList { .. } => Some("Check that the host list exists and is readable"),
        AuditError::Staging { .. } => Some("Choose another staging directory with -d"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> AuditConfig {
        let cli = Cli::try_parse_from(args).unwrap();
        apply_cli(AuditConfig::default(), cli)
    }

    #[test]
    fn test_help() {
        let result = Cli::try_parse_from(["uidaudit", "--help"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults_without_flags() {
        let config = parse(&["uidaudit"]);
        assert!(config.hosts_file.is_none());
        assert_eq!(config.workers, 5);
        assert_eq!(config.format, OutputFormat::Text);
        assert_eq!(config.id_policy, IdPolicy::Opaque);
    }

    #[test]
    fn test_short_flags() {
        let config = parse(&["uidaudit", "-f", "hosts.txt", "-d", "/tmp/stage", "-w", "12", "-t", "0"]);
        assert_eq!(config.hosts_file, Some(PathBuf::from("hosts.txt")));
        assert_eq!(config.staging_dir, PathBuf::from("/tmp/stage"));
        assert_eq!(config.workers, 12);
        assert!(config.host_timeout().is_none());
    }

    #[test]
    fn test_transport_args_accept_hyphens() {
        let config = parse(&[
            "uidaudit",
            "--transport",
            "ssh",
            "--transport-arg",
            "-p",
            "--transport-arg",
            "2222",
        ]);
        assert_eq!(config.transport_args, vec!["-p", "2222"]);
    }

    #[test]
    fn test_output_flags() {
        let config = parse(&["uidaudit", "-f", "h", "--json", "--gid", "--strict-ids", "--stat"]);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.id_policy, IdPolicy::Numeric);
        assert!(config.report_gid);
        assert!(config.show_stats);
    }

    #[test]
    fn test_flags_override_config_file() {
        let base = AuditConfig {
            workers: 9,
            report_gid: true,
            hosts_file: Some(PathBuf::from("from-config")),
            ..Default::default()
        };
        let cli = Cli::try_parse_from(["uidaudit", "-w", "2"]).unwrap();
        let config = apply_cli(base, cli);
        assert_eq!(config.workers, 2);
        assert!(config.report_gid);
        assert_eq!(config.hosts_file, Some(PathBuf::from("from-config")));
    }

    #[test]
    fn test_subcommands_parse() {
        let cli = Cli::try_parse_from(["uidaudit", "completions", "bash"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Completions { .. })));
        let cli = Cli::try_parse_from(["uidaudit", "show-config"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::ShowConfig)));
    }
}
