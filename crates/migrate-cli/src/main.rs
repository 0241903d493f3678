//! app-migrate - move applications from Rancher to Argo CD
//!
//! Validates the kube context, namespace, Argo CD and Rancher sessions, then
//! for every application: checks Argo CD sync, checks the Rancher app,
//! deletes the Helm config maps and the Rancher app, and checks Argo CD again.
//!
//! Exit status is 0 only when every application made it through.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use migrate_core::config::{DEFAULT_ARGOCD_SERVER, DEFAULT_RANCHER_URL};
use migrate_core::{
    init_tracing, run_migration, CommandRunner, MigrationConfig, MigrationError, ProcessRunner,
    Progress, Region, SettleDelays,
};
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "app-migrate")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Migrate applications from Rancher to Argo CD", long_about = None)]
struct Cli {
    /// K8s context used to run the migration
    #[arg(short, long)]
    context: String,

    /// K8s namespace the applications live in
    #[arg(short, long)]
    namespace: String,

    /// Application to migrate (repeat or comma-separate for several)
    #[arg(short, long = "application", required = true, value_delimiter = ',')]
    applications: Vec<String>,

    /// Region (e1 or e2)
    #[arg(short, long, value_parser = parse_region)]
    region: Region,

    /// Rancher API token
    #[arg(long, env = "RANCHER_TOKEN", hide_env_values = true)]
    rancher_token: String,

    /// Rancher project context (e.g. c-abcde:p-fghij)
    #[arg(long, env = "RANCHER_CONTEXT")]
    rancher_context: String,

    /// Skip the Argo CD sync check before deleting anything
    #[arg(short, long)]
    force: bool,

    /// Do not ask for confirmation when --force is given
    #[arg(short, long)]
    yes: bool,

    /// Argo CD server used for the SSO login fallback
    #[arg(long, env = "ARGOCD_SERVER", default_value = DEFAULT_ARGOCD_SERVER)]
    argocd_server: String,

    /// Rancher API URL used for login
    #[arg(long, env = "RANCHER_URL", default_value = DEFAULT_RANCHER_URL)]
    rancher_url: String,

    /// Seconds to wait after deleting config maps
    #[arg(long, default_value = "2")]
    configmap_settle_secs: u64,

    /// Seconds to wait after deleting the Rancher app
    #[arg(long, default_value = "5")]
    rancher_settle_secs: u64,

    /// Print the final report as JSON instead of the text summary
    #[arg(long)]
    summary_json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

fn parse_region(value: &str) -> std::result::Result<Region, MigrationError> {
    value.parse()
}

/// Where operator-facing lines are written.
///
/// With `--summary-json` stdout carries only the report, so progress lines,
/// the force prompt and the final error move to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Console {
    Stdout,
    Stderr,
}

impl Console {
    fn for_cli(cli: &Cli) -> Self {
        if cli.summary_json {
            Console::Stderr
        } else {
            Console::Stdout
        }
    }

    fn print(&self, line: &str) {
        match self {
            Console::Stdout => println!("{}", line),
            Console::Stderr => eprintln!("{}", line),
        }
    }
}

impl Progress for Console {
    fn line(&self, line: &str) {
        self.print(line);
    }
}

impl Cli {
    fn to_config(&self) -> Result<MigrationConfig> {
        let settle = SettleDelays {
            config_maps: Duration::from_secs(self.configmap_settle_secs),
            rancher_app: Duration::from_secs(self.rancher_settle_secs),
            ..SettleDelays::default()
        };

        let config = MigrationConfig::new(
            self.context.clone(),
            self.namespace.clone(),
            self.applications.clone(),
            self.region,
            self.rancher_token.clone(),
            self.rancher_context.clone(),
        )?
        .with_force(self.force)
        .with_argocd_server(self.argocd_server.clone())
        .with_rancher_url(self.rancher_url.clone())
        .with_settle(settle);

        config.validate()?;
        Ok(config)
    }
}

/// Parse the command line, or the exit code to stop with.
fn parse_args<I, T>(args: I) -> std::result::Result<Cli, ExitCode>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(cli),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            Err(ExitCode::SUCCESS)
        }
        Err(e) => {
            // Usage errors exit 1 like every other failure
            let _ = e.print();
            Err(ExitCode::FAILURE)
        }
    }
}

/// Report a failed run on `console` and map the result to the exit status.
fn finish(result: Result<()>, console: Console) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            console.print(&format!("\u{2718} {:#}", e));
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let console = Console::for_cli(&cli);
    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner);
    let result = run(&cli, runner, Arc::new(console), &mut std::io::stdout()).await;
    finish(result, console)
}

/// Run the migration and write the summary (or JSON report) to `out`.
///
/// Fails when the configuration is invalid, preflight fails, or any
/// application did not make it through.
async fn run(
    cli: &Cli,
    runner: Arc<dyn CommandRunner>,
    progress: Arc<dyn Progress>,
    out: &mut dyn Write,
) -> Result<()> {
    let config = cli.to_config()?;

    if config.force && !cli.yes {
        confirm_force(Console::for_cli(cli)).await?;
    }

    let report = run_migration(runner, Arc::new(config), progress)
        .await
        .context("migration aborted")?;

    let rendered = if cli.summary_json {
        report.to_json()?
    } else {
        report.summary()
    };
    writeln!(out, "{}", rendered).context("Failed to write summary")?;

    info!(run_id = %report.run_id, success = report.success(), "Run complete");

    if report.success() {
        Ok(())
    } else {
        anyhow::bail!(
            "{} of {} applications failed",
            report.failed_count(),
            report.outcomes.len()
        )
    }
}

/// Block until the operator presses enter; ctrl-c aborts the process.
async fn confirm_force(console: Console) -> Result<()> {
    const PROMPT: &str =
        "using --force can be dangerous. press enter to continue or ctrl + c to quit.";
    match console {
        Console::Stdout => {
            print!("{}", PROMPT);
            std::io::stdout().flush().context("Failed to flush stdout")?;
        }
        Console::Stderr => {
            eprint!("{}", PROMPT);
            std::io::stderr().flush().context("Failed to flush stderr")?;
        }
    }

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read confirmation")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use migrate_core::fakes::{RecordingProgress, ScriptedRunner};
    use migrate_core::CommandOutput;

    const BASE: [&str; 9] = [
        "app-migrate",
        "-c",
        "prod-e1",
        "-n",
        "payments",
        "--rancher-token",
        "token-xyz",
        "--rancher-context",
        "c-abc:p-def",
    ];

    fn parse(extra: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(BASE.iter().chain(extra.iter()).copied())
    }

    /// Healthy Argo CD and deletable config maps for every app in `apps`;
    /// Rancher lists only `rancher_apps`.
    fn scripted(apps: &[&str], rancher_apps: &[&str]) -> ScriptedRunner {
        let listing: String = rancher_apps
            .iter()
            .map(|app| format!("p-fghij:{app}-payments  {app}-payments  active  gl-helm  {app}  1.0.0\n"))
            .collect();

        let mut runner = ScriptedRunner::new().on("rancher apps ls", CommandOutput::success(listing));
        for app in apps {
            runner = runner
                .on(
                    &format!("argocd app list -l namespace=payments,application={app},region=e1"),
                    CommandOutput::success(format!(
                        "{app}-payments-e1  in-cluster  payments  default  Synced  Healthy\n"
                    )),
                )
                .on(
                    &format!("kubectl delete configmaps -n payments -l NAME={app}-payments"),
                    CommandOutput::success(format!("configmap \"{app}-payments.v2\" deleted\n")),
                );
        }
        runner
    }

    fn two_apps(extra: &[&str]) -> Cli {
        let mut args = vec![
            "-a",
            "a,b",
            "-r",
            "e1",
            "--configmap-settle-secs",
            "0",
            "--rancher-settle-secs",
            "0",
        ];
        args.extend_from_slice(extra);
        parse(&args).unwrap()
    }

    #[test]
    fn test_parses_full_command_line() {
        let cli = parse(&["-a", "ledger", "-a", "billing", "-r", "e2", "-f"]).unwrap();
        assert_eq!(cli.applications, vec!["ledger", "billing"]);
        assert_eq!(cli.region, Region::E2);
        assert!(cli.force);
        assert!(!cli.yes);

        let config = cli.to_config().unwrap();
        assert_eq!(config.region, Region::E2);
        assert!(config.force);
        assert_eq!(config.argocd_server, DEFAULT_ARGOCD_SERVER);
        assert_eq!(config.settle.rancher_app, Duration::from_secs(5));
    }

    #[test]
    fn test_comma_separated_applications() {
        let cli = parse(&["-a", "ledger,billing", "-r", "e1"]).unwrap();
        assert_eq!(cli.applications, vec!["ledger", "billing"]);
    }

    #[test]
    fn test_invalid_region_is_rejected() {
        let err = parse(&["-a", "ledger", "-r", "e3"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        assert!(err.to_string().contains("must be one of [e1, e2]"));
    }

    #[test]
    fn test_missing_application_is_rejected() {
        let err = parse(&["-r", "e1"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_settle_overrides() {
        let cli = parse(&[
            "-a",
            "ledger",
            "-r",
            "e1",
            "--configmap-settle-secs",
            "0",
            "--rancher-settle-secs",
            "1",
        ])
        .unwrap();
        let config = cli.to_config().unwrap();
        assert_eq!(config.settle.config_maps, Duration::ZERO);
        assert_eq!(config.settle.rancher_app, Duration::from_secs(1));
    }

    #[test]
    fn test_duplicate_application_fails_validation() {
        let cli = parse(&["-a", "ledger", "-a", "ledger", "-r", "e1"]).unwrap();
        let err = cli.to_config().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_invalid_region_exits_with_failure() {
        let args = BASE.iter().chain(["-a", "ledger", "-r", "e3"].iter()).copied();
        assert_eq!(parse_args(args).unwrap_err(), ExitCode::FAILURE);
    }

    #[test]
    fn test_help_exits_with_success() {
        assert_eq!(
            parse_args(["app-migrate", "--help"]).unwrap_err(),
            ExitCode::SUCCESS
        );
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_any_command() {
        let cli = parse(&["-a", " ", "-r", "e1"]).unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let mut out = Vec::new();

        let err = run(&cli, runner.clone(), Arc::new(RecordingProgress::new()), &mut out)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("application names must not be empty"));
        assert!(runner.calls().is_empty());
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_all_applications_migrated() {
        let cli = two_apps(&[]);
        let mut out = Vec::new();

        run(&cli, Arc::new(scripted(&["a", "b"], &["a", "b"])), Arc::new(RecordingProgress::new()), &mut out)
            .await
            .unwrap();
        let summary = String::from_utf8(out).unwrap();
        assert!(summary.ends_with("no issues found; migration complete\n"));
    }

    #[tokio::test]
    async fn test_one_failed_application_fails_the_run() {
        let cli = two_apps(&[]);
        let progress = Arc::new(RecordingProgress::new());
        let mut out = Vec::new();

        let err = run(&cli, Arc::new(scripted(&["a", "b"], &["a"])), progress.clone(), &mut out)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 applications failed");

        let summary = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(
            lines,
            vec![
                "====================",
                "found 1 issues:",
                "[b-payments-e1] cannot find rancher application",
            ]
        );
        assert!(progress
            .lines()
            .contains(&"\u{2718} [b-payments-e1] cannot find rancher application".to_string()));

        assert_eq!(finish(Err(err), Console::Stderr), ExitCode::FAILURE);
    }

    #[tokio::test]
    async fn test_summary_json_keeps_stdout_parseable() {
        let cli = two_apps(&["--summary-json"]);
        assert_eq!(Console::for_cli(&cli), Console::Stderr);

        let progress = Arc::new(RecordingProgress::new());
        let mut out = Vec::new();
        let result = run(&cli, Arc::new(scripted(&["a", "b"], &["a"])), progress.clone(), &mut out).await;
        assert!(result.is_err());

        let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(report["outcomes"].as_array().map(|o| o.len()), Some(2));
        assert_eq!(report["outcomes"][1]["stage"], "failed");
        assert!(progress.lines().iter().any(|l| l.contains("switched context")));
    }

    #[test]
    fn test_text_mode_prints_to_stdout() {
        let cli = parse(&["-a", "ledger", "-r", "e1"]).unwrap();
        assert_eq!(Console::for_cli(&cli), Console::Stdout);
        assert_eq!(finish(Ok(()), Console::Stdout), ExitCode::SUCCESS);
    }
}
