use clap::{Parser, Subcommand};
use ethiocal_admin::adapters::ServiceAccountKey;
use ethiocal_admin::config::{AppConfig, ConfigError, FileConfig, Overrides};
use std::path::PathBuf;

#[allow(clippy::large_enum_variant)]
pub(crate) enum RunOutcome {
    Serve(AppConfig),
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    let check_only = matches!(cli.command, Some(Command::CheckConfig));

    let config = match resolve_config(cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return RunOutcome::Exit(2);
        }
    };

    if check_only {
        return RunOutcome::Exit(run_check_config(&config));
    }
    RunOutcome::Serve(config)
}

#[derive(Parser, Debug)]
#[command(
    name = "ethiocal-admin",
    version,
    about = "Admin API for the EthioCal holiday offsets and push messages"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[arg(long, env = "ETHIOCAL_ADMIN_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, env = "ETHIOCAL_ADMIN_LISTEN")]
    listen: Option<String>,
    #[arg(long = "allow-email")]
    allow_emails: Vec<String>,
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    service_account: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate the configuration, then exit.
    CheckConfig,
}

fn resolve_config(cli: Cli) -> Result<AppConfig, ConfigError> {
    let file = match cli.config.as_deref() {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    AppConfig::resolve(
        file,
        Overrides {
            listen: cli.listen,
            allow_emails: cli.allow_emails,
            service_account: cli.service_account,
        },
    )
}

fn run_check_config(config: &AppConfig) -> i32 {
    let project = match project_id(config) {
        Ok(project) => project,
        Err(err) => {
            eprintln!("error: {err}");
            return 1;
        }
    };
    println!("config ok");
    println!("listen: {}", config.listen);
    println!("project: {project}");
    println!("parameter: {}", config.remote_config.key);
    println!("allowed emails: {}", config.allow_list.len());
    0
}

fn project_id(config: &AppConfig) -> Result<String, ConfigError> {
    let key_project = match config.service_account.as_deref() {
        Some(path) => ServiceAccountKey::load(path)?.project_id,
        None => None,
    };
    config
        .project_id
        .clone()
        .or(key_project)
        .ok_or(ConfigError::MissingProjectId)
}
