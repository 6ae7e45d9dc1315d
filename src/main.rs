mod table_display;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use pbi_cli::config::config::DEFAULT_SCOPE;
use pbi_cli::config::{Config, DatasetResolution};
use pbi_cli::data::datatable_converter::DataTableConverter;
use pbi_cli::models::ReportSummary;
use pbi_cli::utils::logging::init_tracing;
use pbi_cli::{Credentials, ServiceClient};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use table_display::{display_table, export_to_csv};

#[derive(Parser)]
#[command(name = "pbi-cli")]
#[command(about = "Scriptable access to Power BI workspaces, datasets and reports")]
#[command(version)]
struct Cli {
    #[arg(short, long, action = ArgAction::Count, global = true, help = "More log output (-v, -vv, -vvv)")]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List datasets in a workspace")]
    Datasets {
        #[arg(long, short, help = "Workspace id (defaults to PBI_WORKSPACE_ID / config)")]
        workspace: Option<String>,
    },
    #[command(about = "List reports in a workspace")]
    Reports {
        #[arg(long, short, help = "Workspace id (defaults to PBI_WORKSPACE_ID / config)")]
        workspace: Option<String>,
        #[arg(long, help = "Resolve each report's dataset name")]
        with_datasets: bool,
        #[arg(long, requires = "with_datasets", help = "Fail if a dataset name cannot be resolved")]
        strict: bool,
    },
    #[command(about = "Show one dataset")]
    Dataset {
        #[arg(long, short, help = "Workspace id (defaults to PBI_WORKSPACE_ID / config)")]
        workspace: Option<String>,
        #[arg(long, short, help = "Dataset id")]
        dataset: String,
    },
    #[command(about = "Run a DAX query against a dataset")]
    Query {
        #[arg(long, short, help = "Dataset id")]
        dataset: String,
        #[arg(long, short, conflicts_with = "file", required_unless_present = "file", help = "Query text")]
        query: Option<String>,
        #[arg(long, short, help = "Read the query from a file")]
        file: Option<PathBuf>,
        #[arg(long, value_name = "PATH", help = "Also write the rows to a CSV file")]
        csv: Option<PathBuf>,
    },
    #[command(about = "Export columns/tables/measures/relations of a dataset to Excel")]
    Docs {
        #[arg(long, short, help = "Dataset id")]
        dataset: String,
        #[arg(long, short, help = "Output directory (defaults to config or current directory)")]
        out: Option<PathBuf>,
    },
    #[command(about = "Queue a dataset refresh")]
    Refresh {
        #[arg(long, short, help = "Workspace id (defaults to PBI_WORKSPACE_ID / config)")]
        workspace: Option<String>,
        #[arg(long, short, help = "Dataset id")]
        dataset: String,
    },
    #[command(about = "Manage the configuration file")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    #[command(about = "Write a commented default config file")]
    Init {
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },
    #[command(about = "Print the effective configuration")]
    Show,
    #[command(about = "Print the config file location")]
    Path,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<()> {
    let mut config = Config::load().context("loading config")?;
    config.apply_env();

    match command {
        Commands::Config { action } => run_config(action, &config)?,
        Commands::Datasets { workspace } => {
            let workspace = workspace_id(workspace, &config)?;
            let client = connect(&config, config.client.dataset_resolution)?;
            let datasets = client.list_datasets(&workspace)?;
            display_table(&DataTableConverter::from_records("datasets", &datasets));
        }
        Commands::Reports {
            workspace,
            with_datasets,
            strict,
        } => {
            let workspace = workspace_id(workspace, &config)?;
            let mode = if strict {
                DatasetResolution::Strict
            } else {
                config.client.dataset_resolution
            };
            let client = connect(&config, mode)?;
            if with_datasets {
                let reports = client.list_reports_with_datasets(&workspace)?;
                display_table(&DataTableConverter::from_records("reports", &reports));
            } else {
                let reports = client.list_reports(&workspace)?;
                let summaries: Vec<ReportSummary> = reports.iter().map(ReportSummary).collect();
                display_table(&DataTableConverter::from_records("reports", &summaries));
            }
        }
        Commands::Dataset { workspace, dataset } => {
            let workspace = workspace_id(workspace, &config)?;
            let client = connect(&config, config.client.dataset_resolution)?;
            let record = client.get_dataset(&workspace, &dataset)?;
            display_table(&DataTableConverter::from_records("dataset", &[record]));
        }
        Commands::Query {
            dataset,
            query,
            file,
            csv,
        } => {
            let query = match (query, file) {
                (Some(q), _) => q,
                (None, Some(path)) => fs::read_to_string(&path)
                    .with_context(|| format!("reading query from {}", path.display()))?,
                (None, None) => return Err(anyhow!("either --query or --file is required")),
            };
            let client = connect(&config, config.client.dataset_resolution)?;
            let table = client.execute_query_table(&query, &dataset, "query")?;
            display_table(&table);
            if let Some(path) = csv {
                export_to_csv(&table, &path)?;
            }
        }
        Commands::Docs { dataset, out } => {
            let out = out
                .or_else(|| config.defaults.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from("."));
            let client = connect(&config, config.client.dataset_resolution)?;
            let path = client.export_documentation(&dataset, &out)?;
            println!("Documentation saved at: {}", path.display());
        }
        Commands::Refresh { workspace, dataset } => {
            let workspace = workspace_id(workspace, &config)?;
            let client = connect(&config, config.client.dataset_resolution)?;
            client.refresh_dataset(&workspace, &dataset)?;
            println!("Refresh started for dataset: {}", dataset);
        }
    }

    Ok(())
}

/// Build a reqwest-backed client from the config and authenticate it.
fn connect(config: &Config, resolution: DatasetResolution) -> Result<ServiceClient> {
    let creds = &config.credentials;
    let required = |value: &Option<String>, what: &str, env: &str| {
        value.clone().ok_or_else(|| {
            anyhow!(
                "missing {}: set {} or [credentials] in the config file",
                what,
                env
            )
        })
    };

    let credentials = Credentials::new(
        required(&creds.tenant_id, "tenant id", "PBI_TENANT_ID")?,
        required(&creds.client_id, "client id", "PBI_CLIENT_ID")?,
        required(&creds.client_secret, "client secret", "PBI_CLIENT_SECRET")?,
        creds
            .scope
            .clone()
            .unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
    );

    let client_config = config.client.clone().with_dataset_resolution(resolution);
    let mut client = ServiceClient::with_config(credentials, client_config)?;
    client.fetch_token().context("acquiring access token")?;
    Ok(client)
}

fn workspace_id(arg: Option<String>, config: &Config) -> Result<String> {
    arg.or_else(|| config.defaults.workspace_id.clone())
        .ok_or_else(|| anyhow!("no workspace given: pass --workspace or set PBI_WORKSPACE_ID"))
}

fn run_config(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Init { force } => {
            let path = Config::get_config_path()?;
            if path.exists() && !force {
                return Err(anyhow!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                ));
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, Config::create_default_with_comments())?;
            println!("Configuration written to: {}", path.display());
        }
        ConfigAction::Show => {
            let mut shown = config.clone();
            if shown.credentials.client_secret.is_some() {
                shown.credentials.client_secret = Some("<redacted>".to_string());
            }
            print!("{}", toml::to_string_pretty(&shown)?);
        }
        ConfigAction::Path => {
            println!("{}", Config::get_config_path()?.display());
        }
    }
    Ok(())
}
