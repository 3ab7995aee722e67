//! oasync CLI
//!
//! Keeps API catalog metadata in step across:
//! - canonical ("general") records produced by the platform offramps
//! - the local API Hub mirror (`apihub onramp`, `apihub export`)
//! - the remote API Hub catalog (`apihub import`, `apihub clean`, `apihub status`)
//! - an Apigee organization (`apigee apis|products|developers`, `apigee status`)
//!
//! Exit codes: 0 when every resource reached a non-failed state, 1 when at
//! least one resource failed, 2 on a precondition error (nothing was sent),
//! 3 on any other error.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use oasync_store::{LocalCatalogStore, Platform};
use oasync_sync::transport::DEFAULT_TIMEOUT_SECS;
use oasync_sync::{
    apigee, reconcile, ApiHubClient, ApigeeClient, CredentialProvider, HttpTransport,
    PlatformStatus, ResourceScope, SyncError, SyncReport, DEFAULT_APIGEE_URL, DEFAULT_APIHUB_URL,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod output;

const EXIT_FAILURES: u8 = 1;
const EXIT_PRECONDITION: u8 = 2;
const EXIT_UNEXPECTED: u8 = 3;

#[derive(Parser)]
#[command(name = "oasync")]
#[command(
    author,
    version,
    about = "oasync: keep API catalogs in step across API Hub, Apigee and local records"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct GlobalArgs {
    /// Cloud project owning the catalog (also the Apigee organization)
    #[arg(long, env = "OASYNC_PROJECT", global = true)]
    project: Option<String>,

    /// API Hub region, e.g. `us-central1`
    #[arg(long, env = "OASYNC_REGION", global = true)]
    region: Option<String>,

    /// Bearer token; falls back to GOOGLE_OAUTH_ACCESS_TOKEN, then `gcloud`
    #[arg(long, env = "OASYNC_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Only touch the API with this name
    #[arg(long, global = true)]
    api: Option<String>,

    /// Local catalog root holding the per-platform trees
    #[arg(long, env = "OASYNC_ROOT", default_value = "src/main", global = true)]
    root: PathBuf,

    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    timeout_secs: u64,

    /// Print the run report as JSON instead of colored lines
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// API Hub: local mirror and remote catalog.
    Apihub {
        /// API Hub REST endpoint
        #[arg(long, env = "OASYNC_APIHUB_URL", default_value = DEFAULT_APIHUB_URL)]
        base_url: String,
        #[command(subcommand)]
        command: ApihubCommands,
    },

    /// Apigee: organization-scoped housekeeping and deployment.
    Apigee {
        /// Apigee REST endpoint
        #[arg(long, env = "OASYNC_APIGEE_URL", default_value = DEFAULT_APIGEE_URL)]
        base_url: String,
        #[command(subcommand)]
        command: ApigeeCommands,
    },

    /// Canonical records produced by the offramps.
    General {
        #[command(subcommand)]
        command: GeneralCommands,
    },
}

#[derive(Subcommand)]
enum ApihubCommands {
    /// Download the remote catalog into the local API Hub tree.
    Export,
    /// Create (or converge) the local API Hub tree in the remote catalog.
    Import,
    /// Translate canonical records into the local API Hub tree.
    Onramp,
    /// Delete APIs and deployments from the remote catalog.
    Clean,
    /// Remove the local API Hub tree.
    #[command(name = "cleanlocal")]
    CleanLocal,
    /// Check that the remote catalog is reachable.
    Status,
}

#[derive(Subcommand)]
enum ApigeeCommands {
    /// Check that the organization is reachable.
    Status,
    /// API proxies.
    Apis {
        #[command(subcommand)]
        command: ApisCommands,
    },
    /// API products.
    Products {
        #[command(subcommand)]
        command: ProductsCommands,
    },
    /// Developers.
    Developers {
        #[command(subcommand)]
        command: DevelopersCommands,
    },
}

#[derive(Subcommand)]
enum ApisCommands {
    /// Delete API proxies (all, or the one named by --api).
    Clean,
    /// Deploy the latest revision of every local Apigee proxy.
    Deploy {
        /// Target environment
        #[arg(long, env = "OASYNC_APIGEE_ENVIRONMENT")]
        environment: Option<String>,
        /// Service account the deployed proxies run as
        #[arg(long)]
        service_account: Option<String>,
    },
}

#[derive(Subcommand)]
enum ProductsCommands {
    /// Delete API products (all, or one).
    Clean {
        #[arg(long)]
        product: Option<String>,
    },
}

#[derive(Subcommand)]
enum DevelopersCommands {
    /// Delete developers (all, or one).
    Clean {
        #[arg(long)]
        developer_email: Option<String>,
    },
}

#[derive(Subcommand)]
enum GeneralCommands {
    /// Remove the local canonical tree.
    #[command(name = "cleanlocal")]
    CleanLocal,
}

// ============================================================================
// Entry point
// ============================================================================

/// What a finished command hands back for printing and exit-code mapping.
#[derive(Debug)]
enum Completed {
    Report(SyncReport),
    Status {
        platform: &'static str,
        status: PlatformStatus,
    },
}

impl Completed {
    fn exit_code(&self) -> u8 {
        let failed = match self {
            Completed::Report(report) => report.has_failures(),
            Completed::Status { status, .. } => !status.connected,
        };
        if failed {
            EXIT_FAILURES
        } else {
            0
        }
    }

    fn print(&self, json: bool) -> Result<()> {
        match self {
            Completed::Report(report) => output::print_report(report, json),
            Completed::Status { platform, status } => output::print_status(platform, status, json),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);
    let json = cli.global.json;

    let code = match run(cli).and_then(|done| done.print(json).map(|_| done.exit_code())) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            error_exit_code(&err)
        }
    };
    ExitCode::from(code)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn error_exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<SyncError>() {
        Some(sync) if sync.is_precondition() => EXIT_PRECONDITION,
        _ => EXIT_UNEXPECTED,
    }
}

fn run(cli: Cli) -> Result<Completed> {
    let global = cli.global;
    match cli.command {
        Commands::Apihub { base_url, command } => cmd_apihub(&global, &base_url, command),
        Commands::Apigee { base_url, command } => cmd_apigee(&global, &base_url, command),
        Commands::General { command } => match command {
            GeneralCommands::CleanLocal => {
                let general = LocalCatalogStore::open(&global.root, Platform::General);
                Ok(Completed::Report(reconcile::clean_local(&general)?))
            }
        },
    }
}

// ============================================================================
// API Hub
// ============================================================================

fn cmd_apihub(global: &GlobalArgs, base_url: &str, command: ApihubCommands) -> Result<Completed> {
    let filter = global.api.as_deref();
    let hub = LocalCatalogStore::open(&global.root, Platform::ApiHub);

    let report = match command {
        ApihubCommands::CleanLocal => reconcile::clean_local(&hub)?,
        ApihubCommands::Onramp => {
            let scope = scope(global)?;
            let general = LocalCatalogStore::open(&global.root, Platform::General);
            reconcile::onramp(&general, &hub, &scope, filter)?
        }
        ApihubCommands::Export => reconcile::export(&apihub_client(global, base_url)?, &hub, filter)?,
        ApihubCommands::Import => reconcile::import(&apihub_client(global, base_url)?, &hub, filter)?,
        ApihubCommands::Clean => reconcile::clean(&apihub_client(global, base_url)?, filter),
        ApihubCommands::Status => {
            let status = reconcile::status(&apihub_client(global, base_url)?);
            return Ok(Completed::Status {
                platform: "apihub",
                status,
            });
        }
    };
    Ok(Completed::Report(report))
}

fn scope(global: &GlobalArgs) -> Result<ResourceScope> {
    Ok(ResourceScope::new(
        global.project.as_deref(),
        global.region.as_deref(),
    )?)
}

/// Scope is validated before credentials so a missing flag never costs a
/// token lookup.
fn apihub_client(global: &GlobalArgs, base_url: &str) -> Result<ApiHubClient<HttpTransport>> {
    let scope = scope(global)?;
    let transport = http_transport(global)?;
    Ok(ApiHubClient::new(transport, scope).with_base_url(base_url))
}

fn http_transport(global: &GlobalArgs) -> Result<HttpTransport> {
    let (token, source) = CredentialProvider::new(global.token.clone())
        .resolve()
        .context("failed to resolve credentials")?;
    tracing::debug!(?source, "resolved bearer token");
    HttpTransport::new(&token, Duration::from_secs(global.timeout_secs))
}

// ============================================================================
// Apigee
// ============================================================================

fn cmd_apigee(global: &GlobalArgs, base_url: &str, command: ApigeeCommands) -> Result<Completed> {
    let org = apigee::organization(global.project.as_deref())?;
    let filter = global.api.as_deref();

    let report = match command {
        ApigeeCommands::Status => {
            let status = apigee::status(&apigee_client(global, base_url, org)?);
            return Ok(Completed::Status {
                platform: "apigee",
                status,
            });
        }
        ApigeeCommands::Apis { command } => match command {
            ApisCommands::Clean => apigee::clean_proxies(&apigee_client(global, base_url, org)?, filter),
            ApisCommands::Deploy {
                environment,
                service_account,
            } => {
                let environment = apigee::environment(environment.as_deref())?;
                let client = apigee_client(global, base_url, org)?;
                let store = LocalCatalogStore::open(&global.root, Platform::Apigee);
                apigee::deploy_latest(
                    &client,
                    &store,
                    &environment,
                    service_account.as_deref(),
                    filter,
                )?
            }
        },
        ApigeeCommands::Products { command } => match command {
            ProductsCommands::Clean { product } => {
                apigee::clean_products(&apigee_client(global, base_url, org)?, product.as_deref())
            }
        },
        ApigeeCommands::Developers { command } => match command {
            DevelopersCommands::Clean { developer_email } => apigee::clean_developers(
                &apigee_client(global, base_url, org)?,
                developer_email.as_deref(),
            ),
        },
    };
    Ok(Completed::Report(report))
}

fn apigee_client(
    global: &GlobalArgs,
    base_url: &str,
    org: String,
) -> Result<ApigeeClient<HttpTransport>> {
    let transport = http_transport(global)?;
    Ok(ApigeeClient::new(transport, org).with_base_url(base_url))
}
