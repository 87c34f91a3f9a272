use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::Context;

const DEFAULT_LOG_FILTER: &str = "info,convoy=debug";

#[derive(Parser)]
#[command(
    name = "convoy",
    about = "Convoy: app rollout and routing control plane",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to convoy.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// State directory (overrides [state].path in the config)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the desired-state descriptor for a buildpack droplet.
    ///
    /// The droplet checksum is taken from --checksum-value, or computed
    /// as sha256 over --droplet-file when no value is given.
    Descriptor {
        #[arg(long)]
        stack: String,
        #[arg(long)]
        droplet_uri: String,
        #[arg(long)]
        process_guid: String,
        #[arg(long)]
        droplet_hash: Option<String>,
        #[arg(long, default_value = "sha256")]
        checksum_algorithm: String,
        #[arg(long)]
        checksum_value: Option<String>,
        #[arg(long)]
        droplet_file: Option<PathBuf>,
        /// Exposed port; repeat for several (default: 8080)
        #[arg(short, long = "port")]
        ports: Vec<u16>,
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Validate buildpack lifecycle data and print its summary
    Lifecycle {
        #[arg(long)]
        app_guid: Option<String>,
        #[arg(long)]
        build_guid: Option<String>,
        #[arg(long)]
        droplet_guid: Option<String>,
        /// Admin buildpack name or buildpack URL
        #[arg(long)]
        buildpack: Option<String>,
        #[arg(long)]
        stack: Option<String>,
    },
    /// Inspect and clean up deployments
    Deployments {
        #[command(subcommand)]
        action: DeploymentsAction,
    },
    /// Manage route bindings
    Routes {
        #[command(subcommand)]
        action: RoutesAction,
    },
}

#[derive(Subcommand)]
enum DeploymentsAction {
    /// List deployments, filtered and paginated
    List {
        #[arg(long, value_delimiter = ',')]
        app_guids: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        states: Vec<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = convoy_rollout::list::DEFAULT_PER_PAGE)]
        per_page: u32,
        /// created_at or updated_at, prefix with '-' for descending
        #[arg(long, default_value = "created_at")]
        order_by: String,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Processes that took part in a deployment
    History { deployment_id: String },
    /// Delete a deployment and its history
    Destroy { deployment_id: String },
}

#[derive(Subcommand)]
enum RoutesAction {
    /// Remove route bindings, one transaction per binding
    Unmap {
        #[arg(required = true)]
        binding_ids: Vec<String>,
        #[arg(long, default_value = "convoy-cli")]
        user_guid: String,
        #[arg(long)]
        user_email: Option<String>,
        #[arg(long)]
        manifest_triggered: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let ctx = Context::load(cli.config.as_deref(), cli.data_dir)?;

    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => tracing_subscriber::EnvFilter::try_new(
            ctx.config.logging_filter().unwrap_or(DEFAULT_LOG_FILTER),
        )?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Descriptor {
            stack,
            droplet_uri,
            process_guid,
            droplet_hash,
            checksum_algorithm,
            checksum_value,
            droplet_file,
            ports,
            pretty,
        } => commands::descriptor::print(
            &ctx,
            commands::descriptor::DropletArgs {
                stack,
                droplet_uri,
                process_guid,
                droplet_hash,
                checksum_algorithm,
                checksum_value,
                droplet_file,
                ports,
            },
            pretty,
        ),
        Commands::Lifecycle {
            app_guid,
            build_guid,
            droplet_guid,
            buildpack,
            stack,
        } => commands::lifecycle::show(commands::lifecycle::LifecycleArgs {
            app_guid,
            build_guid,
            droplet_guid,
            buildpack,
            stack,
        }),
        Commands::Deployments { action } => match action {
            DeploymentsAction::List {
                app_guids,
                states,
                page,
                per_page,
                order_by,
                format,
            } => commands::deployments::list(
                &ctx,
                commands::deployments::ListArgs {
                    app_guids,
                    states,
                    page,
                    per_page,
                    order_by,
                },
                &format,
            ),
            DeploymentsAction::History { deployment_id } => {
                commands::deployments::history(&ctx, &deployment_id)
            }
            DeploymentsAction::Destroy { deployment_id } => {
                commands::deployments::destroy(&ctx, &deployment_id)
            }
        },
        Commands::Routes { action } => match action {
            RoutesAction::Unmap {
                binding_ids,
                user_guid,
                user_email,
                manifest_triggered,
            } => commands::routes::unmap(
                &ctx,
                &binding_ids,
                convoy_state::UserAuditInfo {
                    user_guid,
                    user_email,
                    user_name: None,
                },
                manifest_triggered,
            ),
        },
    }
}
