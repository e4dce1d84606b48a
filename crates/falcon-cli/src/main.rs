mod cmd;
mod context;
mod output;

use clap::{Parser, Subcommand};
use cmd::{
    board::BoardSubcommand, clients::ClientsSubcommand, config::ConfigSubcommand,
    files::FilesSubcommand, kanban::KanbanSubcommand, orders::OrdersSubcommand,
    prefs::PrefsSubcommand, users::UsersSubcommand, views::ViewsSubcommand,
};
use context::ConnectionArgs;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "falcon",
    about = "Work orders, kanban board and live activity for Falcon appraisal teams",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List, create and update work orders
    Orders {
        #[command(subcommand)]
        subcommand: OrdersSubcommand,
    },

    /// Kanban board: show columns, move cards, follow live changes
    Board {
        #[command(subcommand)]
        subcommand: BoardSubcommand,
    },

    /// Manage clients
    Clients {
        #[command(subcommand)]
        subcommand: ClientsSubcommand,
    },

    /// Assignable users
    Users {
        #[command(subcommand)]
        subcommand: UsersSubcommand,
    },

    /// Order attachments
    Files {
        #[command(subcommand)]
        subcommand: FilesSubcommand,
    },

    /// Activity log of one order
    Activity {
        order: Uuid,
        /// Keep running and print new entries as they happen
        #[arg(long)]
        watch: bool,
    },

    /// Dashboard counters
    Kpis,

    /// Open orders per assignee
    Workload,

    /// My preferences (toasts, default list filters, page size)
    Prefs {
        #[command(subcommand)]
        subcommand: PrefsSubcommand,
    },

    /// Board settings for my organisation
    Kanban {
        #[command(subcommand)]
        subcommand: KanbanSubcommand,
    },

    /// Named list filters stored next to the config file
    Views {
        #[command(subcommand)]
        subcommand: ViewsSubcommand,
    },

    /// Print a notification for every new activity entry
    Notify,

    /// Show, validate or write the connection config
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Notify
        | Commands::Activity { watch: true, .. }
        | Commands::Board {
            subcommand: BoardSubcommand::Watch { .. },
        } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = match context::Context::resolve(&cli.connection) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    };

    let json = cli.json;
    let result = match cli.command {
        Commands::Orders { subcommand } => cmd::orders::run(&ctx, subcommand, json),
        Commands::Board { subcommand } => cmd::board::run(&ctx, subcommand, json),
        Commands::Clients { subcommand } => cmd::clients::run(&ctx, subcommand, json),
        Commands::Users { subcommand } => cmd::users::run(&ctx, subcommand, json),
        Commands::Files { subcommand } => cmd::files::run(&ctx, subcommand, json),
        Commands::Activity { order, watch } => cmd::activity::run(&ctx, order, watch, json),
        Commands::Kpis => cmd::kpis::run(&ctx, json),
        Commands::Workload => cmd::workload::run(&ctx, json),
        Commands::Prefs { subcommand } => cmd::prefs::run(&ctx, subcommand, json),
        Commands::Kanban { subcommand } => cmd::kanban::run(&ctx, subcommand, json),
        Commands::Views { subcommand } => cmd::views::run(&ctx, subcommand, json),
        Commands::Notify => cmd::notify::run(&ctx, json),
        Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand, json),
    };

    if let Err(e) = result {
        // Full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
