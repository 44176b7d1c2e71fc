use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "life-assistant")]
#[command(about = "Personal life assistant - tasks, schedule and grocery spending", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Account management
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Food catalogue
    Food {
        #[command(subcommand)]
        action: commands::food::FoodAction,
    },
    /// Shopping cart
    Cart {
        #[command(subcommand)]
        action: commands::food::CartAction,
    },
    /// Order history and checkout
    Order {
        #[command(subcommand)]
        action: commands::food::OrderAction,
    },
    /// Spending statistics
    Spending {
        #[command(subcommand)]
        action: commands::spending::SpendingAction,
    },
    /// Follow realtime task changes
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_max_level(Level::WARN)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Auth { action } => commands::auth::run(action).await,
        Commands::Task { action } => commands::task::run(action).await,
        Commands::Food { action } => commands::food::run_food(action).await,
        Commands::Cart { action } => commands::food::run_cart(action).await,
        Commands::Order { action } => commands::food::run_order(action).await,
        Commands::Spending { action } => commands::spending::run(action).await,
        Commands::Watch => commands::watch::run().await,
    }
}
