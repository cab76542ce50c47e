mod commands;

use arena_contest::{ContestError, ErrorKind};
use arena_core::{ArenaConfig, ArenaError, Storage};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "arena")]
#[command(about = "Staking contest arena with commit-reveal randomness")]
#[command(version)]
struct Cli {
    /// Data directory for the arena database and config
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Acting identity: a label or a 64 character hex account
    #[arg(long = "as", global = true, value_name = "IDENTITY")]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default config and initialise the database
    Init,
    /// Credit an account with sats
    Fund {
        /// Account label or hex id
        account: String,
        /// Amount in satoshis
        sats: u64,
    },
    /// Create a new game as the acting identity
    Create {
        /// Gamemaster label or hex id
        gamemaster: String,
        /// Stake in satoshis
        stake: u64,
    },
    /// Commit the randomness hash and open the game
    Commit {
        game_id: u64,
        /// Commit to this hash instead of generating a secret locally
        #[arg(long)]
        hash: Option<String>,
    },
    /// Capture the beacon sample and publish the game server location
    Capture {
        game_id: u64,
        /// Game server url
        url: String,
    },
    /// Reveal the committed secret
    Reveal {
        game_id: u64,
        /// Secret (hex encoded), defaults to the locally stored one
        #[arg(long)]
        secret: Option<String>,
    },
    /// Join an open game, paying its stake
    Join {
        game_id: u64,
        /// Pay this amount instead of the game stake
        #[arg(long)]
        amount: Option<u64>,
    },
    /// Close a game
    Close { game_id: u64 },
    /// Pay out a closed game to its winners
    Payout {
        game_id: u64,
        /// Winner labels or hex ids
        #[arg(required = true)]
        winners: Vec<String>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Reclaim your stake after the payout timeout
    Withdraw { game_id: u64 },
    /// Advance the simulated entropy beacon
    Mine {
        #[arg(default_value_t = 1)]
        checkpoints: u64,
    },
    /// Show game status
    Status { game_id: u64 },
    /// List games
    List,
    /// Show the event log
    Events {
        #[arg(short, long)]
        game: Option<u64>,
    },
    /// Show an account balance
    Balance { account: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "arena={},arena_core={},arena_contest={}",
            log_level, log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Get data directory
    let data_dir = cli.data_dir.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("arena")
    });

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir).await?;

    let config_path = data_dir.join("arena.json");
    let config = ArenaConfig::load_or_init(&config_path)?;
    let storage = Storage::new(&data_dir.join("arena.db")).await?;
    let mut session = commands::Session::load(&storage, config).await?;
    let actor = cli.actor.as_deref();

    // Execute command
    let result = match cli.command {
        Commands::Init => commands::init(&session, &config_path),
        Commands::Fund { account, sats } => commands::fund(&mut session, &account, sats),
        Commands::Create { gamemaster, stake } => {
            commands::create_game(&mut session, actor, &gamemaster, stake)
        }
        Commands::Commit { game_id, hash } => {
            commands::commit(&mut session, actor, game_id, hash.as_deref()).await
        }
        Commands::Capture { game_id, url } => {
            commands::capture(&mut session, actor, game_id, &url)
        }
        Commands::Reveal { game_id, secret } => {
            commands::reveal(&mut session, actor, game_id, secret.as_deref()).await
        }
        Commands::Join { game_id, amount } => {
            commands::join(&mut session, actor, game_id, amount)
        }
        Commands::Close { game_id } => commands::close(&mut session, actor, game_id),
        Commands::Payout {
            game_id,
            winners,
            yes,
        } => commands::payout(&mut session, actor, game_id, &winners, yes),
        Commands::Withdraw { game_id } => commands::withdraw(&mut session, actor, game_id),
        Commands::Mine { checkpoints } => commands::mine(&session, checkpoints),
        Commands::Status { game_id } => commands::show_status(&session, game_id),
        Commands::List => commands::list_games(&session),
        Commands::Events { game } => commands::show_events(&session, game).await,
        Commands::Balance { account } => commands::show_balance(&session, &account),
    };

    if let Err(e) = result {
        report(&e);
        std::process::exit(1);
    }

    session.save().await?;
    Ok(())
}

fn report(e: &anyhow::Error) {
    if let Some(err) = e.downcast_ref::<ContestError>() {
        match err {
            ContestError::GameNotFound(id) => {
                eprintln!("Error: Game {} not found", id);
                eprintln!("Use 'arena list' to see existing games");
            }
            ContestError::Transfer(ArenaError::InsufficientFunds { need, available })
            | ContestError::Core(ArenaError::InsufficientFunds { need, available }) => {
                eprintln!("Error: Insufficient funds");
                eprintln!("Need: {} sats, Available: {} sats", need, available);
            }
            ContestError::CheckpointNotReached { checkpoint, tip } => {
                eprintln!("Error: Beacon is at checkpoint {}, game needs {}", tip, checkpoint);
                eprintln!("Use 'arena mine' to advance the beacon");
            }
            _ => {
                eprintln!("Error ({}): {}", kind_label(err.kind()), err);
            }
        }
    } else {
        eprintln!("Error: {:#}", e);
    }
}

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Authorization => "authorization",
        ErrorKind::State => "state",
        ErrorKind::Validation => "validation",
        ErrorKind::Arithmetic => "arithmetic",
        ErrorKind::FundTransfer => "fund transfer",
        ErrorKind::Internal => "internal",
    }
}
