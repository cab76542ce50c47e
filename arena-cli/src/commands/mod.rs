use anyhow::{anyhow, bail, Context, Result};
use arena_contest::{
    generate_secret, Game, GameEvent, GameInfo, GameRegistry, HashCommitment,
};
use arena_core::storage::{BeaconStore, EventStore, GameStore, LedgerStore, SecretStore};
use arena_core::{
    AccountId, Amount, ArenaConfig, EntropyBeacon, Hash32, SimulatedBeacon, Storage, SystemClock,
    Treasury,
};
use comfy_table::{presets::UTF8_FULL, Table};
use dialoguer::Confirm;
use std::path::Path;
use std::sync::Arc;

/// Registry loaded from the database for the duration of one command.
pub struct Session<'a> {
    storage: &'a Storage,
    registry: GameRegistry,
    beacon: Arc<SimulatedBeacon>,
}

impl<'a> Session<'a> {
    pub async fn load(storage: &'a Storage, config: ArenaConfig) -> Result<Session<'a>> {
        let game_store = GameStore::new(storage);
        let games: Vec<Game> = game_store
            .list_games::<Game>()
            .await?
            .into_iter()
            .map(|(_, game)| game)
            .collect();
        let next_id = game_store.next_game_id().await?.unwrap_or(1);

        let vault = LedgerStore::new(storage).load_vault().await?;
        let beacon = match BeaconStore::new(storage).load_beacon().await? {
            Some(beacon) => beacon,
            None => SimulatedBeacon::new(config.entropy_retention),
        };
        let beacon = Arc::new(beacon);

        let registry = GameRegistry::restore(
            config,
            vault,
            Arc::new(SystemClock),
            beacon.clone(),
            games,
            next_id,
        )?;

        tracing::debug!(
            "Loaded {} game(s), beacon at checkpoint {}",
            registry.game_count(),
            beacon.tip()
        );

        Ok(Session {
            storage,
            registry,
            beacon,
        })
    }

    /// Persist games, balances, the beacon and any new events in one transaction.
    pub async fn save(&mut self) -> Result<()> {
        let registry = &self.registry;
        let beacon = &self.beacon;
        let games: Vec<(u64, &Game)> = registry.games().map(|g| (g.id(), g)).collect();

        self.storage
            .write_atomically(|tx| {
                GameStore::write_all(tx, &games, registry.next_game_id())?;
                LedgerStore::write_vault(tx, registry.treasury())?;
                BeaconStore::write_beacon(tx, beacon)?;
                for record in registry.events() {
                    EventStore::write_event(
                        tx,
                        record.event.game_id(),
                        record.event.name(),
                        &record.event,
                        record.recorded_at,
                    )?;
                }
                Ok(())
            })
            .await?;

        self.registry.drain_events();
        Ok(())
    }
}

/// A 64 character hex string is taken as an account id, anything else as a label.
pub fn parse_account(input: &str) -> Result<AccountId> {
    let trimmed = input.trim_start_matches("0x");
    if trimmed.len() == 64 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        return Ok(trimmed.parse::<AccountId>()?);
    }

    if input.is_empty() {
        bail!("Account cannot be empty");
    }

    Ok(AccountId::from_label(input))
}

fn actor(actor: Option<&str>) -> Result<AccountId> {
    let label =
        actor.ok_or_else(|| anyhow!("This command needs an identity, pass --as <identity>"))?;
    parse_account(label)
}

pub fn init(session: &Session<'_>, config_path: &Path) -> Result<()> {
    let config = session.registry.config();

    println!("Arena initialised");
    println!("Config: {}", config_path.display());
    println!("Operator: {}", config.operator);
    println!("Operator fee: 1/{} of each pool", config.operator_fee_divisor);
    println!("Creator timeout: {}s", config.creator_timeout.as_secs());
    println!("Payout timeout: {}s", config.payout_timeout.as_secs());
    println!("Beacon tip: {}", session.beacon.tip());

    Ok(())
}

pub fn fund(session: &mut Session<'_>, account: &str, sats: u64) -> Result<()> {
    let account = parse_account(account)?;
    let balance = session
        .registry
        .treasury_mut()
        .credit(&account, Amount::from_sat(sats))?;

    println!("Funded {} with {} sats", account.short(), sats);
    println!("Balance: {} sats", balance.to_sat());
    Ok(())
}

pub fn create_game(
    session: &mut Session<'_>,
    caller: Option<&str>,
    gamemaster: &str,
    stake: u64,
) -> Result<()> {
    let caller = actor(caller)?;
    let gamemaster = parse_account(gamemaster)?;
    let game_id = session
        .registry
        .create_game(caller, gamemaster, Amount::from_sat(stake))?;

    println!("Created game {}", game_id);
    println!("Stake: {} sats", stake);
    println!("Gamemaster: {}", gamemaster);
    println!();
    println!("The gamemaster opens it with:");
    println!("arena --as <gamemaster> commit {}", game_id);
    Ok(())
}

pub async fn commit(
    session: &mut Session<'_>,
    caller: Option<&str>,
    game_id: u64,
    hash: Option<&str>,
) -> Result<()> {
    let caller = actor(caller)?;

    let (hash, secret) = match hash {
        Some(hash) => (hash.parse::<Hash32>()?, None),
        None => {
            let commitment = HashCommitment::new(generate_secret());
            (commitment.hash(), commitment.reveal())
        }
    };

    let checkpoint = session.registry.commit(caller, game_id, hash)?;

    if let Some(secret) = secret {
        SecretStore::new(session.storage)
            .save_secret(game_id, &secret)
            .await
            .context("Failed to store reveal secret")?;
        println!("Generated and stored a reveal secret for game {}", game_id);
    }

    println!("Committed {}", hash);
    println!("Entropy checkpoint: {} (beacon at {})", checkpoint, session.beacon.tip());
    println!("Game {} is open for joining", game_id);
    Ok(())
}

pub fn capture(
    session: &mut Session<'_>,
    caller: Option<&str>,
    game_id: u64,
    url: &str,
) -> Result<()> {
    let caller = actor(caller)?;
    let entropy = session.registry.capture_entropy(caller, game_id, url)?;

    println!("Captured entropy for game {}", game_id);
    println!("Entropy: {}", entropy);
    println!("Server: {}", url);
    Ok(())
}

pub async fn reveal(
    session: &mut Session<'_>,
    caller: Option<&str>,
    game_id: u64,
    secret: Option<&str>,
) -> Result<()> {
    let caller = actor(caller)?;

    let secret = match secret {
        Some(secret) => hex::decode(secret).context("Secret must be hex encoded")?,
        None => SecretStore::new(session.storage)
            .load_secret(game_id)
            .await?
            .ok_or_else(|| anyhow!("No stored secret for game {}, pass --secret", game_id))?,
    };

    let randomness = session.registry.reveal(caller, game_id, &secret)?;

    println!("Revealed game {}", game_id);
    println!("Randomness: {}", randomness);
    Ok(())
}

pub fn join(
    session: &mut Session<'_>,
    caller: Option<&str>,
    game_id: u64,
    amount: Option<u64>,
) -> Result<()> {
    let caller = actor(caller)?;
    let payment = match amount {
        Some(sats) => Amount::from_sat(sats),
        None => session.registry.game(game_id)?.stake(),
    };

    let position = session.registry.join(caller, game_id, payment)?;

    println!("Joined game {} as player #{}", game_id, position + 1);
    println!("Escrowed: {} sats", payment.to_sat());
    Ok(())
}

pub fn close(session: &mut Session<'_>, caller: Option<&str>, game_id: u64) -> Result<()> {
    let caller = actor(caller)?;
    let map_size = session.registry.close(caller, game_id)?;

    println!("Closed game {}", game_id);
    println!("Map size: {}", map_size);
    Ok(())
}

pub fn payout(
    session: &mut Session<'_>,
    caller: Option<&str>,
    game_id: u64,
    winners: &[String],
    yes: bool,
) -> Result<()> {
    let caller = actor(caller)?;
    let winners = winners
        .iter()
        .map(|w| parse_account(w))
        .collect::<Result<Vec<_>>>()?;

    if !yes {
        let pool = session.registry.game(game_id)?.ledger().pool()?;
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Pay out {} sats from game {} to {} winner(s)?",
                pool.to_sat(),
                game_id,
                winners.len()
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Payout cancelled");
            return Ok(());
        }
    }

    let plan = session.registry.payout(caller, game_id, &winners)?;

    println!("Paid out game {}", game_id);
    println!("Pool: {} sats", plan.pool.to_sat());
    println!("Operator cut: {} sats", plan.operator_cut.to_sat());
    for winner in &plan.winners {
        println!("  {} <- {} sats", winner.short(), plan.per_winner.to_sat());
    }
    if plan.remainder > Amount::ZERO {
        println!("Left in escrow: {} sats", plan.remainder.to_sat());
    }
    Ok(())
}

pub fn withdraw(session: &mut Session<'_>, caller: Option<&str>, game_id: u64) -> Result<()> {
    let caller = actor(caller)?;
    let amount = session.registry.withdraw(caller, game_id)?;

    println!("Withdrew {} sats from game {}", amount.to_sat(), game_id);
    Ok(())
}

pub fn mine(session: &Session<'_>, checkpoints: u64) -> Result<()> {
    let tip = session.beacon.advance(checkpoints);
    println!("Beacon advanced to checkpoint {}", tip);
    Ok(())
}

pub fn show_status(session: &Session<'_>, game_id: u64) -> Result<()> {
    let info = session.registry.info(game_id)?;
    print_status(&info);
    Ok(())
}

fn print_status(info: &GameInfo) {
    println!("Game {}", info.id);
    println!("Phase: {}", phase(info));
    println!("Creator: {}", info.creator);
    println!("Gamemaster: {}", info.gamemaster);
    println!("Stake: {} sats", info.stake.to_sat());
    if let Some(opened_at) = info.opened_at {
        println!("Opened: {}", opened_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(closed_at) = info.closed_at {
        println!("Closed: {}", closed_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(map_size) = info.map_size {
        println!("Map size: {}", map_size);
    }
    println!();

    println!("Randomness:");
    if let Some(hash) = info.committed_hash {
        println!("  Commitment: {}", hash);
    }
    if let Some(checkpoint) = info.commit_checkpoint {
        println!("  Checkpoint: {}", checkpoint);
    }
    if let Some(entropy) = info.captured_entropy {
        println!("  Entropy: {}", entropy);
    }
    if let Some(secret) = &info.reveal_secret {
        println!("  Secret: {}", secret);
    }
    if let Some(randomness) = info.derived_randomness {
        println!("  Result: {}", randomness);
    }
    if let Some(url) = &info.server_url {
        println!("  Server: {}", url);
    }
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Player", "Winner", "Withdrawn"]);
    for (i, player) in info.players.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            player.to_string(),
            yes_no(info.winners.contains(player)).to_string(),
            yes_no(info.withdrawn.contains(player)).to_string(),
        ]);
    }
    println!("{}", table);

    if let Some(per_winner) = info.payout_per_winner {
        println!("Paid {} sats per winner", per_winner.to_sat());
    }
}

pub fn list_games(session: &Session<'_>) -> Result<()> {
    if session.registry.game_count() == 0 {
        println!("No games yet");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["ID", "Phase", "Stake", "Players", "Gamemaster", "Creator"]);

    for game in session.registry.games() {
        let info = game.info();
        table.add_row(vec![
            info.id.to_string(),
            phase(&info).to_string(),
            format!("{} sats", info.stake.to_sat()),
            info.players.len().to_string(),
            info.gamemaster.short(),
            info.creator.short(),
        ]);
    }

    println!("{}", table);
    Ok(())
}

pub async fn show_events(session: &Session<'_>, game_id: Option<u64>) -> Result<()> {
    let events = EventStore::new(session.storage)
        .list::<GameEvent>(game_id)
        .await?;

    if events.is_empty() {
        println!("No events");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Seq", "Game", "Event", "Recorded", "Detail"]);

    for stored in events {
        table.add_row(vec![
            stored.seq.to_string(),
            stored.game_id.to_string(),
            stored.kind,
            stored.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            detail(&stored.event),
        ]);
    }

    println!("{}", table);
    Ok(())
}

pub fn show_balance(session: &Session<'_>, account: &str) -> Result<()> {
    let account = parse_account(account)?;
    let treasury = session.registry.treasury();

    println!("Account: {}", account);
    println!("Balance: {} sats", treasury.balance_of(&account).to_sat());
    println!("Escrow (all games): {} sats", treasury.escrow_balance().to_sat());

    let games = session.registry.games_for_player(&account);
    if !games.is_empty() {
        let ids: Vec<String> = games.iter().map(u64::to_string).collect();
        println!("Playing in: {}", ids.join(", "));
    }
    Ok(())
}

fn phase(info: &GameInfo) -> &'static str {
    if info.has_paid_out {
        "paid out"
    } else if info.withdrawal_mode_active {
        "withdrawing"
    } else if info.has_closed {
        if info.has_revealed {
            "closed, revealed"
        } else {
            "closed"
        }
    } else if info.has_opened {
        "open"
    } else {
        "created"
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        ""
    }
}

fn detail(event: &GameEvent) -> String {
    match event {
        GameEvent::GameCreated {
            gamemaster, stake, ..
        } => format!("gm {} stake {}", gamemaster.short(), stake.to_sat()),
        GameEvent::HashCommitted {
            hash, checkpoint, ..
        } => format!("{} @ {}", short_hash(hash), checkpoint),
        GameEvent::GameOpened { .. } => String::new(),
        GameEvent::EntropyCaptured {
            entropy,
            server_url,
            ..
        } => format!("{} {}", short_hash(entropy), server_url),
        GameEvent::HashRevealed { randomness, .. } => short_hash(randomness),
        GameEvent::PlayerJoined {
            player, position, ..
        } => format!("{} #{}", player.short(), position + 1),
        GameEvent::GameClosed { map_size, .. } => format!("map {}", map_size),
        GameEvent::PayoutCompleted {
            winners,
            per_winner,
            ..
        } => format!("{} x {} sats", winners.len(), per_winner.to_sat()),
        GameEvent::WithdrawalPeriodStarted { .. } => String::new(),
        GameEvent::PlayerWithdrew { player, amount, .. } => {
            format!("{} {} sats", player.short(), amount.to_sat())
        }
    }
}

fn short_hash(hash: &Hash32) -> String {
    hash.to_string().chars().take(12).collect()
}
