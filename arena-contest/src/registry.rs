use crate::event::{EventRecord, GameEvent};
use crate::game::{Game, GameInfo};
use crate::map::MapSeed;
use crate::payout::PayoutPlan;
use crate::timeout::TimeoutGuard;
use crate::{ContestError, GameId, Result};
use arena_core::{
    AccountId, Amount, ArenaConfig, Clock, EntropyBeacon, Hash32, Treasury, Vault,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Owns every game and the escrow behind them.
///
/// Each operation runs against a staged copy of the game (and of the treasury
/// when funds move) and is committed only if the whole call succeeds.
pub struct GameRegistry<T: Treasury + Clone = Vault> {
    config: ArenaConfig,
    guard: TimeoutGuard,
    games: BTreeMap<GameId, Game>,
    next_id: GameId,
    treasury: T,
    clock: Arc<dyn Clock>,
    beacon: Arc<dyn EntropyBeacon>,
    events: Vec<EventRecord>,
}

impl<T: Treasury + Clone> GameRegistry<T> {
    pub fn new(
        config: ArenaConfig,
        treasury: T,
        clock: Arc<dyn Clock>,
        beacon: Arc<dyn EntropyBeacon>,
    ) -> Result<Self> {
        Self::restore(config, treasury, clock, beacon, Vec::new(), 1)
    }

    /// Rebuild a registry from persisted games. `next_id` is bumped past every known id.
    pub fn restore(
        config: ArenaConfig,
        treasury: T,
        clock: Arc<dyn Clock>,
        beacon: Arc<dyn EntropyBeacon>,
        games: Vec<Game>,
        next_id: GameId,
    ) -> Result<Self> {
        config.validate()?;

        let games: BTreeMap<GameId, Game> = games.into_iter().map(|g| (g.id(), g)).collect();
        let floor = games.keys().next_back().map_or(1, |id| id + 1);

        Ok(Self {
            guard: TimeoutGuard::new(config.creator_timeout, config.payout_timeout),
            config,
            games,
            next_id: next_id.max(floor),
            treasury,
            clock,
            beacon,
            events: Vec::new(),
        })
    }

    pub fn create_game(
        &mut self,
        caller: AccountId,
        gamemaster: AccountId,
        stake: Amount,
    ) -> Result<GameId> {
        let id = self.next_id;
        let next_id = id
            .checked_add(1)
            .ok_or_else(|| ContestError::Overflow("game id".to_string()))?;

        let game = Game::new(
            id,
            caller,
            gamemaster,
            stake,
            self.config.operator_fee_divisor,
            self.clock.now(),
        )?;

        self.next_id = next_id;
        self.apply(
            game,
            vec![GameEvent::GameCreated {
                game_id: id,
                creator: caller,
                gamemaster,
                stake,
            }],
        );

        tracing::info!(
            "Created game {} (gamemaster {}, stake {} sats)",
            id,
            gamemaster.short(),
            stake.to_sat()
        );
        Ok(id)
    }

    /// Commit the randomness hash and open the game.
    ///
    /// Returns the beacon checkpoint the game is bound to.
    pub fn commit(&mut self, caller: AccountId, game_id: GameId, hash: Hash32) -> Result<u64> {
        let checkpoint = self
            .beacon
            .tip()
            .checked_add(self.config.commit_delay)
            .ok_or_else(|| ContestError::Overflow("commit checkpoint".to_string()))?;

        let mut game = self.staged(game_id)?;
        let events = game.commit(caller, hash, checkpoint, self.clock.now())?;
        self.apply(game, events);

        tracing::info!(
            "Game {} committed to checkpoint {} and opened",
            game_id,
            checkpoint
        );
        Ok(checkpoint)
    }

    pub fn capture_entropy(
        &mut self,
        caller: AccountId,
        game_id: GameId,
        server_url: &str,
    ) -> Result<Hash32> {
        let mut game = self.staged(game_id)?;
        let events = game.capture_entropy(caller, server_url, self.beacon.as_ref())?;
        let entropy = game
            .commit_reveal()
            .entropy()
            .ok_or_else(|| ContestError::invalid_state("entropy missing after capture"))?;
        self.apply(game, events);

        tracing::info!("Game {} captured entropy {}", game_id, entropy);
        Ok(entropy)
    }

    pub fn reveal(&mut self, caller: AccountId, game_id: GameId, secret: &[u8]) -> Result<Hash32> {
        let mut game = self.staged(game_id)?;
        let events = game.reveal(caller, secret, self.beacon.as_ref())?;
        let randomness = game
            .commit_reveal()
            .randomness()
            .ok_or_else(|| ContestError::invalid_state("randomness missing after reveal"))?;
        self.apply(game, events);

        tracing::info!("Game {} revealed randomness {}", game_id, randomness);
        Ok(randomness)
    }

    /// Join with `payment`, which is escrowed from the caller's account. Returns the join position.
    pub fn join(&mut self, caller: AccountId, game_id: GameId, payment: Amount) -> Result<usize> {
        let mut game = self.staged(game_id)?;
        let events = game.join(caller, payment)?;
        let position = game.players().len() - 1;

        let mut treasury = self.treasury.clone();
        treasury
            .collect(&caller, payment)
            .map_err(ContestError::transfer)?;

        self.treasury = treasury;
        self.apply(game, events);

        tracing::info!(
            "Player {} joined game {} at position {}",
            caller.short(),
            game_id,
            position
        );
        Ok(position)
    }

    /// Close the game. Returns the frozen map size.
    pub fn close(&mut self, caller: AccountId, game_id: GameId) -> Result<u64> {
        let mut game = self.staged(game_id)?;
        let events = game.close(caller, self.clock.now(), &self.guard)?;
        let map_size = game
            .map_size()
            .ok_or_else(|| ContestError::invalid_state("map size missing after close"))?;
        self.apply(game, events);

        tracing::info!("Game {} closed with map size {}", game_id, map_size);
        Ok(map_size)
    }

    /// Pay the operator cut and every winner. Any failed transfer undoes the whole settlement.
    pub fn payout(
        &mut self,
        caller: AccountId,
        game_id: GameId,
        winners: &[AccountId],
    ) -> Result<PayoutPlan> {
        let mut game = self.staged(game_id)?;
        let plan = game
            .settle_payout(caller, winners)
            .inspect_err(|e| tracing::warn!("Payout for game {} rejected: {}", game_id, e))?;

        // settlement is recorded before any transfer is issued
        let previous = self.games.insert(game_id, game);

        let mut treasury = self.treasury.clone();
        if let Err(e) = disburse_plan(&mut treasury, &self.config.operator, &plan) {
            tracing::warn!("Payout for game {} rolled back: {}", game_id, e);
            if let Some(previous) = previous {
                self.games.insert(game_id, previous);
            }
            return Err(e);
        }

        self.treasury = treasury;
        self.record(GameEvent::PayoutCompleted {
            game_id,
            winners: plan.winners.clone(),
            per_winner: plan.per_winner,
        });

        tracing::info!(
            "Game {} paid {} sats to {} winner(s), cut {} sats, {} sats left in escrow",
            game_id,
            plan.per_winner.to_sat(),
            plan.winners.len(),
            plan.operator_cut.to_sat(),
            plan.remainder.to_sat()
        );
        Ok(plan)
    }

    /// Reclaim the caller's stake after the payout timeout. Returns the amount returned.
    pub fn withdraw(&mut self, caller: AccountId, game_id: GameId) -> Result<Amount> {
        let mut game = self.staged(game_id)?;
        let (withdrawal, events) = game
            .withdraw(caller, self.clock.now(), &self.guard)
            .inspect_err(|e| tracing::warn!("Withdrawal from game {} rejected: {}", game_id, e))?;

        // the per-player marker is recorded before the transfer is issued
        let previous = self.games.insert(game_id, game);

        let mut treasury = self.treasury.clone();
        if let Err(e) = treasury.disburse(&caller, withdrawal.amount) {
            tracing::warn!("Withdrawal from game {} rolled back: {}", game_id, e);
            if let Some(previous) = previous {
                self.games.insert(game_id, previous);
            }
            return Err(ContestError::transfer(e));
        }

        self.treasury = treasury;
        for event in events {
            self.record(event);
        }

        if withdrawal.started_withdrawal_mode {
            tracing::info!("Game {} entered withdrawal mode", game_id);
        }
        tracing::info!(
            "Player {} withdrew {} sats from game {}",
            caller.short(),
            withdrawal.amount.to_sat(),
            game_id
        );
        Ok(withdrawal.amount)
    }

    pub fn game(&self, game_id: GameId) -> Result<&Game> {
        self.games
            .get(&game_id)
            .ok_or(ContestError::GameNotFound(game_id))
    }

    pub fn info(&self, game_id: GameId) -> Result<GameInfo> {
        self.game(game_id).map(Game::info)
    }

    pub fn players(&self, game_id: GameId) -> Result<&[AccountId]> {
        self.game(game_id).map(Game::players)
    }

    pub fn map_seed(&self, game_id: GameId) -> Result<MapSeed> {
        self.game(game_id)?.map_seed()
    }

    /// A game id is valid once it has been allocated to a game with a gamemaster.
    pub fn is_valid_game(&self, game_id: GameId) -> bool {
        self.games
            .get(&game_id)
            .is_some_and(|g| !g.gamemaster().is_zero())
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    pub fn games(&self) -> impl Iterator<Item = &Game> {
        self.games.values()
    }

    pub fn games_for_player(&self, account: &AccountId) -> Vec<GameId> {
        self.games
            .values()
            .filter(|g| g.ledger().contains(account))
            .map(Game::id)
            .collect()
    }

    pub fn next_game_id(&self) -> GameId {
        self.next_id
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn beacon(&self) -> &Arc<dyn EntropyBeacon> {
        &self.beacon
    }

    pub fn treasury(&self) -> &T {
        &self.treasury
    }

    /// Direct treasury access for funding accounts outside of any game.
    pub fn treasury_mut(&mut self) -> &mut T {
        &mut self.treasury
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Take every event recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.events)
    }

    fn staged(&self, game_id: GameId) -> Result<Game> {
        self.games
            .get(&game_id)
            .cloned()
            .ok_or(ContestError::GameNotFound(game_id))
    }

    fn apply(&mut self, game: Game, events: Vec<GameEvent>) {
        self.games.insert(game.id(), game);
        for event in events {
            self.record(event);
        }
    }

    fn record(&mut self, event: GameEvent) {
        tracing::debug!("Event {} for game {}", event.name(), event.game_id());
        self.events.push(EventRecord {
            recorded_at: self.clock.now(),
            event,
        });
    }
}

fn disburse_plan<T: Treasury>(
    treasury: &mut T,
    operator: &AccountId,
    plan: &PayoutPlan,
) -> Result<()> {
    if plan.operator_cut > Amount::ZERO {
        treasury
            .disburse(operator, plan.operator_cut)
            .map_err(ContestError::transfer)?;
    }

    for winner in &plan.winners {
        treasury
            .disburse(winner, plan.per_winner)
            .map_err(ContestError::transfer)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::{CommitmentScheme, Sha256Scheme};
    use crate::ErrorKind;
    use arena_core::{ManualClock, SimulatedBeacon};
    use chrono::Utc;

    struct Fixture {
        registry: GameRegistry,
        beacon: Arc<SimulatedBeacon>,
    }

    fn account(label: &str) -> AccountId {
        AccountId::from_label(label)
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let beacon = Arc::new(SimulatedBeacon::new(16));
        let mut vault = Vault::new();
        for p in ["p1", "p2", "p3"] {
            vault.credit(&account(p), Amount::from_sat(10_000)).unwrap();
        }

        let registry =
            GameRegistry::new(ArenaConfig::default(), vault, clock, beacon.clone()).unwrap();
        Fixture { registry, beacon }
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let mut fx = fixture();
        let a = fx
            .registry
            .create_game(account("creator"), account("gm"), Amount::from_sat(1_000))
            .unwrap();
        let b = fx
            .registry
            .create_game(account("creator"), account("gm"), Amount::from_sat(1_000))
            .unwrap();
        assert_eq!((a, b), (1, 2));
        assert!(fx.registry.is_valid_game(1));
        assert!(!fx.registry.is_valid_game(3));
    }

    #[test]
    fn test_rejected_create_does_not_consume_id() {
        let mut fx = fixture();
        let err = fx
            .registry
            .create_game(account("creator"), AccountId::ZERO, Amount::from_sat(1_000))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(fx.registry.next_game_id(), 1);
        assert_eq!(fx.registry.game_count(), 0);
        assert!(fx.registry.events().is_empty());
    }

    #[test]
    fn test_unknown_game_is_validation_error() {
        let mut fx = fixture();
        let err = fx
            .registry
            .join(account("p1"), 42, Amount::from_sat(1_000))
            .unwrap_err();
        assert!(matches!(err, ContestError::GameNotFound(42)));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_commit_binds_next_checkpoint() {
        let mut fx = fixture();
        let id = fx
            .registry
            .create_game(account("creator"), account("gm"), Amount::from_sat(1_000))
            .unwrap();
        fx.beacon.advance(4);

        let checkpoint = fx
            .registry
            .commit(account("gm"), id, Sha256Scheme::commit(b"s"))
            .unwrap();
        assert_eq!(checkpoint, fx.beacon.tip() + 1);

        let names: Vec<&str> = fx
            .registry
            .events()
            .iter()
            .map(|r| r.event.name())
            .collect();
        assert_eq!(names, vec!["GameCreated", "HashCommitted", "GameOpened"]);
    }

    #[test]
    fn test_join_without_funds_changes_nothing() {
        let mut fx = fixture();
        let id = fx
            .registry
            .create_game(account("creator"), account("gm"), Amount::from_sat(1_000))
            .unwrap();
        fx.registry
            .commit(account("gm"), id, Sha256Scheme::commit(b"s"))
            .unwrap();

        let err = fx
            .registry
            .join(account("broke"), id, Amount::from_sat(1_000))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FundTransfer);
        assert!(fx.registry.players(id).unwrap().is_empty());
        assert_eq!(fx.registry.treasury().escrow_balance(), Amount::ZERO);
    }

    #[test]
    fn test_join_escrows_stake() {
        let mut fx = fixture();
        let id = fx
            .registry
            .create_game(account("creator"), account("gm"), Amount::from_sat(1_000))
            .unwrap();
        fx.registry
            .commit(account("gm"), id, Sha256Scheme::commit(b"s"))
            .unwrap();

        assert_eq!(
            fx.registry
                .join(account("p1"), id, Amount::from_sat(1_000))
                .unwrap(),
            0
        );
        assert_eq!(
            fx.registry.treasury().balance_of(&account("p1")),
            Amount::from_sat(9_000)
        );
        assert_eq!(fx.registry.treasury().escrow_balance(), Amount::from_sat(1_000));
        assert_eq!(fx.registry.games_for_player(&account("p1")), vec![id]);
    }

    #[test]
    fn test_restore_never_reuses_ids() {
        let fx = fixture();
        let game = Game::new(
            7,
            account("creator"),
            account("gm"),
            Amount::from_sat(10),
            100,
            Utc::now(),
        )
        .unwrap();

        let restored = GameRegistry::restore(
            ArenaConfig::default(),
            Vault::new(),
            Arc::new(ManualClock::default()),
            fx.beacon.clone(),
            vec![game],
            3,
        )
        .unwrap();
        assert_eq!(restored.next_game_id(), 8);
    }
}
