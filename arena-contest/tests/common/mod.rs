#![allow(dead_code)]

use arena_contest::{CommitmentScheme, GameId, GameRegistry, Sha256Scheme};
use arena_core::{AccountId, Amount, ArenaConfig, ManualClock, SimulatedBeacon, Treasury, Vault};
use chrono::Duration;
use std::sync::Arc;

pub const SECRET: &[u8] = b"gamemaster secret";

pub fn account(label: &str) -> AccountId {
    AccountId::from_label(label)
}

pub fn sats(n: u64) -> Amount {
    Amount::from_sat(n)
}

pub struct Arena {
    pub registry: GameRegistry,
    pub clock: Arc<ManualClock>,
    pub beacon: Arc<SimulatedBeacon>,
}

impl Arena {
    /// Registry with `players` each funded with `funding` sats.
    pub fn new(players: &[&str], funding: u64) -> Self {
        let clock = Arc::new(ManualClock::default());
        let beacon = Arc::new(SimulatedBeacon::new(8));
        let mut vault = Vault::new();
        for p in players {
            vault.credit(&account(p), sats(funding)).unwrap();
        }

        let registry =
            GameRegistry::new(ArenaConfig::default(), vault, clock.clone(), beacon.clone())
                .unwrap();

        Self {
            registry,
            clock,
            beacon,
        }
    }

    pub fn gm() -> AccountId {
        account("gm")
    }

    pub fn creator() -> AccountId {
        account("creator")
    }

    /// Create a game and commit to `SECRET`, leaving it open.
    pub fn open_game(&mut self, stake: u64) -> GameId {
        let id = self
            .registry
            .create_game(Self::creator(), Self::gm(), sats(stake))
            .unwrap();
        self.registry
            .commit(Self::gm(), id, Sha256Scheme::commit(SECRET))
            .unwrap();
        id
    }

    pub fn join_all(&mut self, id: GameId, players: &[&str]) {
        let stake = self.registry.game(id).unwrap().stake();
        for p in players {
            self.registry.join(account(p), id, stake).unwrap();
        }
    }

    /// Mine past the checkpoint, capture entropy and reveal.
    pub fn reveal(&mut self, id: GameId) {
        self.beacon.advance(ArenaConfig::default().commit_delay);
        self.registry
            .capture_entropy(Self::gm(), id, "wss://game.example/1")
            .unwrap();
        self.registry.reveal(Self::gm(), id, SECRET).unwrap();
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    pub fn balance(&self, label: &str) -> Amount {
        self.registry.treasury().balance_of(&account(label))
    }

    pub fn escrow(&self) -> Amount {
        self.registry.treasury().escrow_balance()
    }
}
