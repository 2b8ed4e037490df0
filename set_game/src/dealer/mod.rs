//! The dealer: single coordinator of the deck, the grid and every verdict.
//!
//! The dealer thread owns the epoch state (deck, grid, discard count)
//! outright; nothing else mutates it. Players reach the dealer only through
//! the [`ValidationQueue`], and the [`TurnClock`] only through its reshuffle
//! request flag.

pub mod clock;
pub mod queue;

pub use clock::{ClockMode, ClockStrategy, TimerEvent, TurnClock};
pub use queue::ValidationQueue;

use rand::{Rng, seq::SliceRandom};
use serde::Serialize;
use std::{collections::BTreeMap, sync::Arc, thread, time::Duration};

use crate::{
    config::GameConfig,
    display::{DisplayEvent, DisplaySink},
    errors::Result,
    game::{
        board::Board,
        entities::{Card, SeatId, SlotIndex, Verdict},
        oracle::SetOracle,
    },
    lifecycle::{GameControl, WorkerStack},
    player::{AiWorker, PlayerSession, Submission},
};

/// Longest the dealer blocks on the queue before re-checking the clock and
/// the game-over condition
pub const QUEUE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Running high score, updated only by the dealer after applying a verdict
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Leaderboard {
    high_score: u32,
    leaders: usize,
}

impl Leaderboard {
    /// Fold in a seat's score after a verdict
    pub fn record(&mut self, score: u32) {
        if score > self.high_score {
            self.high_score = score;
            self.leaders = 1;
        } else if score == self.high_score {
            self.leaders += 1;
        }
    }

    /// Highest score reached so far
    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    /// Seats that reached the high score
    pub fn leaders(&self) -> usize {
        self.leaders
    }
}

/// Final result of a game
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GameOutcome {
    /// Every seat whose score equals the high score
    pub winners: Vec<SeatId>,
    /// Final score per seat
    pub scores: Vec<u32>,
    /// Highest score reached
    pub high_score: u32,
}

#[derive(Debug)]
struct EpochState {
    deck: Vec<Card>,
    grid: BTreeMap<SlotIndex, Card>,
    discarded: usize,
}

impl EpochState {
    fn grid_cards(&self) -> Vec<Card> {
        self.grid.values().copied().collect()
    }
}

/// Coordinator that deals, judges selections and ends the game
pub struct Dealer {
    config: GameConfig,
    board: Arc<Board>,
    sessions: Vec<Arc<PlayerSession>>,
    queue: Arc<ValidationQueue>,
    clock: Arc<TurnClock>,
    oracle: Arc<dyn SetOracle>,
    display: Arc<dyn DisplaySink>,
    control: Arc<GameControl>,
    epoch: EpochState,
    leaderboard: Leaderboard,
}

impl Dealer {
    /// Build the board, queue, clock and one session per seat.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Config`](crate::GameError::Config) if `config` fails validation.
    pub fn new(
        config: GameConfig,
        oracle: Arc<dyn SetOracle>,
        display: Arc<dyn DisplaySink>,
        control: Arc<GameControl>,
    ) -> Result<Self> {
        config.validate()?;

        let board = Arc::new(Board::new(
            config.table_size(),
            config.players(),
            display.clone(),
        ));
        let queue = Arc::new(ValidationQueue::new());
        let clock = Arc::new(TurnClock::new(
            config.clock_mode(),
            display.clone(),
            queue.clone(),
        ));
        let sessions = (0..config.players())
            .map(|seat| {
                Arc::new(PlayerSession::new(
                    seat,
                    config.is_human(seat),
                    config.feature_size,
                    board.clone(),
                    queue.clone(),
                    display.clone(),
                ))
            })
            .collect();
        let deck = (0..=u32::MAX).take(config.deck_size).map(Card).collect();

        Ok(Self {
            config,
            board,
            sessions,
            queue,
            clock,
            oracle,
            display,
            control,
            epoch: EpochState {
                deck,
                grid: BTreeMap::new(),
                discarded: 0,
            },
            leaderboard: Leaderboard::default(),
        })
    }

    /// Get the shared board
    pub fn board(&self) -> &Arc<Board> {
        &self.board
    }

    /// Get every seat's session, indexed by seat
    pub fn sessions(&self) -> &[Arc<PlayerSession>] {
        &self.sessions
    }

    /// Get the queue seats submit to
    pub fn queue(&self) -> &Arc<ValidationQueue> {
        &self.queue
    }

    /// Get the turn clock
    pub fn clock(&self) -> &Arc<TurnClock> {
        &self.clock
    }

    /// Get the running high score
    pub fn leaderboard(&self) -> Leaderboard {
        self.leaderboard
    }

    /// Cards left in the deck
    pub fn deck_len(&self) -> usize {
        self.epoch.deck.len()
    }

    /// Every card is in the deck, on the grid, or discarded as part of a set
    pub fn cards_accounted_for(&self) -> bool {
        self.epoch.deck.len() + self.epoch.grid.len() + self.epoch.discarded
            == self.config.deck_size
    }

    /// Dealer thread body: deal, start every worker, judge selections until
    /// the game ends, then shut everything down.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Spawn`](crate::GameError::Spawn) if a worker thread
    /// could not be started. Workers already running are stopped first.
    pub fn run(mut self) -> Result<GameOutcome> {
        log::info!(
            "Dealer starting with {} seat(s), clock mode {}",
            self.sessions.len(),
            self.clock.mode()
        );

        self.place_cards_on_table();

        let mut workers = WorkerStack::new();
        if let Err(err) = self.spawn_workers(&mut workers) {
            log::error!("Aborting game: {err}");
            self.control.request_shutdown();
            self.terminate_workers();
            workers.join_all();
            return Err(err);
        }
        self.clock.restart();

        while !self.should_finish() {
            self.step(QUEUE_POLL_INTERVAL);
        }

        let outcome = self.shutdown(&mut workers);
        log::info!("Dealer terminated");
        Ok(outcome)
    }

    /// Spawn order is recorded so shutdown can join in reverse: each computer
    /// worker is retired before its session, and the clock before everyone.
    fn spawn_workers(&self, workers: &mut WorkerStack) -> Result<()> {
        for session in &self.sessions {
            let seat = session.seat();
            let player = session.clone();
            workers.spawn(format!("player-{seat}"), move || player.run())?;

            if let Some(ai) = AiWorker::new(session.clone()) {
                workers.spawn(format!("computer-{seat}"), move || ai.run())?;
            }
        }

        let clock = self.clock.clone();
        workers.spawn("turn-clock", move || clock.run())?;
        Ok(())
    }

    /// Game over: shutdown was requested, or neither the deck nor the grid
    /// holds a legal set.
    pub fn should_finish(&self) -> bool {
        self.control.is_terminated()
            || (self.oracle.find_sets(&self.epoch.deck, 1).is_empty() && !self.grid_has_set())
    }

    fn grid_has_set(&self) -> bool {
        !self
            .oracle
            .find_sets(&self.epoch.grid_cards(), 1)
            .is_empty()
    }

    /// One pass of the main loop: service a reshuffle if one is due, then
    /// judge at most one queued selection.
    pub fn step(&mut self, timeout: Duration) {
        if self.clock.reshuffle_requested() {
            log::info!("Turn timed out");
            self.forced_reshuffle();
        } else if self.clock.mode().is_stopwatch() && !self.grid_has_set() {
            log::info!("No legal set on the table");
            self.forced_reshuffle();
        }

        if let Some(seat) = self.queue.poll(timeout) {
            self.resolve(seat);
        }
    }

    /// Fill every empty slot with a random card from the deck. Moves are
    /// refused while this runs. A short deck leaves slots empty.
    fn place_cards_on_table(&mut self) {
        self.board.set_placement_stable(false);

        let mut rng = rand::rng();
        self.epoch.deck.shuffle(&mut rng);
        for slot in 0..self.config.table_size() {
            if self.epoch.deck.is_empty() {
                break;
            }
            if self.board.card_at(slot).is_some() {
                continue;
            }
            let card = self
                .epoch
                .deck
                .swap_remove(rng.random_range(0..self.epoch.deck.len()));
            self.epoch.grid.insert(slot, card);
            self.board.place_card(card, slot);
        }

        self.board.set_placement_stable(true);
        self.wake_sessions();
        log::debug!(
            "Dealt {} card(s), {} left in the deck",
            self.epoch.grid.len(),
            self.epoch.deck.len()
        );
        if self.config.hints {
            self.log_hints();
        }
    }

    /// Refill slots emptied by a legal set, one at a time
    fn refill_empty_slots(&mut self) {
        let mut rng = rand::rng();
        for slot in 0..self.config.table_size() {
            if self.epoch.deck.is_empty() {
                break;
            }
            if self.board.card_at(slot).is_some() {
                continue;
            }
            let card = self
                .epoch
                .deck
                .swap_remove(rng.random_range(0..self.epoch.deck.len()));
            self.epoch.grid.insert(slot, card);
            self.board.place_card(card, slot);
            thread::sleep(self.config.table_delay());
        }
        self.wake_sessions();
        if self.config.hints {
            self.log_hints();
        }
    }

    /// Let every session re-check whether its computer worker can move again
    fn wake_sessions(&self) {
        for session in &self.sessions {
            session.notify();
        }
    }

    /// Return every dealt card to the deck. Outstanding selections from the
    /// old grid become stale.
    fn remove_all_cards_from_table(&mut self) {
        self.board.set_placement_stable(false);

        for (slot, card) in std::mem::take(&mut self.epoch.grid) {
            self.board.remove_card(slot);
            self.epoch.deck.push(card);
        }
        self.board.advance_generation();

        for session in &self.sessions {
            session.remove_all_tokens();
        }
    }

    /// Reclaim, redeal, restart the clock and re-admit every seat
    pub fn forced_reshuffle(&mut self) {
        self.remove_all_cards_from_table();
        self.place_cards_on_table();
        self.clock.restart();
        for session in &self.sessions {
            session.readmit();
        }
        debug_assert!(self.cards_accounted_for());
        log::info!("Reshuffled, generation {}", self.board.generation());
    }

    /// Cards of a submission if it still matches the grid exactly
    fn current_cards(&self, submission: &Submission) -> Option<Vec<Card>> {
        if submission.generation != self.board.generation()
            || submission.picks.len() != self.config.feature_size
        {
            return None;
        }
        submission
            .picks
            .iter()
            .map(|&(slot, card)| {
                let card = card?;
                (self.board.card_at(slot) == Some(card)).then_some(card)
            })
            .collect()
    }

    /// Judge the selection `seat` queued
    fn resolve(&mut self, seat: SeatId) {
        let Some(session) = self.sessions.get(seat).cloned() else {
            log::warn!("Ignoring unknown seat {seat} in the validation queue");
            return;
        };
        let Some(submission) = session.submission() else {
            log::debug!("Seat {seat} has nothing left to judge");
            return;
        };

        let verdict = match self.current_cards(&submission) {
            None => {
                session.apply_verdict(Verdict::Invalidated, Duration::ZERO);
                Verdict::Invalidated
            }
            Some(cards) if self.oracle.is_legal_set(&cards) => {
                self.remove_set(&cards);
                self.refill_empty_slots();
                let score = session.apply_verdict(Verdict::Scored, self.config.point_freeze());
                self.leaderboard.record(score);
                if !self.clock.mode().is_stopwatch() {
                    self.clock.restart();
                }
                Verdict::Scored
            }
            Some(_) => {
                session.apply_verdict(Verdict::Penalized, self.config.penalty_freeze());
                Verdict::Penalized
            }
        };

        debug_assert!(self.cards_accounted_for());
        log::info!("Seat {seat} {verdict}");
    }

    /// Take a legal set off the grid and out of every seat's selection
    fn remove_set(&mut self, cards: &[Card]) {
        for &card in cards {
            let Some(slot) = self.board.slot_of(card) else {
                continue;
            };
            // Card first, so nobody can mark the slot again in between
            self.board.remove_card(slot);
            self.epoch.grid.remove(&slot);
            self.epoch.discarded += 1;
            for session in &self.sessions {
                session.remove_slot(slot);
            }
        }
    }

    fn terminate_workers(&self) {
        for session in &self.sessions {
            session.terminate();
        }
        self.clock.terminate();
    }

    /// Stop every worker, reclaim the grid, announce winners, then join
    /// workers newest first.
    fn shutdown(&mut self, workers: &mut WorkerStack) -> GameOutcome {
        self.control.request_shutdown();
        self.terminate_workers();
        self.remove_all_cards_from_table();
        let outcome = self.announce_winners();

        let panicked = workers.join_all();
        if !panicked.is_empty() {
            log::error!("Worker(s) panicked: {}", panicked.join(", "));
        }
        outcome
    }

    fn announce_winners(&self) -> GameOutcome {
        let scores: Vec<u32> = self.sessions.iter().map(|s| s.score()).collect();
        let high_score = self.leaderboard.high_score();
        let winners: Vec<SeatId> = scores
            .iter()
            .enumerate()
            .filter(|&(_, &score)| score == high_score)
            .map(|(seat, _)| seat)
            .collect();

        log::info!(
            "{} seat(s) reached the high score of {high_score}",
            self.leaderboard.leaders()
        );
        self.display.publish(DisplayEvent::Winners {
            seats: winners.clone(),
        });

        GameOutcome {
            winners,
            scores,
            high_score,
        }
    }

    /// Slots of every legal set currently on the grid
    pub fn hint_slots(&self) -> Vec<Vec<SlotIndex>> {
        self.oracle
            .find_sets(&self.epoch.grid_cards(), usize::MAX)
            .iter()
            .map(|set| {
                set.iter()
                    .filter_map(|&card| self.board.slot_of(card))
                    .collect()
            })
            .collect()
    }

    fn log_hints(&self) {
        for slots in self.hint_slots() {
            log::info!("Hint: slots {slots:?} form a set");
        }
    }

    /// Lay out specific cards instead of dealing at random
    #[cfg(test)]
    fn deal_exact(&mut self, layout: &[(SlotIndex, Card)]) {
        for &(slot, card) in layout {
            self.epoch.deck.retain(|&c| c != card);
            self.epoch.grid.insert(slot, card);
            self.board.place_card(card, slot);
        }
        self.board.set_placement_stable(true);
    }
}
