//! The shared grid of dealt cards and player tokens.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use super::entities::{Card, SeatId, SlotIndex};
use crate::display::{DisplayEvent, DisplaySink};

#[derive(Debug)]
struct Grid {
    slot_to_card: Vec<Option<Card>>,
    card_to_slot: HashMap<Card, SlotIndex>,
    /// `tokens[seat][slot]`
    tokens: Vec<Vec<bool>>,
}

/// Slot/card and seat/token bookkeeping.
///
/// Every mutation happens under one lock, so mutations of the same slot are
/// linearizable no matter which thread issues them.
pub struct Board {
    grid: Mutex<Grid>,
    /// False while the dealer is dealing or reclaiming cards.
    placement_stable: AtomicBool,
    /// Advanced on every full reclaim of the grid.
    generation: AtomicU64,
    display: Arc<dyn DisplaySink>,
}

impl Board {
    pub fn new(slots: usize, seats: usize, display: Arc<dyn DisplaySink>) -> Self {
        Self {
            grid: Mutex::new(Grid {
                slot_to_card: vec![None; slots],
                card_to_slot: HashMap::new(),
                tokens: vec![vec![false; slots]; seats],
            }),
            placement_stable: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            display,
        }
    }

    fn grid(&self) -> MutexGuard<'_, Grid> {
        self.grid.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Place `card` on an empty slot. Returns false if the slot is occupied or
    /// out of range.
    pub fn place_card(&self, card: Card, slot: SlotIndex) -> bool {
        let mut grid = self.grid();
        let Some(cell) = grid.slot_to_card.get_mut(slot) else {
            return false;
        };
        if cell.is_some() {
            return false;
        }
        *cell = Some(card);
        grid.card_to_slot.insert(card, slot);
        drop(grid);

        self.display.publish(DisplayEvent::PlaceCard { card, slot });
        true
    }

    /// Take the card off `slot`, dropping any tokens still on it.
    pub fn remove_card(&self, slot: SlotIndex) -> Option<Card> {
        let mut grid = self.grid();
        let card = grid.slot_to_card.get_mut(slot)?.take()?;
        grid.card_to_slot.remove(&card);

        let mut dropped = Vec::new();
        for (seat, tokens) in grid.tokens.iter_mut().enumerate() {
            if std::mem::take(&mut tokens[slot]) {
                dropped.push(seat);
            }
        }
        drop(grid);

        for seat in dropped {
            self.display
                .publish(DisplayEvent::RemoveToken { seat, slot });
        }
        self.display.publish(DisplayEvent::RemoveCard { slot });
        Some(card)
    }

    /// Mark `slot` for `seat`. Fails if the slot holds no card or is already
    /// marked by this seat.
    pub fn place_token(&self, seat: SeatId, slot: SlotIndex) -> bool {
        let mut grid = self.grid();
        if !matches!(grid.slot_to_card.get(slot), Some(Some(_))) {
            return false;
        }
        let Some(token) = grid.tokens.get_mut(seat).and_then(|t| t.get_mut(slot)) else {
            return false;
        };
        if *token {
            return false;
        }
        *token = true;
        drop(grid);

        self.display.publish(DisplayEvent::PlaceToken { seat, slot });
        true
    }

    pub fn remove_token(&self, seat: SeatId, slot: SlotIndex) -> bool {
        let mut grid = self.grid();
        let Some(token) = grid.tokens.get_mut(seat).and_then(|t| t.get_mut(slot)) else {
            return false;
        };
        if !std::mem::take(token) {
            return false;
        }
        drop(grid);

        self.display
            .publish(DisplayEvent::RemoveToken { seat, slot });
        true
    }

    pub fn card_at(&self, slot: SlotIndex) -> Option<Card> {
        self.grid().slot_to_card.get(slot).copied().flatten()
    }

    pub fn slot_of(&self, card: Card) -> Option<SlotIndex> {
        self.grid().card_to_slot.get(&card).copied()
    }

    pub fn count_dealt(&self) -> usize {
        self.grid().card_to_slot.len()
    }

    /// Every dealt card with its slot, in slot order
    pub fn dealt(&self) -> Vec<(SlotIndex, Card)> {
        self.grid()
            .slot_to_card
            .iter()
            .enumerate()
            .filter_map(|(slot, card)| card.map(|card| (slot, card)))
            .collect()
    }

    /// Slots currently marked by `seat`, in slot order
    pub fn tokens_of(&self, seat: SeatId) -> Vec<SlotIndex> {
        self.grid()
            .tokens
            .get(seat)
            .map(|tokens| {
                tokens
                    .iter()
                    .enumerate()
                    .filter_map(|(slot, &marked)| marked.then_some(slot))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn placement_stable(&self) -> bool {
        self.placement_stable.load(Ordering::Acquire)
    }

    /// Whether a move could land right now: dealing is over and some slot
    /// holds a card
    pub fn accepts_moves(&self) -> bool {
        self.placement_stable() && self.count_dealt() > 0
    }

    pub fn set_placement_stable(&self, stable: bool) {
        self.placement_stable.store(stable, Ordering::Release);
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn advance_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::EventRecorder;

    fn board() -> (Board, Arc<EventRecorder>) {
        let recorder = Arc::new(EventRecorder::new());
        (Board::new(4, 2, recorder.clone()), recorder)
    }

    #[test]
    fn test_place_and_remove_card() {
        let (board, _) = board();
        assert!(board.place_card(Card(7), 2));
        assert!(!board.place_card(Card(8), 2), "slot already occupied");
        assert!(!board.place_card(Card(8), 9), "slot out of range");

        assert_eq!(board.card_at(2), Some(Card(7)));
        assert_eq!(board.slot_of(Card(7)), Some(2));
        assert_eq!(board.count_dealt(), 1);

        assert_eq!(board.remove_card(2), Some(Card(7)));
        assert_eq!(board.card_at(2), None);
        assert_eq!(board.slot_of(Card(7)), None);
        assert_eq!(board.remove_card(2), None);
    }

    #[test]
    fn test_token_requires_card() {
        let (board, _) = board();
        assert!(!board.place_token(0, 1));

        board.place_card(Card(3), 1);
        assert!(board.place_token(0, 1));
        assert!(!board.place_token(0, 1), "already marked");
        assert!(board.place_token(1, 1));
        assert_eq!(board.tokens_of(0), vec![1]);

        assert!(board.remove_token(0, 1));
        assert!(!board.remove_token(0, 1));
        assert!(board.tokens_of(0).is_empty());
    }

    #[test]
    fn test_remove_card_drops_tokens() {
        let (board, recorder) = board();
        board.place_card(Card(3), 0);
        board.place_token(0, 0);
        board.place_token(1, 0);

        board.remove_card(0);
        assert!(board.tokens_of(0).is_empty());
        assert!(board.tokens_of(1).is_empty());

        let removed = recorder.matching(|e| matches!(e, DisplayEvent::RemoveToken { .. }));
        assert_eq!(removed.len(), 2);
    }

    #[test]
    fn test_accepts_moves_once_dealt_and_stable() {
        let (board, _) = board();
        board.set_placement_stable(true);
        assert!(!board.accepts_moves(), "empty grid");

        board.set_placement_stable(false);
        board.place_card(Card(3), 1);
        assert!(!board.accepts_moves(), "still dealing");

        board.set_placement_stable(true);
        assert!(board.accepts_moves());
    }

    #[test]
    fn test_generation_advances() {
        let (board, _) = board();
        assert_eq!(board.generation(), 0);
        assert_eq!(board.advance_generation(), 1);
        assert_eq!(board.generation(), 1);
    }
}
