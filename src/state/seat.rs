//! Seat — spec §3, §4.2.
//!
//! Grounded on the teacher's `state/player.rs::PlayerSeat`: kept
//! `place_bet`'s saturating all-in semantics and the
//! `reset_for_new_hand`/`reset_for_betting_round` split, generalized off
//! the Solana account layout (`Pubkey` references, `InitSpace`, PDA bump)
//! since a seat here is a plain struct owned by the table actor, not an
//! on-chain account.

use serde::{Deserialize, Serialize};

use super::card::Card;
use crate::error::{GameError, GameResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Seat {
    pub user_id: String,
    pub display_name: String,
    pub seat_index: usize,
    pub stack: u64,
    /// Amount bet in the current betting round.
    pub current_bet: u64,
    /// Total amount invested in the current hand, across all streets.
    pub total_bet_this_hand: u64,
    pub hole_cards: Option<[Card; 2]>,
    pub folded: bool,
    pub all_in: bool,
    /// Participating in the hand currently in progress (false for a seat
    /// that joined mid-hand before the blind-position rule admits it, or
    /// a seat that was broke at the start of the hand).
    pub active_in_hand: bool,
    pub has_acted: bool,
}

impl Seat {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>, seat_index: usize, stack: u64) -> Self {
        Seat {
            user_id: user_id.into(),
            display_name: display_name.into(),
            seat_index,
            stack,
            current_bet: 0,
            total_bet_this_hand: 0,
            hole_cards: None,
            folded: false,
            all_in: false,
            active_in_hand: true,
            has_acted: false,
        }
    }

    /// Seat can still act this round: dealt in, hasn't folded, isn't all-in.
    pub fn can_act(&self) -> bool {
        self.active_in_hand && !self.folded && !self.all_in
    }

    pub fn deal_hole_cards(&mut self, cards: [Card; 2]) -> GameResult<()> {
        if self.hole_cards.is_some() {
            return Err(GameError::InvariantViolation(format!(
                "seat {} already has hole cards",
                self.seat_index
            )));
        }
        self.hole_cards = Some(cards);
        Ok(())
    }

    /// Commit chips to the pot. Wagers more than the stack all-in for the
    /// stack instead of failing. Returns the amount actually wagered.
    pub fn bet(&mut self, amount: i64) -> GameResult<u64> {
        if amount < 0 {
            return Err(GameError::invalid_action(format!(
                "seat {} cannot bet a negative amount",
                self.seat_index
            )));
        }
        let actual = (amount as u64).min(self.stack);
        self.stack -= actual;
        self.current_bet = self.current_bet.saturating_add(actual);
        self.total_bet_this_hand = self.total_bet_this_hand.saturating_add(actual);
        self.has_acted = true;
        if self.stack == 0 {
            self.all_in = true;
        }
        Ok(actual)
    }

    pub fn fold(&mut self) {
        self.folded = true;
        self.has_acted = true;
    }

    pub fn add_chips(&mut self, amount: u64) {
        self.stack = self.stack.saturating_add(amount);
    }

    /// Clear only the current-round bet and acted flag, at a street boundary.
    pub fn reset_for_new_street(&mut self) {
        self.current_bet = 0;
        self.has_acted = false;
    }

    /// Clear all per-hand state at the start of a new hand. A broke seat
    /// (stack=0) is flipped inactive for this hand.
    pub fn reset_for_new_hand(&mut self) {
        self.current_bet = 0;
        self.total_bet_this_hand = 0;
        self.hole_cards = None;
        self.folded = false;
        self.all_in = false;
        self.has_acted = false;
        self.active_in_hand = self.stack > 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bet_caps_at_stack_and_flags_all_in() {
        let mut seat = Seat::new("u1", "Alice", 0, 50);
        let wagered = seat.bet(80).unwrap();
        assert_eq!(wagered, 50);
        assert_eq!(seat.stack, 0);
        assert!(seat.all_in);
        assert_eq!(seat.current_bet, 50);
        assert_eq!(seat.total_bet_this_hand, 50);
    }

    #[test]
    fn negative_bet_rejected() {
        let mut seat = Seat::new("u1", "Alice", 0, 50);
        let err = seat.bet(-1).unwrap_err();
        assert_eq!(err.reason(), "InvalidAction");
    }

    #[test]
    fn dealing_twice_is_an_invariant_violation() {
        let mut seat = Seat::new("u1", "Alice", 0, 50);
        let cards = [
            Card::new(super::super::card::Suit::Hearts, super::super::card::Rank::ACE),
            Card::new(super::super::card::Suit::Spades, super::super::card::Rank::ACE),
        ];
        seat.deal_hole_cards(cards).unwrap();
        let err = seat.deal_hole_cards(cards).unwrap_err();
        assert_eq!(err.reason(), "InvariantViolation");
    }

    #[test]
    fn fold_clears_can_act() {
        let mut seat = Seat::new("u1", "Alice", 0, 50);
        assert!(seat.can_act());
        seat.fold();
        assert!(!seat.can_act());
        assert!(seat.folded);
    }

    #[test]
    fn reset_for_new_hand_marks_broke_seat_inactive() {
        let mut seat = Seat::new("u1", "Alice", 0, 0);
        seat.folded = true;
        seat.reset_for_new_hand();
        assert!(!seat.active_in_hand);
        assert!(!seat.folded);
    }

    #[test]
    fn reset_for_new_street_keeps_cumulative_bet() {
        let mut seat = Seat::new("u1", "Alice", 0, 100);
        seat.bet(20).unwrap();
        seat.reset_for_new_street();
        assert_eq!(seat.current_bet, 0);
        assert_eq!(seat.total_bet_this_hand, 20);
    }
}
