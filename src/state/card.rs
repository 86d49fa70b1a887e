//! Card and Deck — spec §3, §4.1 component 1.
//!
//! Grounded on the teacher's `state/deck.rs::card_utils` rank/suit split,
//! generalized from Inco-encrypted `u128` handles to plain `Card` values
//! (this server never hides a card from itself — hole-card privacy is a
//! broadcast-time concern, §4.4, not a storage-time one).

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::DECK_SIZE;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

    fn as_index(self) -> u8 {
        match self {
            Suit::Hearts => 0,
            Suit::Diamonds => 1,
            Suit::Clubs => 2,
            Suit::Spades => 3,
        }
    }

    fn from_index(idx: u8) -> Self {
        match idx {
            0 => Suit::Hearts,
            1 => Suit::Diamonds,
            2 => Suit::Clubs,
            _ => Suit::Spades,
        }
    }

    fn glyph(self) -> char {
        match self {
            Suit::Hearts => 'h',
            Suit::Diamonds => 'd',
            Suit::Clubs => 'c',
            Suit::Spades => 's',
        }
    }
}

/// Numeric rank value 2..=14 (Ace high). Straight detection treats an Ace
/// as 1 for the wheel (A-2-3-4-5) separately in `eval.rs`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rank(pub u8);

impl Rank {
    pub const TWO: Rank = Rank(2);
    pub const ACE: Rank = Rank(14);

    fn glyph(self) -> char {
        match self.0 {
            2..=9 => (b'0' + self.0) as char,
            10 => 'T',
            11 => 'J',
            12 => 'Q',
            13 => 'K',
            14 => 'A',
            _ => '?',
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    pub fn new(suit: Suit, rank: Rank) -> Self {
        Card { suit, rank }
    }

    /// Compact 0..52 encoding used by `Hand::to_bytes`.
    pub fn to_index(self) -> u8 {
        self.suit.as_index() * 13 + (self.rank.0 - 2)
    }

    pub fn from_index(idx: u8) -> Self {
        let suit = Suit::from_index(idx / 13);
        let rank = Rank(idx % 13 + 2);
        Card { suit, rank }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.glyph(), self.suit.glyph())
    }
}

/// A shuffled 52-card source supporting deal and burn.
///
/// Invariant: no card appears twice; `remaining() == 52 - dealt - burned`.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// A fresh, unshuffled 52-card deck.
    pub fn new() -> Self {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for suit in Suit::ALL {
            for value in 2..=14u8 {
                cards.push(Card::new(suit, Rank(value)));
            }
        }
        Deck { cards }
    }

    /// Resets to a full 52-card deck and shuffles it with the process RNG.
    pub fn reset_and_shuffle(&mut self) {
        *self = Deck::new();
        self.shuffle();
    }

    pub fn shuffle(&mut self) {
        self.cards.shuffle(&mut rand::thread_rng());
    }

    /// Remove the top card without exposing it (§ GLOSSARY "Burn").
    pub fn burn(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    pub fn deal(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    /// Remaining cards in dealing order, for serialization (§4.3.7).
    pub fn remaining_cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn from_remaining(cards: Vec<Card>) -> Self {
        Deck { cards }
    }
}

impl Default for Deck {
    fn default() -> Self {
        Deck::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_deck_has_52_distinct_cards() {
        let deck = Deck::new();
        assert_eq!(deck.remaining(), 52);
        let mut seen = std::collections::HashSet::new();
        for c in deck.remaining_cards() {
            assert!(seen.insert(c.to_index()), "duplicate card {:?}", c);
        }
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut deck = Deck::new();
        deck.shuffle();
        assert_eq!(deck.remaining(), 52);
        let mut seen = std::collections::HashSet::new();
        for c in deck.remaining_cards() {
            assert!(seen.insert(c.to_index()));
        }
    }

    #[test]
    fn deal_and_burn_reduce_remaining() {
        let mut deck = Deck::new();
        deck.burn();
        deck.deal();
        deck.deal();
        assert_eq!(deck.remaining(), 49);
    }

    #[test]
    fn index_round_trips() {
        for idx in 0..52u8 {
            let card = Card::from_index(idx);
            assert_eq!(card.to_index(), idx);
        }
    }
}
