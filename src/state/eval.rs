//! Best-5-of-7 hand evaluator — spec §4.1 component 5, §4.3.6.
//!
//! Grounded on the teacher's `state/hand_eval.rs`: same `HandRank` ordering,
//! same C(n,5) brute-force enumeration, same kicker-array tiebreak approach.
//! Generalized from raw `0..52` card indices to the typed `Card`/`Rank`
//! values from `card.rs`, and from a fixed `[u8; 7]` to `&[Card]` so it also
//! evaluates the flop/turn (5/6 cards) for UI "current best hand" hints.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::card::{Card, Rank};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum HandRank {
    HighCard = 0,
    OnePair = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    FourOfAKind = 7,
    StraightFlush = 8,
    RoyalFlush = 9,
}

/// An evaluated best hand: its category plus tiebreaker ranks in descending
/// importance. `kickers` holds raw rank values (2..=14); unused slots are 0.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EvaluatedHand {
    pub rank: HandRank,
    pub kickers: [u8; 5],
}

impl EvaluatedHand {
    /// `Greater` if `self` beats `other`, `Equal` on an exact tie (split pot).
    pub fn compare(&self, other: &EvaluatedHand) -> Ordering {
        match self.rank.cmp(&other.rank) {
            Ordering::Equal => {
                for i in 0..5 {
                    match self.kickers[i].cmp(&other.kickers[i]) {
                        Ordering::Equal => continue,
                        ord => return ord,
                    }
                }
                Ordering::Equal
            }
            ord => ord,
        }
    }
}

impl PartialEq for EvaluatedHand {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}
impl Eq for EvaluatedHand {}

impl PartialOrd for EvaluatedHand {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}
impl Ord for EvaluatedHand {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

/// Evaluate the best 5-card hand out of 5, 6, or 7 cards.
///
/// Panics if given fewer than 5 cards; callers only invoke this with hole
/// cards plus whatever community cards are on board (§4.3.6 requires at
/// least the flop before any showdown can occur).
pub fn evaluate(cards: &[Card]) -> EvaluatedHand {
    assert!(cards.len() >= 5, "evaluate() requires at least 5 cards");

    let mut best: Option<EvaluatedHand> = None;
    for combo in five_card_subsets(cards.len()) {
        let five = [
            cards[combo[0]],
            cards[combo[1]],
            cards[combo[2]],
            cards[combo[3]],
            cards[combo[4]],
        ];
        let eval = evaluate_five(&five);
        best = Some(match best {
            None => eval,
            Some(prev) if eval.compare(&prev) == Ordering::Greater => eval,
            Some(prev) => prev,
        });
    }
    best.unwrap()
}

/// All 5-element index subsets of `0..n`, n >= 5.
fn five_card_subsets(n: usize) -> Vec<[usize; 5]> {
    let mut out = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                for l in (k + 1)..n {
                    for m in (l + 1)..n {
                        out.push([i, j, k, l, m]);
                    }
                }
            }
        }
    }
    out
}

fn evaluate_five(cards: &[Card; 5]) -> EvaluatedHand {
    let mut ranks: [u8; 5] = cards.map(|c| c.rank.0);
    let suits = cards.map(|c| c.suit);
    ranks.sort_unstable_by(|a, b| b.cmp(a));

    let is_flush = suits[1..].iter().all(|s| *s == suits[0]);
    let is_straight = ranks.windows(2).all(|w| w[0] == w[1] + 1);
    let is_wheel = ranks == [14, 5, 4, 3, 2];

    if is_flush && (is_straight || is_wheel) {
        if is_wheel {
            return EvaluatedHand { rank: HandRank::StraightFlush, kickers: [5, 0, 0, 0, 0] };
        }
        if ranks[0] == Rank::ACE.0 {
            return EvaluatedHand { rank: HandRank::RoyalFlush, kickers: [14, 13, 12, 11, 10] };
        }
        return EvaluatedHand { rank: HandRank::StraightFlush, kickers: [ranks[0], 0, 0, 0, 0] };
    }

    // rank_counts indexed by value - 2 (0..=12)
    let mut rank_counts = [0u8; 13];
    for &r in &ranks {
        rank_counts[(r - 2) as usize] += 1;
    }

    let mut quads: Option<u8> = None;
    let mut trips: Option<u8> = None;
    let mut pairs: Vec<u8> = Vec::new();
    let mut singles: Vec<u8> = Vec::new();

    for idx in (0..13).rev() {
        let value = idx as u8 + 2;
        match rank_counts[idx] {
            4 => quads = Some(value),
            3 => trips = Some(value),
            2 => pairs.push(value),
            1 => singles.push(value),
            _ => {}
        }
    }

    if let Some(quad_rank) = quads {
        let kicker = singles
            .first()
            .copied()
            .or_else(|| pairs.first().copied())
            .or(trips)
            .unwrap_or(0);
        return EvaluatedHand { rank: HandRank::FourOfAKind, kickers: [quad_rank, kicker, 0, 0, 0] };
    }

    if let (Some(t), false) = (trips, pairs.is_empty()) {
        return EvaluatedHand { rank: HandRank::FullHouse, kickers: [t, pairs[0], 0, 0, 0] };
    }

    if is_flush {
        return EvaluatedHand {
            rank: HandRank::Flush,
            kickers: [ranks[0], ranks[1], ranks[2], ranks[3], ranks[4]],
        };
    }

    if is_straight {
        return EvaluatedHand { rank: HandRank::Straight, kickers: [ranks[0], 0, 0, 0, 0] };
    }
    if is_wheel {
        return EvaluatedHand { rank: HandRank::Straight, kickers: [5, 0, 0, 0, 0] };
    }

    if let Some(trip_rank) = trips {
        return EvaluatedHand {
            rank: HandRank::ThreeOfAKind,
            kickers: [
                trip_rank,
                singles.first().copied().unwrap_or(0),
                singles.get(1).copied().unwrap_or(0),
                0,
                0,
            ],
        };
    }

    if pairs.len() >= 2 {
        return EvaluatedHand {
            rank: HandRank::TwoPair,
            kickers: [pairs[0], pairs[1], singles.first().copied().unwrap_or(0), 0, 0],
        };
    }

    if pairs.len() == 1 {
        return EvaluatedHand {
            rank: HandRank::OnePair,
            kickers: [
                pairs[0],
                singles.first().copied().unwrap_or(0),
                singles.get(1).copied().unwrap_or(0),
                singles.get(2).copied().unwrap_or(0),
                0,
            ],
        };
    }

    EvaluatedHand {
        rank: HandRank::HighCard,
        kickers: [ranks[0], ranks[1], ranks[2], ranks[3], ranks[4]],
    }
}

/// Find the index/indices of the winning hand(s) among `hands` (ties split).
pub fn find_winners(hands: &[(usize, EvaluatedHand)]) -> Vec<usize> {
    let mut best: Option<&EvaluatedHand> = None;
    let mut winners = Vec::new();
    for (idx, eval) in hands {
        match best {
            None => {
                best = Some(eval);
                winners = vec![*idx];
            }
            Some(b) => match eval.compare(b) {
                Ordering::Greater => {
                    best = Some(eval);
                    winners = vec![*idx];
                }
                Ordering::Equal => winners.push(*idx),
                Ordering::Less => {}
            },
        }
    }
    winners
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::card::Suit;

    fn card(rank: u8, suit: Suit) -> Card {
        Card::new(suit, Rank(rank))
    }

    #[test]
    fn royal_flush() {
        let cards = [
            card(14, Suit::Hearts),
            card(13, Suit::Hearts),
            card(12, Suit::Hearts),
            card(11, Suit::Hearts),
            card(10, Suit::Hearts),
            card(2, Suit::Diamonds),
            card(3, Suit::Clubs),
        ];
        assert_eq!(evaluate(&cards).rank, HandRank::RoyalFlush);
    }

    #[test]
    fn straight_flush_nine_high() {
        let cards = [
            card(9, Suit::Spades),
            card(8, Suit::Spades),
            card(7, Suit::Spades),
            card(6, Suit::Spades),
            card(5, Suit::Spades),
            card(2, Suit::Hearts),
            card(3, Suit::Diamonds),
        ];
        let eval = evaluate(&cards);
        assert_eq!(eval.rank, HandRank::StraightFlush);
        assert_eq!(eval.kickers[0], 9);
    }

    #[test]
    fn steel_wheel_reports_five_high() {
        let cards = [
            card(14, Suit::Hearts),
            card(2, Suit::Hearts),
            card(3, Suit::Hearts),
            card(4, Suit::Hearts),
            card(5, Suit::Hearts),
            card(12, Suit::Diamonds),
            card(13, Suit::Clubs),
        ];
        let eval = evaluate(&cards);
        assert_eq!(eval.rank, HandRank::StraightFlush);
        assert_eq!(eval.kickers[0], 5);
    }

    #[test]
    fn four_of_a_kind_with_kicker() {
        let cards = [
            card(14, Suit::Hearts),
            card(14, Suit::Diamonds),
            card(14, Suit::Clubs),
            card(14, Suit::Spades),
            card(13, Suit::Hearts),
            card(2, Suit::Diamonds),
            card(3, Suit::Clubs),
        ];
        let eval = evaluate(&cards);
        assert_eq!(eval.rank, HandRank::FourOfAKind);
        assert_eq!(eval.kickers, [14, 13, 0, 0, 0]);
    }

    #[test]
    fn full_house_picks_best_trips_and_pair() {
        let cards = [
            card(13, Suit::Hearts),
            card(13, Suit::Diamonds),
            card(13, Suit::Clubs),
            card(12, Suit::Hearts),
            card(12, Suit::Diamonds),
            card(2, Suit::Clubs),
            card(3, Suit::Spades),
        ];
        let eval = evaluate(&cards);
        assert_eq!(eval.rank, HandRank::FullHouse);
        assert_eq!(eval.kickers[0..2], [13, 12]);
    }

    #[test]
    fn flush_uses_five_best_suited_cards() {
        let cards = [
            card(14, Suit::Hearts),
            card(13, Suit::Hearts),
            card(12, Suit::Hearts),
            card(10, Suit::Hearts),
            card(6, Suit::Hearts),
            card(4, Suit::Hearts),
            card(2, Suit::Diamonds),
        ];
        let eval = evaluate(&cards);
        assert_eq!(eval.rank, HandRank::Flush);
        assert_eq!(eval.kickers, [14, 13, 12, 10, 6]);
    }

    #[test]
    fn wheel_straight_not_flush() {
        let cards = [
            card(14, Suit::Hearts),
            card(2, Suit::Diamonds),
            card(3, Suit::Clubs),
            card(4, Suit::Spades),
            card(5, Suit::Hearts),
            card(12, Suit::Diamonds),
            card(13, Suit::Clubs),
        ];
        let eval = evaluate(&cards);
        assert_eq!(eval.rank, HandRank::Straight);
        assert_eq!(eval.kickers[0], 5);
    }

    #[test]
    fn counterfeited_pair_uses_board_pairs() {
        // player holds 7-7, board pairs AA and KK — best hand is AAKK7
        let cards = [
            card(7, Suit::Hearts),
            card(7, Suit::Diamonds),
            card(14, Suit::Clubs),
            card(14, Suit::Spades),
            card(13, Suit::Hearts),
            card(13, Suit::Diamonds),
            card(2, Suit::Clubs),
        ];
        let eval = evaluate(&cards);
        assert_eq!(eval.rank, HandRank::TwoPair);
        assert_eq!(eval.kickers[0..2], [14, 13]);
    }

    #[test]
    fn flush_beats_straight_on_shared_board() {
        let cards = [
            card(14, Suit::Hearts),
            card(12, Suit::Hearts),
            card(10, Suit::Hearts),
            card(7, Suit::Hearts),
            card(4, Suit::Hearts),
            card(9, Suit::Diamonds),
            card(8, Suit::Clubs),
        ];
        assert_eq!(evaluate(&cards).rank, HandRank::Flush);
    }

    #[test]
    fn find_winners_breaks_tie_by_rank() {
        let aces = evaluate(&[
            card(14, Suit::Hearts),
            card(14, Suit::Diamonds),
            card(2, Suit::Clubs),
            card(4, Suit::Spades),
            card(6, Suit::Hearts),
            card(9, Suit::Diamonds),
            card(11, Suit::Clubs),
        ]);
        let kings = evaluate(&[
            card(13, Suit::Hearts),
            card(13, Suit::Diamonds),
            card(2, Suit::Clubs),
            card(4, Suit::Spades),
            card(6, Suit::Hearts),
            card(9, Suit::Diamonds),
            card(11, Suit::Clubs),
        ]);
        let winners = find_winners(&[(0, aces), (1, kings)]);
        assert_eq!(winners, vec![0]);
    }

    #[test]
    fn find_winners_splits_on_exact_tie() {
        let board = [
            card(14, Suit::Diamonds),
            card(13, Suit::Clubs),
            card(12, Suit::Hearts),
            card(11, Suit::Diamonds),
            card(10, Suit::Clubs),
        ];
        let mut hand_a = vec![card(2, Suit::Hearts), card(3, Suit::Diamonds)];
        hand_a.extend_from_slice(&board);
        let mut hand_b = vec![card(4, Suit::Hearts), card(5, Suit::Diamonds)];
        hand_b.extend_from_slice(&board);

        let eval_a = evaluate(&hand_a);
        let eval_b = evaluate(&hand_b);
        let winners = find_winners(&[(0, eval_a), (1, eval_b)]);
        assert_eq!(winners.len(), 2, "both players play the broadway board");
    }

    #[test]
    fn evaluate_accepts_exactly_five_cards() {
        let cards = [
            card(14, Suit::Hearts),
            card(13, Suit::Hearts),
            card(12, Suit::Hearts),
            card(11, Suit::Hearts),
            card(10, Suit::Hearts),
        ];
        assert_eq!(evaluate(&cards).rank, HandRank::RoyalFlush);
    }

    // Cross-check against `aya_poker`, an independently implemented
    // evaluator, over a large random sample of shared-board matchups.
    mod against_reference {
        use super::*;
        use aya_poker::base::{Card as AyaCard, Hand as AyaHand, Rank as AyaRank, Suit as AyaSuit};
        use aya_poker::poker_rank;
        use rand::rngs::StdRng;
        use rand::seq::SliceRandom;
        use rand::SeedableRng;

        fn to_aya(card: Card) -> AyaCard {
            let rank = match card.rank.0 {
                2 => AyaRank::Two,
                3 => AyaRank::Three,
                4 => AyaRank::Four,
                5 => AyaRank::Five,
                6 => AyaRank::Six,
                7 => AyaRank::Seven,
                8 => AyaRank::Eight,
                9 => AyaRank::Nine,
                10 => AyaRank::Ten,
                11 => AyaRank::Jack,
                12 => AyaRank::Queen,
                13 => AyaRank::King,
                14 => AyaRank::Ace,
                _ => unreachable!(),
            };
            let suit = match card.suit {
                Suit::Hearts => AyaSuit::Hearts,
                Suit::Diamonds => AyaSuit::Diamonds,
                Suit::Clubs => AyaSuit::Clubs,
                Suit::Spades => AyaSuit::Spades,
            };
            AyaCard::new(rank, suit)
        }

        #[test]
        fn agrees_with_aya_poker_over_5000_deals() {
            let mut rng = StdRng::seed_from_u64(0xC0FFEE);
            let mut deck: Vec<Card> = Vec::with_capacity(52);
            for suit in Suit::ALL {
                for v in 2..=14u8 {
                    deck.push(Card::new(suit, Rank(v)));
                }
            }

            for _ in 0..5_000 {
                deck.shuffle(&mut rng);
                let community = &deck[0..5];
                let p1_hole = &deck[5..7];
                let p2_hole = &deck[7..9];

                let mut hand1 = p1_hole.to_vec();
                hand1.extend_from_slice(community);
                let mut hand2 = p2_hole.to_vec();
                hand2.extend_from_slice(community);

                let ours = evaluate(&hand1).compare(&evaluate(&hand2));

                let aya_hand1: AyaHand = hand1.iter().copied().map(to_aya).collect();
                let aya_hand2: AyaHand = hand2.iter().copied().map(to_aya).collect();
                let aya1 = poker_rank(&aya_hand1);
                let aya2 = poker_rank(&aya_hand2);
                let theirs = aya1.cmp(&aya2);

                assert_eq!(ours, theirs, "mismatch on hand1={:?} hand2={:?}", hand1, hand2);
            }
        }
    }
}
