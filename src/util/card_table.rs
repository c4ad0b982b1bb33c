//! A byte-per-card dirty map over the heap.
//!
//! Write barriers mark the card of the object they store into. The collector reads the
//! marked cards to find tenured-to-young references without rescanning the whole tenured
//! space. Barrier stores and collector reads race benignly: a card that is spuriously
//! marked only causes extra scanning, and the collector clears a card only after scanning it.

use crate::util::address::MemRange;
use crate::util::constants::*;
use crate::util::conversions;
use crate::util::Address;

use std::ops::BitOr;
use std::sync::atomic::{AtomicU8, Ordering};

/// The value of a card.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CardState {
    Clear = 0,
    Marked = 1,
    /// Visited by a concurrent phase, which may need to visit it again later.
    Processed = 2,
}

impl CardState {
    fn from_u8(v: u8) -> CardState {
        match v {
            0 => CardState::Clear,
            1 => CardState::Marked,
            2 => CardState::Processed,
            _ => panic!("Invalid card value {}", v),
        }
    }
}

/// Selects which cards [`CardTable::visit_marked`] visits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CardVisitFlags(u8);

impl CardVisitFlags {
    /// Visit cards that are marked.
    pub const VISIT_MARKED: CardVisitFlags = CardVisitFlags(1);
    /// Visit cards that have been processed by an earlier visit.
    pub const VISIT_PROCESSED: CardVisitFlags = CardVisitFlags(2);
    /// Turn every visited card into a processed card.
    pub const SET_PROCESSED: CardVisitFlags = CardVisitFlags(4);

    pub fn contains(self, other: CardVisitFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for CardVisitFlags {
    type Output = CardVisitFlags;
    fn bitor(self, rhs: CardVisitFlags) -> CardVisitFlags {
        CardVisitFlags(self.0 | rhs.0)
    }
}

pub struct CardTable {
    min_address: Address,
    cards: Box<[AtomicU8]>,
}

impl CardTable {
    /// Create a card table covering `range`. The start of the range must be card aligned.
    pub fn new(range: MemRange) -> Self {
        assert!(
            range.start().is_aligned_to(BYTES_IN_CARD),
            "Card table start {} is not card aligned",
            range.start()
        );
        let cards_count = conversions::bytes_to_cards_up(range.size());
        debug!(
            "Create card table for {:?} with {} cards",
            range, cards_count
        );
        CardTable {
            min_address: range.start(),
            cards: (0..cards_count)
                .map(|_| AtomicU8::new(CardState::Clear as u8))
                .collect(),
        }
    }

    pub fn cards_count(&self) -> usize {
        self.cards.len()
    }

    /// The range of memory covered by this card table.
    pub fn covered_range(&self) -> MemRange {
        MemRange::from_start_and_size(self.min_address, self.cards.len() << LOG_BYTES_IN_CARD)
    }

    /// The index of the card holding `addr`, or `None` if the table does not cover `addr`.
    pub fn card_index(&self, addr: Address) -> Option<usize> {
        if self.covered_range().contains_address(addr) {
            Some((addr - self.min_address) >> LOG_BYTES_IN_CARD as usize)
        } else {
            None
        }
    }

    fn index_of(&self, addr: Address) -> usize {
        match self.card_index(addr) {
            Some(index) => index,
            None => panic!(
                "Address {} is out of the card table range {:?}",
                addr,
                self.covered_range()
            ),
        }
    }

    fn card(&self, addr: Address) -> &AtomicU8 {
        &self.cards[self.index_of(addr)]
    }

    fn get(&self, index: usize) -> CardState {
        CardState::from_u8(self.cards[index].load(Ordering::Relaxed))
    }

    fn set(&self, index: usize, state: CardState) {
        self.cards[index].store(state as u8, Ordering::Relaxed);
    }

    pub fn card_state(&self, addr: Address) -> CardState {
        self.get(self.index_of(addr))
    }

    pub fn mark_card(&self, addr: Address) {
        self.card(addr).store(CardState::Marked as u8, Ordering::Relaxed);
    }

    pub fn is_marked(&self, addr: Address) -> bool {
        self.card_state(addr) == CardState::Marked
    }

    pub fn is_clear(&self, addr: Address) -> bool {
        self.card_state(addr) == CardState::Clear
    }

    pub fn clear_card(&self, addr: Address) {
        self.card(addr).store(CardState::Clear as u8, Ordering::Relaxed);
    }

    pub fn clear_all(&self) {
        for card in self.cards.iter() {
            card.store(CardState::Clear as u8, Ordering::Relaxed);
        }
    }

    /// Clear every card inside `range`. The range must start on a card boundary.
    pub fn clear_card_range(&self, range: MemRange) {
        assert!(
            range.start().is_aligned_to(BYTES_IN_CARD),
            "Clearing cards from unaligned address {}",
            range.start()
        );
        assert!(
            self.covered_range().contains_range(&range),
            "Clearing cards of {:?} outside of {:?}",
            range,
            self.covered_range()
        );
        if range.is_empty() {
            return;
        }
        let first = self.index_of(range.start());
        let count = range.size() >> LOG_BYTES_IN_CARD as usize;
        for index in first..first + count {
            self.set(index, CardState::Clear);
        }
    }

    pub fn card_start_address(&self, index: usize) -> Address {
        self.min_address + (index << LOG_BYTES_IN_CARD)
    }

    pub fn card_end_address(&self, index: usize) -> Address {
        self.min_address + ((index + 1) << LOG_BYTES_IN_CARD)
    }

    /// The memory covered by the card at `index`.
    pub fn memory_range(&self, index: usize) -> MemRange {
        MemRange::new(self.card_start_address(index), self.card_end_address(index))
    }

    /// Call `visitor` with the memory range of every card selected by `flags`.
    pub fn visit_marked<F>(&self, mut visitor: F, flags: CardVisitFlags)
    where
        F: FnMut(MemRange),
    {
        let visit_marked = flags.contains(CardVisitFlags::VISIT_MARKED);
        let visit_processed = flags.contains(CardVisitFlags::VISIT_PROCESSED);
        let set_processed = flags.contains(CardVisitFlags::SET_PROCESSED);
        for index in 0..self.cards.len() {
            let state = self.get(index);
            let selected = (visit_marked && state == CardState::Marked)
                || (visit_processed && state == CardState::Processed);
            if !selected {
                continue;
            }
            if set_processed {
                self.set(index, CardState::Processed);
            }
            visitor(self.memory_range(index));
        }
    }

    /// Like [`CardTable::visit_marked`] with `VISIT_MARKED`, but adjacent marked cards are
    /// merged into one range.
    pub fn visit_marked_compact<F>(&self, mut visitor: F)
    where
        F: FnMut(MemRange),
    {
        let mut run: Option<(usize, usize)> = None;
        for index in 0..self.cards.len() {
            if self.get(index) == CardState::Marked {
                run = match run {
                    Some((start, end)) if end == index => Some((start, index + 1)),
                    Some((start, end)) => {
                        visitor(MemRange::new(
                            self.card_start_address(start),
                            self.card_start_address(end),
                        ));
                        Some((index, index + 1))
                    }
                    None => Some((index, index + 1)),
                };
            }
        }
        if let Some((start, end)) = run {
            visitor(MemRange::new(
                self.card_start_address(start),
                self.card_start_address(end),
            ));
        }
    }
}
