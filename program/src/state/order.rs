//! Order identifiers and the resting order record stored in the book slabs.
use bonfida_utils::BorshSize;
use borsh::{BorshDeserialize, BorshSerialize};
use bytemuck::{Pod, Zeroable};

use super::Side;

/// Bid and ask counters must stay below this bound so that the leading bit of an encoded
/// sequence number identifies the side.
pub const MAX_ORDER_SEQUENCE_NUMBER: u64 = 1 << 63;

/// Uniquely identifies an order on a given market.
///
/// Asks store the raw per-side sequence number and bids store its complement. The derived
/// ordering on `(price_in_ticks, order_sequence_number)` is then the book key ordering: the
/// best ask is the smallest id and the best bid the largest one.
#[derive(
    BorshDeserialize,
    BorshSerialize,
    BorshSize,
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Pod,
    Zeroable,
)]
#[repr(C)]
pub struct OrderId {
    pub price_in_ticks: u64,
    pub order_sequence_number: u64,
}

impl OrderId {
    pub fn new(price_in_ticks: u64, order_sequence_number: u64) -> Self {
        Self {
            price_in_ticks,
            order_sequence_number,
        }
    }

    /// Builds the id of the `sequence_number`-th order posted on `side`.
    pub fn new_for_side(price_in_ticks: u64, sequence_number: u64, side: Side) -> Self {
        let order_sequence_number = match side {
            Side::Bid => !sequence_number,
            Side::Ask => sequence_number,
        };
        Self::new(price_in_ticks, order_sequence_number)
    }

    pub fn side(&self) -> Side {
        Side::from_order_sequence_number(self.order_sequence_number)
    }

    /// The per-side counter value the id was generated from.
    pub fn sequence_number(&self) -> u64 {
        match self.side() {
            Side::Bid => !self.order_sequence_number,
            Side::Ask => self.order_sequence_number,
        }
    }

    /// The 128-bit critbit key. Its numeric order matches the derived `Ord`.
    #[inline(always)]
    pub fn as_key(&self) -> u128 {
        ((self.price_in_ticks as u128) << 64) | (self.order_sequence_number as u128)
    }

    #[inline(always)]
    pub fn from_key(key: u128) -> Self {
        Self::new((key >> 64) as u64, key as u64)
    }

    /// Returns true if `self` would be matched before `other` on the same side.
    pub fn has_priority_over(&self, other: &OrderId) -> bool {
        match self.side() {
            Side::Bid => self > other,
            Side::Ask => self < other,
        }
    }
}

/// Current slot and unix timestamp, as read from the clock sysvar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClockReading {
    pub slot: u64,
    pub unix_timestamp: u64,
}

impl ClockReading {
    pub fn new(slot: u64, unix_timestamp: u64) -> Self {
        Self {
            slot,
            unix_timestamp,
        }
    }
}

impl From<&solana_program::clock::Clock> for ClockReading {
    fn from(clock: &solana_program::clock::Clock) -> Self {
        Self {
            slot: clock.slot,
            unix_timestamp: clock.unix_timestamp.max(0) as u64,
        }
    }
}

/// An order waiting on the book.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct RestingOrder {
    pub trader_index: u64,
    pub num_base_lots: u64,
    /// Zero means the order never expires by slot
    pub last_valid_slot: u64,
    /// Zero means the order never expires by time
    pub last_valid_unix_timestamp_in_seconds: u64,
}

impl RestingOrder {
    pub fn new(
        trader_index: u64,
        num_base_lots: u64,
        last_valid_slot: Option<u64>,
        last_valid_unix_timestamp_in_seconds: Option<u64>,
    ) -> Self {
        Self {
            trader_index,
            num_base_lots,
            last_valid_slot: last_valid_slot.unwrap_or(0),
            last_valid_unix_timestamp_in_seconds: last_valid_unix_timestamp_in_seconds
                .unwrap_or(0),
        }
    }

    pub fn is_expired(&self, clock: &ClockReading) -> bool {
        (self.last_valid_slot != 0 && clock.slot > self.last_valid_slot)
            || (self.last_valid_unix_timestamp_in_seconds != 0
                && clock.unix_timestamp > self.last_valid_unix_timestamp_in_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_order_is_price_time_priority() {
        let early_bid = OrderId::new_for_side(100, 0, Side::Bid);
        let late_bid = OrderId::new_for_side(100, 1, Side::Bid);
        let better_bid = OrderId::new_for_side(101, 2, Side::Bid);
        assert!(early_bid.has_priority_over(&late_bid));
        assert!(better_bid.has_priority_over(&early_bid));
        assert!(early_bid.as_key() > late_bid.as_key());

        let early_ask = OrderId::new_for_side(100, 0, Side::Ask);
        let late_ask = OrderId::new_for_side(100, 1, Side::Ask);
        let better_ask = OrderId::new_for_side(99, 2, Side::Ask);
        assert!(early_ask.has_priority_over(&late_ask));
        assert!(better_ask.has_priority_over(&early_ask));
        assert!(early_ask.as_key() < late_ask.as_key());
    }

    #[test]
    fn side_and_sequence_are_recoverable() {
        let bid = OrderId::new_for_side(7, 42, Side::Bid);
        assert_eq!(bid.side(), Side::Bid);
        assert_eq!(bid.sequence_number(), 42);
        assert_eq!(OrderId::from_key(bid.as_key()), bid);

        let ask = OrderId::new_for_side(7, 42, Side::Ask);
        assert_eq!(ask.side(), Side::Ask);
        assert_eq!(ask.sequence_number(), 42);
    }

    #[test]
    fn expiry_is_inclusive_of_the_last_valid_slot() {
        let order = RestingOrder::new(0, 10, Some(10), None);
        assert!(!order.is_expired(&ClockReading::new(10, 0)));
        assert!(order.is_expired(&ClockReading::new(11, 0)));

        let timed = RestingOrder::new(0, 10, None, Some(1_000));
        assert!(!timed.is_expired(&ClockReading::new(u64::MAX, 1_000)));
        assert!(timed.is_expired(&ClockReading::new(0, 1_001)));

        let forever = RestingOrder::new(0, 10, None, None);
        assert!(!forever.is_expired(&ClockReading::new(u64::MAX, u64::MAX)));
    }
}
