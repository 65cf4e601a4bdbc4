use bonfida_utils::BorshSize;
use borsh::{BorshDeserialize, BorshSerialize};
use num_enum::{IntoPrimitive, TryFromPrimitive};

pub mod critbit;
pub mod event_queue;
pub mod market_state;
pub mod order;
pub mod order_packet;
pub mod orderbook;
pub mod trader_registry;

pub use order::{ClockReading, OrderId, RestingOrder};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
#[repr(u64)]
/// Written in the first 8 bytes of every account owned by the program
pub enum AccountTag {
    Uninitialized,
    Market,
    EventQueue,
    Bids,
    Asks,
}

#[derive(
    BorshDeserialize,
    BorshSerialize,
    BorshSize,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    IntoPrimitive,
    TryFromPrimitive,
)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Helper function to get the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    /// Recovers the side from an encoded order sequence number. Bid sequence numbers are
    /// stored complemented, so their leading bit is always set.
    pub fn from_order_sequence_number(order_sequence_number: u64) -> Self {
        if order_sequence_number >> 63 == 1 {
            Side::Bid
        } else {
            Side::Ask
        }
    }
}

/// Describes what happens when two orders from the same trader would match
#[derive(BorshDeserialize, BorshSerialize, BorshSize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelfTradeBehavior {
    /// Fail the whole operation
    Abort,
    /// Cancel the resting order and keep matching
    CancelProvide,
    /// Shrink the taker by the resting size without any transfer and keep matching
    DecrementTake,
}

/// Extracts the side of an order from its id.
pub fn get_side_from_order_id(order_id: &OrderId) -> Side {
    Side::from_order_sequence_number(order_id.order_sequence_number)
}
