//! Placement of several orders in one call, bids first, then asks.
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::msg;

use crate::{
    error::{ClobError, ClobResult, ValidationError},
    market::{Market, MarketAccounts},
    matching::OrderSummary,
    state::{
        event_queue::EventSink,
        order_packet::{
            CondensedOrder, FailedMultipleLimitOrderBehavior, MultipleOrderPacket, OrderPacket,
        },
        ClockReading, OrderId, SelfTradeBehavior, Side,
    },
};

/// Result of one order of a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchEntry {
    pub side: Side,
    /// Position of the order in its side of the batch
    pub index: u32,
    pub result: Result<OrderSummary, ClobError>,
}

/// Wire form of a [`BatchEntry`], returned by the batch instructions.
#[derive(BorshDeserialize, BorshSerialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchEntryReport {
    pub side: Side,
    pub index: u32,
    pub posted_order_id: Option<OrderId>,
    pub base_lots_filled: u64,
    pub quote_lots_filled: u64,
    /// Custom program error code of a skipped order
    pub error_code: Option<u32>,
}

impl From<&BatchEntry> for BatchEntryReport {
    fn from(entry: &BatchEntry) -> Self {
        let (posted_order_id, base_lots_filled, quote_lots_filled, error_code) =
            match &entry.result {
                Ok(summary) => (
                    summary.posted_order_id,
                    summary.total_base_lots_filled,
                    summary.total_quote_lots_filled,
                    None,
                ),
                Err(e) => (None, 0, 0, Some(e.code() as u32)),
            };
        Self {
            side: entry.side,
            index: entry.index,
            posted_order_id,
            base_lots_filled,
            quote_lots_filled,
            error_code,
        }
    }
}

fn condensed_to_packet(
    side: Side,
    order: &CondensedOrder,
    batch: &MultipleOrderPacket,
    post_only: bool,
) -> OrderPacket {
    let client_order_id = batch.client_order_id.unwrap_or_default();
    if post_only {
        OrderPacket::new_post_only(
            side,
            order.price_in_ticks,
            order.size_in_base_lots,
            client_order_id,
            true,
            batch.use_only_deposited_funds,
            order.last_valid_slot,
            order.last_valid_unix_timestamp_in_seconds,
        )
    } else {
        OrderPacket::new_limit_order(
            side,
            order.price_in_ticks,
            order.size_in_base_lots,
            SelfTradeBehavior::CancelProvide,
            None,
            client_order_id,
            batch.use_only_deposited_funds,
            order.last_valid_slot,
            order.last_valid_unix_timestamp_in_seconds,
        )
    }
}

impl<'a> Market<'a> {
    /// Places every order of the batch in sequence.
    ///
    /// Each order is atomic on its own. Under
    /// [`FailedMultipleLimitOrderBehavior::AbortTransaction`] the orders placed before the
    /// failing one stay applied: the caller discards the whole write set, which is what
    /// [`MarketAccounts::place_multiple_orders`] and a failed instruction both do.
    pub fn place_batch(
        &mut self,
        trader: &[u8; 32],
        batch: &MultipleOrderPacket,
        post_only: bool,
        clock: &ClockReading,
        events: &mut impl EventSink,
    ) -> ClobResult<Vec<BatchEntry>> {
        if batch.bids.is_empty() && batch.asks.is_empty() {
            return Err(ValidationError::EmptyBatch.into());
        }
        let mut entries = Vec::with_capacity(batch.bids.len() + batch.asks.len());
        for (side, orders) in [(Side::Bid, &batch.bids), (Side::Ask, &batch.asks)] {
            for (index, order) in orders.iter().enumerate() {
                let index = index as u32;
                let packet = condensed_to_packet(side, order, batch, post_only);
                match self.place_order(trader, &packet, clock, events) {
                    Ok(summary) => entries.push(BatchEntry {
                        side,
                        index,
                        result: Ok(summary),
                    }),
                    Err(cause) => match batch.failed_multiple_limit_order_behavior {
                        FailedMultipleLimitOrderBehavior::AbortTransaction => {
                            return Err(ClobError::BatchAborted {
                                side,
                                index,
                                cause: Box::new(cause),
                            })
                        }
                        FailedMultipleLimitOrderBehavior::SkipOrder => entries.push(BatchEntry {
                            side,
                            index,
                            result: Err(cause),
                        }),
                        FailedMultipleLimitOrderBehavior::SkipOrderAndContinue => {
                            msg!("Skipping {:?} order {}: {}", side, index, cause);
                        }
                    },
                }
            }
        }
        Ok(entries)
    }
}

impl<'a> MarketAccounts<'a> {
    /// Places a batch of limit orders. An aborted batch leaves every buffer as it was.
    pub fn place_multiple_orders(
        &mut self,
        trader: &[u8; 32],
        batch: &MultipleOrderPacket,
        clock: &ClockReading,
    ) -> ClobResult<Vec<BatchEntry>> {
        self.run_batch(trader, batch, false, clock)
    }

    /// Places a batch of post-only orders, each rejected if it crosses the book.
    pub fn place_multiple_post_only_orders(
        &mut self,
        trader: &[u8; 32],
        batch: &MultipleOrderPacket,
        clock: &ClockReading,
    ) -> ClobResult<Vec<BatchEntry>> {
        self.run_batch(trader, batch, true, clock)
    }

    fn run_batch(
        &mut self,
        trader: &[u8; 32],
        batch: &MultipleOrderPacket,
        post_only: bool,
        clock: &ClockReading,
    ) -> ClobResult<Vec<BatchEntry>> {
        let rollback = (batch.failed_multiple_limit_order_behavior
            == FailedMultipleLimitOrderBehavior::AbortTransaction)
            .then(|| self.capture());
        let result = self.load().and_then(|(mut market, mut event_queue)| {
            market.place_batch(trader, batch, post_only, clock, &mut event_queue)
        });
        if let (Err(_), Some(snapshot)) = (&result, &rollback) {
            self.restore(snapshot)?;
        }
        result
    }
}
