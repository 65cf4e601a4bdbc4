//! Cancellation, reduction and expiry of resting orders.
//!
//! Every operation first collects the orders it touches, checks that the event sink can take one
//! event per order, and only then removes them. Unlocked funds return to the owner's free balance.
use bonfida_utils::BorshSize;
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::msg;

use crate::{
    error::{ClobError, ClobResult, ValidationError},
    market::Market,
    state::{
        critbit::LeafNode,
        event_queue::{EventSink, MarketEvent, OutEvent, OutReason},
        ClockReading, OrderId, RestingOrder, Side,
    },
};

#[derive(BorshDeserialize, BorshSerialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct CancelSummary {
    /// Orders that left the book
    pub cancelled_order_ids: Vec<OrderId>,
    pub quote_lots_released: u64,
    pub base_lots_released: u64,
}

impl CancelSummary {
    fn record(&mut self, side: Side, released: u64) -> ClobResult {
        let total = match side {
            Side::Bid => &mut self.quote_lots_released,
            Side::Ask => &mut self.base_lots_released,
        };
        *total = total
            .checked_add(released)
            .ok_or(ClobError::ArithmeticOverflow)?;
        Ok(())
    }
}

#[derive(BorshDeserialize, BorshSerialize, BorshSize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CancelUpToParams {
    pub side: Side,
    /// Cancel this order and every order behind it in priority. `None` covers the whole side
    pub boundary: Option<OrderId>,
    /// Maximum number of orders to look at, whoever owns them
    pub num_orders_to_search: Option<u32>,
    pub num_orders_to_cancel: Option<u32>,
}

impl<'a> Market<'a> {
    /// Funds locked by a resting order: quote lots for a bid, base lots for an ask.
    pub(crate) fn locked_funds(&self, leaf: &LeafNode) -> ClobResult<u64> {
        match leaf.order_id.side() {
            Side::Bid => self
                .state
                .quote_lots_for(leaf.order_id.price_in_ticks, leaf.order.num_base_lots),
            Side::Ask => Ok(leaf.order.num_base_lots),
        }
    }

    fn release_funds(
        &mut self,
        order_id: &OrderId,
        order: &RestingOrder,
        base_lots: u64,
    ) -> ClobResult<u64> {
        let owner = self.traders.state_mut(order.trader_index)?;
        match order_id.side() {
            Side::Bid => {
                let quote_lots = self
                    .state
                    .quote_lots_for(order_id.price_in_ticks, base_lots)?;
                owner.unlock_quote_lots(quote_lots)?;
                Ok(quote_lots)
            }
            Side::Ask => {
                owner.unlock_base_lots(base_lots)?;
                Ok(base_lots)
            }
        }
    }

    /// Takes an order off the book and unlocks its funds. Returns the funds released.
    pub(crate) fn remove_resting_order(
        &mut self,
        order_id: &OrderId,
        reason: OutReason,
        events: &mut impl EventSink,
    ) -> ClobResult<u64> {
        let order = self.book.remove(order_id).ok_or(ClobError::OrderNotFound)?;
        let released = self.release_funds(order_id, &order, order.num_base_lots)?;
        self.traders.remove_open_order(order.trader_index)?;
        events.push_event(MarketEvent::Out(OutEvent::new(
            reason,
            order.trader_index,
            *order_id,
            order.num_base_lots,
            0,
        )))?;
        Ok(released)
    }

    /// Takes `base_lots` off a resting order, removing it once empty, and unlocks the matching
    /// funds. Returns the order as it stands afterwards and the funds released.
    pub(crate) fn reduce_resting_order(
        &mut self,
        order_id: &OrderId,
        order: &RestingOrder,
        base_lots: u64,
        reason: OutReason,
        events: &mut impl EventSink,
    ) -> ClobResult<(RestingOrder, u64)> {
        let remaining = self.book.reduce(order_id, base_lots)?;
        let released = self.release_funds(order_id, order, base_lots)?;
        if remaining.num_base_lots == 0 {
            self.traders.remove_open_order(order.trader_index)?;
        }
        events.push_event(MarketEvent::Out(OutEvent::new(
            reason,
            order.trader_index,
            *order_id,
            base_lots,
            remaining.num_base_lots,
        )))?;
        Ok((remaining, released))
    }

    fn remove_collected(
        &mut self,
        orders: Vec<LeafNode>,
        reason: OutReason,
        events: &mut impl EventSink,
    ) -> ClobResult<CancelSummary> {
        if events.remaining_capacity() < orders.len() {
            return Err(ClobError::EventQueueFull);
        }
        let mut summary = CancelSummary::default();
        for leaf in orders {
            let released = self.remove_resting_order(&leaf.order_id, reason, events)?;
            summary.record(leaf.order_id.side(), released)?;
            summary.cancelled_order_ids.push(leaf.order_id);
        }
        Ok(summary)
    }

    /// Cancels a single order. An order that already left the book is a no-op.
    pub fn cancel_order(
        &mut self,
        trader: &[u8; 32],
        order_id: &OrderId,
        events: &mut impl EventSink,
    ) -> ClobResult<CancelSummary> {
        let trader_index = self.trader_index(trader)?;
        match self.book.get(order_id) {
            None => Ok(CancelSummary::default()),
            Some(order) if order.trader_index != trader_index => Err(ClobError::OrderNotFound),
            Some(order) => self.remove_collected(
                vec![LeafNode::new(*order_id, order)],
                OutReason::Cancelled,
                events,
            ),
        }
    }

    /// Cancels every listed order the trader owns. Missing and foreign ids are skipped.
    pub fn cancel_multiple_orders_by_id(
        &mut self,
        trader: &[u8; 32],
        order_ids: &[OrderId],
        events: &mut impl EventSink,
    ) -> ClobResult<CancelSummary> {
        let trader_index = self.trader_index(trader)?;
        let mut orders: Vec<LeafNode> = Vec::with_capacity(order_ids.len());
        for order_id in order_ids {
            if orders.iter().any(|leaf| leaf.order_id == *order_id) {
                continue;
            }
            if let Some(order) = self.book.get(order_id) {
                if order.trader_index == trader_index {
                    orders.push(LeafNode::new(*order_id, order));
                }
            }
        }
        self.remove_collected(orders, OutReason::Cancelled, events)
    }

    /// Cancels the trader's orders on one side, from the boundary to the back of the book.
    pub fn cancel_up_to(
        &mut self,
        trader: &[u8; 32],
        params: &CancelUpToParams,
        events: &mut impl EventSink,
    ) -> ClobResult<CancelSummary> {
        let trader_index = self.trader_index(trader)?;
        let side = params.side;
        if matches!(params.boundary, Some(boundary) if boundary.side() != side) {
            return Err(ClobError::OrderNotFound);
        }
        let iter = match &params.boundary {
            Some(boundary) => self.book.iter_behind(side, boundary),
            None => self.book.iter_side(side),
        };
        let num_orders_to_search = params
            .num_orders_to_search
            .map_or(usize::MAX, |n| n as usize);
        let num_orders_to_cancel = params
            .num_orders_to_cancel
            .map_or(usize::MAX, |n| n as usize);
        let orders = iter
            .take(num_orders_to_search)
            .filter(|leaf| leaf.order.trader_index == trader_index)
            .take(num_orders_to_cancel)
            .collect::<Vec<_>>();
        self.remove_collected(orders, OutReason::Cancelled, events)
    }

    /// Cancels every order of the trader on both sides.
    pub fn cancel_all_orders(
        &mut self,
        trader: &[u8; 32],
        events: &mut impl EventSink,
    ) -> ClobResult<CancelSummary> {
        let trader_index = self.trader_index(trader)?;
        let orders = [Side::Bid, Side::Ask]
            .into_iter()
            .flat_map(|side| self.book.iter_side(side))
            .filter(|leaf| leaf.order.trader_index == trader_index)
            .collect::<Vec<_>>();
        self.remove_collected(orders, OutReason::Cancelled, events)
    }

    /// Shrinks an order by up to `base_lots`, removing it when nothing is left.
    pub fn reduce_order(
        &mut self,
        trader: &[u8; 32],
        order_id: &OrderId,
        base_lots: u64,
        events: &mut impl EventSink,
    ) -> ClobResult<CancelSummary> {
        if base_lots == 0 {
            return Err(ValidationError::ZeroSize.into());
        }
        let trader_index = self.trader_index(trader)?;
        let order = self
            .book
            .get(order_id)
            .filter(|order| order.trader_index == trader_index)
            .ok_or(ClobError::OrderNotFound)?;
        if events.remaining_capacity() < 1 {
            return Err(ClobError::EventQueueFull);
        }

        let base_lots = base_lots.min(order.num_base_lots);
        let (remaining, released) =
            self.reduce_resting_order(order_id, &order, base_lots, OutReason::Reduced, events)?;
        let mut summary = CancelSummary::default();
        summary.record(order_id.side(), released)?;
        if remaining.num_base_lots == 0 {
            summary.cancelled_order_ids.push(*order_id);
        }
        Ok(summary)
    }

    /// Removes up to `max_orders` expired orders from one side, whoever owns them. The number
    /// of orders removed is also bounded by the room left in the event sink.
    pub fn prune_expired_orders(
        &mut self,
        side: Side,
        max_orders: usize,
        clock: &ClockReading,
        events: &mut impl EventSink,
    ) -> ClobResult<CancelSummary> {
        let orders = self
            .book
            .iter_side(side)
            .filter(|leaf| leaf.order.is_expired(clock))
            .take(max_orders.min(events.remaining_capacity()))
            .collect::<Vec<_>>();
        if !orders.is_empty() {
            msg!("Pruning {} expired orders", orders.len());
        }
        self.remove_collected(orders, OutReason::Expired, events)
    }
}
