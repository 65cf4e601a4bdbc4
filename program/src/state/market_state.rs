//! The market state struct tracks the market parameters, the accounts it is bound to and the
//! per-side order sequence numbers. The trader registry follows it in the same account.
use bytemuck::{Pod, Zeroable};
use std::mem::size_of;

use super::{
    order::MAX_ORDER_SEQUENCE_NUMBER, trader_registry::TraderRegistry, AccountTag, OrderId, Side,
};
use crate::error::{ClobError, ClobResult};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
/// The orderbook market's central state
pub struct MarketState {
    /// The required signer for funds management and event consumption
    pub caller_authority: [u8; 32],
    /// The public key of the orderbook's event queue account
    pub event_queue: [u8; 32],
    /// The public key of the orderbook's bids account
    pub bids: [u8; 32],
    /// The public key of the orderbook's asks account
    pub asks: [u8; 32],
    pub base_lots_per_base_unit: u64,
    /// Tick size, in quote lots per base unit
    pub tick_size_in_quote_lots_per_base_unit: u64,
    /// Number of bids posted so far
    pub bid_sequence_number: u64,
    /// Number of asks posted so far
    pub ask_sequence_number: u64,
}

impl MarketState {
    /// Expected size in bytes of MarketState
    pub const LEN: usize = size_of::<Self>();

    pub fn new(
        caller_authority: [u8; 32],
        event_queue: [u8; 32],
        bids: [u8; 32],
        asks: [u8; 32],
        base_lots_per_base_unit: u64,
        tick_size_in_quote_lots_per_base_unit: u64,
    ) -> Self {
        Self {
            caller_authority,
            event_queue,
            bids,
            asks,
            base_lots_per_base_unit,
            tick_size_in_quote_lots_per_base_unit,
            bid_sequence_number: 0,
            ask_sequence_number: 0,
        }
    }

    /// Size of a market account able to seat `num_seats` traders.
    pub fn compute_allocation_size(num_seats: usize) -> usize {
        8 + Self::LEN + TraderRegistry::compute_allocation_size(num_seats)
    }

    /// Checks that a whole number of quote lots corresponds to every (tick, base lot) pair.
    pub fn validate_parameters(&self) -> ClobResult {
        if self.base_lots_per_base_unit == 0
            || self.tick_size_in_quote_lots_per_base_unit == 0
            || self.tick_size_in_quote_lots_per_base_unit % self.base_lots_per_base_unit != 0
        {
            return Err(ClobError::InvalidMarketParameters);
        }
        Ok(())
    }

    pub fn initialize(buf: &mut [u8], state: MarketState) -> ClobResult {
        if buf.len() < Self::compute_allocation_size(1) {
            return Err(ClobError::InvalidAccountData);
        }
        if buf[0..8] != (AccountTag::Uninitialized as u64).to_le_bytes() {
            return Err(ClobError::AlreadyInitialized);
        }
        state.validate_parameters()?;
        buf[0..8].copy_from_slice(&(AccountTag::Market as u64).to_le_bytes());
        buf[8..8 + Self::LEN].copy_from_slice(bytemuck::bytes_of(&state));
        buf[8 + Self::LEN..].fill(0);
        Ok(())
    }

    pub fn from_buffer(account_data: &mut [u8]) -> ClobResult<(&mut Self, TraderRegistry<'_>)> {
        if account_data.len() < 8 + Self::LEN
            || account_data[0..8] != (AccountTag::Market as u64).to_le_bytes()
        {
            return Err(ClobError::InvalidAccountData);
        }
        let (header, registry) = account_data[8..].split_at_mut(Self::LEN);
        let state: &mut Self =
            bytemuck::try_from_bytes_mut(header).map_err(|_| ClobError::InvalidAccountData)?;
        state.validate_parameters()?;
        Ok((state, TraderRegistry::from_buffer(registry)?))
    }

    /// The id the next order posted on `side` at `price_in_ticks` will get.
    pub fn peek_order_id(&self, side: Side, price_in_ticks: u64) -> ClobResult<OrderId> {
        let sequence_number = match side {
            Side::Bid => self.bid_sequence_number,
            Side::Ask => self.ask_sequence_number,
        };
        if sequence_number >= MAX_ORDER_SEQUENCE_NUMBER - 1 {
            return Err(ClobError::SequenceNumberExhausted);
        }
        Ok(OrderId::new_for_side(price_in_ticks, sequence_number, side))
    }

    pub fn next_order_id(&mut self, side: Side, price_in_ticks: u64) -> ClobResult<OrderId> {
        let order_id = self.peek_order_id(side, price_in_ticks)?;
        match side {
            Side::Bid => self.bid_sequence_number += 1,
            Side::Ask => self.ask_sequence_number += 1,
        }
        Ok(order_id)
    }

    /// Quote lots exchanged for one base lot at `price_in_ticks`.
    pub fn quote_lots_per_base_lot(&self, price_in_ticks: u64) -> ClobResult<u64> {
        let per_tick = self.tick_size_in_quote_lots_per_base_unit / self.base_lots_per_base_unit;
        price_in_ticks
            .checked_mul(per_tick)
            .ok_or(ClobError::ArithmeticOverflow)
    }

    /// Quote lots exchanged for `base_lots` at `price_in_ticks`.
    pub fn quote_lots_for(&self, price_in_ticks: u64, base_lots: u64) -> ClobResult<u64> {
        self.quote_lots_per_base_lot(price_in_ticks)?
            .checked_mul(base_lots)
            .ok_or(ClobError::ArithmeticOverflow)
    }
}
