//! Typed views over the four account buffers of a market.
use solana_program::msg;

use crate::{
    error::{ClobError, ClobResult, ValidationError},
    state::{
        critbit::Slab,
        event_queue::EventQueue,
        market_state::MarketState,
        orderbook::OrderBookState,
        trader_registry::{TraderRegistry, TraderState},
        AccountTag,
    },
};

/// The raw account buffers of a market.
pub struct MarketAccounts<'a> {
    pub market: &'a mut [u8],
    pub bids: &'a mut [u8],
    pub asks: &'a mut [u8],
    pub event_queue: &'a mut [u8],
}

/// Owned copy of every buffer of a market, taken before a batch so that it can be rolled back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferSnapshot {
    market: Vec<u8>,
    bids: Vec<u8>,
    asks: Vec<u8>,
    event_queue: Vec<u8>,
}

impl<'a> MarketAccounts<'a> {
    pub fn new(
        market: &'a mut [u8],
        bids: &'a mut [u8],
        asks: &'a mut [u8],
        event_queue: &'a mut [u8],
    ) -> Self {
        Self {
            market,
            bids,
            asks,
            event_queue,
        }
    }

    /// Tags zeroed buffers as a new market. `market_address` binds both book sides to the market.
    pub fn initialize(&mut self, market_address: [u8; 32], state: MarketState) -> ClobResult {
        MarketState::initialize(self.market, state)?;
        Slab::initialize(self.bids, AccountTag::Bids, market_address)?;
        Slab::initialize(self.asks, AccountTag::Asks, market_address)?;
        EventQueue::initialize(self.event_queue)
    }

    pub fn load(&mut self) -> ClobResult<(Market<'_>, EventQueue<'_>)> {
        let market = Market::load(self.market, self.bids, self.asks)?;
        let event_queue = EventQueue::from_buffer(self.event_queue)?;
        Ok((market, event_queue))
    }

    pub fn capture(&self) -> BufferSnapshot {
        BufferSnapshot {
            market: self.market.to_vec(),
            bids: self.bids.to_vec(),
            asks: self.asks.to_vec(),
            event_queue: self.event_queue.to_vec(),
        }
    }

    /// Writes back the bytes of a previous [`MarketAccounts::capture`].
    pub fn restore(&mut self, snapshot: &BufferSnapshot) -> ClobResult {
        if snapshot.market.len() != self.market.len()
            || snapshot.bids.len() != self.bids.len()
            || snapshot.asks.len() != self.asks.len()
            || snapshot.event_queue.len() != self.event_queue.len()
        {
            return Err(ClobError::InvalidAccountData);
        }
        self.market.copy_from_slice(&snapshot.market);
        self.bids.copy_from_slice(&snapshot.bids);
        self.asks.copy_from_slice(&snapshot.asks);
        self.event_queue.copy_from_slice(&snapshot.event_queue);
        Ok(())
    }
}

/// A loaded market: header, trader seats and both sides of the book.
pub struct Market<'a> {
    pub state: &'a mut MarketState,
    pub traders: TraderRegistry<'a>,
    pub book: OrderBookState<'a>,
}

impl<'a> Market<'a> {
    pub fn load(
        market: &'a mut [u8],
        bids: &'a mut [u8],
        asks: &'a mut [u8],
    ) -> ClobResult<Self> {
        let (state, traders) = MarketState::from_buffer(market)?;
        let book = OrderBookState::new_safe(bids, asks)?;
        Ok(Self {
            state,
            traders,
            book,
        })
    }

    pub fn register_trader(&mut self, trader: &[u8; 32]) -> ClobResult<u64> {
        self.traders.register(trader)
    }

    /// Frees the seat of a trader holding no funds and no resting orders.
    pub fn evict_seat(&mut self, trader: &[u8; 32]) -> ClobResult<u64> {
        let trader_index = self.traders.evict(trader)?;
        msg!("Evicted seat {}", trader_index);
        Ok(trader_index)
    }

    pub fn deposit_funds(
        &mut self,
        trader: &[u8; 32],
        quote_lots: u64,
        base_lots: u64,
    ) -> ClobResult<TraderState> {
        self.traders.deposit_funds(trader, quote_lots, base_lots)
    }

    /// See [`TraderRegistry::withdraw_funds`].
    pub fn withdraw_funds(
        &mut self,
        trader: &[u8; 32],
        quote_lots: Option<u64>,
        base_lots: Option<u64>,
    ) -> ClobResult<(u64, u64)> {
        self.traders.withdraw_funds(trader, quote_lots, base_lots)
    }

    pub fn trader_index(&self, trader: &[u8; 32]) -> ClobResult<u64> {
        self.traders
            .lookup(trader)
            .ok_or(ClobError::Validation(ValidationError::UnknownTrader))
    }
}
