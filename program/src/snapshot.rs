//! Owned, read-only copies of a market.
//!
//! A [`MarketSnapshot`] is decoded once from the account buffers and never points back into
//! them, so it can be shared across threads while the market keeps changing.
use crate::{
    error::{ClobError, ClobResult},
    market::{Market, MarketAccounts},
    state::{
        critbit::{LeafNode, Slab},
        market_state::MarketState,
        trader_registry::TraderState,
        AccountTag, OrderId, RestingOrder, Side,
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraderRecord {
    pub trader_index: u64,
    pub trader: [u8; 32],
    pub state: TraderState,
    pub num_open_orders: u64,
}

/// Total size resting at one price.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LadderLevel {
    pub price_in_ticks: u64,
    pub size_in_base_lots: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ladder {
    pub bids: Vec<LadderLevel>,
    pub asks: Vec<LadderLevel>,
}

/// Groups orders given in priority order into at most `max_levels` price levels.
fn aggregate_levels(
    orders: impl Iterator<Item = (u64, u64)>,
    max_levels: usize,
) -> Vec<LadderLevel> {
    let mut levels: Vec<LadderLevel> = Vec::new();
    for (price_in_ticks, size_in_base_lots) in orders {
        if let Some(level) = levels
            .last_mut()
            .filter(|level| level.price_in_ticks == price_in_ticks)
        {
            level.size_in_base_lots = level.size_in_base_lots.saturating_add(size_in_base_lots);
            continue;
        }
        if levels.len() == max_levels {
            break;
        }
        levels.push(LadderLevel {
            price_in_ticks,
            size_in_base_lots,
        });
    }
    levels
}

fn leaf_level(leaf: LeafNode) -> (u64, u64) {
    (leaf.order_id.price_in_ticks, leaf.order.num_base_lots)
}

impl<'a> Market<'a> {
    /// Price levels of `side` no better than `start_price`, in priority order.
    pub fn levels_from(
        &self,
        side: Side,
        start_price: u64,
        max_levels: usize,
    ) -> Vec<LadderLevel> {
        aggregate_levels(
            self.book.iter_from(side, start_price).map(leaf_level),
            max_levels,
        )
    }

    pub fn ladder(&self, max_levels: usize) -> Ladder {
        Ladder {
            bids: aggregate_levels(self.book.iter_side(Side::Bid).map(leaf_level), max_levels),
            asks: aggregate_levels(self.book.iter_side(Side::Ask).map(leaf_level), max_levels),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarketSnapshot {
    pub market_address: [u8; 32],
    pub state: MarketState,
    /// Seated traders, sorted by key
    pub traders: Vec<TraderRecord>,
    /// Bids in matching priority
    pub bids: Vec<(OrderId, RestingOrder)>,
    /// Asks in matching priority
    pub asks: Vec<(OrderId, RestingOrder)>,
}

impl MarketSnapshot {
    pub fn from_market(market: &Market) -> ClobResult<Self> {
        let traders = market
            .traders
            .iter()
            .map(|entry| {
                let seat = market.traders.seat(entry.trader_index)?;
                Ok(TraderRecord {
                    trader_index: entry.trader_index,
                    trader: entry.trader,
                    state: seat.state,
                    num_open_orders: seat.num_open_orders,
                })
            })
            .collect::<ClobResult<Vec<_>>>()?;
        let side_orders = |side| {
            market
                .book
                .iter_side(side)
                .map(|leaf| (leaf.order_id, leaf.order))
                .collect::<Vec<_>>()
        };
        Ok(Self {
            market_address: market.book.bids.header.market_address,
            state: *market.state,
            traders,
            bids: side_orders(Side::Bid),
            asks: side_orders(Side::Ask),
        })
    }

    pub fn from_accounts(accounts: &mut MarketAccounts) -> ClobResult<Self> {
        let (market, _) = accounts.load()?;
        Self::from_market(&market)
    }

    pub fn best_bid(&self) -> Option<&(OrderId, RestingOrder)> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&(OrderId, RestingOrder)> {
        self.asks.first()
    }

    pub fn ladder(&self, max_levels: usize) -> Ladder {
        let levels = |orders: &[(OrderId, RestingOrder)]| {
            aggregate_levels(
                orders
                    .iter()
                    .map(|(id, order)| (id.price_in_ticks, order.num_base_lots)),
                max_levels,
            )
        };
        Ladder {
            bids: levels(&self.bids),
            asks: levels(&self.asks),
        }
    }

    pub fn trader(&self, trader: &[u8; 32]) -> Option<&TraderRecord> {
        self.traders
            .binary_search_by(|record| record.trader.cmp(trader))
            .ok()
            .map(|position| &self.traders[position])
    }

    pub fn trader_state(&self, trader: &[u8; 32]) -> Option<&TraderState> {
        self.trader(trader).map(|record| &record.state)
    }

    /// Resting orders of a trader, bids first.
    pub fn orders_of(&self, trader_index: u64) -> impl Iterator<Item = &(OrderId, RestingOrder)> {
        self.bids
            .iter()
            .chain(self.asks.iter())
            .filter(move |(_, order)| order.trader_index == trader_index)
    }

    /// Rebuilds the market, bids and asks buffers from the snapshot, leaving the event queue
    /// untouched. Node layouts may differ from the original buffers; the decoded market is the
    /// same.
    pub fn write_to(&self, accounts: &mut MarketAccounts) -> ClobResult {
        let num_seats = self
            .traders
            .iter()
            .map(|t| t.trader_index as usize + 1)
            .max()
            .unwrap_or(1);
        if accounts.market.len() < MarketState::compute_allocation_size(num_seats)
            || accounts.bids.len() < Slab::compute_allocation_size(self.bids.len())
            || accounts.asks.len() < Slab::compute_allocation_size(self.asks.len())
        {
            return Err(ClobError::InvalidAccountData);
        }

        accounts.market.fill(0);
        accounts.bids.fill(0);
        accounts.asks.fill(0);
        MarketState::initialize(accounts.market, self.state)?;
        Slab::initialize(accounts.bids, AccountTag::Bids, self.market_address)?;
        Slab::initialize(accounts.asks, AccountTag::Asks, self.market_address)?;

        let mut market = Market::load(accounts.market, accounts.bids, accounts.asks)?;
        for record in &self.traders {
            market.traders.restore_seat(
                record.trader_index,
                &record.trader,
                record.state,
                record.num_open_orders,
            )?;
        }
        market.traders.rebuild_free_list();
        for (side, orders) in [(Side::Bid, &self.bids), (Side::Ask, &self.asks)] {
            for (order_id, order) in orders {
                market.book.insert(*order_id, *order, side)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn snapshots_are_shareable() {
        assert_send_sync::<MarketSnapshot>();
    }

    #[test]
    fn levels_merge_equal_prices() {
        let orders = [(105, 1), (105, 2), (100, 4), (99, 1), (98, 7)];
        let levels = aggregate_levels(orders.into_iter(), 3);
        assert_eq!(
            levels,
            vec![
                LadderLevel {
                    price_in_ticks: 105,
                    size_in_base_lots: 3
                },
                LadderLevel {
                    price_in_ticks: 100,
                    size_in_base_lots: 4
                },
                LadderLevel {
                    price_in_ticks: 99,
                    size_in_base_lots: 1
                },
            ]
        );
        assert!(aggregate_levels(orders.into_iter(), 0).is_empty());
    }
}
