/*!
Solana program implementing a deterministic central limit order book with price-time priority.

## Overview

A market lives in four accounts owned by the program:
- the market account, holding the [`MarketState`][`state::market_state::MarketState`] header and
  the trader seats (free and locked balances, counted in lots),
- two critbit slabs holding the resting bids and asks,
- an event queue through which fills, placements and order removals are published.

Traders first claim a seat with [`register_trader`][`fn@instruction::register_trader`]. Funds
are credited to and debited from seats by the market's caller authority, which is expected to
hold the corresponding tokens.

## Placing orders

The [`new_order`][`fn@instruction::new_order`] instruction takes an
[`OrderPacket`][`state::order_packet::OrderPacket`]: post-only, limit or immediate-or-cancel.
The packet is matched against the opposite side in price-time priority, then what is left of a
limit or post-only order rests on the book. Every check runs before the first write, so a failed
order leaves the market untouched. The result is returned as an
[`OrderSummary`][`matching::OrderSummary`] through the instruction return data.

Several orders can be placed at once with
[`place_multiple_orders`][`fn@instruction::place_multiple_orders`], under a
[`FailedMultipleLimitOrderBehavior`][`state::order_packet::FailedMultipleLimitOrderBehavior`].

## Cancelling orders

Resting orders can be cancelled by id, by list of ids, from a boundary to the back of the book,
or all at once, and reduced in size. Expired orders are removed by anyone through
[`prune_expired_orders`][`fn@instruction::prune_expired_orders`].

## Processing the queue

The event queue can be parsed as an [`EventQueue`][`state::event_queue::EventQueue`]. Once the
events are processed, the caller authority pops them with
[`consume_events`][`fn@instruction::consume_events`].

## Off-chain use

The matching engine does not depend on the Solana runtime. [`market::MarketAccounts`] operates on
raw byte buffers, [`snapshot::MarketSnapshot`] decodes a market into an owned model, and
[`lot_math::LotConverter`] converts between token atoms, lots and prices.
*/

pub mod batch;
#[doc(hidden)]
pub mod entrypoint;
pub mod error;
/// Program instructions and their CPI-compatible bindings
pub mod instruction;
pub mod lifecycle;
pub mod lot_math;
pub mod market;
pub mod matching;
pub mod snapshot;
/// Describes the different data structres that the program uses to encode state
pub mod state;

use solana_program::declare_id;

#[doc(hidden)]
pub mod processor;
/// Utility functions
pub mod utils;

declare_id!("2NBaxKdgGkhBXjeiRQTMEBUak6jnRNbBBnV64XU7Kr1x");
