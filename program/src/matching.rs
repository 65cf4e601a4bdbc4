//! Price-time priority matching.
//!
//! An order is first planned against a read-only view of the book. Every check (minimum fill,
//! book capacity, funds, event capacity) runs against the plan, and the plan is only applied
//! once all of them passed. A rejected order therefore leaves no trace.
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::msg;

use crate::{
    error::{ClobError, ClobResult, ValidationError},
    market::Market,
    state::{
        critbit::LeafNode,
        event_queue::{EventSink, FillEvent, MarketEvent, OutReason, PlaceEvent},
        order_packet::OrderPacket,
        ClockReading, OrderId, RestingOrder, SelfTradeBehavior, Side,
    },
};

#[derive(BorshDeserialize, BorshSerialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fill {
    pub maker_order_id: OrderId,
    pub maker_trader_index: u64,
    pub taker_trader_index: u64,
    pub price_in_ticks: u64,
    pub base_lots_filled: u64,
    pub quote_lots_filled: u64,
}

/// Outcome of a single order.
#[derive(BorshDeserialize, BorshSerialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderSummary {
    /// Id of the resting remainder, if any was posted
    pub posted_order_id: Option<OrderId>,
    pub client_order_id: u128,
    pub total_base_lots_filled: u64,
    pub total_quote_lots_filled: u64,
    pub base_lots_posted: u64,
    /// Remainder of a limit order left unposted because its match limit ran out while the book
    /// still crossed its price
    pub base_lots_not_posted: u64,
    /// Base lots the trader must transfer in, beyond its free balance
    pub num_base_lots_in: u64,
    /// Quote lots the trader must transfer in, beyond its free balance
    pub num_quote_lots_in: u64,
    /// Base lots owed to the trader and not credited to its seat
    pub num_base_lots_out: u64,
    /// Quote lots owed to the trader and not credited to its seat
    pub num_quote_lots_out: u64,
    pub fills: Vec<Fill>,
}

#[derive(Clone, Copy, Debug)]
enum MakerStep {
    Fill {
        maker: LeafNode,
        base_lots: u64,
        quote_lots: u64,
    },
    Remove {
        maker: LeafNode,
        reason: OutReason,
    },
    /// Takes size off the maker without any transfer
    Reduce {
        maker: LeafNode,
        base_lots: u64,
        reason: OutReason,
    },
}

#[derive(Debug, Default)]
struct MatchPlan {
    steps: Vec<MakerStep>,
    base_lots_filled: u64,
    quote_lots_filled: u64,
    /// Price the remainder rests at
    price_in_ticks: u64,
    base_lots_remaining: u64,
    /// The match limit ran out while the book still crossed, so the remainder cannot rest
    crossing: bool,
}

struct Settlement {
    post: Option<RestingOrder>,
    /// Quote locked by a posted bid
    quote_lots_to_lock: u64,
    eviction: Option<LeafNode>,
    /// Lots the taker pays, in the asset it gives away
    debit: u64,
    /// Lots the taker receives, in the asset it buys
    credit: u64,
}

/// Returns true if a taker on `side` limited at `limit` can trade with a maker at `maker_price`.
/// A market order crosses every price.
pub fn crosses(side: Side, limit: Option<u64>, maker_price: u64) -> bool {
    match (side, limit) {
        (_, None) => true,
        (Side::Bid, Some(limit)) => maker_price <= limit,
        (Side::Ask, Some(limit)) => maker_price >= limit,
    }
}

fn checked_add(a: u64, b: u64) -> ClobResult<u64> {
    a.checked_add(b).ok_or(ClobError::ArithmeticOverflow)
}

impl<'a> Market<'a> {
    /// Matches an order against the book and posts the remainder when the order type allows it.
    pub fn place_order(
        &mut self,
        trader: &[u8; 32],
        packet: &OrderPacket,
        clock: &ClockReading,
        events: &mut impl EventSink,
    ) -> ClobResult<OrderSummary> {
        packet.validate()?;
        if packet.is_expired(clock) {
            return Err(ValidationError::OrderPacketExpired.into());
        }
        let trader_index = self.trader_index(trader)?;

        let plan = match *packet {
            OrderPacket::PostOnly {
                side,
                price_in_ticks,
                num_base_lots,
                reject_post_only,
                ..
            } => self.plan_post_only(
                side,
                price_in_ticks,
                num_base_lots,
                reject_post_only,
                clock,
            )?,
            OrderPacket::Limit { .. } | OrderPacket::ImmediateOrCancel { .. } => {
                self.plan_match(trader_index, packet, clock)?
            }
        };
        let settlement = self.check_plan(trader_index, packet, &plan, events)?;
        self.apply_plan(trader_index, packet, plan, settlement, events)
    }

    fn plan_post_only(
        &self,
        side: Side,
        price_in_ticks: u64,
        num_base_lots: u64,
        reject_post_only: bool,
        clock: &ClockReading,
    ) -> ClobResult<MatchPlan> {
        let mut plan = MatchPlan::default();
        let mut price_in_ticks = price_in_ticks;
        for maker in self.book.iter_side(side.opposite()) {
            let maker_price = maker.order_id.price_in_ticks;
            if !crosses(side, Some(price_in_ticks), maker_price) {
                break;
            }
            if maker.order.is_expired(clock) {
                plan.steps.push(MakerStep::Remove {
                    maker,
                    reason: OutReason::Expired,
                });
                continue;
            }
            if reject_post_only {
                return Err(ClobError::PostOnlyCrossed);
            }
            price_in_ticks = match side {
                Side::Bid => maker_price
                    .checked_sub(1)
                    .filter(|price| *price > 0)
                    .ok_or(ClobError::PostOnlyCrossed)?,
                Side::Ask => maker_price
                    .checked_add(1)
                    .ok_or(ClobError::ArithmeticOverflow)?,
            };
            msg!("Post-only order repriced to {}", price_in_ticks);
            break;
        }
        plan.price_in_ticks = price_in_ticks;
        plan.base_lots_remaining = num_base_lots;
        Ok(plan)
    }

    fn plan_match(
        &self,
        taker_index: u64,
        packet: &OrderPacket,
        clock: &ClockReading,
    ) -> ClobResult<MatchPlan> {
        let side = packet.side();
        let limit = packet.price_in_ticks();
        let self_trade_behavior = packet.self_trade_behavior();
        let mut base_budget = packet.base_lot_budget();
        let mut quote_budget = packet.quote_lot_budget();
        let mut match_limit = packet.match_limit();
        let mut plan = MatchPlan {
            price_in_ticks: limit.unwrap_or(0),
            ..MatchPlan::default()
        };

        for maker in self.book.iter_side(side.opposite()) {
            if base_budget == 0 || quote_budget == 0 {
                break;
            }
            let maker_price = maker.order_id.price_in_ticks;
            if !crosses(side, limit, maker_price) {
                break;
            }
            if match_limit == 0 {
                plan.crossing = true;
                break;
            }
            match_limit -= 1;

            if maker.order.is_expired(clock) {
                plan.steps.push(MakerStep::Remove {
                    maker,
                    reason: OutReason::Expired,
                });
                continue;
            }

            let quote_lots_per_base_lot = self.state.quote_lots_per_base_lot(maker_price)?;
            let base_lots = maker
                .order
                .num_base_lots
                .min(base_budget)
                .min(quote_budget / quote_lots_per_base_lot);
            if base_lots == 0 {
                break;
            }
            let quote_lots = quote_lots_per_base_lot
                .checked_mul(base_lots)
                .ok_or(ClobError::ArithmeticOverflow)?;

            if maker.order.trader_index == taker_index {
                match self_trade_behavior {
                    SelfTradeBehavior::Abort => return Err(ClobError::SelfTrade),
                    SelfTradeBehavior::CancelProvide => {
                        plan.steps.push(MakerStep::Remove {
                            maker,
                            reason: OutReason::SelfTrade,
                        });
                        continue;
                    }
                    SelfTradeBehavior::DecrementTake => {
                        plan.steps.push(MakerStep::Reduce {
                            maker,
                            base_lots,
                            reason: OutReason::SelfTrade,
                        });
                        base_budget -= base_lots;
                        quote_budget -= quote_lots;
                        continue;
                    }
                }
            }

            plan.steps.push(MakerStep::Fill {
                maker,
                base_lots,
                quote_lots,
            });
            base_budget -= base_lots;
            quote_budget -= quote_lots;
            plan.base_lots_filled = checked_add(plan.base_lots_filled, base_lots)?;
            plan.quote_lots_filled = checked_add(plan.quote_lots_filled, quote_lots)?;
        }

        if matches!(packet, OrderPacket::Limit { .. }) {
            plan.base_lots_remaining = base_budget;
        }
        Ok(plan)
    }

    fn check_plan(
        &self,
        taker_index: u64,
        packet: &OrderPacket,
        plan: &MatchPlan,
        events: &impl EventSink,
    ) -> ClobResult<Settlement> {
        if let OrderPacket::ImmediateOrCancel {
            min_base_lots_to_fill,
            min_quote_lots_to_fill,
            ..
        } = packet
        {
            if plan.base_lots_filled < *min_base_lots_to_fill
                || plan.quote_lots_filled < *min_quote_lots_to_fill
            {
                return Err(ClobError::MinimumFillNotMet);
            }
        }

        let side = packet.side();
        let mut post = None;
        let mut eviction = None;
        if plan.base_lots_remaining > 0 && plan.crossing {
            msg!(
                "{} base lots left crossing the book are not posted",
                plan.base_lots_remaining
            );
        } else if plan.base_lots_remaining > 0 {
            let order_id = self.state.peek_order_id(side, plan.price_in_ticks)?;
            if self.book.get_tree(side).is_full() {
                let least_aggressive = self
                    .book
                    .least_aggressive(side)
                    .ok_or(ClobError::BookFull)?;
                if !order_id.has_priority_over(&least_aggressive.order_id) {
                    return Err(ClobError::BookFull);
                }
                eviction = Some(least_aggressive);
            }
            post = Some(RestingOrder::new(
                taker_index,
                plan.base_lots_remaining,
                packet.last_valid_slot(),
                packet.last_valid_unix_timestamp_in_seconds(),
            ));
        }

        let posted_lots = post.map_or(0, |order| order.num_base_lots);
        let quote_lots_to_lock = match side {
            Side::Bid => self.state.quote_lots_for(plan.price_in_ticks, posted_lots)?,
            Side::Ask => 0,
        };
        let (debit, credit) = match side {
            Side::Bid => (
                checked_add(plan.quote_lots_filled, quote_lots_to_lock)?,
                plan.base_lots_filled,
            ),
            Side::Ask => (
                checked_add(plan.base_lots_filled, posted_lots)?,
                plan.quote_lots_filled,
            ),
        };

        if packet.use_only_deposited_funds() {
            let state = self.traders.state(taker_index)?;
            let mut available = match side {
                Side::Bid => state.quote_lots_free,
                Side::Ask => state.base_lots_free,
            };
            if let Some(evicted) = eviction.filter(|e| e.order.trader_index == taker_index) {
                available = checked_add(available, self.locked_funds(&evicted)?)?;
            }
            if available < debit {
                return Err(ClobError::InsufficientFunds);
            }
        }

        let events_needed =
            plan.steps.len() + usize::from(eviction.is_some()) + usize::from(post.is_some());
        if events.remaining_capacity() < events_needed {
            return Err(ClobError::EventQueueFull);
        }

        Ok(Settlement {
            post,
            quote_lots_to_lock,
            eviction,
            debit,
            credit,
        })
    }

    fn apply_plan(
        &mut self,
        taker_index: u64,
        packet: &OrderPacket,
        plan: MatchPlan,
        settlement: Settlement,
        events: &mut impl EventSink,
    ) -> ClobResult<OrderSummary> {
        let side = packet.side();
        let mut summary = OrderSummary {
            client_order_id: packet.client_order_id(),
            total_base_lots_filled: plan.base_lots_filled,
            total_quote_lots_filled: plan.quote_lots_filled,
            base_lots_not_posted: if plan.crossing {
                plan.base_lots_remaining
            } else {
                0
            },
            ..OrderSummary::default()
        };

        for step in plan.steps {
            match step {
                MakerStep::Fill {
                    maker,
                    base_lots,
                    quote_lots,
                } => {
                    let remaining = self.book.reduce(&maker.order_id, base_lots)?;
                    let maker_index = maker.order.trader_index;
                    let maker_state = self.traders.state_mut(maker_index)?;
                    match side {
                        Side::Bid => maker_state.process_limit_sell(base_lots, quote_lots)?,
                        Side::Ask => maker_state.process_limit_buy(quote_lots, base_lots)?,
                    }
                    if remaining.num_base_lots == 0 {
                        self.traders.remove_open_order(maker_index)?;
                    }
                    events.push_event(MarketEvent::Fill(FillEvent::new(
                        side,
                        maker_index,
                        taker_index,
                        maker.order_id,
                        base_lots,
                        quote_lots,
                    )))?;
                    summary.fills.push(Fill {
                        maker_order_id: maker.order_id,
                        maker_trader_index: maker_index,
                        taker_trader_index: taker_index,
                        price_in_ticks: maker.order_id.price_in_ticks,
                        base_lots_filled: base_lots,
                        quote_lots_filled: quote_lots,
                    });
                }
                MakerStep::Remove { maker, reason } => {
                    self.remove_resting_order(&maker.order_id, reason, events)?;
                }
                MakerStep::Reduce {
                    maker,
                    base_lots,
                    reason,
                } => {
                    self.reduce_resting_order(
                        &maker.order_id,
                        &maker.order,
                        base_lots,
                        reason,
                        events,
                    )?;
                }
            }
        }

        if let Some(evicted) = settlement.eviction {
            msg!(
                "Evicting order at price {} from trader {}",
                evicted.order_id.price_in_ticks,
                evicted.order.trader_index
            );
            self.remove_resting_order(&evicted.order_id, OutReason::Evicted, events)?;
        }

        let use_only_deposited_funds = packet.use_only_deposited_funds();
        let taker = self.traders.state_mut(taker_index)?;
        match side {
            Side::Bid => {
                let used = taker.use_free_quote_lots(settlement.debit);
                summary.num_quote_lots_in = settlement.debit - used;
                if use_only_deposited_funds {
                    taker.deposit(0, settlement.credit)?;
                } else {
                    summary.num_base_lots_out = settlement.credit;
                }
            }
            Side::Ask => {
                let used = taker.use_free_base_lots(settlement.debit);
                summary.num_base_lots_in = settlement.debit - used;
                if use_only_deposited_funds {
                    taker.deposit(settlement.credit, 0)?;
                } else {
                    summary.num_quote_lots_out = settlement.credit;
                }
            }
        }

        if let Some(order) = settlement.post {
            match side {
                Side::Bid => taker.lock_quote_lots(settlement.quote_lots_to_lock)?,
                Side::Ask => taker.lock_base_lots(order.num_base_lots)?,
            }
            let order_id = self.state.next_order_id(side, plan.price_in_ticks)?;
            self.book.insert(order_id, order, side)?;
            self.traders.add_open_order(taker_index)?;
            events.push_event(MarketEvent::Place(PlaceEvent::new(
                taker_index,
                order_id,
                order.num_base_lots,
                packet.client_order_id(),
            )))?;
            summary.posted_order_id = Some(order_id);
            summary.base_lots_posted = order.num_base_lots;
        }

        Ok(summary)
    }
}
