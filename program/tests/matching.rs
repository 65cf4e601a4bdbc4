use fifo_orderbook::error::{ClobError, ValidationError};
use fifo_orderbook::state::event_queue::{MarketEvent, OutReason};
use fifo_orderbook::state::order_packet::OrderPacket;
use fifo_orderbook::state::{ClockReading, OrderId, SelfTradeBehavior, Side};

mod common;
use crate::common::utils::{trader, MarketFixture};

const CLOCK: ClockReading = ClockReading {
    slot: 1,
    unix_timestamp: 1_700_000_000,
};

fn limit(side: Side, price_in_ticks: u64, num_base_lots: u64) -> OrderPacket {
    OrderPacket::new_limit_order(
        side,
        price_in_ticks,
        num_base_lots,
        SelfTradeBehavior::Abort,
        None,
        0,
        true,
        None,
        None,
    )
}

fn ioc(side: Side, price_in_ticks: u64, num_base_lots: u64) -> OrderPacket {
    OrderPacket::new_ioc_by_lots(
        side,
        price_in_ticks,
        num_base_lots,
        SelfTradeBehavior::Abort,
        None,
        0,
        true,
    )
}

#[test]
fn ioc_ask_partially_fills_a_resting_bid() {
    let mut fixture = MarketFixture::new(4, 16, 64);
    let (maker, taker) = (trader(1), trader(2));
    fixture.seat(&maker, 10_000, 0);
    fixture.seat(&taker, 0, 100);

    let bid = fixture
        .with_market(|market, queue| {
            market.place_order(&maker, &limit(Side::Bid, 100, 10), &CLOCK, queue)
        })
        .unwrap();
    let bid_id = OrderId::new_for_side(100, 0, Side::Bid);
    assert_eq!(bid.posted_order_id, Some(bid_id));
    assert_eq!(bid.base_lots_posted, 10);

    let ask = fixture
        .with_market(|market, queue| {
            market.place_order(&taker, &ioc(Side::Ask, 100, 5), &CLOCK, queue)
        })
        .unwrap();
    assert_eq!(ask.total_base_lots_filled, 5);
    assert_eq!(ask.total_quote_lots_filled, 500);
    assert_eq!(ask.posted_order_id, None);
    assert_eq!(ask.fills.len(), 1);
    assert_eq!(ask.fills[0].maker_order_id, bid_id);
    assert_eq!(ask.fills[0].price_in_ticks, 100);

    fixture.with_market(|market, _| {
        assert_eq!(market.book.get(&bid_id).unwrap().num_base_lots, 5);
        assert!(market.book.best_ask().is_none());

        let maker_state = market.traders.lookup_state(&maker).unwrap();
        assert_eq!(maker_state.quote_lots_locked, 500);
        assert_eq!(maker_state.quote_lots_free, 9_000);
        assert_eq!(maker_state.base_lots_free, 5);

        let taker_state = market.traders.lookup_state(&taker).unwrap();
        assert_eq!(taker_state.base_lots_free, 95);
        assert_eq!(taker_state.quote_lots_free, 500);
    });

    let events = fixture.drain_events();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], MarketEvent::Place(e) if e.order_id == bid_id));
    assert!(matches!(events[1], MarketEvent::Fill(e) if e.base_lots == 5 && e.quote_lots == 500));
}

#[test]
fn better_prices_then_earlier_orders_fill_first() {
    let mut fixture = MarketFixture::new(4, 16, 64);
    let (first, second, best, taker) = (trader(1), trader(2), trader(3), trader(4));
    for maker in [&first, &second, &best] {
        fixture.seat(maker, 10_000, 0);
    }
    fixture.seat(&taker, 0, 100);

    for (maker, price) in [(&first, 100), (&second, 100), (&best, 101)] {
        fixture
            .with_market(|market, queue| {
                market.place_order(maker, &limit(Side::Bid, price, 5), &CLOCK, queue)
            })
            .unwrap();
    }

    let summary = fixture
        .with_market(|market, queue| {
            market.place_order(&taker, &ioc(Side::Ask, 100, 12), &CLOCK, queue)
        })
        .unwrap();
    let filled = summary
        .fills
        .iter()
        .map(|fill| (fill.maker_order_id, fill.base_lots_filled))
        .collect::<Vec<_>>();
    assert_eq!(
        filled,
        vec![
            (OrderId::new_for_side(101, 2, Side::Bid), 5),
            (OrderId::new_for_side(100, 0, Side::Bid), 5),
            (OrderId::new_for_side(100, 1, Side::Bid), 2),
        ]
    );
    assert_eq!(summary.total_quote_lots_filled, 505 + 500 + 200);
}

#[test]
fn base_lots_are_conserved_across_random_orders() {
    use rand::prelude::*;

    let mut rng = StdRng::seed_from_u64(42);
    let mut fixture = MarketFixture::new(8, 256, 4096);
    let traders = (1..=4).map(trader).collect::<Vec<_>>();
    for t in &traders {
        fixture.seat(t, 1_000_000_000, 1_000_000);
    }
    let total_base = |fixture: &mut MarketFixture| {
        fixture.with_market(|market, _| {
            traders
                .iter()
                .map(|t| {
                    let state = market.traders.lookup_state(t).unwrap();
                    state.base_lots_free + state.base_lots_locked
                })
                .sum::<u64>()
        })
    };
    let initial = total_base(&mut fixture);

    for _ in 0..300 {
        let t = traders[rng.gen_range(0..traders.len())];
        let side = if rng.gen_bool(0.5) { Side::Bid } else { Side::Ask };
        let price = rng.gen_range(90..110);
        let size = rng.gen_range(1..20);
        let self_trade_behavior = if rng.gen_bool(0.5) {
            SelfTradeBehavior::CancelProvide
        } else {
            SelfTradeBehavior::DecrementTake
        };
        let packet = if rng.gen_bool(0.7) {
            OrderPacket::new_limit_order(
                side,
                price,
                size,
                self_trade_behavior,
                None,
                0,
                true,
                None,
                None,
            )
        } else {
            OrderPacket::new_ioc_by_lots(
                side,
                price,
                size,
                self_trade_behavior,
                None,
                0,
                true,
            )
        };
        let result = fixture.with_market(|market, queue| {
            let summary = market.place_order(&t, &packet, &CLOCK, queue);
            queue.pop_n(queue.len() as u64);
            summary
        });
        if let Ok(summary) = result {
            let maker_lots = summary
                .fills
                .iter()
                .map(|fill| fill.base_lots_filled)
                .sum::<u64>();
            assert_eq!(maker_lots, summary.total_base_lots_filled);
        }
        assert_eq!(total_base(&mut fixture), initial);
    }

    fixture.with_market(|market, _| {
        let best_bid = market.book.best_bid();
        let best_ask = market.book.best_ask();
        if let (Some((bid, _)), Some((ask, _))) = (best_bid, best_ask) {
            assert!(bid.price_in_ticks < ask.price_in_ticks);
        }
    });
}

#[test]
fn self_trade_abort_leaves_no_trace() {
    let mut fixture = MarketFixture::new(4, 16, 64);
    let t = trader(1);
    fixture.seat(&t, 10_000, 100);
    fixture
        .with_market(|market, queue| {
            market.place_order(&t, &limit(Side::Bid, 100, 10), &CLOCK, queue)
        })
        .unwrap();

    let before = fixture.bytes();
    let result = fixture.with_market(|market, queue| {
        market.place_order(&t, &ioc(Side::Ask, 100, 5), &CLOCK, queue)
    });
    assert_eq!(result, Err(ClobError::SelfTrade));
    assert_eq!(fixture.bytes(), before);
}

#[test]
fn cancel_provide_removes_the_own_order_and_keeps_matching() {
    let mut fixture = MarketFixture::new(4, 16, 64);
    let (t, other) = (trader(1), trader(2));
    fixture.seat(&t, 10_000, 100);
    fixture.seat(&other, 10_000, 0);
    for maker in [&t, &other] {
        fixture
            .with_market(|market, queue| {
                market.place_order(maker, &limit(Side::Bid, 100, 5), &CLOCK, queue)
            })
            .unwrap();
    }
    fixture.drain_events();

    let packet = OrderPacket::new_ioc_by_lots(
        Side::Ask,
        100,
        5,
        SelfTradeBehavior::CancelProvide,
        None,
        0,
        true,
    );
    let summary = fixture
        .with_market(|market, queue| market.place_order(&t, &packet, &CLOCK, queue))
        .unwrap();
    assert_eq!(summary.total_base_lots_filled, 5);
    assert_eq!(
        summary.fills[0].maker_order_id,
        OrderId::new_for_side(100, 1, Side::Bid)
    );

    let events = fixture.drain_events();
    assert!(matches!(
        events[0],
        MarketEvent::Out(e) if e.out_reason() == Some(OutReason::SelfTrade)
    ));
    fixture.with_market(|market, _| {
        assert!(market.book.best_bid().is_none());
        let state = market.traders.lookup_state(&t).unwrap();
        assert_eq!(state.quote_lots_locked, 0);
        assert_eq!(state.quote_lots_free, 10_000 + 500);
    });
}

fn decrement_take(side: Side, price_in_ticks: u64, num_base_lots: u64) -> OrderPacket {
    OrderPacket::new_limit_order(
        side,
        price_in_ticks,
        num_base_lots,
        SelfTradeBehavior::DecrementTake,
        None,
        0,
        true,
        None,
        None,
    )
}

#[test]
fn decrement_take_cancels_both_sides_and_posts_the_rest() {
    let mut fixture = MarketFixture::new(4, 16, 64);
    let (t, other) = (trader(1), trader(2));
    fixture.seat(&t, 10_000, 100);
    fixture.seat(&other, 10_000, 0);
    for maker in [&t, &other] {
        fixture
            .with_market(|market, queue| {
                market.place_order(maker, &limit(Side::Bid, 100, 5), &CLOCK, queue)
            })
            .unwrap();
    }
    fixture.drain_events();

    let summary = fixture
        .with_market(|market, queue| {
            market.place_order(&t, &decrement_take(Side::Ask, 100, 12), &CLOCK, queue)
        })
        .unwrap();
    assert_eq!(summary.total_base_lots_filled, 5);
    assert_eq!(summary.base_lots_posted, 2);
    assert_eq!(summary.base_lots_not_posted, 0);
    assert_eq!(
        summary.posted_order_id,
        Some(OrderId::new_for_side(100, 0, Side::Ask))
    );

    fixture.with_market(|market, _| {
        assert!(market.book.best_bid().is_none());
        let state = market.traders.lookup_state(&t).unwrap();
        assert_eq!(state.quote_lots_locked, 0);
        assert_eq!(state.quote_lots_free, 10_500);
        assert_eq!(state.base_lots_free, 93);
        assert_eq!(state.base_lots_locked, 2);
        assert_eq!(market.traders.seat(0).unwrap().num_open_orders, 1);
    });

    let events = fixture.drain_events();
    assert_eq!(events.len(), 3);
    assert!(matches!(
        events[0],
        MarketEvent::Out(e) if e.out_reason() == Some(OutReason::SelfTrade)
            && e.base_lots_removed == 5
            && e.base_lots_remaining == 0
    ));
    assert!(matches!(events[1], MarketEvent::Fill(_)));
    assert!(matches!(events[2], MarketEvent::Place(_)));
}

#[test]
fn decrement_take_shrinks_a_larger_own_order() {
    let mut fixture = MarketFixture::new(4, 16, 64);
    let t = trader(1);
    fixture.seat(&t, 10_000, 100);
    let own_bid = fixture
        .with_market(|market, queue| market.place_order(&t, &limit(Side::Bid, 100, 5), &CLOCK, queue))
        .unwrap()
        .posted_order_id
        .unwrap();

    let summary = fixture
        .with_market(|market, queue| {
            market.place_order(&t, &decrement_take(Side::Ask, 100, 3), &CLOCK, queue)
        })
        .unwrap();
    assert_eq!(summary.total_base_lots_filled, 0);
    assert_eq!(summary.posted_order_id, None);

    fixture.with_market(|market, _| {
        assert_eq!(market.book.get(&own_bid).unwrap().num_base_lots, 2);
        assert!(market.book.best_ask().is_none());
        let state = market.traders.lookup_state(&t).unwrap();
        assert_eq!(state.quote_lots_locked, 200);
        assert_eq!(state.quote_lots_free, 9_800);
        assert_eq!(state.base_lots_free, 100);
    });
}

#[test]
fn an_exhausted_match_limit_reports_the_unposted_remainder() {
    let mut fixture = MarketFixture::new(4, 16, 64);
    let (maker, taker) = (trader(1), trader(2));
    fixture.seat(&maker, 0, 100);
    fixture.seat(&taker, 10_000, 0);
    for _ in 0..2 {
        fixture
            .with_market(|market, queue| {
                market.place_order(&maker, &limit(Side::Ask, 100, 5), &CLOCK, queue)
            })
            .unwrap();
    }

    let packet = OrderPacket::new_limit_order(
        Side::Bid,
        100,
        12,
        SelfTradeBehavior::Abort,
        Some(1),
        0,
        true,
        None,
        None,
    );
    let summary = fixture
        .with_market(|market, queue| market.place_order(&taker, &packet, &CLOCK, queue))
        .unwrap();
    assert_eq!(summary.total_base_lots_filled, 5);
    assert_eq!(summary.posted_order_id, None);
    assert_eq!(summary.base_lots_not_posted, 7);

    fixture.with_market(|market, _| {
        assert!(market.book.best_bid().is_none());
        let (best_ask, order) = market.book.best_ask().unwrap();
        assert_eq!(best_ask, OrderId::new_for_side(100, 1, Side::Ask));
        assert_eq!(order.num_base_lots, 5);
        let state = market.traders.lookup_state(&taker).unwrap();
        assert_eq!(state.quote_lots_free, 9_500);
        assert_eq!(state.quote_lots_locked, 0);
        assert_eq!(state.base_lots_free, 5);
    });

    // Makers that no longer cross do not count against the limit.
    let below = OrderPacket::new_limit_order(
        Side::Bid,
        99,
        4,
        SelfTradeBehavior::Abort,
        Some(1),
        0,
        true,
        None,
        None,
    );
    let summary = fixture
        .with_market(|market, queue| market.place_order(&taker, &below, &CLOCK, queue))
        .unwrap();
    assert_eq!(summary.base_lots_posted, 4);
    assert_eq!(summary.base_lots_not_posted, 0);
}

#[test]
fn orders_expire_after_their_last_valid_slot() {
    let mut fixture = MarketFixture::new(4, 16, 64);
    let (maker, taker) = (trader(1), trader(2));
    fixture.seat(&maker, 10_000, 0);
    fixture.seat(&taker, 0, 100);
    let expiring_bid = OrderPacket::new_limit_order(
        Side::Bid,
        100,
        10,
        SelfTradeBehavior::Abort,
        None,
        0,
        true,
        Some(10),
        None,
    );
    fixture
        .with_market(|market, queue| market.place_order(&maker, &expiring_bid, &CLOCK, queue))
        .unwrap();

    let at_slot_10 = ClockReading::new(10, CLOCK.unix_timestamp);
    let summary = fixture
        .with_market(|market, queue| {
            market.place_order(&taker, &ioc(Side::Ask, 100, 4), &at_slot_10, queue)
        })
        .unwrap();
    assert_eq!(summary.total_base_lots_filled, 4);
    fixture.drain_events();

    let at_slot_11 = ClockReading::new(11, CLOCK.unix_timestamp);
    let summary = fixture
        .with_market(|market, queue| {
            market.place_order(&taker, &ioc(Side::Ask, 100, 4), &at_slot_11, queue)
        })
        .unwrap();
    assert_eq!(summary.total_base_lots_filled, 0);

    let events = fixture.drain_events();
    assert!(matches!(
        events.as_slice(),
        [MarketEvent::Out(e)] if e.out_reason() == Some(OutReason::Expired) && e.base_lots_removed == 6
    ));
    fixture.with_market(|market, _| {
        assert!(market.book.best_bid().is_none());
        let state = market.traders.lookup_state(&maker).unwrap();
        assert_eq!(state.quote_lots_locked, 0);
        assert_eq!(state.quote_lots_free, 10_000 - 400);
        assert_eq!(market.traders.seat(0).unwrap().num_open_orders, 0);
    });
}

#[test]
fn expired_packets_are_rejected() {
    let mut fixture = MarketFixture::new(4, 16, 64);
    let t = trader(1);
    fixture.seat(&t, 10_000, 0);
    let packet = OrderPacket::new_post_only(Side::Bid, 100, 1, 0, true, false, Some(0), Some(5));
    let late = ClockReading::new(1, 6);
    let result = fixture.with_market(|market, queue| market.place_order(&t, &packet, &late, queue));
    assert_eq!(
        result,
        Err(ClobError::Validation(ValidationError::OrderPacketExpired))
    );
}

#[test]
fn post_only_orders_reject_or_reprice_when_crossing() {
    let mut fixture = MarketFixture::new(4, 16, 64);
    let (maker, t) = (trader(1), trader(2));
    fixture.seat(&maker, 0, 100);
    fixture.seat(&t, 10_000, 0);
    fixture
        .with_market(|market, queue| {
            market.place_order(&maker, &limit(Side::Ask, 100, 10), &CLOCK, queue)
        })
        .unwrap();

    let rejected = fixture.with_market(|market, queue| {
        market.place_order(
            &t,
            &OrderPacket::new_post_only_default(Side::Bid, 100, 5),
            &CLOCK,
            queue,
        )
    });
    assert_eq!(rejected, Err(ClobError::PostOnlyCrossed));

    let amended = OrderPacket::new_post_only(Side::Bid, 105, 5, 7, false, true, None, None);
    let summary = fixture
        .with_market(|market, queue| market.place_order(&t, &amended, &CLOCK, queue))
        .unwrap();
    assert_eq!(
        summary.posted_order_id,
        Some(OrderId::new_for_side(99, 0, Side::Bid))
    );
    assert_eq!(summary.total_base_lots_filled, 0);
    assert_eq!(summary.client_order_id, 7);
    fixture.with_market(|market, _| {
        let state = market.traders.lookup_state(&t).unwrap();
        assert_eq!(state.quote_lots_locked, 99 * 5);
    });
}

#[test]
fn ioc_minimum_fill_is_all_or_nothing() {
    let mut fixture = MarketFixture::new(4, 16, 64);
    let (maker, taker) = (trader(1), trader(2));
    fixture.seat(&maker, 0, 100);
    fixture.seat(&taker, 10_000, 0);
    fixture
        .with_market(|market, queue| {
            market.place_order(&maker, &limit(Side::Ask, 100, 3), &CLOCK, queue)
        })
        .unwrap();

    let before = fixture.bytes();
    let fok = OrderPacket::new_fok_buy_with_limit_price(100, 5, SelfTradeBehavior::Abort, 0, true);
    let result = fixture.with_market(|market, queue| market.place_order(&taker, &fok, &CLOCK, queue));
    assert_eq!(result, Err(ClobError::MinimumFillNotMet));
    assert_eq!(fixture.bytes(), before);

    let market_buy = OrderPacket::new_ioc_buy_with_slippage(1_000, 3);
    let summary = fixture
        .with_market(|market, queue| market.place_order(&taker, &market_buy, &CLOCK, queue))
        .unwrap();
    assert_eq!(summary.total_base_lots_filled, 3);
    assert_eq!(summary.total_quote_lots_filled, 300);
}

#[test]
fn deposited_funds_bound_the_order() {
    let mut fixture = MarketFixture::new(4, 16, 64);
    let t = trader(1);
    fixture.seat(&t, 999, 0);
    let before = fixture.bytes();
    let result = fixture.with_market(|market, queue| {
        market.place_order(&t, &limit(Side::Bid, 100, 10), &CLOCK, queue)
    });
    assert_eq!(result, Err(ClobError::InsufficientFunds));
    assert_eq!(fixture.bytes(), before);

    let unfunded = OrderPacket::new_limit_order_default(Side::Bid, 100, 10);
    let summary = fixture
        .with_market(|market, queue| market.place_order(&t, &unfunded, &CLOCK, queue))
        .unwrap();
    assert_eq!(summary.num_quote_lots_in, 1);
}

#[test]
fn a_full_book_evicts_its_least_aggressive_order() {
    let mut fixture = MarketFixture::new(4, 2, 64);
    let (maker, t) = (trader(1), trader(2));
    fixture.seat(&maker, 10_000, 0);
    fixture.seat(&t, 10_000, 0);
    for price in [100, 90] {
        fixture
            .with_market(|market, queue| {
                market.place_order(&maker, &limit(Side::Bid, price, 1), &CLOCK, queue)
            })
            .unwrap();
    }
    fixture.drain_events();

    let result = fixture.with_market(|market, queue| {
        market.place_order(&t, &limit(Side::Bid, 80, 1), &CLOCK, queue)
    });
    assert_eq!(result, Err(ClobError::BookFull));

    fixture
        .with_market(|market, queue| market.place_order(&t, &limit(Side::Bid, 95, 1), &CLOCK, queue))
        .unwrap();
    let events = fixture.drain_events();
    assert!(matches!(
        events[0],
        MarketEvent::Out(e) if e.out_reason() == Some(OutReason::Evicted)
            && e.order_id == OrderId::new_for_side(90, 1, Side::Bid)
    ));
    fixture.with_market(|market, _| {
        let state = market.traders.lookup_state(&maker).unwrap();
        assert_eq!(state.quote_lots_locked, 100);
        assert_eq!(state.quote_lots_free, 10_000 - 100);
    });
}
