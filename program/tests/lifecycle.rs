use fifo_orderbook::error::{ClobError, ValidationError};
use fifo_orderbook::lifecycle::CancelUpToParams;
use fifo_orderbook::state::event_queue::{MarketEvent, OutReason};
use fifo_orderbook::state::order_packet::OrderPacket;
use fifo_orderbook::state::{ClockReading, OrderId, Side};

mod common;
use crate::common::utils::{trader, MarketFixture};

const CLOCK: ClockReading = ClockReading {
    slot: 1,
    unix_timestamp: 1_700_000_000,
};

/// Posts funded orders for `owner` and returns their ids.
fn post(fixture: &mut MarketFixture, owner: &[u8; 32], side: Side, prices: &[u64]) -> Vec<OrderId> {
    prices
        .iter()
        .map(|price| {
            let packet = OrderPacket::new_post_only(side, *price, 2, 0, true, true, None, None);
            fixture
                .with_market(|market, queue| market.place_order(owner, &packet, &CLOCK, queue))
                .unwrap()
                .posted_order_id
                .unwrap()
        })
        .collect()
}

#[test]
fn cancel_up_to_the_only_order_unlocks_everything() {
    let mut fixture = MarketFixture::new(4, 16, 64);
    let t = trader(1);
    fixture.seat(&t, 1_000, 0);
    let ids = post(&mut fixture, &t, Side::Bid, &[100]);

    let summary = fixture
        .with_market(|market, queue| {
            market.cancel_up_to(
                &t,
                &CancelUpToParams {
                    side: Side::Bid,
                    boundary: Some(ids[0]),
                    num_orders_to_search: None,
                    num_orders_to_cancel: None,
                },
                queue,
            )
        })
        .unwrap();
    assert_eq!(summary.cancelled_order_ids, ids);
    assert_eq!(summary.quote_lots_released, 200);
    fixture.with_market(|market, _| {
        assert!(market.book.best_bid().is_none());
        let state = market.traders.lookup_state(&t).unwrap();
        assert_eq!(state.quote_lots_locked, 0);
        assert_eq!(state.quote_lots_free, 1_000);
        assert_eq!(market.traders.seat(0).unwrap().num_open_orders, 0);
    });
}

#[test]
fn cancel_up_to_covers_the_boundary_and_everything_behind_it() {
    let mut fixture = MarketFixture::new(4, 16, 64);
    let (t, other) = (trader(1), trader(2));
    fixture.seat(&t, 0, 100);
    fixture.seat(&other, 0, 100);
    let own = post(&mut fixture, &t, Side::Ask, &[101, 102, 103, 104]);
    let foreign = post(&mut fixture, &other, Side::Ask, &[102]);

    let summary = fixture
        .with_market(|market, queue| {
            market.cancel_up_to(
                &t,
                &CancelUpToParams {
                    side: Side::Ask,
                    boundary: Some(own[1]),
                    num_orders_to_search: None,
                    num_orders_to_cancel: Some(2),
                },
                queue,
            )
        })
        .unwrap();
    assert_eq!(summary.cancelled_order_ids, vec![own[1], own[2]]);
    assert_eq!(summary.base_lots_released, 4);
    fixture.with_market(|market, _| {
        assert!(market.book.get(&own[0]).is_some());
        assert!(market.book.get(&own[3]).is_some());
        assert!(market.book.get(&foreign[0]).is_some());
    });

    let wrong_side = fixture.with_market(|market, queue| {
        market.cancel_up_to(
            &t,
            &CancelUpToParams {
                side: Side::Bid,
                boundary: Some(own[0]),
                num_orders_to_search: None,
                num_orders_to_cancel: None,
            },
            queue,
        )
    });
    assert_eq!(wrong_side, Err(ClobError::OrderNotFound));
}

#[test]
fn cancelling_twice_is_a_no_op() {
    let mut fixture = MarketFixture::new(4, 16, 64);
    let (t, other) = (trader(1), trader(2));
    fixture.seat(&t, 0, 100);
    fixture.seat(&other, 0, 100);
    let ids = post(&mut fixture, &t, Side::Ask, &[101]);
    fixture.drain_events();

    let first = fixture
        .with_market(|market, queue| market.cancel_order(&t, &ids[0], queue))
        .unwrap();
    assert_eq!(first.cancelled_order_ids, ids);
    assert_eq!(first.base_lots_released, 2);

    let before = fixture.bytes();
    let second = fixture
        .with_market(|market, queue| market.cancel_order(&t, &ids[0], queue))
        .unwrap();
    assert!(second.cancelled_order_ids.is_empty());
    assert_eq!(fixture.bytes(), before);

    let theirs = post(&mut fixture, &other, Side::Ask, &[105]);
    let foreign = fixture.with_market(|market, queue| market.cancel_order(&t, &theirs[0], queue));
    assert_eq!(foreign, Err(ClobError::OrderNotFound));

    let events = fixture.drain_events();
    assert!(matches!(
        events[0],
        MarketEvent::Out(e) if e.out_reason() == Some(OutReason::Cancelled) && e.base_lots_removed == 2
    ));
}

#[test]
fn cancel_by_ids_skips_unknown_and_foreign_orders() {
    let mut fixture = MarketFixture::new(4, 16, 64);
    let (t, other) = (trader(1), trader(2));
    fixture.seat(&t, 10_000, 100);
    fixture.seat(&other, 10_000, 0);
    let bids = post(&mut fixture, &t, Side::Bid, &[90, 91]);
    let asks = post(&mut fixture, &t, Side::Ask, &[110]);
    let theirs = post(&mut fixture, &other, Side::Bid, &[92]);

    let order_ids = [
        bids[0],
        theirs[0],
        asks[0],
        bids[0],
        OrderId::new_for_side(50, 77, Side::Bid),
    ];
    let summary = fixture
        .with_market(|market, queue| market.cancel_multiple_orders_by_id(&t, &order_ids, queue))
        .unwrap();
    assert_eq!(summary.cancelled_order_ids, vec![bids[0], asks[0]]);
    assert_eq!(summary.quote_lots_released, 180);
    assert_eq!(summary.base_lots_released, 2);

    let rest = fixture
        .with_market(|market, queue| market.cancel_all_orders(&t, queue))
        .unwrap();
    assert_eq!(rest.cancelled_order_ids, vec![bids[1]]);
    fixture.with_market(|market, _| {
        let state = market.traders.lookup_state(&t).unwrap();
        assert_eq!(state.quote_lots_locked, 0);
        assert_eq!(state.base_lots_locked, 0);
        assert_eq!(market.book.best_bid().map(|(id, _)| id), Some(theirs[0]));
    });
}

#[test]
fn reduce_shrinks_then_removes() {
    let mut fixture = MarketFixture::new(4, 16, 64);
    let t = trader(1);
    fixture.seat(&t, 1_000, 0);
    let ids = post(&mut fixture, &t, Side::Bid, &[100]);

    let zero = fixture.with_market(|market, queue| market.reduce_order(&t, &ids[0], 0, queue));
    assert_eq!(zero, Err(ClobError::Validation(ValidationError::ZeroSize)));

    let partial = fixture
        .with_market(|market, queue| market.reduce_order(&t, &ids[0], 1, queue))
        .unwrap();
    assert!(partial.cancelled_order_ids.is_empty());
    assert_eq!(partial.quote_lots_released, 100);
    fixture.with_market(|market, _| {
        assert_eq!(market.book.get(&ids[0]).unwrap().num_base_lots, 1);
    });

    let rest = fixture
        .with_market(|market, queue| market.reduce_order(&t, &ids[0], 50, queue))
        .unwrap();
    assert_eq!(rest.cancelled_order_ids, ids);
    assert_eq!(rest.quote_lots_released, 100);
    fixture.with_market(|market, _| {
        assert!(market.book.get(&ids[0]).is_none());
        let state = market.traders.lookup_state(&t).unwrap();
        assert_eq!(state.quote_lots_free, 1_000);
        assert_eq!(market.traders.seat(0).unwrap().num_open_orders, 0);
    });
}

#[test]
fn pruning_is_bounded_by_the_event_queue() {
    let mut fixture = MarketFixture::new(4, 16, 8);
    let t = trader(1);
    fixture.seat(&t, 0, 100);
    for price in [101, 102, 103, 104, 105] {
        let packet = OrderPacket::new_post_only(Side::Ask, price, 1, 0, true, true, Some(5), None);
        fixture
            .with_market(|market, queue| market.place_order(&t, &packet, &CLOCK, queue))
            .unwrap();
    }
    // Five Place events are still pending, so only three removals fit.
    let later = ClockReading::new(6, CLOCK.unix_timestamp);
    let summary = fixture
        .with_market(|market, queue| market.prune_expired_orders(Side::Ask, 10, &later, queue))
        .unwrap();
    assert_eq!(summary.cancelled_order_ids.len(), 3);
    assert_eq!(
        summary.cancelled_order_ids[0],
        OrderId::new_for_side(101, 0, Side::Ask)
    );

    fixture.drain_events();
    let summary = fixture
        .with_market(|market, queue| market.prune_expired_orders(Side::Ask, 10, &later, queue))
        .unwrap();
    assert_eq!(summary.cancelled_order_ids.len(), 2);
    fixture.with_market(|market, _| {
        assert!(market.book.best_ask().is_none());
        let state = market.traders.lookup_state(&t).unwrap();
        assert_eq!(state.base_lots_free, 100);
    });
}

#[test]
fn seats_are_evicted_only_when_empty() {
    let mut fixture = MarketFixture::new(2, 16, 64);
    let (t, late) = (trader(1), trader(2));
    fixture.seat(&t, 0, 10);
    let ids = post(&mut fixture, &t, Side::Ask, &[100]);

    fixture.with_market(|market, queue| {
        assert_eq!(market.evict_seat(&t), Err(ClobError::SeatInUse));
        market.cancel_order(&t, &ids[0], queue).unwrap();
        assert_eq!(market.withdraw_funds(&t, None, None), Ok((0, 10)));
        assert_eq!(market.evict_seat(&t), Ok(0));
        assert_eq!(market.register_trader(&late), Ok(0));
        assert_eq!(
            market.deposit_funds(&t, 1, 1),
            Err(ClobError::Validation(ValidationError::UnknownTrader))
        );
    });
}
