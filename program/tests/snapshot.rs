use fifo_orderbook::snapshot::{LadderLevel, MarketSnapshot};
use fifo_orderbook::state::order_packet::OrderPacket;
use fifo_orderbook::state::{ClockReading, Side};

mod common;
use crate::common::utils::{trader, MarketFixture};

const CLOCK: ClockReading = ClockReading {
    slot: 3,
    unix_timestamp: 1_700_000_000,
};

/// Two makers quoting around 100, one of them evicted and re-seated in between.
fn populated_market() -> MarketFixture {
    let mut fixture = MarketFixture::new(4, 32, 64);
    let (a, b, gone) = (trader(1), trader(2), trader(3));
    fixture.seat(&gone, 0, 0);
    fixture.seat(&a, 10_000, 50);
    fixture.seat(&b, 10_000, 50);
    fixture.with_market(|market, queue| {
        market.evict_seat(&gone).unwrap();
        for (owner, side, price, size) in [
            (&a, Side::Bid, 99, 3),
            (&b, Side::Bid, 99, 2),
            (&a, Side::Bid, 97, 1),
            (&b, Side::Ask, 101, 4),
            (&a, Side::Ask, 102, 5),
            (&b, Side::Ask, 102, 1),
        ] {
            let packet = OrderPacket::new_post_only(side, price, size, 0, true, true, None, None);
            market.place_order(owner, &packet, &CLOCK, queue).unwrap();
        }
    });
    fixture
}

#[test]
fn snapshots_survive_a_rewrite() {
    let mut fixture = populated_market();
    let snapshot = MarketSnapshot::from_accounts(&mut fixture.accounts()).unwrap();
    assert_eq!(snapshot.traders.len(), 2);
    assert_eq!(snapshot.bids.len(), 3);
    assert_eq!(snapshot.asks.len(), 3);

    let mut copy = MarketFixture::new(4, 32, 64);
    snapshot.write_to(&mut copy.accounts()).unwrap();
    let rebuilt = MarketSnapshot::from_accounts(&mut copy.accounts()).unwrap();
    assert_eq!(rebuilt, snapshot);

    // The freed seat is handed out again after the rewrite.
    copy.with_market(|market, _| {
        assert_eq!(market.register_trader(&trader(4)), Ok(0));
    });
}

#[test]
fn ladders_aggregate_by_price() {
    let mut fixture = populated_market();
    let snapshot = MarketSnapshot::from_accounts(&mut fixture.accounts()).unwrap();
    let ladder = snapshot.ladder(1);
    assert_eq!(
        ladder.bids,
        vec![LadderLevel {
            price_in_ticks: 99,
            size_in_base_lots: 5
        }]
    );
    assert_eq!(
        ladder.asks,
        vec![LadderLevel {
            price_in_ticks: 101,
            size_in_base_lots: 4
        }]
    );
    fixture.with_market(|market, _| {
        assert_eq!(market.ladder(10), snapshot.ladder(10));
        assert_eq!(
            market.levels_from(Side::Ask, 102, 10),
            vec![LadderLevel {
                price_in_ticks: 102,
                size_in_base_lots: 6
            }]
        );
    });
}

#[test]
fn snapshots_index_orders_by_owner() {
    let mut fixture = populated_market();
    let snapshot = MarketSnapshot::from_accounts(&mut fixture.accounts()).unwrap();
    let a = snapshot.trader(&trader(1)).unwrap();
    assert_eq!(a.num_open_orders, 3);
    assert_eq!(a.state.quote_lots_locked, 99 * 3 + 97);
    assert_eq!(a.state.base_lots_locked, 5);

    let sizes = snapshot
        .orders_of(a.trader_index)
        .map(|(_, order)| order.num_base_lots)
        .collect::<Vec<_>>();
    assert_eq!(sizes, vec![3, 1, 5]);
    assert!(snapshot.trader_state(&trader(3)).is_none());
    assert_eq!(snapshot.best_bid().unwrap().1.num_base_lots, 3);
}
