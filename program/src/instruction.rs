use bonfida_utils::InstructionsAccount;
use borsh::{BorshDeserialize, BorshSerialize};
use num_derive::FromPrimitive;
use solana_program::{instruction::Instruction, pubkey::Pubkey};

pub use crate::processor::{
    cancel_all_orders, cancel_multiple_orders_by_id, cancel_order, cancel_up_to, consume_events,
    create_market, deposit_funds, evict_seat, new_order, place_multiple_orders,
    prune_expired_orders, reduce_order, register_trader, withdraw_funds,
};

#[derive(BorshDeserialize, BorshSerialize, Clone, Copy, Debug, FromPrimitive, PartialEq, Eq)]
/// Describes all possible instructions and their required accounts
pub enum OrderbookInstruction {
    /// Create and initialize a new orderbook market
    ///
    /// Required accounts
    ///
    /// | index | writable | signer | description                      |
    /// |-------|----------|--------|----------------------------------|
    /// | 0     | ✅       | ❌     | A zeroed out market account      |
    /// | 1     | ✅       | ❌     | A zeroed out event queue account |
    /// | 2     | ✅       | ❌     | A zeroed out bids account        |
    /// | 3     | ✅       | ❌     | A zeroed out asks account        |
    CreateMarket,
    /// Give the signer a seat on the market.
    ///
    /// | index | writable | signer | description        |
    /// |-------|----------|--------|--------------------|
    /// | 0     | ✅       | ❌     | The market account |
    /// | 1     | ❌       | ✅     | The trader         |
    RegisterTrader,
    /// Free the seat of a trader holding no funds and no orders.
    ///
    /// | index | writable | signer | description          |
    /// |-------|----------|--------|----------------------|
    /// | 0     | ✅       | ❌     | The market account   |
    /// | 1     | ❌       | ✅     | The caller authority |
    EvictSeat,
    /// Credit free funds to a seat. Same accounts as `EvictSeat`.
    DepositFunds,
    /// Debit free funds from a seat. Same accounts as `EvictSeat`.
    WithdrawFunds,
    /// Execute a new order on the orderbook.
    ///
    /// Depending on the order packet, the program will attempt to match the order with existing
    /// entries in the orderbook, and then optionally post the remaining order.
    ///
    /// Required accounts
    ///
    /// | index | writable | signer | description             |
    /// |-------|----------|--------|-------------------------|
    /// | 0     | ✅       | ❌     | The market account      |
    /// | 1     | ✅       | ❌     | The event queue account |
    /// | 2     | ✅       | ❌     | The bids account        |
    /// | 3     | ✅       | ❌     | The asks account        |
    /// | 4     | ❌       | ✅     | The trader              |
    NewOrder,
    /// Cancel an existing order in the orderbook. Same accounts as `NewOrder`.
    CancelOrder,
    /// Same accounts as `NewOrder`.
    CancelMultipleOrdersById,
    /// Cancel the signer's orders from a boundary to the back of one side. Same accounts as
    /// `NewOrder`.
    CancelUpTo,
    /// Same accounts as `NewOrder`.
    CancelAllOrders,
    /// Shrink a resting order. Same accounts as `NewOrder`.
    ReduceOrder,
    /// Same accounts as `NewOrder`.
    PlaceMultipleOrders,
    /// Same accounts as `NewOrder`.
    PlaceMultiplePostOnlyOrders,
    /// Remove expired orders, whoever owns them.
    ///
    /// | index | writable | signer | description             |
    /// |-------|----------|--------|-------------------------|
    /// | 0     | ✅       | ❌     | The market account      |
    /// | 1     | ✅       | ❌     | The event queue account |
    /// | 2     | ✅       | ❌     | The bids account        |
    /// | 3     | ✅       | ❌     | The asks account        |
    PruneExpiredOrders,
    /// Pop a series of events off the event queue.
    ///
    /// Required accounts
    ///
    /// | index | writable | signer | description             |
    /// |-------|----------|--------|-------------------------|
    /// | 0     | ❌       | ❌     | The market account      |
    /// | 1     | ✅       | ❌     | The event queue account |
    /// | 2     | ❌       | ✅     | The caller authority    |
    ConsumeEvents,
}

/**
Create and initialize a new orderbook market

The event_queue, bids, and asks accounts should be freshly allocated or zeroed out accounts.

* The market account holds a [`MarketState`](`crate::state::market_state::MarketState`) followed by
the trader seats. Use [`compute_allocation_size`](`crate::state::market_state::MarketState::compute_allocation_size`)
to size it for a number of seats.

* The event queue holds a header followed by a ring of fixed size events, see
[`EventQueue::compute_allocation_size`](`crate::state::event_queue::EventQueue::compute_allocation_size`).

* The asks and bids accounts are critbit slabs, see
[`Slab::compute_allocation_size`](`crate::state::critbit::Slab::compute_allocation_size`).
*/
pub fn create_market(
    program_id: Pubkey,
    accounts: create_market::Accounts<Pubkey>,
    params: create_market::Params,
) -> Instruction {
    accounts.get_instruction(
        program_id,
        OrderbookInstruction::CreateMarket as u8,
        params,
    )
}

pub fn register_trader(
    program_id: Pubkey,
    accounts: register_trader::Accounts<Pubkey>,
) -> Instruction {
    accounts.get_instruction(
        program_id,
        OrderbookInstruction::RegisterTrader as u8,
        register_trader::Params {},
    )
}

pub fn evict_seat(
    program_id: Pubkey,
    accounts: evict_seat::Accounts<Pubkey>,
    params: evict_seat::Params,
) -> Instruction {
    accounts.get_instruction(program_id, OrderbookInstruction::EvictSeat as u8, params)
}

pub fn deposit_funds(
    program_id: Pubkey,
    accounts: deposit_funds::Accounts<Pubkey>,
    params: deposit_funds::Params,
) -> Instruction {
    accounts.get_instruction(
        program_id,
        OrderbookInstruction::DepositFunds as u8,
        params,
    )
}

pub fn withdraw_funds(
    program_id: Pubkey,
    accounts: withdraw_funds::Accounts<Pubkey>,
    params: withdraw_funds::Params,
) -> Instruction {
    accounts.get_instruction(
        program_id,
        OrderbookInstruction::WithdrawFunds as u8,
        params,
    )
}

/**
Execute a new order on the orderbook.

Depending on the order packet, the program will attempt to match the order with existing entries
in the orderbook, and then optionally post the remaining order.
*/
pub fn new_order(
    program_id: Pubkey,
    accounts: new_order::Accounts<Pubkey>,
    params: new_order::Params,
) -> Instruction {
    accounts.get_instruction(program_id, OrderbookInstruction::NewOrder as u8, params)
}

/// Cancel an existing order in the orderbook.
pub fn cancel_order(
    program_id: Pubkey,
    accounts: cancel_order::Accounts<Pubkey>,
    params: cancel_order::Params,
) -> Instruction {
    accounts.get_instruction(program_id, OrderbookInstruction::CancelOrder as u8, params)
}

pub fn cancel_multiple_orders_by_id(
    program_id: Pubkey,
    accounts: cancel_multiple_orders_by_id::Accounts<Pubkey>,
    params: cancel_multiple_orders_by_id::Params,
) -> Instruction {
    accounts.get_instruction(
        program_id,
        OrderbookInstruction::CancelMultipleOrdersById as u8,
        params,
    )
}

pub fn cancel_up_to(
    program_id: Pubkey,
    accounts: cancel_up_to::Accounts<Pubkey>,
    params: cancel_up_to::Params,
) -> Instruction {
    accounts.get_instruction(program_id, OrderbookInstruction::CancelUpTo as u8, params)
}

pub fn cancel_all_orders(
    program_id: Pubkey,
    accounts: cancel_all_orders::Accounts<Pubkey>,
) -> Instruction {
    accounts.get_instruction(
        program_id,
        OrderbookInstruction::CancelAllOrders as u8,
        cancel_all_orders::Params {},
    )
}

pub fn reduce_order(
    program_id: Pubkey,
    accounts: reduce_order::Accounts<Pubkey>,
    params: reduce_order::Params,
) -> Instruction {
    accounts.get_instruction(program_id, OrderbookInstruction::ReduceOrder as u8, params)
}

pub fn place_multiple_orders(
    program_id: Pubkey,
    accounts: place_multiple_orders::Accounts<Pubkey>,
    params: place_multiple_orders::Params,
) -> Instruction {
    accounts.get_instruction(
        program_id,
        OrderbookInstruction::PlaceMultipleOrders as u8,
        params,
    )
}

pub fn place_multiple_post_only_orders(
    program_id: Pubkey,
    accounts: place_multiple_orders::Accounts<Pubkey>,
    params: place_multiple_orders::Params,
) -> Instruction {
    accounts.get_instruction(
        program_id,
        OrderbookInstruction::PlaceMultiplePostOnlyOrders as u8,
        params,
    )
}

pub fn prune_expired_orders(
    program_id: Pubkey,
    accounts: prune_expired_orders::Accounts<Pubkey>,
    params: prune_expired_orders::Params,
) -> Instruction {
    accounts.get_instruction(
        program_id,
        OrderbookInstruction::PruneExpiredOrders as u8,
        params,
    )
}

/// Pop a series of events off the event queue.
pub fn consume_events(
    program_id: Pubkey,
    accounts: consume_events::Accounts<Pubkey>,
    params: consume_events::Params,
) -> Instruction {
    accounts.get_instruction(
        program_id,
        OrderbookInstruction::ConsumeEvents as u8,
        params,
    )
}
