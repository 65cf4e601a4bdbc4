//! Submit a single order to the book.
use bonfida_utils::BorshSize;
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo, clock::Clock, entrypoint::ProgramResult, pubkey::Pubkey,
    sysvar::Sysvar,
};

use crate::{
    state::{order_packet::OrderPacket, ClockReading},
    utils::set_borsh_return_data,
};

pub use super::OrderAccounts as Accounts;

#[derive(BorshDeserialize, BorshSerialize, BorshSize, Clone, Copy, Debug, PartialEq, Eq)]
/**
The required arguments for a new_order instruction.
*/
pub struct Params {
    pub order_packet: OrderPacket,
}

/// Matches the order and posts what is left of it. The [`OrderSummary`](crate::matching::OrderSummary)
/// is returned without its fills, which are published to the event queue.
pub fn process(program_id: &Pubkey, accounts: Accounts<AccountInfo>, params: Params) -> ProgramResult {
    accounts.perform_checks(program_id)?;
    let clock = ClockReading::from(&Clock::get()?);

    let mut order_summary = accounts.with_market(|trader, market, event_queue| {
        market.place_order(trader, &params.order_packet, &clock, event_queue)
    })?;
    order_summary.fills.clear();
    set_borsh_return_data(&order_summary)
}
