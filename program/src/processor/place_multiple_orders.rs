//! Place a batch of limit or post-only orders.
use bonfida_utils::BorshSize;
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo, clock::Clock, entrypoint::ProgramResult, pubkey::Pubkey,
    sysvar::Sysvar,
};

use crate::{
    batch::BatchEntryReport,
    state::{order_packet::MultipleOrderPacket, ClockReading},
    utils::set_borsh_return_data,
};

pub use super::OrderAccounts as Accounts;

#[derive(BorshDeserialize, BorshSerialize, BorshSize, Clone, Debug, PartialEq, Eq)]
pub struct Params {
    pub batch: MultipleOrderPacket,
}

/// An aborted batch fails the instruction, so the runtime discards every write of the orders
/// placed before the failing one.
pub fn process(
    program_id: &Pubkey,
    accounts: Accounts<AccountInfo>,
    params: Params,
    post_only: bool,
) -> ProgramResult {
    accounts.perform_checks(program_id)?;
    let clock = ClockReading::from(&Clock::get()?);

    let entries = accounts.with_market(|trader, market, event_queue| {
        market.place_batch(trader, &params.batch, post_only, &clock, event_queue)
    })?;
    let reports = entries
        .iter()
        .map(BatchEntryReport::from)
        .collect::<Vec<_>>();
    set_borsh_return_data(&reports)
}
