//! Cancel an existing order in the orderbook.
use bonfida_utils::BorshSize;
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

use crate::{state::OrderId, utils::set_borsh_return_data};

pub use super::OrderAccounts as Accounts;

#[derive(BorshDeserialize, BorshSerialize, BorshSize, Clone, Copy, Debug, PartialEq, Eq)]
/**
The required arguments for a cancel_order instruction.
*/
pub struct Params {
    /// An order that already left the book is not an error
    pub order_id: OrderId,
}

pub fn process(program_id: &Pubkey, accounts: Accounts<AccountInfo>, params: Params) -> ProgramResult {
    accounts.perform_checks(program_id)?;
    let cancel_summary = accounts.with_market(|trader, market, event_queue| {
        market.cancel_order(trader, &params.order_id, event_queue)
    })?;
    set_borsh_return_data(&cancel_summary)
}
