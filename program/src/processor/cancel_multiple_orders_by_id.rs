use bonfida_utils::BorshSize;
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

use crate::{state::OrderId, utils::set_borsh_return_data};

pub use super::OrderAccounts as Accounts;

#[derive(BorshDeserialize, BorshSerialize, BorshSize, Clone, Debug, PartialEq, Eq)]
pub struct Params {
    pub order_ids: Vec<OrderId>,
}

/// Cancels the listed orders of the signer, skipping ids that are gone or owned by someone else.
pub fn process(program_id: &Pubkey, accounts: Accounts<AccountInfo>, params: Params) -> ProgramResult {
    accounts.perform_checks(program_id)?;
    let cancel_summary = accounts.with_market(|trader, market, event_queue| {
        market.cancel_multiple_orders_by_id(trader, &params.order_ids, event_queue)
    })?;
    set_borsh_return_data(&cancel_summary)
}
