use bonfida_utils::BorshSize;
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

use crate::{state::OrderId, utils::set_borsh_return_data};

pub use super::OrderAccounts as Accounts;

#[derive(BorshDeserialize, BorshSerialize, BorshSize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Params {
    pub order_id: OrderId,
    /// Capped at the size left on the order
    pub base_lots: u64,
}

pub fn process(program_id: &Pubkey, accounts: Accounts<AccountInfo>, params: Params) -> ProgramResult {
    accounts.perform_checks(program_id)?;
    let cancel_summary = accounts.with_market(|trader, market, event_queue| {
        market.reduce_order(trader, &params.order_id, params.base_lots, event_queue)
    })?;
    set_borsh_return_data(&cancel_summary)
}
