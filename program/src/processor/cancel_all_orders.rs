use bonfida_utils::BorshSize;
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

use crate::utils::set_borsh_return_data;

pub use super::OrderAccounts as Accounts;

#[derive(BorshDeserialize, BorshSerialize, BorshSize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Params {}

/// Cancels every resting order of the signer on both sides.
pub fn process(program_id: &Pubkey, accounts: Accounts<AccountInfo>, _params: Params) -> ProgramResult {
    accounts.perform_checks(program_id)?;
    let cancel_summary = accounts.with_market(|trader, market, event_queue| {
        market.cancel_all_orders(trader, event_queue)
    })?;
    set_borsh_return_data(&cancel_summary)
}
