use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

use crate::utils::set_borsh_return_data;

pub use super::OrderAccounts as Accounts;
pub use crate::lifecycle::CancelUpToParams as Params;

pub fn process(program_id: &Pubkey, accounts: Accounts<AccountInfo>, params: Params) -> ProgramResult {
    accounts.perform_checks(program_id)?;
    let cancel_summary = accounts.with_market(|trader, market, event_queue| {
        market.cancel_up_to(trader, &params, event_queue)
    })?;
    set_borsh_return_data(&cancel_summary)
}
