use bonfida_utils::BorshSize;
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

use crate::utils::set_borsh_return_data;

pub use super::AuthorityAccounts as Accounts;

#[derive(BorshDeserialize, BorshSerialize, BorshSize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Params {
    pub trader: Pubkey,
    /// `None` withdraws the whole free quote balance
    pub quote_lots: Option<u64>,
    /// `None` withdraws the whole free base balance
    pub base_lots: Option<u64>,
}

/// Debits free funds from a seat. The `(quote_lots, base_lots)` withdrawn are returned so that the
/// caller authority can release the matching tokens.
pub fn process(program_id: &Pubkey, accounts: Accounts<AccountInfo>, params: Params) -> ProgramResult {
    accounts.perform_checks(program_id)?;
    let withdrawn = accounts.with_traders(|traders| {
        traders.withdraw_funds(
            &params.trader.to_bytes(),
            params.quote_lots,
            params.base_lots,
        )
    })?;
    set_borsh_return_data(&withdrawn)
}
