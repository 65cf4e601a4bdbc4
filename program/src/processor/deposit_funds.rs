use bonfida_utils::BorshSize;
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub use super::AuthorityAccounts as Accounts;

#[derive(BorshDeserialize, BorshSerialize, BorshSize, Clone, Copy, Debug, PartialEq, Eq)]
/**
The required arguments for a deposit_funds instruction.

The caller authority attests that the matching tokens were moved into its vaults.
*/
pub struct Params {
    pub trader: Pubkey,
    pub quote_lots: u64,
    pub base_lots: u64,
}

pub fn process(program_id: &Pubkey, accounts: Accounts<AccountInfo>, params: Params) -> ProgramResult {
    accounts.perform_checks(program_id)?;
    accounts.with_traders(|traders| {
        traders.deposit_funds(
            &params.trader.to_bytes(),
            params.quote_lots,
            params.base_lots,
        )
    })?;
    Ok(())
}
