use bonfida_utils::BorshSize;
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, msg, pubkey::Pubkey};

pub use super::AuthorityAccounts as Accounts;

#[derive(BorshDeserialize, BorshSerialize, BorshSize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Params {
    pub trader: Pubkey,
}

/// Frees the seat of a trader with no funds and no resting orders, so the index can be reused.
pub fn process(program_id: &Pubkey, accounts: Accounts<AccountInfo>, params: Params) -> ProgramResult {
    accounts.perform_checks(program_id)?;
    let trader_index =
        accounts.with_traders(|traders| traders.evict(&params.trader.to_bytes()))?;
    msg!("Evicted seat {}", trader_index);
    Ok(())
}
