//! Claim a trader seat on a market.
use bonfida_utils::{BorshSize, InstructionsAccount};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::{
    error::ClobError,
    utils::{check_account_owner, check_signer},
};

use super::with_traders;

#[derive(BorshDeserialize, BorshSerialize, BorshSize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Params {}

#[derive(InstructionsAccount)]
pub struct Accounts<'a, T> {
    #[cons(writable)]
    pub market: &'a T,
    /// The trader taking the seat
    #[cons(signer)]
    pub trader: &'a T,
}

impl<'a, 'b: 'a> Accounts<'a, AccountInfo<'b>> {
    pub fn parse(accounts: &'a [AccountInfo<'b>]) -> Result<Self, ProgramError> {
        let accounts_iter = &mut accounts.iter();
        Ok(Self {
            market: next_account_info(accounts_iter)?,
            trader: next_account_info(accounts_iter)?,
        })
    }

    pub fn perform_checks(&self, program_id: &Pubkey) -> Result<(), ProgramError> {
        check_account_owner(
            self.market,
            &program_id.to_bytes(),
            ClobError::WrongMarketOwner,
        )?;
        check_signer(self.trader)
    }
}

/// Registering a trader that already holds a seat keeps its existing index.
pub fn process(program_id: &Pubkey, accounts: Accounts<AccountInfo>, _params: Params) -> ProgramResult {
    accounts.perform_checks(program_id)?;
    let trader = accounts.trader.key.to_bytes();
    let trader_index = with_traders(accounts.market, |_, traders| traders.register(&trader))?;
    msg!("Trader seated at index {}", trader_index);
    Ok(())
}
