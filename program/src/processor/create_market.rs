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
    market::MarketAccounts,
    state::market_state::MarketState,
    utils::check_unitialized,
};

use super::{check_book_owners, log_error};

#[derive(BorshDeserialize, BorshSerialize, BorshSize, Clone, Copy, Debug, PartialEq, Eq)]
/**
The required arguments for a create_market instruction.
*/
pub struct Params {
    /// The caller authority will be the required signer for the deposit, withdraw, seat eviction
    /// and event consumption instructions.
    ///
    /// In practice, it will almost always be a program-derived address of the program holding
    /// the market's token vaults.
    pub caller_authority: Pubkey,
    pub base_lots_per_base_unit: u64,
    /// Must be a multiple of `base_lots_per_base_unit`
    pub tick_size_in_quote_lots_per_base_unit: u64,
}

/// The required accounts for a create_market instruction.
#[derive(InstructionsAccount)]
pub struct Accounts<'a, T> {
    /// Sized for the desired number of trader seats
    #[cons(writable)]
    pub market: &'a T,
    #[cons(writable)]
    pub event_queue: &'a T,
    #[cons(writable)]
    pub bids: &'a T,
    #[cons(writable)]
    pub asks: &'a T,
}

impl<'a, 'b: 'a> Accounts<'a, AccountInfo<'b>> {
    pub fn parse(accounts: &'a [AccountInfo<'b>]) -> Result<Self, ProgramError> {
        let accounts_iter = &mut accounts.iter();
        Ok(Self {
            market: next_account_info(accounts_iter)?,
            event_queue: next_account_info(accounts_iter)?,
            bids: next_account_info(accounts_iter)?,
            asks: next_account_info(accounts_iter)?,
        })
    }

    pub fn perform_checks(&self, program_id: &Pubkey) -> Result<(), ProgramError> {
        check_book_owners(
            program_id,
            self.market,
            self.event_queue,
            self.bids,
            self.asks,
        )?;
        let keys = [
            self.market.key,
            self.event_queue.key,
            self.bids.key,
            self.asks.key,
        ];
        for (i, key) in keys.iter().enumerate() {
            if keys[i + 1..].contains(key) {
                msg!("The market, event queue, bids and asks accounts must be distinct");
                return Err(ProgramError::InvalidArgument);
            }
        }
        check_unitialized(self.market)?;
        check_unitialized(self.event_queue)?;
        check_unitialized(self.bids)?;
        check_unitialized(self.asks)?;
        Ok(())
    }
}

pub fn process(program_id: &Pubkey, accounts: Accounts<AccountInfo>, params: Params) -> ProgramResult {
    accounts.perform_checks(program_id)?;

    let Params {
        caller_authority,
        base_lots_per_base_unit,
        tick_size_in_quote_lots_per_base_unit,
    } = params;

    let market_state = MarketState::new(
        caller_authority.to_bytes(),
        accounts.event_queue.key.to_bytes(),
        accounts.bids.key.to_bytes(),
        accounts.asks.key.to_bytes(),
        base_lots_per_base_unit,
        tick_size_in_quote_lots_per_base_unit,
    );

    let mut market_data = accounts.market.data.borrow_mut();
    let mut bids_data = accounts.bids.data.borrow_mut();
    let mut asks_data = accounts.asks.data.borrow_mut();
    let mut event_queue_data = accounts.event_queue.data.borrow_mut();
    MarketAccounts::new(
        &mut market_data,
        &mut bids_data,
        &mut asks_data,
        &mut event_queue_data,
    )
    .initialize(accounts.market.key.to_bytes(), market_state)
    .map_err(log_error)?;

    msg!(
        "Market created with {} base lots per unit and a tick of {} quote lots",
        base_lots_per_base_unit,
        tick_size_in_quote_lots_per_base_unit
    );
    Ok(())
}
