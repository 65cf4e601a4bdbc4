//! Remove expired orders from one side of the book. Anyone may crank this instruction.
use bonfida_utils::{BorshSize, InstructionsAccount};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
    sysvar::Sysvar,
};

use crate::state::{ClockReading, Side};

use super::{check_book_owners, with_book};

#[derive(BorshDeserialize, BorshSerialize, BorshSize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Params {
    pub side: Side,
    /// Also bounded by the room left in the event queue
    pub max_orders: u32,
}

#[derive(InstructionsAccount)]
pub struct Accounts<'a, T> {
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
        Ok(())
    }
}

pub fn process(program_id: &Pubkey, accounts: Accounts<AccountInfo>, params: Params) -> ProgramResult {
    accounts.perform_checks(program_id)?;
    let clock = ClockReading::from(&Clock::get()?);

    let summary = with_book(
        accounts.market,
        accounts.event_queue,
        accounts.bids,
        accounts.asks,
        |market, event_queue| {
            market.prune_expired_orders(
                params.side,
                params.max_orders as usize,
                &clock,
                event_queue,
            )
        },
    )?;
    if summary.cancelled_order_ids.is_empty() {
        msg!("No expired orders found");
    }
    Ok(())
}
