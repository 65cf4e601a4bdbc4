//! Pop a series of events off the event queue.
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
    state::{event_queue::EventQueue, market_state::MarketState},
    utils::{check_account_key, check_account_owner, check_signer},
};

use super::log_error;

#[derive(BorshDeserialize, BorshSerialize, BorshSize, Clone, Copy, Debug, PartialEq, Eq)]
/**
The required arguments for a consume_events instruction.
*/
pub struct Params {
    /// Depending on applications, it might be optimal to process several events at a time
    pub number_of_entries_to_consume: u64,
}

/// The required accounts for a consume_events instruction.
#[derive(InstructionsAccount)]
pub struct Accounts<'a, T> {
    pub market: &'a T,
    #[cons(writable)]
    pub event_queue: &'a T,
    #[cons(signer)]
    pub caller_authority: &'a T,
}

impl<'a, 'b: 'a> Accounts<'a, AccountInfo<'b>> {
    pub fn parse(accounts: &'a [AccountInfo<'b>]) -> Result<Self, ProgramError> {
        let accounts_iter = &mut accounts.iter();
        Ok(Self {
            market: next_account_info(accounts_iter)?,
            event_queue: next_account_info(accounts_iter)?,
            caller_authority: next_account_info(accounts_iter)?,
        })
    }

    pub fn perform_checks(&self, program_id: &Pubkey) -> Result<(), ProgramError> {
        check_account_owner(
            self.market,
            &program_id.to_bytes(),
            ClobError::WrongMarketOwner,
        )?;
        check_account_owner(
            self.event_queue,
            &program_id.to_bytes(),
            ClobError::WrongEventQueueOwner,
        )?;
        check_signer(self.caller_authority).map_err(|e| {
            msg!("The market authority should be a signer for this instruction!");
            e
        })?;
        Ok(())
    }
}

/// Apply the consume_events instruction to the provided accounts
pub fn process(program_id: &Pubkey, accounts: Accounts<AccountInfo>, params: Params) -> ProgramResult {
    accounts.perform_checks(program_id)?;

    let mut market_data = accounts.market.data.borrow_mut();
    let (market_state, _) = MarketState::from_buffer(&mut market_data).map_err(log_error)?;
    check_account_key(
        accounts.event_queue,
        &market_state.event_queue,
        ClobError::WrongEventQueueAccount,
    )?;
    check_account_key(
        accounts.caller_authority,
        &market_state.caller_authority,
        ClobError::WrongCallerAuthority,
    )?;

    let mut event_queue_data = accounts.event_queue.data.borrow_mut();
    let mut event_queue = EventQueue::from_buffer(&mut event_queue_data).map_err(log_error)?;
    let consumed = event_queue.pop_n(params.number_of_entries_to_consume);

    msg!("Number of events consumed: {:?}", consumed);

    Ok(())
}
