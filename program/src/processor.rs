use bonfida_utils::InstructionsAccount;
use borsh::BorshDeserialize;
use num_traits::FromPrimitive;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::{
    error::{ClobError, ClobResult},
    instruction::OrderbookInstruction,
    market::Market,
    state::{event_queue::EventQueue, market_state::MarketState, trader_registry::TraderRegistry},
    utils::{check_account_key, check_account_owner, check_signer},
};

pub mod cancel_all_orders;
pub mod cancel_multiple_orders_by_id;
pub mod cancel_order;
pub mod cancel_up_to;
pub mod consume_events;
pub mod create_market;
pub mod deposit_funds;
pub mod evict_seat;
pub mod new_order;
pub mod place_multiple_orders;
pub mod prune_expired_orders;
pub mod reduce_order;
pub mod register_trader;
pub mod withdraw_funds;

pub struct Processor {}

impl Processor {
    pub fn process_instruction(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let (tag, params) = instruction_data
            .split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;
        let instruction =
            OrderbookInstruction::from_u8(*tag).ok_or(ProgramError::InvalidInstructionData)?;

        match instruction {
            OrderbookInstruction::CreateMarket => {
                msg!("Instruction: Create Market");
                let accounts = create_market::Accounts::parse(accounts)?;
                create_market::process(program_id, accounts, parse_params(params)?)?;
            }
            OrderbookInstruction::RegisterTrader => {
                msg!("Instruction: Register Trader");
                let accounts = register_trader::Accounts::parse(accounts)?;
                register_trader::process(program_id, accounts, parse_params(params)?)?;
            }
            OrderbookInstruction::EvictSeat => {
                msg!("Instruction: Evict Seat");
                let accounts = evict_seat::Accounts::parse(accounts)?;
                evict_seat::process(program_id, accounts, parse_params(params)?)?;
            }
            OrderbookInstruction::DepositFunds => {
                msg!("Instruction: Deposit Funds");
                let accounts = deposit_funds::Accounts::parse(accounts)?;
                deposit_funds::process(program_id, accounts, parse_params(params)?)?;
            }
            OrderbookInstruction::WithdrawFunds => {
                msg!("Instruction: Withdraw Funds");
                let accounts = withdraw_funds::Accounts::parse(accounts)?;
                withdraw_funds::process(program_id, accounts, parse_params(params)?)?;
            }
            OrderbookInstruction::NewOrder => {
                msg!("Instruction: New Order");
                let accounts = new_order::Accounts::parse(accounts)?;
                new_order::process(program_id, accounts, parse_params(params)?)?;
            }
            OrderbookInstruction::CancelOrder => {
                msg!("Instruction: Cancel Order");
                let accounts = cancel_order::Accounts::parse(accounts)?;
                cancel_order::process(program_id, accounts, parse_params(params)?)?;
            }
            OrderbookInstruction::CancelMultipleOrdersById => {
                msg!("Instruction: Cancel Multiple Orders By Id");
                let accounts = cancel_multiple_orders_by_id::Accounts::parse(accounts)?;
                cancel_multiple_orders_by_id::process(program_id, accounts, parse_params(params)?)?;
            }
            OrderbookInstruction::CancelUpTo => {
                msg!("Instruction: Cancel Up To");
                let accounts = cancel_up_to::Accounts::parse(accounts)?;
                cancel_up_to::process(program_id, accounts, parse_params(params)?)?;
            }
            OrderbookInstruction::CancelAllOrders => {
                msg!("Instruction: Cancel All Orders");
                let accounts = cancel_all_orders::Accounts::parse(accounts)?;
                cancel_all_orders::process(program_id, accounts, parse_params(params)?)?;
            }
            OrderbookInstruction::ReduceOrder => {
                msg!("Instruction: Reduce Order");
                let accounts = reduce_order::Accounts::parse(accounts)?;
                reduce_order::process(program_id, accounts, parse_params(params)?)?;
            }
            OrderbookInstruction::PlaceMultipleOrders => {
                msg!("Instruction: Place Multiple Orders");
                let accounts = place_multiple_orders::Accounts::parse(accounts)?;
                place_multiple_orders::process(
                    program_id,
                    accounts,
                    parse_params(params)?,
                    false,
                )?;
            }
            OrderbookInstruction::PlaceMultiplePostOnlyOrders => {
                msg!("Instruction: Place Multiple Post Only Orders");
                let accounts = place_multiple_orders::Accounts::parse(accounts)?;
                place_multiple_orders::process(
                    program_id,
                    accounts,
                    parse_params(params)?,
                    true,
                )?;
            }
            OrderbookInstruction::PruneExpiredOrders => {
                msg!("Instruction: Prune Expired Orders");
                let accounts = prune_expired_orders::Accounts::parse(accounts)?;
                prune_expired_orders::process(program_id, accounts, parse_params(params)?)?;
            }
            OrderbookInstruction::ConsumeEvents => {
                msg!("Instruction: Consume Events");
                let accounts = consume_events::Accounts::parse(accounts)?;
                consume_events::process(program_id, accounts, parse_params(params)?)?;
            }
        }
        Ok(())
    }
}

fn parse_params<P: BorshDeserialize>(data: &[u8]) -> Result<P, ProgramError> {
    P::try_from_slice(data).map_err(|_| ProgramError::InvalidInstructionData)
}

/// Logs the detailed error before it is collapsed into its program error code.
pub(crate) fn log_error(error: ClobError) -> ProgramError {
    msg!("{}", error);
    error.into()
}

pub use order_accounts::OrderAccounts;

mod order_accounts {
    use super::*;
    // The `InstructionsAccount` derive implements the trait for a type named `Accounts`.
    use self::OrderAccounts as Accounts;

    /// The four accounts of a market plus the trader signing for an order operation.
    #[derive(InstructionsAccount)]
    pub struct OrderAccounts<'a, T> {
        #[cons(writable)]
        pub market: &'a T,
        #[cons(writable)]
        pub event_queue: &'a T,
        #[cons(writable)]
        pub bids: &'a T,
        #[cons(writable)]
        pub asks: &'a T,
        #[cons(signer)]
        pub trader: &'a T,
    }
}

impl<'a, 'b: 'a> OrderAccounts<'a, AccountInfo<'b>> {
    pub fn parse(accounts: &'a [AccountInfo<'b>]) -> Result<Self, ProgramError> {
        let accounts_iter = &mut accounts.iter();
        Ok(Self {
            market: next_account_info(accounts_iter)?,
            event_queue: next_account_info(accounts_iter)?,
            bids: next_account_info(accounts_iter)?,
            asks: next_account_info(accounts_iter)?,
            trader: next_account_info(accounts_iter)?,
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
        check_signer(self.trader).map_err(|e| {
            msg!("The trader should be a signer for this instruction!");
            e
        })
    }

    /// Loads the market and runs `f` against it on behalf of the signing trader.
    pub fn with_market<R>(
        &self,
        f: impl FnOnce(&[u8; 32], &mut Market<'_>, &mut EventQueue<'_>) -> ClobResult<R>,
    ) -> Result<R, ProgramError> {
        let trader = self.trader.key.to_bytes();
        with_book(self.market, self.event_queue, self.bids, self.asks, |market, queue| {
            f(&trader, market, queue)
        })
    }
}

pub(crate) fn check_book_owners(
    program_id: &Pubkey,
    market: &AccountInfo,
    event_queue: &AccountInfo,
    bids: &AccountInfo,
    asks: &AccountInfo,
) -> ClobResult {
    let program_id = program_id.to_bytes();
    check_account_owner(market, &program_id, ClobError::WrongMarketOwner)?;
    check_account_owner(event_queue, &program_id, ClobError::WrongEventQueueOwner)?;
    check_account_owner(bids, &program_id, ClobError::WrongBidsOwner)?;
    check_account_owner(asks, &program_id, ClobError::WrongAsksOwner)?;
    Ok(())
}

pub(crate) fn check_book_keys(
    market_state: &MarketState,
    event_queue: &AccountInfo,
    bids: &AccountInfo,
    asks: &AccountInfo,
) -> ClobResult {
    check_account_key(
        event_queue,
        &market_state.event_queue,
        ClobError::WrongEventQueueAccount,
    )?;
    check_account_key(bids, &market_state.bids, ClobError::WrongBidsAccount)?;
    check_account_key(asks, &market_state.asks, ClobError::WrongAsksAccount)?;
    Ok(())
}

/// Borrows the four buffers of a market, after checking that the slabs and the queue are the
/// ones recorded in the market header, and runs `f` on the loaded market.
pub(crate) fn with_book<R>(
    market: &AccountInfo,
    event_queue: &AccountInfo,
    bids: &AccountInfo,
    asks: &AccountInfo,
    f: impl FnOnce(&mut Market<'_>, &mut EventQueue<'_>) -> ClobResult<R>,
) -> Result<R, ProgramError> {
    let market_address = market.key.to_bytes();
    let mut market_data = market.data.borrow_mut();
    {
        let (market_state, _) = MarketState::from_buffer(&mut market_data).map_err(log_error)?;
        check_book_keys(market_state, event_queue, bids, asks)?;
    }
    let mut bids_data = bids.data.borrow_mut();
    let mut asks_data = asks.data.borrow_mut();
    let mut event_queue_data = event_queue.data.borrow_mut();

    let mut market = Market::load(&mut market_data, &mut bids_data, &mut asks_data)
        .map_err(log_error)?;
    if market.book.bids.header.market_address != market_address {
        return Err(log_error(ClobError::InvalidAccountData));
    }
    let mut event_queue = EventQueue::from_buffer(&mut event_queue_data).map_err(log_error)?;
    f(&mut market, &mut event_queue).map_err(log_error)
}

/// Borrows the market account alone and runs `f` on its header and trader seats.
pub(crate) fn with_traders<R>(
    market: &AccountInfo,
    f: impl FnOnce(&mut MarketState, &mut TraderRegistry<'_>) -> ClobResult<R>,
) -> Result<R, ProgramError> {
    let mut market_data = market.data.borrow_mut();
    let (market_state, mut traders) =
        MarketState::from_buffer(&mut market_data).map_err(log_error)?;
    f(market_state, &mut traders).map_err(log_error)
}

pub use authority_accounts::AuthorityAccounts;

mod authority_accounts {
    use super::*;
    // The `InstructionsAccount` derive implements the trait for a type named `Accounts`.
    use self::AuthorityAccounts as Accounts;

    /// The market and its caller authority, for the instructions moving funds in and out of seats.
    #[derive(InstructionsAccount)]
    pub struct AuthorityAccounts<'a, T> {
        #[cons(writable)]
        pub market: &'a T,
        #[cons(signer)]
        pub caller_authority: &'a T,
    }
}

impl<'a, 'b: 'a> AuthorityAccounts<'a, AccountInfo<'b>> {
    pub fn parse(accounts: &'a [AccountInfo<'b>]) -> Result<Self, ProgramError> {
        let accounts_iter = &mut accounts.iter();
        Ok(Self {
            market: next_account_info(accounts_iter)?,
            caller_authority: next_account_info(accounts_iter)?,
        })
    }

    pub fn perform_checks(&self, program_id: &Pubkey) -> Result<(), ProgramError> {
        check_account_owner(
            self.market,
            &program_id.to_bytes(),
            ClobError::WrongMarketOwner,
        )?;
        check_signer(self.caller_authority).map_err(|e| {
            msg!("The market authority should be a signer for this instruction!");
            e
        })
    }

    /// Runs `f` on the trader seats once the signer is known to be the market's authority.
    pub fn with_traders<R>(
        &self,
        f: impl FnOnce(&mut TraderRegistry<'_>) -> ClobResult<R>,
    ) -> Result<R, ProgramError> {
        with_traders(self.market, |market_state, traders| {
            check_account_key(
                self.caller_authority,
                &market_state.caller_authority,
                ClobError::WrongCallerAuthority,
            )?;
            f(traders)
        })
    }
}
