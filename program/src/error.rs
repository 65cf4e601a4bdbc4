use num_derive::FromPrimitive;
use solana_program::{decode_error::DecodeError, program_error::ProgramError};
use thiserror::Error;

use crate::state::Side;

pub type ClobResult<T = ()> = Result<T, ClobError>;

/// Malformed input, rejected before the book is touched.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("The order size must be > 0")]
    ZeroSize,
    #[error("The order price must be > 0")]
    InvalidPrice,
    #[error("Exactly one of num_base_lots or num_quote_lots must be nonzero")]
    InvalidIocSize,
    #[error("The order packet expiry is already in the past")]
    OrderPacketExpired,
    #[error("The trader does not hold a seat on this market")]
    UnknownTrader,
    #[error("The trader key is invalid")]
    InvalidTrader,
    #[error("The batch contains no orders")]
    EmptyBatch,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClobError {
    #[error("Invalid order: {0}")]
    Validation(ValidationError),
    #[error("An order with this id already rests on the book")]
    DuplicateOrderId,
    #[error("The order could not be found")]
    OrderNotFound,
    #[error("The order would self trade")]
    SelfTrade,
    #[error("The post-only order crosses the book")]
    PostOnlyCrossed,
    #[error("The trader does not have enough free funds")]
    InsufficientFunds,
    #[error("A lot size denominator is zero")]
    InvalidLotSize,
    #[error("Numerical overflow")]
    ArithmeticOverflow,
    #[error("The immediate-or-cancel order did not meet its minimum fill")]
    MinimumFillNotMet,
    #[error("Order {index} on the {side:?} side of the batch failed: {cause}")]
    BatchAborted {
        side: Side,
        index: u32,
        cause: Box<ClobError>,
    },
    #[error("The book side is full and the order is not aggressive enough to evict")]
    BookFull,
    #[error("All trader seats are taken")]
    RegistryFull,
    #[error("The seat still holds funds or open orders")]
    SeatInUse,
    #[error("The event queue is full")]
    EventQueueFull,
    #[error("An account holds invalid data")]
    InvalidAccountData,
    #[error("This account is already initialized")]
    AlreadyInitialized,
    #[error("The order sequence number is exhausted")]
    SequenceNumberExhausted,
    #[error("The market parameters are invalid")]
    InvalidMarketParameters,
    #[error("An invalid bids account has been provided")]
    WrongBidsAccount,
    #[error("An invalid asks account has been provided")]
    WrongAsksAccount,
    #[error("An invalid event queue account has been provided")]
    WrongEventQueueAccount,
    #[error("An invalid caller authority account has been provided")]
    WrongCallerAuthority,
    #[error("The market account should be owned by the orderbook program")]
    WrongMarketOwner,
    #[error("The bids account should be owned by the orderbook program")]
    WrongBidsOwner,
    #[error("The asks account should be owned by the orderbook program")]
    WrongAsksOwner,
    #[error("The event queue should be owned by the orderbook program")]
    WrongEventQueueOwner,
}

impl From<ValidationError> for ClobError {
    fn from(e: ValidationError) -> Self {
        ClobError::Validation(e)
    }
}

impl ClobError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ClobError::Validation(_) => ErrorCode::InvalidOrder,
            ClobError::DuplicateOrderId => ErrorCode::DuplicateOrderId,
            ClobError::OrderNotFound => ErrorCode::OrderNotFound,
            ClobError::SelfTrade => ErrorCode::WouldSelfTrade,
            ClobError::PostOnlyCrossed => ErrorCode::PostOnlyCrossed,
            ClobError::InsufficientFunds => ErrorCode::InsufficientFunds,
            ClobError::InvalidLotSize => ErrorCode::InvalidLotSize,
            ClobError::ArithmeticOverflow => ErrorCode::NumericalOverflow,
            ClobError::MinimumFillNotMet => ErrorCode::MinimumFillNotMet,
            ClobError::BatchAborted { .. } => ErrorCode::BatchAborted,
            ClobError::BookFull => ErrorCode::SlabOutOfSpace,
            ClobError::RegistryFull => ErrorCode::RegistryFull,
            ClobError::SeatInUse => ErrorCode::SeatInUse,
            ClobError::EventQueueFull => ErrorCode::EventQueueFull,
            ClobError::InvalidAccountData => ErrorCode::InvalidAccountData,
            ClobError::AlreadyInitialized => ErrorCode::AlreadyInitialized,
            ClobError::SequenceNumberExhausted => ErrorCode::SequenceNumberExhausted,
            ClobError::InvalidMarketParameters => ErrorCode::InvalidMarketParameters,
            ClobError::WrongBidsAccount => ErrorCode::WrongBidsAccount,
            ClobError::WrongAsksAccount => ErrorCode::WrongAsksAccount,
            ClobError::WrongEventQueueAccount => ErrorCode::WrongEventQueueAccount,
            ClobError::WrongCallerAuthority => ErrorCode::WrongCallerAuthority,
            ClobError::WrongMarketOwner => ErrorCode::WrongMarketOwner,
            ClobError::WrongBidsOwner => ErrorCode::WrongBidsOwner,
            ClobError::WrongAsksOwner => ErrorCode::WrongAsksOwner,
            ClobError::WrongEventQueueOwner => ErrorCode::WrongEventQueueOwner,
        }
    }
}

impl From<ClobError> for ProgramError {
    fn from(e: ClobError) -> Self {
        ProgramError::Custom(e.code() as u32)
    }
}

/// Stable on-chain error codes, one per [`ClobError`] family.
#[derive(Clone, Copy, Debug, Error, FromPrimitive, PartialEq, Eq)]
pub enum ErrorCode {
    #[error("Invalid order")]
    InvalidOrder,
    #[error("Duplicate order id")]
    DuplicateOrderId,
    #[error("The order could not be found")]
    OrderNotFound,
    #[error("The order would self trade")]
    WouldSelfTrade,
    #[error("The post-only order crosses the book")]
    PostOnlyCrossed,
    #[error("Insufficient funds")]
    InsufficientFunds,
    #[error("Invalid lot size")]
    InvalidLotSize,
    #[error("Numerical overflow")]
    NumericalOverflow,
    #[error("Minimum fill not met")]
    MinimumFillNotMet,
    #[error("Batch aborted")]
    BatchAborted,
    #[error("The market's memory is full")]
    SlabOutOfSpace,
    #[error("All trader seats are taken")]
    RegistryFull,
    #[error("The seat is still in use")]
    SeatInUse,
    #[error("The event queue is full")]
    EventQueueFull,
    #[error("Invalid account data")]
    InvalidAccountData,
    #[error("This account is already initialized")]
    AlreadyInitialized,
    #[error("The order sequence number is exhausted")]
    SequenceNumberExhausted,
    #[error("Invalid market parameters")]
    InvalidMarketParameters,
    #[error("Wrong bids account")]
    WrongBidsAccount,
    #[error("Wrong asks account")]
    WrongAsksAccount,
    #[error("Wrong event queue account")]
    WrongEventQueueAccount,
    #[error("Wrong caller authority")]
    WrongCallerAuthority,
    #[error("Wrong market owner")]
    WrongMarketOwner,
    #[error("Wrong bids owner")]
    WrongBidsOwner,
    #[error("Wrong asks owner")]
    WrongAsksOwner,
    #[error("Wrong event queue owner")]
    WrongEventQueueOwner,
}

impl<T> DecodeError<T> for ErrorCode {
    fn type_of() -> &'static str {
        "OrderbookError"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn custom_codes_decode_back() {
        let err = ClobError::BatchAborted {
            side: Side::Ask,
            index: 0,
            cause: Box::new(ValidationError::ZeroSize.into()),
        };
        let ProgramError::Custom(code) = ProgramError::from(err) else {
            panic!("expected a custom error");
        };
        assert_eq!(ErrorCode::from_u32(code), Some(ErrorCode::BatchAborted));
        assert_eq!(
            ErrorCode::from_u32(ClobError::BookFull.code() as u32),
            Some(ErrorCode::SlabOutOfSpace)
        );
    }
}
