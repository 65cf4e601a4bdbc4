use borsh::BorshSerialize;
use solana_program::{
    account_info::AccountInfo, entrypoint::ProgramResult, msg, program::set_return_data,
    program_error::ProgramError,
};

use crate::error::{ClobError, ClobResult};

/// Upper bound enforced by the runtime on return data.
const MAX_RETURN_DATA_LEN: usize = 1024;

// Safety verification functions
pub fn check_account_key(account: &AccountInfo, key: &[u8], error: ClobError) -> ClobResult {
    if account.key.to_bytes() != key {
        return Err(error);
    }
    Ok(())
}

pub fn check_account_owner(account: &AccountInfo, owner: &[u8], error: ClobError) -> ClobResult {
    if account.owner.to_bytes() != owner {
        return Err(error);
    }
    Ok(())
}

pub fn check_signer(account: &AccountInfo) -> ProgramResult {
    if !(account.is_signer) {
        return Err(ProgramError::MissingRequiredSignature);
    }
    Ok(())
}

pub fn check_unitialized(account: &AccountInfo) -> ClobResult {
    let data = account.data.borrow();
    if data.len() < 8 || data[0..8] != [0; 8] {
        return Err(ClobError::AlreadyInitialized);
    }
    Ok(())
}

/// Publishes a borsh-encoded value as the instruction's return data. Values too large for the
/// runtime are only logged.
pub fn set_borsh_return_data<T: BorshSerialize>(value: &T) -> ProgramResult {
    let data = value
        .try_to_vec()
        .map_err(|e| ProgramError::BorshIoError(e.to_string()))?;
    if data.len() > MAX_RETURN_DATA_LEN {
        msg!("Return data of {} bytes is too large and was dropped", data.len());
        return Ok(());
    }
    set_return_data(&data);
    Ok(())
}
