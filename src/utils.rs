// Raffle program - account helpers
use solana_program::{
    account_info::AccountInfo, program_error::ProgramError, pubkey::Pubkey, rent::Rent,
};

use crate::raffle_error::RaffleError;

/// Seed prefix of the vault PDA
pub const VAULT_SEED: &[u8] = b"vault";

/// Find the vault PDA holding a raffle's pool
pub fn find_vault_address(program_id: &Pubkey, raffle: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_SEED, raffle.as_ref()], program_id)
}

/// Verify `vault` is the PDA recorded for `raffle`
pub fn check_vault_address(
    program_id: &Pubkey,
    raffle: &Pubkey,
    vault: &Pubkey,
    bump: u8,
) -> Result<(), RaffleError> {
    let expected = Pubkey::create_program_address(&[VAULT_SEED, raffle.as_ref(), &[bump]], program_id)
        .map_err(|_| RaffleError::InvalidVault)?;
    if expected != *vault {
        return Err(RaffleError::InvalidVault);
    }
    Ok(())
}

/// Lamports in the vault above its rent-exempt reserve
pub fn vault_balance(vault: &AccountInfo, rent: &Rent) -> u64 {
    vault
        .lamports()
        .saturating_sub(rent.minimum_balance(vault.data_len()))
}

/// Move lamports out of an account owned by this program
pub fn transfer_lamports(
    from: &AccountInfo,
    to: &AccountInfo,
    amount: u64,
) -> Result<(), ProgramError> {
    let from_balance = from
        .lamports()
        .checked_sub(amount)
        .ok_or(RaffleError::Overflow)?;
    let to_balance = to
        .lamports()
        .checked_add(amount)
        .ok_or(RaffleError::Overflow)?;

    **from.try_borrow_mut_lamports()? = from_balance;
    **to.try_borrow_mut_lamports()? = to_balance;
    Ok(())
}
