use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::{raffle_error::RaffleError, raffle_state::RaffleConfig, utils};

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Create a raffle and its prize vault
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The owner, pays for both accounts
    /// 1. `[signer, writable]` The raffle account, must not exist yet
    /// 2. `[writable]` The vault PDA (`["vault", raffle]`)
    /// 3. `[]` The system program
    InitializeRaffle { config: RaffleConfig },

    /// Buy one entry into the current round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The player, pays the entry and any extra rent
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` The vault PDA
    /// 3. `[]` The system program
    EnterRaffle {
        /// Lamports paid, at least the entrance fee
        amount: u64,
    },

    /// Report whether a draw can be triggered, as `UpkeepCheck` return data
    ///
    /// Accounts expected:
    /// 0. `[]` The raffle account
    /// 1. `[]` The vault PDA
    CheckUpkeep { check_data: Vec<u8> },

    /// Close entries and request randomness (anyone can initiate this action)
    ///
    /// Accounts expected:
    /// 0. `[signer]` Any user
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The vault PDA, signs the request
    /// 3. `[]` The VRF coordinator program
    /// Remaining accounts are forwarded to the coordinator
    PerformUpkeep { perform_data: Vec<u8> },

    /// Randomness callback, invoked by the VRF coordinator only
    ///
    /// Accounts expected:
    /// 0. `[signer]` The coordinator authority PDA
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` The vault PDA
    /// 3. `[writable]` The drawn player, receives the pool
    FulfillRandomWords {
        request_id: u64,
        random_words: Vec<u64>,
    },
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| RaffleError::InvalidInstructionData.into())
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        self.try_to_vec()
            .map_err(|_| RaffleError::InvalidInstructionData.into())
    }
}

/// Create initialize_raffle instruction
pub fn initialize_raffle(
    program_id: &Pubkey,
    owner: &Pubkey,
    raffle_account: &Pubkey,
    config: RaffleConfig,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::InitializeRaffle { config }.pack()?;
    let (vault, _) = utils::find_vault_address(program_id, raffle_account);

    let accounts = vec![
        AccountMeta::new(*owner, true),
        AccountMeta::new(*raffle_account, true),
        AccountMeta::new(vault, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create enter_raffle instruction
pub fn enter_raffle(
    program_id: &Pubkey,
    player: &Pubkey,
    raffle_account: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::EnterRaffle { amount }.pack()?;
    let (vault, _) = utils::find_vault_address(program_id, raffle_account);

    let accounts = vec![
        AccountMeta::new(*player, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new(vault, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create check_upkeep instruction
pub fn check_upkeep(
    program_id: &Pubkey,
    raffle_account: &Pubkey,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::CheckUpkeep {
        check_data: Vec::new(),
    }
    .pack()?;
    let (vault, _) = utils::find_vault_address(program_id, raffle_account);

    let accounts = vec![
        AccountMeta::new_readonly(*raffle_account, false),
        AccountMeta::new_readonly(vault, false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create perform_upkeep instruction
pub fn perform_upkeep(
    program_id: &Pubkey,
    caller: &Pubkey,
    raffle_account: &Pubkey,
    vrf_coordinator: &Pubkey,
    coordinator_accounts: &[AccountMeta],
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::PerformUpkeep {
        perform_data: Vec::new(),
    }
    .pack()?;
    let (vault, _) = utils::find_vault_address(program_id, raffle_account);

    let mut accounts = vec![
        AccountMeta::new_readonly(*caller, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new_readonly(vault, false),
        AccountMeta::new_readonly(*vrf_coordinator, false),
    ];

    // Add all remaining accounts needed by the coordinator
    accounts.extend_from_slice(coordinator_accounts);

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create fulfill_random_words instruction, built by the coordinator
pub fn fulfill_random_words(
    program_id: &Pubkey,
    coordinator_authority: &Pubkey,
    raffle_account: &Pubkey,
    winner: &Pubkey,
    request_id: u64,
    random_words: Vec<u64>,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::FulfillRandomWords {
        request_id,
        random_words,
    }
    .pack()?;
    let (vault, _) = utils::find_vault_address(program_id, raffle_account);

    let accounts = vec![
        AccountMeta::new_readonly(*coordinator_authority, true),
        AccountMeta::new(*raffle_account, false),
        AccountMeta::new(vault, false),
        AccountMeta::new(*winner, false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}
