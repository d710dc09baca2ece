use solana_program::{
    decode_error::DecodeError,
    msg,
    program_error::{PrintProgramError, ProgramError},
    pubkey::Pubkey,
};
use thiserror::Error;

use crate::raffle_state::RaffleState;

/// Errors that may be returned by the Raffle program
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Invalid instruction data passed
    #[error("Invalid instruction data")]
    InvalidInstructionData,

    /// Entry paid less than the entrance fee
    #[error("Send more to enter raffle: paid {paid} lamports, entrance fee is {required}")]
    InsufficientPayment { paid: u64, required: u64 },

    /// Entries are refused while a winner is being drawn
    #[error("Raffle is not open")]
    RaffleNotOpen,

    /// Winner selection was triggered before the round was eligible
    #[error("Upkeep not needed: balance={balance}, players={players}, state={state}")]
    EligibilityNotMet {
        balance: u64,
        players: u64,
        state: RaffleState,
    },

    /// Player lookup past the end of the entry list
    #[error("Player index {index} out of range ({players} players)")]
    PlayerIndexOutOfRange { index: u64, players: u64 },

    /// Randomness arrived while no draw was in flight
    #[error("No randomness request is pending")]
    NoDrawPending,

    /// Randomness arrived for a request this raffle did not make
    #[error("Request id mismatch: pending {expected}, received {received}")]
    RequestIdMismatch { expected: u64, received: u64 },

    /// Callback carried no random words
    #[error("Fulfillment carried no random words")]
    MissingRandomWords,

    /// Callback was not signed by the configured coordinator
    #[error("Only coordinator can fulfill: have {have}, want {want}")]
    OnlyCoordinatorCanFulfill { have: Pubkey, want: Pubkey },

    /// Winner account passed to the callback is not the drawn player
    #[error("Winner account mismatch: drawn {expected}, received {received}")]
    WinnerAccountMismatch { expected: Pubkey, received: Pubkey },

    /// Vault account does not match the raffle's vault PDA
    #[error("Vault account does not match the raffle")]
    InvalidVault,

    /// Coordinator returned no request id
    #[error("Coordinator did not return a request id")]
    MissingRequestId,

    /// Raffle configuration rejected at initialization
    #[error("Invalid raffle configuration: {0}")]
    InvalidConfig(&'static str),

    /// Arithmetic overflow
    #[error("Arithmetic overflow")]
    Overflow,
}

impl RaffleError {
    /// Stable code reported through `ProgramError::Custom`
    pub fn code(&self) -> u32 {
        match self {
            RaffleError::InvalidInstructionData => 0,
            RaffleError::InsufficientPayment { .. } => 1,
            RaffleError::RaffleNotOpen => 2,
            RaffleError::EligibilityNotMet { .. } => 3,
            RaffleError::PlayerIndexOutOfRange { .. } => 4,
            RaffleError::NoDrawPending => 5,
            RaffleError::RequestIdMismatch { .. } => 6,
            RaffleError::MissingRandomWords => 7,
            RaffleError::OnlyCoordinatorCanFulfill { .. } => 8,
            RaffleError::WinnerAccountMismatch { .. } => 9,
            RaffleError::InvalidVault => 10,
            RaffleError::MissingRequestId => 11,
            RaffleError::InvalidConfig(_) => 12,
            RaffleError::Overflow => 13,
        }
    }
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        // Custom codes drop the fields, so log them on the way out
        msg!("Raffle error: {}", e);
        ProgramError::Custom(e.code())
    }
}

impl<T> DecodeError<T> for RaffleError {
    fn type_of() -> &'static str {
        "Raffle Error"
    }
}

impl PrintProgramError for RaffleError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}
