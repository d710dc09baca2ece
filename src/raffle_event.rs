use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{log::sol_log_data, msg, pubkey::Pubkey};

/// Notifications for off-chain observers, logged as borsh program data
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum RaffleEvent {
    RaffleEntered { player: Pubkey },
    /// Lets observers match the later callback to this draw
    RequestedRaffleWinner { request_id: u64 },
    WinnerPicked { winner: Pubkey },
}

impl RaffleEvent {
    pub fn emit(&self) {
        match self {
            RaffleEvent::RaffleEntered { player } => msg!("RaffleEntered: {}", player),
            RaffleEvent::RequestedRaffleWinner { request_id } => {
                msg!("RequestedRaffleWinner: {}", request_id)
            }
            RaffleEvent::WinnerPicked { winner } => msg!("WinnerPicked: {}", winner),
        }
        if let Ok(data) = self.try_to_vec() {
            sol_log_data(&[&data]);
        }
    }
}
