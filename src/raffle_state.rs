use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp,
    program_error::ProgramError,
    program_pack::{IsInitialized, Sealed},
    pubkey::Pubkey,
};

use crate::{raffle_error::RaffleError, vrf};

/// Random words requested per draw
pub const NUM_WORDS: u32 = 1;

/// Serialized size of `RaffleConfig`
pub const RAFFLE_CONFIG_LEN: usize = 8 + 8 + 32 + 8 + 4 + 2 + 4 + 1 + 32;

/// Serialized size of a `Raffle` with no players (pending request id counted as `Some`)
pub const RAFFLE_HEADER_LEN: usize = 1 + 32 + RAFFLE_CONFIG_LEN + 1 + 1 + 8 + 32 + (1 + 8) + 4;

/// Bytes taken by one entry in the player list
pub const PLAYER_SLOT_LEN: usize = 32;

/// Status of the current round
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaffleState {
    /// Accepting entries, eligible for a draw
    Open,
    /// Entries refused, waiting for the coordinator callback
    CalculatingWinner,
}

impl fmt::Display for RaffleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaffleState::Open => write!(f, "Open"),
            RaffleState::CalculatingWinner => write!(f, "CalculatingWinner"),
        }
    }
}

/// Immutable raffle parameters, fixed at initialization
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RaffleConfig {
    /// Minimum payment per entry in lamports
    pub entrance_fee: u64,
    /// Minimum round length in seconds
    pub interval: u64,
    /// Randomness lane on the coordinator
    pub key_hash: [u8; 32],
    /// Coordinator subscription paying for requests
    pub subscription_id: u64,
    /// Compute budget granted to the fulfillment callback
    pub callback_gas_limit: u32,
    /// Confirmations the coordinator waits before answering
    pub request_confirmations: u16,
    /// Random words requested per draw, always `NUM_WORDS`
    pub num_words: u32,
    /// Requests are paid in lamports rather than a side token
    pub native_payment: bool,
    /// Coordinator program that serves randomness
    pub vrf_coordinator: Pubkey,
}

impl Default for RaffleConfig {
    fn default() -> Self {
        // Local development presets
        // Entrance fee: 0.01 SOL = 10,000,000 lamports
        // Interval: 30 seconds
        Self {
            entrance_fee: 10_000_000,
            interval: 30,
            key_hash: [0u8; 32],
            subscription_id: 0,
            callback_gas_limit: 500_000,
            request_confirmations: 3,
            num_words: NUM_WORDS,
            native_payment: true,
            vrf_coordinator: Pubkey::default(),
        }
    }
}

impl RaffleConfig {
    pub fn validate(&self) -> Result<(), RaffleError> {
        if self.interval > i64::MAX as u64 {
            return Err(RaffleError::InvalidConfig("interval exceeds timestamp range"));
        }
        if self.num_words != NUM_WORDS {
            return Err(RaffleError::InvalidConfig("exactly one random word per draw"));
        }
        if self.vrf_coordinator == Pubkey::default() {
            return Err(RaffleError::InvalidConfig("vrf coordinator not set"));
        }
        Ok(())
    }
}

/// Result of the eligibility check
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct UpkeepCheck {
    pub upkeep_needed: bool,
    /// Reserved, always empty
    pub perform_data: Vec<u8>,
}

/// Raffle account data
///
/// Every mutation goes through the transition methods below so the round
/// invariants hold no matter which instruction drives them.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Raffle {
    is_initialized: bool,
    /// Deployer of the raffle
    owner: Pubkey,
    config: RaffleConfig,
    /// Bump of the vault PDA holding the pool
    vault_bump: u8,
    state: RaffleState,
    /// Start of the current round
    last_timestamp: UnixTimestamp,
    /// Winner of the last completed round, zero before the first
    recent_winner: Pubkey,
    /// Correlates the in-flight draw with its callback
    pending_request_id: Option<u64>,
    /// One slot per entry, in entry order
    players: Vec<Pubkey>,
}

impl Sealed for Raffle {}

impl IsInitialized for Raffle {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Raffle {
    pub fn new(owner: Pubkey, config: RaffleConfig, vault_bump: u8, now: UnixTimestamp) -> Self {
        Self {
            is_initialized: true,
            owner,
            config,
            vault_bump,
            state: RaffleState::Open,
            last_timestamp: now,
            recent_winner: Pubkey::default(),
            pending_request_id: None,
            players: Vec::new(),
        }
    }

    /// Account size needed to hold `players` entries
    pub fn space_for(players: usize) -> usize {
        RAFFLE_HEADER_LEN + players * PLAYER_SLOT_LEN
    }

    /// Decodes raffle data, ignoring unused capacity at the end of the account
    pub fn unpack(src: &[u8]) -> Result<Self, ProgramError> {
        let mut data = src;
        Self::deserialize(&mut data).map_err(|_| ProgramError::InvalidAccountData)
    }

    pub fn pack_into(&self, dst: &mut [u8]) -> Result<(), ProgramError> {
        let mut writer = dst;
        self.serialize(&mut writer)
            .map_err(|_| ProgramError::AccountDataTooSmall)
    }

    /// Adds one entry for `player`
    pub fn enter(&mut self, player: Pubkey, amount: u64) -> Result<(), RaffleError> {
        if self.state != RaffleState::Open {
            return Err(RaffleError::RaffleNotOpen);
        }
        if amount < self.config.entrance_fee {
            return Err(RaffleError::InsufficientPayment {
                paid: amount,
                required: self.config.entrance_fee,
            });
        }

        self.players.push(player);
        Ok(())
    }

    /// Side-effect free eligibility check for a draw
    pub fn check_upkeep(&self, now: UnixTimestamp, balance: u64) -> UpkeepCheck {
        let time_passed =
            now as i128 - self.last_timestamp as i128 >= self.config.interval as i128;
        let is_open = self.state == RaffleState::Open;
        let has_players = !self.players.is_empty();
        let has_balance = balance > 0;

        UpkeepCheck {
            upkeep_needed: time_passed && is_open && has_players && has_balance,
            perform_data: Vec::new(),
        }
    }

    /// Closes entries for a draw if the round is eligible
    pub fn begin_draw(&mut self, now: UnixTimestamp, balance: u64) -> Result<(), RaffleError> {
        if !self.check_upkeep(now, balance).upkeep_needed {
            return Err(RaffleError::EligibilityNotMet {
                balance,
                players: self.players.len() as u64,
                state: self.state,
            });
        }

        self.state = RaffleState::CalculatingWinner;
        Ok(())
    }

    pub fn record_request(&mut self, request_id: u64) {
        self.pending_request_id = Some(request_id);
    }

    /// Picks the winner and resets the round.
    ///
    /// All local state is reset before `payout` runs, so the payout sees an
    /// open, empty round. If `payout` fails the raffle is restored exactly
    /// as it was before the call.
    pub fn settle<F, E>(
        &mut self,
        request_id: u64,
        random_words: &[u64],
        now: UnixTimestamp,
        payout: F,
    ) -> Result<Pubkey, E>
    where
        F: FnOnce(&Raffle, &Pubkey) -> Result<(), E>,
        E: From<RaffleError>,
    {
        if self.state != RaffleState::CalculatingWinner || self.players.is_empty() {
            return Err(RaffleError::NoDrawPending.into());
        }
        let expected = self.pending_request_id.ok_or(RaffleError::NoDrawPending)?;
        if expected != request_id {
            return Err(RaffleError::RequestIdMismatch {
                expected,
                received: request_id,
            }
            .into());
        }
        let random_word = *random_words
            .first()
            .ok_or(RaffleError::MissingRandomWords)?;

        let winner = self.players[vrf::winner_index(random_word, self.players.len())];
        let snapshot = self.clone();

        self.recent_winner = winner;
        self.players.clear();
        self.last_timestamp = now;
        self.state = RaffleState::Open;
        self.pending_request_id = None;

        if let Err(e) = payout(&*self, &winner) {
            *self = snapshot;
            return Err(e);
        }

        Ok(winner)
    }

    pub fn entrance_fee(&self) -> u64 {
        self.config.entrance_fee
    }

    pub fn owner(&self) -> Pubkey {
        self.owner
    }

    pub fn raffle_state(&self) -> RaffleState {
        self.state
    }

    pub fn recent_winner(&self) -> Option<Pubkey> {
        if self.recent_winner == Pubkey::default() {
            None
        } else {
            Some(self.recent_winner)
        }
    }

    pub fn interval(&self) -> u64 {
        self.config.interval
    }

    pub fn number_of_players(&self) -> u64 {
        self.players.len() as u64
    }

    pub fn player(&self, index: u64) -> Result<Pubkey, RaffleError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.players.get(i))
            .copied()
            .ok_or(RaffleError::PlayerIndexOutOfRange {
                index,
                players: self.players.len() as u64,
            })
    }

    pub fn last_timestamp(&self) -> UnixTimestamp {
        self.last_timestamp
    }

    pub fn num_words(&self) -> u32 {
        self.config.num_words
    }

    pub fn request_confirmations(&self) -> u16 {
        self.config.request_confirmations
    }

    pub fn subscription_id(&self) -> u64 {
        self.config.subscription_id
    }

    pub fn vrf_coordinator(&self) -> Pubkey {
        self.config.vrf_coordinator
    }

    pub fn pending_request_id(&self) -> Option<u64> {
        self.pending_request_id
    }

    pub fn config(&self) -> &RaffleConfig {
        &self.config
    }

    pub fn vault_bump(&self) -> u8 {
        self.vault_bump
    }
}
