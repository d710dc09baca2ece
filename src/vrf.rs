// VRF coordinator integration for the raffle program
//
// The coordinator is an external program. A request is a CPI signed by the
// raffle vault; the coordinator answers with the request id in return data
// and later calls back `FulfillRandomWords`, signing with its authority PDA.
use arrayref::array_ref;
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    instruction::{AccountMeta, Instruction},
    msg,
    program::{get_return_data, invoke_signed},
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::raffle_error::RaffleError;

/// Prefix of a random words request
pub const REQUEST_RANDOM_WORDS_DISCRIMINATOR: [u8; 8] = *b"RNDWORDS";

/// Seed of the PDA the coordinator signs callbacks with
pub const COORDINATOR_AUTHORITY_SEED: &[u8] = b"coordinator-authority";

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ExtraArgs {
    /// Pay for the request in lamports instead of a side token
    pub native_payment: bool,
}

/// Parameters of one randomness request
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RandomWordsRequest {
    pub key_hash: [u8; 32],
    pub sub_id: u64,
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub num_words: u32,
    pub extra_args: ExtraArgs,
}

impl RandomWordsRequest {
    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        let mut data = REQUEST_RANDOM_WORDS_DISCRIMINATOR.to_vec();
        let body = self
            .try_to_vec()
            .map_err(|_| ProgramError::InvalidInstructionData)?;
        data.extend_from_slice(&body);
        Ok(data)
    }

    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        if input.len() < 8 || input[..8] != REQUEST_RANDOM_WORDS_DISCRIMINATOR {
            return Err(ProgramError::InvalidInstructionData);
        }
        Self::try_from_slice(&input[8..]).map_err(|_| ProgramError::InvalidInstructionData)
    }
}

/// Implemented by programs that receive coordinator randomness
pub trait RandomnessConsumer {
    /// Coordinator program allowed to deliver randomness
    fn vrf_coordinator(&self) -> Pubkey;

    fn fulfill_random_words(&mut self, request_id: u64, random_words: &[u64]) -> ProgramResult;
}

/// PDA of `coordinator_program` that signs fulfillment callbacks
pub fn coordinator_authority(coordinator_program: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[COORDINATOR_AUTHORITY_SEED], coordinator_program)
}

/// Entry point for coordinator callbacks. Only the coordinator authority may
/// hand randomness to the consumer.
pub fn raw_fulfill_random_words<C: RandomnessConsumer>(
    consumer: &mut C,
    authority_info: &AccountInfo,
    request_id: u64,
    random_words: &[u64],
) -> ProgramResult {
    let (want, _) = coordinator_authority(&consumer.vrf_coordinator());
    if !authority_info.is_signer || *authority_info.key != want {
        return Err(RaffleError::OnlyCoordinatorCanFulfill {
            have: *authority_info.key,
            want,
        }
        .into());
    }

    consumer.fulfill_random_words(request_id, random_words)
}

/// Sends a randomness request to the coordinator and returns its request id.
///
/// `consumer` signs through `signer_seeds`; `remaining_accounts` are handed
/// to the coordinator untouched.
pub fn request_random_words<'a>(
    coordinator_program: &AccountInfo<'a>,
    consumer: &AccountInfo<'a>,
    raffle: &AccountInfo<'a>,
    remaining_accounts: &[AccountInfo<'a>],
    request: &RandomWordsRequest,
    signer_seeds: &[&[u8]],
) -> Result<u64, ProgramError> {
    let mut accounts = vec![
        AccountMeta::new_readonly(*consumer.key, true),
        AccountMeta::new_readonly(*raffle.key, false),
    ];
    accounts.extend(remaining_accounts.iter().map(|acc| AccountMeta {
        pubkey: *acc.key,
        is_signer: acc.is_signer,
        is_writable: acc.is_writable,
    }));

    let mut account_infos = vec![consumer.clone(), raffle.clone()];
    account_infos.extend_from_slice(remaining_accounts);
    account_infos.push(coordinator_program.clone());

    invoke_signed(
        &Instruction {
            program_id: *coordinator_program.key,
            accounts,
            data: request.pack()?,
        },
        &account_infos,
        &[signer_seeds],
    )?;

    let request_id = read_request_id(coordinator_program.key)?;
    msg!("Coordinator accepted randomness request {}", request_id);
    Ok(request_id)
}

fn read_request_id(coordinator_program: &Pubkey) -> Result<u64, ProgramError> {
    match get_return_data() {
        Some((program_id, data)) if program_id == *coordinator_program && data.len() >= 8 => {
            Ok(u64::from_le_bytes(*array_ref![data, 0, 8]))
        }
        _ => Err(RaffleError::MissingRequestId.into()),
    }
}

/// Maps a random word onto an entry index
pub fn winner_index(random_word: u64, players: usize) -> usize {
    if players == 0 {
        return 0;
    }
    (random_word % players as u64) as usize
}
