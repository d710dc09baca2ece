// Shared harness: raffle program plus a mock VRF coordinator
#![allow(dead_code)]

use base64::{engine::general_purpose, Engine as _};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    instruction::{AccountMeta, Instruction},
    msg,
    program::{invoke_signed, set_return_data},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_instruction,
};
use solana_program_test::*;
use solana_sdk::{
    account::Account,
    signature::{Keypair, Signer},
    transaction::Transaction,
};

use vrf_raffle::{
    process_instruction,
    raffle_event::RaffleEvent,
    raffle_instruction::{self, RaffleInstruction},
    raffle_state::{Raffle, RaffleConfig},
    utils,
    vrf::{self, RandomWordsRequest},
};

/// Subscription the mock coordinator treats as funded
pub const FUNDED_SUBSCRIPTION: u64 = 7;
/// Error the mock coordinator raises for any other subscription
pub const SUBSCRIPTION_NOT_FUNDED: u32 = 100;
/// 0.001 SOL
pub const ENTRANCE_FEE: u64 = 1_000_000;

const COORDINATOR_STATE_LEN: usize = 256;

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct PendingRequest {
    pub request_id: u64,
    pub raffle: Pubkey,
    pub request: RandomWordsRequest,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct MockCoordinatorState {
    pub next_request_id: u64,
    pub funded_subscription: u64,
    pub last_request: Option<PendingRequest>,
}

/// Test-only instruction that makes the mock deliver randomness
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug)]
pub struct MockFulfill {
    pub request_id: u64,
    pub random_words: Vec<u64>,
}

pub fn process_mock_coordinator(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    if let Ok(request) = RandomWordsRequest::unpack(instruction_data) {
        return mock_request(accounts, request);
    }
    let fulfill = MockFulfill::try_from_slice(instruction_data)
        .map_err(|_| ProgramError::InvalidInstructionData)?;
    mock_fulfill(program_id, accounts, fulfill)
}

fn mock_request(accounts: &[AccountInfo], request: RandomWordsRequest) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();
    let consumer_info = next_account_info(account_info_iter)?;
    let raffle_info = next_account_info(account_info_iter)?;
    let state_info = next_account_info(account_info_iter)?;

    if !consumer_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    let mut state = {
        let data = state_info.data.borrow();
        MockCoordinatorState::deserialize(&mut &data[..])
            .map_err(|_| ProgramError::InvalidAccountData)?
    };
    if request.sub_id != state.funded_subscription {
        msg!("Subscription {} not funded", request.sub_id);
        return Err(ProgramError::Custom(SUBSCRIPTION_NOT_FUNDED));
    }

    let request_id = state.next_request_id;
    state.next_request_id += 1;
    state.last_request = Some(PendingRequest {
        request_id,
        raffle: *raffle_info.key,
        request,
    });
    {
        let mut data = state_info.data.borrow_mut();
        let mut writer: &mut [u8] = &mut data[..];
        state
            .serialize(&mut writer)
            .map_err(|_| ProgramError::AccountDataTooSmall)?;
    }

    set_return_data(&request_id.to_le_bytes());
    Ok(())
}

fn mock_fulfill(program_id: &Pubkey, accounts: &[AccountInfo], fulfill: MockFulfill) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();
    let authority_info = next_account_info(account_info_iter)?;
    let raffle_program_info = next_account_info(account_info_iter)?;
    let raffle_info = next_account_info(account_info_iter)?;
    let vault_info = next_account_info(account_info_iter)?;
    let winner_info = next_account_info(account_info_iter)?;

    let (authority, bump) = vrf::coordinator_authority(program_id);
    if *authority_info.key != authority {
        return Err(ProgramError::InvalidArgument);
    }

    let ix = raffle_instruction::fulfill_random_words(
        raffle_program_info.key,
        &authority,
        raffle_info.key,
        winner_info.key,
        fulfill.request_id,
        fulfill.random_words,
    )?;

    invoke_signed(
        &ix,
        &[
            authority_info.clone(),
            raffle_info.clone(),
            vault_info.clone(),
            winner_info.clone(),
            raffle_program_info.clone(),
        ],
        &[&[vrf::COORDINATOR_AUTHORITY_SEED, &[bump]]],
    )
}

pub struct TestRaffle {
    pub context: ProgramTestContext,
    pub program_id: Pubkey,
    pub coordinator_id: Pubkey,
    pub coordinator_state: Pubkey,
    pub raffle: Keypair,
    /// Fills the opaque payloads so repeated calls are distinct transactions
    nonce: u64,
}

pub fn test_config(coordinator_id: Pubkey) -> RaffleConfig {
    RaffleConfig {
        entrance_fee: ENTRANCE_FEE,
        interval: 0,
        key_hash: [9u8; 32],
        subscription_id: FUNDED_SUBSCRIPTION,
        vrf_coordinator: coordinator_id,
        ..RaffleConfig::default()
    }
}

/// Starts a validator with both programs and an initialized raffle
pub async fn setup(customize: impl FnOnce(&mut RaffleConfig)) -> TestRaffle {
    let program_id = Pubkey::new_unique();
    let coordinator_id = Pubkey::new_unique();
    let coordinator_state = Pubkey::new_unique();

    let mut program_test = ProgramTest::new(
        "vrf_raffle",
        program_id,
        processor!(process_instruction),
    );
    program_test.add_program(
        "mock_vrf_coordinator",
        coordinator_id,
        processor!(process_mock_coordinator),
    );

    let mut data = vec![0u8; COORDINATOR_STATE_LEN];
    let state = MockCoordinatorState {
        next_request_id: 1,
        funded_subscription: FUNDED_SUBSCRIPTION,
        last_request: None,
    };
    let mut writer: &mut [u8] = &mut data[..];
    state.serialize(&mut writer).unwrap();
    program_test.add_account(
        coordinator_state,
        Account {
            lamports: 1_000_000_000,
            data,
            owner: coordinator_id,
            executable: false,
            rent_epoch: 0,
        },
    );

    let mut context = program_test.start_with_context().await;

    let mut config = test_config(coordinator_id);
    customize(&mut config);

    let raffle = Keypair::new();
    let ix = raffle_instruction::initialize_raffle(
        &program_id,
        &context.payer.pubkey(),
        &raffle.pubkey(),
        config,
    )
    .unwrap();
    send(&mut context, &[ix], &[&raffle]).await.unwrap();

    TestRaffle {
        context,
        program_id,
        coordinator_id,
        coordinator_state,
        raffle,
        nonce: 0,
    }
}

/// Signs with the payer plus `signers`; errors come back as their debug text
pub async fn send(
    context: &mut ProgramTestContext,
    instructions: &[Instruction],
    signers: &[&Keypair],
) -> Result<(), String> {
    let mut transaction =
        Transaction::new_with_payer(instructions, Some(&context.payer.pubkey()));
    let mut all_signers: Vec<&Keypair> = vec![&context.payer];
    all_signers.extend_from_slice(signers);
    transaction.sign(&all_signers, context.last_blockhash);

    context
        .banks_client
        .process_transaction(transaction)
        .await
        .map_err(|e| format!("{:?}", e))
}

impl TestRaffle {
    pub fn vault(&self) -> Pubkey {
        utils::find_vault_address(&self.program_id, &self.raffle.pubkey()).0
    }

    pub async fn raffle_data(&mut self) -> Raffle {
        let account = self
            .context
            .banks_client
            .get_account(self.raffle.pubkey())
            .await
            .unwrap()
            .unwrap();
        Raffle::unpack(&account.data).unwrap()
    }

    pub async fn coordinator_data(&mut self) -> MockCoordinatorState {
        let account = self
            .context
            .banks_client
            .get_account(self.coordinator_state)
            .await
            .unwrap()
            .unwrap();
        MockCoordinatorState::deserialize(&mut &account.data[..]).unwrap()
    }

    pub async fn balance(&mut self, key: Pubkey) -> u64 {
        self.context.banks_client.get_balance(key).await.unwrap()
    }

    /// Pool held by the vault, excluding its rent reserve
    pub async fn pool(&mut self) -> u64 {
        let rent = self.context.banks_client.get_rent().await.unwrap();
        let vault = self.vault();
        self.balance(vault).await - rent.minimum_balance(0)
    }

    /// Creates a player holding 1 SOL
    pub async fn funded_player(&mut self) -> Keypair {
        let player = Keypair::new();
        let ix = system_instruction::transfer(
            &self.context.payer.pubkey(),
            &player.pubkey(),
            1_000_000_000,
        );
        send(&mut self.context, &[ix], &[]).await.unwrap();
        player
    }

    pub fn enter_ix(&self, player: &Keypair, amount: u64) -> Instruction {
        raffle_instruction::enter_raffle(
            &self.program_id,
            &player.pubkey(),
            &self.raffle.pubkey(),
            amount,
        )
        .unwrap()
    }

    pub async fn enter(&mut self, player: &Keypair, amount: u64) -> Result<(), String> {
        let ix = self.enter_ix(player, amount);
        send(&mut self.context, &[ix], &[player]).await
    }

    fn next_nonce(&mut self) -> Vec<u8> {
        self.nonce += 1;
        self.nonce.to_le_bytes().to_vec()
    }

    pub fn check_upkeep_ix(&mut self) -> Instruction {
        let mut ix =
            raffle_instruction::check_upkeep(&self.program_id, &self.raffle.pubkey()).unwrap();
        ix.data = RaffleInstruction::CheckUpkeep {
            check_data: self.next_nonce(),
        }
        .pack()
        .unwrap();
        ix
    }

    pub async fn check_upkeep(&mut self) -> Result<(), String> {
        let ix = self.check_upkeep_ix();
        send(&mut self.context, &[ix], &[]).await
    }

    pub fn perform_upkeep_ix(&mut self) -> Instruction {
        let mut ix = raffle_instruction::perform_upkeep(
            &self.program_id,
            &self.context.payer.pubkey(),
            &self.raffle.pubkey(),
            &self.coordinator_id,
            &[AccountMeta::new(self.coordinator_state, false)],
        )
        .unwrap();
        ix.data = RaffleInstruction::PerformUpkeep {
            perform_data: self.next_nonce(),
        }
        .pack()
        .unwrap();
        ix
    }

    pub async fn perform_upkeep(&mut self) -> Result<(), String> {
        let ix = self.perform_upkeep_ix();
        send(&mut self.context, &[ix], &[]).await
    }

    /// Mock coordinator instruction delivering `random_words` and paying `winner`
    pub fn fulfill_ix(&self, request_id: u64, random_words: Vec<u64>, winner: Pubkey) -> Instruction {
        let (authority, _) = vrf::coordinator_authority(&self.coordinator_id);
        let data = MockFulfill {
            request_id,
            random_words,
        }
        .try_to_vec()
        .unwrap();
        Instruction {
            program_id: self.coordinator_id,
            accounts: vec![
                AccountMeta::new_readonly(authority, false),
                AccountMeta::new_readonly(self.program_id, false),
                AccountMeta::new(self.raffle.pubkey(), false),
                AccountMeta::new(self.vault(), false),
                AccountMeta::new(winner, false),
            ],
            data,
        }
    }

    pub async fn fulfill(
        &mut self,
        request_id: u64,
        random_words: Vec<u64>,
        winner: Pubkey,
    ) -> Result<(), String> {
        let ix = self.fulfill_ix(request_id, random_words, winner);
        send(&mut self.context, &[ix], &[]).await
    }
}

/// Runs the instructions without committing them and returns the program logs
pub async fn simulate_logs(
    context: &mut ProgramTestContext,
    instructions: &[Instruction],
    signers: &[&Keypair],
) -> Vec<String> {
    let mut transaction =
        Transaction::new_with_payer(instructions, Some(&context.payer.pubkey()));
    let mut all_signers: Vec<&Keypair> = vec![&context.payer];
    all_signers.extend_from_slice(signers);
    transaction.sign(&all_signers, context.last_blockhash);

    context
        .banks_client
        .simulate_transaction(transaction)
        .await
        .unwrap()
        .simulation_details
        .unwrap()
        .logs
}

/// Decodes every `Program data:` line that carries a raffle event
pub fn raffle_events(logs: &[String]) -> Vec<RaffleEvent> {
    logs.iter()
        .filter_map(|line| line.strip_prefix("Program data: "))
        .filter_map(|encoded| general_purpose::STANDARD.decode(encoded.trim()).ok())
        .filter_map(|data| RaffleEvent::try_from_slice(&data).ok())
        .collect()
}

/// Eligibility reported by a `CheckUpkeep` log line
pub fn upkeep_needed(logs: &[String]) -> Option<bool> {
    logs.iter().find_map(|line| {
        let rest = line.strip_prefix("Program log: Upkeep needed: ")?;
        if rest.starts_with("true") {
            Some(true)
        } else if rest.starts_with("false") {
            Some(false)
        } else {
            None
        }
    })
}
