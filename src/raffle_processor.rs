use borsh::BorshSerialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::ProgramError,
    program_pack::IsInitialized,
    pubkey::Pubkey,
    system_instruction,
    sysvar::{clock::Clock, rent::Rent, Sysvar},
};

use crate::raffle_error::RaffleError;
use crate::raffle_event::RaffleEvent;
use crate::raffle_instruction::RaffleInstruction;
use crate::raffle_state::{Raffle, RaffleConfig};
use crate::utils::{self, VAULT_SEED};
use crate::vrf::{self, ExtraArgs, RandomWordsRequest, RandomnessConsumer};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::InitializeRaffle { config } => {
                msg!("Instruction: Initialize Raffle");
                Self::process_initialize_raffle(accounts, config, program_id)
            }
            RaffleInstruction::EnterRaffle { amount } => {
                msg!("Instruction: Enter Raffle");
                Self::process_enter_raffle(accounts, amount, program_id)
            }
            RaffleInstruction::CheckUpkeep { .. } => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(accounts, program_id)
            }
            RaffleInstruction::PerformUpkeep { .. } => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(accounts, program_id)
            }
            RaffleInstruction::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                msg!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(accounts, request_id, &random_words, program_id)
            }
        }
    }

    fn process_initialize_raffle(
        accounts: &[AccountInfo],
        config: RaffleConfig,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !owner_info.is_signer || !raffle_info.is_signer {
            msg!("Owner and raffle account must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        if raffle_info.owner == program_id {
            msg!("Raffle account is already initialized");
            return Err(ProgramError::AccountAlreadyInitialized);
        }

        config.validate()?;

        let (vault_key, vault_bump) = utils::find_vault_address(program_id, raffle_info.key);
        if *vault_info.key != vault_key {
            return Err(RaffleError::InvalidVault.into());
        }

        let rent = Rent::get()?;
        let space = Raffle::space_for(0);

        invoke(
            &system_instruction::create_account(
                owner_info.key,
                raffle_info.key,
                rent.minimum_balance(space),
                space as u64,
                program_id,
            ),
            &[
                owner_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        // Zero-data vault owned by the program so payouts can debit it directly
        invoke_signed(
            &system_instruction::create_account(
                owner_info.key,
                vault_info.key,
                rent.minimum_balance(0),
                0,
                program_id,
            ),
            &[
                owner_info.clone(),
                vault_info.clone(),
                system_program_info.clone(),
            ],
            &[&[VAULT_SEED, raffle_info.key.as_ref(), &[vault_bump]]],
        )?;

        let now = Clock::get()?.unix_timestamp;
        let raffle = Raffle::new(*owner_info.key, config, vault_bump, now);
        raffle.pack_into(&mut raffle_info.data.borrow_mut())?;

        msg!(
            "Raffle initialized: EntranceFee={}, Interval={}s, Coordinator={}, Subscription={}",
            raffle.entrance_fee(),
            raffle.interval(),
            raffle.vrf_coordinator(),
            raffle.subscription_id()
        );
        Ok(())
    }

    fn process_enter_raffle(
        accounts: &[AccountInfo],
        amount: u64,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !player_info.is_signer {
            msg!("Player must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut raffle = Self::load_raffle(program_id, raffle_info, vault_info)?;
        raffle.enter(*player_info.key, amount)?;

        invoke(
            &system_instruction::transfer(player_info.key, vault_info.key, amount),
            &[
                player_info.clone(),
                vault_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        // Grow the player list by one slot, the player covers the extra rent
        let required = Raffle::space_for(raffle.number_of_players() as usize);
        if raffle_info.data_len() < required {
            let rent = Rent::get()?;
            let top_up = rent
                .minimum_balance(required)
                .saturating_sub(raffle_info.lamports());
            if top_up > 0 {
                invoke(
                    &system_instruction::transfer(player_info.key, raffle_info.key, top_up),
                    &[
                        player_info.clone(),
                        raffle_info.clone(),
                        system_program_info.clone(),
                    ],
                )?;
            }
            raffle_info.realloc(required, false)?;
        }

        raffle.pack_into(&mut raffle_info.data.borrow_mut())?;

        msg!(
            "Entry {} paid {} lamports",
            raffle.number_of_players(),
            amount
        );
        RaffleEvent::RaffleEntered {
            player: *player_info.key,
        }
        .emit();
        Ok(())
    }

    fn process_check_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let raffle_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;

        let raffle = Self::load_raffle(program_id, raffle_info, vault_info)?;
        let balance = utils::vault_balance(vault_info, &Rent::get()?);
        let now = Clock::get()?.unix_timestamp;

        let check = raffle.check_upkeep(now, balance);
        msg!(
            "Upkeep needed: {} (balance={}, players={}, state={})",
            check.upkeep_needed,
            balance,
            raffle.number_of_players(),
            raffle.raffle_state()
        );

        let data = check
            .try_to_vec()
            .map_err(|_| ProgramError::InvalidAccountData)?;
        set_return_data(&data);
        Ok(())
    }

    /// Closes entries and asks the coordinator for randomness.
    ///
    /// The state flip is written back before the coordinator is called, so
    /// entries are already refused while the request is in flight.
    fn process_perform_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let coordinator_program_info = next_account_info(account_info_iter)?;
        let coordinator_accounts = account_info_iter.as_slice();

        if !caller_info.is_signer {
            msg!("Initiator must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut raffle = Self::load_raffle(program_id, raffle_info, vault_info)?;

        if *coordinator_program_info.key != raffle.vrf_coordinator() {
            msg!("Coordinator program does not match the raffle configuration");
            return Err(ProgramError::IncorrectProgramId);
        }

        let balance = utils::vault_balance(vault_info, &Rent::get()?);
        let now = Clock::get()?.unix_timestamp;

        raffle.begin_draw(now, balance)?;
        raffle.pack_into(&mut raffle_info.data.borrow_mut())?;

        let config = raffle.config();
        let request = RandomWordsRequest {
            key_hash: config.key_hash,
            sub_id: config.subscription_id,
            request_confirmations: config.request_confirmations,
            callback_gas_limit: config.callback_gas_limit,
            num_words: config.num_words,
            extra_args: ExtraArgs {
                native_payment: config.native_payment,
            },
        };

        let bump = [raffle.vault_bump()];
        let request_id = vrf::request_random_words(
            coordinator_program_info,
            vault_info,
            raffle_info,
            coordinator_accounts,
            &request,
            &[VAULT_SEED, raffle_info.key.as_ref(), &bump],
        )?;

        raffle.record_request(request_id);
        raffle.pack_into(&mut raffle_info.data.borrow_mut())?;

        msg!(
            "Drawing among {} entries for a pool of {} lamports",
            raffle.number_of_players(),
            balance
        );
        RaffleEvent::RequestedRaffleWinner { request_id }.emit();
        Ok(())
    }

    fn process_fulfill_random_words(
        accounts: &[AccountInfo],
        request_id: u64,
        random_words: &[u64],
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        let raffle = Self::load_raffle(program_id, raffle_info, vault_info)?;
        let mut fulfillment = Fulfillment {
            raffle,
            raffle_info,
            vault_info,
            winner_info,
        };

        vrf::raw_fulfill_random_words(&mut fulfillment, authority_info, request_id, random_words)
    }

    fn load_raffle(
        program_id: &Pubkey,
        raffle_info: &AccountInfo,
        vault_info: &AccountInfo,
    ) -> Result<Raffle, ProgramError> {
        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by the program");
            return Err(ProgramError::IncorrectProgramId);
        }

        let raffle = Raffle::unpack(&raffle_info.data.borrow())?;
        if !raffle.is_initialized() {
            return Err(ProgramError::UninitializedAccount);
        }

        utils::check_vault_address(program_id, raffle_info.key, vault_info.key, raffle.vault_bump())?;
        Ok(raffle)
    }
}

/// Accounts of one coordinator callback
struct Fulfillment<'a, 'b> {
    raffle: Raffle,
    raffle_info: &'b AccountInfo<'a>,
    vault_info: &'b AccountInfo<'a>,
    winner_info: &'b AccountInfo<'a>,
}

impl<'a, 'b> RandomnessConsumer for Fulfillment<'a, 'b> {
    fn vrf_coordinator(&self) -> Pubkey {
        self.raffle.vrf_coordinator()
    }

    fn fulfill_random_words(&mut self, request_id: u64, random_words: &[u64]) -> ProgramResult {
        let now = Clock::get()?.unix_timestamp;
        let rent = Rent::get()?;
        let raffle_info = self.raffle_info;
        let vault_info = self.vault_info;
        let winner_info = self.winner_info;

        let winner = self.raffle.settle(
            request_id,
            random_words,
            now,
            |reset: &Raffle, winner: &Pubkey| -> ProgramResult {
                if winner != winner_info.key {
                    return Err(RaffleError::WinnerAccountMismatch {
                        expected: *winner,
                        received: *winner_info.key,
                    }
                    .into());
                }

                // Round is reset in account data before any lamports move
                reset.pack_into(&mut raffle_info.data.borrow_mut())?;
                RaffleEvent::WinnerPicked { winner: *winner }.emit();

                let prize = utils::vault_balance(vault_info, &rent);
                utils::transfer_lamports(vault_info, winner_info, prize)?;
                msg!("Paid {} lamports to {}", prize, winner);
                Ok(())
            },
        )?;

        msg!("Round closed, next round started at {}", now);
        msg!("Winner: {}", winner);
        Ok(())
    }
}
