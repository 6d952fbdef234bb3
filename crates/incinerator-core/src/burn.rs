/*!
 * Burn validation and submission.
 *
 * A request is checked against the current inventory before anything is
 * sent; only a fully valid request reaches the gateway. Every attempt ends
 * in exactly one `BurnOutcome`.
 */

use std::str::FromStr;
use std::sync::Arc;

use incinerator_chain::{ChainGateway, Instruction, Pubkey, WalletSigner};
use incinerator_types::{BurnOutcome, BurnRequest, Decimal, TokenHolding, MAX_DECIMALS};
use rust_decimal::prelude::ToPrimitive;
use spl_associated_token_account::get_associated_token_address;
use tracing::{info, warn};

use crate::error::{BurnError, BurnResult};

/// ASH granted per million tokens burned
pub const REWARD_PER_MILLION: u64 = 1000;

const REWARD_UNIT: u64 = 1_000_000;

/// Reward for burning `amount` display units: `floor(amount / 1e6 * 1000)`.
///
/// Computed in whole tokens, since `floor(a / n) == floor(floor(a) / n)` for
/// integer `n`; dividing the decimal first would round at 28 digits.
pub fn reward_for(amount: Decimal) -> u64 {
    let whole = match amount.floor().to_u64() {
        Some(whole) => u128::from(whole),
        None => return 0,
    };
    let reward = whole * u128::from(REWARD_PER_MILLION) / u128::from(REWARD_UNIT);
    u64::try_from(reward).unwrap_or(u64::MAX)
}

/// `floor(amount * 10^decimals)` as base units
pub fn to_raw_amount(amount: Decimal, decimals: u8) -> BurnResult<u64> {
    if decimals > MAX_DECIMALS {
        return Err(BurnError::Validation(format!("Unsupported token decimals: {}", decimals)));
    }
    let factor = Decimal::from_i128_with_scale(10i128.pow(u32::from(decimals)), 0);
    amount
        .checked_mul(factor)
        .and_then(|raw| raw.floor().to_u64())
        .ok_or_else(|| BurnError::Validation(format!("Amount {} is out of range", amount)))
}

/// A request that passed local validation
struct ValidatedBurn<'a> {
    holding: &'a TokenHolding,
    amount: Decimal,
    raw_amount: u64,
    owner: Pubkey,
}

/// Validates burn requests and submits them through the gateway
pub struct BurnSubmitter {
    gateway: Arc<dyn ChainGateway>,
}

impl BurnSubmitter {
    pub fn new(gateway: Arc<dyn ChainGateway>) -> Self {
        Self { gateway }
    }

    /// Burn `request.human_amount` of `request.mint_address`.
    ///
    /// Failures of any kind are reported in the outcome.
    pub async fn submit_burn(
        &self,
        request: &BurnRequest,
        inventory: &[TokenHolding],
        signer: &dyn WalletSigner,
    ) -> BurnOutcome {
        match self.try_burn(request, inventory, signer).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_validation() => {
                info!(
                    mint = %request.mint_address,
                    amount = %request.human_amount,
                    "Burn rejected: {}",
                    e
                );
                BurnOutcome::failed(request.mint_address.clone(), e.to_string())
            }
            Err(e) => {
                warn!(mint = %request.mint_address, "Burn failed: {}", e);
                BurnOutcome::failed_after_submission(request.mint_address.clone(), e.to_string())
            }
        }
    }

    async fn try_burn(
        &self,
        request: &BurnRequest,
        inventory: &[TokenHolding],
        signer: &dyn WalletSigner,
    ) -> BurnResult<BurnOutcome> {
        let burn = validate(request, inventory, signer)?;
        let instruction = burn_instruction(&burn)?;

        info!(
            mint = %burn.holding.mint_address,
            amount = %burn.amount,
            raw_amount = burn.raw_amount,
            "Submitting burn"
        );
        let signature = self.gateway.submit_and_confirm(&[instruction], signer).await?;

        let reward = reward_for(burn.amount);
        info!(%signature, reward, "Burn confirmed");
        Ok(BurnOutcome::succeeded(
            burn.holding.mint_address.clone(),
            signature.to_string(),
            burn.amount,
            reward,
        ))
    }
}

fn validate<'a>(
    request: &BurnRequest,
    inventory: &'a [TokenHolding],
    signer: &dyn WalletSigner,
) -> BurnResult<ValidatedBurn<'a>> {
    let holding = inventory
        .iter()
        .find(|h| h.mint_address == request.mint_address)
        .ok_or_else(|| {
            BurnError::Validation(format!(
                "Token {} is not in the inventory",
                request.mint_address
            ))
        })?;

    let amount = Decimal::from_str(request.human_amount.trim())
        .map_err(|_| {
            BurnError::Validation(format!("'{}' is not a valid amount", request.human_amount))
        })?;
    if amount <= Decimal::ZERO {
        return Err(BurnError::Validation("Amount must be greater than zero".to_string()));
    }
    if amount > holding.display_amount() {
        return Err(BurnError::Validation(format!(
            "Amount {} exceeds balance of {} {}",
            amount,
            holding.display_amount(),
            holding.symbol
        )));
    }

    let raw_amount = to_raw_amount(amount, holding.decimals)?;
    if raw_amount == 0 {
        return Err(BurnError::Validation(format!(
            "Amount {} is smaller than one base unit of {}",
            amount, holding.symbol
        )));
    }

    let owner = signer
        .public_key()
        .ok_or_else(|| BurnError::Validation("Wallet not connected".to_string()))?;

    Ok(ValidatedBurn {
        holding,
        amount,
        raw_amount,
        owner,
    })
}

/// `burn_checked` against the reported token account, or the owner's
/// associated token account when none was reported
fn burn_instruction(burn: &ValidatedBurn<'_>) -> BurnResult<Instruction> {
    let mint = parse_pubkey(&burn.holding.mint_address, "mint")?;
    let token_account = match &burn.holding.token_account {
        Some(account) => parse_pubkey(account, "token account")?,
        None => get_associated_token_address(&burn.owner, &mint),
    };

    spl_token::instruction::burn_checked(
        &spl_token::id(),
        &token_account,
        &mint,
        &burn.owner,
        &[],
        burn.raw_amount,
        burn.holding.decimals,
    )
    .map_err(|e| BurnError::Validation(format!("Cannot build burn instruction: {}", e)))
}

fn parse_pubkey(value: &str, what: &str) -> BurnResult<Pubkey> {
    Pubkey::from_str(value)
        .map_err(|_| BurnError::Validation(format!("Invalid {} address: {}", what, value)))
}
