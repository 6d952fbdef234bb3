use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Largest scale a display amount can carry.
pub const MAX_DECIMALS: u8 = 28;

/// Number of decimal places in one SOL expressed in lamports
const SOL_DECIMALS: u32 = 9;

/// Which resolution stage produced a holding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoldingSource {
    /// Third-party indexing service
    Indexer,
    /// Direct node query
    Rpc,
}

/// One fungible token owned by the connected account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHolding {
    /// Mint address, the dedup key of an inventory
    pub mint_address: String,

    /// Token account reported by the source, if any
    pub token_account: Option<String>,

    /// Balance in base units
    pub raw_amount: u64,

    /// Scaling factor of `raw_amount`
    pub decimals: u8,

    /// Short label, never empty
    pub symbol: String,

    /// Human-readable name, never empty
    pub display_name: String,

    /// Optional icon location
    pub icon_uri: Option<String>,

    /// Stage that produced this holding
    pub source: HoldingSource,
}

impl TokenHolding {
    /// `raw_amount / 10^decimals`, exact.
    ///
    /// Returns zero when `decimals` exceeds [`MAX_DECIMALS`], which keeps such
    /// holdings out of a resolved inventory.
    pub fn display_amount(&self) -> Decimal {
        scale_amount(self.raw_amount, self.decimals).unwrap_or(Decimal::ZERO)
    }

    /// Whether this holding may appear in a resolved inventory
    pub fn is_burnable(&self) -> bool {
        self.display_amount() > Decimal::ZERO
    }
}

/// Convert lamports into SOL
pub fn lamports_to_sol(lamports: u64) -> Decimal {
    Decimal::from_i128_with_scale(i128::from(lamports), SOL_DECIMALS)
}

fn scale_amount(raw: u64, decimals: u8) -> Option<Decimal> {
    if decimals > MAX_DECIMALS {
        return None;
    }
    Decimal::try_from_i128_with_scale(i128::from(raw), u32::from(decimals)).ok()
}
