//! Display labels for mints: the fixed allow-list of widely held tokens and
//! the deterministic fallback derived from the mint address.

/// Characters kept from each end of a mint when synthesizing labels
const AFFIX_LEN: usize = 4;

/// Label pair pinned for a well-known mint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownMint {
    pub mint: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
}

/// Mints whose labels override every other source
pub const KNOWN_MINTS: [KnownMint; 7] = [
    KnownMint {
        mint: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
        symbol: "USDC",
        name: "USD Coin",
    },
    KnownMint {
        mint: "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB",
        symbol: "USDT",
        name: "Tether USD",
    },
    KnownMint {
        mint: "So11111111111111111111111111111111111111112",
        symbol: "SOL",
        name: "Wrapped SOL",
    },
    KnownMint {
        mint: "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263",
        symbol: "BONK",
        name: "Bonk",
    },
    KnownMint {
        mint: "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN",
        symbol: "JUP",
        name: "Jupiter",
    },
    KnownMint {
        mint: "EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm",
        symbol: "WIF",
        name: "dogwifhat",
    },
    KnownMint {
        mint: "mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So",
        symbol: "mSOL",
        name: "Marinade staked SOL",
    },
];

pub fn known_mint(mint: &str) -> Option<&'static KnownMint> {
    KNOWN_MINTS.iter().find(|known| known.mint == mint)
}

/// First characters of the mint, uppercased
pub fn synthesize_symbol(mint: &str) -> String {
    mint.chars().take(AFFIX_LEN).collect::<String>().to_uppercase()
}

/// `"ABCD...WXYZ"`, or the whole mint when it is too short to abbreviate
pub fn synthesize_name(mint: &str) -> String {
    let chars: Vec<char> = mint.chars().collect();
    if chars.len() <= AFFIX_LEN * 2 {
        return mint.to_string();
    }
    let prefix: String = chars[..AFFIX_LEN].iter().collect();
    let suffix: String = chars[chars.len() - AFFIX_LEN..].iter().collect();
    format!("{}...{}", prefix, suffix)
}
