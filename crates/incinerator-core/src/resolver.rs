/*!
 * Token inventory reconciliation.
 *
 * Holdings are resolved through a fixed sequence of stages: indexer
 * balances, node fallback, metadata enrichment, label synthesis, known-mint
 * override and deduplication. Only the first two stages touch the network
 * for balances; the rest are pure transformations keyed by mint address.
 */

use std::collections::HashMap;
use std::sync::Arc;

use incinerator_chain::{
    ChainGateway, ChainResult, IndexedToken, Pubkey, TokenAccountBalance, TokenMetadata,
};
use incinerator_types::{HoldingSource, TokenHolding, MAX_DECIMALS};
use tracing::{debug, info, warn};

use crate::config::ResolverOptions;
use crate::names::{known_mint, synthesize_name, synthesize_symbol};

/// Holding whose labels may still be missing
#[derive(Debug, Clone)]
struct Candidate {
    mint: String,
    token_account: Option<String>,
    raw_amount: u64,
    decimals: u8,
    symbol: Option<String>,
    name: Option<String>,
    icon_uri: Option<String>,
    source: HoldingSource,
}

impl Candidate {
    fn is_unlabeled(&self) -> bool {
        self.symbol.is_none() || self.name.is_none()
    }
}

/// Resolves the fungible holdings of an account
pub struct InventoryResolver {
    gateway: Arc<dyn ChainGateway>,
    options: ResolverOptions,
}

impl InventoryResolver {
    pub fn new(gateway: Arc<dyn ChainGateway>, options: ResolverOptions) -> Self {
        Self { gateway, options }
    }

    /// Current holdings of `owner`, at most one per mint, all with a positive
    /// amount.
    ///
    /// Fails only when the node fallback is needed and fails as well.
    pub async fn resolve(&self, owner: &Pubkey) -> ChainResult<Vec<TokenHolding>> {
        let mut candidates = match self.gateway.fetch_indexed_balances(owner).await {
            Ok(tokens) => {
                let candidates = from_indexed(tokens);
                if candidates.is_empty() {
                    debug!(%owner, "Indexer reported no positive balances, querying node");
                    self.from_node(owner).await?
                } else {
                    candidates
                }
            }
            Err(e) => {
                warn!(%owner, "Indexer unavailable, querying node: {}", e);
                self.from_node(owner).await?
            }
        };

        if self.options.enrich_metadata {
            self.enrich(&mut candidates).await;
        }

        let holdings = dedup(apply_known_mints(synthesize(candidates)));
        info!(%owner, count = holdings.len(), "Resolved inventory");
        Ok(holdings)
    }

    async fn from_node(&self, owner: &Pubkey) -> ChainResult<Vec<Candidate>> {
        let accounts = self.gateway.list_token_accounts(owner).await?;
        Ok(from_accounts(accounts))
    }

    /// Fill missing labels from the metadata service. Failures are logged and
    /// leave the candidates untouched.
    async fn enrich(&self, candidates: &mut [Candidate]) {
        let mut mints: Vec<String> = Vec::new();
        for candidate in candidates.iter() {
            if candidate.is_unlabeled()
                && known_mint(&candidate.mint).is_none()
                && !mints.contains(&candidate.mint)
            {
                mints.push(candidate.mint.clone());
            }
        }
        if mints.is_empty() {
            return;
        }

        match self.gateway.fetch_token_metadata(&mints).await {
            Ok(metadata) => {
                debug!(
                    requested = mints.len(),
                    received = metadata.len(),
                    "Merging token metadata"
                );
                apply_metadata(candidates, metadata);
            }
            Err(e) => warn!(count = mints.len(), "Token metadata lookup failed: {}", e),
        }
    }
}

/// Entries without a mint cannot be labeled or burned
fn is_usable(mint: &str, raw_amount: u64, decimals: u8) -> bool {
    !mint.trim().is_empty() && raw_amount > 0 && decimals <= MAX_DECIMALS
}

/// Indexers sometimes return empty strings for absent labels
fn label(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn from_indexed(tokens: Vec<IndexedToken>) -> Vec<Candidate> {
    tokens
        .into_iter()
        .filter(|token| is_usable(&token.mint, token.amount, token.decimals))
        .map(|token| Candidate {
            mint: token.mint,
            token_account: token.token_account,
            raw_amount: token.amount,
            decimals: token.decimals,
            symbol: label(token.symbol),
            name: label(token.name),
            icon_uri: label(token.logo_uri),
            source: HoldingSource::Indexer,
        })
        .collect()
}

fn from_accounts(accounts: Vec<TokenAccountBalance>) -> Vec<Candidate> {
    accounts
        .into_iter()
        .filter(|account| is_usable(&account.mint, account.raw_amount, account.decimals))
        .map(|account| Candidate {
            mint: account.mint,
            token_account: Some(account.pubkey),
            raw_amount: account.raw_amount,
            decimals: account.decimals,
            symbol: None,
            name: None,
            icon_uri: None,
            source: HoldingSource::Rpc,
        })
        .collect()
}

/// Fill labels that are still missing; labels already present win
fn apply_metadata(candidates: &mut [Candidate], metadata: Vec<TokenMetadata>) {
    let by_mint: HashMap<String, TokenMetadata> =
        metadata.into_iter().map(|m| (m.mint.clone(), m)).collect();

    for candidate in candidates.iter_mut() {
        let Some(meta) = by_mint.get(&candidate.mint) else {
            continue;
        };
        if candidate.symbol.is_none() {
            candidate.symbol = label(meta.symbol.clone());
        }
        if candidate.name.is_none() {
            candidate.name = label(meta.name.clone());
        }
        if candidate.icon_uri.is_none() {
            candidate.icon_uri = label(meta.logo_uri.clone());
        }
    }
}

fn synthesize(candidates: Vec<Candidate>) -> Vec<TokenHolding> {
    candidates
        .into_iter()
        .map(|c| TokenHolding {
            symbol: c.symbol.unwrap_or_else(|| synthesize_symbol(&c.mint)),
            display_name: c.name.unwrap_or_else(|| synthesize_name(&c.mint)),
            mint_address: c.mint,
            token_account: c.token_account,
            raw_amount: c.raw_amount,
            decimals: c.decimals,
            icon_uri: c.icon_uri,
            source: c.source,
        })
        .collect()
}

fn apply_known_mints(mut holdings: Vec<TokenHolding>) -> Vec<TokenHolding> {
    for holding in holdings.iter_mut() {
        if let Some(known) = known_mint(&holding.mint_address) {
            holding.symbol = known.symbol.to_string();
            holding.display_name = known.name.to_string();
        }
    }
    holdings
}

/// One holding per mint, the largest balance winning; mints keep the order in
/// which they were first seen
fn dedup(holdings: Vec<TokenHolding>) -> Vec<TokenHolding> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<TokenHolding> = Vec::with_capacity(holdings.len());

    for holding in holdings {
        match positions.get(&holding.mint_address) {
            Some(&index) => {
                if holding.raw_amount > unique[index].raw_amount {
                    unique[index] = holding;
                }
            }
            None => {
                positions.insert(holding.mint_address.clone(), unique.len());
                unique.push(holding);
            }
        }
    }
    unique
}
