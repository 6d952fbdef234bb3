use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use incinerator_chain::config::{
    API_KEY_ENV, DEFAULT_API_KEY, DEFAULT_INDEXER_URL, DEFAULT_RPC_URL, INDEXER_URL_ENV,
    RPC_URL_ENV,
};
use incinerator_chain::{ChainConfig, ChainGateway, Commitment, Pubkey, SolanaGateway};
use incinerator_core::ledger::ASH_PER_SOL;
use incinerator_core::{reward_for, ClaimProgress, InventoryResolver, ResolverOptions};
use incinerator_types::{lamports_to_sol, Decimal};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Inspect token inventories and burn rewards", long_about = None)]
struct Cli {
    #[command(flatten)]
    chain: ChainArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ChainArgs {
    /// JSON-RPC endpoint of the chain node
    #[arg(long, env = RPC_URL_ENV, default_value = DEFAULT_RPC_URL)]
    rpc_url: String,

    /// Base URL of the token indexer
    #[arg(long, env = INDEXER_URL_ENV, default_value = DEFAULT_INDEXER_URL)]
    indexer_url: String,

    /// API key sent to the indexer and the node
    #[arg(long, env = API_KEY_ENV, default_value = DEFAULT_API_KEY, hide_env_values = true)]
    api_key: String,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Commitment level (processed, confirmed, finalized)
    #[arg(long, default_value = "confirmed")]
    commitment: String,
}

impl ChainArgs {
    fn into_config(self) -> Result<ChainConfig> {
        let commitment = Commitment::parse(&self.commitment)
            .ok_or_else(|| anyhow!("Unknown commitment level: {}", self.commitment))?;

        Ok(ChainConfig {
            rpc_url: self.rpc_url,
            indexer_url: self.indexer_url,
            api_key: self.api_key,
            request_timeout_seconds: self.timeout,
            commitment,
            ..ChainConfig::default()
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the SOL balance of an account
    Balance {
        /// Account address (base58)
        address: String,
    },

    /// List the fungible tokens held by an account
    Inventory {
        /// Account address (base58)
        address: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Skip the metadata lookup for unlabeled tokens
        #[arg(long)]
        no_metadata: bool,
    },

    /// Show the ASH a burn of AMOUNT tokens would grant
    Quote {
        /// Token amount in display units
        amount: String,

        /// ASH already earned, for claim progress
        #[arg(long, default_value_t = 0)]
        earned: u64,
    },
}

fn parse_address(address: &str) -> Result<Pubkey> {
    Pubkey::from_str(address).with_context(|| format!("Invalid account address: {}", address))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Balance { address } => {
            let owner = parse_address(&address)?;
            let gateway = SolanaGateway::new(&cli.chain.into_config()?)
                .context("Failed to create gateway")?;

            let lamports = gateway
                .get_account_balance(&owner)
                .await
                .context("Failed to fetch balance")?;

            println!("{} SOL ({} lamports)", lamports_to_sol(lamports), lamports);
        }

        Commands::Inventory {
            address,
            json,
            no_metadata,
        } => {
            let owner = parse_address(&address)?;
            let gateway = SolanaGateway::new(&cli.chain.into_config()?)
                .context("Failed to create gateway")?;
            let resolver = InventoryResolver::new(
                Arc::new(gateway),
                ResolverOptions {
                    enrich_metadata: !no_metadata,
                },
            );

            let holdings = resolver.resolve(&owner).await.context("Failed to resolve inventory")?;
            debug!(count = holdings.len(), "Inventory resolved");

            if json {
                println!("{}", serde_json::to_string_pretty(&holdings)?);
            } else if holdings.is_empty() {
                println!("No tokens found for {}", owner);
            } else {
                println!("{:<10} {:<24} {:>24}  {}", "SYMBOL", "NAME", "AMOUNT", "MINT");
                for holding in &holdings {
                    println!(
                        "{:<10} {:<24} {:>24}  {}",
                        holding.symbol,
                        holding.display_name,
                        holding.display_amount().to_string(),
                        holding.mint_address
                    );
                }
            }
        }

        Commands::Quote { amount, earned } => {
            let amount = Decimal::from_str(amount.trim())
                .with_context(|| format!("Invalid amount: {}", amount))?;
            if amount <= Decimal::ZERO {
                return Err(anyhow!("Amount must be greater than zero"));
            }

            let reward = reward_for(amount);
            let progress = ClaimProgress::for_total(earned.saturating_add(reward));

            println!("Burning {} tokens grants {} ASH", amount, reward);
            println!(
                "{} SOL claimable, {} ASH until next SOL claim ({} ASH per SOL)",
                progress.claimable_sol, progress.ash_until_next, ASH_PER_SOL
            );
        }
    }

    Ok(())
}
