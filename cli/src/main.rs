//! Bondworks CLI - local bonding-curve ledger simulator
//!
//! Drives the bond engine against a JSON state file: create bonds, queue
//! orders, advance the block clock and watch batches settle. Useful for
//! trying out curve parameters before deploying them anywhere real.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;

mod bonds;
mod chain;
mod config;
mod orders;
mod queries;
mod state;

use bonds::CurveArgs;
use config::Config;
use state::ChainState;

#[derive(Parser)]
#[command(name = "bondworks")]
#[command(about = "Bonding-curve ledger simulator", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the JSON chain-state file (overrides config)
    #[arg(short, long)]
    state: Option<PathBuf>,

    /// Address to act as (overrides config)
    #[arg(short, long)]
    from: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new bond
    Create {
        /// Bond token denom
        token: String,

        /// Human-readable name
        #[arg(long)]
        name: String,

        /// Description
        #[arg(long, default_value = "")]
        description: String,

        /// Curve function (power, sigmoid, swapper, augmented)
        #[arg(long)]
        function: String,

        /// Slope m (power/augmented)
        #[arg(long)]
        m: Option<String>,

        /// Exponent n, whole or fractional like 3/2 (power/augmented)
        #[arg(long)]
        n: Option<String>,

        /// Constant c (power/augmented: price floor, sigmoid: steepness)
        #[arg(long)]
        c: Option<String>,

        /// Sigmoid asymptote half-height a
        #[arg(long)]
        a: Option<String>,

        /// Sigmoid inflection supply b
        #[arg(long)]
        b: Option<String>,

        /// Reserve token denom(s); swapper takes exactly two
        #[arg(long = "reserve", required = true)]
        reserve_tokens: Vec<String>,

        /// Transaction fee percentage
        #[arg(long, default_value = "0")]
        tx_fee: String,

        /// Exit fee percentage, charged on sells on top of the tx fee
        #[arg(long, default_value = "0")]
        exit_fee: String,

        /// Maximum bond token supply
        #[arg(long)]
        max_supply: u128,

        /// Blocks per order batch
        #[arg(long, default_value = "1")]
        batch_blocks: u64,

        /// Disable sell orders for this bond
        #[arg(long)]
        no_sells: bool,

        /// Swapper sanity rate (reserve token 1 per token 2)
        #[arg(long)]
        sanity_rate: Option<String>,

        /// Swapper sanity margin percentage
        #[arg(long)]
        sanity_margin: Option<String>,

        /// Outcome payment (augmented only)
        #[arg(long, default_value = "0")]
        outcome_payment: u128,

        /// Fee recipient address
        #[arg(long)]
        fee_address: Option<String>,
    },

    /// Edit a bond's signer-editable fields
    Edit {
        /// Bond token denom
        token: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        sanity_rate: Option<String>,

        #[arg(long)]
        sanity_margin: Option<String>,
    },

    /// Queue a buy order in the current batch
    Buy {
        /// Bond token denom
        token: String,

        /// Bond tokens to mint
        amount: u128,

        /// Price ceiling per reserve token, as DENOM=AMOUNT
        #[arg(long = "max-price", required = true)]
        max_prices: Vec<String>,
    },

    /// Queue a sell order in the current batch
    Sell {
        /// Bond token denom
        token: String,

        /// Bond tokens to burn
        amount: u128,
    },

    /// Queue a swap order through a swapper bond
    Swap {
        /// Bond token denom
        token: String,

        /// Input reserve denom
        from_denom: String,

        /// Input amount
        amount: u128,

        /// Output reserve denom
        to_denom: String,
    },

    /// Cancel a queued order
    Cancel {
        /// Bond token denom
        token: String,

        /// Order id returned when the order was queued
        order_id: u64,
    },

    /// Advance the block clock, settling batches that come due
    Advance {
        /// Number of blocks
        #[arg(default_value = "1")]
        blocks: u64,
    },

    /// Pay into an augmented bond's outcome payment
    PayOutcome {
        /// Bond token denom
        token: String,

        /// Amount of the reserve token
        amount: u128,
    },

    /// Withdraw a pro-rata reserve share from a bond in settlement
    Withdraw {
        /// Bond token denom
        token: String,

        /// Bond tokens to burn
        amount: u128,
    },

    /// Issue reserve tokens to an address (simulator only)
    Faucet {
        /// Recipient address
        address: String,

        /// Token denom
        denom: String,

        /// Amount
        amount: u128,
    },

    /// Show one bond in detail
    Show {
        /// Bond token denom
        token: String,
    },

    /// List all bonds
    List,

    /// Show an address's balances
    Balances {
        /// Address (defaults to --from)
        address: Option<String>,
    },

    /// Pricing queries
    Query {
        #[command(subcommand)]
        command: QueryCommands,
    },
}

#[derive(Subcommand)]
enum QueryCommands {
    /// Current spot price per reserve token
    Price {
        /// Bond token denom
        token: String,
    },

    /// Spot price at a hypothetical supply
    PriceAt {
        /// Bond token denom
        token: String,

        /// Supply to price at
        supply: u128,
    },

    /// Cost of minting now, fees included
    MintCost {
        /// Bond token denom
        token: String,

        /// Bond tokens to mint
        amount: u128,
    },

    /// Return from burning now, net of fees
    BurnReturn {
        /// Bond token denom
        token: String,

        /// Bond tokens to burn
        amount: u128,
    },

    /// Return from swapping now
    SwapReturn {
        /// Bond token denom
        token: String,

        /// Input reserve denom
        from_denom: String,

        /// Input amount
        amount: u128,

        /// Output reserve denom
        to_denom: String,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::resolve(cli.config.as_deref(), cli.state.clone(), cli.from.clone())?;

    if cli.verbose {
        println!("{} {}", "State:".bright_cyan(), config.state_path.display());
        println!("{} {}", "From:".bright_cyan(), config.from);
    }

    let mut state = ChainState::load(&config.state_path)?;
    let mut dirty = true;

    match cli.command {
        Commands::Create {
            token,
            name,
            description,
            function,
            m,
            n,
            c,
            a,
            b,
            reserve_tokens,
            tx_fee,
            exit_fee,
            max_supply,
            batch_blocks,
            no_sells,
            sanity_rate,
            sanity_margin,
            outcome_payment,
            fee_address,
        } => {
            bonds::create(
                &config,
                &mut state,
                token,
                name,
                description,
                CurveArgs { function, m, n, c, a, b },
                reserve_tokens,
                tx_fee,
                exit_fee,
                max_supply,
                batch_blocks,
                !no_sells,
                sanity_rate,
                sanity_margin,
                outcome_payment,
                fee_address,
            )?;
        }
        Commands::Edit {
            token,
            name,
            description,
            sanity_rate,
            sanity_margin,
        } => {
            bonds::edit(
                &config,
                &mut state,
                &token,
                name,
                description,
                sanity_rate,
                sanity_margin,
            )?;
        }
        Commands::Buy {
            token,
            amount,
            max_prices,
        } => {
            orders::buy(&config, &mut state, &token, amount, &max_prices)?;
        }
        Commands::Sell { token, amount } => {
            orders::sell(&config, &mut state, &token, amount)?;
        }
        Commands::Swap {
            token,
            from_denom,
            amount,
            to_denom,
        } => {
            orders::swap(&config, &mut state, &token, &from_denom, amount, &to_denom)?;
        }
        Commands::Cancel { token, order_id } => {
            orders::cancel(&config, &mut state, &token, order_id)?;
        }
        Commands::Advance { blocks } => {
            chain::advance(&mut state, blocks)?;
        }
        Commands::PayOutcome { token, amount } => {
            chain::pay_outcome(&config, &mut state, &token, amount)?;
        }
        Commands::Withdraw { token, amount } => {
            chain::withdraw(&config, &mut state, &token, amount)?;
        }
        Commands::Faucet {
            address,
            denom,
            amount,
        } => {
            orders::faucet(&mut state, &address, &denom, amount);
        }
        Commands::Show { token } => {
            bonds::show(&state, &token)?;
            dirty = false;
        }
        Commands::List => {
            bonds::list(&state);
            dirty = false;
        }
        Commands::Balances { address } => {
            orders::balances(&state, address.as_deref().unwrap_or(&config.from));
            dirty = false;
        }
        Commands::Query { command } => {
            match command {
                QueryCommands::Price { token } => queries::price(&state, &token)?,
                QueryCommands::PriceAt { token, supply } => {
                    queries::price_at(&state, &token, supply)?
                }
                QueryCommands::MintCost { token, amount } => {
                    queries::mint_cost(&state, &token, amount)?
                }
                QueryCommands::BurnReturn { token, amount } => {
                    queries::burn_return(&state, &token, amount)?
                }
                QueryCommands::SwapReturn {
                    token,
                    from_denom,
                    amount,
                    to_denom,
                } => queries::swap_return(&state, &token, &from_denom, amount, &to_denom)?,
            }
            dirty = false;
        }
    }

    if dirty {
        state.save(&config.state_path)?;
    }
    Ok(())
}
