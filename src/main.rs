//! auction-gym binary: run one market experiment or the evolutionary
//! parameter search.
//!
//! `experiment` stands up a single seeded market from flags or a JSON
//! description, runs it to completion, and logs the fitness summary.
//! `evolve` runs the outer search, scoring each chromosome as an
//! independent seeded simulation.

mod config;

use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use evolve::{ChromosomeInit, Evolution, EvolutionConfig, FitnessFn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use simulation::fitness::{alpha, efficiency, equilibrium, max_surplus};
use simulation::{MarketRunner, MemorySink, TraderSpec};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use types::{Algorithm, AuctionParameters, MarketInfo};

use crate::config::{ExperimentFile, SearchFile, build_traders, stepped_prices};

#[derive(Parser, Debug)]
#[command(name = "auction-gym")]
#[command(about = "Continuous double-auction market simulator with adaptive traders")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single market experiment
    Experiment(ExperimentArgs),
    /// Evolve auction parameters over repeated simulations
    Evolve(EvolveArgs),
}

/// Flags describing the market both subcommands run on.
#[derive(Args, Debug)]
struct MarketArgs {
    /// Number of trading days
    #[arg(long, default_value_t = 3)]
    days: u32,

    /// Timesteps per trading day
    #[arg(long, default_value_t = 100)]
    ts: u32,

    /// Number of sellers
    #[arg(long, default_value_t = 30)]
    num_sellers: usize,

    /// Number of buyers
    #[arg(long, default_value_t = 30)]
    num_buyers: usize,

    /// Policy for every seller (ZIC, ZIP or AA)
    #[arg(long, default_value = "ZIP")]
    seller_algo: String,

    /// Policy for every buyer (ZIC, ZIP or AA)
    #[arg(long, default_value = "ZIP")]
    buyer_algo: String,

    /// Sellers' smallest limit price
    #[arg(long, default_value_t = 5.0)]
    slp: f64,

    /// Sellers' limit-price step
    #[arg(long, default_value_t = 1.0)]
    slps: f64,

    /// Buyers' smallest limit price
    #[arg(long, default_value_t = 5.0)]
    blp: f64,

    /// Buyers' limit-price step
    #[arg(long, default_value_t = 1.0)]
    blps: f64,

    /// Integer noise added to every generated limit price
    #[arg(long, default_value_t = 0)]
    noise: u32,

    /// Master seed; drawn at random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// JSON experiment description overriding the flags above
    #[arg(long)]
    config_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ExperimentArgs {
    #[command(flatten)]
    market: MarketArgs,
}

#[derive(Args, Debug)]
struct EvolveArgs {
    #[command(flatten)]
    market: MarketArgs,

    /// Generations to evolve
    #[arg(long, default_value_t = 10)]
    generations: u32,

    /// Individuals per generation
    #[arg(long, default_value_t = 10)]
    individuals: usize,

    /// Per-gene mutation probability
    #[arg(long, default_value_t = 0.5)]
    mutation_rate: f64,

    /// Fitness function (ALPHA or ALOC-EFF)
    #[arg(long, default_value = "ALPHA")]
    fitness: String,

    /// Generation-zero profile (LOW, NORMAL, HIGH or RANDOM)
    #[arg(long, default_value = "RANDOM")]
    chromosome_init: String,
}

/// A fully resolved market description, whichever way it was specified.
struct Market {
    auction: AuctionParameters,
    info: MarketInfo,
    traders: Vec<TraderSpec>,
    seller_limits: Vec<f64>,
    buyer_limits: Vec<f64>,
    seed: u64,
    search: Option<SearchFile>,
}

fn resolve(args: &MarketArgs) -> Result<Market, Box<dyn Error>> {
    if let Some(path) = &args.config_file {
        let file = ExperimentFile::load(path)?;
        let traders = file.traders()?;
        let seed = args.seed.or(file.seed).unwrap_or_else(rand::random);
        return Ok(Market {
            auction: file.auction,
            info: file.market,
            traders,
            seller_limits: file.seller_limits,
            buyer_limits: file.buyer_limits,
            seed,
            search: file.search,
        });
    }

    let seller_algo: Algorithm = args.seller_algo.parse()?;
    let buyer_algo: Algorithm = args.buyer_algo.parse()?;
    let seed = args.seed.unwrap_or_else(rand::random);

    // Limit-price noise draws from its own stream off the master seed, so
    // a rerun with the same seed sees the same supply and demand curves.
    let mut rng = StdRng::seed_from_u64(seed);
    let seller_limits = stepped_prices(args.slp, args.slps, args.noise, args.num_sellers, &mut rng);
    let buyer_limits = stepped_prices(args.blp, args.blps, args.noise, args.num_buyers, &mut rng);
    let traders = build_traders(
        &seller_limits,
        &vec![seller_algo; args.num_sellers],
        &buyer_limits,
        &vec![buyer_algo; args.num_buyers],
    )?;

    Ok(Market {
        auction: AuctionParameters {
            delta_ee: 10.0,
            ..Default::default()
        },
        info: MarketInfo {
            min_price: 1.0,
            max_price: 100.0,
            trading_days: args.days,
            timesteps_per_day: args.ts,
        },
        traders,
        seller_limits,
        buyer_limits,
        seed,
        search: None,
    })
}

fn run_experiment(args: ExperimentArgs) -> Result<(), Box<dyn Error>> {
    let market = resolve(&args.market)?;
    info!(
        seed = market.seed,
        traders = market.traders.len(),
        days = market.info.trading_days,
        timesteps = market.info.timesteps_per_day,
        "starting experiment"
    );

    let mut runner = MarketRunner::new(market.auction, market.info, market.seed);
    for spec in &market.traders {
        runner.add_trader(spec);
    }
    let mut sink = MemorySink::new();
    let stats = runner.run(&mut sink);
    let records = sink.all();

    info!(
        trades = stats.trades,
        admitted = stats.orders_admitted,
        rejected = stats.rejections,
        idle = stats.idle_timesteps,
        "run complete"
    );

    match equilibrium(&market.seller_limits, &market.buyer_limits) {
        Ok((pe, quantity)) => {
            let (seller_surplus, buyer_surplus) =
                max_surplus(&market.seller_limits, &market.buyer_limits, pe);
            let ceiling = (seller_surplus + buyer_surplus) * market.info.trading_days as f64;
            info!(
                pe,
                quantity,
                alpha = alpha(&records, pe),
                efficiency = efficiency(&records, ceiling),
                "fitness summary"
            );
        }
        Err(err) => warn!(%err, "no equilibrium; skipping the fitness summary"),
    }

    for (id, balance) in runner.balances() {
        debug!(%id, balance, "trader balance");
    }
    Ok(())
}

fn run_evolve(args: EvolveArgs) -> Result<(), Box<dyn Error>> {
    let market = resolve(&args.market)?;

    // The config file's search section wins over the flags.
    let (generations, individuals, mutation_rate, fitness, init) = match market.search {
        Some(search) => (
            search.generations,
            search.individuals,
            search.mutation_rate,
            search.fitness,
            search.chromosome_init,
        ),
        None => (
            args.generations,
            args.individuals,
            args.mutation_rate,
            args.fitness.parse::<FitnessFn>()?,
            args.chromosome_init.parse::<ChromosomeInit>()?,
        ),
    };

    info!(
        seed = market.seed,
        generations, individuals, mutation_rate, "starting evolutionary search"
    );

    let mut evolution = Evolution::new(EvolutionConfig {
        individuals,
        generations,
        mutation_rate,
        init,
        fitness,
        info: market.info,
        traders: market.traders,
        seed: market.seed,
    })?;
    let summaries = evolution.run();

    if let Some(last) = summaries.last() {
        let best = last.best;
        info!(
            generation = last.generation,
            score = last.best_score,
            k_pricing = best.k_pricing,
            bid_ask_ratio = best.bid_ask_ratio,
            window_size_ee = best.window_size_ee,
            delta_ee = best.delta_ee,
            max_shift = best.max_shift,
            dominance = best.dominance,
            "search complete"
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Experiment(args) => run_experiment(args),
        Command::Evolve(args) => run_evolve(args),
    }
}
