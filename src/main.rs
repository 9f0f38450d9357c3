mod biomass;
mod config;
mod estimator;
mod experiment;
mod explore;
mod generator;
mod model;
mod report;
mod session;
mod stats;

use crate::config::{Config, TrueImpact};
use crate::experiment::{Design, Experiment};
use crate::model::SiteId;
use crate::report::{render_grid, render_impacts};
use crate::session::{Session, Toggle};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::{io, path::PathBuf};

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    /// TOML configuration file (defaults are used when omitted).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for reproducible scenarios.
    #[arg(long)]
    seed: Option<u64>,

    /// Override the true impact strategy of the configuration.
    #[arg(long, value_enum)]
    true_impact: Option<TrueImpact>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the generated grid.
    Show {
        /// Print every site as JSON instead.
        #[arg(long)]
        json: bool,
    },

    /// Select sites, then compare the survey with the true impact.
    Survey {
        /// Site as `X,Y`, may be repeated.
        #[arg(long = "site", value_parser = parse_site_id)]
        sites: Vec<SiteId>,

        /// Maximum number of survey sites, clamped to 1-100.
        #[arg(long, allow_negative_numbers = true)]
        site_count: Option<i64>,
    },

    /// Interactive session reading commands from standard input.
    Explore,

    /// Survey many scenarios with an automatic design.
    Experiment {
        #[arg(long, default_value_t = 1000)]
        replicates: usize,

        #[arg(long, value_enum, default_value_t = Design::Random)]
        design: Design,

        /// Write the JSON report here instead of standard output.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn parse_site_id(arg: &str) -> Result<SiteId> {
    let (x, y) = arg.split_once(',').context("expected X,Y")?;
    let x = x.trim().parse::<usize>().context("invalid column")?;
    let y = y.trim().parse::<usize>().context("invalid row")?;
    Ok(SiteId::new(x, y))
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mut cfg = match &args.config {
        Some(file) => Config::from_file(file).context("failed to construct cfg")?,
        None => Config::default(),
    };
    if let Some(true_impact) = args.true_impact {
        cfg.estimator.true_impact = true_impact;
    }
    log::debug!("{cfg:#?}");
    let decimal_places = cfg.display.decimal_places;

    let mut session = Session::new(cfg, args.seed).context("failed to construct session")?;

    match args.command {
        Command::Show { json } => {
            if json {
                let pop = serde_json::to_string_pretty(session.population())
                    .context("failed to serialize population")?;
                println!("{pop}");
            } else {
                print!("{}", render_grid(session.population()));
            }
        }
        Command::Survey { sites, site_count } => {
            if let Some(count) = site_count {
                session.set_site_count(count);
            }
            for id in sites {
                if session.toggle(id)? == Toggle::CapacityExceeded {
                    bail!("only {} sites may be selected", session.max_selections());
                }
            }
            print!("{}", render_grid(session.population()));
            session.check_ready().context("survey is not ready")?;
            print!("{}", render_impacts(&session.calculate(), decimal_places));
        }
        Command::Explore => {
            let stdin = io::stdin();
            explore::run(&mut session, stdin.lock(), io::stdout())?;
        }
        Command::Experiment {
            replicates,
            design,
            output,
        } => {
            let mut experiment = Experiment::new(session, design);
            experiment
                .run(replicates)
                .context("failed to run experiment")?;
            match output {
                Some(file) => experiment
                    .save_results(&file)
                    .with_context(|| format!("failed to save {file:?}"))?,
                None => println!("{:#}", experiment.report()),
            }
        }
    }

    Ok(())
}
