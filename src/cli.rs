//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::cost_basis::LotAdjustment;
use crate::domain::error::WheelerError;
use crate::domain::lot::NewLot;
use crate::domain::option_event::{NewOptionEvent, OptionType};
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::LedgerPort;

#[derive(Parser, Debug)]
#[command(name = "wheeler", about = "Wheel strategy ledger with adjusted cost basis")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create or migrate the database schema
    Init {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Recompute adjusted cost basis for one symbol or all of them
    Recalculate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        /// Print adjustments and their contributions as JSON
        #[arg(long)]
        json: bool,
    },
    /// List stock lots for a symbol
    Lots {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        /// Current share price, for P/L on open lots
        #[arg(long)]
        price: Option<f64>,
        /// Quarterly dividend per share, for yield on cost
        #[arg(long)]
        dividend: Option<f64>,
        #[arg(long)]
        json: bool,
    },
    /// List option contracts for a symbol
    Options {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        /// Current share price, for distance out of the money
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        json: bool,
    },
    /// Record a stock purchase
    AddLot {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        opened: NaiveDate,
        #[arg(long)]
        shares: u32,
        #[arg(long)]
        price: f64,
    },
    /// Close a lot at an exit price
    CloseLot {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        id: i64,
        #[arg(long)]
        closed: NaiveDate,
        #[arg(long, default_value_t = 0.0)]
        exit_price: f64,
    },
    /// Delete a lot
    DeleteLot {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        id: i64,
    },
    /// Record an opened option contract
    AddOption {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long = "type")]
        option_type: OptionType,
        #[arg(long)]
        opened: NaiveDate,
        #[arg(long)]
        strike: f64,
        #[arg(long)]
        expiration: NaiveDate,
        #[arg(long)]
        premium: f64,
        #[arg(long, default_value_t = 1)]
        contracts: u32,
        #[arg(long, default_value_t = 0.0)]
        commission: f64,
    },
    /// Close an option (expired, assigned or bought back)
    CloseOption {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        id: i64,
        #[arg(long)]
        closed: NaiveDate,
        #[arg(long, default_value_t = 0.0)]
        exit_price: f64,
    },
    /// Delete an option
    DeleteOption {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        id: i64,
    },
}

impl Command {
    fn config_path(&self) -> &Path {
        match self {
            Command::Init { config }
            | Command::Recalculate { config, .. }
            | Command::Lots { config, .. }
            | Command::Options { config, .. }
            | Command::AddLot { config, .. }
            | Command::CloseLot { config, .. }
            | Command::DeleteLot { config, .. }
            | Command::AddOption { config, .. }
            | Command::CloseOption { config, .. }
            | Command::DeleteOption { config, .. } => config.as_path(),
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let config = match load_config(cli.command.config_path()) {
        Ok(c) => c,
        Err(code) => return code,
    };
    init_tracing(&config);

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;

        let ledger = match SqliteAdapter::from_config(&config) {
            Ok(a) => a,
            Err(e) => return report(Err(e)),
        };
        if let Err(e) = ledger.initialize_schema() {
            return report(Err(e));
        }
        report(dispatch(&ledger, cli.command))
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = cli;
        eprintln!("error: sqlite feature is required");
        ExitCode::from(1)
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Install the global subscriber. `RUST_LOG` wins over `[logging] level`.
pub fn init_tracing(config: &dyn ConfigPort) {
    let level = config
        .get_string("logging", "level")
        .unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.get_bool("logging", "ansi", true))
        .with_writer(std::io::stderr)
        .try_init();
}

fn report(result: Result<(), WheelerError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn dispatch(ledger: &dyn LedgerPort, command: Command) -> Result<(), WheelerError> {
    match command {
        Command::Init { .. } => {
            eprintln!("Schema is up to date");
            Ok(())
        }
        Command::Recalculate { symbol, json, .. } => {
            let results = recalculate(ledger, symbol.as_deref())?;
            if json {
                println!("{}", recalculation_json(&results)?);
                return Ok(());
            }
            for (symbol, adjustments) in &results {
                println!("{}", summarize(symbol, adjustments));
            }
            Ok(())
        }
        Command::Lots {
            symbol,
            price,
            dividend,
            json,
            ..
        } => {
            if json {
                let lots = ledger.lots_for_symbol(&symbol.trim().to_uppercase())?;
                println!("{}", serde_json::to_string_pretty(&lots)?);
                return Ok(());
            }
            for line in lot_lines(ledger, &symbol, price, dividend)? {
                println!("{line}");
            }
            Ok(())
        }
        Command::Options {
            symbol,
            price,
            json,
            ..
        } => {
            if json {
                let options = ledger.options_for_symbol(&symbol.trim().to_uppercase())?;
                println!("{}", serde_json::to_string_pretty(&options)?);
                return Ok(());
            }
            let today = chrono::Local::now().date_naive();
            for line in option_lines(ledger, &symbol, today, price)? {
                println!("{line}");
            }
            Ok(())
        }
        Command::AddLot {
            symbol,
            opened,
            shares,
            price,
            ..
        } => {
            let lot = ledger.create_lot(&NewLot {
                symbol,
                opened,
                shares,
                buy_price: price,
                closed: None,
                exit_price: None,
            })?;
            eprintln!(
                "Created lot {} ({} x {} @ {:.2}), adjusted basis {:.2}/share",
                lot.id, lot.symbol, lot.shares, lot.buy_price, lot.adjusted_cost_basis_per_share
            );
            Ok(())
        }
        Command::CloseLot {
            id,
            closed,
            exit_price,
            ..
        } => {
            let lot = ledger.close_lot(id, closed, exit_price)?;
            eprintln!("Closed lot {} on {} at {:.2}", lot.id, closed, exit_price);
            Ok(())
        }
        Command::DeleteLot { id, .. } => {
            ledger.delete_lot(id)?;
            eprintln!("Deleted lot {id}");
            Ok(())
        }
        Command::AddOption {
            symbol,
            option_type,
            opened,
            strike,
            expiration,
            premium,
            contracts,
            commission,
            ..
        } => {
            let option = ledger.create_option(&NewOptionEvent {
                symbol,
                option_type,
                opened,
                strike,
                expiration,
                premium,
                contracts,
                commission,
                closed: None,
                exit_price: None,
            })?;
            eprintln!(
                "Created option {} ({} {} {:.2} exp {})",
                option.id, option.symbol, option.option_type, option.strike, option.expiration
            );
            Ok(())
        }
        Command::CloseOption {
            id,
            closed,
            exit_price,
            ..
        } => {
            let option = ledger.close_option(id, closed, exit_price)?;
            eprintln!(
                "Closed option {} on {}, net premium {:.2}",
                option.id,
                closed,
                option.net_premium()
            );
            Ok(())
        }
        Command::DeleteOption { id, .. } => {
            ledger.delete_option(id)?;
            eprintln!("Deleted option {id}");
            Ok(())
        }
    }
}

/// Recalculate `symbol`, or every symbol in the ledger when none is given.
pub fn recalculate(
    ledger: &dyn LedgerPort,
    symbol: Option<&str>,
) -> Result<Vec<(String, Vec<LotAdjustment>)>, WheelerError> {
    let symbols = match symbol {
        Some(s) => vec![s.trim().to_uppercase()],
        None => ledger.symbols()?,
    };

    let mut results = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let adjustments = ledger.recalculate_for_symbol(&symbol)?;
        results.push((symbol, adjustments));
    }
    Ok(results)
}

#[derive(Serialize)]
struct SymbolRecalculation<'a> {
    symbol: &'a str,
    adjustments: &'a [LotAdjustment],
}

/// Pretty JSON array with one entry per symbol, contributions included.
pub fn recalculation_json(
    results: &[(String, Vec<LotAdjustment>)],
) -> Result<String, WheelerError> {
    let entries: Vec<SymbolRecalculation> = results
        .iter()
        .map(|(symbol, adjustments)| SymbolRecalculation {
            symbol,
            adjustments,
        })
        .collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}

pub fn summarize(symbol: &str, adjustments: &[LotAdjustment]) -> String {
    let credit: f64 = adjustments.iter().map(|a| a.premium_credit).sum();
    let floored = adjustments.iter().filter(|a| a.floored).count();
    let mut line = format!(
        "{}: {} lots, premium credit {:.2}",
        symbol,
        adjustments.len(),
        credit
    );
    if floored > 0 {
        line.push_str(&format!(", {floored} floored at base cost"));
    }
    line
}

/// One line per lot. P/L needs an exit price or `price`; yield needs `dividend`.
pub fn lot_lines(
    ledger: &dyn LedgerPort,
    symbol: &str,
    price: Option<f64>,
    dividend: Option<f64>,
) -> Result<Vec<String>, WheelerError> {
    let symbol = symbol.trim().to_uppercase();
    let lots = ledger.lots_for_symbol(&symbol)?;
    Ok(lots
        .iter()
        .map(|lot| {
            let closed = lot
                .closed
                .map(|d| d.to_string())
                .unwrap_or_else(|| "open".to_string());
            let mut line = format!(
                "#{:<4} {} -> {:<10} {:>6} @ {:>9.2}  adj {:>9.2}/sh  {:>12.2} total",
                lot.id,
                lot.opened,
                closed,
                lot.shares,
                lot.buy_price,
                lot.cost_basis_per_share(),
                lot.amount()
            );
            let mark = if lot.is_open() { price } else { lot.exit_price };
            if let Some(mark) = mark {
                line.push_str(&format!(
                    "  p/l {:+.2} ({:+.1}%)",
                    lot.profit_loss(mark),
                    lot.roi(mark)
                ));
            }
            if let Some(dividend) = dividend {
                line.push_str(&format!("  yield {:.2}%", lot.dividend_yield(dividend)));
            }
            line
        })
        .collect())
}

pub fn option_lines(
    ledger: &dyn LedgerPort,
    symbol: &str,
    today: NaiveDate,
    price: Option<f64>,
) -> Result<Vec<String>, WheelerError> {
    let symbol = symbol.trim().to_uppercase();
    let options = ledger.options_for_symbol(&symbol)?;
    Ok(options
        .iter()
        .map(|opt| {
            let outcome = if opt.is_profit() {
                "won"
            } else if opt.is_loss() {
                "lost"
            } else {
                "flat"
            };
            let status = match opt.closed {
                Some(d) => format!(
                    "closed {d} after {}d ({outcome})  kept {:.0}% in {:.0}% of time (x{:.2})",
                    opt.days_to_close(),
                    opt.percent_of_profit(),
                    opt.percent_of_time(today),
                    opt.multiplier(today)
                ),
                None => format!(
                    "{} of {} days left, {:.0}% of time used",
                    opt.days_remaining(today),
                    opt.days_to_expiration(),
                    opt.percent_of_time(today)
                ),
            };
            let mut line = format!(
                "#{:<4} {:<4} {} x{} strike {:.2} exp {}  net {:>9.2}  aroi {:>7.1}%  {}",
                opt.id,
                opt.option_type,
                opt.opened,
                opt.contracts,
                opt.strike,
                opt.expiration,
                opt.net_premium(),
                opt.aroi(today),
                status
            );
            if let Some(price) = price {
                line.push_str(&format!("  otm {:.1}%", opt.percent_otm(price)));
            }
            line
        })
        .collect())
}
