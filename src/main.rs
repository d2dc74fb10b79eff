mod api;
mod config;
mod controller;
mod error;
mod render;
mod types;
mod view;
mod web;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use api::{AssistantApi, HttpApiClient};
use crate::config::{ClientConfig, DEFAULT_CONFIG_PATH};
use controller::{BacktestController, ChatController, QUICK_ACTIONS, RESET_PROMPT};
use render::format::{format_number, signed_pct, strategy_name};
use types::BacktestRun;
use view::{ChatPage, Dialogs, EntryKind, TerminalDialogs};
use web::{render_backtest_page, render_chat_page, start_preview_server, AppState};

#[derive(Parser)]
#[command(name = "crypto-assistant")]
#[command(version = "0.1.0")]
#[command(about = "Chat and backtest client for the crypto trading assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant (interactive unless --message is given)
    Chat {
        /// Send a single message and exit
        #[arg(short, long)]
        message: Option<String>,

        /// Write the rendered chat page to this file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Clear the conversation on the backend
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Run backtests and list stored results
    Backtest {
        #[command(subcommand)]
        action: BacktestAction,
    },
    /// Show the current price of a coin
    Price { symbol: String },
    /// Show the language model connection status
    Status,
    /// List the tools the assistant can call
    Tools,
    /// List the available trading strategies
    Strategies,
    /// Serve the chat and backtest pages
    Serve {
        /// Port to listen on (default from config)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
enum BacktestAction {
    /// Submit a backtest run, then show the refreshed results
    Run {
        #[arg(long, default_value = "BTC/USDT")]
        symbol: String,

        #[arg(long, default_value = "1h")]
        timeframe: String,

        #[arg(long, default_value = "technical")]
        strategy: String,

        /// Initial capital in USDT
        #[arg(long, default_value = "10000")]
        capital: f64,

        /// Start date (YYYY-MM-DD), defaults to the configured lookback
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        end: Option<String>,

        /// Write the rendered backtest page to this file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Show the most recent results
    Results {
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ClientConfig::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config))?;
    if let Err(problems) = config.validate() {
        for problem in &problems {
            error!("Config: {}", problem);
        }
        return Err(anyhow!("invalid configuration ({} problems)", problems.len()));
    }

    let api = HttpApiClient::from_settings(&config.api)?;
    info!("Crypto Assistant v0.1.0 (backend {})", api.base_url());

    match cli.command {
        Commands::Chat { message, out } => run_chat(api, message, out).await?,
        Commands::Reset { yes } => reset_conversation(&api, yes).await?,
        Commands::Backtest { action } => match action {
            BacktestAction::Run {
                symbol,
                timeframe,
                strategy,
                capital,
                start,
                end,
                out,
            } => {
                let mut controller = backtest_controller(api, &config).await;
                let form = controller.form_mut();
                form.symbol = symbol;
                form.timeframe = timeframe;
                form.strategy = strategy;
                form.initial_capital = capital.to_string();
                if let Some(start) = start {
                    form.start_date = start;
                }
                if let Some(end) = end {
                    form.end_date = end;
                }

                let accepted = controller.run(&mut TerminalDialogs::new(true)).await;
                print_results(controller.results());
                if let Some(path) = out {
                    let html =
                        render_backtest_page(controller.page(), controller.is_running(), &[])?;
                    write_page(&path, &html)?;
                }
                controller.teardown();
                if !accepted {
                    return Err(anyhow!("backtest was not run"));
                }
            }
            BacktestAction::Results { out } => {
                let mut controller = backtest_controller(api, &config).await;
                print_results(controller.results());
                if let Some(path) = out {
                    let html =
                        render_backtest_page(controller.page(), controller.is_running(), &[])?;
                    write_page(&path, &html)?;
                }
                controller.teardown();
            }
        },
        Commands::Price { symbol } => show_price(&api, &symbol).await?,
        Commands::Status => show_status(&api).await?,
        Commands::Tools => {
            for tool in api.tools().await? {
                println!("  {:<28} {}", tool.name, tool.description);
            }
        }
        Commands::Strategies => {
            for strategy in api.strategies().await? {
                println!("{}", serde_json::to_string_pretty(&strategy)?);
            }
        }
        Commands::Serve { port } => {
            let mut chat = ChatController::new(api.clone());
            chat.init();
            let backtest = backtest_controller(api, &config).await;
            let state = AppState::new(chat, backtest);
            start_preview_server(state, port.unwrap_or(config.server.port)).await?;
        }
    }

    Ok(())
}

async fn backtest_controller(
    api: HttpApiClient,
    config: &ClientConfig,
) -> BacktestController<HttpApiClient> {
    let mut controller = BacktestController::new(
        api,
        config.backtest.results_limit,
        config.backtest.default_lookback_days,
    );
    controller.init(Local::now().date_naive()).await;
    controller
}

async fn run_chat(api: HttpApiClient, message: Option<String>, out: Option<PathBuf>) -> Result<()> {
    let mut controller = ChatController::new(api);
    controller.init();

    let mut printed = HashSet::new();
    print_new_entries(controller.page(), &mut printed);

    if let Some(message) = message {
        controller.set_input(message);
        controller.send_message().await;
        print_new_entries(controller.page(), &mut printed);
    } else {
        println!("Commands: /quick <n>, /reset, /quit");
        for (i, action) in QUICK_ACTIONS.iter().enumerate() {
            println!("  {}. {}", i + 1, action.label);
        }

        let mut dialogs = TerminalDialogs::new(false);
        while let Some(line) = read_line("> ").await? {
            let line = line.trim();
            match line {
                "/quit" | "/exit" => break,
                "/reset" => controller.reset(&mut dialogs).await,
                _ if line.starts_with("/quick") => {
                    let picked = line["/quick".len()..]
                        .trim()
                        .parse::<usize>()
                        .ok()
                        .and_then(|n| n.checked_sub(1))
                        .and_then(|i| QUICK_ACTIONS.get(i));
                    match picked {
                        Some(action) => controller.quick_action(action.prompt).await,
                        None => warn!("Usage: /quick <1-{}>", QUICK_ACTIONS.len()),
                    }
                }
                _ => {
                    controller.set_input(line);
                    controller.key_press("Enter", false).await;
                }
            }
            print_new_entries(controller.page(), &mut printed);
        }
    }

    if let Some(path) = out {
        write_page(&path, &render_chat_page(controller.page(), &[])?)?;
    }
    controller.teardown();
    Ok(())
}

/// Prints entries not shown yet. Entry ids are unique, so a reset that
/// rebuilds the transcript prints the greeting again.
fn print_new_entries(page: &ChatPage, printed: &mut HashSet<String>) {
    for entry in page.entries() {
        if !printed.insert(entry.id.clone()) {
            continue;
        }
        match entry.kind {
            EntryKind::User => println!("👤 {}", entry.text),
            EntryKind::Bot => println!("🤖 {}", entry.text),
            EntryKind::Loading => {}
        }
    }
    if page.chart_visible && page.chart_scrolled_into_view {
        println!("📊 A chart is available, use --out to write the page");
    }
}

async fn read_line(prompt: &str) -> Result<Option<String>> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let (read, line) = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        io::stdin().read_line(&mut line).map(|n| (n, line))
    })
    .await??;

    Ok((read > 0).then_some(line))
}

async fn reset_conversation(api: &HttpApiClient, yes: bool) -> Result<()> {
    let mut dialogs = TerminalDialogs::new(yes);
    if !dialogs.confirm(RESET_PROMPT) {
        info!("Reset cancelled");
        return Ok(());
    }
    api.reset().await?;
    info!("Conversation reset");
    Ok(())
}

async fn show_price(api: &HttpApiClient, symbol: &str) -> Result<()> {
    let quote = api.price(symbol).await?;
    println!("\n=== {} ===", quote.symbol);
    println!("  Price:       ${:.2}", quote.price_usd);
    println!("  24h change:  {}", signed_pct(quote.change_24h_percent));
    println!("  24h volume:  ${}", format_number(quote.volume_24h_usd));
    println!("  Market cap:  ${}", format_number(quote.market_cap_usd));
    if let Some(source) = quote.source {
        println!("  Source:      {}", source);
    }
    Ok(())
}

async fn show_status(api: &HttpApiClient) -> Result<()> {
    let status = api.llm_status().await?;
    if status.is_connected() {
        println!("✅ LLM connected ({})", status.host.as_deref().unwrap_or("unknown host"));
        if let Some(model) = &status.current_model {
            println!("  Current model: {}", model);
        }
        for model in &status.models {
            println!("  - {}", model);
        }
    } else {
        println!(
            "❌ LLM {}: {}",
            status.status,
            status.error.as_deref().unwrap_or("no details")
        );
    }
    Ok(())
}

fn print_results(runs: &[BacktestRun]) {
    if runs.is_empty() {
        println!("No backtest results yet.");
        return;
    }

    println!(
        "\n{:<12} {:<26} {:<5} {:>10} {:>8} {:>9} {:>7}",
        "Symbol", "Strategy", "TF", "Return", "Sharpe", "Drawdown", "Trades"
    );
    for run in runs {
        println!(
            "{:<12} {:<26} {:<5} {:>9.2}% {:>8.3} {:>8.2}% {:>7}",
            run.symbol.as_deref().unwrap_or("N/A"),
            strategy_name(run.strategy_or_unknown()),
            run.timeframe_or_default(),
            run.total_return_pct,
            run.sharpe_ratio.unwrap_or(0.0),
            run.max_drawdown_pct,
            run.total_trades.unwrap_or(0),
        );
    }
}

fn write_page(path: &PathBuf, html: &str) -> Result<()> {
    std::fs::write(path, html).with_context(|| format!("failed to write {}", path.display()))?;
    info!("Page written to {}", path.display());
    Ok(())
}
