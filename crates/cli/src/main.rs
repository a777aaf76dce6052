// stripe-csv - export Stripe transactions to an accounting-import CSV

mod dates;
mod exit_codes;
mod fetch;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Local;
use clap::Parser;

use stripe_csv_config::Settings;
use stripe_csv_ledger::{build_ledger, ensure_output_available, write_csv_file, LedgerError};

use exit_codes::{EXIT_FETCH_UPSTREAM, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};
use fetch::StripeClient;

#[derive(Parser)]
#[command(name = "stripe-csv")]
#[command(about = "Export Stripe transactions to an accounting-import CSV")]
#[command(version)]
#[command(after_help = "\
Balance transactions become one row each, fees become extra negative rows,
and payee names are filled in from charges and refunds.

Examples:
  stripe-csv --api-key sk_live_...
  stripe-csv -k sk_live_... --currency EUR --start 2026-01-01 --end 2026-02-01
  stripe-csv -k sk_live_... --start '30 days ago' --output exports/last-month.csv
  STRIPE_API_KEY=sk_live_... stripe-csv --start yesterday --end today")]
struct Cli {
    /// Stripe secret key (default: STRIPE_API_KEY env)
    #[arg(long, short = 'k')]
    api_key: Option<String>,

    /// Currency to export (default: settings, else USD)
    #[arg(long, short = 'c')]
    currency: Option<String>,

    /// Start of the range, inclusive (default: first day of this month)
    #[arg(long, short = 's')]
    start: Option<String>,

    /// End of the range, exclusive (default: now)
    #[arg(long, short = 'e')]
    end: Option<String>,

    /// Output CSV path; must not exist (default: output/{CURRENCY}-{start}-{end}.csv)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Stripe Connect account ID (acct_...)
    #[arg(long)]
    account: Option<String>,

    /// Stripe API base URL
    #[arg(long, hide = true)]
    api_base: Option<String>,

    /// Suppress progress and summary on stderr
    #[arg(long, short = 'q')]
    quiet: bool,

    /// Log more detail (-v info, -vv debug; RUST_LOG overrides)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cmd_export(cli) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<LedgerError> for CliError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::OutputExists(_) => CliError::io(err.to_string())
                .with_hint("choose another --output path or move the existing file"),
            LedgerError::Timestamp { .. } => CliError {
                code: EXIT_FETCH_UPSTREAM,
                message: err.to_string(),
                hint: None,
            },
            LedgerError::Csv(_) | LedgerError::Io(_) => CliError::io(err.to_string()),
        }
    }
}

// ============================================================================
// export
// ============================================================================

fn cmd_export(cli: Cli) -> Result<(), CliError> {
    let settings = Settings::load();

    // 1. Resolve API key
    let api_key = fetch::resolve_api_key(cli.api_key)?;

    // 2. Resolve date range and currency
    let range = dates::resolve_range(cli.start.as_deref(), cli.end.as_deref(), Local::now())?;
    let currency = validate_currency(cli.currency.as_deref().unwrap_or(&settings.default_currency))?;

    // 3. Output must be free before anything is fetched
    let out = cli
        .output
        .unwrap_or_else(|| output::default_output_path(&settings.output_dir, &currency, &range));
    ensure_output_available(&out)?;

    let show_progress = !cli.quiet && atty::is(atty::Stream::Stderr);
    if show_progress {
        eprintln!(
            "Fetching Stripe {} transactions ({} to {})...",
            currency,
            range.start.format("%Y-%m-%d %H:%M:%S"),
            range.end.format("%Y-%m-%d %H:%M:%S"),
        );
    }

    // 4. Fetch and reconcile. Each stream is pulled lazily, one after another.
    let client = StripeClient::with_base_url(
        api_key,
        cli.account.or(settings.stripe_account),
        cli.api_base.unwrap_or(settings.api_base),
    )?
    .with_progress(show_progress);

    let (from_epoch, to_epoch) = (range.start_epoch(), range.end_epoch());
    let (ledger, stats) = build_ledger(
        Local,
        client.list_balance_transactions(&currency, from_epoch, to_epoch),
        client.list_charges(from_epoch, to_epoch),
        client.list_refund_events(from_epoch, to_epoch),
    )?;

    // 5. Write CSV
    let count = write_csv_file(&ledger, &out)?;

    if !cli.quiet {
        eprintln!(
            "Done: {} rows ({} transactions, {} fees) written to {}",
            count,
            stats.transactions,
            stats.fee_rows,
            out.display(),
        );
    }

    Ok(())
}

/// Three-letter ISO 4217 code, returned uppercase.
fn validate_currency(raw: &str) -> Result<String, CliError> {
    let code = raw.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CliError::args(format!("invalid --currency {:?}", raw))
            .with_hint("use a three-letter ISO 4217 code such as USD or EUR"));
    }
    Ok(code.to_ascii_uppercase())
}
