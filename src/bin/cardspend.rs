//! Campus-card spending report: fetch, aggregate, chart.

extern crate alloc;

use alloc::collections::BTreeMap;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use cardspend::aggregate::{YearlyAggregation, aggregate_by_year, missing_years, summarize_by_year};
use cardspend::cache::FileCache;
use cardspend::chart::{ChartStyle, render_merchant_chart, render_trend_chart};
use cardspend::config::{DEFAULT_CONFIG_FILE, DEFAULT_SETTINGS_FILE, Session, Settings};
use cardspend::fetcher::Fetcher;
use cardspend::models::{SkipCounts, YearLabel, YearSummary};
use clap::Parser;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, Table};
use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

/// Campus-card spending report over four academic years.
#[derive(Debug, Parser)]
#[command(name = "cardspend", version, about)]
struct Cli {
    /// Credential file holding the account and hallticket.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Optional settings file.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,
    /// Ignore cached responses and query the service again.
    #[arg(long)]
    refresh: bool,
    /// Directory the charts are written to.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
}

/// Runs the CLI, returning an appropriate exit code.
fn run() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    let loaded = match Settings::load(&cli.settings) {
        Ok(settings) => settings,
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} invalid settings: {err}",
                "error:".red().bold()
            )?;
            return Ok(ExitCode::FAILURE);
        }
    };
    let settings = match cli.output_dir.as_deref() {
        Some(dir) => {
            if let Err(err) = std::fs::create_dir_all(dir) {
                writeln!(
                    io::stderr().lock(),
                    "{} cannot create {}: {err}",
                    "error:".red().bold(),
                    dir.display()
                )?;
                return Ok(ExitCode::FAILURE);
            }
            loaded.with_output_dir(dir)
        }
        None => loaded,
    };

    let Some(session) = resolve_session(&cli.config)? else {
        return Ok(ExitCode::FAILURE);
    };

    writeln!(
        io::stdout().lock(),
        "{} {} ({})",
        "Report span:".bold(),
        settings.span,
        session.account().dimmed()
    )?;

    let fetcher = match Fetcher::from_settings(
        &session,
        &settings,
        FileCache::new(settings.cache_dir.clone()),
    ) {
        Ok(fetcher) => fetcher,
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to build client: {err}",
                "error:".red().bold()
            )?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let spinner = make_spinner("Collecting transactions...");
    let aggregation = aggregate_by_year(&fetcher, &settings.years, !cli.refresh);
    spinner.finish_and_clear();

    report(&aggregation, &settings)
}

/// Prints the year summary and, when every year has data, draws both charts.
fn report(aggregation: &YearlyAggregation, settings: &Settings) -> io::Result<ExitCode> {
    let spending = aggregation.spending_by_year();
    let summaries = summarize_by_year(&spending);
    print_year_table(&summaries, &aggregation.total_skipped())?;

    let missing = missing_years(&spending);
    if !missing.is_empty() {
        print_missing_years(&missing)?;
        return Ok(ExitCode::FAILURE);
    }

    let style = ChartStyle::from_settings(settings);
    let charts = [
        (
            settings.merchant_chart.as_path(),
            render_merchant_chart(&settings.merchant_chart, &spending, &style),
        ),
        (
            settings.trend_chart.as_path(),
            render_trend_chart(&settings.trend_chart, &summaries, &style),
        ),
    ];

    let mut code = ExitCode::SUCCESS;
    let mut out = io::stdout().lock();
    for (path, result) in charts {
        match result {
            Ok(()) => writeln!(out, "{} {}", "wrote".green().bold(), path.display())?,
            Err(err) => {
                writeln!(
                    io::stderr().lock(),
                    "{} failed to draw {}: {err}",
                    "error:".red().bold(),
                    path.display()
                )?;
                code = ExitCode::FAILURE;
            }
        }
    }
    Ok(code)
}

/// Finds the session: environment first, then the credential file,
/// prompting for new credentials until the file loads.
fn resolve_session(config: &Path) -> io::Result<Option<Session>> {
    if let Some(session) = Session::from_env() {
        tracing::debug!("using credentials from environment");
        return Ok(Some(session));
    }
    loop {
        match Session::load(config) {
            Ok(session) => return Ok(Some(session)),
            Err(err) => {
                tracing::warn!(error = %err, "credential file unusable");
                writeln!(
                    io::stderr().lock(),
                    "{} cannot read credentials from {}: {err}",
                    "warning:".yellow().bold(),
                    config.display()
                )?;
            }
        }
        if !prompt_credentials(config)? {
            return Ok(None);
        }
    }
}

/// Asks for the account and hallticket and writes them to `config`.
/// Returns `false` when prompting is impossible.
fn prompt_credentials(config: &Path) -> io::Result<bool> {
    let account_answer = Input::new().with_prompt("Card account").interact_text();
    let answers = account_answer.and_then(|account: String| {
        Password::new()
            .with_prompt("Hallticket")
            .interact()
            .map(|hallticket| (account, hallticket))
    });
    let (account, hallticket) = match answers {
        Ok(pair) => pair,
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} cannot prompt for credentials: {err}",
                "error:".red().bold()
            )?;
            return Ok(false);
        }
    };

    let saved = Session::new(account, hallticket).and_then(|session| session.save(config));
    if let Err(err) = saved {
        writeln!(
            io::stderr().lock(),
            "{} {err}",
            "warning:".yellow().bold()
        )?;
    }
    Ok(true)
}

/// Creates a spinner progress bar with the given message.
fn make_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(core::time::Duration::from_millis(80));
    spinner
}

/// Builds the per-year summary table.
fn year_table(summaries: &BTreeMap<YearLabel, YearSummary>) -> Table {
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Year").fg(Color::Cyan),
        Cell::new("Spent").fg(Color::Cyan),
        Cell::new("Merchants").fg(Color::Cyan),
    ]);
    for label in YearLabel::ALL {
        let row = summaries.get(&label).map_or_else(
            || {
                vec![
                    Cell::new(label).fg(Color::DarkGrey),
                    Cell::new("\u{2014}").set_alignment(CellAlignment::Right),
                    Cell::new("\u{2014}").set_alignment(CellAlignment::Right),
                ]
            },
            |summary| {
                vec![
                    Cell::new(label),
                    Cell::new(format!("{:.2}", summary.amount))
                        .set_alignment(CellAlignment::Right),
                    Cell::new(summary.count).set_alignment(CellAlignment::Right),
                ]
            },
        );
        _ = table.add_row(row);
    }
    table
}

/// Prints the per-year summary and the skipped-record counts.
fn print_year_table(
    summaries: &BTreeMap<YearLabel, YearSummary>,
    skipped: &SkipCounts,
) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{}", "Spending by academic year".green().bold())?;
    writeln!(out)?;
    writeln!(out, "{}", year_table(summaries))?;
    if skipped.total() > 0 {
        writeln!(
            out,
            "{}",
            format_args!(
                "skipped {} records without an amount, {} debits without a merchant",
                skipped.missing_amount, skipped.missing_merchant
            )
            .dimmed()
        )?;
    }
    Ok(())
}

/// Reports the years without data.
fn print_missing_years(missing: &[YearLabel]) -> io::Result<()> {
    let names: Vec<&str> = missing.iter().copied().map(YearLabel::as_str).collect();
    let mut err = io::stderr().lock();
    writeln!(
        err,
        "{} no spending for {}; charts not drawn",
        "error:".red().bold(),
        names.join(", ").bold()
    )?;
    writeln!(
        err,
        "  {} check the credentials or rerun with --refresh",
        "hint:".cyan()
    )?;
    Ok(())
}

/// Entry point; maps an I/O failure while reporting to a failing exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            let _ignored = writeln!(io::stderr(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use cardspend::aggregate::Aggregation;

    fn aggregation(years: Vec<(YearLabel, Vec<(&str, f64)>)>) -> YearlyAggregation {
        YearlyAggregation {
            years: years
                .into_iter()
                .map(|(label, merchants)| {
                    let spending = merchants
                        .iter()
                        .map(|&(name, amount)| (name.to_owned(), amount))
                        .collect();
                    (
                        label,
                        Aggregation {
                            spending,
                            debits: merchants.len(),
                            ..Aggregation::default()
                        },
                    )
                })
                .collect(),
        }
    }

    fn settings_in(dir: &Path) -> Settings {
        Settings::default().with_output_dir(dir)
    }

    #[test]
    fn cli_defaults_match_working_directory_files() {
        let cli = Cli::parse_from(["cardspend"]);
        assert_eq!(cli.config, PathBuf::from("config.json"));
        assert_eq!(cli.settings, PathBuf::from("settings.json"));
        assert!(!cli.refresh);
        assert!(cli.output_dir.is_none());
    }

    #[test]
    fn cli_accepts_all_flags() {
        let cli = Cli::parse_from([
            "cardspend",
            "--config",
            "me.json",
            "--settings",
            "s.json",
            "--refresh",
            "--output-dir",
            "out",
        ]);
        assert_eq!(cli.config, PathBuf::from("me.json"));
        assert!(cli.refresh);
        assert_eq!(cli.output_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn year_table_lists_every_year() {
        let summaries = BTreeMap::from([(
            YearLabel::Junior,
            YearSummary {
                amount: 12.5,
                count: 3,
            },
        )]);
        let rendered = year_table(&summaries).to_string();
        for label in YearLabel::ALL {
            assert!(rendered.contains(label.as_str()));
        }
        assert!(rendered.contains("12.50"));
    }

    #[test]
    fn print_year_table_with_skips() {
        let skipped = SkipCounts {
            missing_amount: 2,
            missing_merchant: 1,
        };
        assert!(print_year_table(&BTreeMap::new(), &skipped).is_ok());
    }

    #[test]
    fn print_missing_years_works() {
        assert!(print_missing_years(&[YearLabel::Freshman, YearLabel::Senior]).is_ok());
    }

    #[test]
    fn make_spinner_creates_spinner() {
        let spinner = make_spinner("Testing...");
        spinner.finish_and_clear();
    }

    #[test]
    fn report_fails_without_drawing_when_a_year_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let partial = aggregation(vec![
            (YearLabel::Freshman, vec![("Canteen", 10.0)]),
            (YearLabel::Sophomore, vec![]),
            (YearLabel::Junior, vec![("Shop", 3.0)]),
            (YearLabel::Senior, vec![("Canteen", 1.0)]),
        ]);

        let code = report(&partial, &settings).unwrap();
        assert_eq!(code, ExitCode::FAILURE);
        assert!(!settings.merchant_chart.exists());
        assert!(!settings.trend_chart.exists());
    }

    #[test]
    fn resolve_session_reads_credential_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        Session::new("2100012345", "ticket").unwrap().save(&path).unwrap();

        let session = resolve_session(&path).unwrap().unwrap();
        if std::env::var_os(cardspend::config::ACCOUNT_ENV).is_none() {
            assert_eq!(session.account(), "2100012345");
        }
    }
}
