/*
 * ghharvest
 *
 * ghharvest is free software; you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation; either version 2 of the License, or
 * (at your option) any later version.
 *
 * ghharvest is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with ghharvest.  If not, see <http://www.gnu.org/licenses/>.
 *
 */

use clap::Parser;
use console::style;
use env_logger::Env;
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;
use log::{debug, error, info, warn};
use std::error::Error;
use std::process::ExitCode;

use ghharvest::error::config_hint;
use ghharvest::harvest::{self, Outcome, RunReport};
use ghharvest::{Config, GithubClient, Opts};

/// Prints a section banner to standard output.
fn print_banner(title: &str) {
    let rule = "=".repeat(60);
    println!("\n{}", style(&rule).cyan());
    println!(" {}", style(title).bold());
    println!("{}", style(&rule).cyan());
}

fn print_summary(report: &RunReport) {
    for entry in &report.kinds {
        match &entry.outcome {
            Outcome::Saved { records, path } => {
                println!(
                    "{} {:<13} {} records -> {}",
                    style("ok").green(),
                    entry.kind.name(),
                    records,
                    path.display()
                )
            }
            Outcome::Failed(err) => {
                println!("{} {:<13} {}", style("failed").red(), entry.kind.name(), err)
            }
            Outcome::Skipped => {
                println!("{} {:<13}", style("skipped").yellow(), entry.kind.name())
            }
        }
    }

    let files = report.files();
    if !files.is_empty() {
        println!("Files created:");
        for file in files {
            println!("- {}", file.display());
        }
    }
}

fn main() -> Result<ExitCode, Box<dyn Error>> {
    // Values from .env must be visible before clap reads GITHUB_TOKEN.
    let dotenv = dotenvy::dotenv();

    // Initialize environment logger with custom configuration
    let env = Env::new()
        .filter_or("RUST_LOG", "info")
        .write_style_or("LOG_STYLE", "auto");
    let logger = env_logger::Builder::from_env(env).build();
    let level = logger.filter();
    let progress = MultiProgress::new();
    LogWrapper::new(progress.clone(), logger).try_init()?;
    log::set_max_level(level);

    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(err) if err.not_found() => debug!("No .env file found"),
        Err(err) => warn!("Ignoring unreadable .env file: {}", err),
    }

    // Parse command line arguments
    let opts = Opts::parse();
    debug!("Command line options parsed");

    let config = match Config::from_opts(opts) {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            if let Some(hint) = config_hint(&err) {
                eprintln!("{}", hint);
            }
            return Ok(ExitCode::from(2));
        }
    };
    debug!("Using configuration {:?}", config);

    print_banner(&format!(
        "Starting data collection from {} repository",
        config.repo
    ));
    match config.max_items {
        None => warn!("No item limit set, ALL data will be fetched. This may take hours."),
        Some(limit) => info!("At most {} items will be fetched for each kind", limit),
    }

    std::fs::create_dir_all(&config.output_dir)?;

    let client = GithubClient::new(&config)?;
    let report = harvest::run(&client, &config, &progress);

    print_banner("Data collection completed");
    print_summary(&report);

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
