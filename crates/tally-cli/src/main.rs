//! Tally CLI - Transaction categorization that learns from corrections
//!
//! Usage:
//!   tally init                          Initialize database
//!   tally rules add PATTERN CATEGORY    Add a categorization rule
//!   tally suggest TX --apply            Suggest (and maybe apply) a category
//!   tally correct TX CATEGORY           Correct a category and learn from it
//!   tally coverage                      Dry-run rules and patterns on the backlog

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use clap::Parser;
use tally_core::Config;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load config")?;

    let db_path = cli.db.clone().unwrap_or_else(|| config.database.clone());
    let user_id = cli.user.unwrap_or(config.user_id);
    let threshold = config.auto_apply_threshold;
    debug!(
        "Using database {} for user {} (config threshold {}%)",
        db_path.display(),
        user_id,
        threshold
    );

    if let Commands::Init = cli.command {
        return commands::cmd_init(&db_path, cli.no_encrypt);
    }

    let db = commands::open_db(&db_path, cli.no_encrypt)?;

    match cli.command {
        Commands::Init => Ok(()),
        Commands::Categories { action } => match action {
            None | Some(CategoriesAction::List) => commands::cmd_categories_list(&db, user_id),
            Some(CategoriesAction::Add { name }) => {
                commands::cmd_categories_add(&db, user_id, &name)
            }
        },
        Commands::Transactions { action } => match action {
            None => commands::cmd_transactions_list(&db, user_id, 20, false),
            Some(TransactionsAction::List {
                limit,
                uncategorized,
            }) => commands::cmd_transactions_list(&db, user_id, limit, uncategorized),
            Some(TransactionsAction::Add {
                date,
                description,
                amount,
                category,
            }) => commands::cmd_transactions_add(
                &db,
                user_id,
                &date,
                &description,
                amount,
                category,
            ),
        },
        Commands::Rules { action } => match action {
            None => commands::cmd_rules_list(&db, user_id, false),
            Some(RulesAction::List { all }) => commands::cmd_rules_list(&db, user_id, all),
            Some(RulesAction::Add {
                pattern,
                category_id,
                priority,
            }) => commands::cmd_rules_add(&db, user_id, &pattern, category_id, priority),
            Some(RulesAction::Archive { id }) => commands::cmd_rules_archive(&db, id),
            Some(RulesAction::Unarchive { id }) => commands::cmd_rules_unarchive(&db, id),
            Some(RulesAction::Enable { id }) => commands::cmd_rules_enable(&db, id),
            Some(RulesAction::Disable { id }) => commands::cmd_rules_disable(&db, id),
            Some(RulesAction::Priority { id, priority }) => {
                commands::cmd_rules_priority(&db, id, priority)
            }
            Some(RulesAction::Reorder { ids }) => commands::cmd_rules_reorder(&db, user_id, &ids),
            Some(RulesAction::Test { description }) => {
                commands::cmd_rules_test(&db, user_id, &description)
            }
            Some(RulesAction::Overlaps) => commands::cmd_rules_overlaps(&db, user_id),
        },
        Commands::Suggest {
            transaction_id,
            description,
            apply,
        } => commands::cmd_suggest(
            &db,
            user_id,
            threshold,
            transaction_id,
            description.as_deref(),
            apply,
        ),
        Commands::Correct {
            transaction_id,
            category_id,
            correction_type,
            confidence,
        } => commands::cmd_correct(
            &db,
            user_id,
            transaction_id,
            category_id,
            correction_type.as_deref(),
            confidence,
        ),
        Commands::Patterns { action } => match action {
            None => commands::cmd_patterns_list(&db, user_id, false),
            Some(PatternsAction::List { all }) => commands::cmd_patterns_list(&db, user_id, all),
            Some(PatternsAction::Top { limit }) => commands::cmd_patterns_top(&db, user_id, limit),
            Some(PatternsAction::Underperforming {
                min_confidence,
                min_occurrences,
            }) => commands::cmd_patterns_underperforming(
                &db,
                user_id,
                min_confidence,
                min_occurrences,
            ),
            Some(PatternsAction::Reset { category }) => {
                commands::cmd_patterns_reset(&db, user_id, category)
            }
            Some(PatternsAction::Penalize { id, amount }) => {
                commands::cmd_patterns_penalize(&db, id, amount)
            }
            Some(PatternsAction::Promote { id, priority }) => {
                commands::cmd_patterns_promote(&db, id, priority)
            }
            Some(PatternsAction::Stats { json }) => {
                commands::cmd_patterns_stats(&db, user_id, json)
            }
        },
        Commands::Coverage { from, to, json } => commands::cmd_coverage(
            &db,
            user_id,
            threshold,
            from.as_deref(),
            to.as_deref(),
            json,
        ),
        Commands::Threshold { action } => match action {
            None | Some(ThresholdAction::Get) => commands::cmd_threshold_get(&db, threshold),
            Some(ThresholdAction::Set { value }) => commands::cmd_threshold_set(&db, value),
        },
    }
}
