//! Suggestion and correction command implementations

use anyhow::{Context, Result};
use tally_core::db::Database;
use tally_core::models::{
    CorrectionType, Suggestion, SuggestionLog, SuggestionOutcome, Transaction,
};
use tally_core::{
    parse_correction_type, CorrectionLearner, PatternMaintainer, SettingsThreshold,
    SuggestionEngine,
};

use super::category_label;

fn load_transaction(db: &Database, user_id: i64, transaction_id: i64) -> Result<Transaction> {
    let tx = db
        .get_transaction(transaction_id)?
        .ok_or_else(|| anyhow::anyhow!("Transaction {} not found", transaction_id))?;

    if let Some(owner) = tx.user_id {
        if owner != user_id {
            anyhow::bail!(
                "Transaction {} belongs to user {}, not user {}",
                transaction_id,
                owner,
                user_id
            );
        }
    }

    Ok(tx)
}

fn print_suggestion(db: &Database, suggestion: &Suggestion, threshold: i32) -> Result<()> {
    let Some(category_id) = suggestion.category_id else {
        println!("   🤷 No suggestion: no rule or confident pattern matches");
        return Ok(());
    };

    let source = suggestion
        .source
        .map(|s| s.as_str())
        .unwrap_or("unknown");

    println!("   💡 {}", category_label(db, category_id)?);
    println!("      Confidence: {}%", suggestion.confidence);
    println!("      Source:     {}", source);
    println!("      Matched:    {}", suggestion.matched_keywords.join(", "));
    if suggestion.auto_apply {
        println!("      Auto-apply: yes (threshold {}%)", threshold);
    } else {
        println!("      Auto-apply: no (threshold {}%)", threshold);
    }

    Ok(())
}

pub fn cmd_suggest(
    db: &Database,
    user_id: i64,
    fallback_threshold: i32,
    transaction_id: Option<i64>,
    description: Option<&str>,
    apply: bool,
) -> Result<()> {
    let threshold = SettingsThreshold::new(db, fallback_threshold);
    let engine = SuggestionEngine::new(db, &threshold);
    let current_threshold = db.auto_apply_threshold_or(fallback_threshold)?;

    let Some(transaction_id) = transaction_id else {
        let description = description
            .ok_or_else(|| anyhow::anyhow!("Provide a transaction ID or --description"))?;
        let suggestion = engine.suggest(&Transaction::preview(user_id, description))?;

        println!();
        println!("🔍 \"{}\"", description);
        return print_suggestion(db, &suggestion, current_threshold);
    };

    let tx = load_transaction(db, user_id, transaction_id)?;
    let suggestion = engine.suggest(&tx)?;

    println!();
    println!("🔍 Transaction #{}: {} \"{}\"", tx.id, tx.date, tx.description);
    if let Some(current) = tx.category_id {
        println!("   Current category: {}", category_label(db, current)?);
    }
    print_suggestion(db, &suggestion, current_threshold)?;

    if suggestion.is_empty() {
        return Ok(());
    }

    let applying = apply && suggestion.auto_apply;
    let mut entry = SuggestionLog::from_suggestion(user_id, tx.id, &suggestion);
    entry.auto_applied = applying;
    let log_id = db.log_suggestion(&entry)?;

    if applying {
        db.set_transaction_category(tx.id, suggestion.category_id)?;
        db.resolve_suggestion(log_id, SuggestionOutcome::Accepted)?;
        println!();
        println!("✅ Applied to transaction #{}", tx.id);
    } else if apply {
        println!();
        println!(
            "   Not applied: confidence {}% is below the {}% threshold",
            suggestion.confidence, current_threshold
        );
        println!(
            "   Confirm or fix it with: tally correct {} <category-id>",
            tx.id
        );
    }

    Ok(())
}

/// Correction type implied by the last pending suggestion for a transaction
pub fn infer_correction_type(pending: Option<&SuggestionLog>, category_id: i64) -> CorrectionType {
    match pending {
        Some(log) if log.auto_applied && log.suggested_category_id != Some(category_id) => {
            CorrectionType::AutoToManual
        }
        Some(log)
            if log.suggested_category_id.is_some()
                && log.suggested_category_id != Some(category_id) =>
        {
            CorrectionType::WrongAutoChoice
        }
        _ => CorrectionType::MissingCategory,
    }
}

pub fn cmd_correct(
    db: &Database,
    user_id: i64,
    transaction_id: i64,
    category_id: i64,
    correction_type: Option<&str>,
    confidence: Option<i32>,
) -> Result<()> {
    let tx = load_transaction(db, user_id, transaction_id)?;
    db.get_category(category_id)?
        .ok_or_else(|| anyhow::anyhow!("Category {} not found", category_id))?;

    let pending = match db.latest_pending_suggestion(tx.id)? {
        Some(log_id) => db.get_suggestion_log(log_id)?,
        None => None,
    };

    let correction_type = match correction_type {
        Some(value) => parse_correction_type(value)?,
        None => infer_correction_type(pending.as_ref(), category_id),
    };
    let confidence = confidence.or(pending.as_ref().map(|log| log.confidence));

    let outcome = CorrectionLearner::new(db)
        .learn_from_correction(&tx, category_id, correction_type, confidence)
        .context("Failed to learn from correction")?;
    db.set_transaction_category(tx.id, Some(category_id))?;

    println!(
        "✅ Transaction #{} -> {} ({})",
        tx.id,
        category_label(db, category_id)?,
        correction_type
    );
    println!(
        "   Learned: {} new patterns, {} reinforced",
        outcome.patterns_created(),
        outcome.patterns_reinforced()
    );

    if let Some(log) = pending {
        if log.suggested_category_id == Some(category_id) {
            db.resolve_suggestion(log.id, SuggestionOutcome::Accepted)?;
        } else {
            db.resolve_suggestion(log.id, SuggestionOutcome::Rejected)?;

            let rejected = Suggestion {
                category_id: log.suggested_category_id,
                confidence: log.confidence,
                matched_keywords: log.matched_keywords.clone(),
                source: log.source,
                auto_apply: log.auto_applied,
            };
            let penalized =
                PatternMaintainer::new(db).reject_learned_suggestion(user_id, &rejected)?;
            for pattern in penalized {
                let state = if pattern.active { "" } else { " (disabled)" };
                println!(
                    "   📉 Pattern '{}' -> {}%{}",
                    pattern.keyword, pattern.confidence, state
                );
            }
        }
    }

    Ok(())
}
