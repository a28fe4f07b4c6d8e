//! Learned pattern command implementations

use anyhow::Result;
use tally_core::db::Database;
use tally_core::models::LearnedCategoryPattern;
use tally_core::PatternMaintainer;

use super::{category_label, truncate};

fn print_pattern_table(db: &Database, patterns: &[LearnedCategoryPattern]) -> Result<()> {
    println!(
        "   {:>4} │ {:20} │ {:24} │ {:>5} │ {:>5} │ {}",
        "ID", "Keyword", "Category", "Conf", "Seen", "State"
    );
    println!("   ─────┼──────────────────────┼──────────────────────────┼───────┼───────┼─────────");

    for p in patterns {
        println!(
            "   {:>4} │ {:20} │ {:24} │ {:>4}% │ {:>5} │ {}",
            p.id,
            truncate(&p.keyword, 20),
            truncate(&category_label(db, p.category_id)?, 24),
            p.confidence,
            p.occurrence_count,
            if p.active { "active" } else { "disabled" }
        );
    }

    Ok(())
}

pub fn cmd_patterns_list(db: &Database, user_id: i64, include_disabled: bool) -> Result<()> {
    let patterns: Vec<_> = db
        .list_learned_patterns(user_id)?
        .into_iter()
        .filter(|p| include_disabled || p.active)
        .collect();

    if patterns.is_empty() {
        println!("No learned patterns yet. Correct a transaction to start learning:");
        println!("  tally correct <tx-id> <category-id>");
        return Ok(());
    }

    println!();
    println!("🧠 Learned Patterns");
    println!("   ─────────────────────────────────────────────────────────────");
    print_pattern_table(db, &patterns)
}

pub fn cmd_patterns_top(db: &Database, user_id: i64, limit: usize) -> Result<()> {
    let patterns = PatternMaintainer::new(db).top_patterns(user_id, limit)?;

    if patterns.is_empty() {
        println!("No active learned patterns.");
        return Ok(());
    }

    println!();
    println!("🏆 Top {} Patterns", patterns.len());
    println!("   ─────────────────────────────────────────────────────────────");
    print_pattern_table(db, &patterns)
}

pub fn cmd_patterns_underperforming(
    db: &Database,
    user_id: i64,
    min_confidence: i32,
    min_occurrences: i64,
) -> Result<()> {
    let patterns = PatternMaintainer::new(db).underperforming_patterns(
        user_id,
        min_confidence,
        min_occurrences,
    )?;

    if patterns.is_empty() {
        println!(
            "✅ No active patterns below {}% with at least {} observations",
            min_confidence, min_occurrences
        );
        return Ok(());
    }

    println!();
    println!("📉 Underperforming Patterns");
    println!("   ─────────────────────────────────────────────────────────────");
    print_pattern_table(db, &patterns)?;
    println!();
    println!("   Consider penalizing these or replacing them with a rule.");

    Ok(())
}

pub fn cmd_patterns_reset(db: &Database, user_id: i64, category_id: Option<i64>) -> Result<()> {
    let disabled = PatternMaintainer::new(db).reset(user_id, category_id)?;

    match category_id {
        Some(id) => println!(
            "✅ Disabled {} patterns for {}",
            disabled,
            category_label(db, id)?
        ),
        None => println!("✅ Disabled {} patterns", disabled),
    }

    Ok(())
}

pub fn cmd_patterns_penalize(db: &Database, id: i64, amount: i32) -> Result<()> {
    let pattern = PatternMaintainer::new(db).penalize(id, amount)?;

    println!(
        "✅ Pattern #{} '{}' -> {}%",
        pattern.id, pattern.keyword, pattern.confidence
    );
    if !pattern.active {
        println!("   Pattern disabled (confidence below 30%)");
    }

    Ok(())
}

pub fn cmd_patterns_promote(db: &Database, id: i64, priority: i32) -> Result<()> {
    let rule_id = PatternMaintainer::new(db).promote_to_rule(id, priority)?;

    let rule = db
        .get_rule(rule_id)?
        .ok_or_else(|| anyhow::anyhow!("Rule {} not found", rule_id))?;
    println!(
        "✅ Created rule #{}: \"{}\" -> {} (priority {})",
        rule.id,
        rule.pattern,
        category_label(db, rule.category_id)?,
        rule.priority
    );

    Ok(())
}

pub fn cmd_patterns_stats(db: &Database, user_id: i64, json: bool) -> Result<()> {
    let stats = PatternMaintainer::new(db).statistics(user_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    println!("📊 Learning Statistics");
    println!("   ─────────────────────────────────────────────");
    println!(
        "   Patterns:          {} ({} active, {} disabled)",
        stats.total_patterns, stats.active_patterns, stats.disabled_patterns
    );
    println!("   Avg confidence:    {:.2}%", stats.average_confidence);
    println!("   Max confidence:    {}%", stats.max_confidence);
    println!("   Min (active):      {}%", stats.min_active_confidence);
    println!(
        "   Learned this week: {} ({:.2}/day)",
        stats.patterns_learned_this_week, stats.learning_velocity
    );
    println!();
    println!("   Corrections:       {}", stats.total_corrections);
    for entry in &stats.corrections_by_type {
        println!("      {:24} {:>5}", entry.correction_type.as_str(), entry.count);
    }

    Ok(())
}
