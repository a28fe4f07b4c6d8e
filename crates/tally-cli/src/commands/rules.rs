//! Rule command implementations

use anyhow::Result;
use tally_core::db::Database;
use tally_core::{OverlapAnalyzer, RuleMatcher};

use super::{category_label, truncate};

pub fn cmd_rules_list(db: &Database, user_id: i64, include_archived: bool) -> Result<()> {
    let rules = db.list_rules(user_id, include_archived)?;

    if rules.is_empty() {
        println!("No rules defined. Add one with:");
        println!("  tally rules add <pattern> <category-id> [--priority N]");
        return Ok(());
    }

    println!();
    println!("📋 Categorization Rules (evaluation order)");
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:>4} │ {:>4} │ {:30} │ {:24} │ {}",
        "ID", "Pri", "Pattern", "Category", "State"
    );
    println!("   ─────┼──────┼────────────────────────────────┼──────────────────────────┼──────────");

    for rule in rules {
        let state = if rule.archived {
            "archived"
        } else if !rule.active {
            "inactive"
        } else {
            "active"
        };

        println!(
            "   {:>4} │ {:>4} │ {:30} │ {:24} │ {}",
            rule.id,
            rule.priority,
            truncate(&rule.pattern, 30),
            truncate(&category_label(db, rule.category_id)?, 24),
            state
        );
    }

    Ok(())
}

pub fn cmd_rules_add(
    db: &Database,
    user_id: i64,
    pattern: &str,
    category_id: i64,
    priority: i32,
) -> Result<()> {
    db.get_category(category_id)?
        .ok_or_else(|| anyhow::anyhow!("Category {} not found", category_id))?;

    // Warn before creating so the new rule is not reported against itself
    let overlapping = OverlapAnalyzer::new(db).overlaps_for_pattern(user_id, pattern)?;

    let rule_id = db.create_rule(user_id, pattern, category_id, priority)?;
    println!(
        "✅ Created rule #{}: \"{}\" -> {} (priority {})",
        rule_id,
        pattern.trim(),
        category_label(db, category_id)?,
        priority
    );

    if !overlapping.is_empty() {
        println!();
        println!("   ⚠️  This rule overlaps with:");
        for rule in overlapping {
            println!(
                "      Rule #{} \"{}\" (priority {})",
                rule.id, rule.pattern, rule.priority
            );
        }
        println!("   Only the rule with the lowest priority number will match.");
    }

    Ok(())
}

pub fn cmd_rules_archive(db: &Database, id: i64) -> Result<()> {
    db.archive_rule(id)?;
    println!("✅ Archived rule #{}", id);
    Ok(())
}

pub fn cmd_rules_unarchive(db: &Database, id: i64) -> Result<()> {
    db.unarchive_rule(id)?;
    println!("✅ Restored rule #{}", id);
    Ok(())
}

pub fn cmd_rules_enable(db: &Database, id: i64) -> Result<()> {
    db.set_rule_active(id, true)?;
    println!("✅ Enabled rule #{}", id);
    Ok(())
}

pub fn cmd_rules_disable(db: &Database, id: i64) -> Result<()> {
    db.set_rule_active(id, false)?;
    println!("⏸️  Disabled rule #{}", id);
    Ok(())
}

pub fn cmd_rules_priority(db: &Database, id: i64, priority: i32) -> Result<()> {
    db.update_rule_priority(id, priority)?;
    println!("✅ Rule #{} priority set to {}", id, priority);
    Ok(())
}

pub fn cmd_rules_reorder(db: &Database, user_id: i64, ids: &[i64]) -> Result<()> {
    db.reorder_rules(user_id, ids)?;
    println!("✅ Reordered {} rules", ids.len());
    Ok(())
}

pub fn cmd_rules_test(db: &Database, user_id: i64, description: &str) -> Result<()> {
    let matches = RuleMatcher::new(db).matching_rules(user_id, description)?;

    if matches.is_empty() {
        println!("No rules match \"{}\"", description);
        return Ok(());
    }

    println!();
    println!("🔍 Rules matching \"{}\":", description);
    println!("   ─────────────────────────────────────────────────────────────");

    for (i, rule) in matches.iter().enumerate() {
        let marker = if i == 0 { "→" } else { " " };
        println!(
            "   {} Rule #{} (priority {}) -> {} (\"{}\")",
            marker,
            rule.id,
            rule.priority,
            category_label(db, rule.category_id)?,
            rule.pattern
        );
    }

    if matches.len() > 1 {
        println!();
        println!("   Only the first rule is applied.");
    }

    Ok(())
}

pub fn cmd_rules_overlaps(db: &Database, user_id: i64) -> Result<()> {
    let overlaps = OverlapAnalyzer::new(db).detect_overlaps(user_id)?;

    if overlaps.is_empty() {
        println!("✅ No overlapping rules");
        return Ok(());
    }

    println!();
    println!("⚠️  Overlapping Rules ({})", overlaps.len());
    println!("   ─────────────────────────────────────────────────────────────");

    for overlap in &overlaps {
        println!(
            "   #{} \"{}\" (priority {})  ↔  #{} \"{}\" (priority {})",
            overlap.first_rule_id,
            overlap.first_pattern,
            overlap.first_priority,
            overlap.second_rule_id,
            overlap.second_pattern,
            overlap.second_priority
        );
    }

    println!();
    println!("   {}", overlaps[0].message);

    Ok(())
}
