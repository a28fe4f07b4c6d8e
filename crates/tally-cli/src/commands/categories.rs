//! Category command implementations

use anyhow::{Context, Result};
use tally_core::db::Database;

pub fn cmd_categories_list(db: &Database, user_id: i64) -> Result<()> {
    let categories = db.list_categories(user_id)?;

    if categories.is_empty() {
        println!("No categories yet. Add one with:");
        println!("  tally categories add Groceries");
        return Ok(());
    }

    println!();
    println!("🗂️  Categories");
    println!("   ─────────────────────────────────────────────");

    for category in categories {
        println!("   [{:>4}] {}", category.id, category.name);
    }

    Ok(())
}

pub fn cmd_categories_add(db: &Database, user_id: i64, name: &str) -> Result<()> {
    let id = db
        .create_category(user_id, name)
        .with_context(|| format!("Failed to create category '{}'", name))?;

    println!("✅ Created category #{}: {}", id, name.trim());
    Ok(())
}
