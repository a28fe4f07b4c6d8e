//! Transaction command implementations

use anyhow::Result;
use tally_core::db::Database;
use tally_core::models::NewTransaction;

use super::{category_label, parse_date, truncate};

pub fn cmd_transactions_list(
    db: &Database,
    user_id: i64,
    limit: i64,
    uncategorized_only: bool,
) -> Result<()> {
    let transactions = db.list_transactions(user_id, uncategorized_only, limit)?;

    if transactions.is_empty() {
        if uncategorized_only {
            println!("Nothing left to categorize.");
        } else {
            println!("No transactions found. Add one with:");
            println!("  tally transactions add 2024-01-15 \"WHOLE FOODS #123\" -- -42.10");
        }
        return Ok(());
    }

    println!();
    if uncategorized_only {
        println!("📝 Uncategorized Transactions");
    } else {
        println!("📝 Recent Transactions");
    }
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in transactions {
        let amount_str = if tx.amount < 0.0 {
            format!("\x1b[31m${:.2}\x1b[0m", tx.amount.abs()) // Red for expenses
        } else {
            format!("\x1b[32m+${:.2}\x1b[0m", tx.amount) // Green for income
        };

        let category = match tx.category_id {
            Some(id) => category_label(db, id)?,
            None => "-".to_string(),
        };

        println!(
            "   [{}] {} │ {:>10} │ {:<40} │ {}",
            tx.id,
            tx.date,
            amount_str,
            truncate(&tx.description, 40),
            category
        );
    }

    Ok(())
}

pub fn cmd_transactions_add(
    db: &Database,
    user_id: i64,
    date: &str,
    description: &str,
    amount: f64,
    category_id: Option<i64>,
) -> Result<()> {
    let date = parse_date(date)?;

    if let Some(id) = category_id {
        db.get_category(id)?
            .ok_or_else(|| anyhow::anyhow!("Category {} not found", id))?;
    }

    let id = db.insert_transaction(&NewTransaction {
        user_id,
        date,
        description: description.to_string(),
        amount,
        category_id,
    })?;

    println!("✅ Added transaction #{}: {} {}", id, date, description);
    if category_id.is_none() {
        println!("   Get a suggestion with: tally suggest {}", id);
    }

    Ok(())
}
