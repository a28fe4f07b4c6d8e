//! Auto-apply threshold command implementations

use anyhow::Result;
use tally_core::db::{Database, AUTO_APPLY_THRESHOLD_KEY};

pub fn cmd_threshold_get(db: &Database, fallback_threshold: i32) -> Result<()> {
    let stored = db.get_setting(AUTO_APPLY_THRESHOLD_KEY)?;
    let current = db.auto_apply_threshold_or(fallback_threshold)?;

    println!("🎚️  Auto-apply threshold: {}%", current);
    if stored.is_none() {
        println!("   (from config; change it with: tally threshold set <0-100>)");
    }

    Ok(())
}

pub fn cmd_threshold_set(db: &Database, value: i32) -> Result<()> {
    db.set_auto_apply_threshold(value)?;
    println!("✅ Auto-apply threshold set to {}%", value);
    Ok(())
}
