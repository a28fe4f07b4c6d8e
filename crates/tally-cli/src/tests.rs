//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;

use chrono::NaiveDate;
use tally_core::db::Database;
use tally_core::models::{
    CorrectionType, NewTransaction, SuggestionLog, SuggestionOutcome, SuggestionSource,
};
use tally_core::{Config, CorrectionLog, SuggestionEngine};

use crate::commands::{self, truncate};

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

fn create_test_transaction(db: &Database, description: &str, amount: f64) -> i64 {
    db.insert_transaction(&NewTransaction {
        user_id: 1,
        date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        description: description.to_string(),
        amount,
        category_id: None,
    })
    .unwrap()
}

/// Teach the database that `description` belongs to `category_id`
fn teach(db: &Database, tx_id: i64, category_id: i64, times: usize) {
    for _ in 0..times {
        commands::cmd_correct(db, 1, tx_id, category_id, Some("missing_category"), None).unwrap();
    }
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("this is a long description", 10), "this is...");
    assert_eq!(truncate("café crème brûlée", 8), "café ...");
}

#[test]
fn test_parse_date() {
    assert_eq!(
        commands::parse_date("2024-03-01").unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    );
    assert!(commands::parse_date("03/01/2024").is_err());
}

#[test]
fn test_open_db_unencrypted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tally.db");

    let db = commands::open_db(&path, true).unwrap();
    assert!(db.list_categories(1).unwrap().is_empty());
    assert!(!db.is_encrypted().unwrap());
    assert!(path.exists());
}

#[test]
fn test_config_file_overrides_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "user_id = 7\nauto_apply_threshold = 80").unwrap();

    let config = Config::load_from(file.path()).unwrap();
    assert_eq!(config.user_id, 7);
    assert_eq!(config.auto_apply_threshold, 80);
}

// ========== Category / Transaction Command Tests ==========

#[test]
fn test_cmd_categories_add_and_list() {
    let db = setup_test_db();
    assert!(commands::cmd_categories_add(&db, 1, "Groceries").is_ok());
    assert!(commands::cmd_categories_list(&db, 1).is_ok());

    let categories = db.list_categories(1).unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].name, "Groceries");
}

#[test]
fn test_cmd_categories_add_blank_fails() {
    let db = setup_test_db();
    assert!(commands::cmd_categories_add(&db, 1, "   ").is_err());
}

#[test]
fn test_cmd_transactions_add_and_list() {
    let db = setup_test_db();
    let result =
        commands::cmd_transactions_add(&db, 1, "2024-02-01", "TRADER JOES #552", -31.2, None);
    assert!(result.is_ok());

    assert!(commands::cmd_transactions_list(&db, 1, 20, false).is_ok());
    assert!(commands::cmd_transactions_list(&db, 1, 20, true).is_ok());

    let txs = db.list_transactions(1, true, 20).unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].description, "TRADER JOES #552");
}

#[test]
fn test_cmd_transactions_add_unknown_category_fails() {
    let db = setup_test_db();
    let result =
        commands::cmd_transactions_add(&db, 1, "2024-02-01", "TRADER JOES", -31.2, Some(999));
    assert!(result.is_err());
    assert!(db.list_transactions(1, false, 20).unwrap().is_empty());
}

#[test]
fn test_cmd_transactions_add_bad_date_fails() {
    let db = setup_test_db();
    let result = commands::cmd_transactions_add(&db, 1, "yesterday", "TRADER JOES", -1.0, None);
    assert!(result.is_err());
}

// ========== Rules Command Tests ==========

#[test]
fn test_cmd_rules_add_and_list() {
    let db = setup_test_db();
    let groceries = db.create_category(1, "Groceries").unwrap();

    assert!(commands::cmd_rules_add(&db, 1, "whole foods", groceries, 10).is_ok());
    assert!(commands::cmd_rules_list(&db, 1, false).is_ok());

    let rules = db.list_rules(1, false).unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].pattern, "whole foods");
    assert_eq!(rules[0].priority, 10);
}

#[test]
fn test_cmd_rules_add_overlapping_still_creates() {
    let db = setup_test_db();
    let groceries = db.create_category(1, "Groceries").unwrap();

    commands::cmd_rules_add(&db, 1, "whole foods", groceries, 10).unwrap();
    assert!(commands::cmd_rules_add(&db, 1, "foods", groceries, 20).is_ok());
    assert_eq!(db.list_rules(1, false).unwrap().len(), 2);
}

#[test]
fn test_cmd_rules_add_unknown_category_fails() {
    let db = setup_test_db();
    assert!(commands::cmd_rules_add(&db, 1, "netflix", 42, 10).is_err());
    assert!(db.list_rules(1, true).unwrap().is_empty());
}

#[test]
fn test_cmd_rules_archive_unarchive() {
    let db = setup_test_db();
    let groceries = db.create_category(1, "Groceries").unwrap();
    let id = db.create_rule(1, "safeway", groceries, 10).unwrap();

    assert!(commands::cmd_rules_archive(&db, id).is_ok());
    assert!(db.get_rule(id).unwrap().unwrap().archived);
    assert!(db.list_rules(1, false).unwrap().is_empty());

    assert!(commands::cmd_rules_unarchive(&db, id).is_ok());
    assert!(!db.get_rule(id).unwrap().unwrap().archived);
}

#[test]
fn test_cmd_rules_archive_missing_fails() {
    let db = setup_test_db();
    assert!(commands::cmd_rules_archive(&db, 999).is_err());
}

#[test]
fn test_cmd_rules_disable_enable() {
    let db = setup_test_db();
    let streaming = db.create_category(1, "Streaming").unwrap();
    let id = db.create_rule(1, "netflix", streaming, 10).unwrap();

    assert!(commands::cmd_rules_disable(&db, id).is_ok());
    let rule = db.get_rule(id).unwrap().unwrap();
    assert!(!rule.active);
    assert!(!rule.archived);
    let suggestion = SuggestionEngine::new(&db, &db)
        .suggest_for_description(1, "NETFLIX.COM")
        .unwrap();
    assert_eq!(suggestion.category_id, None);

    assert!(commands::cmd_rules_enable(&db, id).is_ok());
    assert!(db.get_rule(id).unwrap().unwrap().active);
    let suggestion = SuggestionEngine::new(&db, &db)
        .suggest_for_description(1, "NETFLIX.COM")
        .unwrap();
    assert_eq!(suggestion.category_id, Some(streaming));
}

#[test]
fn test_cmd_rules_enable_disable_missing_fails() {
    let db = setup_test_db();
    assert!(commands::cmd_rules_enable(&db, 999).is_err());
    assert!(commands::cmd_rules_disable(&db, 999).is_err());
}

#[test]
fn test_cmd_rules_priority() {
    let db = setup_test_db();
    let shopping = db.create_category(1, "Shopping").unwrap();
    let prime = db.create_category(1, "Subscriptions").unwrap();
    db.create_rule(1, "amazon", shopping, 10).unwrap();
    let specific = db.create_rule(1, "amazon prime", prime, 50).unwrap();

    let before = SuggestionEngine::new(&db, &db)
        .suggest_for_description(1, "AMAZON PRIME VIDEO")
        .unwrap();
    assert_eq!(before.category_id, Some(shopping));

    assert!(commands::cmd_rules_priority(&db, specific, 5).is_ok());
    assert_eq!(db.get_rule(specific).unwrap().unwrap().priority, 5);

    let after = SuggestionEngine::new(&db, &db)
        .suggest_for_description(1, "AMAZON PRIME VIDEO")
        .unwrap();
    assert_eq!(after.category_id, Some(prime));

    assert!(commands::cmd_rules_priority(&db, 999, 5).is_err());
}

#[test]
fn test_cmd_rules_reorder() {
    let db = setup_test_db();
    let cat = db.create_category(1, "Shopping").unwrap();
    let a = db.create_rule(1, "amazon", cat, 10).unwrap();
    let b = db.create_rule(1, "target", cat, 20).unwrap();

    assert!(commands::cmd_rules_reorder(&db, 1, &[b, a]).is_ok());

    let rules = db.list_rules(1, false).unwrap();
    assert_eq!(rules[0].id, b);
    assert_eq!(rules[1].id, a);
}

#[test]
fn test_cmd_rules_test_and_overlaps() {
    let db = setup_test_db();
    let cat = db.create_category(1, "Shopping").unwrap();
    db.create_rule(1, "amazon", cat, 10).unwrap();
    db.create_rule(1, "amazon prime", cat, 20).unwrap();

    assert!(commands::cmd_rules_test(&db, 1, "AMAZON PRIME VIDEO").is_ok());
    assert!(commands::cmd_rules_test(&db, 1, "nothing here").is_ok());
    assert!(commands::cmd_rules_overlaps(&db, 1).is_ok());
}

// ========== Suggest / Correct Command Tests ==========

#[test]
fn test_cmd_suggest_apply_from_rule() {
    let db = setup_test_db();
    let streaming = db.create_category(1, "Streaming").unwrap();
    db.create_rule(1, "netflix", streaming, 10).unwrap();
    let tx_id = create_test_transaction(&db, "NETFLIX.COM", -15.49);

    assert!(commands::cmd_suggest(&db, 1, 90, Some(tx_id), None, true).is_ok());

    let tx = db.get_transaction(tx_id).unwrap().unwrap();
    assert_eq!(tx.category_id, Some(streaming));

    // Applied suggestions are resolved, so nothing is pending
    assert!(db.latest_pending_suggestion(tx_id).unwrap().is_none());
}

#[test]
fn test_cmd_suggest_respects_live_threshold() {
    let db = setup_test_db();
    let streaming = db.create_category(1, "Streaming").unwrap();
    db.create_rule(1, "netflix", streaming, 10).unwrap();
    let tx_id = create_test_transaction(&db, "NETFLIX.COM", -15.49);

    // Nothing reaches a threshold above 100
    db.set_setting("auto_apply_threshold", "101").unwrap();

    assert!(commands::cmd_suggest(&db, 1, 90, Some(tx_id), None, true).is_ok());

    let tx = db.get_transaction(tx_id).unwrap().unwrap();
    assert_eq!(tx.category_id, None);

    let log_id = db.latest_pending_suggestion(tx_id).unwrap().unwrap();
    let log = db.get_suggestion_log(log_id).unwrap().unwrap();
    assert!(!log.auto_applied);
    assert_eq!(log.suggested_category_id, Some(streaming));
}

#[test]
fn test_cmd_suggest_without_apply_only_logs() {
    let db = setup_test_db();
    let streaming = db.create_category(1, "Streaming").unwrap();
    db.create_rule(1, "hulu", streaming, 10).unwrap();
    let tx_id = create_test_transaction(&db, "HULU", -7.99);

    assert!(commands::cmd_suggest(&db, 1, 90, Some(tx_id), None, false).is_ok());

    assert_eq!(db.get_transaction(tx_id).unwrap().unwrap().category_id, None);
    let log_id = db.latest_pending_suggestion(tx_id).unwrap().unwrap();
    let log = db.get_suggestion_log(log_id).unwrap().unwrap();
    assert_eq!(log.outcome, SuggestionOutcome::Pending);
    assert_eq!(log.source, Some(SuggestionSource::RuleExact));
}

#[test]
fn test_cmd_suggest_description_does_not_log() {
    let db = setup_test_db();
    let streaming = db.create_category(1, "Streaming").unwrap();
    db.create_rule(1, "spotify", streaming, 10).unwrap();

    assert!(commands::cmd_suggest(&db, 1, 90, None, Some("SPOTIFY USA"), false).is_ok());
    assert!(commands::cmd_suggest(&db, 1, 90, None, None, false).is_err());
}

#[test]
fn test_cmd_suggest_other_users_transaction_fails() {
    let db = setup_test_db();
    let tx_id = create_test_transaction(&db, "NETFLIX", -15.49);
    assert!(commands::cmd_suggest(&db, 2, 90, Some(tx_id), None, false).is_err());
}

#[test]
fn test_cmd_correct_learns_and_categorizes() {
    let db = setup_test_db();
    let coffee = db.create_category(1, "Coffee").unwrap();
    let tx_id = create_test_transaction(&db, "BLUE BOTTLE COFFEE", -5.5);

    assert!(commands::cmd_correct(&db, 1, tx_id, coffee, None, None).is_ok());

    assert_eq!(
        db.get_transaction(tx_id).unwrap().unwrap().category_id,
        Some(coffee)
    );

    let patterns = db.list_learned_patterns(1).unwrap();
    assert_eq!(patterns.len(), 3);
    assert!(patterns.iter().all(|p| p.confidence == 55));

    let counts = db.correction_counts_by_type(1).unwrap();
    assert_eq!(counts, vec![(CorrectionType::MissingCategory, 1)]);
}

#[test]
fn test_cmd_correct_rejects_learned_suggestion() {
    let db = setup_test_db();
    let dining = db.create_category(1, "Dining").unwrap();
    let coffee = db.create_category(1, "Coffee").unwrap();

    let tx_id = create_test_transaction(&db, "SQUARE", -4.0);
    teach(&db, tx_id, dining, 5);

    let next = create_test_transaction(&db, "SQUARE", -6.0);
    commands::cmd_suggest(&db, 1, 90, Some(next), None, false).unwrap();

    let log_id = db.latest_pending_suggestion(next).unwrap().unwrap();
    assert!(commands::cmd_correct(&db, 1, next, coffee, None, None).is_ok());

    let log = db.get_suggestion_log(log_id).unwrap().unwrap();
    assert_eq!(log.outcome, SuggestionOutcome::Rejected);

    // 75 for dining, penalized once
    let square_dining = db
        .list_learned_patterns(1)
        .unwrap()
        .into_iter()
        .find(|p| p.keyword == "square" && p.category_id == dining)
        .unwrap();
    assert_eq!(square_dining.confidence, 65);

    let counts = db.correction_counts_by_type(1).unwrap();
    assert!(counts.contains(&(CorrectionType::WrongAutoChoice, 1)));
    assert!(counts.contains(&(CorrectionType::MissingCategory, 5)));
}

#[test]
fn test_cmd_correct_accepts_matching_suggestion() {
    let db = setup_test_db();
    let streaming = db.create_category(1, "Streaming").unwrap();
    db.create_rule(1, "netflix", streaming, 10).unwrap();
    let tx_id = create_test_transaction(&db, "NETFLIX", -15.49);

    commands::cmd_suggest(&db, 1, 90, Some(tx_id), None, false).unwrap();
    let log_id = db.latest_pending_suggestion(tx_id).unwrap().unwrap();

    assert!(commands::cmd_correct(&db, 1, tx_id, streaming, None, None).is_ok());
    let log = db.get_suggestion_log(log_id).unwrap().unwrap();
    assert_eq!(log.outcome, SuggestionOutcome::Accepted);
}

#[test]
fn test_cmd_correct_invalid_type_fails() {
    let db = setup_test_db();
    let coffee = db.create_category(1, "Coffee").unwrap();
    let tx_id = create_test_transaction(&db, "PEETS", -3.0);

    assert!(commands::cmd_correct(&db, 1, tx_id, coffee, Some("bogus"), None).is_err());
    assert!(db.list_learned_patterns(1).unwrap().is_empty());
}

#[test]
fn test_infer_correction_type() {
    let auto_applied = SuggestionLog {
        id: 1,
        user_id: 1,
        transaction_id: 1,
        suggested_category_id: Some(2),
        confidence: 95,
        matched_keywords: vec!["netflix".to_string()],
        source: Some(SuggestionSource::LearnedKeyword),
        auto_applied: true,
        outcome: SuggestionOutcome::Pending,
        created_at: chrono::Utc::now(),
    };
    assert_eq!(
        commands::infer_correction_type(Some(&auto_applied), 3),
        CorrectionType::AutoToManual
    );

    let suggested = SuggestionLog {
        auto_applied: false,
        ..auto_applied.clone()
    };
    assert_eq!(
        commands::infer_correction_type(Some(&suggested), 3),
        CorrectionType::WrongAutoChoice
    );
    assert_eq!(
        commands::infer_correction_type(Some(&suggested), 2),
        CorrectionType::MissingCategory
    );
    assert_eq!(
        commands::infer_correction_type(None, 3),
        CorrectionType::MissingCategory
    );
}

// ========== Pattern Command Tests ==========

#[test]
fn test_cmd_patterns_listing_commands() {
    let db = setup_test_db();
    let coffee = db.create_category(1, "Coffee").unwrap();
    let tx_id = create_test_transaction(&db, "BLUE BOTTLE", -5.5);
    teach(&db, tx_id, coffee, 6);

    assert!(commands::cmd_patterns_list(&db, 1, false).is_ok());
    assert!(commands::cmd_patterns_list(&db, 1, true).is_ok());
    assert!(commands::cmd_patterns_top(&db, 1, 5).is_ok());
    assert!(commands::cmd_patterns_underperforming(&db, 1, 90, 5).is_ok());
    assert!(commands::cmd_patterns_stats(&db, 1, false).is_ok());
    assert!(commands::cmd_patterns_stats(&db, 1, true).is_ok());
}

#[test]
fn test_cmd_patterns_penalize_and_reset() {
    let db = setup_test_db();
    let coffee = db.create_category(1, "Coffee").unwrap();
    let tx_id = create_test_transaction(&db, "PHILZ", -5.5);
    teach(&db, tx_id, coffee, 1);

    let pattern = db.list_learned_patterns(1).unwrap().remove(0);
    assert_eq!(pattern.confidence, 55);

    assert!(commands::cmd_patterns_penalize(&db, pattern.id, 30).is_ok());
    let penalized = db.get_learned_pattern(pattern.id).unwrap().unwrap();
    assert_eq!(penalized.confidence, 25);
    assert!(!penalized.active);

    assert!(commands::cmd_patterns_penalize(&db, 999, 10).is_err());
    assert!(commands::cmd_patterns_penalize(&db, pattern.id, -5).is_err());

    assert!(commands::cmd_patterns_reset(&db, 1, None).is_ok());
    assert!(commands::cmd_patterns_reset(&db, 1, Some(coffee)).is_ok());
}

#[test]
fn test_cmd_patterns_promote() {
    let db = setup_test_db();
    let coffee = db.create_category(1, "Coffee").unwrap();
    let tx_id = create_test_transaction(&db, "PHILZ", -5.5);
    teach(&db, tx_id, coffee, 1);

    let pattern = db.list_learned_patterns(1).unwrap().remove(0);
    assert!(commands::cmd_patterns_promote(&db, pattern.id, 15).is_ok());

    let rules = db.list_rules(1, false).unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].pattern, "philz");
    assert_eq!(rules[0].priority, 15);

    let suggestion = SuggestionEngine::new(&db, &db)
        .suggest_for_description(1, "PHILZ COFFEE")
        .unwrap();
    assert_eq!(suggestion.category_id, Some(coffee));
}

// ========== Coverage / Threshold Command Tests ==========

#[test]
fn test_cmd_coverage() {
    let db = setup_test_db();
    let cat = db.create_category(1, "Shopping").unwrap();
    db.create_rule(1, "amazon", cat, 10).unwrap();
    create_test_transaction(&db, "AMAZON MKTP", -20.0);
    create_test_transaction(&db, "LOCAL DINER", -12.0);

    assert!(commands::cmd_coverage(&db, 1, 90, Some("2024-01-01"), Some("2024-01-31"), false).is_ok());
    assert!(commands::cmd_coverage(&db, 1, 90, Some("2024-01-01"), Some("2024-01-31"), true).is_ok());

    // Dry run leaves the backlog alone
    assert_eq!(db.list_transactions(1, true, 20).unwrap().len(), 2);
}

#[test]
fn test_cmd_coverage_rejects_inverted_range() {
    let db = setup_test_db();
    assert!(commands::cmd_coverage(&db, 1, 90, Some("2024-02-01"), Some("2024-01-01"), false).is_err());
}

#[test]
fn test_cmd_threshold_get_set() {
    let db = setup_test_db();
    assert!(commands::cmd_threshold_get(&db, 90).is_ok());

    assert!(commands::cmd_threshold_set(&db, 80).is_ok());
    assert_eq!(db.auto_apply_threshold_or(90).unwrap(), 80);

    assert!(commands::cmd_threshold_set(&db, 150).is_err());
    assert_eq!(db.auto_apply_threshold_or(90).unwrap(), 80);
}
