//! Database tests

use super::*;
use crate::models::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::TransactionInsertResult;
    use chrono::NaiveDateTime;
    use rusqlite::params;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    /// A database with one user and one account
    fn setup() -> (Database, i64, i64) {
        let db = Database::in_memory().unwrap();
        let user = db.get_or_create_user("asha").unwrap();
        let account = db
            .create_account(user.id, "HDFC Savings", AccountType::Savings, "HDFC", None)
            .unwrap();
        (db, user.id, account.id)
    }

    fn staged(account_id: i64, date: &str, description: &str, amount: f64) -> NewTransaction {
        NewTransaction {
            account_id,
            txn_date: ts(date),
            description: description.to_string(),
            amount,
            direction: Direction::Debit,
            source: "hdfc".to_string(),
            category_id: None,
            merchant_id: None,
            unique_key: None,
            upi_ref: None,
            raw_data: None,
        }
    }

    fn keyed(account_id: i64, key: &str) -> NewTransaction {
        NewTransaction {
            unique_key: Some(key.to_string()),
            ..staged(account_id, "2024-01-05 00:00:00", "UPI-ZOMATO", 250.0)
        }
    }

    #[test]
    fn test_in_memory_db() {
        let db = Database::in_memory().unwrap();
        let user = db.get_or_create_user("asha").unwrap();
        assert!(db.list_accounts(user.id).unwrap().is_empty());
        assert_eq!(db.count_transactions(user.id).unwrap(), 0);
    }

    #[test]
    fn test_get_or_create_user() {
        let db = Database::in_memory().unwrap();
        let first = db.get_or_create_user("asha").unwrap();
        let again = db.get_or_create_user("  asha ").unwrap();
        assert_eq!(first.id, again.id);

        assert!(db.find_user("ravi").unwrap().is_none());
        assert!(matches!(
            db.get_or_create_user("   "),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_account_crud() {
        let (db, user_id, account_id) = setup();

        let account = db.get_account(user_id, account_id).unwrap().unwrap();
        assert_eq!(account.name, "HDFC Savings");
        assert_eq!(account.provider, "hdfc");

        let dup = db.create_account(user_id, "HDFC Savings", AccountType::Credit, "hdfc", None);
        assert!(matches!(dup, Err(Error::Validation(_))));

        let map = db.account_map(user_id).unwrap();
        assert_eq!(map.get("HDFC Savings"), Some(&account_id));
    }

    #[test]
    fn test_accounts_are_user_scoped() {
        let (db, _, account_id) = setup();
        let other = db.get_or_create_user("ravi").unwrap();

        assert!(db.get_account(other.id, account_id).unwrap().is_none());
        assert!(db.owned_account_ids(other.id).unwrap().is_empty());

        // Same account name is fine for a different user
        db.create_account(other.id, "HDFC Savings", AccountType::Savings, "hdfc", None)
            .unwrap();
    }

    #[test]
    fn test_category_names_unique_ignoring_case() {
        let (db, user_id, _) = setup();
        db.create_category(user_id, "Food", false, None).unwrap();

        let dup = db.create_category(user_id, "food", false, None);
        assert!(matches!(dup, Err(Error::Validation(_))));

        let found = db.find_category_by_name(user_id, "FOOD").unwrap().unwrap();
        assert_eq!(found.name, "Food");
    }

    #[test]
    fn test_seed_default_categories_is_idempotent() {
        let (db, user_id, _) = setup();
        assert_eq!(
            db.seed_default_categories(user_id).unwrap(),
            DEFAULT_CATEGORIES.len()
        );
        assert_eq!(db.seed_default_categories(user_id).unwrap(), 0);
        assert_eq!(
            db.get_categories(user_id).unwrap().len(),
            DEFAULT_CATEGORIES.len()
        );
    }

    #[test]
    fn test_unique_key_conflict_is_duplicate() {
        let (db, user_id, account_id) = setup();
        let row = keyed(account_id, "hdfc-0001-20240105-250.00");

        let first = db.insert_transaction(user_id, &row, &[], &[]).unwrap();
        assert!(matches!(first, TransactionInsertResult::Inserted(_)));

        let second = db.insert_transaction(user_id, &row, &[], &[]).unwrap();
        assert_eq!(second, TransactionInsertResult::Duplicate);
        assert_eq!(db.count_transactions(user_id).unwrap(), 1);
    }

    #[test]
    fn test_upi_ref_conflict_is_duplicate() {
        let (db, user_id, account_id) = setup();
        let mut row = staged(account_id, "2024-01-05 09:00:00", "UPI payment", 10.0);
        row.upi_ref = Some("401234567890".into());

        db.insert_transaction(user_id, &row, &[], &[]).unwrap();
        row.description = "same payment, different narration".into();
        assert_eq!(
            db.insert_transaction(user_id, &row, &[], &[]).unwrap(),
            TransactionInsertResult::Duplicate
        );
    }

    #[test]
    fn test_rows_without_keys_never_conflict() {
        let (db, user_id, account_id) = setup();
        let row = staged(account_id, "2024-01-05 09:00:00", "Cash", 10.0);

        db.insert_transaction(user_id, &row, &[], &[]).unwrap();
        db.insert_transaction(user_id, &row, &[], &[]).unwrap();
        assert_eq!(db.count_transactions(user_id).unwrap(), 2);
    }

    #[test]
    fn test_unique_key_scoped_per_user() {
        let (db, user_id, account_id) = setup();
        let other = db.get_or_create_user("ravi").unwrap();
        let other_account = db
            .create_account(other.id, "SBI", AccountType::Savings, "sbi", None)
            .unwrap();

        let key = "hdfc-0001-20240105-250.00";
        db.insert_transaction(user_id, &keyed(account_id, key), &[], &[])
            .unwrap();
        let result = db
            .insert_transaction(other.id, &keyed(other_account.id, key), &[], &[])
            .unwrap();
        assert!(matches!(result, TransactionInsertResult::Inserted(_)));

        assert_eq!(db.get_unique_keys(user_id).unwrap(), vec![key.to_string()]);
        assert_eq!(db.get_unique_keys(other.id).unwrap(), vec![key.to_string()]);
    }

    #[test]
    fn test_commit_import_reports_conflicts() {
        let (db, user_id, account_id) = setup();
        let existing = keyed(account_id, "k1");
        db.insert_transaction(user_id, &existing, &[], &[]).unwrap();

        let rows = vec![keyed(account_id, "k1"), keyed(account_id, "k2")];
        let alerts = vec![NewAlert::new_category("Xyz")];
        let commit = db.commit_import(user_id, &rows, &alerts).unwrap();

        assert_eq!(commit.transaction_ids.len(), 2);
        assert!(commit.transaction_ids[0].is_none());
        assert!(commit.transaction_ids[1].is_some());
        assert_eq!(commit.alert_ids.len(), 1);
        assert!(commit.alert_ids[0].is_some());
        assert_eq!(db.count_transactions(user_id).unwrap(), 2);
    }

    #[test]
    fn test_raw_data_round_trips_as_json() {
        let (db, user_id, account_id) = setup();
        let mut row = staged(account_id, "2024-01-05 09:00:00", "UPI-ZOMATO", 250.0);
        row.raw_data = Some(serde_json::json!({ "Narration": "UPI-ZOMATO" }));

        let TransactionInsertResult::Inserted(id) = db.insert_transaction(user_id, &row, &[], &[]).unwrap()
        else {
            panic!("expected insert");
        };
        let tx = db.get_transaction(user_id, id).unwrap().unwrap();
        assert_eq!(tx.raw_data.unwrap()["Narration"], "UPI-ZOMATO");
        assert_eq!(tx.txn_date, ts("2024-01-05 09:00:00"));
        assert_eq!(tx.direction, Direction::Debit);
    }

    #[test]
    fn test_update_transaction_conflict_returns_false() {
        let (db, user_id, account_id) = setup();
        db.insert_transaction(user_id, &keyed(account_id, "k1"), &[], &[])
            .unwrap();
        let TransactionInsertResult::Inserted(id) = db
            .insert_transaction(user_id, &keyed(account_id, "k2"), &[], &[])
            .unwrap()
        else {
            panic!("expected insert");
        };

        let mut tx = db.get_transaction(user_id, id).unwrap().unwrap();
        tx.unique_key = Some("k1".into());
        assert!(!db.update_transaction(&tx, None, &[]).unwrap());

        tx.unique_key = Some("k2".into());
        tx.description = "Renamed".into();
        assert!(db.update_transaction(&tx, None, &[]).unwrap());
        assert_eq!(
            db.get_transaction(user_id, id).unwrap().unwrap().description,
            "Renamed"
        );
    }

    #[test]
    fn test_alerts_written_only_with_the_transaction() {
        let (db, user_id, account_id) = setup();
        let alerts = [NewAlert::new_category("Xyz")];

        let TransactionInsertResult::Inserted(id) = db
            .insert_transaction(user_id, &keyed(account_id, "k1"), &[], &[])
            .unwrap()
        else {
            panic!("expected insert");
        };

        // Duplicate insert rolls the alert back with it
        assert_eq!(
            db.insert_transaction(user_id, &keyed(account_id, "k1"), &[], &alerts)
                .unwrap(),
            TransactionInsertResult::Duplicate
        );
        assert!(db.list_alerts(user_id, true).unwrap().is_empty());

        // So does an update that no longer finds its row
        let mut tx = db.get_transaction(user_id, id).unwrap().unwrap();
        tx.id = 9999;
        assert!(!db.update_transaction(&tx, None, &alerts).unwrap());
        assert!(db.list_alerts(user_id, true).unwrap().is_empty());

        tx.id = id;
        assert!(db.update_transaction(&tx, None, &alerts).unwrap());
        assert_eq!(db.list_alerts(user_id, false).unwrap().len(), 1);
    }

    #[test]
    fn test_list_transactions_newest_first() {
        let (db, user_id, account_id) = setup();
        for date in ["2024-01-01 00:00:00", "2024-03-01 00:00:00", "2024-02-01 00:00:00"] {
            db.insert_transaction(user_id, &staged(account_id, date, "x", 1.0), &[], &[])
                .unwrap();
        }

        let txs = db.list_transactions(user_id, 10, 0).unwrap();
        let dates: Vec<String> = txs.iter().map(|t| t.txn_date.to_string()).collect();
        assert_eq!(
            dates,
            vec![
                "2024-03-01 00:00:00",
                "2024-02-01 00:00:00",
                "2024-01-01 00:00:00"
            ]
        );
        assert_eq!(db.list_transactions(user_id, 1, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_transaction_cascades_tags() {
        let (db, user_id, account_id) = setup();
        let tag = db.create_tag(user_id, "work").unwrap();
        let TransactionInsertResult::Inserted(id) = db
            .insert_transaction(
                user_id,
                &staged(account_id, "2024-01-05 00:00:00", "Lunch", 120.0),
                &[tag.id],
                &[],
            )
            .unwrap()
        else {
            panic!("expected insert");
        };
        assert_eq!(db.get_transaction_tag_ids(user_id, id).unwrap(), vec![tag.id]);

        assert!(db.delete_transaction(user_id, id).unwrap());
        assert!(!db.delete_transaction(user_id, id).unwrap());

        let conn = db.conn().unwrap();
        let links: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM transaction_tags WHERE transaction_id = ?",
                params![id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(links, 0);
        // Tag itself survives
        assert_eq!(db.list_tags(user_id).unwrap().len(), 1);
    }

    #[test]
    fn test_owned_tag_ids() {
        let (db, user_id, _) = setup();
        let other = db.get_or_create_user("ravi").unwrap();
        let mine = db.create_tag(user_id, "work").unwrap();
        let theirs = db.create_tag(other.id, "home").unwrap();

        let owned = db
            .get_owned_tag_ids(user_id, &[mine.id, theirs.id, 999])
            .unwrap();
        assert!(owned.contains(&mine.id));
        assert_eq!(owned.len(), 1);
        assert!(db.get_owned_tag_ids(user_id, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_new_category_alert_unique_while_open() {
        let (db, user_id, _) = setup();

        let first = db.create_alert(user_id, &NewAlert::new_category("Xyz")).unwrap();
        assert!(first.is_some());
        assert!(db
            .create_alert(user_id, &NewAlert::new_category("Xyz"))
            .unwrap()
            .is_none());

        // A different name is a different key
        assert!(db
            .create_alert(user_id, &NewAlert::new_category("Abc"))
            .unwrap()
            .is_some());

        let acked = db.acknowledge_alert(user_id, first.unwrap()).unwrap().unwrap();
        assert!(acked.is_acknowledged);
        assert_eq!(acked.category_name(), Some("Xyz"));

        assert!(db
            .create_alert(user_id, &NewAlert::new_category("Xyz"))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_budget_alert_unique_while_open() {
        let (db, user_id, _) = setup();
        let food = db.create_category(user_id, "Food", false, None).unwrap();
        let goal = db
            .create_goal(user_id, "Food budget", food.id, 1000.0, &DEFAULT_THRESHOLDS)
            .unwrap();

        let id = db
            .create_alert(user_id, &NewAlert::budget(goal.id, 50.0))
            .unwrap()
            .unwrap();
        assert!(db
            .create_alert(user_id, &NewAlert::budget(goal.id, 50.0))
            .unwrap()
            .is_none());
        assert!(db
            .create_alert(user_id, &NewAlert::budget(goal.id, 80.0))
            .unwrap()
            .is_some());

        db.acknowledge_alert(user_id, id).unwrap();
        assert!(db
            .create_alert(user_id, &NewAlert::budget(goal.id, 50.0))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_alerts_are_user_scoped() {
        let (db, user_id, _) = setup();
        let other = db.get_or_create_user("ravi").unwrap();

        let id = db
            .create_alert(user_id, &NewAlert::new_category("Xyz"))
            .unwrap()
            .unwrap();
        // Same open key for another user is independent
        assert!(db
            .create_alert(other.id, &NewAlert::new_category("Xyz"))
            .unwrap()
            .is_some());

        assert!(db.acknowledge_alert(other.id, id).unwrap().is_none());
        assert!(db.get_alert(other.id, id).unwrap().is_none());
    }

    #[test]
    fn test_list_alerts_filters_acknowledged() {
        let (db, user_id, _) = setup();
        let a = db
            .create_alert(user_id, &NewAlert::new_category("One"))
            .unwrap()
            .unwrap();
        db.create_alert(user_id, &NewAlert::new_category("Two"))
            .unwrap();
        db.acknowledge_alert(user_id, a).unwrap();

        assert_eq!(db.list_alerts(user_id, false).unwrap().len(), 1);
        assert_eq!(db.list_alerts(user_id, true).unwrap().len(), 2);
    }

    #[test]
    fn test_category_spend_counts_debits_in_range() {
        let (db, user_id, account_id) = setup();
        let food = db.create_category(user_id, "Food", false, None).unwrap();

        let mut rows = vec![
            staged(account_id, "2024-01-01 00:00:00", "a", 100.0),
            staged(account_id, "2024-01-31 23:59:59", "b", 50.0),
            staged(account_id, "2024-02-01 00:00:00", "next month", 1000.0),
        ];
        let mut refund = staged(account_id, "2024-01-10 00:00:00", "refund", 30.0);
        refund.direction = Direction::Credit;
        rows.push(refund);
        for row in &mut rows {
            row.category_id = Some(food.id);
        }
        db.commit_import(user_id, &rows, &[]).unwrap();

        let spent = db
            .get_category_spend(
                user_id,
                food.id,
                ts("2024-01-01 00:00:00"),
                ts("2024-02-01 00:00:00"),
            )
            .unwrap();
        assert_eq!(spent, 150.0);

        let none = db
            .get_category_spend(
                user_id,
                food.id,
                ts("2023-01-01 00:00:00"),
                ts("2023-02-01 00:00:00"),
            )
            .unwrap();
        assert_eq!(none, 0.0);
    }

    #[test]
    fn test_goal_requires_owned_category() {
        let (db, user_id, _) = setup();
        let other = db.get_or_create_user("ravi").unwrap();
        let theirs = db.create_category(other.id, "Food", false, None).unwrap();

        let result = db.create_goal(user_id, "Food", theirs.id, 500.0, &DEFAULT_THRESHOLDS);
        assert!(matches!(result, Err(Error::NotFound(_))));

        let result = db.create_goal(other.id, "Food", theirs.id, 0.0, &DEFAULT_THRESHOLDS);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_goals_for_category() {
        let (db, user_id, _) = setup();
        let food = db.create_category(user_id, "Food", false, None).unwrap();
        let travel = db.create_category(user_id, "Travel", false, None).unwrap();

        let goal = db
            .create_goal(user_id, "Food", food.id, 500.0, &[100.0, 50.0])
            .unwrap();
        assert_eq!(goal.thresholds, vec![50.0, 100.0]);
        db.create_goal(user_id, "Travel", travel.id, 500.0, &DEFAULT_THRESHOLDS)
            .unwrap();

        let goals = db.get_goals_for_category(user_id, food.id).unwrap();
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].id, goal.id);

        assert!(db.delete_goal(user_id, goal.id).unwrap());
        assert!(db.get_goals_for_category(user_id, food.id).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_goal_thresholds_are_an_error() {
        let (db, user_id, _) = setup();
        let food = db.create_category(user_id, "Food", false, None).unwrap();
        let goal = db
            .create_goal(user_id, "Food", food.id, 500.0, &DEFAULT_THRESHOLDS)
            .unwrap();

        db.conn()
            .unwrap()
            .execute(
                "UPDATE goals SET thresholds = 'not json' WHERE id = ?",
                params![goal.id],
            )
            .unwrap();

        assert!(matches!(
            db.get_goals_for_category(user_id, food.id),
            Err(Error::Database(_))
        ));
    }
}
