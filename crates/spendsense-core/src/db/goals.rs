//! Budget goal operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{round_percentage, Goal};

const GOAL_COLUMNS: &str = "id, user_id, name, category_id, target_amount, thresholds, created_at";

fn row_to_goal(row: &Row) -> rusqlite::Result<Goal> {
    let thresholds: String = row.get(5)?;
    let created_at: String = row.get(6)?;

    Ok(Goal {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        category_id: row.get(3)?,
        target_amount: row.get(4)?,
        thresholds: serde_json::from_str(&thresholds).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?,
        created_at: parse_datetime(&created_at),
    })
}

/// Sort, round and dedup threshold percentages, rejecting nonsense
fn normalize_thresholds(thresholds: &[f64]) -> Result<Vec<f64>> {
    if thresholds.is_empty() {
        return Err(Error::Validation("A goal needs at least one threshold".into()));
    }

    let mut out = Vec::with_capacity(thresholds.len());
    for &t in thresholds {
        if !t.is_finite() || t <= 0.0 || t >= 1000.0 {
            return Err(Error::Validation(format!(
                "Threshold must be between 0 and 1000 percent, got {}",
                t
            )));
        }
        out.push(round_percentage(t));
    }

    out.sort_by(|a, b| a.total_cmp(b));
    out.dedup();
    Ok(out)
}

impl Database {
    /// Create a monthly budget goal for an owned category
    pub fn create_goal(
        &self,
        user_id: i64,
        name: &str,
        category_id: i64,
        target_amount: f64,
        thresholds: &[f64],
    ) -> Result<Goal> {
        if !target_amount.is_finite() || target_amount <= 0.0 {
            return Err(Error::Validation(format!(
                "Target amount must be positive, got {}",
                target_amount
            )));
        }
        let thresholds = normalize_thresholds(thresholds)?;

        let conn = self.conn()?;
        let owned: Option<i64> = conn
            .query_row(
                "SELECT id FROM categories WHERE id = ? AND user_id = ?",
                params![category_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        if owned.is_none() {
            return Err(Error::NotFound(format!("Category {}", category_id)));
        }

        conn.execute(
            "INSERT INTO goals (user_id, name, category_id, target_amount, thresholds) VALUES (?, ?, ?, ?, ?)",
            params![
                user_id,
                name.trim(),
                category_id,
                target_amount,
                serde_json::to_string(&thresholds)?
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.get_goal(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Goal {}", id)))
    }

    /// Get an owned goal
    pub fn get_goal(&self, user_id: i64, id: i64) -> Result<Option<Goal>> {
        let conn = self.conn()?;
        let goal = conn
            .query_row(
                &format!("SELECT {} FROM goals WHERE id = ? AND user_id = ?", GOAL_COLUMNS),
                params![id, user_id],
                row_to_goal,
            )
            .optional()?;

        Ok(goal)
    }

    /// List a user's goals
    pub fn list_goals(&self, user_id: i64) -> Result<Vec<Goal>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM goals WHERE user_id = ? ORDER BY id",
            GOAL_COLUMNS
        ))?;

        let goals = stmt
            .query_map(params![user_id], row_to_goal)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(goals)
    }

    /// Goals tracking a category
    pub fn get_goals_for_category(&self, user_id: i64, category_id: i64) -> Result<Vec<Goal>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM goals WHERE user_id = ? AND category_id = ? ORDER BY id",
            GOAL_COLUMNS
        ))?;

        let goals = stmt
            .query_map(params![user_id, category_id], row_to_goal)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(goals)
    }

    /// Delete an owned goal; its alerts cascade
    pub fn delete_goal(&self, user_id: i64, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM goals WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_thresholds() {
        assert_eq!(
            normalize_thresholds(&[100.0, 50.0, 80.0, 50.0]).unwrap(),
            vec![50.0, 80.0, 100.0]
        );
        assert!(normalize_thresholds(&[]).is_err());
        assert!(normalize_thresholds(&[0.0]).is_err());
        assert!(normalize_thresholds(&[f64::NAN]).is_err());
    }
}
