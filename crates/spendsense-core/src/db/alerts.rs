//! Alert operations
//!
//! Open-alert uniqueness is enforced by partial unique indexes, so creation
//! is a single `INSERT OR IGNORE` rather than a check-then-insert.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{Alert, AlertType, NewAlert};

const ALERT_COLUMNS: &str =
    "id, user_id, type, goal_id, threshold_percentage, context, triggered_at, is_acknowledged";

fn row_to_alert(row: &Row) -> rusqlite::Result<Alert> {
    let type_str: String = row.get(2)?;
    let context: Option<String> = row.get(5)?;
    let triggered_at: String = row.get(6)?;

    Ok(Alert {
        id: row.get(0)?,
        user_id: row.get(1)?,
        alert_type: type_str.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, e.into())
        })?,
        goal_id: row.get(3)?,
        threshold_percentage: row.get(4)?,
        context: context.and_then(|s| serde_json::from_str(&s).ok()),
        triggered_at: parse_datetime(&triggered_at),
        is_acknowledged: row.get(7)?,
    })
}

/// Insert an alert unless an equivalent one is still open
pub(super) fn insert_alert(
    conn: &Connection,
    user_id: i64,
    alert: &NewAlert,
) -> rusqlite::Result<Option<i64>> {
    let context = alert.context.as_ref().map(|c| c.to_string());
    let category_name = match alert.alert_type {
        AlertType::NewCategory => alert.category_name(),
        AlertType::Budget => None,
    };

    let changed = conn.execute(
        r#"
        INSERT OR IGNORE INTO alerts (user_id, type, goal_id, threshold_percentage, category_name, context)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
        params![
            user_id,
            alert.alert_type.as_str(),
            alert.goal_id,
            alert.threshold_percentage,
            category_name,
            context,
        ],
    )?;

    if changed == 0 {
        debug!(alert_type = %alert.alert_type, ?category_name, goal_id = ?alert.goal_id, "Alert already open");
        return Ok(None);
    }

    Ok(Some(conn.last_insert_rowid()))
}

impl Database {
    /// Create an alert; `None` if an equivalent open alert exists
    pub fn create_alert(&self, user_id: i64, alert: &NewAlert) -> Result<Option<i64>> {
        let conn = self.conn()?;
        Ok(insert_alert(&conn, user_id, alert)?)
    }

    /// Get an owned alert
    pub fn get_alert(&self, user_id: i64, id: i64) -> Result<Option<Alert>> {
        let conn = self.conn()?;
        let alert = conn
            .query_row(
                &format!("SELECT {} FROM alerts WHERE id = ? AND user_id = ?", ALERT_COLUMNS),
                params![id, user_id],
                row_to_alert,
            )
            .optional()?;

        Ok(alert)
    }

    /// List alerts, newest first
    pub fn list_alerts(&self, user_id: i64, include_acknowledged: bool) -> Result<Vec<Alert>> {
        let conn = self.conn()?;
        let sql = if include_acknowledged {
            format!(
                "SELECT {} FROM alerts WHERE user_id = ? ORDER BY triggered_at DESC, id DESC",
                ALERT_COLUMNS
            )
        } else {
            format!(
                "SELECT {} FROM alerts WHERE user_id = ? AND is_acknowledged = 0 ORDER BY triggered_at DESC, id DESC",
                ALERT_COLUMNS
            )
        };

        let mut stmt = conn.prepare(&sql)?;
        let alerts = stmt
            .query_map(params![user_id], row_to_alert)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(alerts)
    }

    /// Acknowledge an owned alert; `None` if missing or not owned
    pub fn acknowledge_alert(&self, user_id: i64, id: i64) -> Result<Option<Alert>> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE alerts SET is_acknowledged = 1 WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;

        if changed == 0 {
            return Ok(None);
        }

        self.get_alert(user_id, id)
    }
}
