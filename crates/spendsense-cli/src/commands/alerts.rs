//! Alert command implementations

use anyhow::Result;
use spendsense_core::{db::Database, models::AlertType, AlertEngine};

pub fn cmd_alerts_list(db: &Database, user_id: i64, include_acknowledged: bool) -> Result<()> {
    let alerts = AlertEngine::new(db).list(user_id, include_acknowledged)?;

    if alerts.is_empty() {
        println!("✅ No open alerts. Your spending looks good!");
        return Ok(());
    }

    let goals = db.list_goals(user_id)?;

    println!();
    println!("⚠️  Alerts");
    println!("   ─────────────────────────────────────────────────────────────");

    for alert in &alerts {
        let ack_mark = if alert.is_acknowledged {
            " (acknowledged)"
        } else {
            ""
        };

        match alert.alert_type {
            AlertType::Budget => {
                let goal = alert
                    .goal_id
                    .and_then(|id| goals.iter().find(|g| g.id == id))
                    .map(|g| g.name.as_str())
                    .unwrap_or("?");
                println!(
                    "   [{}] 💸 Budget: '{}' passed {}%{}",
                    alert.id,
                    goal,
                    alert.threshold_percentage.unwrap_or_default(),
                    ack_mark
                );
            }
            AlertType::NewCategory => {
                println!(
                    "   [{}] 🆕 New category: '{}'{}",
                    alert.id,
                    alert.category_name().unwrap_or("?"),
                    ack_mark
                );
            }
        }
        println!("      {}", alert.triggered_at.format("%Y-%m-%d %H:%M"));
    }

    println!();
    println!("   Use 'spendsense alerts ack <id>' to acknowledge an alert.");

    Ok(())
}

pub fn cmd_alerts_ack(db: &Database, user_id: i64, id: i64) -> Result<()> {
    AlertEngine::new(db)
        .acknowledge(user_id, id)?
        .ok_or_else(|| anyhow::anyhow!("Alert {} not found", id))?;
    println!("✅ Acknowledged alert {}", id);
    Ok(())
}
