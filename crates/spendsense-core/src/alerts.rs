//! Alert engine: budget threshold and new-category notifications
//!
//! Creation is idempotent while an alert is open: asking for an alert that
//! already exists unacknowledged is a no-op, reported as
//! [`AlertOutcome::AlreadyOpen`]. Once acknowledged, the same condition can
//! raise a fresh alert.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{Alert, Goal, NewAlert};
use crate::store::LedgerStore;

/// Whether an alert was created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    Created(i64),
    /// An unacknowledged alert for the same key already exists
    AlreadyOpen,
}

impl AlertOutcome {
    pub fn created(&self) -> Option<i64> {
        match self {
            Self::Created(id) => Some(*id),
            Self::AlreadyOpen => None,
        }
    }
}

impl From<Option<i64>> for AlertOutcome {
    fn from(id: Option<i64>) -> Self {
        id.map_or(Self::AlreadyOpen, Self::Created)
    }
}

/// A goal threshold reached by current spending
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossedThreshold {
    pub goal_id: i64,
    pub threshold_percentage: f64,
    /// Spending as a percentage of the goal target
    pub spent_percentage: f64,
}

/// Decides which goal thresholds new spending has crossed
pub trait BudgetEvaluator {
    /// `added` is the spending the triggering transactions put into the
    /// category for the month of `at`, already persisted.
    fn crossed_thresholds(
        &self,
        user_id: i64,
        category_id: i64,
        at: NaiveDateTime,
        added: f64,
    ) -> Result<Vec<CrossedThreshold>>;
}

/// Monthly spending against each goal tracking the category
///
/// Spending is the sum of debits in the category during the calendar month
/// of the triggering transaction. A threshold is crossed when the share of
/// the target was below it before `added` and is at or above it after.
pub struct GoalBudgetEvaluator<'a> {
    store: &'a dyn LedgerStore,
}

impl<'a> GoalBudgetEvaluator<'a> {
    pub fn new(store: &'a dyn LedgerStore) -> Self {
        Self { store }
    }
}

impl BudgetEvaluator for GoalBudgetEvaluator<'_> {
    fn crossed_thresholds(
        &self,
        user_id: i64,
        category_id: i64,
        at: NaiveDateTime,
        added: f64,
    ) -> Result<Vec<CrossedThreshold>> {
        if added <= 0.0 {
            return Ok(Vec::new());
        }
        let goals = self.store.goals_for_category(user_id, category_id)?;
        if goals.is_empty() {
            return Ok(Vec::new());
        }

        let (from, to) = month_bounds(at.date())?;
        let spent = self.store.category_spend(user_id, category_id, from, to)?;
        let before = (spent - added).max(0.0);

        Ok(goals
            .iter()
            .flat_map(|goal| newly_crossed(goal, before, spent))
            .collect())
    }
}

/// Thresholds of `goal` in `(before, after]`, as percentages of its target
pub fn newly_crossed(goal: &Goal, before: f64, after: f64) -> Vec<CrossedThreshold> {
    if goal.target_amount <= 0.0 {
        return Vec::new();
    }
    let before_percentage = before / goal.target_amount * 100.0;
    let spent_percentage = after / goal.target_amount * 100.0;

    goal.thresholds
        .iter()
        .filter(|&&t| before_percentage < t && t <= spent_percentage)
        .map(|&threshold_percentage| CrossedThreshold {
            goal_id: goal.id,
            threshold_percentage,
            spent_percentage,
        })
        .collect()
}

/// `[first day of month, first day of next month)` as midnight timestamps
pub fn month_bounds(date: NaiveDate) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let invalid = || Error::InvalidData(format!("No month bounds for {}", date));

    let start = NaiveDate::from_ymd_opt(date.year(), date.month(), 1).ok_or_else(invalid)?;
    let end = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
    .ok_or_else(invalid)?;

    Ok((
        start.and_hms_opt(0, 0, 0).ok_or_else(invalid)?,
        end.and_hms_opt(0, 0, 0).ok_or_else(invalid)?,
    ))
}

pub struct AlertEngine<'a> {
    store: &'a dyn LedgerStore,
}

impl<'a> AlertEngine<'a> {
    pub fn new(store: &'a dyn LedgerStore) -> Self {
        Self { store }
    }

    /// Raise a budget alert for an owned goal
    pub fn create_budget_alert(
        &self,
        user_id: i64,
        goal_id: i64,
        threshold_percentage: f64,
    ) -> Result<AlertOutcome> {
        if self.store.get_goal(user_id, goal_id)?.is_none() {
            return Err(Error::NotFound(format!("Goal {}", goal_id)));
        }

        let outcome: AlertOutcome = self
            .store
            .insert_alert_if_absent(user_id, &NewAlert::budget(goal_id, threshold_percentage))?
            .into();

        match outcome {
            AlertOutcome::Created(id) => info!(
                "Budget alert {} for goal {} at {}%",
                id, goal_id, threshold_percentage
            ),
            AlertOutcome::AlreadyOpen => debug!(
                goal_id,
                threshold_percentage, "Budget alert already open"
            ),
        }
        Ok(outcome)
    }

    /// Raise a new-category alert unless one is open for the exact name
    pub fn create_new_category_alert(&self, user_id: i64, category_name: &str) -> Result<AlertOutcome> {
        let outcome: AlertOutcome = self
            .store
            .insert_alert_if_absent(user_id, &NewAlert::new_category(category_name))?
            .into();

        if let AlertOutcome::Created(id) = outcome {
            info!("New category alert {} for '{}'", id, category_name);
        }
        Ok(outcome)
    }

    /// Acknowledge an owned alert; `None` if missing or not owned
    pub fn acknowledge(&self, user_id: i64, alert_id: i64) -> Result<Option<Alert>> {
        self.store.acknowledge_alert(user_id, alert_id)
    }

    /// Unacknowledged alerts, or all alerts, newest first
    pub fn list(&self, user_id: i64, include_acknowledged: bool) -> Result<Vec<Alert>> {
        self.store.list_alerts(user_id, include_acknowledged)
    }

    /// Turn thresholds crossed by `added` spending into budget alerts
    ///
    /// Returns the IDs of alerts that were created.
    pub fn evaluate_budgets(
        &self,
        evaluator: &dyn BudgetEvaluator,
        user_id: i64,
        category_id: i64,
        at: NaiveDateTime,
        added: f64,
    ) -> Result<Vec<i64>> {
        let mut created = Vec::new();

        for crossed in evaluator.crossed_thresholds(user_id, category_id, at, added)? {
            debug!(
                goal_id = crossed.goal_id,
                threshold = crossed.threshold_percentage,
                spent = crossed.spent_percentage,
                "Threshold crossed"
            );
            if let AlertOutcome::Created(id) =
                self.create_budget_alert(user_id, crossed.goal_id, crossed.threshold_percentage)?
            {
                created.push(id);
            }
        }

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_bounds() {
        let (from, to) = month_bounds(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()).unwrap();
        assert_eq!(from.to_string(), "2024-02-01 00:00:00");
        assert_eq!(to.to_string(), "2024-03-01 00:00:00");

        let (from, to) = month_bounds(NaiveDate::from_ymd_opt(2023, 12, 15).unwrap()).unwrap();
        assert_eq!(from.to_string(), "2023-12-01 00:00:00");
        assert_eq!(to.to_string(), "2024-01-01 00:00:00");
    }

    fn goal(target_amount: f64, thresholds: &[f64]) -> Goal {
        Goal {
            id: 7,
            user_id: 1,
            name: "Eating out".to_string(),
            category_id: 3,
            target_amount,
            thresholds: thresholds.to_vec(),
            created_at: chrono::Utc::now(),
        }
    }

    fn thresholds(crossed: &[CrossedThreshold]) -> Vec<f64> {
        crossed.iter().map(|c| c.threshold_percentage).collect()
    }

    #[test]
    fn test_newly_crossed_only_reports_the_crossing() {
        let g = goal(1000.0, &[50.0, 80.0, 100.0]);

        assert_eq!(thresholds(&newly_crossed(&g, 0.0, 600.0)), vec![50.0]);
        assert_eq!(thresholds(&newly_crossed(&g, 600.0, 900.0)), vec![80.0]);
        // Already past 50% before the purchase
        assert!(newly_crossed(&g, 600.0, 610.0).is_empty());
        // Landing exactly on a threshold crosses it
        assert_eq!(thresholds(&newly_crossed(&g, 400.0, 500.0)), vec![50.0]);
        assert_eq!(thresholds(&newly_crossed(&g, 0.0, 1200.0)), vec![50.0, 80.0, 100.0]);
    }

    #[test]
    fn test_newly_crossed_ignores_zero_target() {
        assert!(newly_crossed(&goal(0.0, &[50.0]), 0.0, 100.0).is_empty());
    }

    #[test]
    fn test_outcome_from_insert_result() {
        assert_eq!(AlertOutcome::from(Some(4)), AlertOutcome::Created(4));
        assert_eq!(AlertOutcome::from(None), AlertOutcome::AlreadyOpen);
        assert_eq!(AlertOutcome::Created(4).created(), Some(4));
    }
}
