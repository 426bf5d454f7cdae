//! Reward availability and progress.

use punch_common::{AppError, AppResult};
use punch_db::entities::restaurant::{self, RewardDefinition};
use serde::Serialize;

/// Punches per card when neither reward nor restaurant set one.
pub const DEFAULT_TOTAL: i32 = 10;

/// Progress of one reward for a given punch count.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardStatus {
    pub title: String,
    pub description: String,
    /// Punches needed to claim this reward
    pub required: i32,
    /// Punches counted toward this reward, at most `required`
    pub progress: i32,
    /// Percentage in `[0, 100]`
    pub progress_pct: f64,
    pub available: bool,
    pub remaining: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Card size of a restaurant, falling back to `default_total`.
#[must_use]
pub fn card_total(restaurant_total: Option<i32>, default_total: i32) -> i32 {
    restaurant_total.filter(|t| *t > 0).unwrap_or(default_total)
}

/// Punches a reward requires. Non-positive values count as unset.
#[must_use]
pub fn required_punches(
    reward: &RewardDefinition,
    restaurant_total: Option<i32>,
    default_total: i32,
) -> i32 {
    reward
        .punches_required
        .filter(|r| *r > 0)
        .unwrap_or_else(|| card_total(restaurant_total, default_total))
}

/// Evaluate a catalog for a punch count, preserving catalog order.
#[must_use]
pub fn evaluate_catalog(
    catalog: &[RewardDefinition],
    restaurant_total: Option<i32>,
    default_total: i32,
    punch_count: i32,
) -> Vec<RewardStatus> {
    let count = punch_count.max(0);

    catalog
        .iter()
        .map(|reward| {
            let required = required_punches(reward, restaurant_total, default_total);
            let pct = (f64::from(count) / f64::from(required) * 100.0).clamp(0.0, 100.0);

            RewardStatus {
                title: reward.title.clone(),
                description: reward.description.clone(),
                required,
                progress: count.min(required),
                progress_pct: pct,
                available: count >= required,
                remaining: (required - count).max(0),
                color: reward.color.clone(),
                icon: reward.icon.clone(),
            }
        })
        .collect()
}

/// Evaluate a restaurant's stored catalog.
pub fn evaluate(
    restaurant: &restaurant::Model,
    punch_count: i32,
    default_total: i32,
) -> AppResult<Vec<RewardStatus>> {
    let catalog = restaurant.rewards().map_err(|e| {
        AppError::Validation(format!(
            "Invalid reward catalog for restaurant {}: {e}",
            restaurant.id
        ))
    })?;

    Ok(evaluate_catalog(
        &catalog,
        restaurant.total,
        default_total,
        punch_count,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::create_test_restaurant;
    use serde_json::json;

    fn reward(title: &str, required: Option<i32>) -> RewardDefinition {
        RewardDefinition {
            title: title.to_string(),
            description: String::new(),
            punches_required: required,
            color: None,
            icon: None,
        }
    }

    #[test]
    fn test_empty_catalog() {
        assert!(evaluate_catalog(&[], Some(10), DEFAULT_TOTAL, 5).is_empty());
    }

    #[test]
    fn test_required_falls_back_to_restaurant_then_default() {
        let r = reward("Coffee", None);
        assert_eq!(required_punches(&r, Some(8), DEFAULT_TOTAL), 8);
        assert_eq!(required_punches(&r, None, DEFAULT_TOTAL), 10);
        assert_eq!(required_punches(&reward("Bagel", Some(0)), None, 6), 6);
        assert_eq!(required_punches(&reward("Bagel", Some(4)), Some(8), 6), 4);
    }

    #[test]
    fn test_progress_and_availability() {
        let catalog = vec![reward("Small", Some(5)), reward("Large", Some(10))];
        let statuses = evaluate_catalog(&catalog, Some(10), DEFAULT_TOTAL, 7);

        assert_eq!(statuses[0].title, "Small");
        assert!(statuses[0].available);
        assert_eq!(statuses[0].progress, 5);
        assert_eq!(statuses[0].progress_pct, 100.0);
        assert_eq!(statuses[0].remaining, 0);

        assert_eq!(statuses[1].title, "Large");
        assert!(!statuses[1].available);
        assert_eq!(statuses[1].progress, 7);
        assert_eq!(statuses[1].progress_pct, 70.0);
        assert_eq!(statuses[1].remaining, 3);
    }

    #[test]
    fn test_availability_and_progress_are_monotonic_in_count() {
        let catalog = vec![reward("A", Some(3)), reward("B", None), reward("C", Some(7))];
        let mut previous_available = vec![false; catalog.len()];
        let mut previous_pct = vec![0.0; catalog.len()];
        let mut previous_progress = vec![0; catalog.len()];

        for count in 0..=12 {
            let statuses = evaluate_catalog(&catalog, Some(10), DEFAULT_TOTAL, count);
            for (i, status) in statuses.iter().enumerate() {
                assert!(!previous_available[i] || status.available);
                assert!((0.0..=100.0).contains(&status.progress_pct));
                assert!(status.progress_pct >= previous_pct[i]);
                assert!(status.progress >= previous_progress[i]);
                previous_available[i] = status.available;
                previous_pct[i] = status.progress_pct;
                previous_progress[i] = status.progress;
            }
        }
    }

    #[test]
    fn test_evaluate_restaurant_catalog() {
        let restaurant = create_test_restaurant("r1", Some("TAG"), Some(10));
        let statuses = evaluate(&restaurant, 10, DEFAULT_TOTAL).unwrap();

        assert_eq!(statuses.len(), 1);
        assert!(statuses[0].available);
    }

    #[test]
    fn test_evaluate_rejects_malformed_catalog() {
        let mut restaurant = create_test_restaurant("r1", None, Some(10));
        restaurant.active_rewards = json!({"title": "not a list"});

        match evaluate(&restaurant, 3, DEFAULT_TOTAL) {
            Err(AppError::Validation(msg)) => assert!(msg.contains("r1")),
            _ => panic!("Expected Validation error"),
        }
    }
}
