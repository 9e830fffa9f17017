//! Financial aggregation over a project's loaded collections.
//!
//! Every function here is a pure reduction over already-fetched rows:
//! no store access, no mutation, no state between calls. Callers load the
//! collections through [`crate::db::Database`] (or build them by hand in
//! tests) and pass them in explicitly.
//!
//! Inputs are assumed valid — task progress in 0–100, prices and amounts
//! non-negative. The store enforces those ranges at write time, so the
//! formulas here do not re-validate or clamp.

use crate::models::{FeatureKind, FeatureWithTasks, Payment, PaymentDirection, ProjectSummary};

/// Sum of incoming payment amounts, in cents.
///
/// Payments with direction `out` are excluded. An empty collection sums
/// to 0.
pub fn cash_in_total(payments: &[Payment]) -> i64 {
    directed_total(payments, PaymentDirection::In)
}

/// Sum of outgoing payment amounts, in cents.
pub fn cash_out_total(payments: &[Payment]) -> i64 {
    directed_total(payments, PaymentDirection::Out)
}

fn directed_total(payments: &[Payment], direction: PaymentDirection) -> i64 {
    payments
        .iter()
        .filter(|p| p.direction == direction)
        .map(|p| p.amount)
        .sum()
}

/// Price-weighted completion percentage across a project's main features.
///
/// Each main feature contributes its average task progress weighted by its
/// price; the result is the weighted sum divided by the total price of the
/// main features. Additional features are excluded entirely.
///
/// When the total price is 0 — no main features, or all of them free —
/// the result is defined to be 0 rather than dividing by zero.
pub fn feature_overall_progress(features: &[FeatureWithTasks]) -> f64 {
    let mut weighted = 0.0;
    let mut total_price: i64 = 0;

    for entry in main_features(features) {
        weighted += average_progress(entry) * entry.feature.price as f64;
        total_price += entry.feature.price;
    }

    if total_price == 0 {
        return 0.0;
    }

    weighted / total_price as f64
}

/// Revenue earned proportional to completion, in cents.
///
/// Each main feature contributes `price * (average progress / 100)`:
/// money that can be invoiced for work already done, whether or not it has
/// been collected. Additional features are excluded, matching
/// [`feature_overall_progress`].
pub fn collectible_earnings(features: &[FeatureWithTasks]) -> f64 {
    main_features(features)
        .map(|entry| entry.feature.price as f64 * (average_progress(entry) / 100.0))
        .sum()
}

/// Compose the four aggregate figures for a project.
///
/// Cash totals stay exact cents; the fractional figures are rounded to
/// two decimal places for presentation.
pub fn project_summary(payments: &[Payment], features: &[FeatureWithTasks]) -> ProjectSummary {
    ProjectSummary {
        cash_in_total: cash_in_total(payments),
        cash_out_total: cash_out_total(payments),
        feature_overall_progress: round2(feature_overall_progress(features)),
        collectible_earnings: round2(collectible_earnings(features)),
    }
}

fn main_features(
    features: &[FeatureWithTasks],
) -> impl Iterator<Item = &FeatureWithTasks> {
    features
        .iter()
        .filter(|entry| entry.feature.kind == FeatureKind::Main)
}

/// Arithmetic mean of a feature's task progress values, as a percentage.
/// A feature with no tasks counts as 0.
fn average_progress(entry: &FeatureWithTasks) -> f64 {
    if entry.tasks.is_empty() {
        return 0.0;
    }

    let sum: u32 = entry.tasks.iter().map(|t| u32::from(t.progress)).sum();
    f64::from(sum) / entry.tasks.len() as f64
}

/// Round half away from zero to two decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
