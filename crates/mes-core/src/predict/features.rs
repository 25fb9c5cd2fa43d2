use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::kst_wall_clock;

pub const FEATURE_COUNT: usize = 5;

/// Column order the scaler and model were fitted on.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "product_encoded",
    "planned_qty",
    "month",
    "day_of_week",
    "days_to_due",
];

const SECS_PER_DAY: i64 = 86_400;

/// Calendar features of an order, measured on the KST clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarFeatures {
    /// 1-12
    pub month: u32,
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: u32,
    /// Whole days from creation to due date, floored; negative when overdue.
    pub days_to_due: i64,
}

impl CalendarFeatures {
    pub fn derive(due_date: NaiveDateTime, now: DateTime<Utc>) -> Self {
        let created = kst_wall_clock(now);
        let days_to_due = (due_date - created).num_seconds().div_euclid(SECS_PER_DAY);
        if days_to_due < 0 {
            tracing::debug!(%due_date, %created, days_to_due, "order is already overdue at creation");
        }
        Self {
            month: created.month(),
            day_of_week: created.weekday().num_days_from_monday(),
            days_to_due,
        }
    }
}

/// One model input row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub product_encoded: f64,
    pub planned_qty: i64,
    pub month: u32,
    pub day_of_week: u32,
    pub days_to_due: i64,
}

impl FeatureRow {
    pub fn new(product_encoded: f64, planned_qty: i64, calendar: CalendarFeatures) -> Self {
        Self {
            product_encoded,
            planned_qty,
            month: calendar.month,
            day_of_week: calendar.day_of_week,
            days_to_due: calendar.days_to_due,
        }
    }

    /// Values in [`FEATURE_NAMES`] order.
    pub fn to_vector(&self) -> [f64; FEATURE_COUNT] {
        [
            self.product_encoded,
            self.planned_qty as f64,
            self.month as f64,
            self.day_of_week as f64,
            self.days_to_due as f64,
        ]
    }
}
