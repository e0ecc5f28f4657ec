use std::collections::BTreeSet;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Name shown for a private plan whose name was withheld by the server.
pub const PRIVATE_PLAN_NAME: &str = "Private Plan";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub calendar_id: String,
    pub owner_user_id: String,
    pub name: String,
    pub memo: String,
    pub color: String,
    pub private: bool,
    pub shares: BTreeSet<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
}

impl Plan {
    /// A plan that has not been created on the server yet. The id stays
    /// empty until the server assigns one.
    pub fn draft(
        calendar_id: impl Into<String>,
        name: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: String::new(),
            calendar_id: calendar_id.into(),
            owner_user_id: String::new(),
            name: name.into(),
            memo: String::new(),
            color: String::new(),
            private: false,
            shares: BTreeSet::new(),
            start,
            end,
            all_day: false,
        }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn overlaps(&self, other: &Plan) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether the plan touches the given local calendar day.
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        let first = self.start.with_timezone(&Local).date_naive();
        let last = self.end.with_timezone(&Local).date_naive();
        first <= date && date <= last
    }
}
