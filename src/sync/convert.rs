use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::calendar::{Calendar, Plan, PRIVATE_PLAN_NAME};
use crate::sync::wire::{WireCalendar, WirePlan};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Timestamp out of range: {0}")]
    TimestampOutOfRange(i64),
    #[error("Plan ends before it begins ({begin} > {end})")]
    InvertedPeriod { begin: i64, end: i64 },
}

fn from_epoch_seconds(seconds: i64) -> Result<DateTime<Utc>, ConversionError> {
    DateTime::from_timestamp(seconds, 0).ok_or(ConversionError::TimestampOutOfRange(seconds))
}

fn check_period(begin: i64, end: i64) -> Result<(), ConversionError> {
    if begin > end {
        return Err(ConversionError::InvertedPeriod { begin, end });
    }
    Ok(())
}

pub fn plan_from_wire(wire: WirePlan) -> Result<Plan, ConversionError> {
    check_period(wire.begin, wire.end)?;
    let start = from_epoch_seconds(wire.begin)?;
    let end = from_epoch_seconds(wire.end)?;

    let name = if wire.private && wire.name.is_empty() {
        PRIVATE_PLAN_NAME.to_string()
    } else {
        wire.name
    };

    Ok(Plan {
        id: wire.id,
        calendar_id: wire.calendar_id,
        owner_user_id: wire.user_id,
        name,
        memo: wire.memo,
        color: wire.color,
        private: wire.private,
        shares: wire.shares.into_iter().collect(),
        start,
        end,
        all_day: wire.is_all_day,
    })
}

pub fn plan_to_wire(plan: &Plan) -> Result<WirePlan, ConversionError> {
    let begin = plan.start.timestamp();
    let end = plan.end.timestamp();
    check_period(begin, end)?;

    Ok(WirePlan {
        id: plan.id.clone(),
        calendar_id: plan.calendar_id.clone(),
        user_id: plan.owner_user_id.clone(),
        name: plan.name.clone(),
        memo: plan.memo.clone(),
        color: plan.color.clone(),
        private: plan.private,
        shares: plan.shares.iter().cloned().collect(),
        begin,
        end,
        is_all_day: plan.all_day,
    })
}

/// Converts a calendar and its plans. The result is `active`; callers that
/// track a previous toggle state restore it themselves.
pub fn calendar_from_wire(wire: WireCalendar) -> Result<Calendar, ConversionError> {
    let plans = wire.plans
        .into_iter()
        .map(plan_from_wire)
        .collect::<Result<Vec<_>, _>>()?;

    let shares: BTreeSet<String> = wire.shares
        .into_iter()
        .filter(|id| *id != wire.user_id)
        .collect();

    Ok(Calendar {
        id: wire.id,
        owner_user_id: wire.user_id,
        name: wire.name,
        color: wire.color,
        active: true,
        shares,
        plans,
    })
}

pub fn calendar_to_wire(calendar: &Calendar) -> Result<WireCalendar, ConversionError> {
    let plans = calendar.plans
        .iter()
        .map(plan_to_wire)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(WireCalendar {
        id: calendar.id.clone(),
        user_id: calendar.owner_user_id.clone(),
        name: calendar.name.clone(),
        color: calendar.color.clone(),
        shares: calendar.shares.iter().cloned().collect(),
        plans,
    })
}
