use std::collections::HashMap;

use chrono::{Local, NaiveDate};
use uuid::Uuid;

use crate::calendar::{Calendar, Plan};

/// Undo record for a local mutation whose server call is still in flight.
#[derive(Debug, Clone, PartialEq)]
enum Rollback {
    RemovedCalendar { position: usize, calendar: Calendar },
    RemovedPlan { calendar_id: String, position: usize, plan: Plan },
    EditedCalendar { previous: Calendar, applied: Calendar },
    EditedPlan { previous: Plan, applied: Plan },
}

/// Client-side copy of the calendars visible to the session.
#[derive(Debug, Clone)]
pub struct CalendarState {
    calendars: Vec<Calendar>,
    focus_date: NaiveDate,
    pending: HashMap<Uuid, Rollback>,
}

impl CalendarState {
    pub fn new() -> Self {
        Self {
            calendars: Vec::new(),
            focus_date: Local::now().date_naive(),
            pending: HashMap::new(),
        }
    }

    pub fn calendars(&self) -> &[Calendar] {
        &self.calendars
    }

    pub fn focus_date(&self) -> NaiveDate {
        self.focus_date
    }

    pub fn set_focus_date(&mut self, date: NaiveDate) {
        self.focus_date = date;
    }

    /// Replaces the whole collection. Calendars already known keep their
    /// `active` toggle; outstanding rollbacks are dropped.
    pub fn set_calendars(&mut self, calendars: Vec<Calendar>) {
        let previous: HashMap<&str, bool> = self.calendars
            .iter()
            .map(|c| (c.id.as_str(), c.active))
            .collect();

        let merged: Vec<Calendar> = calendars
            .into_iter()
            .map(|mut calendar| {
                calendar.active = previous.get(calendar.id.as_str()).copied().unwrap_or(true);
                calendar
            })
            .collect();

        if !self.pending.is_empty() {
            tracing::debug!("Discarding {} pending rollbacks after refresh", self.pending.len());
        }
        self.pending.clear();
        self.calendars = merged;
    }

    pub fn add_calendar(&mut self, calendar: Calendar) {
        self.calendars.push(calendar);
    }

    /// Replaces the calendar with the same id, returning the old record.
    pub fn replace_calendar(&mut self, calendar: Calendar) -> Option<Calendar> {
        let slot = self.calendars.iter_mut().find(|c| c.id == calendar.id)?;
        Some(std::mem::replace(slot, calendar))
    }

    /// Shows or hides a calendar. Returns false when it is not present.
    pub fn set_active(&mut self, id: &str, active: bool) -> bool {
        match self.calendar_mut(id) {
            Some(calendar) => {
                calendar.active = active;
                true
            }
            None => false,
        }
    }

    pub fn take_calendar(&mut self, id: &str) -> Option<(usize, Calendar)> {
        let position = self.calendars.iter().position(|c| c.id == id)?;
        Some((position, self.calendars.remove(position)))
    }

    /// Appends the plan to its calendar. Returns false when that calendar is
    /// not present.
    pub fn add_plan(&mut self, plan: Plan) -> bool {
        match self.calendar_mut(&plan.calendar_id) {
            Some(calendar) => {
                calendar.plans.push(plan);
                true
            }
            None => false,
        }
    }

    /// Replaces the plan with the same id, moving it when its calendar
    /// changed. Returns the old record.
    pub fn replace_plan(&mut self, plan: Plan) -> Option<Plan> {
        let (calendar_index, plan_index) = self.locate_plan(&plan.id)?;
        let moves = self.calendars[calendar_index].id != plan.calendar_id
            && self.calendar(&plan.calendar_id).is_some();

        if moves {
            let previous = self.calendars[calendar_index].plans.remove(plan_index);
            self.add_plan(plan);
            Some(previous)
        } else {
            let slot = &mut self.calendars[calendar_index].plans[plan_index];
            Some(std::mem::replace(slot, plan))
        }
    }

    /// Removes a plan wherever it lives. Returns its calendar id and position.
    pub fn take_plan(&mut self, id: &str) -> Option<(String, usize, Plan)> {
        let (calendar_index, plan_index) = self.locate_plan(id)?;
        let calendar = &mut self.calendars[calendar_index];
        let plan = calendar.plans.remove(plan_index);
        Some((calendar.id.clone(), plan_index, plan))
    }

    fn calendar_mut(&mut self, id: &str) -> Option<&mut Calendar> {
        self.calendars.iter_mut().find(|c| c.id == id)
    }

    fn locate_plan(&self, id: &str) -> Option<(usize, usize)> {
        self.calendars.iter().enumerate().find_map(|(ci, calendar)| {
            calendar.plans.iter().position(|p| p.id == id).map(|pi| (ci, pi))
        })
    }

    pub fn calendar(&self, id: &str) -> Option<&Calendar> {
        self.calendars.iter().find(|c| c.id == id)
    }

    pub fn plan(&self, id: &str) -> Option<&Plan> {
        self.calendars.iter().find_map(|calendar| calendar.plan(id))
    }

    pub fn my_calendars(&self, user_id: &str) -> Vec<&Calendar> {
        self.calendars.iter().filter(|c| c.is_owned_by(user_id)).collect()
    }

    pub fn shared_calendars(&self, user_id: &str) -> Vec<&Calendar> {
        self.calendars.iter().filter(|c| !c.is_owned_by(user_id)).collect()
    }

    pub fn active_calendars(&self) -> Vec<&Calendar> {
        self.calendars.iter().filter(|c| c.active).collect()
    }

    pub fn active_plans(&self) -> Vec<&Plan> {
        self.calendars
            .iter()
            .filter(|c| c.active)
            .flat_map(|c| c.plans.iter())
            .collect()
    }

    /// Active plans touching `date`, all-day plans first, then by start.
    pub fn plans_on(&self, date: NaiveDate) -> Vec<&Plan> {
        let mut plans: Vec<&Plan> = self.active_plans()
            .into_iter()
            .filter(|p| p.occurs_on(date))
            .collect();
        plans.sort_by_key(|p| (!p.all_day, p.start));
        plans
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn record(&mut self, rollback: Rollback) -> Uuid {
        let request_id = Uuid::new_v4();
        self.pending.insert(request_id, rollback);
        request_id
    }

    pub fn record_removed_calendar(&mut self, position: usize, calendar: Calendar) -> Uuid {
        self.record(Rollback::RemovedCalendar { position, calendar })
    }

    pub fn record_removed_plan(&mut self, calendar_id: String, position: usize, plan: Plan) -> Uuid {
        self.record(Rollback::RemovedPlan { calendar_id, position, plan })
    }

    pub fn record_edited_calendar(&mut self, previous: Calendar, applied: Calendar) -> Uuid {
        self.record(Rollback::EditedCalendar { previous, applied })
    }

    pub fn record_edited_plan(&mut self, previous: Plan, applied: Plan) -> Uuid {
        self.record(Rollback::EditedPlan { previous, applied })
    }

    /// The server accepted the change; forget how to undo it.
    pub fn confirm(&mut self, request_id: Uuid) {
        self.pending.remove(&request_id);
    }

    /// The server rejected the change. Undoes it unless the state has moved
    /// on since. Returns whether anything was restored.
    pub fn revert(&mut self, request_id: Uuid) -> bool {
        let Some(rollback) = self.pending.remove(&request_id) else {
            return false;
        };

        match rollback {
            Rollback::RemovedCalendar { position, calendar } => {
                if self.calendar(&calendar.id).is_some() {
                    return false;
                }
                let position = position.min(self.calendars.len());
                self.calendars.insert(position, calendar);
                true
            }
            Rollback::RemovedPlan { calendar_id, position, plan } => {
                if self.plan(&plan.id).is_some() {
                    return false;
                }
                match self.calendar_mut(&calendar_id) {
                    Some(calendar) => {
                        let position = position.min(calendar.plans.len());
                        calendar.plans.insert(position, plan);
                        true
                    }
                    None => false,
                }
            }
            Rollback::EditedCalendar { previous, applied } => {
                if self.calendar(&applied.id) != Some(&applied) {
                    return false;
                }
                self.replace_calendar(previous).is_some()
            }
            Rollback::EditedPlan { previous, applied } => {
                if self.plan(&applied.id) != Some(&applied) {
                    return false;
                }
                self.replace_plan(previous).is_some()
            }
        }
    }
}

impl Default for CalendarState {
    fn default() -> Self {
        Self::new()
    }
}
