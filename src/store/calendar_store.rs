use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::calendar::{Calendar, Plan};
use crate::store::calendars::CalendarState;
use crate::store::session::SessionStore;
use crate::sync::api::CalendarApi;
use crate::sync::convert::{self, ConversionError};
use crate::sync::transport::TransportError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Request failed: {0}")]
    Transport(#[from] TransportError),
    #[error("Invalid calendar data: {0}")]
    Conversion(#[from] ConversionError),
    #[error("Calendar not found: {0}")]
    CalendarNotFound(String),
    #[error("Plan not found: {0}")]
    PlanNotFound(String),
}

impl StoreError {
    /// The session is missing or expired; callers should send the user to
    /// sign in again.
    pub fn is_auth(&self) -> bool {
        matches!(self, StoreError::Transport(TransportError::Auth))
    }
}

// Signed-in users who never registered with the calendar service are turned
// away with 401 or 403.
fn needs_registration(err: &TransportError) -> bool {
    matches!(err, TransportError::Auth | TransportError::Http { status: 403 })
}

/// Calendars and plans visible to the session. All reads and writes go
/// through one lock, which is never held across a server call.
pub struct CalendarStore {
    api: Arc<dyn CalendarApi>,
    session: Arc<SessionStore>,
    state: Mutex<CalendarState>,
}

impl CalendarStore {
    pub fn new(api: Arc<dyn CalendarApi>, session: Arc<SessionStore>) -> Self {
        Self {
            api,
            session,
            state: Mutex::new(CalendarState::new()),
        }
    }

    pub async fn load(&self) -> Result<(), StoreError> {
        let wire = match self.api.list_calendars().await {
            Ok(calendars) => calendars,
            Err(e) if needs_registration(&e) => {
                tracing::warn!("Calendar list refused ({}), registering user", e);
                self.api.register().await?;
                self.api.list_calendars().await?
            }
            Err(e) => return Err(e.into()),
        };

        let calendars = wire
            .into_iter()
            .map(convert::calendar_from_wire)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!("Loaded {} calendars", calendars.len());
        self.state.lock().await.set_calendars(calendars);
        Ok(())
    }

    pub async fn add_calendar(&self, name: &str, color: &str) -> Result<Calendar, StoreError> {
        let created = self.api.create_calendar(name, color).await?;
        let mut calendar = convert::calendar_from_wire(created)?;

        if calendar.owner_user_id.is_empty()
            && let Some(user_id) = self.session.user_id().await
        {
            calendar.owner_user_id = user_id;
        }

        tracing::info!("Calendar {} added", calendar.id);
        self.state.lock().await.add_calendar(calendar.clone());
        Ok(calendar)
    }

    pub async fn remove_calendar(&self, id: &str) -> Result<(), StoreError> {
        let request_id = {
            let mut state = self.state.lock().await;
            state
                .take_calendar(id)
                .map(|(position, calendar)| state.record_removed_calendar(position, calendar))
        };

        let result = self.api.delete_calendar(id).await;
        self.reconcile(request_id, result).await
    }

    /// Replaces the local calendar with the same id. Unless `skip_remote`,
    /// the change is also sent to the server and undone if it is refused.
    pub async fn edit_calendar(&self, calendar: Calendar, skip_remote: bool) -> Result<(), StoreError> {
        if skip_remote {
            let id = calendar.id.clone();
            return match self.state.lock().await.replace_calendar(calendar) {
                Some(_) => Ok(()),
                None => Err(StoreError::CalendarNotFound(id)),
            };
        }

        let wire = convert::calendar_to_wire(&calendar)?;
        let request_id = {
            let mut state = self.state.lock().await;
            let previous = state
                .replace_calendar(calendar.clone())
                .ok_or_else(|| StoreError::CalendarNotFound(calendar.id.clone()))?;
            state.record_edited_calendar(previous, calendar)
        };

        let result = self.api.update_calendar(&wire).await;
        self.reconcile(Some(request_id), result).await
    }

    pub async fn set_calendar_active(&self, id: &str, active: bool) -> Result<(), StoreError> {
        if self.state.lock().await.set_active(id, active) {
            Ok(())
        } else {
            Err(StoreError::CalendarNotFound(id.to_string()))
        }
    }

    pub async fn add_plan(&self, plan: Plan) -> Result<Plan, StoreError> {
        if self.state.lock().await.calendar(&plan.calendar_id).is_none() {
            return Err(StoreError::CalendarNotFound(plan.calendar_id));
        }

        let wire = convert::plan_to_wire(&plan)?;
        let created = self.api.create_plan(&wire).await?;
        let created = convert::plan_from_wire(created)?;

        if !self.state.lock().await.add_plan(created.clone()) {
            tracing::warn!(
                "Calendar {} vanished before plan {} was stored",
                created.calendar_id,
                created.id
            );
        }
        Ok(created)
    }

    pub async fn edit_plan(&self, plan: Plan) -> Result<(), StoreError> {
        let wire = convert::plan_to_wire(&plan)?;
        let request_id = {
            let mut state = self.state.lock().await;
            if state.calendar(&plan.calendar_id).is_none() {
                return Err(StoreError::CalendarNotFound(plan.calendar_id));
            }
            let previous = state
                .replace_plan(plan.clone())
                .ok_or_else(|| StoreError::PlanNotFound(plan.id.clone()))?;
            state.record_edited_plan(previous, plan)
        };

        match self.api.update_plan(&wire).await {
            Ok(Some(echoed)) => {
                let echoed = convert::plan_from_wire(echoed);
                let mut state = self.state.lock().await;
                state.confirm(request_id);
                match echoed {
                    Ok(echoed) => {
                        state.replace_plan(echoed);
                    }
                    Err(e) => tracing::warn!("Ignoring unreadable plan echo ({}), keeping local edit", e),
                }
                Ok(())
            }
            Ok(None) => self.reconcile(Some(request_id), Ok(())).await,
            Err(e) => self.reconcile(Some(request_id), Err(e)).await,
        }
    }

    /// `calendar_id` only addresses the server request; the plan is removed
    /// locally wherever it is found.
    pub async fn remove_plan(&self, id: &str, calendar_id: &str) -> Result<(), StoreError> {
        let request_id = {
            let mut state = self.state.lock().await;
            state
                .take_plan(id)
                .map(|(owner, position, plan)| state.record_removed_plan(owner, position, plan))
        };

        let result = self.api.delete_plan(id, calendar_id).await;
        self.reconcile(request_id, result).await
    }

    pub async fn set_focus_date(&self, date: NaiveDate) {
        self.state.lock().await.set_focus_date(date);
    }

    async fn reconcile(
        &self,
        request_id: Option<Uuid>,
        result: Result<(), TransportError>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        match result {
            Ok(()) => {
                if let Some(request_id) = request_id {
                    state.confirm(request_id);
                }
                Ok(())
            }
            Err(e) => {
                if let Some(request_id) = request_id
                    && state.revert(request_id)
                {
                    tracing::warn!("Server refused change ({}), local state restored", e);
                }
                Err(e.into())
            }
        }
    }

    pub async fn focus_date(&self) -> NaiveDate {
        self.state.lock().await.focus_date()
    }

    pub async fn calendars(&self) -> Vec<Calendar> {
        self.state.lock().await.calendars().to_vec()
    }

    pub async fn calendar(&self, id: &str) -> Option<Calendar> {
        self.state.lock().await.calendar(id).cloned()
    }

    pub async fn plan(&self, id: &str) -> Option<Plan> {
        self.state.lock().await.plan(id).cloned()
    }

    pub async fn my_calendars(&self) -> Vec<Calendar> {
        let user_id = self.session.user_id().await.unwrap_or_default();
        let state = self.state.lock().await;
        state.my_calendars(&user_id).into_iter().cloned().collect()
    }

    pub async fn shared_calendars(&self) -> Vec<Calendar> {
        let user_id = self.session.user_id().await.unwrap_or_default();
        let state = self.state.lock().await;
        state.shared_calendars(&user_id).into_iter().cloned().collect()
    }

    pub async fn active_calendars(&self) -> Vec<Calendar> {
        let state = self.state.lock().await;
        state.active_calendars().into_iter().cloned().collect()
    }

    pub async fn active_plans(&self) -> Vec<Plan> {
        let state = self.state.lock().await;
        state.active_plans().into_iter().cloned().collect()
    }

    pub async fn plans_on(&self, date: NaiveDate) -> Vec<Plan> {
        let state = self.state.lock().await;
        state.plans_on(date).into_iter().cloned().collect()
    }

    pub async fn pending_changes(&self) -> usize {
        self.state.lock().await.pending_count()
    }
}
