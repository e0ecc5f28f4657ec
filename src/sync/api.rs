use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::sync::transport::{Method, Transport, TransportError};
use crate::sync::wire::{
    Credentials, NewCalendarRequest, RemovePlanRequest, SignInResponse, WireCalendar, WirePlan,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalendarApi: Send + Sync {
    async fn list_calendars(&self) -> Result<Vec<WireCalendar>, TransportError>;

    async fn register(&self) -> Result<(), TransportError>;

    async fn create_calendar(&self, name: &str, color: &str) -> Result<WireCalendar, TransportError>;

    async fn delete_calendar(&self, id: &str) -> Result<(), TransportError>;

    async fn update_calendar(&self, calendar: &WireCalendar) -> Result<(), TransportError>;

    async fn create_plan(&self, plan: &WirePlan) -> Result<WirePlan, TransportError>;

    async fn delete_plan(&self, id: &str, calendar_id: &str) -> Result<(), TransportError>;

    /// `Ok(None)` when the server accepted the change without echoing it.
    async fn update_plan(&self, plan: &WirePlan) -> Result<Option<WirePlan>, TransportError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Returns the signed-in user's id.
    async fn sign_in(&self, name: &str, password: &str) -> Result<String, TransportError>;

    async fn sign_up(&self, name: &str, password: &str) -> Result<(), TransportError>;

    async fn sign_out(&self) -> Result<(), TransportError>;

    fn session_token(&self) -> Option<String>;

    fn restore_session_token(&self, token: Option<String>);
}

pub struct RestApi {
    transport: Transport,
}

impl RestApi {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }
}

fn encode<T: Serialize>(body: &T) -> Result<Value, TransportError> {
    serde_json::to_value(body).map_err(|e| TransportError::Parse(e.to_string()))
}

fn decode<T: DeserializeOwned>(value: Option<Value>, what: &str) -> Result<T, TransportError> {
    let value = value.ok_or_else(|| TransportError::Parse(format!("Empty {} response", what)))?;
    serde_json::from_value(value).map_err(|e| TransportError::Parse(format!("Invalid {}: {}", what, e)))
}

fn calendar_path(id: &str) -> String {
    format!("calendars/{}", urlencoding::encode(id))
}

fn plan_path(id: &str) -> String {
    format!("plans/{}", urlencoding::encode(id))
}

#[async_trait]
impl CalendarApi for RestApi {
    async fn list_calendars(&self) -> Result<Vec<WireCalendar>, TransportError> {
        let body = self.transport.request("calendars", Method::Get, None, true).await?;
        let calendars: Vec<WireCalendar> = decode(body, "calendar list")?;
        tracing::info!("Fetched {} calendars", calendars.len());
        Ok(calendars)
    }

    async fn register(&self) -> Result<(), TransportError> {
        tracing::info!("Registering user with the calendar service");
        self.transport.request("register", Method::Post, None, true).await?;
        Ok(())
    }

    async fn create_calendar(&self, name: &str, color: &str) -> Result<WireCalendar, TransportError> {
        tracing::info!("Creating calendar: {}", name);
        let body = encode(&NewCalendarRequest { name, color })?;
        let created = self.transport.request("calendars", Method::Post, Some(body), true).await?;
        decode(created, "calendar")
    }

    async fn delete_calendar(&self, id: &str) -> Result<(), TransportError> {
        tracing::info!("Deleting calendar {}", id);
        self.transport.request(&calendar_path(id), Method::Delete, None, true).await?;
        Ok(())
    }

    async fn update_calendar(&self, calendar: &WireCalendar) -> Result<(), TransportError> {
        tracing::info!("Updating calendar {}: {}", calendar.id, calendar.name);
        let body = encode(calendar)?;
        self.transport.request(&calendar_path(&calendar.id), Method::Patch, Some(body), true).await?;
        Ok(())
    }

    async fn create_plan(&self, plan: &WirePlan) -> Result<WirePlan, TransportError> {
        tracing::info!("Creating plan in calendar {}: {}", plan.calendar_id, plan.name);
        let body = encode(plan)?;
        let created = self.transport.request("plans", Method::Post, Some(body), true).await?;
        decode(created, "plan")
    }

    async fn delete_plan(&self, id: &str, calendar_id: &str) -> Result<(), TransportError> {
        tracing::info!("Deleting plan {} from calendar {}", id, calendar_id);
        let body = encode(&RemovePlanRequest { calendar_id })?;
        self.transport.request(&plan_path(id), Method::Delete, Some(body), true).await?;
        Ok(())
    }

    async fn update_plan(&self, plan: &WirePlan) -> Result<Option<WirePlan>, TransportError> {
        tracing::info!("Updating plan {}: {}", plan.id, plan.name);
        let body = encode(plan)?;
        let updated = self.transport.request(&plan_path(&plan.id), Method::Patch, Some(body), true).await?;
        match updated {
            Some(value) => decode(Some(value), "plan").map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AuthApi for RestApi {
    async fn sign_in(&self, name: &str, password: &str) -> Result<String, TransportError> {
        tracing::info!("Signing in as {}", name);
        let body = encode(&Credentials { name, password })?;
        let response = self.transport.request("auth/signin", Method::Post, Some(body), false).await?;
        let signed_in: SignInResponse = decode(response, "sign-in")?;
        Ok(signed_in.id)
    }

    async fn sign_up(&self, name: &str, password: &str) -> Result<(), TransportError> {
        tracing::info!("Signing up as {}", name);
        let body = encode(&Credentials { name, password })?;
        self.transport.request("auth/signup", Method::Post, Some(body), false).await?;
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), TransportError> {
        let result = self.transport.request("auth/signout", Method::Post, None, true).await;
        self.transport.set_session_token(None);
        result.map(|_| ())
    }

    fn session_token(&self) -> Option<String> {
        self.transport.session_token()
    }

    fn restore_session_token(&self, token: Option<String>) {
        self.transport.set_session_token(token);
    }
}
