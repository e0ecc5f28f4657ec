use std::sync::Arc;

use crate::storage::config::Config;
use crate::storage::session_file::SessionStorage;
use crate::store::{CalendarStore, SessionError, SessionStore};
use crate::sync::api::{AuthApi, CalendarApi, RestApi};
use crate::sync::transport::Transport;

/// Everything a front end needs, built once and handed around explicitly.
pub struct AppContext {
    pub config: Config,
    pub session: Arc<SessionStore>,
    pub calendars: CalendarStore,
}

impl AppContext {
    pub fn new(config: Config) -> Self {
        let transport = Transport::new(
            config.server.base_url.clone(),
            config.server.xsrf_token.clone(),
        );
        let api = Arc::new(RestApi::new(transport));
        let storage = SessionStorage::new(config.session.storage_path.clone());

        Self::with_apis(config, api.clone(), api, Some(storage))
    }

    pub fn with_apis(
        config: Config,
        calendar_api: Arc<dyn CalendarApi>,
        auth_api: Arc<dyn AuthApi>,
        storage: Option<SessionStorage>,
    ) -> Self {
        let session = Arc::new(SessionStore::new(auth_api, storage));
        let calendars = CalendarStore::new(calendar_api, session.clone());

        Self {
            config,
            session,
            calendars,
        }
    }

    /// Loads the session left behind by an earlier run.
    pub async fn restore(&self) -> Result<(), SessionError> {
        self.session.restore().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, temp_dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.server.base_url = server.uri();
        config.session.storage_path = temp_dir.path().join("session.json");
        config
    }

    #[tokio::test]
    async fn adding_a_calendar_end_to_end() {
        let server = MockServer::start().await;
        let temp_dir = TempDir::new().unwrap();
        Mock::given(method("POST"))
            .and(path("/calendars"))
            .and(body_json(json!({"name": "Trip", "color": "blue"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "c9", "user_id": "u1", "name": "Trip", "color": "blue", "shares": [], "plans": []
            })))
            .mount(&server)
            .await;
        let app = AppContext::new(config_for(&server, &temp_dir));

        app.calendars.add_calendar("Trip", "blue").await.unwrap();

        let calendars = app.calendars.calendars().await;
        assert_eq!(calendars.len(), 1);
        assert_eq!(calendars[0].id, "c9");
        assert!(calendars[0].active);
        assert!(calendars[0].plans.is_empty());
    }

    #[tokio::test]
    async fn session_survives_restart_and_authorizes_requests() {
        let server = MockServer::start().await;
        let temp_dir = TempDir::new().unwrap();
        Mock::given(method("POST"))
            .and(path("/auth/signin"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "session_id=s1; Path=/; HttpOnly")
                    .set_body_json(json!({"id": "u1"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/calendars"))
            .and(header("cookie", "session_id=s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "c1", "user_id": "u1", "name": "Mine", "color": "red", "shares": ["u1", "u2"], "plans": []},
                {"id": "c2", "user_id": "u2", "name": "Theirs", "color": "green", "shares": ["u1"], "plans": []}
            ])))
            .mount(&server)
            .await;

        let first = AppContext::new(config_for(&server, &temp_dir));
        assert!(first.session.sign_in("alice", "secret").await);

        let second = AppContext::new(config_for(&server, &temp_dir));
        second.restore().await.unwrap();
        second.calendars.load().await.unwrap();

        let mine = second.calendars.my_calendars().await;
        let shared = second.calendars.shared_calendars().await;
        assert_eq!(mine.len(), 1);
        assert_eq!(shared.len(), 1);
        assert_eq!(mine[0].shares.iter().cloned().collect::<Vec<_>>(), vec!["u2".to_string()]);
    }
}
