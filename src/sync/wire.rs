use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCalendar {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub shares: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub plans: Vec<WirePlan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePlan {
    #[serde(default)]
    pub id: String,
    pub calendar_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub shares: Vec<String>,
    pub begin: i64,
    pub end: i64,
    #[serde(default)]
    pub is_all_day: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCalendarRequest<'a> {
    pub name: &'a str,
    pub color: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemovePlanRequest<'a> {
    pub calendar_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials<'a> {
    pub name: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignInResponse {
    pub id: String,
}

// The server encodes empty Go slices as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn created_calendar_without_owner_or_plans_parses() {
        let value = json!({"id": "c9", "name": "Trip", "color": "blue", "shares": null});

        let calendar: WireCalendar = serde_json::from_value(value).unwrap();

        assert_eq!(calendar.id, "c9");
        assert!(calendar.user_id.is_empty());
        assert!(calendar.shares.is_empty());
        assert!(calendar.plans.is_empty());
    }

    #[test]
    fn plan_uses_server_field_names() {
        let plan = WirePlan {
            id: "p1".to_string(),
            calendar_id: "c1".to_string(),
            user_id: "u1".to_string(),
            name: "Dentist".to_string(),
            memo: String::new(),
            color: "red".to_string(),
            private: true,
            shares: vec![],
            begin: 100,
            end: 200,
            is_all_day: false,
        };

        let value = serde_json::to_value(&plan).unwrap();

        assert_eq!(value["is_all_day"], json!(false));
        assert_eq!(value["begin"], json!(100));
        assert_eq!(value["user_id"], json!("u1"));
    }

    #[test]
    fn plan_without_period_is_rejected() {
        let value = json!({"id": "p1", "calendar_id": "c1", "name": "x"});

        let result: Result<WirePlan, _> = serde_json::from_value(value);

        assert!(result.is_err());
    }

    #[test]
    fn remove_plan_request_carries_calendar_id() {
        let value = serde_json::to_value(RemovePlanRequest { calendar_id: "c1" }).unwrap();

        assert_eq!(value, json!({"calendar_id": "c1"}));
    }
}
