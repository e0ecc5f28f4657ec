use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::Plan;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    pub id: String,
    pub owner_user_id: String,
    pub name: String,
    pub color: String,
    /// Local display toggle. Never sent to the server.
    pub active: bool,
    pub shares: BTreeSet<String>,
    pub plans: Vec<Plan>,
}

impl Calendar {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_user_id == user_id
    }

    pub fn plan(&self, plan_id: &str) -> Option<&Plan> {
        self.plans.iter().find(|plan| plan.id == plan_id)
    }
}
