

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};


/// Identity of whoever asked for the purge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: String,
}

impl Caller {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

impl std::fmt::Display for Caller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.user_id)
    }
}


#[async_trait]
pub trait Authorizer: Send + Sync {

    async fn has_role(&self, caller: &Caller, role: &str) -> bool;
}


#[async_trait]
impl Authorizer for Arc<dyn Authorizer> {
    async fn has_role(&self, caller: &Caller, role: &str) -> bool {
        (**self).has_role(caller, role).await
    }
}


#[derive(Debug, Clone, Default)]
pub struct StaticAuthorizer {
    roles: HashMap<String, HashSet<String>>,
}

impl StaticAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }


    pub fn grant(mut self, user_id: &str, role: &str) -> Self {
        self.roles
            .entry(user_id.to_string())
            .or_default()
            .insert(role.to_string());
        self
    }
}

#[async_trait]
impl Authorizer for StaticAuthorizer {
    async fn has_role(&self, caller: &Caller, role: &str) -> bool {
        self.roles
            .get(&caller.user_id)
            .is_some_and(|roles| roles.contains(role))
    }
}
