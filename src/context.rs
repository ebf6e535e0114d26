//! Per-request identity and configuration.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub const UNKNOWN_USER_ID: &str = "UNKNOWN";

/// The requesting user and the authorisations they hold.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    user_id: String,
    auths: BTreeSet<String>,
}

impl User {
    pub fn new<I, S>(user_id: impl Into<String>, auths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_id: user_id.into(),
            auths: auths.into_iter().map(Into::into).collect(),
        }
    }

    /// A user with no authorisations.
    pub fn named(user_id: impl Into<String>) -> Self {
        Self::new(user_id, std::iter::empty::<String>())
    }

    pub fn unknown() -> Self {
        Self::named(UNKNOWN_USER_ID)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn auths(&self) -> &BTreeSet<String> {
        &self.auths
    }

    pub fn has_auth(&self, auth: &str) -> bool {
        self.auths.contains(auth)
    }
}

impl Default for User {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Passed unchanged through every step of a chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    user: User,
    config: BTreeMap<String, String>,
}

impl Context {
    pub fn new(user: User) -> Self {
        Self {
            user,
            config: BTreeMap::new(),
        }
    }

    pub fn with_config<I, K, V>(user: User, config: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            user,
            config: config
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn config(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }
}
