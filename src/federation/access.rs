use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::context::User;

/// Who may see a delegate graph.
///
/// A graph is visible to its owner, to users holding any of its auths, and to everyone when public.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphAccess {
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    auths: BTreeSet<String>,
    #[serde(default)]
    public: bool,
}

impl GraphAccess {
    pub fn public() -> Self {
        Self {
            public: true,
            ..Self::default()
        }
    }

    pub fn owned_by(user_id: impl Into<String>) -> Self {
        Self {
            owner: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn with_auths<I, S>(owner: Option<&str>, auths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            owner: owner.map(str::to_string),
            auths: auths.into_iter().map(Into::into).collect(),
            public: false,
        }
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn auths(&self) -> &BTreeSet<String> {
        &self.auths
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    /// This descriptor, owned by `user_id` when it names no owner yet.
    pub fn or_owned_by(mut self, user_id: &str) -> Self {
        if self.owner.is_none() {
            self.owner = Some(user_id.to_string());
        }
        self
    }

    pub fn is_visible_to(&self, user: &User) -> bool {
        self.public
            || self.owner.as_deref() == Some(user.user_id())
            || self.auths.iter().any(|auth| user.has_auth(auth))
    }
}
