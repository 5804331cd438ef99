use serde::{Deserialize, Serialize};

/// Profile of the signed-in user. Owned by the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub nickname: String,
    /// The mock directory calls this field `avatar`
    #[serde(default, alias = "avatar")]
    pub avatar_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, alias = "createdTime", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, alias = "updatedTime", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl UserProfile {
    pub fn new(id: i64, email: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            id,
            username: None,
            email: email.into(),
            nickname: nickname.into(),
            avatar_url: String::new(),
            status: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Nickname, falling back to username, then email.
    pub fn display_name(&self) -> &str {
        if !self.nickname.is_empty() {
            return &self.nickname;
        }
        match self.username.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.email,
        }
    }

    /// Merge the fields present in `update`; absent fields keep their value.
    pub fn merge(&mut self, update: &UserUpdate) {
        if let Some(ref username) = update.username {
            self.username = Some(username.clone());
        }
        if let Some(ref email) = update.email {
            self.email = email.clone();
        }
        if let Some(ref nickname) = update.nickname {
            self.nickname = nickname.clone();
        }
        if let Some(ref avatar_url) = update.avatar_url {
            self.avatar_url = avatar_url.clone();
        }
        if let Some(ref status) = update.status {
            self.status = Some(status.clone());
        }
        if let Some(ref updated_at) = update.updated_at {
            self.updated_at = Some(updated_at.clone());
        }
    }
}

/// Partial profile: request body for profile updates, and the shape server
/// responses are merged through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, alias = "avatar", skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, alias = "updatedTime", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        *self == UserUpdate::default()
    }
}
