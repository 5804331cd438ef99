use std::rc::Rc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use counsel_types::{
    ClientError, Outcome, Result,
    user::{UserProfile, UserUpdate},
};

use crate::http::{decode, ApiClient};
use crate::ports::FilePart;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Operations on the signed-in user's own profile.
#[async_trait(?Send)]
pub trait ProfileApi {
    async fn profile(&self) -> Outcome<UserProfile>;

    /// Returns the merged profile now held by the session store.
    async fn update_profile(&self, update: &UserUpdate) -> Outcome<UserProfile>;

    async fn change_password(&self, change: &PasswordChange) -> Outcome<()>;

    /// Returns the new avatar URL.
    async fn upload_avatar(&self, file: FilePart) -> Outcome<String>;
}

pub struct UserApi {
    client: Rc<ApiClient>,
}

impl UserApi {
    pub fn new(client: Rc<ApiClient>) -> Self {
        Self { client }
    }

    async fn try_profile(&self) -> Result<UserProfile> {
        let user: UserProfile = decode(self.client.get("users/profile", &[]).await?)?;
        self.client.session().replace_user(user.clone())?;
        Ok(user)
    }

    async fn try_update(&self, update: &UserUpdate) -> Result<UserProfile> {
        let payload = self
            .client
            .put("users/profile", Some(serde_json::to_value(update)?))
            .await?;

        // The server echoes the stored profile; fall back to what was sent.
        let merged = match decode::<UserUpdate>(payload) {
            Ok(echo) if !echo.is_empty() => echo,
            _ => update.clone(),
        };
        self.client.session().update_user(&merged)?;
        self.client
            .session()
            .current_user()
            .ok_or_else(|| ClientError::validation("session", "用户未登录"))
    }

    async fn try_upload(&self, file: FilePart) -> Result<String> {
        let payload = self.client.upload("users/avatar", file).await?;
        let url = ["avatarUrl", "url"]
            .iter()
            .find_map(|field| payload.get(*field).and_then(Value::as_str))
            .or_else(|| payload.as_str())
            .map(str::to_string)
            .ok_or_else(|| ClientError::Serialization {
                message: "upload response has no avatarUrl".to_string(),
            })?;
        self.client.session().update_user(&UserUpdate {
            avatar_url: Some(url.clone()),
            ..UserUpdate::default()
        })?;
        Ok(url)
    }
}

#[async_trait(?Send)]
impl ProfileApi for UserApi {
    async fn profile(&self) -> Outcome<UserProfile> {
        Outcome::from_result(self.try_profile().await, "", "获取用户信息失败")
    }

    async fn update_profile(&self, update: &UserUpdate) -> Outcome<UserProfile> {
        Outcome::from_result(self.try_update(update).await, "更新成功", "更新用户信息失败")
    }

    async fn change_password(&self, change: &PasswordChange) -> Outcome<()> {
        let result = match serde_json::to_value(change) {
            Ok(body) => self.client.put("users/password", Some(body)).await.map(|_| ()),
            Err(e) => Err(e.into()),
        };
        Outcome::from_result(result, "密码修改成功", "修改密码失败")
    }

    async fn upload_avatar(&self, file: FilePart) -> Outcome<String> {
        Outcome::from_result(self.try_upload(file).await, "头像上传成功", "头像上传失败")
    }
}
