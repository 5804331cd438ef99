use std::rc::Rc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use counsel_types::{
    ClientError, Outcome, Result,
    session::AuthGrant,
    user::UserProfile,
};

use crate::http::{decode, ApiClient};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
    pub remember_me: bool,
}

impl LoginRequest {
    pub fn new(username_or_email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username_or_email: username_or_email.into(),
            password: password.into(),
            remember_me: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub nickname: String,
}

/// Authentication operations. Implementations keep the session store in
/// step with what the backend (real or mock) says.
#[async_trait(?Send)]
pub trait AuthApi {
    /// Sign in and establish the session.
    async fn login(&self, req: &LoginRequest) -> Outcome<UserProfile>;

    /// Create an account. Signs in when the backend issues a token with it.
    async fn register(&self, req: &RegisterRequest) -> Outcome<UserProfile>;

    /// Check the held token and refresh the cached profile.
    async fn validate(&self) -> Outcome<UserProfile>;

    /// Exchange the refresh token for a new access token.
    async fn refresh(&self) -> Outcome<()>;

    /// Tell the backend, then end the local session whatever it answered.
    async fn logout(&self) -> Outcome<()>;

    fn name(&self) -> &str;
}

// ─── REST implementation ─────────────────────────────────────

pub struct RemoteAuth {
    client: Rc<ApiClient>,
}

impl RemoteAuth {
    pub fn new(client: Rc<ApiClient>) -> Self {
        Self { client }
    }

    /// Turn a grant into a signed-in session.
    fn establish(&self, grant: &AuthGrant) -> Result<UserProfile> {
        let user = grant
            .user_info
            .clone()
            .ok_or_else(|| ClientError::Serialization {
                message: "auth response has no userInfo".to_string(),
            })?;
        let credential = grant.credential(Utc::now(), self.client.config().token_ttl_ms);
        self.client.session().login(user.clone(), credential)?;
        Ok(user)
    }

    async fn try_login(&self, req: &LoginRequest) -> Result<UserProfile> {
        let payload = self
            .client
            .post("auth/login", Some(serde_json::to_value(req)?))
            .await?;
        let grant: AuthGrant = decode(payload)?;
        self.establish(&grant)
    }

    async fn try_register(&self, req: &RegisterRequest) -> Result<UserProfile> {
        let payload = self
            .client
            .post("auth/register", Some(serde_json::to_value(req)?))
            .await?;
        match decode::<AuthGrant>(payload.clone()) {
            Ok(grant) if !grant.access_token.is_empty() => self.establish(&grant),
            _ => decode(payload),
        }
    }

    async fn try_validate(&self) -> Result<UserProfile> {
        let payload = self.client.get("auth/validate", &[]).await?;
        let user: UserProfile = match payload.get("userInfo") {
            Some(info) => decode(info.clone())?,
            None => decode(payload)?,
        };
        self.client.session().replace_user(user.clone())?;
        Ok(user)
    }

    async fn try_refresh(&self) -> Result<()> {
        let refresh_token = self
            .client
            .session()
            .refresh_token()
            .ok_or_else(|| ClientError::validation("refreshToken", "没有可用的刷新令牌"))?;
        let payload = self
            .client
            .post("auth/refresh", Some(json!({ "refreshToken": refresh_token })))
            .await?;
        let grant: AuthGrant = decode(payload)?;
        let credential = grant.credential(Utc::now(), self.client.config().token_ttl_ms);
        self.client.session().refresh(credential)?;
        if let Some(user) = grant.user_info {
            self.client.session().replace_user(user)?;
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl AuthApi for RemoteAuth {
    async fn login(&self, req: &LoginRequest) -> Outcome<UserProfile> {
        Outcome::from_result(self.try_login(req).await, "登录成功", "登录失败")
    }

    async fn register(&self, req: &RegisterRequest) -> Outcome<UserProfile> {
        Outcome::from_result(self.try_register(req).await, "注册成功", "注册失败")
    }

    async fn validate(&self) -> Outcome<UserProfile> {
        Outcome::from_result(self.try_validate().await, "", "令牌验证失败")
    }

    async fn refresh(&self) -> Outcome<()> {
        Outcome::from_result(self.try_refresh().await, "", "刷新令牌失败")
    }

    async fn logout(&self) -> Outcome<()> {
        let result = if self.client.session().is_authenticated() {
            self.client.post("auth/logout", None).await.map(|_| ())
        } else {
            Ok(())
        };
        if let Err(ref e) = result {
            log::warn!("Server logout failed, ending session locally: {}", e);
        }
        self.client.session().logout();
        Outcome::ok_with((), "退出登录成功")
    }

    fn name(&self) -> &str {
        "remote"
    }
}
