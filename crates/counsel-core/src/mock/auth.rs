use std::rc::Rc;

use async_trait::async_trait;
use chrono::Utc;

use counsel_types::{
    ClientError, Outcome, Result,
    config::MockConfig,
    envelope::codes,
    session::{expiry_after_ms, Credential},
    user::{UserProfile, UserUpdate},
};

use crate::api::{AuthApi, LoginRequest, PasswordChange, ProfileApi, RegisterRequest};
use crate::mock::users::{issue_token, MockUserDirectory};
use crate::ports::{FilePart, TimerPort};
use crate::session::SessionStore;

/// Auth against the [`MockUserDirectory`]. Login takes an email in
/// `username_or_email`; registration does not sign in.
pub struct MockAuth {
    directory: Rc<MockUserDirectory>,
    session: Rc<SessionStore>,
    timer: Rc<dyn TimerPort>,
    config: MockConfig,
    token_ttl_ms: u64,
}

impl MockAuth {
    pub fn new(
        directory: Rc<MockUserDirectory>,
        session: Rc<SessionStore>,
        timer: Rc<dyn TimerPort>,
        config: MockConfig,
        token_ttl_ms: u64,
    ) -> Self {
        Self {
            directory,
            session,
            timer,
            config,
            token_ttl_ms,
        }
    }

    fn credential(&self, token: String) -> Credential {
        Credential {
            expires_at: expiry_after_ms(Utc::now(), self.token_ttl_ms),
            ..Credential::bearer(token)
        }
    }

    fn try_login(&self, req: &LoginRequest) -> Result<UserProfile> {
        let (user, token) = self.directory.login(&req.username_or_email, &req.password)?;
        self.session.login(user.clone(), self.credential(token))?;
        Ok(user)
    }

    fn try_validate(&self) -> Result<UserProfile> {
        let token = self
            .session
            .token()
            .ok_or_else(|| ClientError::business(codes::UNAUTHORIZED, "无效的token"))?;
        let user = self.directory.validate_token(&token)?;
        self.session.replace_user(user.clone())?;
        Ok(user)
    }
}

#[async_trait(?Send)]
impl AuthApi for MockAuth {
    async fn login(&self, req: &LoginRequest) -> Outcome<UserProfile> {
        self.timer.sleep(self.config.auth_delay_ms).await;
        Outcome::from_result(self.try_login(req), "登录成功", "登录失败")
    }

    async fn register(&self, req: &RegisterRequest) -> Outcome<UserProfile> {
        self.timer.sleep(self.config.auth_delay_ms).await;
        let result = self.directory.register(&req.email, &req.password, &req.nickname);
        Outcome::from_result(result, "注册成功", "注册失败")
    }

    async fn validate(&self) -> Outcome<UserProfile> {
        self.timer.sleep(self.config.io_delay_ms).await;
        Outcome::from_result(self.try_validate(), "", "令牌验证失败")
    }

    async fn refresh(&self) -> Outcome<()> {
        self.timer.sleep(self.config.io_delay_ms).await;
        let result = match self.session.current_user() {
            Some(user) => self
                .session
                .refresh(self.credential(issue_token(user.id)))
                .map(|_| ()),
            None => Err(ClientError::business(
                codes::UNAUTHORIZED,
                "用户未登录",
            )),
        };
        Outcome::from_result(result, "", "刷新令牌失败")
    }

    async fn logout(&self) -> Outcome<()> {
        self.timer.sleep(self.config.io_delay_ms).await;
        self.session.logout();
        Outcome::ok_with((), "退出登录成功")
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Profile operations against the [`MockUserDirectory`], for the signed-in user.
pub struct MockProfile {
    directory: Rc<MockUserDirectory>,
    session: Rc<SessionStore>,
    timer: Rc<dyn TimerPort>,
    config: MockConfig,
}

impl MockProfile {
    pub fn new(
        directory: Rc<MockUserDirectory>,
        session: Rc<SessionStore>,
        timer: Rc<dyn TimerPort>,
        config: MockConfig,
    ) -> Self {
        Self {
            directory,
            session,
            timer,
            config,
        }
    }

    fn user_id(&self) -> Result<i64> {
        self.session
            .current_user()
            .map(|u| u.id)
            .ok_or_else(|| ClientError::business(codes::UNAUTHORIZED, "用户未登录"))
    }

    fn try_update(&self, update: &UserUpdate) -> Result<UserProfile> {
        let stored = self.directory.update(self.user_id()?, update)?;
        self.session.replace_user(stored.clone())?;
        Ok(stored)
    }

    fn try_upload(&self, file: &FilePart) -> Result<String> {
        let url = format!(
            "/uploads/avatars/mock_{}_{}_{}",
            self.user_id()?,
            Utc::now().timestamp_millis(),
            file.file_name
        );
        self.try_update(&UserUpdate {
            avatar_url: Some(url.clone()),
            ..UserUpdate::default()
        })?;
        Ok(url)
    }
}

#[async_trait(?Send)]
impl ProfileApi for MockProfile {
    async fn profile(&self) -> Outcome<UserProfile> {
        self.timer.sleep(self.config.io_delay_ms).await;
        let result = self.user_id().and_then(|id| self.directory.get(id));
        Outcome::from_result(result, "", "获取用户信息失败")
    }

    async fn update_profile(&self, update: &UserUpdate) -> Outcome<UserProfile> {
        self.timer.sleep(self.config.io_delay_ms).await;
        Outcome::from_result(self.try_update(update), "更新成功", "更新用户信息失败")
    }

    async fn change_password(&self, change: &PasswordChange) -> Outcome<()> {
        self.timer.sleep(self.config.io_delay_ms).await;
        let result = self.user_id().and_then(|id| {
            self.directory
                .change_password(id, &change.old_password, &change.new_password)
        });
        Outcome::from_result(result, "密码修改成功", "修改密码失败")
    }

    /// Nothing is stored; the profile just points at a made-up upload path.
    async fn upload_avatar(&self, file: FilePart) -> Outcome<String> {
        self.timer.sleep(self.config.io_delay_ms).await;
        Outcome::from_result(self.try_upload(&file), "头像上传成功", "头像上传失败")
    }
}
