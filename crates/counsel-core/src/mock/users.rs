//! In-memory user directory behind the mock auth flow.
//!
//! Seeded with two accounts; registrations live until the page reloads.

use std::cell::RefCell;

use chrono::Utc;

use counsel_types::{
    ClientError, Result,
    envelope::codes,
    user::{UserProfile, UserUpdate},
};

const TOKEN_PREFIX: &str = "mock_token_";

#[derive(Debug, Clone)]
struct MockUser {
    id: i64,
    email: String,
    password: String,
    nickname: String,
    avatar: String,
    created_at: String,
    updated_at: Option<String>,
}

impl MockUser {
    fn seed(id: i64, email: &str, password: &str, nickname: &str) -> Self {
        Self {
            id,
            email: email.to_string(),
            password: password.to_string(),
            nickname: nickname.to_string(),
            avatar: String::new(),
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
            updated_at: None,
        }
    }

    /// Profile without the password.
    fn profile(&self) -> UserProfile {
        UserProfile {
            avatar_url: self.avatar.clone(),
            created_at: Some(self.created_at.clone()),
            updated_at: self.updated_at.clone(),
            ..UserProfile::new(self.id, &self.email, &self.nickname)
        }
    }
}

pub struct MockUserDirectory {
    users: RefCell<Vec<MockUser>>,
}

impl Default for MockUserDirectory {
    fn default() -> Self {
        Self::seeded()
    }
}

impl MockUserDirectory {
    pub fn empty() -> Self {
        Self {
            users: RefCell::new(Vec::new()),
        }
    }

    pub fn seeded() -> Self {
        Self {
            users: RefCell::new(vec![
                MockUser::seed(1, "admin@example.com", "Admin123", "管理员"),
                MockUser::seed(2, "test@example.com", "Test123", "测试用户"),
            ]),
        }
    }

    pub fn len(&self) -> usize {
        self.users.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.borrow().is_empty()
    }

    /// Check credentials and mint a token of the form `mock_token_<id>_<millis>`.
    pub fn login(&self, email: &str, password: &str) -> Result<(UserProfile, String)> {
        let users = self.users.borrow();
        let user = users
            .iter()
            .find(|u| u.email == email)
            .ok_or_else(not_found)?;
        if user.password != password {
            return Err(ClientError::business(codes::UNAUTHORIZED, "密码错误"));
        }
        Ok((user.profile(), issue_token(user.id)))
    }

    /// Add an account. Nothing is stored when the email or nickname is taken.
    pub fn register(&self, email: &str, password: &str, nickname: &str) -> Result<UserProfile> {
        let mut users = self.users.borrow_mut();
        if users.iter().any(|u| u.email == email) {
            return Err(ClientError::business(codes::CONFLICT, "该邮箱已被注册"));
        }
        if users.iter().any(|u| u.nickname == nickname) {
            return Err(ClientError::business(codes::CONFLICT, "该昵称已被使用"));
        }

        let id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        let user = MockUser {
            id,
            email: email.to_string(),
            password: password.to_string(),
            nickname: nickname.to_string(),
            avatar: String::new(),
            created_at: Utc::now().to_rfc3339(),
            updated_at: None,
        };
        let profile = user.profile();
        users.push(user);
        log::info!("Mock directory registered user {}", id);
        Ok(profile)
    }

    pub fn get(&self, id: i64) -> Result<UserProfile> {
        self.users
            .borrow()
            .iter()
            .find(|u| u.id == id)
            .map(MockUser::profile)
            .ok_or_else(not_found)
    }

    pub fn update(&self, id: i64, update: &UserUpdate) -> Result<UserProfile> {
        let mut users = self.users.borrow_mut();
        let index = users.iter().position(|u| u.id == id).ok_or_else(not_found)?;

        if let Some(ref email) = update.email {
            if *email != users[index].email && users.iter().any(|u| u.email == *email) {
                return Err(ClientError::business(codes::CONFLICT, "该邮箱已被使用"));
            }
        }
        if let Some(ref nickname) = update.nickname {
            if *nickname != users[index].nickname && users.iter().any(|u| u.nickname == *nickname) {
                return Err(ClientError::business(codes::CONFLICT, "该昵称已被使用"));
            }
        }

        let user = &mut users[index];
        if let Some(ref email) = update.email {
            user.email = email.clone();
        }
        if let Some(ref nickname) = update.nickname {
            user.nickname = nickname.clone();
        }
        if let Some(ref avatar) = update.avatar_url {
            user.avatar = avatar.clone();
        }
        user.updated_at = Some(Utc::now().to_rfc3339());
        Ok(user.profile())
    }

    pub fn change_password(&self, id: i64, old_password: &str, new_password: &str) -> Result<()> {
        let mut users = self.users.borrow_mut();
        let user = users.iter_mut().find(|u| u.id == id).ok_or_else(not_found)?;
        if user.password != old_password {
            return Err(ClientError::business(codes::BAD_REQUEST, "原密码错误"));
        }
        user.password = new_password.to_string();
        user.updated_at = Some(Utc::now().to_rfc3339());
        Ok(())
    }

    pub fn check_email_available(&self, email: &str) -> bool {
        !self.users.borrow().iter().any(|u| u.email == email)
    }

    pub fn check_nickname_available(&self, nickname: &str) -> bool {
        !self.users.borrow().iter().any(|u| u.nickname == nickname)
    }

    /// Resolve a token minted by [`login`](Self::login) back to its user.
    pub fn validate_token(&self, token: &str) -> Result<UserProfile> {
        if !token.starts_with(TOKEN_PREFIX) {
            return Err(ClientError::business(codes::UNAUTHORIZED, "无效的token"));
        }
        let parts: Vec<&str> = token.split('_').collect();
        if parts.len() != 4 {
            return Err(ClientError::business(codes::UNAUTHORIZED, "无效的token格式"));
        }
        let id: i64 = parts[2].parse().map_err(|_| not_found())?;
        self.get(id)
    }
}

pub fn issue_token(user_id: i64) -> String {
    format!("{}{}_{}", TOKEN_PREFIX, user_id, Utc::now().timestamp_millis())
}

fn not_found() -> ClientError {
    ClientError::business(codes::NOT_FOUND, "用户不存在")
}
