//! Form validators. Each returns `ClientError::Validation` naming the field.

use std::sync::OnceLock;

use regex::Regex;

use counsel_types::{ClientError, Result};

use crate::api::{LoginRequest, PasswordChange, RegisterRequest};

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static pattern"))
}

fn nickname_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[一-龥a-zA-Z0-9_]+$").expect("static pattern"))
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^1[3-9][0-9]{9}$").expect("static pattern"))
}

fn code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]{6}$").expect("static pattern"))
}

fn invalid(field: &str, message: &str) -> Result<()> {
    Err(ClientError::validation(field, message))
}

pub fn validate_email(value: &str) -> Result<()> {
    if value.is_empty() {
        invalid("email", "请输入邮箱")
    } else if !email_re().is_match(value) {
        invalid("email", "请输入有效的邮箱地址")
    } else {
        Ok(())
    }
}

/// 6 to 20 characters with at least one lowercase letter, one uppercase
/// letter and one digit.
pub fn validate_password(value: &str) -> Result<()> {
    let len = value.chars().count();
    if value.is_empty() {
        invalid("password", "请输入密码")
    } else if len < 6 {
        invalid("password", "密码长度不能少于6位")
    } else if len > 20 {
        invalid("password", "密码长度不能超过20位")
    } else if !(value.chars().any(|c| c.is_ascii_lowercase())
        && value.chars().any(|c| c.is_ascii_uppercase())
        && value.chars().any(|c| c.is_ascii_digit()))
    {
        invalid("password", "密码必须包含大小写字母和数字")
    } else {
        Ok(())
    }
}

pub fn validate_nickname(value: &str) -> Result<()> {
    let len = value.chars().count();
    if value.is_empty() {
        invalid("nickname", "请输入昵称")
    } else if len < 2 {
        invalid("nickname", "昵称长度不能少于2位")
    } else if len > 20 {
        invalid("nickname", "昵称长度不能超过20位")
    } else if !nickname_re().is_match(value) {
        invalid("nickname", "昵称只能包含中文、英文、数字和下划线")
    } else {
        Ok(())
    }
}

/// Mainland China mobile number
pub fn validate_phone(value: &str) -> Result<()> {
    if value.is_empty() {
        invalid("phone", "请输入手机号")
    } else if !phone_re().is_match(value) {
        invalid("phone", "请输入有效的手机号")
    } else {
        Ok(())
    }
}

pub fn validate_code(value: &str) -> Result<()> {
    if value.is_empty() {
        invalid("code", "请输入验证码")
    } else if !code_re().is_match(value) {
        invalid("code", "验证码必须是6位数字")
    } else {
        Ok(())
    }
}

/// Non-blank check. `message` defaults to `此项为必填项`.
pub fn validate_required(field: &str, value: &str, message: Option<&str>) -> Result<()> {
    if value.trim().is_empty() {
        invalid(field, message.unwrap_or("此项为必填项"))
    } else {
        Ok(())
    }
}

pub fn validate_confirm(password: &str, confirm: &str) -> Result<()> {
    if confirm.is_empty() {
        invalid("confirmPassword", "请再次输入密码")
    } else if password != confirm {
        invalid("confirmPassword", "两次输入的密码不一致")
    } else {
        Ok(())
    }
}

impl LoginRequest {
    pub fn validate(&self) -> Result<()> {
        validate_required("usernameOrEmail", &self.username_or_email, Some("请输入用户名或邮箱"))?;
        validate_required("password", &self.password, Some("请输入密码"))
    }
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<()> {
        validate_email(&self.email)?;
        validate_nickname(&self.nickname)?;
        validate_password(&self.password)?;
        validate_confirm(&self.password, &self.confirm_password)
    }
}

impl PasswordChange {
    pub fn validate(&self) -> Result<()> {
        validate_required("oldPassword", &self.old_password, Some("请输入原密码"))?;
        validate_password(&self.new_password).map_err(|e| {
            ClientError::validation("newPassword", e.message())
        })?;
        validate_confirm(&self.new_password, &self.confirm_password)
    }
}
