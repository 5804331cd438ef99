//! Durable storage keys shared with the JavaScript side of the app.

pub const AUTH_TOKEN: &str = "auth_token";
pub const USER_INFO: &str = "user_info";
pub const REFRESH_TOKEN: &str = "refresh_token";
pub const TOKEN_TYPE: &str = "token_type";
pub const APP_SETTINGS: &str = "app_settings";
pub const CHAT_HISTORY: &str = "chat_history";
pub const CURRENT_CHAT: &str = "current_chat";
/// Mock-mode conversation list
pub const CONVERSATIONS: &str = "conversations";

/// Keys written by the first version of the client. Kept in step so an
/// older tab (or the old route guard) sees the same login state.
pub mod legacy {
    pub const TOKEN: &str = "token";
    pub const USER: &str = "user";
    pub const IS_LOGGED_IN: &str = "isLoggedIn";
}
