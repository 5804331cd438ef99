use serde::{Deserialize, Serialize};

/// Events published by the session store and chat services.
/// The UI subscribes to these for reactive updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// A user signed in
    LoggedIn { user_id: i64 },

    /// The user signed out (explicitly)
    LoggedOut,

    /// The server rejected the credential (HTTP 401) or it ran out
    SessionExpired,

    /// Persisted session state was read back at startup
    Restored { authenticated: bool },

    /// Fields of the current user changed
    ProfileUpdated,

    /// The access token was replaced
    TokenRefreshed,

    /// The locally persisted conversation list changed
    ConversationsChanged,

    /// Partial assistant reply (cumulative content so far)
    ReplyDelta { content: String },

    /// Assistant reply finished
    ReplyComplete { content: String },

    /// An error the UI should surface
    Error { message: String },
}
