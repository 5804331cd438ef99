//! Application context: the explicitly constructed object every UI
//! component receives instead of reaching for global state.
//!
//! Lifecycle: `init` at start-up (restores any persisted session), `teardown`
//! on sign-out or page exit.

use std::rc::Rc;

use chrono::Utc;

use counsel_types::{
    Result,
    config::{BackendMode, ClientConfig},
    event::ClientEvent,
};

use crate::api::{
    AiApi, AuthApi, ConversationApi, MessageApi, ProfileApi, RemoteAuth, SystemApi, UserApi,
};
use crate::event_bus::EventBus;
use crate::guard::{Navigation, RouteTable};
use crate::http::ApiClient;
use crate::keys;
use crate::mock::{MockAuth, MockChatService, MockProfile, MockUserDirectory};
use crate::persist::{read_json, write_json};
use crate::ports::{HttpPort, StoragePort, TimerPort};
use crate::session::SessionStore;

/// Services that only exist in mock mode
pub struct MockServices {
    pub users: Rc<MockUserDirectory>,
    pub chat: MockChatService,
}

pub struct AppContext {
    pub config: ClientConfig,
    pub events: EventBus,
    pub storage: Rc<dyn StoragePort>,
    pub session: Rc<SessionStore>,
    pub client: Rc<ApiClient>,
    pub auth: Rc<dyn AuthApi>,
    pub profile: Rc<dyn ProfileApi>,
    pub conversations: ConversationApi,
    pub messages: MessageApi,
    pub ai: AiApi,
    pub system: SystemApi,
    pub routes: RouteTable,
    pub mock: Option<MockServices>,
}

impl AppContext {
    /// Wire everything up. A config saved under `app_settings` wins over
    /// `config`.
    pub fn init(
        config: ClientConfig,
        http: Rc<dyn HttpPort>,
        storage: Rc<dyn StoragePort>,
        timer: Rc<dyn TimerPort>,
    ) -> Self {
        let config = match read_json::<ClientConfig>(&*storage, keys::APP_SETTINGS) {
            Some(saved) => {
                log::info!("Using saved settings ({:?} backend)", saved.backend);
                saved
            }
            None => config,
        };

        let events = EventBus::new();
        let session = Rc::new(SessionStore::new(storage.clone(), events.clone()));
        session.restore(Utc::now());

        let client = Rc::new(ApiClient::new(
            config.clone(),
            http,
            timer.clone(),
            session.clone(),
        ));

        let (auth, profile, mock): (Rc<dyn AuthApi>, Rc<dyn ProfileApi>, Option<MockServices>) =
            match config.backend {
                BackendMode::Remote => (
                    Rc::new(RemoteAuth::new(client.clone())),
                    Rc::new(UserApi::new(client.clone())),
                    None,
                ),
                BackendMode::Mock => {
                    let users = Rc::new(MockUserDirectory::seeded());
                    let auth = MockAuth::new(
                        users.clone(),
                        session.clone(),
                        timer.clone(),
                        config.mock.clone(),
                        config.token_ttl_ms,
                    );
                    let profile = MockProfile::new(
                        users.clone(),
                        session.clone(),
                        timer.clone(),
                        config.mock.clone(),
                    );
                    let chat = MockChatService::new(
                        storage.clone(),
                        timer.clone(),
                        events.clone(),
                        config.mock.clone(),
                    );
                    (
                        Rc::new(auth),
                        Rc::new(profile),
                        Some(MockServices { users, chat }),
                    )
                }
            };

        log::info!(
            "App context ready: {} auth, {} storage, signed in: {}",
            auth.name(),
            storage.backend_name(),
            session.is_authenticated()
        );

        Self {
            conversations: ConversationApi::new(client.clone(), storage.clone()),
            messages: MessageApi::new(client.clone()),
            ai: AiApi::new(client.clone()),
            system: SystemApi::new(client.clone()),
            routes: RouteTable::default(),
            config,
            events,
            storage,
            session,
            client,
            auth,
            profile,
            mock,
        }
    }

    /// Persist `config` for the next `init`.
    pub fn save_config(&self, config: &ClientConfig) -> Result<()> {
        write_json(&*self.storage, keys::APP_SETTINGS, config)
    }

    /// Run the route guard against the current session. An expired
    /// credential is dropped first.
    pub fn navigate(&self, target: &str) -> Navigation {
        self.session.check_expiry(Utc::now());
        self.routes.guard(target, self.session.is_authenticated())
    }

    /// Sign out locally and hand back whatever events were still queued.
    pub fn teardown(&self) -> Vec<ClientEvent> {
        self.session.logout();
        if let Some(ref mock) = self.mock {
            mock.chat.set_current(None);
        }
        self.events.drain()
    }
}
