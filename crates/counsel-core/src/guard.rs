//! Navigation guard.
//!
//! Decides synchronously from the locally cached session flag; it never asks
//! the server whether the token is still good.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

pub const HOME: &str = "/";
pub const LOGIN: &str = "/login";

/// Characters escaped in the `redirect` query value. Path separators and
/// `?` stay readable.
const REDIRECT_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'`');

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMeta {
    pub path: String,
    pub name: String,
    pub requires_auth: bool,
    pub requires_guest: bool,
}

impl RouteMeta {
    pub fn open(path: &str, name: &str) -> Self {
        Self {
            path: path.to_string(),
            name: name.to_string(),
            requires_auth: false,
            requires_guest: false,
        }
    }

    pub fn auth(path: &str, name: &str) -> Self {
        Self {
            requires_auth: true,
            ..Self::open(path, name)
        }
    }

    pub fn guest(path: &str, name: &str) -> Self {
        Self {
            requires_guest: true,
            ..Self::open(path, name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect { to: String },
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteMeta>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(vec![
            RouteMeta::open("/", "home"),
            RouteMeta::guest("/login", "login"),
            RouteMeta::guest("/register", "register"),
            RouteMeta::auth("/ai-assistant", "ai-assistant"),
            RouteMeta::auth("/profile", "profile"),
        ])
    }
}

impl RouteTable {
    pub fn new(routes: Vec<RouteMeta>) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &[RouteMeta] {
        &self.routes
    }

    /// Route for `target`, ignoring any query string or fragment.
    pub fn lookup(&self, target: &str) -> Option<&RouteMeta> {
        let path = strip_query(target);
        self.routes.iter().find(|r| r.path == path)
    }

    pub fn guard(&self, target: &str, authenticated: bool) -> Navigation {
        let Some(route) = self.lookup(target) else {
            return Navigation::Proceed;
        };

        if route.requires_auth && !authenticated {
            log::info!("{} needs a signed-in user, redirecting to login", route.path);
            return Navigation::Redirect {
                to: login_redirect(target),
            };
        }
        if route.requires_guest && authenticated {
            log::debug!("{} is for guests only, redirecting home", route.path);
            return Navigation::Redirect {
                to: HOME.to_string(),
            };
        }
        Navigation::Proceed
    }
}

/// `/login?redirect=<target>`
pub fn login_redirect(target: &str) -> String {
    format!(
        "{}?redirect={}",
        LOGIN,
        utf8_percent_encode(target, REDIRECT_VALUE)
    )
}

/// Where to go after signing in: the `redirect` value when it is an
/// in-app path, home otherwise.
pub fn post_login_target(redirect: Option<&str>) -> String {
    match redirect {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => HOME.to_string(),
    }
}

fn strip_query(target: &str) -> &str {
    let end = target.find(|c: char| c == '?' || c == '#').unwrap_or(target.len());
    match &target[..end] {
        "" => HOME,
        path if path.len() > 1 => path.trim_end_matches('/'),
        path => path,
    }
}
