//! Console addresses and session gating.

use std::fmt;

use crate::session::GateState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    Items,
    NewItem,
    /// `token` is the path segment as it appears in the address
    ItemDetail { token: String },
    EditItem { token: String },
    Users,
    Stats,
}

impl Route {
    /// Match an address. `None` means no screen lives there.
    pub fn parse(path: &str) -> Option<Route> {
        let path = path
            .split(|c| c == '?' || c == '#')
            .next()
            .unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let route = match segments.as_slice() {
            [] | ["dashboard"] => Route::Dashboard,
            ["login"] => Route::Login,
            ["items"] => Route::Items,
            ["items", "new"] => Route::NewItem,
            ["items", token] => Route::ItemDetail {
                token: token.to_string(),
            },
            ["items", token, "edit"] => Route::EditItem {
                token: token.to_string(),
            },
            ["users"] => Route::Users,
            ["stats"] => Route::Stats,
            _ => return None,
        };
        Some(route)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::Items => "/items".to_string(),
            Route::NewItem => "/items/new".to_string(),
            Route::ItemDetail { token } => format!("/items/{}", token),
            Route::EditItem { token } => format!("/items/{}/edit", token),
            Route::Users => "/users".to_string(),
            Route::Stats => "/stats".to_string(),
        }
    }

    pub fn requires_session(&self) -> bool {
        !matches!(self, Route::Login)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Outcome of opening an address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Show(Route),
    /// Replace the address with this route
    Redirect(Route),
    /// The auth service has not reported yet
    Wait,
}

/// Decide what to show for `path` given the operator's sign-in state
pub fn resolve(path: &str, gate: &GateState) -> Navigation {
    let route = match Route::parse(path) {
        Some(route) => route,
        None => return Navigation::Redirect(Route::Dashboard),
    };
    if !route.requires_session() {
        return Navigation::Show(route);
    }
    match gate {
        GateState::Pending => Navigation::Wait,
        GateState::SignedOut => Navigation::Redirect(Route::Login),
        GateState::SignedIn(_) => Navigation::Show(route),
    }
}
