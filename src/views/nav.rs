use lostfound_auth::Auth;
use tracing::{error, info};

use crate::routes::Route;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub label: &'static str,
    pub route: Route,
}

/// Navigation bar links; Logout is separate since it acts rather than navigates
pub fn nav_links() -> Vec<NavLink> {
    vec![
        NavLink {
            label: "Dashboard",
            route: Route::Dashboard,
        },
        NavLink {
            label: "Items",
            route: Route::Items,
        },
        NavLink {
            label: "Users",
            route: Route::Users,
        },
    ]
}

/// Sign out, returning the login route. On failure the error is logged and
/// the operator stays where they are (`None`).
pub fn logout(auth: &Auth) -> Option<Route> {
    match auth.sign_out() {
        Ok(()) => {
            info!("Logged out");
            Some(Route::Login)
        }
        Err(e) => {
            error!("Error signing out: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lostfound_auth::{AuthOptions, Session, User};

    #[test]
    fn nav_bar_order() {
        let links: Vec<(&str, String)> = nav_links()
            .into_iter()
            .map(|l| (l.label, l.route.path()))
            .collect();
        assert_eq!(
            links,
            vec![
                ("Dashboard", "/dashboard".to_string()),
                ("Items", "/items".to_string()),
                ("Users", "/users".to_string()),
            ]
        );
    }

    #[test]
    fn logout_goes_to_login() {
        let auth = Auth::new("key", reqwest::Client::new(), AuthOptions::default());
        auth.set_session(Session::new(
            "id".into(),
            "refresh".into(),
            3600,
            User {
                uid: "uid-1".into(),
                email: None,
                display_name: None,
            },
        ));
        assert_eq!(logout(&auth), Some(Route::Login));
        assert!(auth.get_session().is_none());
    }

    #[test]
    fn failed_logout_stays_put() {
        let auth = Auth::new("key", reqwest::Client::new(), AuthOptions::default());
        assert_eq!(logout(&auth), None);
    }
}
