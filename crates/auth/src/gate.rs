//! Route gating: which page a path leads to given setup and session state.
//!
//! Everything here is a pure function of `(setup completed?, auth status)`.

use std::fmt;

use isperp_core::CustomerId;

/// Outcome of the authentication check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// The store has not been read yet.
    Unknown,
    Anonymous,
    Authenticated,
}

/// Combined gate state.
///
/// ```text
/// LOADING ──both checks resolved──▶ SETUP_REQUIRED | UNAUTHENTICATED | AUTHENTICATED
/// UNAUTHENTICATED ──login──▶ AUTHENTICATED
/// AUTHENTICATED ──logout / invalidation──▶ UNAUTHENTICATED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
    Loading,
    SetupRequired,
    Unauthenticated,
    Authenticated,
}

impl RouteState {
    pub fn derive(setup_completed: Option<bool>, auth: AuthStatus) -> Self {
        match (setup_completed, auth) {
            (None, _) | (_, AuthStatus::Unknown) => Self::Loading,
            (Some(false), _) => Self::SetupRequired,
            (Some(true), AuthStatus::Anonymous) => Self::Unauthenticated,
            (Some(true), AuthStatus::Authenticated) => Self::Authenticated,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Root,
    Setup,
    Home,
    Login,
    Dashboard,
    DashboardUsers,
    DashboardCompanies,
    DashboardSettings,
    Customers,
    CustomerNew,
    CustomerEdit(CustomerId),
}

impl Route {
    /// Match a location against the route table.
    ///
    /// Query strings, fragments and a trailing slash are ignored. Unknown
    /// paths (including `/customers/edit/<not an id>`) yield `None`.
    pub fn parse(location: &str) -> Option<Self> {
        let path = location
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        let route = match path {
            "/" => Self::Root,
            "/setup" => Self::Setup,
            "/home" => Self::Home,
            "/login" => Self::Login,
            "/dashboard" => Self::Dashboard,
            "/dashboard/usuarios" => Self::DashboardUsers,
            "/dashboard/empresas" => Self::DashboardCompanies,
            "/dashboard/configuracoes" => Self::DashboardSettings,
            "/customers" => Self::Customers,
            "/customers/new" => Self::CustomerNew,
            other => {
                let id = other.strip_prefix("/customers/edit/")?;
                Self::CustomerEdit(id.parse().ok()?)
            }
        };
        Some(route)
    }

    pub fn path(&self) -> String {
        match self {
            Self::Root => "/".to_string(),
            Self::Setup => "/setup".to_string(),
            Self::Home => "/home".to_string(),
            Self::Login => "/login".to_string(),
            Self::Dashboard => "/dashboard".to_string(),
            Self::DashboardUsers => "/dashboard/usuarios".to_string(),
            Self::DashboardCompanies => "/dashboard/empresas".to_string(),
            Self::DashboardSettings => "/dashboard/configuracoes".to_string(),
            Self::Customers => "/customers".to_string(),
            Self::CustomerNew => "/customers/new".to_string(),
            Self::CustomerEdit(id) => format!("/customers/edit/{id}"),
        }
    }

    /// Pages that need a session.
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            Self::Dashboard
                | Self::DashboardUsers
                | Self::DashboardCompanies
                | Self::DashboardSettings
                | Self::Customers
                | Self::CustomerNew
                | Self::CustomerEdit(_)
        )
    }

    /// One step of the gate: render this route or redirect elsewhere.
    pub fn resolve(&self, state: RouteState) -> Navigation {
        use RouteState::*;

        if state.is_loading() {
            return Navigation::Loading;
        }

        match self {
            route if route.is_protected() => match state {
                SetupRequired => Navigation::Redirect(Self::Setup),
                Unauthenticated => Navigation::Redirect(Self::Login),
                _ => Navigation::Render(*route),
            },
            Self::Setup => match state {
                SetupRequired => Navigation::Render(*self),
                _ => Navigation::Redirect(Self::Root),
            },
            Self::Home => match state {
                SetupRequired => Navigation::Redirect(Self::Setup),
                _ => Navigation::Render(*self),
            },
            Self::Login => match state {
                SetupRequired => Navigation::Redirect(Self::Setup),
                Authenticated => Navigation::Redirect(Self::Dashboard),
                _ => Navigation::Render(*self),
            },
            // Root
            _ => match state {
                SetupRequired => Navigation::Redirect(Self::Setup),
                _ => Navigation::Redirect(Self::Home),
            },
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// A check is still pending; show the loading screen.
    Loading,
    Render(Route),
    Redirect(Route),
    NotFound,
}

/// Gate a raw location for one step.
pub fn resolve(location: &str, state: RouteState) -> Navigation {
    if state.is_loading() {
        return Navigation::Loading;
    }
    match Route::parse(location) {
        Some(route) => route.resolve(state),
        None => Navigation::NotFound,
    }
}

/// Follow redirects until a page renders (or nothing does).
pub fn settle(location: &str, state: RouteState) -> Navigation {
    const MAX_HOPS: usize = 4;

    let mut step = resolve(location, state);
    for _ in 0..MAX_HOPS {
        match step {
            Navigation::Redirect(next) => match next.resolve(state) {
                Navigation::Redirect(again) if again == next => break,
                resolved => step = resolved,
            },
            _ => break,
        }
    }
    step
}

#[cfg(test)]
mod tests {
    use super::*;

    const READY_ANON: RouteState = RouteState::Unauthenticated;
    const READY_AUTH: RouteState = RouteState::Authenticated;

    #[test]
    fn loading_until_both_checks_resolve() {
        assert_eq!(RouteState::derive(None, AuthStatus::Anonymous), RouteState::Loading);
        assert_eq!(RouteState::derive(Some(true), AuthStatus::Unknown), RouteState::Loading);
        assert_eq!(RouteState::derive(None, AuthStatus::Unknown), RouteState::Loading);
    }

    #[test]
    fn resolved_states() {
        assert_eq!(
            RouteState::derive(Some(false), AuthStatus::Authenticated),
            RouteState::SetupRequired
        );
        assert_eq!(RouteState::derive(Some(true), AuthStatus::Anonymous), READY_ANON);
        assert_eq!(RouteState::derive(Some(true), AuthStatus::Authenticated), READY_AUTH);
    }

    #[test]
    fn parse_normalises_locations() {
        assert_eq!(Route::parse(""), Some(Route::Root));
        assert_eq!(Route::parse("/dashboard/"), Some(Route::Dashboard));
        assert_eq!(Route::parse("/login?next=/customers"), Some(Route::Login));
        assert_eq!(
            Route::parse("/customers/edit/42"),
            Some(Route::CustomerEdit(CustomerId::new(42)))
        );
        assert_eq!(Route::parse("/customers/edit/abc"), None);
        assert_eq!(Route::parse("/nope"), None);
    }

    const ROUTES: [Route; 11] = [
            Route::Root,
            Route::Setup,
            Route::Home,
            Route::Login,
            Route::Dashboard,
            Route::DashboardUsers,
            Route::DashboardCompanies,
            Route::DashboardSettings,
            Route::Customers,
            Route::CustomerNew,
            Route::CustomerEdit(CustomerId::new(7)),
        ];

    #[test]
    fn every_route_path_parses_back() {
        for route in ROUTES {
            assert_eq!(Route::parse(&route.path()), Some(route));
        }
    }

    #[test]
    fn only_protected_routes_send_anonymous_users_to_login() {
        for route in ROUTES {
            let sent_to_login = route.resolve(READY_ANON) == Navigation::Redirect(Route::Login);
            assert_eq!(sent_to_login, route.is_protected(), "{route}");
        }
        assert!(!Route::Login.is_protected());
        assert!(Route::CustomerEdit(CustomerId::new(1)).is_protected());
    }

    #[test]
    fn nothing_renders_while_loading() {
        assert_eq!(resolve("/dashboard", RouteState::Loading), Navigation::Loading);
        assert_eq!(resolve("/nope", RouteState::Loading), Navigation::Loading);
    }

    #[test]
    fn incomplete_setup_sends_everything_to_setup() {
        for path in ["/", "/home", "/login", "/dashboard", "/customers/new"] {
            assert_eq!(
                resolve(path, RouteState::SetupRequired),
                Navigation::Redirect(Route::Setup),
                "{path}"
            );
        }
        assert_eq!(
            resolve("/setup", RouteState::SetupRequired),
            Navigation::Render(Route::Setup)
        );
    }

    #[test]
    fn completed_setup_leaves_the_wizard() {
        assert_eq!(resolve("/setup", READY_ANON), Navigation::Redirect(Route::Root));
        assert_eq!(settle("/setup", READY_ANON), Navigation::Render(Route::Home));
    }

    #[test]
    fn protected_pages_require_a_session() {
        assert_eq!(resolve("/customers", READY_ANON), Navigation::Redirect(Route::Login));
        assert_eq!(resolve("/customers", READY_AUTH), Navigation::Render(Route::Customers));
        assert_eq!(
            resolve("/dashboard/usuarios", READY_AUTH),
            Navigation::Render(Route::DashboardUsers)
        );
    }

    #[test]
    fn login_page_bounces_authenticated_users() {
        assert_eq!(resolve("/login", READY_ANON), Navigation::Render(Route::Login));
        assert_eq!(resolve("/login", READY_AUTH), Navigation::Redirect(Route::Dashboard));
    }

    #[test]
    fn root_goes_home_and_unknown_is_not_found() {
        assert_eq!(settle("/", READY_AUTH), Navigation::Render(Route::Home));
        assert_eq!(resolve("/unknown", READY_AUTH), Navigation::NotFound);
    }
}
