/// Pages of the client application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    SignIn,
    SignUp,
    Dashboard,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::SignIn => "/",
            Route::SignUp => "/signup",
            Route::Dashboard => "/dashboard",
        }
    }

    /// Resolve a browser path, ignoring query and trailing slash.
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        match path.trim_end_matches('/') {
            "" => Some(Route::SignIn),
            "/signup" => Some(Route::SignUp),
            "/dashboard" => Some(Route::Dashboard),
            _ => None,
        }
    }

    /// Whether the page needs an authenticated session.
    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Dashboard)
    }
}
