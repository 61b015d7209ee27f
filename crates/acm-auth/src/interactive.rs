use crate::cookie::Cookie;
use crate::error::AuthError;

/// Navigation event reported by the rendering surface hosting the
/// interactive login page.
#[derive(Debug, Clone)]
pub enum Navigation {
    /// A page load committed at `url`.
    Committed { url: String },
    /// A load failed. `cancelled` marks loads superseded by a newer
    /// navigation, which is not a real failure.
    Failed { cancelled: bool, reason: String },
}

/// Cookie access offered by the rendering surface for the target domain.
pub trait LoginSurface {
    fn cookies(&self) -> Vec<Cookie>;
}

/// Observes navigation events from an interactive login page and
/// harvests cookies once the user lands on the dashboard.
///
/// This path is retry-free: the first terminal event decides the
/// outcome, and further events are ignored.
pub struct InteractiveLogin {
    finished: bool,
}

impl InteractiveLogin {
    pub fn new() -> Self {
        Self { finished: false }
    }

    /// Feed one navigation event. Returns `None` while the login is
    /// still in progress, `Some(result)` once it terminates.
    pub fn observe(
        &mut self,
        event: &Navigation,
        surface: &dyn LoginSurface,
    ) -> Option<Result<Vec<Cookie>, AuthError>> {
        if self.finished {
            return None;
        }
        match event {
            Navigation::Committed { url } => {
                if !url.contains("dashboard") {
                    return None;
                }
                let cookies = surface.cookies();
                if cookies.is_empty() {
                    // The dashboard can commit before cookies land; keep
                    // observing until the surface has any.
                    return None;
                }
                self.finished = true;
                if cookies.iter().any(Cookie::is_session_like) {
                    tracing::debug!("interactive login: session cookie present");
                } else {
                    tracing::debug!("interactive login: no session-like cookie, accepting set");
                }
                Some(Ok(cookies))
            }
            Navigation::Failed { cancelled: true, .. } => {
                // Superseded navigation, not a real failure.
                None
            }
            Navigation::Failed { cancelled: false, reason } => {
                self.finished = true;
                tracing::warn!("interactive login navigation failed: {reason}");
                Some(Err(AuthError::LoginFailed))
            }
        }
    }
}

impl Default for InteractiveLogin {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSurface {
        cookies: Vec<Cookie>,
    }

    impl LoginSurface for FakeSurface {
        fn cookies(&self) -> Vec<Cookie> {
            self.cookies.clone()
        }
    }

    fn committed(url: &str) -> Navigation {
        Navigation::Committed {
            url: url.to_string(),
        }
    }

    #[test]
    fn login_page_navigation_is_ignored() {
        let surface = FakeSurface { cookies: vec![] };
        let mut login = InteractiveLogin::new();
        assert!(login.observe(&committed("https://x.com/login"), &surface).is_none());
    }

    #[test]
    fn dashboard_navigation_harvests_cookies() {
        let surface = FakeSurface {
            cookies: vec![Cookie::new("authjs.session-token", "s")],
        };
        let mut login = InteractiveLogin::new();
        let result = login
            .observe(&committed("https://x.com/dashboard"), &surface)
            .unwrap()
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "authjs.session-token");
    }

    #[test]
    fn dashboard_without_session_cookie_still_succeeds() {
        let surface = FakeSurface {
            cookies: vec![Cookie::new("theme", "dark")],
        };
        let mut login = InteractiveLogin::new();
        let result = login
            .observe(&committed("https://x.com/dashboard"), &surface)
            .unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn dashboard_with_no_cookies_keeps_waiting() {
        let surface = FakeSurface { cookies: vec![] };
        let mut login = InteractiveLogin::new();
        assert!(login
            .observe(&committed("https://x.com/dashboard"), &surface)
            .is_none());
        // A later commit with cookies can still succeed
        let surface = FakeSurface {
            cookies: vec![Cookie::new("sid", "v")],
        };
        assert!(login
            .observe(&committed("https://x.com/dashboard"), &surface)
            .unwrap()
            .is_ok());
    }

    #[test]
    fn cancelled_navigation_is_not_an_error() {
        let surface = FakeSurface { cookies: vec![] };
        let mut login = InteractiveLogin::new();
        let event = Navigation::Failed {
            cancelled: true,
            reason: "superseded".to_string(),
        };
        assert!(login.observe(&event, &surface).is_none());
        // and the login can still complete afterwards
        let surface = FakeSurface {
            cookies: vec![Cookie::new("sid", "v")],
        };
        assert!(login
            .observe(&committed("https://x.com/dashboard"), &surface)
            .is_some());
    }

    #[test]
    fn real_navigation_failure_terminates_with_login_failed() {
        let surface = FakeSurface { cookies: vec![] };
        let mut login = InteractiveLogin::new();
        let event = Navigation::Failed {
            cancelled: false,
            reason: "dns failure".to_string(),
        };
        let result = login.observe(&event, &surface).unwrap();
        assert!(matches!(result, Err(AuthError::LoginFailed)));
    }

    #[test]
    fn events_after_completion_are_ignored() {
        let surface = FakeSurface {
            cookies: vec![Cookie::new("sid", "v")],
        };
        let mut login = InteractiveLogin::new();
        assert!(login
            .observe(&committed("https://x.com/dashboard"), &surface)
            .is_some());
        assert!(login
            .observe(&committed("https://x.com/dashboard"), &surface)
            .is_none());
    }
}
