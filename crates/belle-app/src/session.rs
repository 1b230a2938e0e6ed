// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Authentication state derived from a bearer token.
//!
//! [`Session`] never performs I/O. Transitions hand back [`SessionEffect`]s
//! that the runtime carries out (persisting the token, fetching the profile)
//! and later feeds back as further commands.

use crate::{Route, UserProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Loading,
    Authenticated,
    Unauthenticated,
}

impl SessionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Authenticated => "signed in",
            Self::Unauthenticated => "signed out",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Startup: the token found in the local cache, if any.
    Restore(Option<String>),
    LoggedIn(String),
    ProfileLoaded { token: String, profile: UserProfile },
    ProfileFailed { token: String },
    Logout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    PersistToken(String),
    ClearCachedToken,
    FetchProfile(String),
    StatusChanged(SessionStatus),
}

/// What a view should do for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Open,
    Wait,
    RedirectToLogin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    status: SessionStatus,
    token: Option<String>,
    user: Option<UserProfile>,
    profile_in_flight: Option<String>,
    return_to: Option<Route>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            status: SessionStatus::Loading,
            token: None,
            user: None,
            profile_in_flight: None,
            return_to: None,
        }
    }
}

impl Session {
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub const fn is_authenticated(&self) -> bool {
        matches!(self.status, SessionStatus::Authenticated)
    }

    pub fn gate(&self, route: Route) -> Gate {
        if !route.is_protected() {
            return Gate::Open;
        }
        match self.status {
            SessionStatus::Authenticated => Gate::Open,
            SessionStatus::Loading => Gate::Wait,
            SessionStatus::Unauthenticated => Gate::RedirectToLogin,
        }
    }

    pub fn remember_destination(&mut self, route: Route) {
        self.return_to = Some(route);
    }

    pub const fn destination(&self) -> Option<Route> {
        self.return_to
    }

    pub fn take_destination(&mut self) -> Option<Route> {
        self.return_to.take()
    }

    pub fn dispatch(&mut self, command: SessionCommand) -> Vec<SessionEffect> {
        match command {
            SessionCommand::Restore(Some(token)) => self.adopt_token(token, false),
            SessionCommand::Restore(None) => {
                self.token = None;
                self.user = None;
                self.profile_in_flight = None;
                self.set_status(SessionStatus::Unauthenticated)
            }
            SessionCommand::LoggedIn(token) => self.adopt_token(token, true),
            SessionCommand::ProfileLoaded { token, profile } => {
                if !self.is_current(&token) {
                    return Vec::new();
                }
                self.profile_in_flight = None;
                self.user = Some(profile);
                self.set_status(SessionStatus::Authenticated)
            }
            SessionCommand::ProfileFailed { token } => {
                if !self.is_current(&token) {
                    return Vec::new();
                }
                self.clear();
                let mut effects = vec![SessionEffect::ClearCachedToken];
                effects.extend(self.set_status(SessionStatus::Unauthenticated));
                effects
            }
            SessionCommand::Logout => {
                self.clear();
                self.return_to = None;
                let mut effects = vec![SessionEffect::ClearCachedToken];
                effects.extend(self.set_status(SessionStatus::Unauthenticated));
                effects
            }
        }
    }

    fn adopt_token(&mut self, token: String, persist: bool) -> Vec<SessionEffect> {
        let mut effects = Vec::new();
        if persist {
            effects.push(SessionEffect::PersistToken(token.clone()));
        }

        let same_token = self.token.as_deref() == Some(token.as_str());
        let already_fetching = self.profile_in_flight.as_deref() == Some(token.as_str());
        if same_token && self.is_authenticated() {
            return effects;
        }

        self.token = Some(token.clone());
        self.user = None;
        effects.extend(self.set_status(SessionStatus::Loading));
        if !already_fetching {
            self.profile_in_flight = Some(token.clone());
            effects.push(SessionEffect::FetchProfile(token));
        }
        effects
    }

    fn is_current(&self, token: &str) -> bool {
        self.token.as_deref() == Some(token)
    }

    fn clear(&mut self) {
        self.token = None;
        self.user = None;
        self.profile_in_flight = None;
    }

    fn set_status(&mut self, status: SessionStatus) -> Vec<SessionEffect> {
        if self.status == status {
            return Vec::new();
        }
        self.status = status;
        vec![SessionEffect::StatusChanged(status)]
    }
}

#[cfg(test)]
mod tests {
    use super::{Gate, Session, SessionCommand, SessionEffect, SessionStatus};
    use crate::{Route, UserId, UserProfile, UserRole};

    fn profile(username: &str) -> UserProfile {
        UserProfile {
            id: UserId::new(7),
            username: username.to_owned(),
            email: format!("{username}@salon.test"),
            role: UserRole::Admin,
            is_active: true,
        }
    }

    #[test]
    fn starts_loading_until_restored() {
        let session = Session::default();
        assert_eq!(session.status(), SessionStatus::Loading);
        assert_eq!(session.gate(Route::Dashboard), Gate::Wait);
        assert_eq!(session.gate(Route::Login), Gate::Open);
    }

    #[test]
    fn restore_without_token_is_unauthenticated() {
        let mut session = Session::default();
        let effects = session.dispatch(SessionCommand::Restore(None));
        assert_eq!(
            effects,
            vec![SessionEffect::StatusChanged(SessionStatus::Unauthenticated)]
        );
        assert_eq!(session.gate(Route::Appointments), Gate::RedirectToLogin);
    }

    #[test]
    fn restore_with_token_requests_one_profile_fetch() {
        let mut session = Session::default();
        let effects = session.dispatch(SessionCommand::Restore(Some("abc".to_owned())));
        assert_eq!(effects, vec![SessionEffect::FetchProfile("abc".to_owned())]);
        assert_eq!(session.token(), Some("abc"));

        let again = session.dispatch(SessionCommand::Restore(Some("abc".to_owned())));
        assert!(again.is_empty(), "duplicate fetch for same token: {again:?}");
    }

    #[test]
    fn profile_loaded_authenticates() {
        let mut session = Session::default();
        session.dispatch(SessionCommand::Restore(Some("abc".to_owned())));
        let effects = session.dispatch(SessionCommand::ProfileLoaded {
            token: "abc".to_owned(),
            profile: profile("ana"),
        });
        assert_eq!(
            effects,
            vec![SessionEffect::StatusChanged(SessionStatus::Authenticated)]
        );
        assert!(session.is_authenticated());
        assert_eq!(session.user().map(|user| user.username.as_str()), Some("ana"));
        assert_eq!(session.gate(Route::Dashboard), Gate::Open);
    }

    #[test]
    fn profile_failure_clears_cached_token() {
        let mut session = Session::default();
        session.dispatch(SessionCommand::Restore(Some("expired".to_owned())));
        let effects = session.dispatch(SessionCommand::ProfileFailed {
            token: "expired".to_owned(),
        });
        assert_eq!(
            effects,
            vec![
                SessionEffect::ClearCachedToken,
                SessionEffect::StatusChanged(SessionStatus::Unauthenticated),
            ]
        );
        assert_eq!(session.token(), None);
        assert_eq!(session.status(), SessionStatus::Unauthenticated);
    }

    #[test]
    fn stale_profile_responses_are_ignored() {
        let mut session = Session::default();
        session.dispatch(SessionCommand::Restore(Some("old".to_owned())));
        session.dispatch(SessionCommand::LoggedIn("new".to_owned()));

        let failed = session.dispatch(SessionCommand::ProfileFailed {
            token: "old".to_owned(),
        });
        assert!(failed.is_empty());
        assert_eq!(session.token(), Some("new"));

        let loaded = session.dispatch(SessionCommand::ProfileLoaded {
            token: "old".to_owned(),
            profile: profile("old"),
        });
        assert!(loaded.is_empty());
        assert_eq!(session.status(), SessionStatus::Loading);
    }

    #[test]
    fn login_persists_then_fetches_profile() {
        let mut session = Session::default();
        session.dispatch(SessionCommand::Restore(None));
        let effects = session.dispatch(SessionCommand::LoggedIn("fresh".to_owned()));
        assert_eq!(
            effects,
            vec![
                SessionEffect::PersistToken("fresh".to_owned()),
                SessionEffect::StatusChanged(SessionStatus::Loading),
                SessionEffect::FetchProfile("fresh".to_owned()),
            ]
        );
    }

    #[test]
    fn logout_clears_everything() {
        let mut session = Session::default();
        session.dispatch(SessionCommand::Restore(Some("abc".to_owned())));
        session.dispatch(SessionCommand::ProfileLoaded {
            token: "abc".to_owned(),
            profile: profile("ana"),
        });
        session.remember_destination(Route::Appointments);

        let effects = session.dispatch(SessionCommand::Logout);
        assert_eq!(
            effects,
            vec![
                SessionEffect::ClearCachedToken,
                SessionEffect::StatusChanged(SessionStatus::Unauthenticated),
            ]
        );
        assert_eq!(session.user(), None);
        assert_eq!(session.destination(), None);
    }

    #[test]
    fn destination_is_taken_once() {
        let mut session = Session::default();
        session.remember_destination(Route::Appointments);
        assert_eq!(session.take_destination(), Some(Route::Appointments));
        assert_eq!(session.take_destination(), None);
    }
}
