// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{
    Gate, Route, Session, SessionCommand, SessionEffect, SessionStatus, UserProfile,
};

const PUBLIC_ROUTES: [Route; 2] = [Route::Login, Route::Register];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub route: Route,
    pub session: Session,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Route::Dashboard)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Navigate(Route),
    NextView,
    PrevView,
    SessionRestored(Option<String>),
    LoggedIn(String),
    ProfileLoaded { token: String, profile: UserProfile },
    ProfileFailed { token: String, error: String },
    Logout,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    RouteChanged(Route),
    /// A protected route was requested without a session.
    Redirected { requested: Route },
    /// A protected view became visible and should fetch its data.
    LoadView(Route),
    Session(SessionEffect),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn new(start: Route) -> Self {
        Self {
            route: start,
            session: Session::default(),
            status_line: None,
        }
    }

    pub fn gate(&self) -> Gate {
        self.session.gate(self.route)
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::Navigate(route) => self.navigate(route),
            AppCommand::NextView => self.rotate_view(1),
            AppCommand::PrevView => self.rotate_view(-1),
            AppCommand::SessionRestored(token) => {
                let mut events = self.apply_session(SessionCommand::Restore(token));
                events.extend(self.enforce_gate());
                events
            }
            AppCommand::LoggedIn(token) => self.apply_session(SessionCommand::LoggedIn(token)),
            AppCommand::ProfileLoaded { token, profile } => {
                let mut events =
                    self.apply_session(SessionCommand::ProfileLoaded { token, profile });
                if !events.contains(&AppEvent::Session(SessionEffect::StatusChanged(
                    SessionStatus::Authenticated,
                ))) {
                    return events;
                }
                if self.route.is_protected() {
                    events.push(AppEvent::LoadView(self.route));
                } else {
                    let destination = self.session.take_destination().unwrap_or(Route::Dashboard);
                    events.extend(self.enter(destination));
                    events.push(AppEvent::LoadView(destination));
                }
                if let Some(user) = self.session.user() {
                    let message = format!("signed in as {}", user.username);
                    events.push(self.set_status(&message));
                }
                events
            }
            AppCommand::ProfileFailed { token, error } => {
                let mut events = self.apply_session(SessionCommand::ProfileFailed { token });
                if events.is_empty() {
                    return events;
                }
                events.push(self.set_status(&format!("session ended: {error}")));
                events.extend(self.enforce_gate());
                events
            }
            AppCommand::Logout => {
                let mut events = self.apply_session(SessionCommand::Logout);
                if self.route.is_protected() {
                    events.extend(self.enter(Route::Login));
                }
                events.push(self.set_status("signed out"));
                events
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn navigate(&mut self, route: Route) -> Vec<AppEvent> {
        match self.session.gate(route) {
            Gate::Open => {
                let mut events = self.enter(route);
                if route.is_protected() {
                    events.push(AppEvent::LoadView(route));
                }
                events
            }
            // Shown as a loading screen; the fetch waits for the profile.
            Gate::Wait => self.enter(route),
            Gate::RedirectToLogin => self.redirect(route),
        }
    }

    fn rotate_view(&mut self, delta: isize) -> Vec<AppEvent> {
        let views: &[Route] = if self.session.is_authenticated() {
            &Route::PROTECTED
        } else {
            &PUBLIC_ROUTES
        };
        let current = views
            .iter()
            .position(|route| *route == self.route)
            .unwrap_or(0) as isize;
        let len = views.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.navigate(views[next])
    }

    fn enforce_gate(&mut self) -> Vec<AppEvent> {
        if self.gate() == Gate::RedirectToLogin {
            self.redirect(self.route)
        } else {
            Vec::new()
        }
    }

    fn redirect(&mut self, requested: Route) -> Vec<AppEvent> {
        self.session.remember_destination(requested);
        let mut events = vec![AppEvent::Redirected { requested }];
        events.extend(self.enter(Route::Login));
        events
    }

    fn enter(&mut self, route: Route) -> Vec<AppEvent> {
        self.route = route;
        vec![AppEvent::RouteChanged(route)]
    }

    fn apply_session(&mut self, command: SessionCommand) -> Vec<AppEvent> {
        self.session
            .dispatch(command)
            .into_iter()
            .map(AppEvent::Session)
            .collect()
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppCommand, AppEvent, AppState};
    use crate::{Gate, Route, SessionEffect, SessionStatus, UserId, UserProfile, UserRole};

    fn profile() -> UserProfile {
        UserProfile {
            id: UserId::new(1),
            username: "ana".to_owned(),
            email: "ana@salon.test".to_owned(),
            role: UserRole::Admin,
            is_active: true,
        }
    }

    fn signed_in(start: Route) -> AppState {
        let mut state = AppState::new(start);
        state.dispatch(AppCommand::SessionRestored(Some("tok".to_owned())));
        state.dispatch(AppCommand::ProfileLoaded {
            token: "tok".to_owned(),
            profile: profile(),
        });
        state
    }

    #[test]
    fn protected_start_waits_while_session_loads() {
        let mut state = AppState::new(Route::Appointments);
        let events = state.dispatch(AppCommand::SessionRestored(Some("tok".to_owned())));
        assert_eq!(
            events,
            vec![AppEvent::Session(SessionEffect::FetchProfile("tok".to_owned()))]
        );
        assert_eq!(state.route, Route::Appointments);
        assert_eq!(state.gate(), Gate::Wait);
    }

    #[test]
    fn profile_load_on_protected_route_triggers_view_fetch() {
        let mut state = AppState::new(Route::Appointments);
        state.dispatch(AppCommand::SessionRestored(Some("tok".to_owned())));
        let events = state.dispatch(AppCommand::ProfileLoaded {
            token: "tok".to_owned(),
            profile: profile(),
        });
        assert!(events.contains(&AppEvent::Session(SessionEffect::StatusChanged(
            SessionStatus::Authenticated
        ))));
        assert!(events.contains(&AppEvent::LoadView(Route::Appointments)));
        assert_eq!(state.status_line.as_deref(), Some("signed in as ana"));
    }

    #[test]
    fn missing_token_redirects_and_remembers_destination() {
        let mut state = AppState::new(Route::Appointments);
        let events = state.dispatch(AppCommand::SessionRestored(None));
        assert!(events.contains(&AppEvent::Redirected {
            requested: Route::Appointments
        }));
        assert_eq!(state.route, Route::Login);

        state.dispatch(AppCommand::LoggedIn("fresh".to_owned()));
        let events = state.dispatch(AppCommand::ProfileLoaded {
            token: "fresh".to_owned(),
            profile: profile(),
        });
        assert_eq!(state.route, Route::Appointments);
        assert!(events.contains(&AppEvent::RouteChanged(Route::Appointments)));
        assert!(events.contains(&AppEvent::LoadView(Route::Appointments)));
    }

    #[test]
    fn login_without_destination_lands_on_dashboard() {
        let mut state = AppState::new(Route::Login);
        state.dispatch(AppCommand::SessionRestored(None));
        state.dispatch(AppCommand::LoggedIn("fresh".to_owned()));
        state.dispatch(AppCommand::ProfileLoaded {
            token: "fresh".to_owned(),
            profile: profile(),
        });
        assert_eq!(state.route, Route::Dashboard);
    }

    #[test]
    fn profile_failure_on_protected_route_redirects() {
        let mut state = AppState::new(Route::Dashboard);
        state.dispatch(AppCommand::SessionRestored(Some("old".to_owned())));
        let events = state.dispatch(AppCommand::ProfileFailed {
            token: "old".to_owned(),
            error: "Could not validate credentials".to_owned(),
        });
        assert!(events.contains(&AppEvent::Session(SessionEffect::ClearCachedToken)));
        assert_eq!(state.route, Route::Login);
        assert_eq!(
            state.status_line.as_deref(),
            Some("session ended: Could not validate credentials")
        );
    }

    #[test]
    fn stale_profile_failure_changes_nothing() {
        let mut state = signed_in(Route::Dashboard);
        let events = state.dispatch(AppCommand::ProfileFailed {
            token: "someone-else".to_owned(),
            error: "nope".to_owned(),
        });
        assert!(events.is_empty());
        assert_eq!(state.route, Route::Dashboard);
    }

    #[test]
    fn navigate_to_protected_view_loads_when_signed_in() {
        let mut state = signed_in(Route::Dashboard);
        let events = state.dispatch(AppCommand::Navigate(Route::Appointments));
        assert_eq!(
            events,
            vec![
                AppEvent::RouteChanged(Route::Appointments),
                AppEvent::LoadView(Route::Appointments),
            ]
        );
    }

    #[test]
    fn next_view_cycles_protected_routes_when_signed_in() {
        let mut state = signed_in(Route::Dashboard);
        state.dispatch(AppCommand::NextView);
        assert_eq!(state.route, Route::Appointments);
        state.dispatch(AppCommand::NextView);
        assert_eq!(state.route, Route::Dashboard);
        state.dispatch(AppCommand::PrevView);
        assert_eq!(state.route, Route::Appointments);
    }

    #[test]
    fn next_view_cycles_auth_screens_when_signed_out() {
        let mut state = AppState::new(Route::Login);
        state.dispatch(AppCommand::SessionRestored(None));
        state.dispatch(AppCommand::NextView);
        assert_eq!(state.route, Route::Register);
        state.dispatch(AppCommand::NextView);
        assert_eq!(state.route, Route::Login);
    }

    #[test]
    fn logout_leaves_protected_view() {
        let mut state = signed_in(Route::Appointments);
        let events = state.dispatch(AppCommand::Logout);
        assert!(events.contains(&AppEvent::Session(SessionEffect::ClearCachedToken)));
        assert_eq!(state.route, Route::Login);
        assert_eq!(state.session.destination(), None);
        assert_eq!(state.status_line.as_deref(), Some("signed out"));
    }

    #[test]
    fn clear_status() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::SetStatus("saved".to_owned()));
        assert_eq!(state.status_line.as_deref(), Some("saved"));
        let events = state.dispatch(AppCommand::ClearStatus);
        assert_eq!(events, vec![AppEvent::StatusCleared]);
        assert_eq!(state.status_line, None);
    }
}
