// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use belle_app::validation::{format_date, format_local_timestamp, parse_optional_date};
use belle_app::{
    AppCommand, AppEvent, AppState, Appointment, AppointmentList, DailyCount, DashboardData,
    ExportQuery, FormFieldSpec, Gate, GeneralStats, LOGIN_FIELDS, ListCommand, ListEvent,
    ListPresentation, Loadable, LoginForm, NewAccount, REGISTER_FIELDS, RegisterForm,
    Registration, ReportKind, Route, SessionEffect, SessionStatus, UserProfile,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap};
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::UtcOffset;

const STATUS_CLEAR_SECS: u64 = 4;
const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const MEDALS: [&str; 3] = ["🥇", "🥈", "🥉"];
const SERVICE_BAR_WIDTH: usize = 24;
const AUTH_VIEWS: [Route; 2] = [Route::Login, Route::Register];

/// One call against the salon API, described as data so the runtime can run
/// it off the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteRequest {
    Profile { token: String },
    Login { username: String, password: String },
    Register(NewAccount),
    Appointments { token: String },
    Dashboard { token: String },
    Export { token: String, query: ExportQuery },
}

impl RemoteRequest {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Profile { .. } => "profile",
            Self::Login { .. } => "login",
            Self::Register(_) => "registration",
            Self::Appointments { .. } => "appointments",
            Self::Dashboard { .. } => "dashboard",
            Self::Export { .. } => "export",
        }
    }
}

/// Result of a [`RemoteRequest`]. Errors are already user-facing text.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome {
    Profile(Result<UserProfile, String>),
    LoggedIn(Result<String, String>),
    Registered(Result<Registration, String>),
    Appointments(Result<Vec<Appointment>, String>),
    Dashboard(Result<DashboardData, String>),
    /// Path of the written report.
    Exported(Result<PathBuf, String>),
}

pub trait AppRuntime {
    fn cached_token(&mut self) -> Result<Option<String>>;
    fn persist_token(&mut self, token: &str) -> Result<()>;
    fn clear_token(&mut self) -> Result<()>;
    fn execute(&mut self, request: RemoteRequest) -> RemoteOutcome;
    fn spawn_request(
        &mut self,
        request_id: u64,
        request: RemoteRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let outcome = self.execute(request);
        tx.send(InternalEvent::Remote {
            request_id,
            outcome,
        })
        .map_err(|_| anyhow!("remote event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    Remote { request_id: u64, outcome: RemoteOutcome },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiOptions {
    pub page_size: usize,
    pub local_offset: UtcOffset,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            page_size: belle_app::DEFAULT_PAGE_SIZE,
            local_offset: UtcOffset::UTC,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct PendingRequests {
    profiles: BTreeMap<u64, String>,
    login: Option<u64>,
    register: Option<u64>,
    appointments: Option<u64>,
    dashboard: Option<u64>,
    export: Option<(u64, ReportKind)>,
}

impl PendingRequests {
    fn submitting(&self) -> bool {
        self.login.is_some() || self.register.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterField {
    Date,
    Service,
}

impl FilterField {
    const fn label(self) -> &'static str {
        match self {
            Self::Date => "date (YYYY-MM-DD)",
            Self::Service => "service",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FilterInput {
    field: FilterField,
    buffer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct FormUiState {
    field_index: usize,
    error: Option<String>,
}

#[derive(Debug, Clone)]
struct ViewData {
    login: LoginForm,
    register: RegisterForm,
    form: FormUiState,
    list: AppointmentList,
    filter_input: Option<FilterInput>,
    dashboard: Loadable<DashboardData>,
    help_visible: bool,
    status_token: u64,
    next_request_id: u64,
    pending: PendingRequests,
}

impl ViewData {
    fn new(options: UiOptions) -> Self {
        Self {
            login: LoginForm::default(),
            register: RegisterForm::default(),
            form: FormUiState::default(),
            list: AppointmentList::new(options.page_size, options.local_offset),
            filter_input: None,
            dashboard: Loadable::Idle,
            help_visible: false,
            status_token: 0,
            next_request_id: 0,
            pending: PendingRequests::default(),
        }
    }
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    options: UiOptions,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(options);
    let (internal_tx, internal_rx) = mpsc::channel();

    start_session(state, runtime, &mut view_data, &internal_tx);

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn start_session<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    let token = match runtime.cached_token() {
        Ok(token) => token,
        Err(error) => {
            emit_status(state, view_data, tx, format!("session cache unreadable: {error}"));
            None
        }
    };
    let events = state.dispatch(AppCommand::SessionRestored(token));
    apply_app_events(state, runtime, view_data, tx, events);
}

fn process_internal_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Remote {
                request_id,
                outcome,
            } => handle_remote_outcome(state, runtime, view_data, tx, request_id, outcome),
        }
    }
}

fn dispatch_and_apply<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    command: AppCommand,
) {
    let events = state.dispatch(command);
    apply_app_events(state, runtime, view_data, tx, events);
}

fn apply_app_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    events: Vec<AppEvent>,
) {
    for event in events {
        match event {
            AppEvent::RouteChanged(route) => enter_route(view_data, route),
            AppEvent::Redirected { requested } => {
                tracing::debug!(requested = requested.label(), "redirected to login");
            }
            AppEvent::LoadView(route) => load_view(state, runtime, view_data, tx, route),
            AppEvent::Session(effect) => {
                apply_session_effect(state, runtime, view_data, tx, effect);
            }
            AppEvent::StatusUpdated(_) => {
                view_data.status_token = view_data.status_token.saturating_add(1);
                schedule_status_clear(tx, view_data.status_token);
            }
            AppEvent::StatusCleared => {}
        }
    }
}

fn apply_session_effect<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    effect: SessionEffect,
) {
    match effect {
        SessionEffect::PersistToken(token) => {
            if let Err(error) = runtime.persist_token(&token) {
                emit_status(state, view_data, tx, format!("could not cache session: {error:#}"));
            }
        }
        SessionEffect::ClearCachedToken => {
            if let Err(error) = runtime.clear_token() {
                emit_status(state, view_data, tx, format!("could not clear session: {error:#}"));
            }
        }
        SessionEffect::FetchProfile(token) => {
            let request = RemoteRequest::Profile {
                token: token.clone(),
            };
            match spawn_remote(runtime, view_data, tx, request) {
                Ok(request_id) => {
                    view_data.pending.profiles.insert(request_id, token);
                }
                Err(error) => dispatch_and_apply(
                    state,
                    runtime,
                    view_data,
                    tx,
                    AppCommand::ProfileFailed {
                        token,
                        error: error.to_string(),
                    },
                ),
            }
        }
        SessionEffect::StatusChanged(status) => {
            tracing::info!(status = status.label(), "session status changed");
        }
    }
}

fn enter_route(view_data: &mut ViewData, route: Route) {
    if route != Route::Appointments {
        view_data.list.discard();
        view_data.pending.appointments = None;
        view_data.filter_input = None;
    }
    if route != Route::Dashboard {
        view_data.dashboard = Loadable::Idle;
        view_data.pending.dashboard = None;
    }
    if AUTH_VIEWS.contains(&route) {
        view_data.form = FormUiState::default();
    }
}

fn load_view<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    route: Route,
) {
    let Some(token) = state.session.token().map(str::to_owned) else {
        return;
    };
    match route {
        Route::Appointments => {
            view_data.list.begin_load();
            match spawn_remote(runtime, view_data, tx, RemoteRequest::Appointments { token }) {
                Ok(request_id) => view_data.pending.appointments = Some(request_id),
                Err(error) => view_data.list.finish_load(Err(error.to_string())),
            }
        }
        Route::Dashboard => {
            view_data.dashboard = Loadable::Loading;
            match spawn_remote(runtime, view_data, tx, RemoteRequest::Dashboard { token }) {
                Ok(request_id) => view_data.pending.dashboard = Some(request_id),
                Err(error) => view_data.dashboard = Loadable::Failed(error.to_string()),
            }
        }
        Route::Login | Route::Register => {}
    }
}

fn spawn_remote<R: AppRuntime>(
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    request: RemoteRequest,
) -> Result<u64> {
    view_data.next_request_id = view_data.next_request_id.saturating_add(1);
    let request_id = view_data.next_request_id;
    let label = request.label();
    runtime
        .spawn_request(request_id, request, tx.clone())
        .with_context(|| format!("start {label} request"))?;
    Ok(request_id)
}

fn handle_remote_outcome<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    request_id: u64,
    outcome: RemoteOutcome,
) {
    match outcome {
        RemoteOutcome::Profile(result) => {
            let Some(token) = view_data.pending.profiles.remove(&request_id) else {
                return;
            };
            match result {
                Ok(profile) => dispatch_and_apply(
                    state,
                    runtime,
                    view_data,
                    tx,
                    AppCommand::ProfileLoaded { token, profile },
                ),
                Err(error) => {
                    let events = state.dispatch(AppCommand::ProfileFailed {
                        token,
                        error: error.clone(),
                    });
                    let current = !events.is_empty();
                    apply_app_events(state, runtime, view_data, tx, events);
                    if current && AUTH_VIEWS.contains(&state.route) {
                        view_data.form.error = Some(error);
                    }
                }
            }
        }
        RemoteOutcome::LoggedIn(result) => {
            if view_data.pending.login != Some(request_id) {
                return;
            }
            view_data.pending.login = None;
            match result {
                Ok(token) => {
                    view_data.login.password.clear();
                    view_data.register = RegisterForm::default();
                    dispatch_and_apply(state, runtime, view_data, tx, AppCommand::LoggedIn(token));
                }
                Err(error) => view_data.form.error = Some(error),
            }
        }
        RemoteOutcome::Registered(result) => {
            if view_data.pending.register != Some(request_id) {
                return;
            }
            view_data.pending.register = None;
            match result {
                Ok(registration) if registration.user_id.is_some() => {
                    let credentials = view_data.register.login_form();
                    submit_credentials(runtime, view_data, tx, credentials);
                }
                Ok(registration) => {
                    view_data.login.username = view_data.register.username.trim().to_owned();
                    view_data.register = RegisterForm::default();
                    dispatch_and_apply(
                        state,
                        runtime,
                        view_data,
                        tx,
                        AppCommand::Navigate(Route::Login),
                    );
                    let message = if registration.message.trim().is_empty() {
                        "account created; sign in".to_owned()
                    } else {
                        registration.message
                    };
                    emit_status(state, view_data, tx, message);
                }
                Err(error) => view_data.form.error = Some(error),
            }
        }
        RemoteOutcome::Appointments(result) => {
            if view_data.pending.appointments != Some(request_id) {
                tracing::debug!(request_id, "dropped stale appointments response");
                return;
            }
            view_data.pending.appointments = None;
            view_data.list.finish_load(result);
        }
        RemoteOutcome::Dashboard(result) => {
            if view_data.pending.dashboard != Some(request_id) {
                tracing::debug!(request_id, "dropped stale dashboard response");
                return;
            }
            view_data.pending.dashboard = None;
            view_data.dashboard = match result {
                Ok(data) => Loadable::Loaded(data),
                Err(error) => Loadable::Failed(error),
            };
        }
        RemoteOutcome::Exported(result) => {
            let Some((pending_id, kind)) = view_data.pending.export else {
                return;
            };
            if pending_id != request_id {
                return;
            }
            view_data.pending.export = None;
            let message = match result {
                Ok(path) => format!("saved {} report to {}", kind.label(), path.display()),
                Err(error) => format!("{} export failed: {error}", kind.label()),
            };
            emit_status(state, view_data, tx, message);
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(STATUS_CLEAR_SECS));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c'))
        && key.modifiers.contains(KeyModifiers::CONTROL)
    {
        return true;
    }

    if view_data.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::F(1)) {
            view_data.help_visible = false;
        }
        return false;
    }

    if key.code == KeyCode::F(1) {
        view_data.help_visible = true;
        return false;
    }

    match state.route {
        Route::Login | Route::Register => {
            handle_form_key(state, runtime, view_data, internal_tx, key);
            false
        }
        Route::Dashboard | Route::Appointments => match state.gate() {
            Gate::Open => handle_view_key(state, runtime, view_data, internal_tx, key),
            Gate::Wait | Gate::RedirectToLogin => key.code == KeyCode::Char('q'),
        },
    }
}

fn handle_form_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let field_count = match state.route {
        Route::Register => REGISTER_FIELDS.len(),
        _ => LOGIN_FIELDS.len(),
    };

    match (key.code, key.modifiers) {
        (KeyCode::Char('n'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            dispatch_and_apply(state, runtime, view_data, tx, AppCommand::NextView);
        }
        (KeyCode::Tab | KeyCode::Down, _) => {
            view_data.form.field_index = (view_data.form.field_index + 1) % field_count;
        }
        (KeyCode::BackTab | KeyCode::Up, _) => {
            view_data.form.field_index = (view_data.form.field_index + field_count - 1) % field_count;
        }
        (KeyCode::Enter, _) => submit_form(state, runtime, view_data, tx),
        (KeyCode::Esc, _) => view_data.form.error = None,
        (KeyCode::Backspace, _) => {
            if let Some(value) = active_form_field(state.route, view_data) {
                value.pop();
            }
            view_data.form.error = None;
        }
        (KeyCode::Char(ch), modifiers) if !modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(value) = active_form_field(state.route, view_data) {
                value.push(ch);
            }
            view_data.form.error = None;
        }
        _ => {}
    }
}

fn active_form_field(route: Route, view_data: &mut ViewData) -> Option<&mut String> {
    let index = view_data.form.field_index;
    match route {
        Route::Login => view_data.login.field_mut(index),
        Route::Register => view_data.register.field_mut(index),
        Route::Dashboard | Route::Appointments => None,
    }
}

fn submit_form<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    if view_data.pending.submitting() {
        return;
    }

    match state.route {
        Route::Login => {
            if let Err(error) = view_data.login.validate() {
                view_data.form.error = Some(error.to_string());
                return;
            }
            let credentials = view_data.login.clone();
            submit_credentials(runtime, view_data, tx, credentials);
        }
        Route::Register => {
            let account = match view_data.register.to_account() {
                Ok(account) => account,
                Err(error) => {
                    view_data.form.error = Some(error.to_string());
                    return;
                }
            };
            match spawn_remote(runtime, view_data, tx, RemoteRequest::Register(account)) {
                Ok(request_id) => view_data.pending.register = Some(request_id),
                Err(error) => view_data.form.error = Some(format!("{error:#}")),
            }
        }
        Route::Dashboard | Route::Appointments => {}
    }
}

fn submit_credentials<R: AppRuntime>(
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    credentials: LoginForm,
) {
    let request = RemoteRequest::Login {
        username: credentials.username.trim().to_owned(),
        password: credentials.password,
    };
    match spawn_remote(runtime, view_data, tx, request) {
        Ok(request_id) => view_data.pending.login = Some(request_id),
        Err(error) => view_data.form.error = Some(format!("{error:#}")),
    }
}

fn handle_view_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if view_data.filter_input.is_some() {
        handle_filter_input_key(state, view_data, tx, key);
        return false;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('?') => view_data.help_visible = true,
        KeyCode::Char('f') | KeyCode::Tab => {
            dispatch_and_apply(state, runtime, view_data, tx, AppCommand::NextView);
        }
        KeyCode::Char('b') | KeyCode::BackTab => {
            dispatch_and_apply(state, runtime, view_data, tx, AppCommand::PrevView);
        }
        KeyCode::Char('r') => {
            let route = state.route;
            load_view(state, runtime, view_data, tx, route);
        }
        KeyCode::Char('L') => {
            dispatch_and_apply(state, runtime, view_data, tx, AppCommand::Logout);
        }
        _ => match state.route {
            Route::Appointments => handle_list_key(state, view_data, tx, key),
            Route::Dashboard => handle_dashboard_key(state, runtime, view_data, tx, key),
            Route::Login | Route::Register => {}
        },
    }
    false
}

fn handle_list_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let command = match key.code {
        KeyCode::Char('/') => {
            view_data.filter_input = Some(FilterInput {
                field: FilterField::Service,
                buffer: view_data.list.filter.service.clone().unwrap_or_default(),
            });
            return;
        }
        KeyCode::Char('d') => {
            view_data.filter_input = Some(FilterInput {
                field: FilterField::Date,
                buffer: format_date(view_data.list.filter.date),
            });
            return;
        }
        KeyCode::Char('c') => ListCommand::ClearFilters,
        KeyCode::Char('s') => ListCommand::ToggleSortField,
        KeyCode::Char('S') => ListCommand::ToggleDirection,
        KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown => ListCommand::NextPage,
        KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp => ListCommand::PreviousPage,
        _ => return,
    };

    let sort_changed = matches!(
        command,
        ListCommand::ToggleSortField | ListCommand::ToggleDirection
    );
    if view_data.list.dispatch(command) == ListEvent::CriteriaChanged && sort_changed {
        let sort = view_data.list.sort;
        emit_status(
            state,
            view_data,
            tx,
            format!("sorted by {} {}", sort.field.label(), sort.direction.label()),
        );
    }
}

fn handle_filter_input_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(input) = view_data.filter_input.as_mut() else {
        return;
    };

    match key.code {
        KeyCode::Esc => view_data.filter_input = None,
        KeyCode::Enter => match input.field {
            FilterField::Service => view_data.filter_input = None,
            FilterField::Date => match parse_optional_date(&input.buffer) {
                Ok(date) => {
                    view_data.list.dispatch(ListCommand::SetDate(date));
                    view_data.filter_input = None;
                }
                Err(error) => emit_status(state, view_data, tx, error.to_string()),
            },
        },
        KeyCode::Backspace => {
            input.buffer.pop();
            if input.field == FilterField::Service {
                let service = input.buffer.clone();
                view_data.list.dispatch(ListCommand::SetService(service));
            }
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            input.buffer.push(ch);
            if input.field == FilterField::Service {
                let service = input.buffer.clone();
                view_data.list.dispatch(ListCommand::SetService(service));
            }
        }
        _ => {}
    }
}

fn handle_dashboard_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let kind = match key.code {
        KeyCode::Char('1') => ReportKind::Clients,
        KeyCode::Char('2') => ReportKind::Appointments,
        KeyCode::Char('3') => ReportKind::Services,
        _ => return,
    };
    start_export(state, runtime, view_data, tx, kind);
}

fn start_export<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    kind: ReportKind,
) {
    if let Some((_, running)) = view_data.pending.export {
        tracing::debug!(
            requested = kind.as_str(),
            running = running.as_str(),
            "export ignored while another runs"
        );
        return;
    }
    let Some(token) = state.session.token().map(str::to_owned) else {
        return;
    };

    let request = RemoteRequest::Export {
        token,
        query: ExportQuery::new(kind),
    };
    match spawn_remote(runtime, view_data, tx, request) {
        Ok(request_id) => {
            view_data.pending.export = Some((request_id, kind));
            emit_status(state, view_data, tx, format!("exporting {}…", kind.label()));
        }
        Err(error) => emit_status(state, view_data, tx, format!("{error:#}")),
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let views: &[Route] = if state.session.is_authenticated() {
        &Route::PROTECTED
    } else {
        &AUTH_VIEWS
    };
    let selected = views
        .iter()
        .position(|route| *route == state.route)
        .unwrap_or(0);
    let tabs = Tabs::new(views.iter().map(|route| route.label()).collect::<Vec<_>>())
        .block(
            Block::default()
                .title(header_title(state))
                .borders(Borders::ALL),
        )
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    match (state.route, state.gate()) {
        (Route::Login | Route::Register, _) => {
            let area = centered_rect(60, 70, layout[1]);
            let title = if state.route == Route::Login {
                "sign in"
            } else {
                "create account"
            };
            let form = Paragraph::new(render_form_text(state, view_data))
                .wrap(Wrap { trim: false })
                .block(Block::default().title(title).borders(Borders::ALL));
            frame.render_widget(form, area);
        }
        (_, Gate::Wait | Gate::RedirectToLogin) => {
            let waiting = Paragraph::new("checking session…")
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(waiting, layout[1]);
        }
        (Route::Appointments, Gate::Open) => render_appointments(frame, layout[1], view_data),
        (Route::Dashboard, Gate::Open) => render_dashboard(frame, layout[1], view_data),
    }

    let status = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    if view_data.help_visible {
        let area = centered_rect(70, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn header_title(state: &AppState) -> String {
    match state.session.user() {
        Some(user) => format!("belle · {} ({})", user.username, user.role.as_str()),
        None => format!("belle · {}", state.session.status().label()),
    }
}

fn render_form_text(state: &AppState, view_data: &ViewData) -> String {
    let mut lines = Vec::new();
    if state.route == Route::Login
        && let Some(destination) = state.session.destination()
    {
        lines.push(format!("sign in to open {}", destination.label()));
        lines.push(String::new());
    }

    let fields: Vec<(&FormFieldSpec, &str)> = match state.route {
        Route::Register => REGISTER_FIELDS
            .iter()
            .enumerate()
            .map(|(index, spec)| (spec, view_data.register.field(index).unwrap_or_default()))
            .collect(),
        _ => LOGIN_FIELDS
            .iter()
            .enumerate()
            .map(|(index, spec)| (spec, view_data.login.field(index).unwrap_or_default()))
            .collect(),
    };
    for (index, (spec, value)) in fields.into_iter().enumerate() {
        let marker = if index == view_data.form.field_index {
            "›"
        } else {
            " "
        };
        let required = if spec.required { "*" } else { "" };
        let shown = if spec.secret {
            "•".repeat(value.chars().count())
        } else {
            value.to_owned()
        };
        lines.push(format!("{marker} {}{required}: {shown}", spec.label));
    }

    lines.push(String::new());
    if view_data.pending.submitting() {
        lines.push("submitting…".to_owned());
    } else if let Some(error) = &view_data.form.error {
        lines.push(format!("error: {error}"));
    }
    lines.join("\n")
}

fn render_appointments(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    let criteria = Paragraph::new(render_criteria_text(view_data))
        .block(Block::default().title("filters").borders(Borders::ALL));
    frame.render_widget(criteria, layout[0]);

    let list = &view_data.list;
    match list.presentation() {
        ListPresentation::Page(page) => {
            let rows = page.items.iter().map(|appointment| {
                Row::new(vec![
                    Cell::from(appointment.id.to_string()),
                    Cell::from(format_local_timestamp(appointment.starts_at, list.offset)),
                    Cell::from(appointment.service.clone()),
                    Cell::from(appointment.client_id.to_string()),
                    Cell::from(appointment.notes.clone().unwrap_or_default()),
                ])
            });
            let table = Table::new(
                rows,
                [
                    Constraint::Length(6),
                    Constraint::Length(18),
                    Constraint::Percentage(30),
                    Constraint::Length(8),
                    Constraint::Min(10),
                ],
            )
            .header(
                Row::new(vec!["id", "date/time", "service", "client", "notes"])
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            )
            .block(Block::default().title("appointments").borders(Borders::ALL));
            frame.render_widget(table, layout[1]);
        }
        presentation => {
            let body = Paragraph::new(render_list_message(&presentation))
                .block(Block::default().title("appointments").borders(Borders::ALL));
            frame.render_widget(body, layout[1]);
        }
    }

    frame.render_widget(Paragraph::new(render_list_footer(list)), layout[2]);
}

fn render_criteria_text(view_data: &ViewData) -> String {
    let list = &view_data.list;
    let date = match &view_data.filter_input {
        Some(input) if input.field == FilterField::Date => format!("{}▏", input.buffer),
        _ => format_date(list.filter.date),
    };
    let service = match &view_data.filter_input {
        Some(input) if input.field == FilterField::Service => format!("{}▏", input.buffer),
        _ => list.filter.service.clone().unwrap_or_default(),
    };
    let editing = view_data
        .filter_input
        .as_ref()
        .map(|input| format!(" | editing {}", input.field.label()))
        .unwrap_or_default();
    format!(
        "date: {} | service: {} | sort: {} {}{editing}",
        if date.is_empty() { "any" } else { date.as_str() },
        if service.is_empty() {
            "any"
        } else {
            service.as_str()
        },
        list.sort.field.label(),
        list.sort.direction.label(),
    )
}

fn render_list_message(presentation: &ListPresentation<'_>) -> String {
    match presentation {
        ListPresentation::Loading => "loading appointments…".to_owned(),
        ListPresentation::Failed(message) => {
            format!("could not load appointments: {message}\npress r to retry")
        }
        ListPresentation::Empty { filtered: true } => {
            "no appointments match the filters; press c to clear them".to_owned()
        }
        ListPresentation::Empty { filtered: false } => "no appointments yet".to_owned(),
        ListPresentation::Page(_) => String::new(),
    }
}

fn render_list_footer(list: &AppointmentList) -> String {
    let ListPresentation::Page(page) = list.presentation() else {
        return String::new();
    };
    let previous = if page.has_previous { "‹ p" } else { "   " };
    let next = if page.has_next { "n ›" } else { "   " };
    let mut footer = format!(
        "{previous}  page {}/{}  {next}  showing {} of {}",
        page.page, page.total_pages, page.shown, page.total
    );
    if page.filtered {
        footer.push_str(" (filtered)");
    }
    footer
}

fn render_dashboard(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let data = match &view_data.dashboard {
        Loadable::Loaded(data) => data,
        other => {
            let message = match other.error() {
                Some(error) => format!("could not load dashboard: {error}\npress r to retry"),
                None => "loading dashboard…".to_owned(),
            };
            let body = Paragraph::new(message)
                .block(Block::default().title("dashboard").borders(Borders::ALL));
            frame.render_widget(body, area);
            return;
        }
    };

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(1)])
        .split(area);

    let cards = metric_cards(&data.stats);
    let card_areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            cards
                .iter()
                .map(|_| Constraint::Ratio(1, cards.len() as u32))
                .collect::<Vec<_>>(),
        )
        .split(layout[0]);
    for ((label, value), card_area) in cards.iter().zip(card_areas.iter()) {
        let card = Paragraph::new(value.clone())
            .style(Style::default().add_modifier(Modifier::BOLD))
            .block(Block::default().title(*label).borders(Borders::ALL));
        frame.render_widget(card, *card_area);
    }

    let body = Paragraph::new(render_dashboard_text(data, view_data.pending.export))
        .wrap(Wrap { trim: false })
        .block(Block::default().title("dashboard").borders(Borders::ALL));
    frame.render_widget(body, layout[1]);
}

fn metric_cards(stats: &GeneralStats) -> [(&'static str, String); 6] {
    [
        ("clients", stats.total_clients.to_string()),
        ("appointments", stats.total_appointments.to_string()),
        ("this month", stats.appointments_this_month.to_string()),
        ("new clients", stats.new_clients_this_month.to_string()),
        ("today", stats.appointments_today.to_string()),
        ("occupancy", format!("{:.1}%", stats.occupancy_rate)),
    ]
}

fn render_dashboard_text(data: &DashboardData, exporting: Option<(u64, ReportKind)>) -> String {
    let mut lines = vec!["appointments per service".to_owned()];
    if data.by_service.is_empty() {
        lines.push("  no appointments yet".to_owned());
    }
    let name_width = data
        .by_service
        .iter()
        .map(|share| share.service.chars().count())
        .max()
        .unwrap_or(0);
    let max_count = data
        .by_service
        .iter()
        .map(|share| share.count)
        .max()
        .unwrap_or(0);
    let bar_width = SERVICE_BAR_WIDTH;
    for share in &data.by_service {
        lines.push(format!(
            "  {:<name_width$} {:<bar_width$} {} ({:.1}%)",
            share.service,
            bar(share.count, max_count, bar_width),
            share.count,
            share.percent,
        ));
    }

    lines.push(String::new());
    let daily: Vec<u64> = data.daily_appointments.iter().map(|day| day.count).collect();
    let new_clients: Vec<u64> = data.daily_new_clients.iter().map(|day| day.count).collect();
    lines.push(format!(
        "appointments per day {} {}",
        spark_line(&daily),
        series_span(data.daily_appointments.first(), data.daily_appointments.last()),
    ));
    lines.push(format!(
        "new clients per day  {} {}",
        spark_line(&new_clients),
        series_span(data.daily_new_clients.first(), data.daily_new_clients.last()),
    ));

    lines.push(String::new());
    lines.push("top clients".to_owned());
    if data.top_clients.is_empty() {
        lines.push("  none yet".to_owned());
    }
    for client in &data.top_clients {
        lines.push(format!(
            "  {} {} <{}> {} appointments",
            rank_marker(client.rank),
            client.name,
            client.email,
            client.appointments,
        ));
    }

    lines.push(String::new());
    let actions = ReportKind::ALL
        .iter()
        .enumerate()
        .map(|(index, kind)| {
            let running = matches!(exporting, Some((_, running)) if running == *kind);
            let suffix = if running { " (exporting…)" } else { "" };
            format!("{} {}{suffix}", index + 1, kind.label())
        })
        .collect::<Vec<_>>()
        .join(" | ");
    lines.push(format!("export csv: {actions}"));
    lines.join("\n")
}

fn series_span(first: Option<&DailyCount>, last: Option<&DailyCount>) -> String {
    match (first, last) {
        (Some(first), Some(last)) => format!("{} – {}", first.label, last.label),
        _ => "no data".to_owned(),
    }
}

fn rank_marker(rank: u32) -> String {
    match rank {
        1..=3 => MEDALS[rank as usize - 1].to_owned(),
        _ => format!("#{rank}"),
    }
}

fn bar(count: u64, max: u64, width: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let filled = ((count as f64 / max as f64) * width as f64).round() as usize;
    "█".repeat(filled.min(width))
}

fn spark_line(values: &[u64]) -> String {
    let max = values.iter().copied().max().unwrap_or(0);
    values
        .iter()
        .map(|value| {
            if max == 0 {
                SPARK_LEVELS[0]
            } else {
                SPARK_LEVELS[(value * 7 / max) as usize]
            }
        })
        .collect()
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    let hints = match (state.route, state.gate()) {
        (Route::Login | Route::Register, _) => {
            "tab/shift+tab field | enter submit | ctrl+n login/register | F1 help | ctrl+q quit"
        }
        (_, Gate::Wait | Gate::RedirectToLogin) => "q quit",
        (Route::Appointments, Gate::Open) if view_data.filter_input.is_some() => {
            "type to filter | enter apply | esc close"
        }
        (Route::Appointments, Gate::Open) => {
            "/ service | d date | c clear | s/S sort | n/p page | r refresh | f/b view | L logout | ? help"
        }
        (Route::Dashboard, Gate::Open) => {
            "1/2/3 export | r refresh | f/b view | L logout | ? help | q quit"
        }
    };
    let session = match state.session.status() {
        SessionStatus::Authenticated => "",
        SessionStatus::Loading => "checking session | ",
        SessionStatus::Unauthenticated => "signed out | ",
    };
    match &state.status_line {
        Some(status) => format!("{session}{status} | {hints}"),
        None => format!("{session}{hints}"),
    }
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | F1 help\n\
login/register: tab/shift+tab field | enter submit | ctrl+n switch screen | esc clear error\n\
views: f/b or tab switch view | r refresh/retry | L logout | q quit | ? help\n\
appointments: / service filter | d date filter (YYYY-MM-DD) | c clear filters\n\
appointments: s sort field | S sort direction | n/p or arrows page\n\
dashboard: 1 export clients | 2 export appointments | 3 export services"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
