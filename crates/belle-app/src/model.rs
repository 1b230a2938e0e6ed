// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::ids::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub client_id: ClientId,
    pub service: String,
    pub starts_at: OffsetDateTime,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Credentials and profile fields accepted by the registration endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub message: String,
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeneralStats {
    pub total_clients: u64,
    pub total_appointments: u64,
    pub appointments_this_month: u64,
    pub new_clients_this_month: u64,
    pub appointments_today: u64,
    pub occupancy_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceShare {
    pub service: String,
    pub count: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: Date,
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopClient {
    pub name: String,
    pub email: String,
    pub appointments: u64,
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardData {
    pub stats: GeneralStats,
    pub by_service: Vec<ServiceShare>,
    pub daily_appointments: Vec<DailyCount>,
    pub daily_new_clients: Vec<DailyCount>,
    pub top_clients: Vec<TopClient>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportKind {
    Clients,
    Appointments,
    Services,
}

impl ReportKind {
    pub const ALL: [Self; 3] = [Self::Clients, Self::Appointments, Self::Services];

    /// Value of the `tipo` query parameter on the export endpoint.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clients => "clientes",
            Self::Appointments => "agendamentos",
            Self::Services => "servicos",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "clientes" => Some(Self::Clients),
            "agendamentos" => Some(Self::Appointments),
            "servicos" => Some(Self::Services),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Clients => "clients",
            Self::Appointments => "appointments",
            Self::Services => "services",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportQuery {
    pub kind: ReportKind,
    pub from: Option<Date>,
    pub to: Option<Date>,
}

impl ExportQuery {
    pub const fn new(kind: ReportKind) -> Self {
        Self {
            kind,
            from: None,
            to: None,
        }
    }
}

/// A report body as delivered by the server, before it is written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFile {
    pub kind: ReportKind,
    pub suggested_name: Option<String>,
    pub bytes: Vec<u8>,
}

impl ReportFile {
    /// Name to save under: the server's suggestion, else `<kind>_<date>.csv`.
    pub fn file_name(&self, today: Date) -> String {
        match &self.suggested_name {
            Some(name) => name.clone(),
            None => format!("{}_{}.csv", self.kind.as_str(), today),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    Appointments,
}

impl Route {
    pub const PROTECTED: [Self; 2] = [Self::Dashboard, Self::Appointments];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
            Self::Dashboard => "dashboard",
            Self::Appointments => "appointments",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "login" => Some(Self::Login),
            "register" => Some(Self::Register),
            "dashboard" => Some(Self::Dashboard),
            "appointments" => Some(Self::Appointments),
            _ => None,
        }
    }

    pub const fn is_protected(self) -> bool {
        matches!(self, Self::Dashboard | Self::Appointments)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortField {
    #[default]
    StartsAt,
    Service,
}

impl SortField {
    pub const fn label(self) -> &'static str {
        match self {
            Self::StartsAt => "date/time",
            Self::Service => "service",
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::StartsAt => Self::Service,
            Self::Service => Self::StartsAt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Asc => "ascending",
            Self::Desc => "descending",
        }
    }

    pub const fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Async-loaded view data: nothing requested yet, waiting, failed or present.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Loadable<T> {
    #[default]
    Idle,
    Loading,
    Failed(String),
    Loaded(T),
}

impl<T> Loadable<T> {
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}
