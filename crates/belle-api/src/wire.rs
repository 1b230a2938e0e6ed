// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use belle_app::{
    Appointment, AppointmentId, ClientId, DailyCount, DashboardData, GeneralStats,
    Registration, ServiceShare, TopClient, UserId, UserProfile, UserRole,
};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub(crate) struct AppointmentWire {
    id: i64,
    cliente_id: i64,
    data_hora: String,
    servico: String,
    #[serde(default)]
    observacoes: Option<String>,
}

impl AppointmentWire {
    pub(crate) fn into_appointment(self, offset: UtcOffset) -> ApiResult<Appointment> {
        let starts_at = parse_timestamp(&self.data_hora, offset).ok_or_else(|| {
            ApiError::decode(
                "appointment",
                format!("appointment {} has bad data_hora {:?}", self.id, self.data_hora),
            )
        })?;
        Ok(Appointment {
            id: AppointmentId::new(self.id),
            client_id: ClientId::new(self.cliente_id),
            service: self.servico,
            starts_at,
            notes: self.observacoes.filter(|notes| !notes.trim().is_empty()),
        })
    }
}

/// Token grant returned by `POST /login`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginGrant {
    pub access_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub username: Option<String>,
}

fn bearer() -> String {
    "bearer".to_owned()
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterWire<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<&'a str>,
    pub role: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegistrationWire {
    #[serde(default)]
    message: String,
    #[serde(default)]
    user_id: Option<UserId>,
}

impl From<RegistrationWire> for Registration {
    fn from(wire: RegistrationWire) -> Self {
        Self {
            message: wire.message,
            user_id: wire.user_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileWire {
    id: UserId,
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default = "active")]
    is_active: bool,
}

fn active() -> bool {
    true
}

impl From<ProfileWire> for UserProfile {
    fn from(wire: ProfileWire) -> Self {
        Self {
            id: wire.id,
            username: wire.username,
            email: wire.email,
            role: wire
                .role
                .as_deref()
                .and_then(UserRole::parse)
                .unwrap_or(UserRole::User),
            is_active: wire.is_active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatsWire {
    total_clientes: u64,
    total_agendamentos: u64,
    agendamentos_mes: u64,
    clientes_novos_mes: u64,
    agendamentos_hoje: u64,
    taxa_ocupacao: f64,
}

#[derive(Debug, Deserialize)]
struct ServiceShareWire {
    servico: String,
    #[serde(default)]
    quantidade: u64,
    #[serde(default)]
    percentual: f64,
}

#[derive(Debug, Deserialize)]
struct DailyCountWire {
    data: String,
    #[serde(default)]
    data_formatada: Option<String>,
    #[serde(default)]
    quantidade: u64,
}

#[derive(Debug, Deserialize)]
struct TopClientWire {
    nome: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    total_agendamentos: u64,
    #[serde(default)]
    posicao: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct DashboardWire {
    estatisticas_gerais: StatsWire,
    agendamentos_por_servico: Vec<ServiceShareWire>,
    agendamentos_diarios: Vec<DailyCountWire>,
    clientes_novos: Vec<DailyCountWire>,
    top_clientes: Vec<TopClientWire>,
}

impl DashboardWire {
    pub(crate) fn into_dashboard(self) -> ApiResult<DashboardData> {
        let stats = self.estatisticas_gerais;
        let top_clients = self
            .top_clientes
            .into_iter()
            .enumerate()
            .map(|(index, client)| TopClient {
                name: client.nome,
                email: client.email,
                appointments: client.total_agendamentos,
                // Missing ranks follow list order.
                rank: if client.posicao == 0 {
                    index as u32 + 1
                } else {
                    client.posicao
                },
            })
            .collect();

        Ok(DashboardData {
            stats: GeneralStats {
                total_clients: stats.total_clientes,
                total_appointments: stats.total_agendamentos,
                appointments_this_month: stats.agendamentos_mes,
                new_clients_this_month: stats.clientes_novos_mes,
                appointments_today: stats.agendamentos_hoje,
                occupancy_rate: stats.taxa_ocupacao,
            },
            by_service: self
                .agendamentos_por_servico
                .into_iter()
                .map(|share| ServiceShare {
                    service: share.servico,
                    count: share.quantidade,
                    percent: share.percentual,
                })
                .collect(),
            daily_appointments: daily_counts(self.agendamentos_diarios)?,
            daily_new_clients: daily_counts(self.clientes_novos)?,
            top_clients,
        })
    }
}

fn daily_counts(wire: Vec<DailyCountWire>) -> ApiResult<Vec<DailyCount>> {
    wire.into_iter()
        .map(|day| {
            let date = Date::parse(&day.data, &format_description!("[year]-[month]-[day]"))
                .map_err(|error| {
                    ApiError::decode("dashboard", format!("bad date {:?}: {error}", day.data))
                })?;
            let label = day
                .data_formatada
                .filter(|label| !label.trim().is_empty())
                .unwrap_or_else(|| {
                    date.format(&format_description!("[day]/[month]"))
                        .unwrap_or_default()
                });
            Ok(DailyCount {
                date,
                label,
                count: day.quantidade,
            })
        })
        .collect()
}

/// Parses a server timestamp. Values with an explicit offset are taken as
/// is; naive values are wall-clock time in `local`.
pub fn parse_timestamp(raw: &str, local: UtcOffset) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }
    let naive = PrimitiveDateTime::parse(
        raw,
        &format_description!(
            "[year]-[month]-[day]T[hour]:[minute][optional [:[second][optional [.[subsecond]]]]]"
        ),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(
            raw,
            &format_description!(
                "[year]-[month]-[day] [hour]:[minute][optional [:[second][optional [.[subsecond]]]]]"
            ),
        )
    })
    .ok()?;
    Some(naive.assume_offset(local))
}

/// File name from a `Content-Disposition` header, reduced to its final
/// path component. `None` when absent or unusable.
pub fn attachment_file_name(header: &str) -> Option<String> {
    let raw = header
        .split(';')
        .map(str::trim)
        .find_map(|part| {
            let (key, value) = part.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("filename")
                .then_some(value)
        })?;
    let unquoted = raw.trim().trim_matches('"').trim();
    let base = unquoted
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }
    Some(base.to_owned())
}

#[cfg(test)]
mod tests {
    use super::{attachment_file_name, parse_timestamp};
    use time::macros::{datetime, offset};

    #[test]
    fn naive_timestamps_use_local_offset() {
        assert_eq!(
            parse_timestamp("2024-05-01T10:00:00", offset!(-3)),
            Some(datetime!(2024-05-01 10:00 -3))
        );
        assert_eq!(
            parse_timestamp("2024-05-01T10:00:00.123456", offset!(UTC)),
            Some(datetime!(2024-05-01 10:00:00.123456 UTC))
        );
        assert_eq!(
            parse_timestamp("2024-05-01 10:00", offset!(UTC)),
            Some(datetime!(2024-05-01 10:00 UTC))
        );
    }

    #[test]
    fn explicit_offsets_win() {
        assert_eq!(
            parse_timestamp("2024-05-01T10:00:00Z", offset!(-3)),
            Some(datetime!(2024-05-01 10:00 UTC))
        );
        assert_eq!(
            parse_timestamp("2024-05-01T10:00:00+02:00", offset!(-3)),
            Some(datetime!(2024-05-01 08:00 UTC))
        );
    }

    #[test]
    fn garbage_timestamps_are_rejected() {
        assert_eq!(parse_timestamp("01/05/2024 10:00", offset!(UTC)), None);
        assert_eq!(parse_timestamp("", offset!(UTC)), None);
    }

    #[test]
    fn attachment_file_name_strips_quotes_and_paths() {
        assert_eq!(
            attachment_file_name(r#"attachment; filename="clientes_2024-05-01.csv""#),
            Some("clientes_2024-05-01.csv".to_owned())
        );
        assert_eq!(
            attachment_file_name("attachment; filename=../x.csv"),
            Some("x.csv".to_owned())
        );
        assert_eq!(
            attachment_file_name(r#"attachment; filename="..\\..\\evil.csv""#),
            Some("evil.csv".to_owned())
        );
        assert_eq!(attachment_file_name("attachment"), None);
        assert_eq!(attachment_file_name("attachment; filename=\"..\""), None);
        assert_eq!(attachment_file_name("attachment; filename=dir/"), None);
    }
}
