// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use belle_app::{
    Appointment, AppointmentId, ClientId, DailyCount, DashboardData, GeneralStats, ServiceShare,
    TopClient,
};
use serde_json::{Value, json};
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::thread;
use std::time::Duration as StdDuration;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, Month, OffsetDateTime, Time};
use tiny_http::{Header, Response, Server};

const SERVICES: [&str; 8] = [
    "Corte",
    "Manicure",
    "Pedicure",
    "Escova",
    "Coloração",
    "Hidratação",
    "Maquiagem",
    "Sobrancelha",
];

const FIRST_NAMES: [&str; 12] = [
    "Ana", "Beatriz", "Camila", "Daniela", "Elisa", "Fernanda", "Gabriela", "Helena", "Isabela",
    "Júlia", "Larissa", "Marina",
];
const LAST_NAMES: [&str; 10] = [
    "Silva", "Souza", "Costa", "Santos", "Oliveira", "Pereira", "Lima", "Carvalho", "Ribeiro",
    "Almeida",
];

const NOTES: [&str; 6] = [
    "primeira visita",
    "prefere a tarde",
    "alergia a amônia",
    "trazer referência de cor",
    "cliente fiel",
    "remarcado por telefone",
];

const REFERENCE_YEAR: i32 = 2026;
// Salon hours, 09:00 through 18:30 in half-hour slots.
const OPENING_HOUR: u8 = 9;
const SLOTS_PER_DAY: usize = 20;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator of plausible salon data.
#[derive(Debug, Clone)]
pub struct SalonFaker {
    rng: DeterministicRng,
}

impl SalonFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn service(&mut self) -> &'static str {
        SERVICES[self.rng.int_n(SERVICES.len())]
    }

    pub fn client_name(&mut self) -> String {
        let first = FIRST_NAMES[self.rng.int_n(FIRST_NAMES.len())];
        let last = LAST_NAMES[self.rng.int_n(LAST_NAMES.len())];
        format!("{first} {last}")
    }

    /// An appointment in a half-hour slot on one of the first 28 days of
    /// `month`.
    pub fn appointment(&mut self, id: i64, month: Month) -> Appointment {
        let day = 1 + self.rng.int_n(28) as u8;
        let slot = self.rng.int_n(SLOTS_PER_DAY);
        let notes = self
            .rng
            .bool()
            .then(|| NOTES[self.rng.int_n(NOTES.len())].to_owned());
        Appointment {
            id: AppointmentId::new(id),
            client_id: ClientId::new(1 + self.rng.int_n(40) as i64),
            service: self.service().to_owned(),
            starts_at: slot_utc(REFERENCE_YEAR, month, day, slot),
            notes,
        }
    }

    pub fn appointments(&mut self, count: usize, month: Month) -> Vec<Appointment> {
        (1..=count)
            .map(|id| self.appointment(id as i64, month))
            .collect()
    }

    pub fn dashboard(&mut self) -> DashboardData {
        let counts: Vec<u64> = SERVICES
            .iter()
            .map(|_| 1 + self.rng.int_n(30) as u64)
            .collect();
        let total: u64 = counts.iter().sum();
        let by_service = SERVICES
            .iter()
            .zip(&counts)
            .map(|(service, count)| ServiceShare {
                service: (*service).to_owned(),
                count: *count,
                percent: round_tenth(*count as f64 * 100.0 / total as f64),
            })
            .collect();

        let first_day = day(REFERENCE_YEAR, Month::March, 1);
        let daily = |rng: &mut DeterministicRng, max: usize| -> Vec<DailyCount> {
            (0..30)
                .map(|offset| {
                    let date = first_day + Duration::days(offset);
                    DailyCount {
                        date,
                        label: short_label(date),
                        count: rng.int_n(max) as u64,
                    }
                })
                .collect()
        };
        let daily_appointments = daily(&mut self.rng, 12);
        let daily_new_clients = daily(&mut self.rng, 4);

        let top_clients = (1..=5)
            .map(|rank| {
                let name = self.client_name();
                TopClient {
                    email: format!("{}@salon.test", name.to_lowercase().replace(' ', ".")),
                    name,
                    appointments: 20 - rank as u64 * 2,
                    rank,
                }
            })
            .collect();

        DashboardData {
            stats: GeneralStats {
                total_clients: 40,
                total_appointments: total,
                appointments_this_month: daily_appointments_sum(&daily_appointments),
                new_clients_this_month: daily_appointments_sum(&daily_new_clients),
                appointments_today: self.rng.int_n(10) as u64,
                occupancy_rate: round_tenth(self.rng.int_n(1000) as f64 / 10.0),
            },
            by_service,
            daily_appointments,
            daily_new_clients,
            top_clients,
        }
    }
}

/// A hand-built appointment for tests that need exact values.
pub fn appointment(id: i64, service: &str, starts_at: OffsetDateTime) -> Appointment {
    Appointment {
        id: AppointmentId::new(id),
        client_id: ClientId::new(id * 10),
        service: service.to_owned(),
        starts_at,
        notes: None,
    }
}

/// `count` appointments one hour apart starting 2026-03-02 09:00 UTC, ids
/// `1..=count`, cycling through the salon services.
pub fn numbered_appointments(count: usize) -> Vec<Appointment> {
    let start = slot_utc(REFERENCE_YEAR, Month::March, 2, 0);
    (0..count)
        .map(|index| {
            appointment(
                index as i64 + 1,
                SERVICES[index % SERVICES.len()],
                start + Duration::hours(index as i64),
            )
        })
        .collect()
}

/// The server's JSON shape for one appointment.
pub fn appointment_json(appointment: &Appointment) -> Value {
    json!({
        "id": appointment.id.get(),
        "cliente_id": appointment.client_id.get(),
        "data_hora": appointment.starts_at.format(&Rfc3339).unwrap_or_default(),
        "servico": appointment.service,
        "observacoes": appointment.notes,
    })
}

/// The server's JSON shape for the dashboard report.
pub fn dashboard_json(data: &DashboardData) -> Value {
    let series = |counts: &[DailyCount]| -> Vec<Value> {
        counts
            .iter()
            .map(|count| {
                json!({
                    "data": count.date.to_string(),
                    "data_formatada": count.label,
                    "quantidade": count.count,
                })
            })
            .collect()
    };
    json!({
        "estatisticas_gerais": {
            "total_clientes": data.stats.total_clients,
            "total_agendamentos": data.stats.total_appointments,
            "agendamentos_mes": data.stats.appointments_this_month,
            "clientes_novos_mes": data.stats.new_clients_this_month,
            "agendamentos_hoje": data.stats.appointments_today,
            "taxa_ocupacao": data.stats.occupancy_rate,
        },
        "agendamentos_por_servico": data.by_service.iter().map(|share| json!({
            "servico": share.service,
            "quantidade": share.count,
            "percentual": share.percent,
        })).collect::<Vec<_>>(),
        "agendamentos_diarios": series(&data.daily_appointments),
        "clientes_novos": series(&data.daily_new_clients),
        "top_clientes": data.top_clients.iter().map(|client| json!({
            "nome": client.name,
            "email": client.email,
            "total_agendamentos": client.appointments,
            "posicao": client.rank,
        })).collect::<Vec<_>>(),
    })
}

pub fn profile_json(id: i64, username: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "email": format!("{username}@salon.test"),
        "role": "admin",
        "is_active": true,
    })
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("belle.db");
    Ok((dir, db_path))
}

/// One canned reply of a [`MockApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl MockResponse {
    pub fn json(status: u16, value: &Value) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_owned(), "application/json".to_owned())],
            body: value.to_string().into_bytes(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_owned(), "text/plain".to_owned())],
            body: body.as_bytes().to_vec(),
        }
    }

    /// A FastAPI-style error body: `{"detail": message}`.
    pub fn detail(status: u16, message: &str) -> Self {
        Self::json(status, &json!({ "detail": message }))
    }

    pub fn csv(body: &str) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type".to_owned(), "text/csv; charset=utf-8".to_owned())],
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    fn into_response(self) -> Result<Response<Cursor<Vec<u8>>>> {
        let mut response = Response::from_data(self.body).with_status_code(self.status);
        for (name, value) in &self.headers {
            let header = Header::from_bytes(name.as_bytes(), value.as_bytes())
                .map_err(|()| anyhow!("invalid mock header {name}"))?;
            response = response.with_header(header);
        }
        Ok(response)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or_default()
    }
}

/// A local HTTP server that answers requests with a fixed script, one
/// response per request in order, and records what it received.
pub struct MockApi {
    base_url: String,
    handle: thread::JoinHandle<Result<Vec<RecordedRequest>>>,
}

impl MockApi {
    pub fn serve(script: Vec<MockResponse>) -> Result<Self> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let base_url = format!("http://{}", server.server_addr());

        let handle = thread::spawn(move || {
            let mut recorded = Vec::with_capacity(script.len());
            for scripted in script {
                let mut request = server
                    .recv_timeout(StdDuration::from_secs(5))
                    .context("receive request")?
                    .ok_or_else(|| anyhow!("no request arrived for scripted response"))?;
                let mut body = String::new();
                request
                    .as_reader()
                    .read_to_string(&mut body)
                    .context("read request body")?;
                recorded.push(RecordedRequest {
                    method: request.method().to_string(),
                    url: request.url().to_owned(),
                    headers: request
                        .headers()
                        .iter()
                        .map(|header| (header.field.to_string(), header.value.to_string()))
                        .collect(),
                    body,
                });
                request
                    .respond(scripted.into_response()?)
                    .context("send scripted response")?;
            }
            Ok(recorded)
        });

        Ok(Self { base_url, handle })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Waits for the script to be consumed and returns the requests seen.
    pub fn finish(self) -> Result<Vec<RecordedRequest>> {
        self.handle
            .join()
            .map_err(|_| anyhow!("mock server thread panicked"))?
    }
}

fn slot_utc(year: i32, month: Month, day_of_month: u8, slot: usize) -> OffsetDateTime {
    let minutes = slot as u32 * 30;
    let hour = OPENING_HOUR + (minutes / 60) as u8;
    let minute = (minutes % 60) as u8;
    let time = Time::from_hms(hour, minute, 0).expect("valid slot time");
    day(year, month, day_of_month).with_time(time).assume_utc()
}

fn day(year: i32, month: Month, day_of_month: u8) -> Date {
    Date::from_calendar_date(year, month, day_of_month).expect("valid calendar date")
}

fn short_label(date: Date) -> String {
    date.format(&format_description!("[day]/[month]"))
        .unwrap_or_default()
}

fn daily_appointments_sum(counts: &[DailyCount]) -> u64 {
    counts.iter().map(|count| count.count).sum()
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
