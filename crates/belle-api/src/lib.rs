// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod error;
mod wire;

pub use error::{ApiError, ApiResult};
pub use wire::{HealthStatus, LoginGrant, attachment_file_name, parse_timestamp};

use belle_app::{
    Appointment, DashboardData, ExportQuery, NewAccount, Registration, ReportFile, UserProfile,
    validation::format_date,
};
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::CONTENT_DISPOSITION;
use serde::de::DeserializeOwned;
use std::time::Duration;
use time::UtcOffset;
use url::Url;
use wire::{AppointmentWire, DashboardWire, ProfileWire, RegisterWire, RegistrationWire};

/// Blocking client for the salon REST API. Cheap to clone; clones share
/// the connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    local_offset: UtcOffset,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        validate_base_url(&base_url)?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| ApiError::Transport {
                base_url: base_url.clone(),
                source: error,
            })?;

        Ok(Self {
            base_url,
            timeout,
            local_offset: UtcOffset::UTC,
            http,
        })
    }

    /// Offset used to read timestamps the server sends without one.
    pub fn with_local_offset(mut self, offset: UtcOffset) -> Self {
        self.local_offset = offset;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn health(&self) -> ApiResult<HealthStatus> {
        let response = self.send("GET", "/health", self.http.get(self.url("/health")))?;
        decode(response, "health")
    }

    pub fn login(&self, username: &str, password: &str) -> ApiResult<LoginGrant> {
        let request = self
            .http
            .post(self.url("/login"))
            .form(&[("username", username), ("password", password)]);
        let response = self.send("POST", "/login", request)?;
        let grant: LoginGrant = decode(response, "login")?;
        if grant.access_token.trim().is_empty() {
            return Err(ApiError::decode("login", "empty access_token"));
        }
        tracing::info!(username, "logged in");
        Ok(grant)
    }

    pub fn register(&self, account: &NewAccount) -> ApiResult<Registration> {
        let body = RegisterWire {
            username: &account.username,
            email: &account.email,
            password: &account.password,
            full_name: account.full_name.as_deref(),
            role: account.role.as_str(),
        };
        let request = self.http.post(self.url("/register")).json(&body);
        let response = self.send("POST", "/register", request)?;
        let wire: RegistrationWire = decode(response, "registration")?;
        Ok(wire.into())
    }

    pub fn profile(&self, token: &str) -> ApiResult<UserProfile> {
        let request = self.http.get(self.url("/auth/me")).bearer_auth(token);
        let response = self.send("GET", "/auth/me", request)?;
        let wire: ProfileWire = decode(response, "profile")?;
        Ok(wire.into())
    }

    pub fn list_appointments(&self, token: &str) -> ApiResult<Vec<Appointment>> {
        let request = self
            .http
            .get(self.url("/agendamentos/"))
            .bearer_auth(token);
        let response = self.send("GET", "/agendamentos/", request)?;
        let wire: Vec<AppointmentWire> = decode(response, "appointment list")?;
        let appointments = wire
            .into_iter()
            .map(|item| item.into_appointment(self.local_offset))
            .collect::<ApiResult<Vec<_>>>()?;
        tracing::debug!(count = appointments.len(), "fetched appointments");
        Ok(appointments)
    }

    pub fn dashboard(&self, token: &str) -> ApiResult<DashboardData> {
        let path = "/admin/reports/dashboard";
        let request = self.http.get(self.url(path)).bearer_auth(token);
        let response = self.send("GET", path, request)?;
        let wire: DashboardWire = decode(response, "dashboard")?;
        wire.into_dashboard()
    }

    pub fn export_csv(&self, token: &str, query: &ExportQuery) -> ApiResult<ReportFile> {
        let path = "/admin/reports/export/csv";
        let mut url = Url::parse(&self.url(path)).map_err(|error| ApiError::InvalidUrl {
            url: self.url(path),
            reason: error.to_string(),
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("tipo", query.kind.as_str());
            if let Some(from) = query.from {
                pairs.append_pair("data_inicio", &format_date(Some(from)));
            }
            if let Some(to) = query.to {
                pairs.append_pair("data_fim", &format_date(Some(to)));
            }
        }

        let request = self.http.get(url).bearer_auth(token);
        let response = self.send("GET", path, request)?;
        let suggested_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(attachment_file_name);
        let bytes = response
            .bytes()
            .map_err(|error| ApiError::decode("export", error))?
            .to_vec();
        tracing::debug!(kind = query.kind.as_str(), size = bytes.len(), "downloaded report");
        Ok(ReportFile {
            kind: query.kind,
            suggested_name,
            bytes,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn send(&self, method: &str, path: &str, request: RequestBuilder) -> ApiResult<Response> {
        tracing::debug!(method, path, "request");
        let response = request.send().map_err(|error| {
            tracing::warn!(method, path, %error, "request failed");
            ApiError::Transport {
                base_url: self.base_url.clone(),
                source: error,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let error = ApiError::from_status(status, &body);
            tracing::warn!(method, path, status = status.as_u16(), %error, "request rejected");
            return Err(error);
        }
        Ok(response)
    }
}

fn decode<T: DeserializeOwned>(response: Response, what: &'static str) -> ApiResult<T> {
    response
        .json()
        .map_err(|error| ApiError::decode(what, error))
}

fn validate_base_url(base_url: &str) -> ApiResult<()> {
    let invalid = |reason: &str| ApiError::InvalidUrl {
        url: base_url.to_owned(),
        reason: reason.to_owned(),
    };
    if base_url.is_empty() {
        return Err(invalid("must not be empty"));
    }
    let parsed = Url::parse(base_url).map_err(|error| invalid(&error.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(invalid("must not carry a query or fragment"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ApiError, Client};
    use std::time::Duration;

    #[test]
    fn new_trims_trailing_slashes() -> anyhow::Result<()> {
        let client = Client::new("http://localhost:8000///", Duration::from_secs(1))?;
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.timeout(), Duration::from_secs(1));
        Ok(())
    }

    #[test]
    fn new_rejects_bad_urls() {
        for url in ["", "localhost:8000", "ftp://files.test", "http://x.test/?a=1"] {
            let error = Client::new(url, Duration::from_secs(1)).expect_err(url);
            assert!(
                matches!(error, ApiError::InvalidUrl { .. }),
                "{url}: {error:?}"
            );
        }
    }
}
