// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use belle_api::Client;
use belle_app::ReportFile;
use belle_store::Store;
use belle_tui::{InternalEvent, RemoteOutcome, RemoteRequest};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;
use time::{Date, OffsetDateTime, UtcOffset};

/// Runs UI requests against the salon API and keeps the session token in
/// the local store.
pub struct ApiRuntime<'a> {
    store: &'a Store,
    client: Client,
    export_dir: PathBuf,
    local_offset: UtcOffset,
}

impl<'a> ApiRuntime<'a> {
    pub fn new(
        store: &'a Store,
        client: Client,
        export_dir: PathBuf,
        local_offset: UtcOffset,
    ) -> Self {
        Self {
            store,
            client,
            export_dir,
            local_offset,
        }
    }
}

impl belle_tui::AppRuntime for ApiRuntime<'_> {
    fn cached_token(&mut self) -> Result<Option<String>> {
        self.store.session_token()
    }

    fn persist_token(&mut self, token: &str) -> Result<()> {
        self.store.put_session_token(token)
    }

    fn clear_token(&mut self) -> Result<()> {
        let removed = self.store.clear_session_token()?;
        tracing::debug!(removed, "cleared cached session");
        Ok(())
    }

    fn execute(&mut self, request: RemoteRequest) -> RemoteOutcome {
        perform(&self.client, &self.export_dir, self.local_offset, request)
    }

    fn spawn_request(
        &mut self,
        request_id: u64,
        request: RemoteRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let client = self.client.clone();
        let export_dir = self.export_dir.clone();
        let local_offset = self.local_offset;
        let label = request.label();
        thread::Builder::new()
            .name(format!("belle-{label}"))
            .spawn(move || {
                let outcome = perform(&client, &export_dir, local_offset, request);
                // The UI may have quit; nothing is waiting in that case.
                let _ = tx.send(InternalEvent::Remote {
                    request_id,
                    outcome,
                });
            })
            .map(|_| ())
            .map_err(|error| anyhow!("spawn {label} worker: {error}"))
    }
}

fn perform(
    client: &Client,
    export_dir: &Path,
    local_offset: UtcOffset,
    request: RemoteRequest,
) -> RemoteOutcome {
    match request {
        RemoteRequest::Profile { token } => {
            RemoteOutcome::Profile(client.profile(&token).map_err(|error| error.to_string()))
        }
        RemoteRequest::Login { username, password } => RemoteOutcome::LoggedIn(
            client
                .login(&username, &password)
                .map(|grant| grant.access_token)
                .map_err(|error| error.to_string()),
        ),
        RemoteRequest::Register(account) => {
            RemoteOutcome::Registered(client.register(&account).map_err(|error| error.to_string()))
        }
        RemoteRequest::Appointments { token } => RemoteOutcome::Appointments(
            client
                .list_appointments(&token)
                .map_err(|error| error.to_string()),
        ),
        RemoteRequest::Dashboard { token } => {
            RemoteOutcome::Dashboard(client.dashboard(&token).map_err(|error| error.to_string()))
        }
        RemoteRequest::Export { token, query } => {
            let today = OffsetDateTime::now_utc().to_offset(local_offset).date();
            let saved = client
                .export_csv(&token, &query)
                .map_err(anyhow::Error::from)
                .and_then(|report| save_report(export_dir, &report, today));
            RemoteOutcome::Exported(saved.map_err(|error| format!("{error:#}")))
        }
    }
}

/// Writes a downloaded report into `dir`. Only the final component of the
/// chosen name is used, so the file always lands inside `dir`.
pub fn save_report(dir: &Path, report: &ReportFile, today: Date) -> Result<PathBuf> {
    let name = report.file_name(today);
    let file_name = Path::new(&name)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("{}_{today}.csv", report.kind.as_str())));

    fs::create_dir_all(dir)
        .with_context(|| format!("create export directory {}", dir.display()))?;
    let path = dir.join(file_name);
    fs::write(&path, &report.bytes)
        .with_context(|| format!("write report {}", path.display()))?;
    tracing::info!(
        kind = report.kind.as_str(),
        path = %path.display(),
        size = report.bytes.len(),
        "report written"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::{ApiRuntime, save_report};
    use anyhow::Result;
    use belle_api::Client;
    use belle_app::{ExportQuery, ReportFile, ReportKind};
    use belle_store::Store;
    use belle_testkit::{MockApi, MockResponse, appointment_json, numbered_appointments};
    use belle_tui::{AppRuntime, InternalEvent, RemoteOutcome, RemoteRequest};
    use serde_json::json;
    use std::sync::mpsc;
    use std::time::Duration;
    use time::UtcOffset;
    use time::macros::date;

    fn runtime_for<'a>(
        store: &'a Store,
        api: &MockApi,
        export_dir: &std::path::Path,
    ) -> Result<ApiRuntime<'a>> {
        let client = Client::new(api.base_url(), Duration::from_secs(2))?;
        Ok(ApiRuntime::new(
            store,
            client,
            export_dir.to_path_buf(),
            UtcOffset::UTC,
        ))
    }

    #[test]
    fn token_cache_round_trips_through_store() -> Result<()> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        let api = MockApi::serve(Vec::new())?;
        let temp = tempfile::tempdir()?;
        let mut runtime = runtime_for(&store, &api, temp.path())?;

        assert_eq!(runtime.cached_token()?, None);
        runtime.persist_token("tok-1")?;
        assert_eq!(runtime.cached_token()?, Some("tok-1".to_owned()));
        runtime.clear_token()?;
        assert_eq!(runtime.cached_token()?, None);
        api.finish()?;
        Ok(())
    }

    #[test]
    fn login_rejection_carries_server_detail() -> Result<()> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        let api = MockApi::serve(vec![MockResponse::detail(
            401,
            "Incorrect username or password",
        )])?;
        let temp = tempfile::tempdir()?;
        let mut runtime = runtime_for(&store, &api, temp.path())?;

        let outcome = runtime.execute(RemoteRequest::Login {
            username: "ana".to_owned(),
            password: "wrong".to_owned(),
        });
        assert_eq!(
            outcome,
            RemoteOutcome::LoggedIn(Err("Incorrect username or password".to_owned()))
        );
        api.finish()?;
        Ok(())
    }

    #[test]
    fn spawned_request_reports_back_on_channel() -> Result<()> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        let items = numbered_appointments(2);
        let body: Vec<_> = items.iter().map(appointment_json).collect();
        let api = MockApi::serve(vec![MockResponse::json(200, &json!(body))])?;
        let temp = tempfile::tempdir()?;
        let mut runtime = runtime_for(&store, &api, temp.path())?;

        let (tx, rx) = mpsc::channel();
        runtime.spawn_request(
            7,
            RemoteRequest::Appointments {
                token: "tok".to_owned(),
            },
            tx,
        )?;
        let event = rx.recv_timeout(Duration::from_secs(5))?;
        assert_eq!(
            event,
            InternalEvent::Remote {
                request_id: 7,
                outcome: RemoteOutcome::Appointments(Ok(items)),
            }
        );
        api.finish()?;
        Ok(())
    }

    #[test]
    fn export_saves_inside_export_dir() -> Result<()> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        let api = MockApi::serve(vec![
            MockResponse::csv("id,nome\n1,Ana\n")
                .with_header("Content-Disposition", "attachment; filename=\"../x.csv\""),
        ])?;
        let temp = tempfile::tempdir()?;
        let export_dir = temp.path().join("reports");
        let mut runtime = runtime_for(&store, &api, &export_dir)?;

        let outcome = runtime.execute(RemoteRequest::Export {
            token: "tok".to_owned(),
            query: ExportQuery::new(ReportKind::Clients),
        });
        let expected = export_dir.join("x.csv");
        assert_eq!(outcome, RemoteOutcome::Exported(Ok(expected.clone())));
        assert_eq!(std::fs::read_to_string(&expected)?, "id,nome\n1,Ana\n");
        api.finish()?;
        Ok(())
    }

    #[test]
    fn export_failure_is_reported_as_text() -> Result<()> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        let api = MockApi::serve(vec![MockResponse::detail(403, "Not enough permissions")])?;
        let temp = tempfile::tempdir()?;
        let mut runtime = runtime_for(&store, &api, temp.path())?;

        let outcome = runtime.execute(RemoteRequest::Export {
            token: "tok".to_owned(),
            query: ExportQuery::new(ReportKind::Services),
        });
        assert_eq!(
            outcome,
            RemoteOutcome::Exported(Err("Not enough permissions".to_owned()))
        );
        api.finish()?;
        Ok(())
    }

    #[test]
    fn report_without_suggestion_uses_kind_and_date() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let report = ReportFile {
            kind: ReportKind::Appointments,
            suggested_name: None,
            bytes: b"id\n".to_vec(),
        };
        let path = save_report(temp.path(), &report, date!(2026 - 03 - 02))?;
        assert_eq!(path, temp.path().join("agendamentos_2026-03-02.csv"));
        assert_eq!(std::fs::read(&path)?, b"id\n");
        Ok(())
    }

    #[test]
    fn report_names_cannot_escape_export_dir() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let report = ReportFile {
            kind: ReportKind::Clients,
            suggested_name: Some("../../etc/passwd".to_owned()),
            bytes: Vec::new(),
        };
        let path = save_report(temp.path(), &report, date!(2026 - 03 - 02))?;
        assert_eq!(path, temp.path().join("passwd"));
        Ok(())
    }
}
