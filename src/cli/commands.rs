//! CLI command implementations

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use crate::config::FolioConfig;
use crate::error::{FolioError, FolioResult};
use crate::observability::MetricsRegistry;
use crate::ordering::ChapterOrderer;
use crate::store::MemoryStore;
use crate::versions::VersionStore;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_requests, write_error, write_response};
use super::request::Request;

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::Run { config } => run_session(&config),
    }
}

/// Write a default configuration file
///
/// Refuses to overwrite an existing file.
pub fn init(config_path: &Path) -> CliResult<()> {
    if config_path.exists() {
        return Err(CliError::already_initialized(config_path));
    }

    FolioConfig::default()
        .save(config_path)
        .map_err(|e| CliError::Config(e.to_string()))
}

/// Serve stdin requests until end of input
///
/// A request that fails is reported on stdout and the loop continues; only
/// I/O failures end the session.
pub fn run_session(config_path: &Path) -> CliResult<()> {
    let config =
        FolioConfig::load(config_path).map_err(|e| CliError::Config(e.to_string()))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::BootFailed(format!("failed to start runtime: {}", e)))?;

    runtime.block_on(async {
        let session = Session::new(&config);

        for line in read_requests() {
            let value = match line {
                Ok(value) => value,
                Err(e) => {
                    write_error(e.code(), e.message())?;
                    break;
                }
            };

            let request = match serde_json::from_value::<Request>(value) {
                Ok(request) => request,
                Err(e) => {
                    let err = CliError::InvalidRequest(e.to_string());
                    write_error(err.code(), err.message())?;
                    continue;
                }
            };

            match session.handle(request).await {
                Ok(data) => write_response(data)?,
                Err(e) => write_error(e.code(), &e.to_string())?,
            }
        }

        Ok::<(), CliError>(())
    })
}

/// Components wired to one in-memory store
pub struct Session {
    versions: VersionStore<MemoryStore>,
    orderer: ChapterOrderer<MemoryStore>,
    metrics: Arc<MetricsRegistry>,
}

impl Session {
    pub fn new(config: &FolioConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let metrics = Arc::new(MetricsRegistry::new());

        Self {
            versions: VersionStore::with_config(Arc::clone(&store), config)
                .with_metrics(Arc::clone(&metrics)),
            orderer: ChapterOrderer::new(store).with_metrics(Arc::clone(&metrics)),
            metrics,
        }
    }

    /// Execute one request, returning its response data
    pub async fn handle(&self, request: Request) -> FolioResult<Value> {
        let versions = &self.versions;

        match request {
            Request::CreateChapter {
                owner_id,
                chapter_number,
                title,
            } => {
                let id = versions.create_chapter(&owner_id, chapter_number, &title).await?;
                Ok(json!({ "chapter_id": id.as_str() }))
            }
            Request::GetChapter { chapter_id } => to_data(&versions.get_chapter(&chapter_id).await?),
            Request::ListChapters { owner_id } => to_data(&versions.list_chapters(&owner_id).await?),
            Request::UpdateTitle { chapter_id, title } => {
                versions.update_title(&chapter_id, &title).await?;
                Ok(Value::Null)
            }
            Request::UpdateStatus { chapter_id, status } => {
                versions.update_status(&chapter_id, status).await?;
                Ok(Value::Null)
            }
            Request::UpdateAnalogy {
                chapter_id,
                analogy,
                stage,
            } => {
                versions.update_analogy(&chapter_id, &analogy, &stage).await?;
                Ok(Value::Null)
            }
            Request::Reorder { chapter_ids } => {
                self.orderer.reorder(&chapter_ids).await?;
                Ok(Value::Null)
            }
            Request::FetchCurrentVersion { chapter_id } => {
                to_data(&versions.fetch_current_version(&chapter_id).await?)
            }
            Request::GetVersion { version_id } => to_data(&versions.get_version(&version_id).await?),
            Request::ListVersions { chapter_id } => to_data(&versions.list_versions(&chapter_id).await?),
            Request::SaveContent {
                chapter_id,
                owner_id,
                content,
                word_count,
                as_new_version,
            } => {
                let id = versions
                    .save_content(&chapter_id, &owner_id, &content, word_count, as_new_version)
                    .await?;
                Ok(json!({ "version_id": id.as_str() }))
            }
            Request::CreateVersion {
                chapter_id,
                owner_id,
                content,
                word_count,
                version_type,
            } => {
                let id = versions
                    .create_version(&chapter_id, &owner_id, &content, word_count, version_type)
                    .await?;
                Ok(json!({ "version_id": id.as_str() }))
            }
            Request::SetCurrent {
                chapter_id,
                version_id,
            } => {
                versions.set_current(&chapter_id, &version_id).await?;
                Ok(Value::Null)
            }
            Request::Archive {
                version_id,
                archived,
            } => {
                versions.archive(&version_id, archived).await?;
                Ok(Value::Null)
            }
            Request::Delete { version_id } => {
                versions.delete(&version_id).await?;
                Ok(Value::Null)
            }
            Request::Metrics => to_data(&self.metrics.snapshot()),
        }
    }
}

fn to_data<T: Serialize>(value: &T) -> FolioResult<Value> {
    serde_json::to_value(value).map_err(|e| FolioError::Corrupt(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(value: Value) -> Request {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.json");

        init(&path).unwrap();
        assert_eq!(FolioConfig::load(&path).unwrap(), FolioConfig::default());

        let err = init(&path).unwrap_err();
        assert_eq!(err.code(), "FOLIO_CLI_ALREADY_INITIALIZED");
    }

    #[tokio::test]
    async fn test_session_end_to_end() {
        let session = Session::new(&FolioConfig::default());

        let created = session
            .handle(request(json!({
                "op": "create_chapter",
                "owner_id": "u1",
                "chapter_number": 1,
                "title": "Intro"
            })))
            .await
            .unwrap();
        let chapter_id = created["chapter_id"].as_str().unwrap().to_string();

        session
            .handle(request(json!({
                "op": "create_version",
                "chapter_id": chapter_id,
                "owner_id": "u1",
                "content": "two words",
                "word_count": 2,
                "type": "jung"
            })))
            .await
            .unwrap();

        let current = session
            .handle(request(json!({"op": "fetch_current_version", "chapter_id": chapter_id})))
            .await
            .unwrap();
        assert_eq!(current["versionNumber"], json!(2));
        assert_eq!(current["type"], json!("jung"));

        let metrics = session.handle(Request::Metrics).await.unwrap();
        assert_eq!(metrics["versions_created"], json!(2));
    }

    #[tokio::test]
    async fn test_session_reports_domain_errors() {
        let session = Session::new(&FolioConfig::default());
        let err = session
            .handle(request(json!({"op": "delete", "version_id": "missing"})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "FOLIO_NOT_FOUND");
    }
}
