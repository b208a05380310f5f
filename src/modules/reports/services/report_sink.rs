use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use super::renderer::RenderedReport;
use crate::core::Result;

/// Destination for rendered reports
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn publish(&self, run_id: Uuid, report: &RenderedReport) -> Result<()>;

    /// Human-readable location of a published report
    fn location(&self, run_id: Uuid, name: &str) -> String;
}

/// Writes `<root>/<run id>/<name>.txt` and `<name>.json`
pub struct FileReportSink {
    root: PathBuf,
}

impl FileReportSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run_dir(&self, run_id: Uuid) -> PathBuf {
        self.root.join(run_id.to_string())
    }
}

#[async_trait]
impl ReportSink for FileReportSink {
    async fn publish(&self, run_id: Uuid, report: &RenderedReport) -> Result<()> {
        let dir = self.run_dir(run_id);
        tokio::fs::create_dir_all(&dir).await?;

        let text_path = dir.join(format!("{}.txt", report.name));
        tokio::fs::write(&text_path, &report.text).await?;
        tokio::fs::write(dir.join(format!("{}.json", report.name)), &report.json).await?;

        debug!(path = %text_path.display(), "Report written");
        Ok(())
    }

    fn location(&self, run_id: Uuid, name: &str) -> String {
        self.run_dir(run_id)
            .join(format!("{}.txt", name))
            .display()
            .to_string()
    }
}

/// Emits reports through the tracing subscriber instead of the filesystem
#[derive(Debug, Default)]
pub struct LogReportSink;

#[async_trait]
impl ReportSink for LogReportSink {
    async fn publish(&self, run_id: Uuid, report: &RenderedReport) -> Result<()> {
        info!(run_id = %run_id, report = report.name.as_str(), "\n{}", report.text);
        debug!(
            run_id = %run_id,
            report = report.name.as_str(),
            json = report.json.as_str(),
            "Report data"
        );
        Ok(())
    }

    fn location(&self, run_id: Uuid, name: &str) -> String {
        format!("log (run {}, report {})", run_id, name)
    }
}
