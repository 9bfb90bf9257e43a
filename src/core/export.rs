//! Question report export
//!
//! Reports are CSV files with a UTF-8 BOM so spreadsheet apps pick the right
//! encoding. One file per requesting admin; concurrent exports for the same
//! admin are serialized, different admins run in parallel.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::core::error::AppResult;
use crate::dispatch::ports::{Question, ReportArtifact, ReportGenerator};

const BOM: &str = "\u{FEFF}";
const HEADER: [&str; 3] = ["ID вопроса", "ID пользователя", "Вопрос"];

/// Writes reports into `dir` and returns the file as written
pub struct CsvReportGenerator {
    dir: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl CsvReportGenerator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, owner: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(owner.to_string()).or_default().value())
    }
}

#[async_trait]
impl ReportGenerator for CsvReportGenerator {
    async fn generate_report(&self, rows: &[Question], owner_label: &str) -> AppResult<ReportArtifact> {
        let owner = sanitize_owner(owner_label);
        let file_name = format!("questions_{}.csv", owner);
        let bytes = render_csv(rows).into_bytes();

        let lock = self.lock_for(&owner);
        let _guard = lock.lock().await;

        let path = self.dir.join(&file_name);
        fs_err::tokio::create_dir_all(&self.dir).await?;
        fs_err::tokio::write(&path, &bytes).await?;
        let bytes = fs_err::tokio::read(&path).await?;
        log::info!("Exported {} questions to {}", rows.len(), path.display());

        Ok(ReportArtifact { file_name, bytes })
    }
}

/// Keeps `[A-Za-z0-9_-]`, replaces everything else with `_`
fn sanitize_owner(label: &str) -> String {
    let cleaned: String = label
        .trim_start_matches('@')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

fn render_csv(rows: &[Question]) -> String {
    let mut content = String::from(BOM);
    content.push_str(&HEADER.join(","));
    content.push('\n');

    for row in rows {
        content.push_str(&format!("{},{},{}\n", row.id, row.user_id, escape(&row.text)));
    }

    content
}

fn escape(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
