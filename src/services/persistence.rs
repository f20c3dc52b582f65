//! 评阅记录持久化服务 - 业务能力层
//!
//! 只负责"保存 / 读取评阅记录"，不关心记录如何生成。
//! 记录以 JSON Lines 形式追加写入，一行一条，写入后不再修改。

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::PersistenceError;
use crate::models::{StudentSummary, SubmissionRecord};

/// 评阅记录的保存能力
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn store(&self, record: &SubmissionRecord) -> Result<(), PersistenceError>;
}

/// JSON Lines 文件存储
pub struct JsonlSubmissionStore {
    path: PathBuf,
    // 同一进程内的并发写入按行串行
    write_lock: Mutex<()>,
}

impl JsonlSubmissionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取全部记录。文件不存在时返回空列表，无法解析的行会被跳过
    pub async fn load_all(&self) -> Result<Vec<SubmissionRecord>, PersistenceError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(PersistenceError::ReadFailed {
                    path: self.path.display().to_string(),
                    source,
                })
            }
        };

        let mut records = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SubmissionRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    "跳过无法解析的评阅记录 ({}:{}): {}",
                    self.path.display(),
                    line_no + 1,
                    e
                ),
            }
        }

        Ok(records)
    }

    /// 某学生在某试卷上的最近一次评阅
    pub async fn find(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> Result<Option<SubmissionRecord>, PersistenceError> {
        let records = self.load_all().await?;
        Ok(records
            .into_iter()
            .filter(|r| r.test_id == test_id && r.student_id == student_id)
            .max_by_key(|r| r.timestamp))
    }

    /// 某学生的全部评阅，按时间从新到旧
    pub async fn list_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<SubmissionRecord>, PersistenceError> {
        let mut records: Vec<SubmissionRecord> = self
            .load_all()
            .await?
            .into_iter()
            .filter(|r| r.student_id == student_id)
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    pub async fn summary(&self, student_id: &str) -> Result<StudentSummary, PersistenceError> {
        let records = self.list_for_student(student_id).await?;
        Ok(StudentSummary::from_records(student_id, &records))
    }
}

#[async_trait]
impl SubmissionSink for JsonlSubmissionStore {
    async fn store(&self, record: &SubmissionRecord) -> Result<(), PersistenceError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let write_failed = |source| PersistenceError::WriteFailed {
            path: self.path.display().to_string(),
            source,
        };

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(write_failed)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(write_failed)?;
        file.write_all(line.as_bytes()).await.map_err(write_failed)?;
        file.flush().await.map_err(write_failed)?;

        debug!(
            "评阅记录已保存: 试卷 {} | 学号 {} -> {}",
            record.test_id,
            record.student_id,
            self.path.display()
        );
        Ok(())
    }
}
