//! 待保存记录暂存服务 - 业务能力层
//!
//! 只负责"把未能保存的评阅记录写到暂存目录 / 从暂存目录读回"能力，不关心流程。
//! 每条记录一个 JSON 文件，重放成功后由调用方删除。

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::models::SubmissionRecord;

/// 待保存记录暂存服务
pub struct PendingWriter {
    folder: PathBuf,
}

impl PendingWriter {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    /// 写入一条未保存的记录，返回暂存文件路径
    pub async fn write(&self, record: &SubmissionRecord) -> Result<PathBuf> {
        fs::create_dir_all(&self.folder)
            .await
            .with_context(|| format!("无法创建暂存目录: {}", self.folder.display()))?;

        let file_name = format!(
            "{}_{}_{}.json",
            sanitize(&record.test_id),
            sanitize(&record.student_id),
            record.timestamp.format("%Y%m%d%H%M%S%3f")
        );
        let path = self.folder.join(file_name);

        let content = serde_json::to_string_pretty(record)?;
        fs::write(&path, content)
            .await
            .with_context(|| format!("无法写入暂存记录: {}", path.display()))?;

        debug!(
            "记录已暂存: 试卷 {} | 学号 {} -> {}",
            record.test_id,
            record.student_id,
            path.display()
        );
        Ok(path)
    }

    /// 读取所有暂存记录，按文件名排序；无法解析的文件只记录警告
    pub async fn list(&self) -> Result<Vec<(PathBuf, SubmissionRecord)>> {
        if !fs::try_exists(&self.folder).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        let mut entries = fs::read_dir(&self.folder)
            .await
            .with_context(|| format!("无法读取暂存目录: {}", self.folder.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut records = Vec::new();
        for path in paths {
            match read_record(&path).await {
                Ok(record) => records.push((path, record)),
                Err(e) => warn!("跳过无法读取的暂存记录 {}: {:#}", path.display(), e),
            }
        }
        Ok(records)
    }

    /// 删除已重放的暂存文件
    pub async fn remove(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)
            .await
            .with_context(|| format!("无法删除暂存记录: {}", path.display()))
    }
}

async fn read_record(path: &Path) -> Result<SubmissionRecord> {
    let content = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn record(student_id: &str) -> SubmissionRecord {
        SubmissionRecord {
            test_id: "BIO/01".to_string(),
            student_name: "Mei".to_string(),
            student_id: student_id.to_string(),
            results: Vec::new(),
            total_marks: 7,
            max_marks: 10,
            timestamp: Local::now(),
        }
    }

    #[tokio::test]
    async fn test_write_list_remove() {
        let dir = tempfile::tempdir().unwrap();
        let writer = PendingWriter::new(dir.path().join("pending"));

        let path = writer.write(&record("S-7")).await.unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("BIO_01_S-7_"));

        let listed = writer.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].1.total_marks, 7);

        writer.remove(&listed[0].0).await.unwrap();
        assert!(writer.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_folder_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let writer = PendingWriter::new(dir.path().join("absent"));
        assert!(writer.list().await.unwrap().is_empty());
    }
}
