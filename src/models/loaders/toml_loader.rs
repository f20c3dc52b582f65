use crate::error::QuestionBankError;
use crate::models::job::EvaluationJob;
use crate::models::question::TestPaper;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载试卷
pub async fn load_test_paper(toml_file_path: &Path) -> Result<TestPaper, QuestionBankError> {
    let path = toml_file_path.display().to_string();
    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|source| QuestionBankError::ReadFailed {
            path: path.clone(),
            source,
        })?;

    toml::from_str(&content).map_err(|source| QuestionBankError::TomlParseFailed { path, source })
}

/// 从 TOML 文件加载评阅任务
pub async fn load_job(toml_file_path: &Path) -> Result<EvaluationJob> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取任务文件: {}", toml_file_path.display()))?;

    let mut job: EvaluationJob = toml::from_str(&content)
        .with_context(|| format!("无法解析任务文件: {}", toml_file_path.display()))?;

    job.file_path = Some(toml_file_path.to_string_lossy().to_string());
    job.validate()?;

    Ok(job)
}

/// 从文件夹中加载所有评阅任务，单个文件加载失败只记录警告
pub async fn load_all_jobs(folder_path: &str) -> Result<Vec<EvaluationJob>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut paths = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut jobs = Vec::new();
    for path in paths {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_job(&path).await {
            Ok(job) => jobs.push(job),
            Err(e) => tracing::warn!("加载文件失败 {}: {:#}", path.display(), e),
        }
    }

    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_all_jobs_skips_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.toml"),
            "test_id = \"t1\"\nstudent_name = \"Asha\"\nstudent_id = \"S1\"\nanswer_sheet = \"a.png\"\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("b.toml"), "test_id = \"t1\"\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let jobs = load_all_jobs(dir.path().to_str().unwrap()).await.unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].student_id, "S1");
        assert!(jobs[0].file_path.as_deref().unwrap().ends_with("a.toml"));
    }

    #[tokio::test]
    async fn test_load_all_jobs_missing_folder_is_error() {
        let result = load_all_jobs("/definitely/not/here").await;
        assert!(result.is_err());
    }
}
