//! 单份答题卷处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责处理一份评阅任务，是答题卷级别的编排器。
//!
//! ## 核心功能
//!
//! 1. **构建上下文**：由任务生成 `EvaluationCtx`
//! 2. **流程调度**：委托 `EvaluationFlow` 完成评阅与保存
//! 3. **兜底暂存**：保存失败时把记录写入暂存目录，下次启动时补存
//! 4. **文件清理**：记录保存（或暂存）后删除任务文件

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::error::{AppError, PersistenceError};
use crate::models::{EvaluationJob, SubmissionRecord};
use crate::services::PendingWriter;
use crate::workflow::{EvaluationCtx, EvaluationFlow};

/// 单份答题卷的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum SheetOutcome {
    /// 评阅完成并已保存
    Saved,
    /// 评阅完成，但记录暂存在待补存目录中
    Pending,
    /// 评阅未完成（题库、页面等错误）
    Failed,
    /// 评阅完成，但保存和暂存都失败；记录只存在于此处和错误日志中
    Unsaved(Box<SubmissionRecord>),
}

/// 处理单份答题卷
///
/// # 参数
/// - `flow`: 评阅流程
/// - `pending`: 暂存服务
/// - `job`: 评阅任务
/// - `sheet_index`: 答题卷序号（仅用于日志）
pub async fn process_sheet(
    flow: &EvaluationFlow,
    pending: &PendingWriter,
    job: EvaluationJob,
    sheet_index: usize,
) -> Result<SheetOutcome> {
    let ctx = EvaluationCtx::from_job(&job);
    let sheet_path = resolve_sheet_path(&job);

    info!(
        "[答题卷 {}] {} 开始评阅: {} ({})",
        sheet_index,
        ctx,
        ctx.student_name,
        sheet_path.display()
    );

    let outcome = match flow.run(&ctx, &sheet_path).await {
        Ok(_) => SheetOutcome::Saved,
        Err(AppError::Persistence(err @ PersistenceError::Unsaved { .. })) => {
            let Some(record) = err.into_unsaved_record() else {
                return Ok(SheetOutcome::Failed);
            };
            match pending.write(&record).await {
                Ok(path) => {
                    warn!("{} ⚠️ 记录已暂存至 {}，将在下次启动时补存", ctx, path.display());
                    SheetOutcome::Pending
                }
                Err(e) => {
                    // 任务文件保留，记录内容写入日志以便人工补录
                    error!(
                        "[答题卷 {}] {} ❌ 记录保存和暂存均失败: {:#}\n记录内容: {}",
                        sheet_index,
                        ctx,
                        e,
                        serde_json::to_string(&record).unwrap_or_default()
                    );
                    return Ok(SheetOutcome::Unsaved(Box::new(record)));
                }
            }
        }
        Err(e) => {
            error!("[答题卷 {}] {} ❌ 评阅失败: {}", sheet_index, ctx, e);
            return Ok(SheetOutcome::Failed);
        }
    };

    cleanup_file(job.file_path.as_deref(), &ctx)?;
    Ok(outcome)
}

/// 任务文件中的相对路径以任务文件所在目录为基准
fn resolve_sheet_path(job: &EvaluationJob) -> PathBuf {
    let raw = PathBuf::from(job.answer_sheet.trim());
    if raw.is_absolute() {
        return raw;
    }

    let beside_manifest = job
        .file_path
        .as_deref()
        .and_then(|p| Path::new(p).parent())
        .map(|dir| dir.join(&raw));

    match beside_manifest {
        Some(candidate) if candidate.exists() => candidate,
        _ => raw,
    }
}

/// 清理已处理的任务文件
fn cleanup_file(file_path: Option<&str>, ctx: &EvaluationCtx) -> Result<()> {
    let Some(file_path) = file_path else {
        warn!("{} ⚠️ 任务文件路径未设置", ctx);
        return Ok(());
    };

    if Path::new(file_path).exists() {
        fs::remove_file(file_path).with_context(|| format!("无法删除文件: {}", file_path))?;
        info!(
            "{} 🗑️ 任务文件已删除: {}",
            ctx,
            Path::new(file_path)
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
        );
    } else {
        warn!("{} ⚠️ 任务文件不存在: {}", ctx, file_path);
    }

    Ok(())
}
