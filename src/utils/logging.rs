//! 日志工具模块
//!
//! 提供日志初始化、格式化和输出的辅助函数

use anyhow::Result;
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::{ResultStatus, SubmissionRecord};

/// 初始化 tracing 订阅器
///
/// 日志级别由 `RUST_LOG` 控制，未设置时为 `info`；重复调用无副作用
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n答题卷评阅日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(max_concurrent_sheets: usize, max_concurrent_calls: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 答题卷批量评阅模式");
    info!("📊 答题卷并发数: {}", max_concurrent_sheets);
    info!("📊 单卷外部调用并发数: {}", max_concurrent_calls);
    info!("{}", "=".repeat(60));
}

/// 记录任务加载信息
pub fn log_jobs_loaded(total: usize, max_concurrent: usize) {
    info!("✓ 找到 {} 份待评阅的答题卷", total);
    info!("📋 将以每批 {} 份的方式处理", max_concurrent);
    info!("💡 每批完成后再开始下一批\n");
}

/// 记录批次开始信息
pub fn log_batch_start(batch_num: usize, total_batches: usize, start: usize, end: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批答题卷: {}-{} / 共 {} 份", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, success: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: 成功 {}/{}", batch_num, success, total);
    info!("{}", "─".repeat(60));
}

/// 逐题输出评阅结果
pub fn log_breakdown(prefix: &str, record: &SubmissionRecord, per_question_max: u32) {
    info!("{} {}", prefix, "─".repeat(40));
    for result in &record.results {
        info!(
            "{} 题目 {}: {} | 得分 {}/{} | {}",
            prefix,
            result.question_number,
            truncate_text(&result.question_text, 30),
            result.score,
            per_question_max,
            result.status
        );
        info!("{}     {}", prefix, truncate_text(&result.evaluation_text.replace('\n', " "), 120));
    }
    info!(
        "{} 总分 {}/{} ({:.1}%) | 空白 {} 题 | 评分失败 {} 题",
        prefix,
        record.total_marks,
        record.max_marks,
        record.percentage(),
        record.count_status(ResultStatus::Blank),
        record.count_status(ResultStatus::OracleError)
    );
}

/// 打印最终统计信息
pub fn print_final_stats(success: usize, failed: usize, replayed: usize, total: usize, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部评阅完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    if replayed > 0 {
        info!("♻️ 补存暂存记录: {}", replayed);
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
