//! 批量答题卷处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量评阅和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：写日志文件头、按配置组装评阅流程
//! 2. **补存记录**：把上次运行中保存失败的记录重新写入存储
//! 3. **批量加载**：扫描并加载所有评阅任务（`Vec<EvaluationJob>`）
//! 4. **并发控制**：使用 Semaphore 限制同时评阅的答题卷数量
//! 5. **分批处理**：每批完成后再开始下一批
//! 6. **全局统计**：汇总所有答题卷的处理结果

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::EvaluationJob;
use crate::orchestrator::sheet_processor::{self, SheetOutcome};
use crate::services::{PendingWriter, SubmissionSink};
use crate::utils::logging::{
    init_log_file, log_batch_complete, log_batch_start, log_jobs_loaded, log_startup,
    print_final_stats,
};
use crate::workflow::EvaluationFlow;

/// 应用主结构
pub struct App {
    config: Config,
    flow: Arc<EvaluationFlow>,
    pending: Arc<PendingWriter>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;
        init_log_file(&config.output_log_file)?;
        log_startup(config.max_concurrent_sheets, config.max_concurrent_calls);

        let flow = EvaluationFlow::from_config(&config);
        Ok(Self::with_flow(config, flow))
    }

    /// 使用外部组装的评阅流程
    pub fn with_flow(config: Config, flow: EvaluationFlow) -> Self {
        let pending = PendingWriter::new(&config.pending_folder);
        Self {
            config,
            flow: Arc::new(flow),
            pending: Arc::new(pending),
        }
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let replayed = replay_pending(self.flow.sink(), &self.pending).await?;

        let jobs = self.load_jobs().await?;
        if jobs.is_empty() {
            warn!("⚠️ 没有找到待评阅的任务文件，程序结束");
            print_final_stats(0, 0, replayed, 0, &self.config.output_log_file);
            return Ok(());
        }

        let total = jobs.len();
        log_jobs_loaded(total, self.batch_size());

        let stats = self.process_all_sheets(jobs).await?;

        print_final_stats(
            stats.saved + stats.pending,
            stats.failed,
            replayed,
            stats.total,
            &self.config.output_log_file,
        );
        if stats.pending > 0 {
            warn!("⚠️ {} 份记录暂存在 {}", stats.pending, self.config.pending_folder);
        }

        Ok(())
    }

    async fn load_jobs(&self) -> Result<Vec<EvaluationJob>> {
        info!("\n📁 正在扫描待评阅的任务...");
        crate::models::load_all_jobs(&self.config.jobs_folder).await
    }

    fn batch_size(&self) -> usize {
        self.config.max_concurrent_sheets.max(1)
    }

    /// 分批处理所有答题卷
    async fn process_all_sheets(&self, jobs: Vec<EvaluationJob>) -> Result<ProcessingStats> {
        let batch_size = self.batch_size();
        let semaphore = Arc::new(Semaphore::new(batch_size));
        let total = jobs.len();
        let total_batches = total.div_ceil(batch_size);
        let mut stats = ProcessingStats {
            total,
            ..Default::default()
        };

        for (batch_idx, batch) in jobs.chunks(batch_size).enumerate() {
            let batch_start = batch_idx * batch_size;
            let batch_end = batch_start + batch.len();
            log_batch_start(batch_idx + 1, total_batches, batch_start + 1, batch_end, total);

            let result = self.process_batch(batch, batch_start, semaphore.clone()).await?;

            log_batch_complete(batch_idx + 1, result.saved + result.pending, batch.len());
            stats.saved += result.saved;
            stats.pending += result.pending;
            stats.failed += result.failed;
        }

        Ok(stats)
    }

    /// 处理单个批次
    async fn process_batch(
        &self,
        batch: &[EvaluationJob],
        batch_start: usize,
        semaphore: Arc<Semaphore>,
    ) -> Result<ProcessingStats> {
        let mut handles = Vec::new();

        for (idx, job) in batch.iter().enumerate() {
            let sheet_index = batch_start + idx + 1;
            let permit = semaphore.clone().acquire_owned().await?;
            let flow = self.flow.clone();
            let pending = self.pending.clone();
            let job = job.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                sheet_processor::process_sheet(&flow, &pending, job, sheet_index).await
            });
            handles.push((sheet_index, handle));
        }

        let mut result = ProcessingStats {
            total: batch.len(),
            ..Default::default()
        };
        for (sheet_index, handle) in handles {
            match handle.await {
                Ok(Ok(SheetOutcome::Saved)) => result.saved += 1,
                Ok(Ok(SheetOutcome::Pending)) => result.pending += 1,
                Ok(Ok(SheetOutcome::Failed | SheetOutcome::Unsaved(_))) => result.failed += 1,
                Ok(Err(e)) => {
                    error!("[答题卷 {}] ❌ 处理过程中发生错误: {:#}", sheet_index, e);
                    result.failed += 1;
                }
                Err(e) => {
                    error!("[答题卷 {}] 任务执行失败: {}", sheet_index, e);
                    result.failed += 1;
                }
            }
        }

        Ok(result)
    }
}

/// 把暂存目录中的记录补存到存储中，返回补存成功的数量
///
/// 补存只写入已生成的记录，不重新识别或评分
pub async fn replay_pending(sink: &dyn SubmissionSink, pending: &PendingWriter) -> Result<usize> {
    let records = pending.list().await?;
    if records.is_empty() {
        return Ok(0);
    }

    info!("♻️ 发现 {} 条暂存记录，开始补存...", records.len());
    let mut replayed = 0;
    for (path, record) in records {
        match sink.store(&record).await {
            Ok(()) => {
                // 暂存文件残留时下次启动会再补存一次
                if let Err(e) = pending.remove(&path).await {
                    warn!("⚠️ 补存成功但暂存文件删除失败 {}: {:#}", path.display(), e);
                }
                info!(
                    "✓ 已补存: 试卷 {} | 学号 {} | {}/{}",
                    record.test_id, record.student_id, record.total_marks, record.max_marks
                );
                replayed += 1;
            }
            Err(e) => warn!("⚠️ 补存失败，保留暂存文件 {}: {}", path.display(), e),
        }
    }

    Ok(replayed)
}

/// 处理统计
#[derive(Debug, Default)]
struct ProcessingStats {
    saved: usize,
    pending: usize,
    failed: usize,
    total: usize,
}
