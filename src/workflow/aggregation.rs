//! 结果汇总
//!
//! 把逐题结果折叠为一条评阅记录，再交给持久化能力。
//! 保存失败时记录随错误一起返回，调用方无需重新评分即可重试。

use chrono::Local;
use tracing::error;

use crate::error::PersistenceError;
use crate::models::{QuestionResult, SubmissionRecord};
use crate::services::{GradingPolicy, SubmissionSink};
use crate::workflow::evaluation_ctx::EvaluationCtx;

/// 汇总逐题结果
///
/// `total_marks` 为各题得分之和，`max_marks` 为题数乘以每题满分
pub fn aggregate(ctx: &EvaluationCtx, results: Vec<QuestionResult>, policy: &GradingPolicy) -> SubmissionRecord {
    let total_marks = results.iter().map(|r| r.score).sum();
    let max_marks = (results.len() as u32).saturating_mul(policy.per_question_max());

    SubmissionRecord {
        test_id: ctx.test_id.clone(),
        student_name: ctx.student_name.clone(),
        student_id: ctx.student_id.clone(),
        results,
        total_marks,
        max_marks,
        timestamp: Local::now(),
    }
}

/// 保存评阅记录
///
/// 保存失败不会吞掉错误，也不会丢失记录：返回 [`PersistenceError::Unsaved`]，其中带着完整记录
pub async fn persist(
    sink: &dyn SubmissionSink,
    record: SubmissionRecord,
) -> Result<SubmissionRecord, PersistenceError> {
    match sink.store(&record).await {
        Ok(()) => Ok(record),
        Err(source) => {
            error!(
                "[试卷 {} 学生 {}] ❌ 评阅记录保存失败: {}",
                record.test_id, record.student_id, source
            );
            Err(PersistenceError::Unsaved {
                record: Box::new(record),
                source: Box::new(source),
            })
        }
    }
}
