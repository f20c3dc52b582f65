//! 答题卷评阅流程 - 流程层
//!
//! 核心职责：定义"一份答题卷"的完整评阅流程
//!
//! 流程顺序：
//! 1. 取题（题库中没有题目时直接失败，不发起任何外部调用）
//! 2. 渲染页面
//! 3. 逐页识别并拼接全文（单页失败只留占位行）
//! 4. 锚点切分
//! 5. 逐题评分（单题失败只影响该题）
//! 6. 汇总并保存

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::infrastructure::{CallThrottle, LlmClient};
use crate::models::SubmissionRecord;
use crate::services::{
    AnswerSheetRenderer, JsonlSubmissionStore, LlmRecognizer, LlmScoringOracle, PageRenderer,
    QuestionSource, ScoringEngine, Segmenter, SubmissionSink, TextExtractor, TomlQuestionBank,
};
use crate::utils::logging::log_breakdown;
use crate::workflow::aggregation::{aggregate, persist};
use crate::workflow::evaluation_ctx::EvaluationCtx;

/// 答题卷评阅流程
///
/// - 编排单份答题卷的完整评阅过程
/// - 各环节能力以 trait 对象注入，便于替换和测试
/// - 不关心批量与并发调度
pub struct EvaluationFlow {
    question_source: Arc<dyn QuestionSource>,
    renderer: Arc<dyn PageRenderer>,
    extractor: TextExtractor,
    segmenter: Arc<dyn Segmenter>,
    scorer: ScoringEngine,
    sink: Arc<dyn SubmissionSink>,
    verbose_logging: bool,
}

impl EvaluationFlow {
    pub fn new(
        question_source: Arc<dyn QuestionSource>,
        renderer: Arc<dyn PageRenderer>,
        extractor: TextExtractor,
        segmenter: Arc<dyn Segmenter>,
        scorer: ScoringEngine,
        sink: Arc<dyn SubmissionSink>,
    ) -> Self {
        Self {
            question_source,
            renderer,
            extractor,
            segmenter,
            scorer,
            sink,
            verbose_logging: false,
        }
    }

    /// 按配置组装默认能力：TOML 题库、图片渲染、视觉 LLM 识别、文本 LLM 评分、JSON Lines 存储
    pub fn from_config(config: &Config) -> Self {
        // 识别与评分共用一个限流器，两个阶段的调用合计受限
        let throttle = CallThrottle::new(config.max_concurrent_calls, config.call_delay());

        let recognizer = LlmRecognizer::new(LlmClient::new(
            &config.recognition_api_key,
            &config.recognition_api_base_url,
            config.recognition_model_name.clone(),
        ));
        let oracle = LlmScoringOracle::new(LlmClient::new(
            &config.scoring_api_key,
            &config.scoring_api_base_url,
            config.scoring_model_name.clone(),
        ));

        let extractor = TextExtractor::new(
            Arc::new(recognizer),
            throttle.clone(),
            config.max_concurrent_calls,
            config.call_timeout(),
        );
        let scorer = ScoringEngine::new(
            Arc::new(oracle),
            config.grading_policy(),
            throttle,
            config.max_concurrent_calls,
            config.call_timeout(),
        );

        Self::new(
            Arc::new(TomlQuestionBank::new(&config.question_bank_folder)),
            Arc::new(AnswerSheetRenderer::new(config.pdf_renderer())),
            extractor,
            Arc::new(config.segmenter()),
            scorer,
            Arc::new(JsonlSubmissionStore::new(&config.submissions_file)),
        )
        .with_verbose_logging(config.verbose_logging)
    }

    pub fn with_verbose_logging(mut self, verbose: bool) -> Self {
        self.verbose_logging = verbose;
        self
    }

    pub fn sink(&self) -> &dyn SubmissionSink {
        self.sink.as_ref()
    }

    /// 评阅一份答题卷，返回尚未保存的评阅记录
    ///
    /// 只有取题和渲染阶段的错误会中止流程；识别和评分的失败在结果中降级体现
    pub async fn evaluate(&self, ctx: &EvaluationCtx, sheet: &Path) -> Result<SubmissionRecord, AppError> {
        // ========== 1. 取题 ==========
        let questions = self.question_source.questions(&ctx.test_id).await?;
        info!("{} 📋 共 {} 道题", ctx, questions.len());

        // ========== 2. 渲染 ==========
        let pages = self.renderer.render(sheet).await?;
        info!("{} 📄 答题卷共 {} 页", ctx, pages.len());

        // ========== 3. 识别 ==========
        let document = self.extractor.extract_document(&pages).await;
        if document.failed_pages().len() == pages.len() {
            warn!("{} ⚠️ 所有页面识别失败，所有题目将按未作答处理", ctx);
        }
        if self.verbose_logging {
            info!("{} 识别全文:\n{}", ctx, document);
        }

        // ========== 4. 切分 ==========
        let answers = self.segmenter.segment(&document, &questions);
        info!(
            "{} ✂️ 定位到 {}/{} 道题的作答",
            ctx,
            answers.found_count(),
            answers.len()
        );

        // ========== 5. 评分 ==========
        let results = self.scorer.score_all(&questions, &answers).await;

        // ========== 6. 汇总 ==========
        let record = aggregate(ctx, results, self.scorer.policy());
        log_breakdown(&ctx.to_string(), &record, self.scorer.policy().per_question_max());

        Ok(record)
    }

    /// 评阅并保存
    ///
    /// 保存失败时返回 `AppError::Persistence(PersistenceError::Unsaved { .. })`，记录在错误中
    pub async fn run(&self, ctx: &EvaluationCtx, sheet: &Path) -> Result<SubmissionRecord, AppError> {
        let record = self.evaluate(ctx, sheet).await?;
        let record = persist(self.sink.as_ref(), record).await?;
        info!(
            "{} 💾 评阅记录已保存: {}/{}",
            ctx, record.total_marks, record.max_marks
        );
        Ok(record)
    }
}
