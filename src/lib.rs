//! # Answer Sheet Grader
//!
//! 手写答题卷自动评阅：把扫描的答题卷与题库对照，逐题评分并保存评阅记录
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有外部连接，只暴露能力
//! - `LlmClient` - OpenAI 兼容接口客户端，提供 send() 能力
//! - `CallThrottle` - 外部调用限流（并发上限 + 调用后等待）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `PageRenderer` / `TextRecognizer` / `TextExtractor` - 页面渲染与全文识别
//! - `Segmenter` - 锚点切分
//! - `ScoringOracle` / `ScoringEngine` - 评分与分数归一化
//! - `QuestionSource` / `SubmissionSink` / `PendingWriter` - 题库、存储与暂存
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一份答题卷"的完整评阅流程
//! - `EvaluationCtx` - 上下文封装（test_id + student）
//! - `EvaluationFlow` - 流程编排（取题 → 渲染 → 识别 → 切分 → 评分 → 汇总 → 保存）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量处理器，管理并发和补存
//! - `orchestrator/sheet_processor` - 单份答题卷处理器，负责暂存和清理
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{
    AnswerSheet, AnswerSpan, DocumentText, Question, QuestionNumber, QuestionResult, ResultStatus,
    SubmissionRecord,
};
pub use orchestrator::App;
pub use workflow::{EvaluationCtx, EvaluationFlow};
