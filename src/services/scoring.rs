//! 评分服务 - 业务能力层
//!
//! 对单题作答片段给出分数和评语：
//! - 空白/未找到的作答直接 0 分，不调用评分服务
//! - 其余作答交给评分服务，回复经 [`ScoreParser`] 解析后按 [`GradingPolicy`] 归一化
//! - 评分服务调用失败（含超时）时该题 0 分，状态标记为 `oracle_error`，不影响其他题

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::OracleError;
use crate::infrastructure::{CallThrottle, LlmClient};
use crate::models::question::sort_by_number;
use crate::models::{AnswerSheet, AnswerSpan, Question, QuestionResult, ResultStatus, NO_ANSWER_FOUND};
use crate::services::score_parser::{ParsedScore, ScoreParser};

/// 评分服务调用失败时评语的前缀
pub const EVALUATION_ERROR_MARKER: &str = "Error in evaluation process";

/// 评分策略
///
/// 解析出的分数先向上取整，再抬到保底分，最后不超过满分。
/// 回复中没有分数时给保底分。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradingPolicy {
    per_question_max: u32,
    floor: u32,
}

impl GradingPolicy {
    /// 保底分不会超过满分
    pub fn new(per_question_max: u32, floor: u32) -> Self {
        Self {
            per_question_max,
            floor: floor.min(per_question_max),
        }
    }

    pub fn per_question_max(&self) -> u32 {
        self.per_question_max
    }

    pub fn floor(&self) -> u32 {
        self.floor
    }

    pub fn normalize(&self, parsed: ParsedScore) -> u32 {
        match parsed {
            ParsedScore::Parsed(raw) if raw.is_finite() => {
                let ceiled = raw.max(0.0).ceil().min(u32::MAX as f64) as u32;
                ceiled.max(self.floor).min(self.per_question_max)
            }
            _ => self.floor,
        }
    }
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self::new(5, 3)
    }
}

/// 评分能力
#[async_trait]
pub trait ScoringOracle: Send + Sync {
    /// 提交评分提示词，返回自由文本回复。单次调用，不重试
    async fn evaluate(&self, prompt: &str) -> Result<String, OracleError>;
}

/// 基于文本 LLM 的评分
pub struct LlmScoringOracle {
    client: LlmClient,
}

impl LlmScoringOracle {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ScoringOracle for LlmScoringOracle {
    async fn evaluate(&self, prompt: &str) -> Result<String, OracleError> {
        self.client.send(prompt, None, None).await
    }
}

/// 构建评分提示词
pub fn build_scoring_prompt(question: &Question, answer: &str, policy: &GradingPolicy) -> String {
    format!(
        r#"As an expert educational assessor, evaluate the following student answer based on content accuracy, keyword usage, and clarity.
Be lenient and generous while giving marks to encourage student learning.
Use a minimum score of {floor} and maximum of {max}, even for minimal or partially correct answers.
If the student has made any attempt at all, the minimum score should be {floor}.
Give the same marks for the same answer content every time.

QUESTION {number}: {text}

EXPECTED KEYWORDS: {keywords}

STUDENT ANSWER: {answer}

Evaluation Criteria:
- Content Accuracy: Assess factual correctness and relevance with leniency.
- Keyword Usage: Consider even minimal keyword matches positively.
- Clarity & Completeness: Reward any attempt at structure and coherence.

STRICT RESPONSE FORMAT (NO MARKING SYSTEM DISCLOSURE):
Score: [numeric score from {floor}-{max}]
Feedback: [Short, 4-5 lines of encouraging feedback highlighting strengths first, then gentle suggestions]"#,
        floor = policy.floor(),
        max = policy.per_question_max(),
        number = question.number,
        text = question.text.trim(),
        keywords = question.keywords.join(", "),
        answer = answer.trim(),
    )
}

/// 评分引擎
pub struct ScoringEngine {
    oracle: Arc<dyn ScoringOracle>,
    parser: ScoreParser,
    policy: GradingPolicy,
    throttle: CallThrottle,
    concurrency: usize,
    timeout: Duration,
}

impl ScoringEngine {
    pub fn new(
        oracle: Arc<dyn ScoringOracle>,
        policy: GradingPolicy,
        throttle: CallThrottle,
        concurrency: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            oracle,
            parser: ScoreParser::new(),
            policy,
            throttle,
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    pub fn policy(&self) -> &GradingPolicy {
        &self.policy
    }

    /// 对全部题目评分，结果按题号顺序返回，条目数与题目数相同
    pub async fn score_all(&self, questions: &[Question], sheet: &AnswerSheet) -> Vec<QuestionResult> {
        let ordered = sort_by_number(questions);
        let spans: Vec<&AnswerSpan> = ordered
            .iter()
            .enumerate()
            .map(|(i, q)| span_for(sheet, i, q))
            .collect();

        // 先收集成 Vec，保证整体 future 满足 Send，可在 tokio::spawn 中运行
        let calls: Vec<_> = ordered
            .into_iter()
            .zip(spans)
            .map(|(question, span)| {
                let question = question.clone();
                let span = span.clone();
                async move { self.score_one(&question, &span).await }
            })
            .collect();

        stream::iter(calls).buffered(self.concurrency).collect().await
    }

    /// 对单题评分
    pub async fn score_one(&self, question: &Question, span: &AnswerSpan) -> QuestionResult {
        if span.is_blank() {
            debug!("题目 {} 无作答，跳过评分服务", question.number);
            return self.result(question, NO_ANSWER_FOUND.to_string(), 0, ResultStatus::Blank);
        }

        let prompt = build_scoring_prompt(question, span.as_str(), &self.policy);
        let call = tokio::time::timeout(self.timeout, self.oracle.evaluate(&prompt));
        let outcome = match self.throttle.run(call).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout {
                model: "scorer".to_string(),
                secs: self.timeout.as_secs(),
            }),
        };

        match outcome {
            Ok(reply) => {
                let parsed = self.parser.parse(&reply);
                if parsed == ParsedScore::Missing {
                    info!("题目 {} 的评分回复中没有分数，使用保底分 {}", question.number, self.policy.floor());
                }
                let score = self.policy.normalize(parsed);
                info!("✓ 题目 {} 得分 {}/{}", question.number, score, self.policy.per_question_max());
                self.result(question, reply, score, ResultStatus::Answered)
            }
            Err(e) => {
                error!("❌ 题目 {} 评分失败: {}", question.number, e);
                let evaluation = format!("{}: {}", EVALUATION_ERROR_MARKER, e);
                self.result(question, evaluation, 0, ResultStatus::OracleError)
            }
        }
    }

    fn result(&self, question: &Question, evaluation_text: String, score: u32, status: ResultStatus) -> QuestionResult {
        QuestionResult {
            question_number: question.number.clone(),
            question_text: question.text.clone(),
            evaluation_text,
            score,
            status,
        }
    }
}

static NOT_FOUND: AnswerSpan = AnswerSpan::NotFound;

// 切分结果与排序后的题目按位置对齐；对不上时按题号查找
fn span_for<'a>(sheet: &'a AnswerSheet, position: usize, question: &Question) -> &'a AnswerSpan {
    match sheet.iter().nth(position) {
        Some((number, span)) if *number == question.number => span,
        _ => sheet.get(&question.number).unwrap_or(&NOT_FOUND),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 返回固定回复并统计调用次数
    struct FixedOracle {
        reply: Result<String, String>,
        calls: AtomicUsize,
    }

    impl FixedOracle {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ScoringOracle for FixedOracle {
        async fn evaluate(&self, _prompt: &str) -> Result<String, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err(message) => Err(OracleError::call_failed("mock", message)),
            }
        }
    }

    struct SlowOracle;

    #[async_trait]
    impl ScoringOracle for SlowOracle {
        async fn evaluate(&self, _prompt: &str) -> Result<String, OracleError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("Score: 5".to_string())
        }
    }

    fn engine(oracle: Arc<dyn ScoringOracle>) -> ScoringEngine {
        ScoringEngine::new(
            oracle,
            GradingPolicy::default(),
            CallThrottle::unlimited(),
            1,
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_normalize_ceils_then_floors_then_caps() {
        let policy = GradingPolicy::new(5, 3);
        assert_eq!(policy.normalize(ParsedScore::Parsed(2.0)), 3);
        assert_eq!(policy.normalize(ParsedScore::Parsed(0.0)), 3);
        assert_eq!(policy.normalize(ParsedScore::Parsed(3.2)), 4);
        assert_eq!(policy.normalize(ParsedScore::Parsed(5.0)), 5);
        assert_eq!(policy.normalize(ParsedScore::Parsed(10.0)), 5);
        assert_eq!(policy.normalize(ParsedScore::Missing), 3);
    }

    #[test]
    fn test_floor_never_exceeds_max() {
        let policy = GradingPolicy::new(2, 3);
        assert_eq!(policy.floor(), 2);
        assert_eq!(policy.normalize(ParsedScore::Missing), 2);
    }

    #[test]
    fn test_prompt_contains_question_keywords_and_answer() {
        let question = Question::new(7u64, "Define inertia.").with_keywords(["mass", "motion"]);
        let prompt = build_scoring_prompt(&question, "  resistance to change  ", &GradingPolicy::default());

        assert!(prompt.contains("QUESTION 7: Define inertia."));
        assert!(prompt.contains("EXPECTED KEYWORDS: mass, motion"));
        assert!(prompt.contains("STUDENT ANSWER: resistance to change\n"));
        assert!(prompt.contains("Score:"));
        assert!(prompt.contains("Feedback:"));
    }

    #[tokio::test]
    async fn test_low_raw_score_is_lifted_to_floor() {
        let oracle = FixedOracle::replying("Score: 2\nFeedback: needs more detail");
        let engine = engine(oracle.clone());
        let question = Question::new(1u64, "Water boils at?");

        let result = engine
            .score_one(&question, &AnswerSpan::Found("Water boils at 100C.".into()))
            .await;

        assert_eq!(result.score, 3);
        assert_eq!(result.status, ResultStatus::Answered);
        assert_eq!(result.evaluation_text, "Score: 2\nFeedback: needs more detail");
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn test_blank_span_never_reaches_oracle() {
        let oracle = FixedOracle::replying("Score: 5");
        let engine = engine(oracle.clone());
        let question = Question::new(1u64, "Anything?");

        let not_found = engine.score_one(&question, &AnswerSpan::NotFound).await;
        let whitespace = engine.score_one(&question, &AnswerSpan::Found(" \n\t ".into())).await;

        for result in [not_found, whitespace] {
            assert_eq!(result.score, 0);
            assert_eq!(result.status, ResultStatus::Blank);
            assert_eq!(result.evaluation_text, NO_ANSWER_FOUND);
        }
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn test_oracle_failure_scores_zero_and_continues() {
        let oracle = FixedOracle::failing("connection reset");
        let engine = engine(oracle.clone());
        let questions = vec![Question::new(1u64, "First"), Question::new(2u64, "Second")];
        let mut sheet = AnswerSheet::new();
        sheet.push(1u64.into(), AnswerSpan::Found("an answer".into()));
        sheet.push(2u64.into(), AnswerSpan::Found("another".into()));

        let results = engine.score_all(&questions, &sheet).await;

        assert_eq!(results.len(), 2);
        assert_eq!(oracle.calls(), 2);
        for result in &results {
            assert_eq!(result.score, 0);
            assert_eq!(result.status, ResultStatus::OracleError);
            assert!(result.evaluation_text.starts_with(EVALUATION_ERROR_MARKER));
            assert!(result.evaluation_text.contains("connection reset"));
        }
    }

    #[tokio::test]
    async fn test_unparseable_reply_gets_floor() {
        let oracle = FixedOracle::replying("Well done, keep going!");
        let engine = engine(oracle);

        let result = engine
            .score_one(&Question::new(1u64, "Q"), &AnswerSpan::Found("x".into()))
            .await;

        assert_eq!(result.score, 3);
        assert_eq!(result.status, ResultStatus::Answered);
    }

    #[tokio::test]
    async fn test_score_all_follows_question_order() {
        let oracle = FixedOracle::replying("Score: 4");
        let engine = ScoringEngine::new(
            oracle,
            GradingPolicy::default(),
            CallThrottle::unlimited(),
            3,
            Duration::from_secs(5),
        );
        let questions = vec![
            Question::new("b", "label b"),
            Question::new(10u64, "ten"),
            Question::new(2u64, "two"),
        ];
        let mut sheet = AnswerSheet::new();
        sheet.push(2u64.into(), AnswerSpan::Found("two".into()));
        sheet.push(10u64.into(), AnswerSpan::NotFound);
        sheet.push("b".into(), AnswerSpan::Found("bee".into()));

        let results = engine.score_all(&questions, &sheet).await;
        let numbers: Vec<String> = results.iter().map(|r| r.question_number.to_string()).collect();
        let scores: Vec<u32> = results.iter().map(|r| r.score).collect();

        assert_eq!(numbers, vec!["2", "10", "b"]);
        assert_eq!(scores, vec![4, 0, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_oracle_error() {
        let engine = ScoringEngine::new(
            Arc::new(SlowOracle),
            GradingPolicy::default(),
            CallThrottle::unlimited(),
            1,
            Duration::from_secs(2),
        );

        let result = engine
            .score_one(&Question::new(1u64, "Slow?"), &AnswerSpan::Found("answer".into()))
            .await;

        assert_eq!(result.score, 0);
        assert_eq!(result.status, ResultStatus::OracleError);
        assert!(result.evaluation_text.starts_with(EVALUATION_ERROR_MARKER));
    }

    #[tokio::test]
    async fn test_score_all_runs_inside_spawned_task() {
        let engine = Arc::new(ScoringEngine::new(
            FixedOracle::replying("Score: 4"),
            GradingPolicy::default(),
            CallThrottle::unlimited(),
            2,
            Duration::from_secs(5),
        ));
        let questions = vec![Question::new(1u64, "One"), Question::new(2u64, "Two")];
        let mut sheet = AnswerSheet::new();
        sheet.push(1u64.into(), AnswerSpan::Found("first".into()));
        sheet.push(2u64.into(), AnswerSpan::NotFound);

        let task = tokio::spawn(async move { engine.score_all(&questions, &sheet).await });
        let results = task.await.expect("scoring task panicked");

        let scores: Vec<u32> = results.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![4, 0]);
    }
}
