use crate::error::{AppResult, ConfigError};
use crate::services::rendering::PdfRenderer;
use crate::services::scoring::GradingPolicy;
use crate::services::segmentation::AnchorSegmenter;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时评阅的答题卷数量
    pub max_concurrent_sheets: usize,
    /// 单份答题卷内同时进行的外部调用数量（1 表示严格顺序）
    pub max_concurrent_calls: usize,
    /// 每次外部调用结束后的等待时间（毫秒）
    pub call_delay_ms: u64,
    /// 单次外部调用超时（秒）
    pub call_timeout_secs: u64,
    /// 锚点长度（字符数）
    pub anchor_len: usize,
    /// 每题满分
    pub per_question_max: u32,
    /// 非空作答的保底分
    pub score_floor: u32,
    /// 题库 TOML 目录
    pub question_bank_folder: String,
    /// 待评阅任务 TOML 目录
    pub jobs_folder: String,
    /// 评阅记录文件（JSON Lines）
    pub submissions_file: String,
    /// 持久化失败时暂存记录的目录
    pub pending_folder: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// PDF 栅格化程序（poppler 的 pdftoppm）
    pub pdftoppm_path: String,
    /// PDF 栅格化分辨率
    pub pdf_render_dpi: u32,
    // --- 文字识别 LLM 配置 ---
    pub recognition_api_key: String,
    pub recognition_api_base_url: String,
    pub recognition_model_name: String,
    // --- 评分 LLM 配置 ---
    pub scoring_api_key: String,
    pub scoring_api_base_url: String,
    pub scoring_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_sheets: 4,
            max_concurrent_calls: 1,
            call_delay_ms: 500,
            call_timeout_secs: 60,
            anchor_len: 20,
            per_question_max: 5,
            score_floor: 3,
            question_bank_folder: "question_bank".to_string(),
            jobs_folder: "jobs".to_string(),
            submissions_file: "submissions.jsonl".to_string(),
            pending_folder: "pending".to_string(),
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            pdftoppm_path: "pdftoppm".to_string(),
            pdf_render_dpi: 150,
            recognition_api_key: String::new(),
            recognition_api_base_url: "https://api.mistral.ai/v1".to_string(),
            recognition_model_name: "pixtral-12b-2409".to_string(),
            scoring_api_key: String::new(),
            scoring_api_base_url: "https://api.mistral.ai/v1".to_string(),
            scoring_model_name: "mistral-large-latest".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_concurrent_sheets: env_parse("MAX_CONCURRENT_SHEETS").unwrap_or(default.max_concurrent_sheets),
            max_concurrent_calls: env_parse("MAX_CONCURRENT_CALLS").unwrap_or(default.max_concurrent_calls),
            call_delay_ms: env_parse("CALL_DELAY_MS").unwrap_or(default.call_delay_ms),
            call_timeout_secs: env_parse("CALL_TIMEOUT_SECS").unwrap_or(default.call_timeout_secs),
            anchor_len: env_parse("ANCHOR_LEN").unwrap_or(default.anchor_len),
            per_question_max: env_parse("PER_QUESTION_MAX").unwrap_or(default.per_question_max),
            score_floor: env_parse("SCORE_FLOOR").unwrap_or(default.score_floor),
            question_bank_folder: std::env::var("QUESTION_BANK_FOLDER").unwrap_or(default.question_bank_folder),
            jobs_folder: std::env::var("JOBS_FOLDER").unwrap_or(default.jobs_folder),
            submissions_file: std::env::var("SUBMISSIONS_FILE").unwrap_or(default.submissions_file),
            pending_folder: std::env::var("PENDING_FOLDER").unwrap_or(default.pending_folder),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            pdftoppm_path: std::env::var("PDFTOPPM_PATH").unwrap_or(default.pdftoppm_path),
            pdf_render_dpi: env_parse("PDF_RENDER_DPI").unwrap_or(default.pdf_render_dpi),
            recognition_api_key: std::env::var("RECOGNITION_API_KEY").unwrap_or(default.recognition_api_key),
            recognition_api_base_url: std::env::var("RECOGNITION_API_BASE_URL").unwrap_or(default.recognition_api_base_url),
            recognition_model_name: std::env::var("RECOGNITION_MODEL_NAME").unwrap_or(default.recognition_model_name),
            scoring_api_key: std::env::var("SCORING_API_KEY").unwrap_or(default.scoring_api_key),
            scoring_api_base_url: std::env::var("SCORING_API_BASE_URL").unwrap_or(default.scoring_api_base_url),
            scoring_model_name: std::env::var("SCORING_MODEL_NAME").unwrap_or(default.scoring_model_name),
        }
    }

    /// 检查必填的 API 密钥
    pub fn validate(&self) -> AppResult<()> {
        let required = [
            ("RECOGNITION_API_KEY", &self.recognition_api_key),
            ("SCORING_API_KEY", &self.scoring_api_key),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                    source_name: "环境变量".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// 评分策略（满分 / 保底分）
    pub fn grading_policy(&self) -> GradingPolicy {
        GradingPolicy::new(self.per_question_max, self.score_floor)
    }

    /// 按配置的锚点长度构建切分器
    pub fn segmenter(&self) -> AnchorSegmenter {
        AnchorSegmenter::new(self.anchor_len)
    }

    pub fn pdf_renderer(&self) -> PdfRenderer {
        PdfRenderer::new(&self.pdftoppm_path, self.pdf_render_dpi)
    }

    pub fn call_delay(&self) -> Duration {
        Duration::from_millis(self.call_delay_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_default_policy_matches_reference_grading() {
        let config = Config::default();
        let policy = config.grading_policy();

        assert_eq!(policy.per_question_max(), 5);
        assert_eq!(policy.floor(), 3);
        assert_eq!(config.anchor_len, 20);
        assert_eq!(config.max_concurrent_calls, 1);
        assert_eq!(config.call_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_validate_requires_both_api_keys() {
        let err = Config::default().validate().unwrap_err();
        assert!(matches!(
            err,
            AppError::Config(ConfigError::MissingField { ref field, .. }) if field == "RECOGNITION_API_KEY"
        ));

        let only_recognition = Config {
            recognition_api_key: "key".to_string(),
            scoring_api_key: "  ".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            only_recognition.validate(),
            Err(AppError::Config(ConfigError::MissingField { ref field, .. })) if field == "SCORING_API_KEY"
        ));

        let complete = Config {
            recognition_api_key: "key".to_string(),
            scoring_api_key: "key".to_string(),
            ..Config::default()
        };
        assert!(complete.validate().is_ok());
    }
}
