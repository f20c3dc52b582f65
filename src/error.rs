use crate::models::SubmissionRecord;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 页面渲染错误
    #[error("页面渲染错误: {0}")]
    Render(#[from] RenderError),
    /// 外部识别 / 评分服务错误
    #[error("外部服务错误: {0}")]
    Oracle(#[from] OracleError),
    /// 题库错误
    #[error("题库错误: {0}")]
    QuestionBank(#[from] QuestionBankError),
    /// 持久化错误
    #[error("持久化错误: {0}")]
    Persistence(#[from] PersistenceError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 页面渲染错误
#[derive(Debug, Error)]
pub enum RenderError {
    /// 答题卷路径不存在
    #[error("答题卷不存在: {path}")]
    NotFound { path: String },
    /// 不支持的文件格式
    #[error("不支持的答题卷格式 ({path})，需为 PDF、页面图片或图片目录")]
    UnsupportedFormat { path: String },
    /// PDF 栅格化失败
    #[error("PDF 栅格化失败 ({path}): {message}")]
    RasterizeFailed { path: String, message: String },
    /// 目录中没有任何页面图片
    #[error("目录中没有页面图片: {path}")]
    NoPages { path: String },
    /// 读取文件失败
    #[error("读取页面失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 外部服务（识别 / 评分）错误
#[derive(Debug, Error)]
pub enum OracleError {
    /// API 调用失败
    #[error("API调用失败 (模型: {model}): {message}")]
    CallFailed { model: String, message: String },
    /// 调用超时
    #[error("调用超时 (模型: {model}, {secs} 秒)")]
    Timeout { model: String, secs: u64 },
    /// 返回内容为空
    #[error("返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 请求构建失败
    #[error("请求构建失败: {0}")]
    InvalidRequest(String),
}

/// 题库错误
#[derive(Debug, Error)]
pub enum QuestionBankError {
    /// 试卷不存在
    #[error("试卷不存在: {test_id}")]
    TestNotFound { test_id: String },
    /// 试卷没有题目
    #[error("试卷 {test_id} 中没有题目")]
    NoQuestions { test_id: String },
    /// 读取失败
    #[error("读取题库失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("题库 TOML 解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 持久化错误
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// 写入失败
    #[error("写入评阅记录失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 读取失败
    #[error("读取评阅记录失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 序列化失败
    #[error("评阅记录序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),
    /// 记录已生成但未能保存，调用方可以直接重试保存
    #[error("评阅记录未保存 (试卷 {}, 学号 {}): {source}", .record.test_id, .record.student_id)]
    Unsaved {
        record: Box<SubmissionRecord>,
        #[source]
        source: Box<PersistenceError>,
    },
}

impl PersistenceError {
    /// 取回未保存的评阅记录
    pub fn into_unsaved_record(self) -> Option<SubmissionRecord> {
        match self {
            PersistenceError::Unsaved { record, .. } => Some(*record),
            _ => None,
        }
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必填字段缺失
    #[error("字段 {field} 不能为空 ({source_name})")]
    MissingField { field: String, source_name: String },
}

// ========== 便捷构造函数 ==========

impl OracleError {
    /// 创建 API 调用失败错误
    pub fn call_failed(model: impl Into<String>, source: impl std::fmt::Display) -> Self {
        OracleError::CallFailed {
            model: model.into(),
            message: source.to_string(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
