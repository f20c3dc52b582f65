use crate::models::question::QuestionNumber;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// 单题评分状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// 已由评分服务评分
    Answered,
    /// 空白或未找到作答，未调用评分服务
    Blank,
    /// 评分服务调用失败，分数降级为 0
    OracleError,
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResultStatus::Answered => "answered",
            ResultStatus::Blank => "blank",
            ResultStatus::OracleError => "oracle_error",
        };
        f.write_str(s)
    }
}

/// 单题评分结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_number: QuestionNumber,
    #[serde(rename = "question")]
    pub question_text: String,
    #[serde(rename = "evaluation")]
    pub evaluation_text: String,
    pub score: u32,
    pub status: ResultStatus,
}

/// 一次评阅的完整记录，保存后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub test_id: String,
    pub student_name: String,
    pub student_id: String,
    pub results: Vec<QuestionResult>,
    pub total_marks: u32,
    pub max_marks: u32,
    pub timestamp: DateTime<Local>,
}

impl SubmissionRecord {
    /// 得分率（百分比），满分为 0 时返回 0
    pub fn percentage(&self) -> f64 {
        if self.max_marks == 0 {
            0.0
        } else {
            self.total_marks as f64 / self.max_marks as f64 * 100.0
        }
    }

    /// 按状态统计题目数量
    pub fn count_status(&self, status: ResultStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

/// 学生的历史成绩概览
#[derive(Debug, Clone, PartialEq)]
pub struct StudentSummary {
    pub student_id: String,
    pub tests_taken: usize,
    /// 最近一次评阅（按时间）
    pub latest: Option<SubmissionRecord>,
    /// 各次评阅得分率的平均值
    pub average_percentage: f64,
}

impl StudentSummary {
    /// 从该学生的评阅记录汇总，`records` 中其他学生的记录会被忽略
    pub fn from_records(student_id: &str, records: &[SubmissionRecord]) -> Self {
        let own: Vec<&SubmissionRecord> = records
            .iter()
            .filter(|r| r.student_id == student_id)
            .collect();

        let average_percentage = if own.is_empty() {
            0.0
        } else {
            own.iter().map(|r| r.percentage()).sum::<f64>() / own.len() as f64
        };

        Self {
            student_id: student_id.to_string(),
            tests_taken: own.len(),
            latest: own.iter().max_by_key(|r| r.timestamp).map(|r| (*r).clone()),
            average_percentage,
        }
    }
}
