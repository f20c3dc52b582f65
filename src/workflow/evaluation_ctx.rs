//! 评阅上下文
//!
//! 封装"我正在评阅哪份试卷、哪位学生的答题卷"这一信息

use std::fmt::Display;

use crate::models::EvaluationJob;

/// 评阅上下文
#[derive(Debug, Clone)]
pub struct EvaluationCtx {
    /// 试卷编号
    pub test_id: String,

    pub student_name: String,

    /// 学号
    pub student_id: String,
}

impl EvaluationCtx {
    pub fn new(
        test_id: impl Into<String>,
        student_name: impl Into<String>,
        student_id: impl Into<String>,
    ) -> Self {
        Self {
            test_id: test_id.into(),
            student_name: student_name.into(),
            student_id: student_id.into(),
        }
    }

    pub fn from_job(job: &EvaluationJob) -> Self {
        Self::new(
            job.test_id.trim(),
            job.student_name.trim(),
            job.student_id.trim(),
        )
    }
}

impl Display for EvaluationCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[试卷 {} 学生 {}]", self.test_id, self.student_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefix() {
        let ctx = EvaluationCtx::new("CHEM-2", "Lin", "S042");
        assert_eq!(ctx.to_string(), "[试卷 CHEM-2 学生 S042]");
    }
}
