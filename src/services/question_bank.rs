//! 题库服务 - 业务能力层
//!
//! 按试卷编号取回题目列表。题库由出题方维护，这里只读。

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::error::QuestionBankError;
use crate::models::{load_test_paper, Question};

/// 题目来源
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// 试卷的全部题目；试卷不存在或没有题目时返回错误
    async fn questions(&self, test_id: &str) -> Result<Vec<Question>, QuestionBankError>;
}

/// 以目录存放的 TOML 题库，每份试卷一个 `<test_id>.toml`
pub struct TomlQuestionBank {
    folder: PathBuf,
}

impl TomlQuestionBank {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    fn paper_path(&self, test_id: &str) -> Option<PathBuf> {
        let id = test_id.trim();
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return None;
        }
        Some(self.folder.join(format!("{}.toml", id)))
    }
}

#[async_trait]
impl QuestionSource for TomlQuestionBank {
    async fn questions(&self, test_id: &str) -> Result<Vec<Question>, QuestionBankError> {
        let not_found = || QuestionBankError::TestNotFound {
            test_id: test_id.to_string(),
        };

        let path = self.paper_path(test_id).ok_or_else(not_found)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(not_found());
        }

        let paper = load_test_paper(&path).await?;
        if paper.test_id != test_id.trim() {
            warn!(
                "题库文件 {} 中的试卷编号为 {}，与请求的 {} 不一致",
                path.display(),
                paper.test_id,
                test_id
            );
        }

        let questions = paper.into_questions();
        if questions.is_empty() {
            return Err(QuestionBankError::NoQuestions {
                test_id: test_id.to_string(),
            });
        }

        debug!("试卷 {} 共 {} 道题", test_id, questions.len());
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuestionNumber;

    #[tokio::test]
    async fn test_loads_questions_by_test_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("PHY-01.toml"),
            r#"
test_id = "PHY-01"
subject = "Physics"

[[questions]]
number = 2
question = "Define power."
keywords = "work, time"

[[questions]]
number = 1
question = "Define energy."
keywords = ["capacity", "work"]
"#,
        )
        .unwrap();

        let bank = TomlQuestionBank::new(dir.path());
        let questions = bank.questions("PHY-01").await.unwrap();

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].number, QuestionNumber::Numeric(2));
        assert_eq!(questions[1].keywords, vec!["capacity", "work"]);
    }

    #[tokio::test]
    async fn test_unknown_test_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let bank = TomlQuestionBank::new(dir.path());

        let err = bank.questions("missing").await.unwrap_err();
        assert!(matches!(err, QuestionBankError::TestNotFound { .. }));

        let err = bank.questions("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, QuestionBankError::TestNotFound { .. }));
    }

    #[tokio::test]
    async fn test_paper_without_questions_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("EMPTY.toml"), "test_id = \"EMPTY\"\n").unwrap();

        let bank = TomlQuestionBank::new(dir.path());
        let err = bank.questions("EMPTY").await.unwrap_err();

        assert!(matches!(err, QuestionBankError::NoQuestions { .. }));
    }
}
