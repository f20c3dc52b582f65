use crate::error::ConfigError;
use serde::Deserialize;

/// 一份待评阅的答题卷任务（来自任务目录中的 TOML 文件）
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationJob {
    pub test_id: String,
    pub student_name: String,
    #[serde(alias = "prn")]
    pub student_id: String,
    /// 答题卷路径：PDF、单张页面图片，或按页命名的图片目录
    pub answer_sheet: String,
    #[serde(skip)]
    pub file_path: Option<String>,
}

impl EvaluationJob {
    /// 所有字段都必须填写
    pub fn validate(&self) -> Result<(), ConfigError> {
        let source_name = self.file_path.clone().unwrap_or_default();
        let fields = [
            ("test_id", &self.test_id),
            ("student_name", &self.student_name),
            ("student_id", &self.student_id),
            ("answer_sheet", &self.answer_sheet),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                    source_name,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_blank_fields() {
        let job: EvaluationJob = toml::from_str(
            r#"
test_id = "t1"
student_name = "  "
prn = "S-001"
answer_sheet = "sheets/s001"
"#,
        )
        .unwrap();

        assert_eq!(job.student_id, "S-001");
        let err = job.validate().unwrap_err();
        assert!(err.to_string().contains("student_name"));
    }
}
