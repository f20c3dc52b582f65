use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// 题号
///
/// 题号可以是整数也可以是任意字符串。排序规则：
/// 能解析为整数的题号按数值升序排在前面，其余题号按字符串字典序排在后面。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QuestionNumber {
    Numeric(u64),
    Label(String),
}

impl QuestionNumber {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<u64>() {
            Ok(n) => QuestionNumber::Numeric(n),
            Err(_) => QuestionNumber::Label(trimmed.to_string()),
        }
    }
}

impl Ord for QuestionNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (QuestionNumber::Numeric(a), QuestionNumber::Numeric(b)) => a.cmp(b),
            (QuestionNumber::Numeric(_), QuestionNumber::Label(_)) => Ordering::Less,
            (QuestionNumber::Label(_), QuestionNumber::Numeric(_)) => Ordering::Greater,
            (QuestionNumber::Label(a), QuestionNumber::Label(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for QuestionNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for QuestionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionNumber::Numeric(n) => write!(f, "{}", n),
            QuestionNumber::Label(s) => write!(f, "{}", s),
        }
    }
}

impl From<u64> for QuestionNumber {
    fn from(n: u64) -> Self {
        QuestionNumber::Numeric(n)
    }
}

impl From<&str> for QuestionNumber {
    fn from(s: &str) -> Self {
        QuestionNumber::parse(s)
    }
}

impl Serialize for QuestionNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            QuestionNumber::Numeric(n) => serializer.serialize_u64(*n),
            QuestionNumber::Label(s) => serializer.serialize_str(s),
        }
    }
}

// 题号在 TOML / JSON 中既可能是字符串也可能是整数
impl<'de> Deserialize<'de> for QuestionNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Visitor;

        struct NumberVisitor;

        impl<'de> Visitor<'de> for NumberVisitor {
            type Value = QuestionNumber;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or integer representing a question number")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(QuestionNumber::parse(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if value < 0 {
                    Ok(QuestionNumber::Label(value.to_string()))
                } else {
                    Ok(QuestionNumber::Numeric(value as u64))
                }
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(QuestionNumber::Numeric(value))
            }
        }

        deserializer.deserialize_any(NumberVisitor)
    }
}

/// 题目（只读，由出题方维护）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub number: QuestionNumber,
    pub text: String,
    pub keywords: Vec<String>,
}

impl Question {
    pub fn new(number: impl Into<QuestionNumber>, text: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            text: text.into(),
            keywords: Vec::new(),
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

/// 按题号排序（稳定排序，题号相同时保持原顺序）
pub fn sort_by_number(questions: &[Question]) -> Vec<&Question> {
    let mut sorted: Vec<&Question> = questions.iter().collect();
    sorted.sort_by(|a, b| a.number.cmp(&b.number));
    sorted
}

/// 题库 TOML 中的一道题
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionEntry {
    #[serde(default)]
    pub number: Option<QuestionNumber>,
    #[serde(alias = "text")]
    pub question: String,
    #[serde(default, alias = "expected_keywords", deserialize_with = "deserialize_keywords")]
    pub keywords: Vec<String>,
}

/// 题库中的一份试卷
#[derive(Debug, Clone, Deserialize)]
pub struct TestPaper {
    pub test_id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub questions: Vec<QuestionEntry>,
}

impl TestPaper {
    /// 转换为题目列表，未填写题号的题目使用其位置（从 1 开始）作为题号
    pub fn into_questions(self) -> Vec<Question> {
        self.questions
            .into_iter()
            .enumerate()
            .map(|(idx, entry)| Question {
                number: entry
                    .number
                    .unwrap_or(QuestionNumber::Numeric(idx as u64 + 1)),
                text: entry.question,
                keywords: entry.keywords,
            })
            .collect()
    }
}

// 关键词既可以写成逗号分隔的字符串，也可以写成字符串数组
fn deserialize_keywords<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{SeqAccess, Visitor};

    struct KeywordsVisitor;

    impl<'de> Visitor<'de> for KeywordsVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a comma-separated string or a list of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect())
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut keywords = Vec::new();
            while let Some(k) = seq.next_element::<String>()? {
                let k = k.trim();
                if !k.is_empty() {
                    keywords.push(k.to_string());
                }
            }
            Ok(keywords)
        }
    }

    deserializer.deserialize_any(KeywordsVisitor)
}
