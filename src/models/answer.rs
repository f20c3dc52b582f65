use crate::models::question::QuestionNumber;

/// 未找到作答时的占位文字
pub const NO_ANSWER_FOUND: &str = "No Answer Found";

/// 某道题在全文中对应的作答片段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerSpan {
    /// 全文中的一段子串
    Found(String),
    /// 锚点未匹配
    NotFound,
}

impl AnswerSpan {
    /// 空白作答：未找到，或去除首尾空白后为空
    pub fn is_blank(&self) -> bool {
        match self {
            AnswerSpan::Found(text) => text.trim().is_empty(),
            AnswerSpan::NotFound => true,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AnswerSpan::Found(text) => text,
            AnswerSpan::NotFound => NO_ANSWER_FOUND,
        }
    }
}

/// 切分结果：每道题一个片段，按题号顺序排列
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnswerSheet {
    spans: Vec<(QuestionNumber, AnswerSpan)>,
}

impl AnswerSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, number: QuestionNumber, span: AnswerSpan) {
        self.spans.push((number, span));
    }

    /// 查找题号对应的片段；同一题号出现多次时返回第一个
    pub fn get(&self, number: &QuestionNumber) -> Option<&AnswerSpan> {
        self.spans
            .iter()
            .find(|(n, _)| n == number)
            .map(|(_, span)| span)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(QuestionNumber, AnswerSpan)> {
        self.spans.iter()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// 找到作答的题目数量
    pub fn found_count(&self) -> usize {
        self.spans
            .iter()
            .filter(|(_, span)| matches!(span, AnswerSpan::Found(_)))
            .count()
    }
}
