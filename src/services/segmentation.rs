//! 作答切分服务 - 业务能力层
//!
//! 在识别全文中为每道题定位作答片段。
//!
//! ## 锚点规则
//!
//! 1. 题目按题号排序（见 [`QuestionNumber`](crate::models::QuestionNumber) 的排序规则）
//! 2. 锚点 = 题干去除首尾空白后的前 `anchor_len` 个字符，再去掉末尾的空白和句末标点
//! 3. 在全文中不区分大小写地查找锚点的第一次出现，位置即片段起点
//! 4. 片段终点 = 按题号顺序，后续题目中第一个在起点锚点之后出现的锚点位置；都找不到则到全文末尾
//! 5. 锚点找不到（包括题干为空）时片段为"未找到"，不做模糊匹配
//! 6. 与失败页占位文字重叠的匹配不算数，起点和终点都一样
//!
//! 切分是纯函数：相同的全文和题目列表总是得到相同结果。

use regex::{Match, Regex};

use crate::models::question::sort_by_number;
use crate::models::{AnswerSheet, AnswerSpan, DocumentText, Question};

/// 作答切分能力
///
/// 锚点匹配只是其中一种实现，以后可以替换为基于版面结构的切分
pub trait Segmenter: Send + Sync {
    /// 返回每道题的作答片段，按题号顺序排列，条目数与题目数相同
    fn segment(&self, document: &DocumentText, questions: &[Question]) -> AnswerSheet;
}

/// 锚点切分器
#[derive(Debug, Clone)]
pub struct AnchorSegmenter {
    anchor_len: usize,
}

impl AnchorSegmenter {
    pub fn new(anchor_len: usize) -> Self {
        Self {
            anchor_len: anchor_len.max(1),
        }
    }

    /// 题干对应的锚点；题干为空时返回 `None`
    pub fn anchor(&self, question_text: &str) -> Option<String> {
        let head: String = question_text.trim().chars().take(self.anchor_len).collect();
        let anchor = head.trim_end_matches(|c: char| c.is_whitespace() || ANCHOR_TRAILING_PUNCT.contains(&c));
        if anchor.is_empty() {
            None
        } else {
            Some(anchor.to_string())
        }
    }

    fn anchor_pattern(&self, question_text: &str) -> Option<Regex> {
        let anchor = self.anchor(question_text)?;
        Regex::new(&format!("(?i){}", regex::escape(&anchor))).ok()
    }
}

impl Default for AnchorSegmenter {
    fn default() -> Self {
        Self::new(20)
    }
}

/// 从 `from` 开始查找第一个不与占位文字重叠的匹配
fn find_outside_placeholders<'t>(
    re: &Regex,
    document: &'t DocumentText,
    from: usize,
) -> Option<Match<'t>> {
    let text = document.as_str();
    let mut pos = from;
    while pos <= text.len() {
        let m = re.find_at(text, pos)?;
        if !document.overlaps_placeholder(m.range()) {
            return Some(m);
        }
        pos = m.start() + text[m.start()..].chars().next().map_or(1, char::len_utf8);
    }
    None
}

/// 锚点末尾需要去掉的句末标点
const ANCHOR_TRAILING_PUNCT: &[char] = &['?', '？', '.', '。', ':', '：', '!', '！'];

impl Segmenter for AnchorSegmenter {
    fn segment(&self, document: &DocumentText, questions: &[Question]) -> AnswerSheet {
        let text = document.as_str();
        let ordered = sort_by_number(questions);
        let patterns: Vec<Option<Regex>> = ordered
            .iter()
            .map(|q| self.anchor_pattern(&q.text))
            .collect();

        let mut sheet = AnswerSheet::new();
        for (i, question) in ordered.iter().enumerate() {
            let found = patterns[i]
                .as_ref()
                .and_then(|re| find_outside_placeholders(re, document, 0));

            let span = match found {
                Some(m) => {
                    let start = m.start();
                    let end = patterns[i + 1..]
                        .iter()
                        .flatten()
                        .find_map(|re| find_outside_placeholders(re, document, m.end()))
                        .map(|next| next.start())
                        .unwrap_or(text.len());
                    AnswerSpan::Found(text[start..end].to_string())
                }
                None => AnswerSpan::NotFound,
            };

            sheet.push(question.number.clone(), span);
        }

        sheet
    }
}
