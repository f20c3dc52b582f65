//! 评分回复解析
//!
//! 评分服务的回复是自由文本，约定格式为：
//!
//! ```text
//! Score: <数字>
//! Feedback: <评语>
//! ```
//!
//! 解析规则：取回复中第一个 `Score:` 标记后的数字（允许空白和小数）。
//! 找不到时返回 [`ParsedScore::Missing`]，由评分策略决定默认分。

use regex::Regex;

/// 解析结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedScore {
    Parsed(f64),
    Missing,
}

/// `Score: <number>` 解析器
#[derive(Debug, Clone)]
pub struct ScoreParser {
    pattern: Option<Regex>,
}

impl ScoreParser {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"Score:\s*(\d+(?:\.\d+)?)").ok(),
        }
    }

    pub fn parse(&self, reply: &str) -> ParsedScore {
        let Some(pattern) = &self.pattern else {
            return ParsedScore::Missing;
        };
        pattern
            .captures(reply)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .map(ParsedScore::Parsed)
            .unwrap_or(ParsedScore::Missing)
    }
}

impl Default for ScoreParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer_and_decimal_scores() {
        let parser = ScoreParser::new();
        assert_eq!(parser.parse("Score: 4\nFeedback: good"), ParsedScore::Parsed(4.0));
        assert_eq!(parser.parse("Score:3.5 Feedback: ok"), ParsedScore::Parsed(3.5));
        assert_eq!(parser.parse("Overall.\nScore:\n  5"), ParsedScore::Parsed(5.0));
    }

    #[test]
    fn test_first_score_token_wins() {
        let parser = ScoreParser::new();
        assert_eq!(
            parser.parse("Score: 2\nFeedback: previously Score: 5"),
            ParsedScore::Parsed(2.0)
        );
    }

    #[test]
    fn test_reply_without_score_token_is_missing() {
        let parser = ScoreParser::new();
        assert_eq!(parser.parse("Great answer, well done!"), ParsedScore::Missing);
        assert_eq!(parser.parse("Score: N/A"), ParsedScore::Missing);
        assert_eq!(parser.parse(""), ParsedScore::Missing);
    }
}
