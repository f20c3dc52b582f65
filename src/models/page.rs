//! 页面与全文
//!
//! `PageImage` → (识别) → `ExtractedPage` → (拼接) → `DocumentText`

use std::fmt;
use std::ops::Range;

/// 单页图片
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 页序号（从 0 开始）
    pub index: usize,
    pub bytes: Vec<u8>,
    /// 图片 MIME 类型，如 `image/png`
    pub mime: String,
}

impl PageImage {
    pub fn new(index: usize, bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            index,
            bytes,
            mime: mime.into(),
        }
    }
}

/// 单页识别结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageText {
    Text(String),
    /// 识别失败，附带失败原因
    Failed(String),
}

/// 单页识别产物，创建后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    pub index: usize,
    pub text: PageText,
}

impl ExtractedPage {
    pub fn text(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: PageText::Text(text.into()),
        }
    }

    pub fn failed(index: usize, reason: impl Into<String>) -> Self {
        Self {
            index,
            text: PageText::Failed(reason.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.text, PageText::Failed(_))
    }
}

/// 整份答题卷的识别全文（带页边界标记）
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentText {
    text: String,
    failed_pages: Vec<usize>,
    /// 占位文字在全文中的字节区间
    placeholders: Vec<Range<usize>>,
}

impl DocumentText {
    /// 按页序拼接
    ///
    /// 成功页写入 `"\nPage <n>:\n<text>\n"`；失败页只写入占位行，
    /// 失败原因不进入全文，避免被当作作答内容匹配。
    pub fn from_pages(pages: &[ExtractedPage]) -> Self {
        let mut ordered: Vec<&ExtractedPage> = pages.iter().collect();
        ordered.sort_by_key(|p| p.index);

        let mut text = String::new();
        let mut failed_pages = Vec::new();
        let mut placeholders = Vec::new();
        for page in ordered {
            let page_no = page.index + 1;
            match &page.text {
                PageText::Text(t) => {
                    text.push_str(&format!("\nPage {}:\n{}\n", page_no, t));
                }
                PageText::Failed(_) => {
                    text.push_str(&format!("\nPage {}: ", page_no));
                    let start = text.len();
                    text.push_str(PAGE_ERROR_PLACEHOLDER);
                    placeholders.push(start..text.len());
                    text.push('\n');
                    failed_pages.push(page.index);
                }
            }
        }

        Self {
            text,
            failed_pages,
            placeholders,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// 识别失败的页序号（从 0 开始）
    pub fn failed_pages(&self) -> &[usize] {
        &self.failed_pages
    }

    /// 区间是否与失败页占位文字重叠；重叠的匹配不能当作作答内容
    pub fn overlaps_placeholder(&self, range: Range<usize>) -> bool {
        self.placeholders
            .iter()
            .any(|p| range.start < p.end && p.start < range.end)
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl From<&str> for DocumentText {
    fn from(text: &str) -> Self {
        Self {
            text: text.to_string(),
            failed_pages: Vec::new(),
            placeholders: Vec::new(),
        }
    }
}

impl fmt::Display for DocumentText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// 识别失败页的占位文字
pub const PAGE_ERROR_PLACEHOLDER: &str = "Error processing image";
