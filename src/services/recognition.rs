//! 文字识别服务 - 业务能力层
//!
//! 只负责"一页图片 → 一段文字"，不关心拼接和切分

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::OracleError;
use crate::infrastructure::LlmClient;
use crate::models::PageImage;

/// 发给识别模型的固定指令
pub const EXTRACTION_INSTRUCTION: &str =
    "Extract all the handwritten text from this image, preserving formatting and layout.";

/// 文字识别能力
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// 识别单页图片。单次调用，不重试
    async fn recognize(&self, page: &PageImage) -> Result<String, OracleError>;
}

/// 基于视觉 LLM 的识别
pub struct LlmRecognizer {
    client: LlmClient,
}

impl LlmRecognizer {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TextRecognizer for LlmRecognizer {
    async fn recognize(&self, page: &PageImage) -> Result<String, OracleError> {
        let images = [to_data_url(page)];
        self.client
            .send(EXTRACTION_INSTRUCTION, None, Some(&images))
            .await
    }
}

/// 将页面图片编码为 `data:<mime>;base64,...`
pub fn to_data_url(page: &PageImage) -> String {
    format!("data:{};base64,{}", page.mime, STANDARD.encode(&page.bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_encoding() {
        let page = PageImage::new(0, b"hi".to_vec(), "image/png");
        assert_eq!(to_data_url(&page), "data:image/png;base64,aGk=");
    }
}
