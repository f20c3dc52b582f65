//! 全文提取服务 - 业务能力层
//!
//! 逐页调用识别能力并拼接全文。单页失败只在全文中留下占位行，不影响其他页。

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::error::OracleError;
use crate::infrastructure::CallThrottle;
use crate::models::{DocumentText, ExtractedPage, PageImage};
use crate::services::recognition::TextRecognizer;

/// 全文提取服务
pub struct TextExtractor {
    recognizer: Arc<dyn TextRecognizer>,
    throttle: CallThrottle,
    concurrency: usize,
    timeout: Duration,
}

impl TextExtractor {
    pub fn new(
        recognizer: Arc<dyn TextRecognizer>,
        throttle: CallThrottle,
        concurrency: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            recognizer,
            throttle,
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    /// 识别所有页面，结果按页序返回（与完成顺序无关）
    pub async fn extract_pages(&self, pages: &[PageImage]) -> Vec<ExtractedPage> {
        let calls: Vec<_> = pages.iter().map(|page| self.extract_page(page)).collect();
        stream::iter(calls).buffered(self.concurrency).collect().await
    }

    /// 识别所有页面并拼接为全文
    pub async fn extract_document(&self, pages: &[PageImage]) -> DocumentText {
        let extracted = self.extract_pages(pages).await;
        let document = DocumentText::from_pages(&extracted);
        if !document.failed_pages().is_empty() {
            info!(
                "全文提取完成: {} 页, 其中 {} 页识别失败",
                pages.len(),
                document.failed_pages().len()
            );
        } else {
            info!("全文提取完成: {} 页, {} 字节", pages.len(), document.len());
        }
        document
    }

    async fn extract_page(&self, page: &PageImage) -> ExtractedPage {
        let page_no = page.index + 1;
        let call = tokio::time::timeout(self.timeout, self.recognizer.recognize(page));

        let outcome = match self.throttle.run(call).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout {
                model: "recognizer".to_string(),
                secs: self.timeout.as_secs(),
            }),
        };

        match outcome {
            Ok(text) => {
                info!("✓ 第 {} 页识别完成 ({} 字符)", page_no, text.chars().count());
                ExtractedPage::text(page.index, text)
            }
            Err(e) => {
                error!("❌ 第 {} 页识别失败: {}", page_no, e);
                ExtractedPage::failed(page.index, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 第 `fail_on` 页失败，其余页返回固定文字
    struct FlakyRecognizer {
        fail_on: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextRecognizer for FlakyRecognizer {
        async fn recognize(&self, page: &PageImage) -> Result<String, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if page.index == self.fail_on {
                Err(OracleError::call_failed("mock", "quota exceeded"))
            } else {
                Ok(format!("text of page {}", page.index + 1))
            }
        }
    }

    struct SlowRecognizer;

    #[async_trait]
    impl TextRecognizer for SlowRecognizer {
        async fn recognize(&self, _page: &PageImage) -> Result<String, OracleError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".to_string())
        }
    }

    fn pages(n: usize) -> Vec<PageImage> {
        (0..n)
            .map(|i| PageImage::new(i, vec![i as u8], "image/png"))
            .collect()
    }

    #[tokio::test]
    async fn test_failed_page_does_not_abort_later_pages() {
        let recognizer = Arc::new(FlakyRecognizer {
            fail_on: 1,
            calls: AtomicUsize::new(0),
        });
        let extractor = TextExtractor::new(
            recognizer.clone(),
            CallThrottle::unlimited(),
            1,
            Duration::from_secs(5),
        );

        let document = extractor.extract_document(&pages(3)).await;

        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            document.as_str(),
            "\nPage 1:\ntext of page 1\n\nPage 2: Error processing image\n\nPage 3:\ntext of page 3\n"
        );
        assert_eq!(document.failed_pages(), &[1]);
    }

    #[tokio::test]
    async fn test_concurrent_extraction_keeps_page_order() {
        let recognizer = Arc::new(FlakyRecognizer {
            fail_on: usize::MAX,
            calls: AtomicUsize::new(0),
        });
        let extractor = TextExtractor::new(recognizer, CallThrottle::unlimited(), 4, Duration::from_secs(5));

        let extracted = extractor.extract_pages(&pages(5)).await;
        let indices: Vec<usize> = extracted.iter().map(|p| p.index).collect();

        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_recorded_as_page_failure() {
        let extractor = TextExtractor::new(
            Arc::new(SlowRecognizer),
            CallThrottle::unlimited(),
            1,
            Duration::from_secs(1),
        );

        let extracted = extractor.extract_pages(&pages(1)).await;

        assert!(extracted[0].is_failed());
    }

    #[tokio::test]
    async fn test_extraction_runs_inside_spawned_task() {
        let extractor = Arc::new(TextExtractor::new(
            Arc::new(FlakyRecognizer {
                fail_on: usize::MAX,
                calls: AtomicUsize::new(0),
            }),
            CallThrottle::unlimited(),
            2,
            Duration::from_secs(5),
        ));
        let images = pages(2);

        let task = tokio::spawn(async move { extractor.extract_document(&images).await });
        let document = task.await.expect("extraction task panicked");

        assert!(document.as_str().contains("text of page 2"));
    }
}
