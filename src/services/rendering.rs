//! 页面渲染服务 - 业务能力层
//!
//! 只负责"把答题卷变成有序的页面图片"，不关心识别和评分
//!
//! - [`ImageFileRenderer`]：单张图片或图片目录
//! - [`PdfRenderer`]：调用 `pdftoppm` 把 PDF 逐页栅格化为 PNG
//! - [`AnswerSheetRenderer`]：按扩展名在两者之间分派

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::RenderError;
use crate::models::PageImage;

/// 页面渲染能力
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// 返回按页序排列的页面图片
    async fn render(&self, source: &Path) -> Result<Vec<PageImage>, RenderError>;
}

/// 基于图片文件的渲染器
///
/// - 单个图片文件：一页
/// - 图片目录：目录中每张图片一页，按文件名自然排序（`page2` 在 `page10` 之前）
/// - PDF 等其他格式：返回 `UnsupportedFormat`，PDF 由 [`PdfRenderer`] 处理
#[derive(Debug, Default, Clone)]
pub struct ImageFileRenderer;

impl ImageFileRenderer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PageRenderer for ImageFileRenderer {
    async fn render(&self, source: &Path) -> Result<Vec<PageImage>, RenderError> {
        let path_str = source.display().to_string();

        if !source.exists() {
            return Err(RenderError::NotFound { path: path_str });
        }

        let files = if source.is_dir() {
            let files = list_page_files(source).await?;
            if files.is_empty() {
                return Err(RenderError::NoPages { path: path_str });
            }
            files
        } else {
            if mime_for(source).is_none() {
                return Err(RenderError::UnsupportedFormat { path: path_str });
            }
            vec![source.to_path_buf()]
        };

        read_pages(&files).await
    }
}

/// PDF 渲染器
///
/// 用 `pdftoppm -r <dpi> -png` 把每页输出到临时目录，再按页序读回。
/// 临时目录在读取完成后删除。
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    program: PathBuf,
    dpi: u32,
    timeout: Duration,
}

impl PdfRenderer {
    pub fn new(program: impl Into<PathBuf>, dpi: u32) -> Self {
        Self {
            program: program.into(),
            dpi: dpi.max(1),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn rasterize_failed(source: &Path, message: impl Into<String>) -> RenderError {
        RenderError::RasterizeFailed {
            path: source.display().to_string(),
            message: message.into(),
        }
    }
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self::new("pdftoppm", 150)
    }
}

#[async_trait]
impl PageRenderer for PdfRenderer {
    async fn render(&self, source: &Path) -> Result<Vec<PageImage>, RenderError> {
        if !source.is_file() {
            return Err(RenderError::NotFound {
                path: source.display().to_string(),
            });
        }

        let workdir = tempfile::tempdir().map_err(|e| Self::rasterize_failed(source, e.to_string()))?;
        let prefix = workdir.path().join("page");

        let child = Command::new(&self.program)
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg(source)
            .arg(&prefix)
            .kill_on_drop(true)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Self::rasterize_failed(source, format!("无法启动 {}: {}", self.program.display(), e))
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| Self::rasterize_failed(source, e.to_string()))?,
            Err(_) => {
                return Err(Self::rasterize_failed(
                    source,
                    format!("超过 {} 秒未完成", self.timeout.as_secs()),
                ))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(Self::rasterize_failed(source, format!("{}: {}", output.status, stderr)));
        }

        let files = list_page_files(workdir.path()).await?;
        if files.is_empty() {
            return Err(RenderError::NoPages {
                path: source.display().to_string(),
            });
        }
        info!("📄 PDF 已栅格化: {} ({} 页, {} dpi)", source.display(), files.len(), self.dpi);

        read_pages(&files).await
    }
}

/// 答题卷渲染器：`.pdf` 文件交给 [`PdfRenderer`]，其余交给 [`ImageFileRenderer`]
#[derive(Debug, Clone, Default)]
pub struct AnswerSheetRenderer {
    images: ImageFileRenderer,
    pdf: PdfRenderer,
}

impl AnswerSheetRenderer {
    pub fn new(pdf: PdfRenderer) -> Self {
        Self {
            images: ImageFileRenderer::new(),
            pdf,
        }
    }
}

#[async_trait]
impl PageRenderer for AnswerSheetRenderer {
    async fn render(&self, source: &Path) -> Result<Vec<PageImage>, RenderError> {
        if source.is_file() && is_pdf(source) {
            self.pdf.render(source).await
        } else {
            self.images.render(source).await
        }
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

async fn read_pages(files: &[PathBuf]) -> Result<Vec<PageImage>, RenderError> {
    let mut pages = Vec::with_capacity(files.len());
    for (index, file) in files.iter().enumerate() {
        let bytes = fs::read(file).await.map_err(|source| RenderError::ReadFailed {
            path: file.display().to_string(),
            source,
        })?;
        let mime = mime_for(file).unwrap_or("image/png");
        debug!("页面 {}: {} ({} 字节)", index + 1, file.display(), bytes.len());
        pages.push(PageImage::new(index, bytes, mime));
    }
    Ok(pages)
}

async fn list_page_files(folder: &Path) -> Result<Vec<PathBuf>, RenderError> {
    let read_failed = |source| RenderError::ReadFailed {
        path: folder.display().to_string(),
        source,
    };

    let mut files = Vec::new();
    let mut entries = fs::read_dir(folder).await.map_err(read_failed)?;
    while let Some(entry) = entries.next_entry().await.map_err(read_failed)? {
        let path = entry.path();
        if path.is_file() && mime_for(&path).is_some() {
            files.push(path);
        }
    }

    files.sort_by_key(|p| {
        natural_key(
            &p.file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default(),
        )
    });
    Ok(files)
}

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum NameChunk {
    Num(u64),
    Text(String),
}

/// 文件名自然排序键：数字段按数值比较
fn natural_key(name: &str) -> Vec<NameChunk> {
    let mut chunks = Vec::new();
    let mut digits = String::new();
    let mut text = String::new();

    for c in name.chars() {
        if c.is_ascii_digit() {
            if !text.is_empty() {
                chunks.push(NameChunk::Text(std::mem::take(&mut text)));
            }
            digits.push(c);
        } else {
            if !digits.is_empty() {
                chunks.push(NameChunk::Num(digits.parse().unwrap_or(u64::MAX)));
                digits.clear();
            }
            text.push(c);
        }
    }
    if !digits.is_empty() {
        chunks.push(NameChunk::Num(digits.parse().unwrap_or(u64::MAX)));
    }
    if !text.is_empty() {
        chunks.push(NameChunk::Text(text));
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_key_orders_page_numbers() {
        let mut names = vec!["page10.png", "page2.png", "page1.png"];
        names.sort_by_key(|n| natural_key(n));
        assert_eq!(names, vec!["page1.png", "page2.png", "page10.png"]);
    }

    #[tokio::test]
    async fn test_render_directory_in_page_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page10.png"), b"ten").unwrap();
        std::fs::write(dir.path().join("page2.jpg"), b"two").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"skip").unwrap();

        let pages = ImageFileRenderer::new().render(dir.path()).await.unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].index, 0);
        assert_eq!(pages[0].bytes, b"two");
        assert_eq!(pages[0].mime, "image/jpeg");
        assert_eq!(pages[1].bytes, b"ten");
    }

    #[tokio::test]
    async fn test_render_rejects_pdf_and_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("answers.pdf");
        std::fs::write(&pdf, b"%PDF-1.7").unwrap();

        let renderer = ImageFileRenderer::new();
        assert!(matches!(
            renderer.render(&pdf).await,
            Err(RenderError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            renderer.render(&dir.path().join("nope")).await,
            Err(RenderError::NotFound { .. })
        ));

        let empty = tempfile::tempdir().unwrap();
        assert!(matches!(
            renderer.render(empty.path()).await,
            Err(RenderError::NoPages { .. })
        ));
    }

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// 模拟 pdftoppm：按 `<prefix>-<n>.png` 输出三页，页面内容记录 dpi 参数
    #[cfg(unix)]
    const FAKE_PDFTOPPM: &str = r#"for last; do :; done
printf "dpi=$2 one" > "$last-1.png"
printf "two" > "$last-2.png"
printf "ten" > "$last-10.png"
"#;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_pdf_pages_are_rasterized_in_page_order() {
        let dir = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        let ok = write_script(bin.path(), "pdftoppm-ok", FAKE_PDFTOPPM);
        let broken = write_script(
            bin.path(),
            "pdftoppm-broken",
            "echo \"Syntax Error: Couldn't read xref table\" >&2\nexit 1\n",
        );
        let pdf = dir.path().join("answers.PDF");
        std::fs::write(&pdf, b"%PDF-1.7").unwrap();

        let pages = PdfRenderer::new(&ok, 200).render(&pdf).await.unwrap();

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].bytes, b"dpi=200 one");
        assert_eq!(pages[1].bytes, b"two");
        assert_eq!(pages[2].bytes, b"ten");
        assert_eq!(pages[2].index, 2);
        assert!(pages.iter().all(|p| p.mime == "image/png"));

        let err = PdfRenderer::new(&broken, 200).render(&pdf).await.unwrap_err();
        match err {
            RenderError::RasterizeFailed { message, .. } => assert!(message.contains("xref table")),
            other => panic!("unexpected error: {:?}", other),
        }

        // 分派渲染器：PDF 走 pdftoppm，图片目录走图片渲染器
        let renderer = AnswerSheetRenderer::new(PdfRenderer::new(&ok, 150));
        assert_eq!(renderer.render(&pdf).await.unwrap().len(), 3);
        std::fs::write(dir.path().join("page1.png"), b"scan").unwrap();
        let scans = renderer.render(dir.path()).await.unwrap();
        assert_eq!(scans.len(), 1);
        assert_eq!(scans[0].bytes, b"scan");
    }

    #[tokio::test]
    async fn test_missing_pdftoppm_is_a_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("answers.pdf");
        std::fs::write(&pdf, b"%PDF-1.7").unwrap();

        let renderer = PdfRenderer::new(dir.path().join("no-such-pdftoppm"), 150);

        assert!(matches!(
            renderer.render(&pdf).await,
            Err(RenderError::RasterizeFailed { .. })
        ));
        assert!(matches!(
            renderer.render(&dir.path().join("gone.pdf")).await,
            Err(RenderError::NotFound { .. })
        ));
    }
}
