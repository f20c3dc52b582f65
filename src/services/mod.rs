pub mod extraction;
pub mod pending_writer;
pub mod persistence;
pub mod question_bank;
pub mod recognition;
pub mod rendering;
pub mod score_parser;
pub mod scoring;
pub mod segmentation;

pub use extraction::TextExtractor;
pub use pending_writer::PendingWriter;
pub use persistence::{JsonlSubmissionStore, SubmissionSink};
pub use question_bank::{QuestionSource, TomlQuestionBank};
pub use recognition::{LlmRecognizer, TextRecognizer};
pub use rendering::{AnswerSheetRenderer, ImageFileRenderer, PageRenderer, PdfRenderer};
pub use score_parser::{ParsedScore, ScoreParser};
pub use scoring::{GradingPolicy, LlmScoringOracle, ScoringEngine, ScoringOracle};
pub use segmentation::{AnchorSegmenter, Segmenter};
