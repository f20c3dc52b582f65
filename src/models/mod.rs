pub mod answer;
pub mod job;
pub mod loaders;
pub mod page;
pub mod question;
pub mod result;

pub use answer::{AnswerSheet, AnswerSpan, NO_ANSWER_FOUND};
pub use job::EvaluationJob;
pub use loaders::{load_all_jobs, load_job, load_test_paper};
pub use page::{DocumentText, ExtractedPage, PageImage, PageText};
pub use question::{Question, QuestionNumber, TestPaper};
pub use result::{QuestionResult, ResultStatus, StudentSummary, SubmissionRecord};
