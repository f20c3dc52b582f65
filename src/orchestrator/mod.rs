//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量答题卷处理器
//! - 管理应用生命周期（初始化、运行）
//! - 补存上次运行中未保存的记录
//! - 批量加载评阅任务（Vec<EvaluationJob>）
//! - 控制并发数量（Semaphore）
//! - 输出全局统计信息
//!
//! ### `sheet_processor` - 单份答题卷处理器
//! - 委托 EvaluationFlow 评阅并保存
//! - 保存失败时暂存记录
//! - 清理任务文件
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<EvaluationJob>)
//!     ↓
//! sheet_processor (处理单个 EvaluationJob)
//!     ↓
//! workflow::EvaluationFlow (取题 → 渲染 → 识别 → 切分 → 评分 → 汇总)
//!     ↓
//! services (能力层：rendering / recognition / segmentation / scoring / persistence)
//!     ↓
//! infrastructure (基础设施：LlmClient / CallThrottle)
//! ```

pub mod batch_processor;
pub mod sheet_processor;

pub use batch_processor::{replay_pending, App};
pub use sheet_processor::{process_sheet, SheetOutcome};
