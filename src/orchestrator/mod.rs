//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，把磁盘上的草稿回放成后端的阅读试卷。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量草稿处理器
//! - 管理应用生命周期（初始化、运行、统计）
//! - 批量加载草稿（Vec<ReadingDraft>）
//! - 控制并发数量（Semaphore）
//! - 为每个草稿创建独立的 `ReadingClient` 和组卷器
//!
//! ### `draft_processor` - 单个草稿处理器
//! - 建卷或续编
//! - 逐部分回放草稿并保存
//! - 激活后收尾、清理文件
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<ReadingDraft>)
//!     ↓
//! draft_processor (处理 Vec<DraftPart>)
//!     ↓
//! workflow::ReadingTestComposer (一张试卷的内存状态 + 保存流程)
//!     ↓
//! services (批量出题 / 题目编辑 / 说明区间 / 分组校验)
//!     ↓
//! clients → infrastructure (ReadingClient → HttpExecutor)
//! ```

pub mod batch_processor;
pub mod draft_processor;

pub use batch_processor::App;
pub use draft_processor::{process_draft, replay_part, DraftStats};
