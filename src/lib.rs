//! # Reading Composer
//!
//! 雅思阅读试卷组卷工具：在内存中编排三部分文章、题目和说明区间，
//! 本地校验后逐部分提交到阅读管理后端
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有 HTTP 客户端，只暴露能力
//! - `HttpExecutor` - 发送 JSON 请求，附加 token，透出后端 detail
//!
//! ### ② 客户端层（Clients）
//! - `ReadingBackend` - 后端能力 trait（建卷 / 保存部分 / 查询 / 删除）
//! - `ReadingClient` - 基于 HTTP 的实现
//!
//! ### ③ 业务能力层（Services）
//! - `BatchRequest` - 批量出题
//! - `QuestionEditor` - 逐题编辑
//! - `InstructionEditor` - 说明区间编辑
//! - `build_part_payload` - 覆盖校验与分组
//!
//! ### ④ 流程层（Workflow）
//! - `ReadingTestComposer` - 一张试卷的完整编辑 / 保存流程
//! - `PartCtx` - 日志上下文
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量草稿处理器，控制并发
//! - `orchestrator/draft_processor` - 单个草稿处理器，逐部分回放
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{ReadingBackend, ReadingClient};
pub use config::Config;
pub use error::{ApiError, AppError, AppResult, ValidationError};
pub use infrastructure::HttpExecutor;
pub use models::{Exam, Part, PartNumber, Question, QuestionKind, ReadingDraft};
pub use orchestrator::{process_draft, App, DraftStats};
pub use workflow::{PartCtx, ReadingTestComposer, SaveOutcome};
