//! 批量草稿处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量草稿的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：写日志文件头、输出启动信息
//! 2. **批量加载**：扫描并加载所有待处理的草稿（`Vec<ReadingDraft>`）
//! 3. **并发控制**：使用 Semaphore 限制并发数量
//! 4. **分批处理**：将草稿分批次处理，每批完成后再开始下一批
//! 5. **全局统计**：汇总所有草稿的处理结果，并列出后端现有试卷

use anyhow::Result;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::clients::{ReadingBackend, ReadingClient};
use crate::config::Config;
use crate::models::{load_all_drafts, ReadingDraft};
use crate::orchestrator::draft_processor::{self, DraftStats};
use crate::utils::logging;
use crate::workflow::ReadingTestComposer;

/// 应用主结构
pub struct App {
    config: Config,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::init_log_file(&config.output_log_file)?;
        logging::log_startup(&config.api_base_url, config.max_concurrent_drafts);
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let all_drafts = self.load_drafts().await?;

        if all_drafts.is_empty() {
            warn!("⚠️ 没有找到待处理的TOML草稿，程序结束");
            return Ok(());
        }

        logging::log_drafts_loaded(all_drafts.len(), self.config.max_concurrent_drafts);

        let stats = self.process_all_drafts(all_drafts).await?;
        self.log_remote_tests().await;

        logging::print_final_stats(
            stats.success,
            stats.failed,
            stats.activated,
            stats.total,
            &self.config.output_log_file,
        );
        Ok(())
    }

    async fn load_drafts(&self) -> Result<Vec<ReadingDraft>> {
        info!("\n📁 正在扫描待处理的草稿...");
        Ok(load_all_drafts(&self.config.draft_folder).await?)
    }

    async fn process_all_drafts(&self, all_drafts: Vec<ReadingDraft>) -> Result<ProcessingStats> {
        let max_concurrent = self.config.max_concurrent_drafts;
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let total_drafts = all_drafts.len();
        let total_batches = total_drafts.div_ceil(max_concurrent);
        let mut stats = ProcessingStats {
            total: total_drafts,
            ..Default::default()
        };

        for (batch_idx, batch_drafts) in all_drafts.chunks(max_concurrent).enumerate() {
            let batch_start = batch_idx * max_concurrent;
            let batch_num = batch_idx + 1;

            logging::log_batch_start(
                batch_num,
                total_batches,
                batch_start + 1,
                batch_start + batch_drafts.len(),
                total_drafts,
            );

            let batch_result = self
                .process_batch(batch_drafts, batch_start, semaphore.clone())
                .await?;

            stats.success += batch_result.success;
            stats.failed += batch_result.failed;
            stats.activated += batch_result.activated;

            logging::log_batch_complete(
                batch_num,
                batch_result.success,
                batch_result.success + batch_result.failed,
            );
        }

        Ok(stats)
    }

    async fn process_batch(
        &self,
        batch_drafts: &[ReadingDraft],
        batch_start: usize,
        semaphore: Arc<Semaphore>,
    ) -> Result<BatchResult> {
        let mut handles = Vec::new();

        for (idx, draft) in batch_drafts.iter().enumerate() {
            let draft_index = batch_start + idx + 1;
            let permit = semaphore.clone().acquire_owned().await?;

            // 每个草稿独立的组卷器，状态互不干扰
            let client = ReadingClient::new(&self.config);
            let draft = draft.clone();
            let config = self.config.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let mut composer = ReadingTestComposer::new(client);
                draft_processor::process_draft(&mut composer, &draft, draft_index, &config)
                    .await
                    .map_err(|e| {
                        error!("[草稿 {}] ❌ 处理过程中发生错误: {:#}", draft_index, e);
                        e
                    })
            });
            handles.push((draft_index, handle));
        }

        let mut result = BatchResult::default();
        let indices: Vec<usize> = handles.iter().map(|(i, _)| *i).collect();
        let outcomes = join_all(handles.into_iter().map(|(_, h)| h)).await;

        for (draft_index, outcome) in indices.into_iter().zip(outcomes) {
            match outcome {
                Ok(Ok(stats)) => result.record(&stats),
                Ok(Err(_)) => result.failed += 1,
                Err(e) => {
                    error!("[草稿 {}] 任务执行失败: {}", draft_index, e);
                    result.failed += 1;
                }
            }
        }

        Ok(result)
    }

    /// 列出后端现有试卷及完成情况（失败只记录警告）
    async fn log_remote_tests(&self) {
        let client = ReadingClient::new(&self.config);
        match client.list_tests().await {
            Ok(tests) => {
                info!("\n📚 后端现有阅读试卷: {} 套", tests.len());
                for test in &tests {
                    info!(
                        "  #{} {} [{}] {}/3 部分已完成",
                        test.exam_id,
                        logging::truncate_text(&test.title, 40),
                        if test.is_active { "已激活" } else { "未激活" },
                        test.completed_sections()
                    );
                }
            }
            Err(e) => warn!("⚠️ 无法获取试卷列表: {}", e),
        }
    }
}

/// 处理统计
#[derive(Debug, Default)]
struct ProcessingStats {
    success: usize,
    failed: usize,
    activated: usize,
    total: usize,
}

/// 批次处理结果
#[derive(Debug, Default)]
struct BatchResult {
    success: usize,
    failed: usize,
    activated: usize,
}

impl BatchResult {
    /// 所有部分都保存成功才算成功
    fn record(&mut self, stats: &DraftStats) {
        if stats.parts_failed == 0 {
            self.success += 1;
        } else {
            self.failed += 1;
        }
        if stats.exam_active {
            self.activated += 1;
        }
    }
}
