/// 阅读管理后端客户端
///
/// 封装所有与阅读试卷相关的 API 调用
use async_trait::async_trait;
use tracing::debug;

use crate::config::Config;
use crate::error::ApiError;
use crate::infrastructure::HttpExecutor;
use crate::models::payload::{
    DeleteTestResponse, InitializeTestRequest, InitializeTestResponse, PartPayload, ReadingTestDetail,
    ReadingTestSummary, SavePartResponse,
};
use crate::models::PartNumber;

const INITIALIZE_ENDPOINT: &str = "admin/reading/initialize-reading-test";
const LIST_ENDPOINT: &str = "admin/reading/reading-tests";

/// 阅读后端能力
///
/// 组卷器只依赖这个 trait，测试中可替换为内存实现
#[async_trait]
pub trait ReadingBackend: Send + Sync {
    /// 创建试卷，返回后端分配的 exam_id
    async fn initialize_test(
        &self,
        request: &InitializeTestRequest,
    ) -> Result<InitializeTestResponse, ApiError>;

    /// 保存单个部分
    async fn save_part(
        &self,
        exam_id: u64,
        part: PartNumber,
        payload: &PartPayload,
    ) -> Result<SavePartResponse, ApiError>;

    /// 获取已保存的试卷详情
    async fn get_test(&self, exam_id: u64) -> Result<ReadingTestDetail, ApiError>;

    /// 列出全部阅读试卷
    async fn list_tests(&self) -> Result<Vec<ReadingTestSummary>, ApiError>;

    /// 删除试卷及其全部部分
    async fn delete_test(&self, exam_id: u64) -> Result<DeleteTestResponse, ApiError>;
}

/// 基于 HTTP 的阅读后端客户端
pub struct ReadingClient {
    executor: HttpExecutor,
}

impl ReadingClient {
    /// 创建新的阅读客户端
    pub fn new(config: &Config) -> Self {
        Self {
            executor: HttpExecutor::new(config.api_base_url.clone(), config.access_token.clone()),
        }
    }

    pub fn base_url(&self) -> &str {
        self.executor.base_url()
    }
}

fn part_endpoint(exam_id: u64, part: PartNumber) -> String {
    format!("admin/reading/reading-test/{}/part/{}", exam_id, part)
}

fn detail_endpoint(exam_id: u64) -> String {
    format!("admin/reading/reading-test/{}", exam_id)
}

#[async_trait]
impl ReadingBackend for ReadingClient {
    async fn initialize_test(
        &self,
        request: &InitializeTestRequest,
    ) -> Result<InitializeTestResponse, ApiError> {
        let response: InitializeTestResponse = self
            .executor
            .post_json(INITIALIZE_ENDPOINT, request, "Failed to initialize test")
            .await?;
        debug!("初始化试卷结果: exam_id={} {}", response.exam_id, response.message);
        Ok(response)
    }

    async fn save_part(
        &self,
        exam_id: u64,
        part: PartNumber,
        payload: &PartPayload,
    ) -> Result<SavePartResponse, ApiError> {
        let response: SavePartResponse = self
            .executor
            .post_json(&part_endpoint(exam_id, part), payload, "Failed to save part")
            .await?;
        debug!(
            "保存 Part {} 结果: {} 题 / 期望 {} 题, active={}",
            part, response.total_questions, response.expected_questions, response.is_exam_active
        );
        Ok(response)
    }

    async fn get_test(&self, exam_id: u64) -> Result<ReadingTestDetail, ApiError> {
        self.executor
            .get_json(&detail_endpoint(exam_id), "Failed to fetch reading test")
            .await
    }

    async fn list_tests(&self) -> Result<Vec<ReadingTestSummary>, ApiError> {
        self.executor
            .get_json(LIST_ENDPOINT, "Failed to fetch reading tests")
            .await
    }

    async fn delete_test(&self, exam_id: u64) -> Result<DeleteTestResponse, ApiError> {
        self.executor
            .delete_json(&detail_endpoint(exam_id), "Failed to delete reading test")
            .await
    }
}
