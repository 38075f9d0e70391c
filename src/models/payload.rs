//! 与阅读管理后端交换的 JSON 结构

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::models::exam::Passage;
use crate::models::question::QuestionKind;

/// 初始化阅读试卷请求
#[derive(Debug, Clone, Serialize)]
pub struct InitializeTestRequest {
    pub title: String,
    pub duration: u32,
    pub total_marks: u32,
}

/// 初始化阅读试卷响应
#[derive(Debug, Clone, Deserialize)]
pub struct InitializeTestResponse {
    #[serde(default)]
    pub message: String,
    pub exam_id: u64,
    pub title: String,
    #[serde(default)]
    pub parts: u32,
    #[serde(default)]
    pub question_counts: BTreeMap<String, u32>,
}

/// 单个部分的保存请求
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartPayload {
    pub passage: Passage,
    pub question_groups: Vec<QuestionGroupPayload>,
}

impl PartPayload {
    pub fn question_count(&self) -> usize {
        self.question_groups.iter().map(|g| g.questions.len()).sum()
    }
}

/// 按说明区间分好的题组
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionGroupPayload {
    pub instruction: String,
    pub question_range: String,
    pub group_type: QuestionKind,
    pub order_number: u32,
    pub questions: Vec<QuestionPayload>,
    pub matching_options: Vec<MatchingOptionPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionPayload {
    pub question_text: String,
    pub question_type: QuestionKind,
    pub correct_answer: String,
    pub marks: u32,
    pub question_number: u32,
    pub options: Vec<ChoiceOptionPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paragraph_number: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOptionPayload {
    pub option_text: String,
    pub is_correct: bool,
}

/// 题组级匹配选项；标题匹配不带 option_text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchingOptionPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_text: Option<String>,
    pub description: String,
}

/// 保存部分的响应
#[derive(Debug, Clone, Deserialize)]
pub struct SavePartResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub exam_id: u64,
    #[serde(default)]
    pub section_id: Option<u64>,
    #[serde(default)]
    pub passage_id: Option<u64>,
    #[serde(default)]
    pub question_groups: usize,
    #[serde(default)]
    pub total_questions: usize,
    #[serde(default)]
    pub expected_questions: usize,
    #[serde(default)]
    pub total_marks: f64,
    #[serde(default)]
    pub is_exam_active: bool,
}

/// 已保存试卷详情
#[derive(Debug, Clone, Deserialize)]
pub struct ReadingTestDetail {
    pub exam_id: u64,
    pub title: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub sections: Vec<SectionDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectionDetail {
    pub section_id: u64,
    pub order_number: u32,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub total_marks: f64,
    #[serde(default)]
    pub expected_questions: usize,
    #[serde(default)]
    pub passage: Option<StoredPassage>,
    #[serde(default)]
    pub question_groups: Vec<StoredGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoredPassage {
    #[serde(default)]
    pub passage_id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub word_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoredGroup {
    pub group_id: u64,
    pub instruction: String,
    pub question_range: String,
    pub group_type: String,
    pub order_number: u32,
    #[serde(default)]
    pub questions: Vec<StoredQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoredQuestion {
    pub question_id: u64,
    #[serde(default)]
    pub question_number: u32,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub marks: u32,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub options: Vec<StoredOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoredOption {
    pub option_id: u64,
    pub text: String,
    pub is_correct: bool,
}

/// 删除试卷响应
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteTestResponse {
    #[serde(default)]
    pub message: String,
    pub exam_id: u64,
}

/// 试卷列表项
#[derive(Debug, Clone, Deserialize)]
pub struct ReadingTestSummary {
    pub exam_id: u64,
    pub title: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub sections: Vec<SectionStatus>,
}

impl ReadingTestSummary {
    pub fn completed_sections(&self) -> usize {
        self.sections.iter().filter(|s| s.is_complete).count()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectionStatus {
    pub section_id: u64,
    pub order_number: u32,
    pub has_passage: bool,
    pub questions_count: usize,
    pub expected_questions: usize,
    pub is_complete: bool,
}

/// 后端错误体，`detail` 可能是字符串也可能是校验错误数组
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorBody {
    pub fn detail_text(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}
