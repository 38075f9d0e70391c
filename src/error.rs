use thiserror::Error;

use crate::models::{PartNumber, QuestionKind};

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 本地校验错误（不会发往后端）
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 本地校验错误
///
/// 全部同步产生，阻止当前操作，由操作员修正后重试
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 试卷标题为空
    #[error("Test title is required")]
    EmptyTitle,
    /// 尚未初始化试卷
    #[error("阅读试卷尚未初始化")]
    NotInitialized,
    /// 部分编号超出 1..=3
    #[error("Part number must be between 1 and 3, got {0}")]
    PartOutOfRange(u32),
    /// 批量数量或分值非法
    #[error("批量参数非法: count={count}, marks={marks}")]
    InvalidBatch { count: u32, marks: u32 },
    /// 数量超过剩余名额
    #[error("Cannot add {requested} questions. Only {remaining} more questions allowed for Part {part}.")]
    TooManyQuestions {
        part: PartNumber,
        requested: u32,
        remaining: u32,
    },
    /// 题号超出该部分上限
    #[error("Cannot add {count} questions starting at {start}. Would exceed the limit for Part {part}.")]
    ExceedsPartCeiling {
        part: PartNumber,
        start: u32,
        count: u32,
    },
    /// 题号与已有题目冲突
    #[error("Question numbers {} already exist in Part {part}", join_numbers(.numbers))]
    NumberCollision { part: PartNumber, numbers: Vec<u32> },
    /// 题号不属于该部分
    #[error("Question number {number} is out of range for part {part}. Must be between {min} and {max}.")]
    NumberOutOfPart {
        part: PartNumber,
        number: u32,
        min: u32,
        max: u32,
    },
    /// 题目索引越界
    #[error("题目索引 {index} 超出范围 (共 {len} 题)")]
    QuestionIndexOutOfRange { index: usize, len: usize },
    /// 题号不存在
    #[error("Question {number} does not exist in the active part")]
    QuestionNotFound { number: u32 },
    /// 选项索引越界
    #[error("选项索引 {index} 超出范围 (共 {len} 个)")]
    OptionIndexOutOfRange { index: usize, len: usize },
    /// 说明区间索引越界
    #[error("说明区间索引 {index} 超出范围 (共 {len} 个)")]
    InstructionIndexOutOfRange { index: usize, len: usize },
    /// 选择题中找不到该选项
    #[error("选项 {value} 不存在")]
    UnknownChoice { value: String },
    /// 匹配选项不存在
    #[error("匹配选项 {key} 不存在")]
    UnknownMatchingKey { key: String },
    /// 题目不由该选项集合作答
    #[error("题目 {question} 不属于题目 {owner} 的匹配题组")]
    OutsideMatchingBlock { question: u32, owner: u32 },
    /// 匹配选项 key 重复
    #[error("匹配选项 {key} 已存在")]
    DuplicateMatchingKey { key: String },
    /// 编辑与当前题型不兼容
    #[error("{edit} 不适用于题型 {kind}")]
    IncompatibleEdit { edit: &'static str, kind: QuestionKind },
    /// 未知题型
    #[error("未知题型: {0}")]
    UnknownQuestionType(String),
    /// 无法解析题目标签
    #[error("无法解析题目标签: {0}")]
    InvalidLabel(String),
    /// 无法解析题号区间
    #[error("无法解析题号区间: {0}")]
    InvalidRange(String),
    /// 说明文字为空
    #[error("Instruction text is required")]
    EmptyInstruction,
    /// 起始题号大于结束题号
    #[error("Start question number must be less than or equal to end question number ({start} > {end})")]
    InvertedRange { start: u32, end: u32 },
    /// 说明编辑器未打开
    #[error("说明编辑器未打开")]
    EditorClosed,
    /// 文章内容为空
    #[error("Passage content is required")]
    EmptyPassage,
    /// 没有题目
    #[error("At least one question is required")]
    NoQuestions,
    /// 题目数量不等于期望值
    #[error("Part {part} must have exactly {expected} questions, but got {actual}")]
    WrongQuestionCount {
        part: PartNumber,
        expected: usize,
        actual: usize,
    },
    /// 没有说明区间
    #[error("Please add at least one instruction for the questions")]
    NoInstructions,
    /// 有题目未被任何说明区间覆盖
    #[error("Questions {} are not covered by any instruction group. Please add instructions for all question ranges.", join_numbers(.numbers))]
    UncoveredQuestions { numbers: Vec<u32> },
    /// 有题目被多个说明区间覆盖
    #[error("Questions {} are covered by more than one instruction group", join_numbers(.numbers))]
    OverlappingInstructions { numbers: Vec<u32> },
    /// 已有保存请求在进行中
    #[error("已有保存请求正在进行中")]
    SaveInFlight,
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 后端拒绝请求，`detail` 原样透出
    #[error("{detail}")]
    Rejected {
        endpoint: String,
        status: u16,
        detail: String,
    },
    /// 网络请求失败
    #[error("{fallback} ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        fallback: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// JSON 解析失败
    #[error("JSON解析失败 ({endpoint}): {source}")]
    JsonParseFailed {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// 后端返回的原始 detail（仅 Rejected 有）
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { detail, .. } => Some(detail),
            _ => None,
        }
    }
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("删除文件失败 ({path}): {source}")]
    DeleteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: &'static str,
    },
    /// 必需的配置为空
    #[error("配置项 {var_name} 不能为空")]
    Missing { var_name: &'static str },
}

fn join_numbers(numbers: &[u32]) -> String {
    numbers
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
