//! 部分处理上下文
//!
//! 封装"我正在处理哪份草稿、哪张试卷的第几部分"这一信息

use std::fmt::Display;

use crate::models::PartNumber;

/// 部分处理上下文
#[derive(Debug, Clone)]
pub struct PartCtx {
    /// 草稿索引（仅用于日志显示）
    pub draft_index: usize,

    /// 后端分配的试卷 ID，初始化前为 None
    pub exam_id: Option<u64>,

    pub part: PartNumber,
}

impl PartCtx {
    pub fn new(draft_index: usize, exam_id: Option<u64>, part: PartNumber) -> Self {
        Self {
            draft_index,
            exam_id,
            part,
        }
    }
}

impl Display for PartCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.exam_id {
            Some(id) => write!(f, "[草稿 {} 试卷#{} Part {}]", self.draft_index, id, self.part),
            None => write!(f, "[草稿 {} Part {}]", self.draft_index, self.part),
        }
    }
}
