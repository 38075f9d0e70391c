//! 单个草稿处理器 - 编排层
//!
//! ## 职责
//!
//! 把一份 `ReadingDraft` 回放到组卷器中，是草稿级别的编排器。
//!
//! ## 核心功能
//!
//! 1. **建卷**：初始化新试卷，或按 `exam_id` 续编
//! 2. **逐部分回放**：文章 → 批量出题 → 匹配选项 → 逐题编辑 → 额外说明
//! 3. **逐部分保存**：每个部分一次请求，失败不影响其他部分
//! 4. **激活收尾**：试卷激活后等待片刻，按配置删除草稿文件
//! 5. **统计输出**：记录保存成功/失败的部分数

use anyhow::Result;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::clients::ReadingBackend;
use crate::config::Config;
use crate::error::{AppResult, FileError, ValidationError};
use crate::models::{
    ChoiceSet, DraftBatch, DraftEdit, DraftMatching, DraftPart, PartNumber, PassageField,
    QuestionBody, ReadingDraft,
};
use crate::services::{matching_owner, QuestionEdit};
use crate::workflow::{PartCtx, ReadingTestComposer};

/// 草稿处理统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DraftStats {
    pub exam_id: Option<u64>,
    pub parts_saved: usize,
    pub parts_failed: usize,
    /// 续编时后端已完整的部分
    pub parts_skipped: usize,
    pub exam_active: bool,
}

/// 处理单个草稿
///
/// # 参数
/// - `composer`: 组卷器（持有后端）
/// - `draft`: 草稿数据
/// - `draft_index`: 草稿索引（用于日志）
/// - `config`: 配置
///
/// # 返回
/// 建卷失败返回错误；部分保存失败只计入统计
pub async fn process_draft<B: ReadingBackend>(
    composer: &mut ReadingTestComposer<B>,
    draft: &ReadingDraft,
    draft_index: usize,
    config: &Config,
) -> Result<DraftStats> {
    log_draft_start(draft_index, draft);

    let exam_id = match draft.exam_id {
        Some(exam_id) => {
            info!("[草稿 {}] 🔄 续编已有试卷 #{}", draft_index, exam_id);
            composer.resume(exam_id).await?;
            exam_id
        }
        None => {
            composer
                .initialize(&draft.title, draft.duration, draft.total_marks)
                .await?
        }
    };

    let mut stats = DraftStats {
        exam_id: Some(exam_id),
        ..Default::default()
    };

    for part in &draft.parts {
        let number = match PartNumber::new(part.number) {
            Ok(number) => number,
            Err(e) => {
                error!("[草稿 {}] ❌ {}", draft_index, e);
                stats.parts_failed += 1;
                continue;
            }
        };
        let ctx = PartCtx::new(draft_index, Some(exam_id), number);

        let already_complete = composer
            .exam()
            .map(|exam| exam.part(number).is_complete())
            .unwrap_or(false);
        if already_complete {
            info!("{} ⏭️ 后端已有完整内容，跳过", ctx);
            stats.parts_skipped += 1;
            continue;
        }

        let saved = match replay_part(composer, part, &ctx) {
            Ok(()) => composer.save_active_part().await,
            Err(e) => Err(e),
        };

        match saved {
            Ok(outcome) => {
                info!("{} ✓ {}", ctx, outcome.message);
                stats.parts_saved += 1;
            }
            Err(e) => {
                error!("{} ❌ 处理失败: {}", ctx, e);
                stats.parts_failed += 1;
            }
        }
    }

    stats.exam_active = composer.is_exam_active();
    if stats.exam_active {
        info!(
            "[草稿 {}] 🎉 试卷 #{} 已激活，{} 秒后收尾",
            draft_index, exam_id, config.activation_redirect_delay_secs
        );
        tokio::time::sleep(Duration::from_secs(config.activation_redirect_delay_secs)).await;
        if config.remove_finished_drafts {
            cleanup_file(draft.file_path.as_deref(), draft_index).await?;
        }
    }

    log_draft_complete(draft_index, &stats);
    Ok(stats)
}

/// 把一个部分的草稿内容回放到组卷器（不保存）
pub fn replay_part<B: ReadingBackend>(
    composer: &mut ReadingTestComposer<B>,
    part: &DraftPart,
    ctx: &PartCtx,
) -> AppResult<()> {
    composer.select_part(ctx.part);
    composer.update_passage(PassageField::Title, part.passage.title.clone())?;
    composer.update_passage(PassageField::Content, part.passage.content.clone())?;

    for batch in &part.batches {
        apply_batch(composer, batch, ctx)?;
    }

    for matching in &part.matching {
        import_matching(composer, matching, ctx)?;
    }

    for edit in &part.edits {
        apply_edit(composer, edit).map_err(|e| {
            warn!("{} ⚠️ 题目 {} 编辑失败: {}", ctx, edit.question(), e);
            e
        })?;
    }

    for instruction in &part.instructions {
        composer
            .instruction_editor_mut()
            .open_new(instruction.start, instruction.end, instruction.text.clone());
        composer.save_instruction()?;
    }

    Ok(())
}

fn apply_batch<B: ReadingBackend>(
    composer: &mut ReadingTestComposer<B>,
    batch: &DraftBatch,
    ctx: &PartCtx,
) -> AppResult<()> {
    let request = composer.batch_request_mut();
    request.kind = batch.kind;
    request.count = batch.count;
    request.marks = batch.marks;
    if let Some(start) = batch.start_number {
        request.start_number = start;
    }

    let range = composer.add_batch()?;

    match &batch.instruction {
        Some(text) => {
            if let Some(draft) = composer.instruction_editor_mut().draft_mut() {
                draft.text = text.clone();
            }
            composer.save_instruction()?;
        }
        None => {
            // 没有说明文字的批次交给 [[parts.instructions]] 覆盖
            composer.instruction_editor_mut().cancel();
            info!(
                "{} 批次 {}-{} 未附带说明",
                ctx,
                range.start(),
                range.end()
            );
        }
    }
    Ok(())
}

fn import_matching<B: ReadingBackend>(
    composer: &mut ReadingTestComposer<B>,
    matching: &DraftMatching,
    ctx: &PartCtx,
) -> AppResult<()> {
    let index = composer.index_of(matching.question)?;
    let kind = composer.active_part()?.questions[index].kind();
    let style = kind
        .matching_style()
        .ok_or(ValidationError::IncompatibleEdit {
            edit: "replace_matching_set",
            kind,
        })?;

    let imported = matching.to_matching_set(style)?;
    if !imported.conflicts.is_empty() {
        warn!(
            "{} ⚠️ 题目 {:?} 被多个选项声明为答案，以后出现的为准",
            ctx, imported.conflicts
        );
    }
    composer.edit_question(index, QuestionEdit::ReplaceMatchingSet(imported.set))?;
    Ok(())
}

fn apply_edit<B: ReadingBackend>(
    composer: &mut ReadingTestComposer<B>,
    edit: &DraftEdit,
) -> Result<(), ValidationError> {
    let number = edit.question();
    let index = composer.index_of(number)?;

    let question_edit = match edit {
        DraftEdit::Answer { value, .. } => {
            let body = &composer.active_part()?.questions[index].body;
            match body {
                QuestionBody::FillBlank { .. } | QuestionBody::ShortAnswer { .. } => {
                    QuestionEdit::SetAnswer(value.clone())
                }
                QuestionBody::MultipleChoice(set) | QuestionBody::TrueFalse(set) => {
                    QuestionEdit::MarkCorrectChoice(choice_index(set, value)?)
                }
                QuestionBody::Matching { .. } => {
                    let owner = matching_owner(composer.active_part()?, number).ok_or_else(
                        || ValidationError::UnknownMatchingKey { key: value.clone() },
                    )?;
                    return composer.edit_question(
                        owner,
                        QuestionEdit::AssignMatchingAnswer {
                            question: number,
                            key: value.clone(),
                        },
                    );
                }
            }
        }
        DraftEdit::ChoiceText { option, text, .. } => QuestionEdit::SetChoiceText {
            option: *option,
            text: text.clone(),
        },
        DraftEdit::CorrectChoice { option, .. } => QuestionEdit::MarkCorrectChoice(*option),
        DraftEdit::Marks { marks, .. } => QuestionEdit::SetMarks(*marks),
        DraftEdit::Kind { kind, .. } => QuestionEdit::SetKind(*kind),
        DraftEdit::Paragraph {
            paragraph_number, ..
        } => QuestionEdit::SetParagraphNumber(*paragraph_number),
    };

    composer.edit_question(index, question_edit)
}

/// 选择题答案：先按选项文本匹配，再按字母（A/B/C/D）
fn choice_index(set: &ChoiceSet, value: &str) -> Result<usize, ValidationError> {
    if let Some(index) = set.position_of(value) {
        return Ok(index);
    }
    let value = value.trim();
    let mut chars = value.chars();
    if let (Some(letter), None) = (chars.next(), chars.next()) {
        let letter = letter.to_ascii_uppercase();
        if letter.is_ascii_uppercase() {
            let index = (letter as u8 - b'A') as usize;
            if index < set.options.len() {
                return Ok(index);
            }
        }
    }
    Err(ValidationError::UnknownChoice {
        value: value.to_string(),
    })
}

/// 清理已处理的草稿文件
async fn cleanup_file(file_path: Option<&str>, draft_index: usize) -> Result<(), FileError> {
    info!("[草稿 {}] 🗑️ 清理已处理的文件...", draft_index);

    let Some(file_path) = file_path else {
        warn!("[草稿 {}] ⚠️ 文件路径未设置", draft_index);
        return Ok(());
    };

    let path = Path::new(file_path);
    if !path.exists() {
        warn!("[草稿 {}] ⚠️ 文件不存在: {}", draft_index, file_path);
        return Ok(());
    }

    tokio::fs::remove_file(path)
        .await
        .map_err(|source| FileError::DeleteFailed {
            path: file_path.to_string(),
            source,
        })?;
    info!(
        "[草稿 {}] ✓ 文件已删除: {}",
        draft_index,
        path.file_name().unwrap_or_default().to_string_lossy()
    );
    Ok(())
}

// ========== 日志辅助函数 ==========

fn log_draft_start(draft_index: usize, draft: &ReadingDraft) {
    info!("[草稿 {}] 开始处理", draft_index);
    info!("[草稿 {}] 标题: {}", draft_index, draft.title);
    info!(
        "[草稿 {}] 部分数: {}, 批量题目总数: {}",
        draft_index,
        draft.parts.len(),
        draft.question_total()
    );
}

fn log_draft_complete(draft_index: usize, stats: &DraftStats) {
    info!(
        "[草稿 {}] 部分统计: 保存 {}, 跳过 {}, 失败 {}",
        draft_index, stats.parts_saved, stats.parts_skipped, stats.parts_failed
    );
    info!("\n[草稿 {}] ✅ 草稿处理完成\n", draft_index);
}
