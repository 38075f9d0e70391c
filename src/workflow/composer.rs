//! 阅读试卷组卷器 - 流程层
//!
//! 核心职责：持有一张试卷的内存状态，并定义"保存一个部分"的完整流程
//!
//! 流程顺序：
//! 1. initialize / resume → 得到 exam_id
//! 2. 批量出题 → 逐题编辑 → 配置说明区间
//! 3. 本地校验 + 分组 → 提交（每个部分一次）

use std::ops::RangeInclusive;
use tracing::{error, info, warn};

use crate::clients::ReadingBackend;
use crate::error::{ApiError, AppResult, ValidationError};
use crate::models::payload::{
    InitializeTestRequest, PartPayload, ReadingTestDetail, SavePartResponse, SectionDetail,
    StoredGroup, StoredQuestion,
};
use crate::models::exam::{DEFAULT_DURATION, DEFAULT_TOTAL_MARKS};
use crate::models::question::CHOICE_OPTION_COUNT;
use crate::models::{
    parse_label, ChoiceSet, Exam, InstructionRange, MatchingOption, MatchingSet, MatchingStyle, Part,
    PartNumber, PassageField, Question, QuestionBody, QuestionKind,
};
use crate::services::{
    build_part_payload, instruction_manager, interleave, BatchRequest, InstructionEditor,
    LayoutRow, QuestionEdit, QuestionEditor,
};

/// 一次部分保存的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub part: PartNumber,
    pub exam_active: bool,
    pub total_questions: usize,
    pub message: String,
}

/// 已通过本地校验、等待提交的保存请求
#[derive(Debug, Clone)]
pub struct PendingSave {
    pub exam_id: u64,
    pub part: PartNumber,
    pub payload: PartPayload,
}

/// 阅读试卷组卷器
///
/// - 持有试卷树、当前部分、批量参数、说明编辑器
/// - 所有修改都是同步的，只有初始化 / 续编 / 保存会访问后端
/// - 不持有 HTTP 资源，只依赖 `ReadingBackend`
pub struct ReadingTestComposer<B: ReadingBackend> {
    backend: B,
    exam: Option<Exam>,
    active: PartNumber,
    batch: BatchRequest,
    instruction_editor: InstructionEditor,
    loading: bool,
    exam_active: bool,
}

impl<B: ReadingBackend> ReadingTestComposer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            exam: None,
            active: PartNumber::ONE,
            batch: BatchRequest::default(),
            instruction_editor: InstructionEditor::default(),
            loading: false,
            exam_active: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn exam(&self) -> Option<&Exam> {
        self.exam.as_ref()
    }

    pub fn exam_id(&self) -> Option<u64> {
        self.exam.as_ref().map(|e| e.id)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_exam_active(&self) -> bool {
        self.exam_active
    }

    // ========== 试卷生命周期 ==========

    /// 在后端创建试卷
    pub async fn initialize(
        &mut self,
        title: &str,
        duration: u32,
        total_marks: u32,
    ) -> AppResult<u64> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }

        let request = InitializeTestRequest {
            title: title.to_string(),
            duration,
            total_marks,
        };
        let response = self.backend.initialize_test(&request).await?;

        info!("✓ 试卷已创建: #{} {}", response.exam_id, response.title);
        self.exam = Some(Exam::new(
            response.exam_id,
            response.title,
            duration,
            total_marks,
        ));
        self.reset_editing_state();
        Ok(response.exam_id)
    }

    /// 载入已保存的试卷继续编辑
    pub async fn resume(&mut self, exam_id: u64) -> AppResult<()> {
        let detail = self.backend.get_test(exam_id).await?;
        let exam = hydrate_exam(&detail);
        info!(
            "✓ 已载入试卷 #{} {}，题目数: {}/{}/{}",
            exam.id,
            exam.title,
            exam.parts[0].questions.len(),
            exam.parts[1].questions.len(),
            exam.parts[2].questions.len()
        );
        self.exam_active = detail.is_active;
        self.exam = Some(exam);
        self.reset_editing_state();
        Ok(())
    }

    /// 删除后端试卷并清空本地状态
    pub async fn discard(&mut self) -> AppResult<()> {
        let exam_id = self.exam_id().ok_or(ValidationError::NotInitialized)?;
        let response = self.backend.delete_test(exam_id).await?;
        info!("🗑️ 试卷 #{} 已删除: {}", response.exam_id, response.message);
        self.exam = None;
        self.exam_active = false;
        self.reset_editing_state();
        Ok(())
    }

    fn reset_editing_state(&mut self) {
        self.active = PartNumber::ONE;
        self.batch = BatchRequest::default();
        self.instruction_editor = InstructionEditor::default();
        self.loading = false;
    }

    // ========== 部分选择 ==========

    pub fn select_part(&mut self, part: PartNumber) {
        self.active = part;
    }

    pub fn active_part_number(&self) -> PartNumber {
        self.active
    }

    pub fn active_part(&self) -> Result<&Part, ValidationError> {
        self.exam
            .as_ref()
            .map(|e| e.part(self.active))
            .ok_or(ValidationError::NotInitialized)
    }

    fn active_part_mut(&mut self) -> Result<&mut Part, ValidationError> {
        let active = self.active;
        self.exam
            .as_mut()
            .map(|e| e.part_mut(active))
            .ok_or(ValidationError::NotInitialized)
    }

    /// 当前部分的展示顺序
    pub fn layout(&self) -> Result<Vec<LayoutRow<'_>>, ValidationError> {
        Ok(interleave(self.active_part()?))
    }

    // ========== 批量出题 ==========

    pub fn batch_request(&self) -> &BatchRequest {
        &self.batch
    }

    pub fn batch_request_mut(&mut self) -> &mut BatchRequest {
        &mut self.batch
    }

    /// 按当前批量参数出题，成功后以新题号区间打开说明编辑器
    pub fn add_batch(&mut self) -> Result<RangeInclusive<u32>, ValidationError> {
        let active = self.active;
        let part = self
            .exam
            .as_mut()
            .map(|e| e.part_mut(active))
            .ok_or(ValidationError::NotInitialized)?;
        let range = self.batch.generate(part)?;

        info!(
            "✓ Part {} 新增 {} 道 {} 题: {}-{}",
            active,
            range.end() - range.start() + 1,
            self.batch.kind.label(),
            range.start(),
            range.end()
        );
        self.instruction_editor
            .open_new(*range.start(), *range.end(), "");
        Ok(range)
    }

    // ========== 逐题编辑 ==========

    pub fn edit_question(&mut self, index: usize, edit: QuestionEdit) -> Result<(), ValidationError> {
        QuestionEditor::new(self.active_part_mut()?).apply(index, edit)
    }

    /// 按题号定位题目并编辑
    pub fn edit_question_number(
        &mut self,
        number: u32,
        edit: QuestionEdit,
    ) -> Result<(), ValidationError> {
        let index = self.index_of(number)?;
        self.edit_question(index, edit)
    }

    pub fn index_of(&self, number: u32) -> Result<usize, ValidationError> {
        self.active_part()?
            .index_of(number)
            .ok_or(ValidationError::QuestionNotFound { number })
    }

    pub fn add_question(&mut self) -> Result<u32, ValidationError> {
        let marks = self.batch.marks;
        QuestionEditor::new(self.active_part_mut()?).add_question(marks)
    }

    pub fn remove_question(&mut self, index: usize) -> Result<Question, ValidationError> {
        QuestionEditor::new(self.active_part_mut()?).remove_question(index)
    }

    pub fn add_matching_option(&mut self, index: usize) -> Result<String, ValidationError> {
        QuestionEditor::new(self.active_part_mut()?).add_matching_option(index)
    }

    pub fn remove_matching_option(
        &mut self,
        index: usize,
        option: usize,
    ) -> Result<(), ValidationError> {
        QuestionEditor::new(self.active_part_mut()?).remove_matching_option(index, option)
    }

    pub fn update_passage(
        &mut self,
        field: PassageField,
        value: impl Into<String>,
    ) -> Result<(), ValidationError> {
        QuestionEditor::new(self.active_part_mut()?).update_passage(field, value);
        Ok(())
    }

    // ========== 说明区间 ==========

    pub fn instruction_editor(&self) -> &InstructionEditor {
        &self.instruction_editor
    }

    pub fn instruction_editor_mut(&mut self) -> &mut InstructionEditor {
        &mut self.instruction_editor
    }

    /// 以默认区间和默认文字新建说明
    pub fn open_new_instruction(&mut self) {
        self.instruction_editor.open_default();
    }

    /// 载入当前部分的第 `index` 个说明区间进行编辑
    pub fn open_instruction(&mut self, index: usize) -> Result<(), ValidationError> {
        let active = self.active;
        let exam = self.exam.as_ref().ok_or(ValidationError::NotInitialized)?;
        self.instruction_editor
            .open_existing(&exam.part(active).instructions, index)
    }

    pub fn save_instruction(&mut self) -> Result<usize, ValidationError> {
        let active = self.active;
        let exam = self.exam.as_mut().ok_or(ValidationError::NotInitialized)?;
        self.instruction_editor
            .save(&mut exam.part_mut(active).instructions)
    }

    pub fn remove_instruction(&mut self, index: usize) -> Result<InstructionRange, ValidationError> {
        instruction_manager::remove_instruction(&mut self.active_part_mut()?.instructions, index)
    }

    // ========== 保存 ==========

    /// 本地校验当前部分并进入保存中状态
    ///
    /// 校验失败时不进入保存中状态
    pub fn begin_save(&mut self) -> Result<PendingSave, ValidationError> {
        if self.loading {
            return Err(ValidationError::SaveInFlight);
        }
        let exam_id = self.exam_id().ok_or(ValidationError::NotInitialized)?;
        let part = self.active;
        let payload = build_part_payload(self.active_part()?)?;

        self.loading = true;
        Ok(PendingSave {
            exam_id,
            part,
            payload,
        })
    }

    /// 结束保存中状态并解释后端响应
    pub fn finish_save(
        &mut self,
        part: PartNumber,
        result: Result<SavePartResponse, ApiError>,
    ) -> AppResult<SaveOutcome> {
        self.loading = false;
        let response = result.map_err(|e| {
            error!("❌ Part {} 保存失败: {}", part, e);
            e
        })?;

        if response.is_exam_active {
            self.exam_active = true;
        }
        let message = if response.is_exam_active {
            format!(
                "Part {} saved successfully. All parts completed! Exam is now active.",
                part
            )
        } else {
            format!("Part {} saved successfully.", part)
        };
        info!("✅ {}", message);

        Ok(SaveOutcome {
            part,
            exam_active: response.is_exam_active,
            total_questions: response.total_questions,
            message,
        })
    }

    /// 校验、分组并提交当前部分（恰好一次请求）
    pub async fn save_active_part(&mut self) -> AppResult<SaveOutcome> {
        let pending = self.begin_save().map_err(|e| {
            warn!("⚠️ Part {} 未通过本地校验: {}", self.active, e);
            e
        })?;
        info!(
            "📤 正在保存 Part {}: {} 个题组 / {} 道题",
            pending.part,
            pending.payload.question_groups.len(),
            pending.payload.question_count()
        );
        let result = self
            .backend
            .save_part(pending.exam_id, pending.part, &pending.payload)
            .await;
        self.finish_save(pending.part, result)
    }
}

// ========== 从已保存的试卷还原 ==========

fn hydrate_exam(detail: &ReadingTestDetail) -> Exam {
    let mut exam = Exam::new(
        detail.exam_id,
        detail.title.clone(),
        DEFAULT_DURATION,
        DEFAULT_TOTAL_MARKS,
    );
    let mut duration = 0;
    for section in &detail.sections {
        match PartNumber::new(section.order_number) {
            Ok(number) => {
                duration += section.duration;
                hydrate_part(exam.part_mut(number), section);
            }
            Err(e) => warn!("⚠️ 跳过无法识别的部分: {}", e),
        }
    }
    if duration > 0 {
        exam.duration = duration;
    }
    exam
}

fn hydrate_part(part: &mut Part, section: &SectionDetail) {
    if let Some(passage) = &section.passage {
        part.passage.title = passage.title.clone().unwrap_or_default();
        part.passage.content = passage.content.clone().unwrap_or_default();
    }

    let mut groups: Vec<&StoredGroup> = section.question_groups.iter().collect();
    groups.sort_by_key(|g| g.order_number);

    for group in groups {
        match InstructionRange::from_stored(&group.question_range, group.instruction.clone()) {
            Ok(range) => part.instructions.push(range),
            Err(e) => warn!("⚠️ Part {} 题组 #{} 区间无法解析: {}", part.number, group.group_id, e),
        }
        part.questions.extend(hydrate_group(group));
    }
    part.questions.sort_by_key(|q| q.number);
}

fn hydrate_group(group: &StoredGroup) -> Vec<Question> {
    // 题号无法确定的行直接丢弃
    let mut numbered: Vec<(u32, &StoredQuestion)> = group
        .questions
        .iter()
        .filter_map(|q| stored_number(q).map(|number| (number, q)))
        .collect();
    numbered.sort_by_key(|(number, _)| *number);

    let mut questions: Vec<Question> = numbered
        .iter()
        .map(|(number, q)| {
            let kind = QuestionKind::from_code(&q.kind)
                .or_else(|_| QuestionKind::from_code(&group.group_type))
                .unwrap_or_else(|e| {
                    warn!("⚠️ {}，按简答题处理", e);
                    QuestionKind::ShortAnswer
                });
            Question::new(*number, q.marks.max(1), hydrate_body(kind, q))
        })
        .collect();

    let stored: Vec<&StoredQuestion> = numbered.into_iter().map(|(_, q)| q).collect();
    rebuild_matching(&mut questions, &stored);
    questions
}

/// 早期数据没有 question_number，只能从 "Question <N>" 文本里取
fn stored_number(stored: &StoredQuestion) -> Option<u32> {
    if stored.question_number > 0 {
        return Some(stored.question_number);
    }
    match parse_label(&stored.text) {
        Ok(number) => Some(number),
        Err(e) => {
            warn!("⚠️ 题目 #{} {}，已跳过", stored.question_id, e);
            None
        }
    }
}

fn hydrate_body(kind: QuestionKind, stored: &StoredQuestion) -> QuestionBody {
    match kind {
        QuestionKind::MultipleChoice | QuestionKind::TrueFalse => {
            let mut set = if stored.options.is_empty() {
                match kind {
                    QuestionKind::TrueFalse => ChoiceSet::true_false(),
                    _ => ChoiceSet::blank(CHOICE_OPTION_COUNT),
                }
            } else {
                ChoiceSet {
                    options: stored.options.iter().map(|o| o.text.clone()).collect(),
                    correct: None,
                }
            };
            set.correct = stored
                .options
                .iter()
                .position(|o| o.is_correct)
                .or_else(|| set.position_of(&stored.correct_answer));
            if kind == QuestionKind::TrueFalse {
                QuestionBody::TrueFalse(set)
            } else {
                QuestionBody::MultipleChoice(set)
            }
        }
        QuestionKind::FillBlank => QuestionBody::FillBlank {
            answer: stored.correct_answer.clone(),
        },
        QuestionKind::ShortAnswer => QuestionBody::ShortAnswer {
            answer: stored.correct_answer.clone(),
        },
        _ => QuestionBody::skeleton(kind, false),
    }
}

/// 后端不保存题组级匹配选项，只能从各题的答案反推一份选项集合，
/// 挂在组内第一道匹配题上
fn rebuild_matching(questions: &mut [Question], stored: &[&StoredQuestion]) {
    let mut set = MatchingSet::default();
    let mut anchor: Option<(usize, MatchingStyle)> = None;
    let mut position = 0u32;

    for (i, question) in questions.iter_mut().enumerate() {
        let style = match &mut question.body {
            QuestionBody::Matching {
                style,
                paragraph_number,
                ..
            } => {
                position += 1;
                if *style == MatchingStyle::Headings {
                    *paragraph_number = Some(position);
                }
                *style
            }
            _ => continue,
        };
        if anchor.is_none() {
            anchor = Some((i, style));
        }

        let answer = stored[i]
            .correct_answer
            .split(',')
            .next()
            .map(str::trim)
            .unwrap_or_default();
        if answer.is_empty() {
            continue;
        }

        let key = match style {
            MatchingStyle::Headings => match set.options.iter().find(|o| o.description == answer) {
                Some(option) => option.key.clone(),
                None => {
                    let key = set.next_key(style);
                    set.options.push(MatchingOption::new(key.clone(), answer));
                    key
                }
            },
            MatchingStyle::Names | MatchingStyle::Other => {
                if set.option(answer).is_none() {
                    set.options.push(MatchingOption::new(answer, ""));
                }
                answer.to_string()
            }
        };
        set.answers.insert(question.number, key);
    }

    if let Some((index, _)) = anchor {
        if let QuestionBody::Matching { set: slot, .. } = &mut questions[index].body {
            *slot = (!set.is_empty()).then_some(set);
        }
    }
}
