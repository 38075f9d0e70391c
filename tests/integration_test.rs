use async_trait::async_trait;
use reading_composer::clients::ReadingBackend;
use reading_composer::error::{ApiError, AppError, ValidationError};
use reading_composer::models::payload::{
    DeleteTestResponse, InitializeTestRequest, InitializeTestResponse, PartPayload,
    ReadingTestDetail, ReadingTestSummary, SavePartResponse,
};
use reading_composer::models::{PartNumber, PassageField, QuestionKind, ReadingDraft};
use reading_composer::orchestrator::process_draft;
use reading_composer::services::LayoutRow;
use reading_composer::{Config, ReadingTestComposer};
use serde_json::json;
use std::collections::BTreeSet;
use tokio::sync::Mutex;

/// 内存中的阅读后端，记录所有请求
#[derive(Default)]
struct FakeBackend {
    existing_titles: Vec<String>,
    stored: Option<ReadingTestDetail>,
    initialized: Mutex<Vec<InitializeTestRequest>>,
    saves: Mutex<Vec<(u64, PartNumber, PartPayload)>>,
    deleted: Mutex<Vec<u64>>,
}

impl FakeBackend {
    fn with_existing_title(title: &str) -> Self {
        Self {
            existing_titles: vec![title.to_string()],
            ..Default::default()
        }
    }

    async fn save_count(&self) -> usize {
        self.saves.lock().await.len()
    }
}

#[async_trait]
impl ReadingBackend for FakeBackend {
    async fn initialize_test(
        &self,
        request: &InitializeTestRequest,
    ) -> Result<InitializeTestResponse, ApiError> {
        if self.existing_titles.contains(&request.title) {
            return Err(ApiError::Rejected {
                endpoint: "admin/reading/initialize-reading-test".into(),
                status: 400,
                detail: format!("An exam with the title '{}' already exists", request.title),
            });
        }
        self.initialized.lock().await.push(request.clone());
        Ok(InitializeTestResponse {
            message: "Reading test initialized successfully".into(),
            exam_id: 77,
            title: request.title.clone(),
            parts: 3,
            question_counts: Default::default(),
        })
    }

    async fn save_part(
        &self,
        exam_id: u64,
        part: PartNumber,
        payload: &PartPayload,
    ) -> Result<SavePartResponse, ApiError> {
        let mut saves = self.saves.lock().await;
        saves.push((exam_id, part, payload.clone()));
        let saved_parts: BTreeSet<u32> = saves.iter().map(|(_, p, _)| p.get()).collect();
        Ok(SavePartResponse {
            message: format!("Part {} saved successfully", part),
            exam_id,
            section_id: Some(part.get() as u64),
            passage_id: Some(1),
            question_groups: payload.question_groups.len(),
            total_questions: payload.question_count(),
            expected_questions: part.expected_count(),
            total_marks: payload.question_count() as f64,
            is_exam_active: saved_parts.len() == 3,
        })
    }

    async fn get_test(&self, exam_id: u64) -> Result<ReadingTestDetail, ApiError> {
        if let Some(detail) = self.stored.as_ref().filter(|d| d.exam_id == exam_id) {
            return Ok(detail.clone());
        }
        Err(ApiError::Rejected {
            endpoint: format!("admin/reading/reading-test/{}", exam_id),
            status: 404,
            detail: "Reading test not found".into(),
        })
    }

    async fn list_tests(&self) -> Result<Vec<ReadingTestSummary>, ApiError> {
        Ok(Vec::new())
    }

    async fn delete_test(&self, exam_id: u64) -> Result<DeleteTestResponse, ApiError> {
        self.deleted.lock().await.push(exam_id);
        Ok(DeleteTestResponse {
            message: "Reading test deleted successfully".into(),
            exam_id,
        })
    }
}

async fn initialized_composer() -> ReadingTestComposer<FakeBackend> {
    let mut composer = ReadingTestComposer::new(FakeBackend::default());
    composer
        .initialize("Academic Reading A", 60, 40)
        .await
        .unwrap();
    composer
}

/// 在当前部分批量出题，并用 `text` 保存自动打开的说明
fn add_batch_with_instruction(
    composer: &mut ReadingTestComposer<FakeBackend>,
    kind: QuestionKind,
    count: u32,
    text: &str,
) {
    let request = composer.batch_request_mut();
    request.kind = kind;
    request.count = count;
    composer.add_batch().unwrap();
    composer
        .instruction_editor_mut()
        .draft_mut()
        .unwrap()
        .text = text.to_string();
    composer.save_instruction().unwrap();
}

fn fill_passage(composer: &mut ReadingTestComposer<FakeBackend>) {
    composer
        .update_passage(PassageField::Title, "The history of glass")
        .unwrap();
    composer
        .update_passage(
            PassageField::Content,
            "Glass has been made for thousands of years.",
        )
        .unwrap();
}

#[tokio::test]
async fn saving_a_fully_covered_part_fires_once() {
    let mut composer = initialized_composer().await;
    fill_passage(&mut composer);
    add_batch_with_instruction(
        &mut composer,
        QuestionKind::MultipleChoice,
        13,
        "Choose the correct letter, A, B, C or D.",
    );

    let outcome = composer.save_active_part().await.unwrap();
    assert_eq!(outcome.message, "Part 1 saved successfully.");
    assert!(!outcome.exam_active);

    let init = composer.backend().initialized.lock().await;
    assert_eq!(init.len(), 1);
    assert_eq!(init[0].title, "Academic Reading A");
    assert_eq!((init[0].duration, init[0].total_marks), (60, 40));
    drop(init);

    let saves = composer.backend().saves.lock().await;
    assert_eq!(saves.len(), 1);
    let (exam_id, part, payload) = &saves[0];
    assert_eq!((*exam_id, *part), (77, PartNumber::ONE));
    assert_eq!(payload.question_groups.len(), 1);
    assert_eq!(payload.question_groups[0].order_number, 1);
    assert_eq!(payload.question_groups[0].questions.len(), 13);
}

#[tokio::test]
async fn partial_coverage_never_reaches_backend() {
    let mut composer = initialized_composer().await;
    fill_passage(&mut composer);
    add_batch_with_instruction(&mut composer, QuestionKind::ShortAnswer, 13, "Answer the questions.");
    composer.open_instruction(0).unwrap();
    composer.instruction_editor_mut().draft_mut().unwrap().end = 10;
    composer.save_instruction().unwrap();

    let err = composer.save_active_part().await.unwrap_err();
    match &err {
        AppError::Validation(ValidationError::UncoveredQuestions { numbers }) => {
            assert_eq!(numbers, &vec![11, 12, 13]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("11, 12, 13"));
    assert_eq!(composer.backend().save_count().await, 0);
    assert!(!composer.is_loading());
}

#[tokio::test]
async fn batches_never_exceed_part_total() {
    let mut composer = initialized_composer().await;

    for count in [6, 6] {
        composer.batch_request_mut().count = count;
        composer.add_batch().unwrap();
    }
    composer.batch_request_mut().count = 5;
    assert!(matches!(
        composer.add_batch().unwrap_err(),
        ValidationError::TooManyQuestions { remaining: 1, .. }
    ));
    assert_eq!(composer.active_part().unwrap().questions.len(), 12);

    composer.batch_request_mut().count = 1;
    composer.add_batch().unwrap();
    assert!(composer.add_batch().is_err());
    assert_eq!(composer.active_part().unwrap().questions.len(), 13);

    composer.select_part(PartNumber::THREE);
    composer.batch_request_mut().count = 14;
    let range = composer.add_batch().unwrap();
    assert_eq!(range, 27..=40);
    assert_eq!(composer.active_part().unwrap().questions.len(), 14);
}

#[tokio::test]
async fn multiple_choice_batch_starts_blank() {
    let mut composer = initialized_composer().await;
    composer.batch_request_mut().count = 5;
    assert_eq!(composer.add_batch().unwrap(), 1..=5);

    let part = composer.active_part().unwrap();
    let numbers: Vec<u32> = part.questions.iter().map(|q| q.number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    for question in &part.questions {
        let choices = question.body.choices().unwrap();
        assert_eq!(choices.options.len(), 4);
        assert_eq!(choices.correct, None);
    }

    // 出题后说明编辑器以新区间打开
    let draft = composer.instruction_editor().draft().unwrap();
    assert_eq!((draft.start, draft.end), (1, 5));
}

#[tokio::test]
async fn editing_existing_instruction_replaces_in_place() {
    let mut composer = initialized_composer().await;
    add_batch_with_instruction(&mut composer, QuestionKind::FillBlank, 7, "Complete the summary.");
    add_batch_with_instruction(&mut composer, QuestionKind::TrueFalse, 6, "TRUE, FALSE or NOT GIVEN");

    composer.open_instruction(0).unwrap();
    composer.instruction_editor_mut().draft_mut().unwrap().text =
        "Complete the summary below.".into();
    assert_eq!(composer.save_instruction().unwrap(), 0);

    let instructions = &composer.active_part().unwrap().instructions;
    assert_eq!(instructions.len(), 2);
    assert_eq!(instructions[0].text, "Complete the summary below.");
    assert_eq!(instructions[1].range_string(), "8-13");

    let rows = composer.layout().unwrap();
    assert!(matches!(rows[0], LayoutRow::Instruction { index: 0, .. }));
    assert_eq!(rows.len(), 15);
}

#[tokio::test]
async fn second_save_is_refused_while_first_is_pending() {
    let mut composer = initialized_composer().await;
    fill_passage(&mut composer);
    add_batch_with_instruction(&mut composer, QuestionKind::FillBlank, 13, "Complete the notes.");

    let pending = composer.begin_save().unwrap();
    assert!(composer.is_loading());
    assert_eq!(composer.begin_save().unwrap_err(), ValidationError::SaveInFlight);

    let rejected = Err(ApiError::Rejected {
        endpoint: "admin/reading/reading-test/77/part/1".into(),
        status: 400,
        detail: "Part 1 must have exactly 13 questions".into(),
    });
    let err = composer.finish_save(pending.part, rejected).unwrap_err();
    assert_eq!(err.to_string(), "API错误: Part 1 must have exactly 13 questions");
    assert!(!composer.is_loading());

    // 失败后可以重试
    assert!(composer.save_active_part().await.is_ok());
}

#[tokio::test]
async fn backend_rejection_keeps_composer_uninitialized() {
    let mut composer =
        ReadingTestComposer::new(FakeBackend::with_existing_title("Academic Reading A"));
    let err = composer
        .initialize("Academic Reading A", 60, 40)
        .await
        .unwrap_err();
    match err {
        AppError::Api(api) => assert_eq!(
            api.detail(),
            Some("An exam with the title 'Academic Reading A' already exists")
        ),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(composer.exam().is_none());
}

#[test]
fn blank_title_is_rejected_locally() {
    let mut composer = ReadingTestComposer::new(FakeBackend::default());
    let err = tokio_test::block_on(composer.initialize("   ", 60, 40)).unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::EmptyTitle)
    ));
    assert!(tokio_test::block_on(composer.backend().initialized.lock()).is_empty());
}

#[tokio::test]
async fn discard_deletes_remote_test() {
    let mut composer = initialized_composer().await;
    composer.discard().await.unwrap();
    assert_eq!(*composer.backend().deleted.lock().await, vec![77]);
    assert!(composer.exam().is_none());
    assert!(matches!(
        composer.add_batch().unwrap_err(),
        ValidationError::NotInitialized
    ));
}

const FULL_DRAFT: &str = r#"
title = "Academic Reading C"

[[parts]]
number = 1

[parts.passage]
title = "The history of glass"
content = "Glass has been made for thousands of years."

[[parts.batches]]
kind = "true_false"
count = 13
instruction = "Do the following statements agree with the information in the passage?"

[[parts.edits]]
op = "correct_choice"
question = 1
option = 1

[[parts.edits]]
op = "answer"
question = 2
value = "NOT GIVEN"

[[parts]]
number = 2

[parts.passage]
title = "Bees"
content = "Bees communicate through dance."

[[parts.batches]]
kind = "matching_names"
count = 5
instruction = "Match each finding with the correct researcher."

[[parts.batches]]
kind = "fill_blank"
count = 8

[[parts.matching]]
question = 14

[[parts.matching.options]]
key = "A"
description = "Dr Smith"
correct_for = "14,16,18"

[[parts.matching.options]]
key = "B"
description = "Prof Lee"
correct_for = "15"

[[parts.edits]]
op = "answer"
question = 17
value = "B"

[[parts.edits]]
op = "answer"
question = 19
value = "pollen"

[[parts.instructions]]
start = 19
end = 26
text = "Complete the notes below."

[[parts]]
number = 3

[parts.passage]
title = "Urban farming"
content = "Cities are growing food on rooftops."

[[parts.batches]]
kind = "short_answer"
count = 14
instruction = "Answer the questions below."
"#;

#[tokio::test]
async fn draft_replay_saves_every_part_and_activates() {
    let path = std::env::temp_dir().join(format!("reading_draft_{}.toml", std::process::id()));
    tokio::fs::write(&path, FULL_DRAFT).await.unwrap();

    let draft: ReadingDraft = toml::from_str::<ReadingDraft>(FULL_DRAFT)
        .unwrap()
        .with_file_path(path.to_string_lossy().to_string());
    let config = Config {
        activation_redirect_delay_secs: 0,
        remove_finished_drafts: true,
        ..Config::default()
    };

    let mut composer = ReadingTestComposer::new(FakeBackend::default());
    let stats = process_draft(&mut composer, &draft, 1, &config).await.unwrap();

    assert_eq!(stats.exam_id, Some(77));
    assert_eq!((stats.parts_saved, stats.parts_failed), (3, 0));
    assert!(stats.exam_active);
    assert!(!path.exists());

    let saves = composer.backend().saves.lock().await;
    let parts: Vec<u32> = saves.iter().map(|(_, p, _)| p.get()).collect();
    assert_eq!(parts, vec![1, 2, 3]);

    let part1 = &saves[0].2.question_groups[0];
    assert_eq!(part1.questions[0].correct_answer, "FALSE");
    assert_eq!(part1.questions[1].correct_answer, "NOT GIVEN");

    let part2 = &saves[1].2;
    assert_eq!(part2.question_groups.len(), 2);
    let matching = &part2.question_groups[0];
    assert_eq!(matching.question_range, "14-18");
    assert_eq!(matching.matching_options.len(), 2);
    let answers: Vec<(u32, &str)> = matching
        .questions
        .iter()
        .map(|q| (q.question_number, q.correct_answer.as_str()))
        .collect();
    assert_eq!(
        answers,
        vec![(14, "A"), (15, "B"), (16, "A"), (17, "B"), (18, "A")]
    );
    let notes = &part2.question_groups[1];
    assert_eq!((notes.order_number, notes.question_range.as_str()), (2, "19-26"));
    assert_eq!(notes.questions[0].correct_answer, "pollen");

    assert_eq!(saves[2].2.question_count(), 14);
    assert_eq!(saves[2].2.question_groups[0].question_range, "27-40");
}

#[tokio::test]
async fn draft_part_failure_does_not_block_other_parts() {
    let mut draft: ReadingDraft = toml::from_str(FULL_DRAFT).unwrap();
    // 第二部分去掉额外说明后 19-26 无人覆盖
    draft.parts[1].instructions.clear();
    let config = Config {
        activation_redirect_delay_secs: 0,
        ..Config::default()
    };

    let mut composer = ReadingTestComposer::new(FakeBackend::default());
    let stats = process_draft(&mut composer, &draft, 2, &config).await.unwrap();

    assert_eq!((stats.parts_saved, stats.parts_failed), (2, 1));
    assert!(!stats.exam_active);
    assert_eq!(composer.backend().save_count().await, 2);
}

#[tokio::test]
async fn new_instruction_opens_with_defaults() {
    let mut composer = initialized_composer().await;
    composer.batch_request_mut().count = 4;
    composer.add_batch().unwrap();
    composer.instruction_editor_mut().cancel();

    composer.open_new_instruction();
    let draft = composer.instruction_editor().draft().unwrap();
    assert_eq!((draft.start, draft.end, draft.edit_index), (1, 4, None));
    assert!(draft.text.contains("correct researcher"));

    composer.save_instruction().unwrap();
    assert!(!composer.instruction_editor().is_open());
    assert_eq!(composer.active_part().unwrap().instructions.len(), 1);
}

/// 第一部分已在后端保存完整的试卷
fn stored_with_complete_part_one() -> ReadingTestDetail {
    let questions: Vec<_> = (1..=13)
        .map(|n| {
            json!({
                "question_id": 100 + n,
                "question_number": n,
                "text": format!("Question {}", n),
                "type": "short_answer",
                "marks": 1,
                "correct_answer": "glass"
            })
        })
        .collect();
    serde_json::from_value(json!({
        "exam_id": 77,
        "title": "Academic Reading C",
        "is_active": false,
        "sections": [{
            "section_id": 1,
            "order_number": 1,
            "duration": 20,
            "passage": {"title": "The history of glass", "content": "Glass has been made for thousands of years."},
            "question_groups": [{
                "group_id": 1,
                "instruction": "Answer the questions below.",
                "question_range": "1-13",
                "group_type": "short_answer",
                "order_number": 1,
                "questions": questions
            }]
        }]
    }))
    .unwrap()
}

#[tokio::test]
async fn resumed_draft_skips_completed_parts() {
    let mut draft: ReadingDraft = toml::from_str(FULL_DRAFT).unwrap();
    draft.exam_id = Some(77);
    let config = Config {
        activation_redirect_delay_secs: 0,
        ..Config::default()
    };

    let backend = FakeBackend {
        stored: Some(stored_with_complete_part_one()),
        ..Default::default()
    };
    let mut composer = ReadingTestComposer::new(backend);
    let stats = process_draft(&mut composer, &draft, 3, &config).await.unwrap();

    assert_eq!(
        (stats.parts_skipped, stats.parts_saved, stats.parts_failed),
        (1, 2, 0)
    );
    assert!(composer.backend().initialized.lock().await.is_empty());
    let saved: Vec<u32> = composer
        .backend()
        .saves
        .lock()
        .await
        .iter()
        .map(|(_, p, _)| p.get())
        .collect();
    assert_eq!(saved, vec![2, 3]);
}
