use examrace_api::engine::{Effect, GameEngine, QuizEngine, QuizRules};
use examrace_api::error::SupplyError;
use examrace_api::models::{Difficulty, Question, QuizStatus};

mod common;

fn question(id: &str, correct: &str) -> Question {
    Question {
        id: id.to_string(),
        question: format!("Pick {}", correct),
        options: vec!["A".to_string(), "B".to_string(), "C".to_string()],
        correct_answer: correct.to_string(),
        explanation: String::new(),
        difficulty: Difficulty::Medium,
        topic: "letters".to_string(),
    }
}

fn playing(questions: Vec<Question>) -> QuizEngine {
    let (mut engine, _) = common::quiz_engine(QuizRules::default());
    let pending = engine.start_game("letters").unwrap();
    engine.complete_generation(pending.epoch, Ok(questions));
    assert_eq!(engine.status(), QuizStatus::Playing);
    engine
}

#[test]
fn test_index_stays_in_bounds_after_start() {
    let mut engine = playing(vec![question("q1", "A"), question("q2", "B")]);
    assert_eq!(engine.current_index(), 0);

    for _ in 0..5 {
        engine.next_question();
        assert!(engine.current_index() < engine.questions().len());
    }
}

#[test]
fn test_tick_outside_play_changes_nothing() {
    let (mut engine, _) = common::quiz_engine(QuizRules::default());
    let before = engine.snapshot();
    assert!(engine.tick().is_none());
    assert_eq!(engine.snapshot(), before);

    let mut engine = playing(vec![question("q1", "A")]);
    engine.answer_question("q1", "A");
    engine.finish_game();
    let saving = engine.snapshot();
    engine.tick();
    assert_eq!(engine.snapshot(), saving);
}

#[test]
fn test_navigation_is_idempotent_at_boundaries() {
    let mut engine = playing(vec![question("q1", "A"), question("q2", "B")]);

    engine.prev_question();
    engine.prev_question();
    assert_eq!(engine.current_index(), 0);

    engine.next_question();
    engine.next_question();
    engine.next_question();
    assert_eq!(engine.current_index(), 1);
}

#[test]
fn test_score_counts_only_correct_answers() {
    let mut engine = playing(vec![question("q1", "A"), question("q2", "B")]);
    engine.answer_question("q1", "A");
    engine.answer_question("q2", "C");

    let effect = engine.finish_game();
    assert_eq!(engine.score(), 1);
    match effect {
        Some(Effect::RecordResult(pending)) => {
            assert_eq!(pending.result.score, 1);
            assert_eq!(pending.result.total_questions, 2);
        }
        other => panic!("expected a record effect, got {:?}", other.is_some()),
    }
}

#[test]
fn test_answers_overwrite_without_duplicates() {
    let mut engine = playing(vec![question("q1", "A"), question("q2", "B")]);
    engine.answer_question("q1", "B");
    assert_eq!(engine.answer_for("q1"), Some("B"));

    engine.answer_question("q1", "A");
    assert_eq!(engine.answer_for("q1"), Some("A"));
    assert_eq!(engine.answers().len(), 1);
}

#[test]
fn test_reset_discards_late_generation() {
    let (mut engine, scheduler) = common::quiz_engine(QuizRules::default());
    let pending = engine.start_game("letters").unwrap();
    engine.reset();

    engine.complete_generation(pending.epoch, Ok(vec![question("q1", "A")]));
    assert_eq!(engine.status(), QuizStatus::Idle);
    assert!(engine.questions().is_empty());
    assert_eq!(scheduler.scheduled(), 0);
}

#[test]
fn test_reset_discards_late_recording() {
    let mut engine = playing(vec![question("q1", "A")]);
    engine.answer_question("q1", "A");
    let saved_epoch = match engine.finish_game() {
        Some(Effect::RecordResult(pending)) => pending.epoch,
        _ => panic!("finishing a played quiz must record it"),
    };
    assert_eq!(engine.status(), QuizStatus::Saving);

    engine.reset();
    engine.complete_recording(saved_epoch, Ok(()));
    assert_eq!(engine.status(), QuizStatus::Idle);
    assert_eq!(engine.score(), 0);
}

#[test]
fn test_generation_failure_is_retryable() {
    let (mut engine, _) = common::quiz_engine(QuizRules::default());
    let pending = engine.start_game("letters").unwrap();
    engine.complete_generation(
        pending.epoch,
        Err(SupplyError::Empty {
            topic: "letters".to_string(),
        }),
    );
    assert_eq!(engine.status(), QuizStatus::Idle);
    assert!(engine.last_error().is_some());

    let retry = engine.start_game("letters").unwrap();
    assert!(retry.epoch > pending.epoch);
    engine.complete_generation(retry.epoch, Ok(vec![question("q1", "A")]));
    assert_eq!(engine.status(), QuizStatus::Playing);
    assert!(engine.last_error().is_none());
}

#[test]
fn test_timer_runs_only_while_playing() {
    let (mut engine, scheduler) = common::quiz_engine(QuizRules {
        default_time_limit_seconds: 2,
        ..QuizRules::default()
    });
    let pending = engine.start_game("letters").unwrap();
    engine.complete_generation(pending.epoch, Ok(vec![question("q1", "A")]));
    assert_eq!(scheduler.running(), 1);

    assert!(engine.tick().is_none());
    assert!(matches!(engine.tick(), Some(Effect::RecordResult(_))));
    assert_eq!(engine.status(), QuizStatus::Saving);
    assert_eq!(scheduler.running(), 0);

    engine.complete_recording(engine.epoch(), Ok(()));
    assert_eq!(engine.status(), QuizStatus::Completed);
}
