use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

use crate::model::{
    Difficulty, DifficultyBreakdown, PassStatus, QuestionId, TestResult, TestSession,
    TopicAnalysis, UserAnswer,
};
use crate::policy::NEGATIVE_MARK;

/// Raw interaction data collected at submission time.
#[derive(Debug, Clone, Copy)]
pub struct AnswerSheet<'a> {
    pub answers: &'a BTreeMap<QuestionId, String>,
    pub time_spent: &'a BTreeMap<QuestionId, u32>,
    /// Active seconds at submission (for countdowns, duration minus remaining).
    pub total_time_secs: u32,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tally {
    total: u32,
    correct: u32,
    wrong: u32,
    unattempted: u32,
    time: u32,
}

impl Tally {
    fn record(&mut self, selected: Option<bool>, time: u32) {
        self.total += 1;
        self.time += time;
        match selected {
            Some(true) => self.correct += 1,
            Some(false) => self.wrong += 1,
            None => self.unattempted += 1,
        }
    }

    fn accuracy(&self) -> f64 {
        percent(f64::from(self.correct), self.total)
    }
}

fn percent(value: f64, out_of: u32) -> f64 {
    if out_of == 0 {
        0.0
    } else {
        value * 100.0 / f64::from(out_of)
    }
}

/// Turn a finished session into its result.
///
/// Pure and deterministic: the same session and sheet always produce an equal
/// `TestResult`, so recomputing is safe. Each question is worth one point;
/// with negative marking a wrong attempted answer costs `NEGATIVE_MARK`, an
/// unattempted one never does. Only clamped (non-negative) score and
/// percentage are surfaced.
#[must_use]
pub fn score_session(session: &TestSession, sheet: &AnswerSheet<'_>) -> TestResult {
    let negative_marking = session.config.negative_marking();
    let mut raw_score = 0.0_f64;
    let mut overall = Tally::default();

    let mut topics: Vec<(String, Tally)> = Vec::new();
    let mut topic_index: HashMap<&str, usize> = HashMap::new();
    let mut by_difficulty: BTreeMap<Difficulty, Tally> = BTreeMap::new();

    let mut answers = Vec::with_capacity(session.questions.len());
    for question in &session.questions {
        let selected = sheet.answers.get(&question.id);
        let is_correct = selected.is_some_and(|option| question.is_correct(option));
        let outcome = selected.map(|_| is_correct);
        let time = sheet.time_spent.get(&question.id).copied().unwrap_or(0);

        match outcome {
            Some(true) => raw_score += 1.0,
            Some(false) if negative_marking => raw_score -= NEGATIVE_MARK,
            _ => {}
        }
        overall.record(outcome, time);

        let slot = *topic_index
            .entry(question.topic.as_str())
            .or_insert_with(|| {
                topics.push((question.topic.clone(), Tally::default()));
                topics.len() - 1
            });
        topics[slot].1.record(outcome, time);
        by_difficulty
            .entry(question.difficulty)
            .or_default()
            .record(outcome, time);

        answers.push(UserAnswer {
            question_id: question.id,
            question_text: question.text.clone(),
            selected_option: selected.cloned(),
            correct_option: question.answer.clone(),
            is_correct,
            time_spent_seconds: time,
            explanation: question.explanation.clone(),
            difficulty: question.difficulty,
            topic: question.topic.clone(),
            options: question.options.clone(),
        });
    }

    let topic_analysis = topics
        .into_iter()
        .map(|(topic, tally)| TopicAnalysis {
            accuracy: tally.accuracy(),
            topic,
            total_questions: tally.total,
            correct: tally.correct,
            wrong: tally.wrong,
            unattempted: tally.unattempted,
            time_spent: tally.time,
        })
        .collect();

    let difficulty_analysis = by_difficulty
        .into_iter()
        .map(|(difficulty, tally)| DifficultyBreakdown {
            difficulty,
            total_questions: tally.total,
            correct: tally.correct,
            wrong: tally.wrong,
            unattempted: tally.unattempted,
            accuracy: tally.accuracy(),
        })
        .collect();

    let max_score = overall.total;
    let percentage = percent(raw_score, max_score).max(0.0);

    TestResult {
        id: session.id,
        test_name: session.config.test_name().to_string(),
        date: sheet.completed_at,
        mode: session.config.mode(),
        total_score: raw_score.max(0.0),
        max_score,
        percentage,
        total_time_seconds: sheet.total_time_secs,
        correct_count: overall.correct,
        wrong_count: overall.wrong,
        unattempted_count: overall.unattempted,
        answers,
        topic_analysis,
        difficulty_analysis,
        status: PassStatus::from_percentage(percentage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Question, TestConfigDraft, TestMode};
    use crate::time::fixed_now;

    fn question(id: u64, topic: &str, difficulty: Difficulty) -> Question {
        Question {
            id: QuestionId::new(id),
            text: format!("Q{id}"),
            options: vec!["yes".into(), "no".into()],
            answer: "yes".into(),
            explanation: format!("E{id}"),
            difficulty,
            topic: topic.into(),
        }
    }

    fn session(questions: Vec<Question>, negative_marking: bool) -> TestSession {
        let mut draft = TestConfigDraft::with_defaults("Scoring", TestMode::Exam);
        draft.question_count = u32::try_from(questions.len()).unwrap();
        draft.negative_marking = negative_marking;
        TestSession::new(draft.validate().unwrap(), questions, fixed_now()).unwrap()
    }

    fn ten_easy(negative_marking: bool) -> TestSession {
        session(
            (1..=10)
                .map(|id| question(id * 3, "Algebra", Difficulty::Easy))
                .collect(),
            negative_marking,
        )
    }

    fn answer_first(
        session: &TestSession,
        correct: usize,
        wrong: usize,
    ) -> BTreeMap<QuestionId, String> {
        session
            .questions
            .iter()
            .enumerate()
            .take(correct + wrong)
            .map(|(i, q)| (q.id, if i < correct { "yes" } else { "no" }.to_string()))
            .collect()
    }

    fn sheet<'a>(
        answers: &'a BTreeMap<QuestionId, String>,
        times: &'a BTreeMap<QuestionId, u32>,
    ) -> AnswerSheet<'a> {
        AnswerSheet {
            answers,
            time_spent: times,
            total_time_secs: 120,
            completed_at: fixed_now(),
        }
    }

    #[test]
    fn six_of_ten_passes_at_sixty_percent() {
        let session = ten_easy(false);
        let answers = answer_first(&session, 6, 4);
        let times = BTreeMap::new();
        let result = score_session(&session, &sheet(&answers, &times));

        assert_eq!(result.correct_count, 6);
        assert_eq!(result.wrong_count, 4);
        assert_eq!(result.unattempted_count, 0);
        assert_eq!(result.percentage, 60.0);
        assert_eq!(result.total_score, 6.0);
        assert_eq!(result.status, PassStatus::Pass);
    }

    #[test]
    fn negative_marking_four_of_ten_fails() {
        let session = ten_easy(true);
        let answers = answer_first(&session, 4, 6);
        let times = BTreeMap::new();
        let result = score_session(&session, &sheet(&answers, &times));

        assert_eq!(result.total_score, 2.5);
        assert_eq!(result.percentage, 25.0);
        assert_eq!(result.max_score, 10);
        assert_eq!(result.status, PassStatus::Fail);
    }

    #[test]
    fn negative_raw_score_is_clamped() {
        let session = ten_easy(true);
        let answers = answer_first(&session, 0, 10);
        let times = BTreeMap::new();
        let result = score_session(&session, &sheet(&answers, &times));

        assert_eq!(result.total_score, 0.0);
        assert_eq!(result.percentage, 0.0);
        assert_eq!(result.wrong_count, 10);
        assert_eq!(result.status, PassStatus::Fail);
    }

    #[test]
    fn unattempted_is_never_penalized() {
        let session = ten_easy(true);
        let answers = answer_first(&session, 5, 0);
        let times = BTreeMap::new();
        let result = score_session(&session, &sheet(&answers, &times));

        assert_eq!(result.total_score, 5.0);
        assert_eq!(result.unattempted_count, 5);
        assert_eq!(result.percentage, 50.0);
        assert!(result.answers[9].selected_option.is_none());
        assert!(!result.answers[9].is_correct);
    }

    #[test]
    fn topics_group_in_first_seen_order_and_cover_every_question() {
        let session = session(
            vec![
                question(9, "Geometry", Difficulty::Hard),
                question(2, "Algebra", Difficulty::Easy),
                question(5, "Geometry", Difficulty::Medium),
                question(1, "Probability", Difficulty::Easy),
            ],
            false,
        );
        let answers = BTreeMap::from([
            (QuestionId::new(9), "yes".to_string()),
            (QuestionId::new(5), "no".to_string()),
        ]);
        let times = BTreeMap::from([(QuestionId::new(9), 7), (QuestionId::new(5), 3)]);
        let result = score_session(&session, &sheet(&answers, &times));

        let names: Vec<_> = result.topic_analysis.iter().map(|t| t.topic.as_str()).collect();
        assert_eq!(names, ["Geometry", "Algebra", "Probability"]);
        let covered: u32 = result.topic_analysis.iter().map(|t| t.total_questions).sum();
        assert_eq!(covered as usize, session.questions.len());

        let geometry = &result.topic_analysis[0];
        assert_eq!((geometry.correct, geometry.wrong, geometry.unattempted), (1, 1, 0));
        assert_eq!(geometry.accuracy, 50.0);
        assert_eq!(geometry.time_spent, 10);

        let levels: Vec<_> = result
            .difficulty_analysis
            .iter()
            .map(|d| (d.difficulty, d.total_questions))
            .collect();
        assert_eq!(
            levels,
            [(Difficulty::Easy, 2), (Difficulty::Medium, 1), (Difficulty::Hard, 1)]
        );
    }

    #[test]
    fn answers_follow_original_question_order() {
        let session = session(
            vec![
                question(40, "A", Difficulty::Easy),
                question(3, "A", Difficulty::Easy),
            ],
            false,
        );
        let answers = BTreeMap::from([(QuestionId::new(3), "yes".to_string())]);
        let times = BTreeMap::new();
        let result = score_session(&session, &sheet(&answers, &times));
        assert_eq!(result.answers[0].question_id, QuestionId::new(40));
        assert_eq!(result.answers[1].question_id, QuestionId::new(3));
        assert_eq!(result.answers[1].explanation, "E3");
    }

    #[test]
    fn scoring_twice_is_byte_identical() {
        let session = ten_easy(true);
        let answers = answer_first(&session, 3, 4);
        let times = BTreeMap::from([(session.questions[0].id, 12)]);
        let first = score_session(&session, &sheet(&answers, &times));
        let second = score_session(&session, &sheet(&answers, &times));
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn empty_question_set_scores_zero_not_nan() {
        let mut session = ten_easy(false);
        session.questions.clear();
        let answers = BTreeMap::new();
        let times = BTreeMap::new();
        let result = score_session(&session, &sheet(&answers, &times));
        assert_eq!(result.percentage, 0.0);
        assert_eq!(result.max_score, 0);
        assert!(result.topic_analysis.is_empty());
    }
}
