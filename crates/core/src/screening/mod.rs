//! PHQ-9 depression screening scorer
//!
//! Pure scoring with no storage access. Persisting a result goes through
//! [`crate::storage::ScreeningStore`].

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::invariants;
use crate::models::{ScreeningResult, Severity};
use crate::storage::ScreeningRepository;

/// Number of PHQ-9 questions
pub const QUESTION_COUNT: usize = 9;

/// Highest value a single answer may take
pub const MAX_ANSWER: i32 = 3;

/// Highest possible total score
pub const MAX_SCORE: u8 = 27;

/// Score, severity and recommendation for one questionnaire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Phq9Score {
    pub score: u8,
    pub severity: Severity,
    pub recommendation: &'static str,
}

/// Score nine answers, each 0-3
pub fn score(answers: &[i32]) -> Result<Phq9Score> {
    validate_answers(answers)?;

    let total: i32 = answers.iter().sum();
    let score = total as u8;
    let severity = Severity::from_score(score);

    Ok(Phq9Score {
        score,
        severity,
        recommendation: severity.recommendation(),
    })
}

/// Build an immutable screening record for a student
pub fn evaluate(student_id: Uuid, answers: &[i32]) -> Result<ScreeningResult> {
    let outcome = score(answers)?;

    Ok(ScreeningResult {
        id: Uuid::new_v4(),
        student_id,
        answers: answers.iter().map(|a| *a as u8).collect(),
        score: outcome.score,
        severity: outcome.severity,
        recommendation: outcome.recommendation.to_string(),
        created_at: Utc::now(),
    })
}

/// Score a questionnaire and store it as a new result
#[instrument(skip(repo, answers))]
pub fn submit<R: ScreeningRepository>(
    repo: &R,
    student_id: Uuid,
    answers: &[i32],
) -> Result<ScreeningResult> {
    let result = evaluate(student_id, answers)?;
    invariants::assert_screening_invariants(&result);
    repo.create_screening(&result)?;
    info!(
        screening_id = %result.id,
        score = result.score,
        severity = %result.severity,
        "Screening recorded"
    );
    Ok(result)
}

fn validate_answers(answers: &[i32]) -> Result<()> {
    if answers.len() != QUESTION_COUNT {
        return Err(Error::Validation(format!(
            "expected {} answers, got {}",
            QUESTION_COUNT,
            answers.len()
        )));
    }

    if let Some((index, value)) = answers
        .iter()
        .enumerate()
        .find(|(_, v)| !(0..=MAX_ANSWER).contains(*v))
    {
        return Err(Error::Validation(format!(
            "answer {} is {}, must be between 0 and {}",
            index + 1,
            value,
            MAX_ANSWER
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_json_uses_labels() {
        let result = score(&[2, 2, 2, 2, 2, 2, 2, 1, 1]).unwrap();
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["score"], 16);
        assert_eq!(json["severity"], "Moderately Severe");
        assert_eq!(json["recommendation"], "Recommend scheduling an appointment");
    }

    #[test]
    fn test_all_zero_is_minimal() {
        let result = score(&[0; 9]).unwrap();
        assert_eq!(result.score, 0);
        assert_eq!(result.severity, Severity::Minimal);
        assert_eq!(result.recommendation, "Continue current practices");
    }

    #[test]
    fn test_all_three_is_severe() {
        let result = score(&[3; 9]).unwrap();
        assert_eq!(result.score, MAX_SCORE);
        assert_eq!(result.severity, Severity::Severe);
        assert_eq!(result.recommendation, "Recommend immediate consultation");
    }

    #[test]
    fn test_five_is_mild() {
        let result = score(&[1, 1, 1, 1, 1, 0, 0, 0, 0]).unwrap();
        assert_eq!(result.score, 5);
        assert_eq!(result.severity, Severity::Mild);
        assert_eq!(result.severity.label(), "Mild");
    }

    #[test]
    fn test_band_edges() {
        let cases = [
            (4, Severity::Minimal),
            (5, Severity::Mild),
            (9, Severity::Mild),
            (10, Severity::Moderate),
            (14, Severity::Moderate),
            (15, Severity::ModeratelySevere),
            (19, Severity::ModeratelySevere),
            (20, Severity::Severe),
        ];
        for (total, expected) in cases {
            // Spread the total across the nine answers
            let mut answers = [0i32; 9];
            let mut remaining = total;
            for answer in answers.iter_mut() {
                let take = remaining.min(MAX_ANSWER);
                *answer = take;
                remaining -= take;
            }
            let result = score(&answers).unwrap();
            assert_eq!(result.score as i32, total);
            assert_eq!(result.severity, expected, "score {}", total);
        }
    }

    #[test]
    fn test_wrong_answer_count() {
        assert!(matches!(score(&[0; 8]), Err(Error::Validation(_))));
        assert!(matches!(score(&[0; 10]), Err(Error::Validation(_))));
        assert!(matches!(score(&[]), Err(Error::Validation(_))));
    }

    #[test]
    fn test_out_of_range_answer() {
        assert!(matches!(
            score(&[0, 0, 0, 4, 0, 0, 0, 0, 0]),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            score(&[0, 0, 0, 0, 0, 0, 0, 0, -1]),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_evaluate_builds_record() {
        let student = Uuid::new_v4();
        let record = evaluate(student, &[2, 2, 2, 2, 2, 1, 1, 0, 0]).unwrap();
        assert_eq!(record.student_id, student);
        assert_eq!(record.score, 12);
        assert_eq!(record.severity, Severity::Moderate);
        assert_eq!(record.answers, vec![2, 2, 2, 2, 2, 1, 1, 0, 0]);
        assert_eq!(record.recommendation, "Consider speaking with a counselor");
        assert!(!record.is_high_risk());
    }

    #[test]
    fn test_submit_stores_result() {
        let db = crate::storage::Database::open_in_memory().unwrap();
        let student = Uuid::new_v4();

        let stored = submit(&db, student, &[3, 3, 3, 2, 2, 2, 0, 0, 0]).unwrap();
        assert!(stored.is_high_risk());
        assert_eq!(db.latest_screening_for_student(student).unwrap(), Some(stored));

        assert!(submit(&db, student, &[1; 3]).is_err());
        assert_eq!(db.list_screenings_for_student(student).unwrap().len(), 1);
    }
}
