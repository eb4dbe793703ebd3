//! Quiz model
//!
//! Multiple-choice quizzes about books, their questions, and submitted results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quiz entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub book_id: Option<i64>,
    pub created_by: i64,
    pub difficulty: Difficulty,
    /// Minutes
    pub time_limit: i32,
    pub question_count: i64,
    pub participant_count: i64,
    pub average_score: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(anyhow::anyhow!("Invalid difficulty: {}", s)),
        }
    }
}

/// A stored question, including its answer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: i64,
    pub quiz_id: i64,
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`
    pub correct_answer: i32,
    pub explanation: Option<String>,
    /// 1-based
    pub position: i32,
}

impl QuizQuestion {
    /// The question as shown to someone taking the quiz
    pub fn public(&self) -> PublicQuestion {
        PublicQuestion {
            id: self.id,
            quiz_id: self.quiz_id,
            question: self.question.clone(),
            options: self.options.clone(),
            position: self.position,
        }
    }
}

/// Question without the answer or explanation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    pub quiz_id: i64,
    pub question: String,
    pub options: Vec<String>,
    pub position: i32,
}

/// A submitted attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub id: i64,
    pub quiz_id: i64,
    pub user_id: i64,
    /// Percentage, 0 to 100
    pub score: i32,
    /// Chosen option per question, `None` when skipped
    pub answers: Vec<Option<i32>>,
    /// Seconds
    pub time_spent: i32,
    pub completed_at: DateTime<Utc>,
}

/// Input for one question of a new quiz
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestionInput {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: i32,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Input for creating a quiz
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub book_id: Option<i64>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub time_limit: Option<i32>,
    #[serde(default)]
    pub questions: Vec<NewQuestionInput>,
}

/// Answers submitted for a quiz
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizInput {
    #[serde(default)]
    pub quiz_id: Option<i64>,
    pub answers: Vec<Option<i32>>,
    #[serde(default)]
    pub time_spent: Option<i32>,
}

/// Per-question feedback after a submission
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOutcome {
    pub question_id: i64,
    pub correct: bool,
    pub correct_answer: i32,
    pub explanation: Option<String>,
}

/// Graded submission
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOutcome {
    pub score: i32,
    pub points_earned: i64,
    pub correct_answers: usize,
    pub total_questions: usize,
    pub results: Vec<QuestionOutcome>,
}

/// Percentage of correct answers, rounded to the nearest integer
pub fn score_percent(correct: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }
    ((correct as f64 / total as f64) * 100.0).round() as i32
}

/// Points credited for a score: everything above 50%
pub fn points_for_score(score: i32) -> i64 {
    (score as i64 - 50).max(0)
}

/// Grade answers against questions ordered by position.
///
/// Missing trailing answers count as wrong.
pub fn grade(questions: &[QuizQuestion], answers: &[Option<i32>]) -> QuizOutcome {
    let results: Vec<QuestionOutcome> = questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let chosen = answers.get(index).copied().flatten();
            QuestionOutcome {
                question_id: question.id,
                correct: chosen == Some(question.correct_answer),
                correct_answer: question.correct_answer,
                explanation: question.explanation.clone(),
            }
        })
        .collect();

    let correct_answers = results.iter().filter(|r| r.correct).count();
    let score = score_percent(correct_answers, questions.len());

    QuizOutcome {
        score,
        points_earned: points_for_score(score),
        correct_answers,
        total_questions: questions.len(),
        results,
    }
}
