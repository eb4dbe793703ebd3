//! Quiz repository
//!
//! Quizzes, their questions and submitted results. Option lists and answer
//! arrays are stored as JSON text.

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{NewQuestionInput, Quiz, QuizQuestion, QuizResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

const QUIZ_COLUMNS: &str = "id, title, description, book_id, created_by, difficulty, time_limit, \
     question_count, participant_count, average_score, is_active, created_at";

/// Quiz repository trait
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Store a quiz and its questions in one transaction
    async fn create(&self, quiz: &Quiz, questions: &[NewQuestionInput]) -> Result<Quiz>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Quiz>>;

    /// Active quizzes, newest first
    async fn list_active(&self) -> Result<Vec<Quiz>>;

    /// Quizzes created by a user, newest first
    async fn list_by_creator(&self, user_id: i64) -> Result<Vec<Quiz>>;

    /// Questions ordered by position
    async fn questions(&self, quiz_id: i64) -> Result<Vec<QuizQuestion>>;

    /// Store a result and recompute participant count and average score
    async fn record_result(&self, result: &QuizResult) -> Result<QuizResult>;
}

#[derive(sqlx::FromRow)]
struct QuizRecord {
    id: i64,
    title: String,
    description: String,
    book_id: Option<i64>,
    created_by: i64,
    difficulty: String,
    time_limit: i32,
    question_count: i64,
    participant_count: i64,
    average_score: f64,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<QuizRecord> for Quiz {
    type Error = anyhow::Error;

    fn try_from(r: QuizRecord) -> Result<Self> {
        Ok(Quiz {
            id: r.id,
            title: r.title,
            description: r.description,
            book_id: r.book_id,
            created_by: r.created_by,
            difficulty: r.difficulty.parse()?,
            time_limit: r.time_limit,
            question_count: r.question_count,
            participant_count: r.participant_count,
            average_score: r.average_score,
            is_active: r.is_active,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct QuestionRecord {
    id: i64,
    quiz_id: i64,
    question: String,
    choices: String,
    correct_answer: i32,
    explanation: Option<String>,
    position: i32,
}

impl TryFrom<QuestionRecord> for QuizQuestion {
    type Error = anyhow::Error;

    fn try_from(r: QuestionRecord) -> Result<Self> {
        Ok(QuizQuestion {
            id: r.id,
            quiz_id: r.quiz_id,
            question: r.question,
            options: serde_json::from_str(&r.choices)
                .with_context(|| format!("Malformed options for question {}", r.id))?,
            correct_answer: r.correct_answer,
            explanation: r.explanation,
            position: r.position,
        })
    }
}

/// SQLx-based quiz repository implementation
pub struct SqlxQuizRepository {
    pool: DynDatabasePool,
}

impl SqlxQuizRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn QuizRepository> {
        Arc::new(Self::new(pool))
    }

    async fn list_where(&self, filter: &str, value: i64) -> Result<Vec<Quiz>> {
        let sql = format!(
            "SELECT {} FROM quizzes WHERE {} = ? ORDER BY created_at DESC, id DESC",
            QUIZ_COLUMNS, filter
        );
        let records = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, QuizRecord>(&sql)
                .bind(value)
                .fetch_all(pool)
                .await
        })
        .context("Failed to list quizzes")?;
        records.into_iter().map(Quiz::try_from).collect()
    }
}

#[async_trait]
impl QuizRepository for SqlxQuizRepository {
    async fn create(&self, quiz: &Quiz, questions: &[NewQuestionInput]) -> Result<Quiz> {
        let choices = questions
            .iter()
            .map(|q| serde_json::to_string(&q.options))
            .collect::<Result<Vec<_>, _>>()?;

        let id = with_pool!(self.pool, pool => {
            let mut tx = pool.begin().await.context("Failed to begin transaction")?;
            let id = sqlx::query(
                r#"
                INSERT INTO quizzes (title, description, book_id, created_by, difficulty,
                    time_limit, question_count, participant_count, average_score, is_active,
                    created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?)
                "#,
            )
            .bind(&quiz.title)
            .bind(&quiz.description)
            .bind(quiz.book_id)
            .bind(quiz.created_by)
            .bind(quiz.difficulty.to_string())
            .bind(quiz.time_limit)
            .bind(questions.len() as i64)
            .bind(quiz.is_active)
            .bind(quiz.created_at)
            .execute(&mut *tx)
            .await
            .context("Failed to create quiz")?
            .insert_id();

            for (index, (question, choices)) in questions.iter().zip(&choices).enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO quiz_questions (quiz_id, question, choices, correct_answer,
                        explanation, position)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(id)
                .bind(&question.question)
                .bind(choices)
                .bind(question.correct_answer)
                .bind(&question.explanation)
                .bind(index as i32 + 1)
                .execute(&mut *tx)
                .await
                .context("Failed to create quiz question")?;
            }
            tx.commit().await.context("Failed to commit quiz")?;
            id
        });

        self.get_by_id(id)
            .await?
            .context("Quiz not found after creation")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Quiz>> {
        let sql = format!("SELECT {} FROM quizzes WHERE id = ?", QUIZ_COLUMNS);
        let record = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, QuizRecord>(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await
        })
        .context("Failed to get quiz by ID")?;
        record.map(Quiz::try_from).transpose()
    }

    async fn list_active(&self) -> Result<Vec<Quiz>> {
        let sql = format!(
            "SELECT {} FROM quizzes WHERE is_active = ? ORDER BY created_at DESC, id DESC",
            QUIZ_COLUMNS
        );
        let records = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, QuizRecord>(&sql)
                .bind(true)
                .fetch_all(pool)
                .await
        })
        .context("Failed to list quizzes")?;
        records.into_iter().map(Quiz::try_from).collect()
    }

    async fn list_by_creator(&self, user_id: i64) -> Result<Vec<Quiz>> {
        self.list_where("created_by", user_id).await
    }

    async fn questions(&self, quiz_id: i64) -> Result<Vec<QuizQuestion>> {
        let records = with_pool!(self.pool, pool => {
            sqlx::query_as::<_, QuestionRecord>(
                "SELECT id, quiz_id, question, choices, correct_answer, explanation, position \
                 FROM quiz_questions WHERE quiz_id = ? ORDER BY position, id",
            )
            .bind(quiz_id)
            .fetch_all(pool)
            .await
        })
        .context("Failed to list quiz questions")?;
        records.into_iter().map(QuizQuestion::try_from).collect()
    }

    async fn record_result(&self, result: &QuizResult) -> Result<QuizResult> {
        let answers = serde_json::to_string(&result.answers)?;

        let id = with_pool!(self.pool, pool => {
            let mut tx = pool.begin().await.context("Failed to begin transaction")?;
            let id = sqlx::query(
                r#"
                INSERT INTO quiz_results (quiz_id, user_id, score, answers, time_spent, completed_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(result.quiz_id)
            .bind(result.user_id)
            .bind(result.score)
            .bind(&answers)
            .bind(result.time_spent)
            .bind(result.completed_at)
            .execute(&mut *tx)
            .await
            .context("Failed to store quiz result")?
            .insert_id();

            sqlx::query(
                r#"
                UPDATE quizzes SET
                    participant_count = (SELECT COUNT(*) FROM quiz_results WHERE quiz_id = ?),
                    average_score = COALESCE((SELECT AVG(score) FROM quiz_results WHERE quiz_id = ?), 0)
                WHERE id = ?
                "#,
            )
            .bind(result.quiz_id)
            .bind(result.quiz_id)
            .bind(result.quiz_id)
            .execute(&mut *tx)
            .await
            .context("Failed to refresh quiz statistics")?;
            tx.commit().await.context("Failed to commit quiz result")?;
            id
        });

        Ok(QuizResult {
            id,
            ..result.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Difficulty, User};

    fn question(text: &str, correct_answer: i32) -> NewQuestionInput {
        NewQuestionInput {
            question: text.to_string(),
            options: vec!["yes".into(), "no".into()],
            correct_answer,
            explanation: None,
        }
    }

    #[tokio::test]
    async fn test_quiz_creation_and_results() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let user = SqlxUserRepository::new(pool.clone())
            .create(&User::new("q".into(), "q@example.com".into(), "h".into(), "Q".into(), false))
            .await
            .unwrap();
        let repo = SqlxQuizRepository::new(pool);

        let quiz = repo
            .create(
                &Quiz {
                    id: 0,
                    title: "Dune trivia".into(),
                    description: String::new(),
                    book_id: None,
                    created_by: user.id,
                    difficulty: Difficulty::Easy,
                    time_limit: 10,
                    question_count: 0,
                    participant_count: 0,
                    average_score: 0.0,
                    is_active: true,
                    created_at: Utc::now(),
                },
                &[question("Spice?", 0), question("Worms?", 1)],
            )
            .await
            .unwrap();
        assert_eq!(quiz.question_count, 2);

        let questions = repo.questions(quiz.id).await.unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].position, 1);
        assert_eq!(questions[1].position, 2);
        assert_eq!(questions[1].options, vec!["yes".to_string(), "no".to_string()]);

        for score in [100, 50] {
            repo.record_result(&QuizResult {
                id: 0,
                quiz_id: quiz.id,
                user_id: user.id,
                score,
                answers: vec![Some(0), None],
                time_spent: 30,
                completed_at: Utc::now(),
            })
            .await
            .unwrap();
        }

        let reloaded = repo.get_by_id(quiz.id).await.unwrap().unwrap();
        assert_eq!(reloaded.participant_count, 2);
        assert!((reloaded.average_score - 75.0).abs() < f64::EPSILON);
        assert_eq!(repo.list_by_creator(user.id).await.unwrap().len(), 1);
        assert_eq!(repo.list_active().await.unwrap().len(), 1);
    }
}
