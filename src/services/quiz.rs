//! Quiz service
//!
//! Reader-made multiple-choice quizzes. Answers never leave the server
//! before submission; a graded submission credits the points above 50%.

use crate::db::repositories::QuizRepository;
use crate::models::{
    grade, CreateQuizInput, Difficulty, NewQuestionInput, PublicQuestion, Quiz, QuizOutcome,
    QuizResult, SubmitQuizInput, User,
};
use crate::services::book::BookService;
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::user::UserService;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Minutes allowed when the creator sets no limit
pub const DEFAULT_TIME_LIMIT: i32 = 10;

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 6;

/// Check a question list and normalise its text
pub fn validate_questions(questions: &[NewQuestionInput]) -> ServiceResult<Vec<NewQuestionInput>> {
    if questions.is_empty() {
        return Err(ServiceError::validation("A quiz needs at least one question"));
    }

    questions
        .iter()
        .enumerate()
        .map(|(index, q)| {
            let number = index + 1;
            let question = q.question.trim();
            if question.is_empty() {
                return Err(ServiceError::validation(format!(
                    "Question {} has no text",
                    number
                )));
            }
            if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&q.options.len()) {
                return Err(ServiceError::validation(format!(
                    "Question {} needs between {} and {} options",
                    number, MIN_OPTIONS, MAX_OPTIONS
                )));
            }
            if q.options.iter().any(|o| o.trim().is_empty()) {
                return Err(ServiceError::validation(format!(
                    "Question {} has an empty option",
                    number
                )));
            }
            if q.correct_answer < 0 || q.correct_answer as usize >= q.options.len() {
                return Err(ServiceError::validation(format!(
                    "Question {} has no valid correct answer",
                    number
                )));
            }

            Ok(NewQuestionInput {
                question: question.to_string(),
                options: q.options.iter().map(|o| o.trim().to_string()).collect(),
                correct_answer: q.correct_answer,
                explanation: q
                    .explanation
                    .as_deref()
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(str::to_string),
            })
        })
        .collect()
}

pub struct QuizService {
    quiz_repo: Arc<dyn QuizRepository>,
    books: Arc<BookService>,
    users: Arc<UserService>,
}

impl QuizService {
    pub fn new(
        quiz_repo: Arc<dyn QuizRepository>,
        books: Arc<BookService>,
        users: Arc<UserService>,
    ) -> Self {
        Self {
            quiz_repo,
            books,
            users,
        }
    }

    pub async fn create(&self, creator: &User, input: CreateQuizInput) -> ServiceResult<Quiz> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(ServiceError::validation("Quiz title is required"));
        }
        let difficulty = match input.difficulty.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw
                .parse::<Difficulty>()
                .map_err(|_| ServiceError::validation(format!("Invalid difficulty: {}", raw)))?,
            _ => Difficulty::default(),
        };
        let time_limit = input.time_limit.unwrap_or(DEFAULT_TIME_LIMIT);
        if time_limit <= 0 {
            return Err(ServiceError::validation("Time limit must be positive"));
        }
        let questions = validate_questions(&input.questions)?;
        if let Some(book_id) = input.book_id {
            self.books.get(book_id).await?;
        }

        let quiz = Quiz {
            id: 0,
            title: title.to_string(),
            description: input.description.trim().to_string(),
            book_id: input.book_id,
            created_by: creator.id,
            difficulty,
            time_limit,
            question_count: questions.len() as i64,
            participant_count: 0,
            average_score: 0.0,
            is_active: true,
            created_at: Utc::now(),
        };

        let quiz = self
            .quiz_repo
            .create(&quiz, &questions)
            .await
            .context("Failed to create quiz")?;
        tracing::debug!(quiz_id = quiz.id, user_id = creator.id, "Quiz created");
        Ok(quiz)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Quiz> {
        self.quiz_repo
            .get_by_id(id)
            .await
            .context("Failed to get quiz")?
            .ok_or_else(|| ServiceError::not_found(format!("Quiz {}", id)))
    }

    pub async fn list_active(&self) -> ServiceResult<Vec<Quiz>> {
        let quizzes = self
            .quiz_repo
            .list_active()
            .await
            .context("Failed to list quizzes")?;
        Ok(quizzes)
    }

    /// Quizzes created by `user_id`; visible to that user only
    pub async fn list_mine(&self, actor: &User, user_id: i64) -> ServiceResult<Vec<Quiz>> {
        if actor.id != user_id {
            return Err(ServiceError::forbidden("You can only list your own quizzes"));
        }
        let quizzes = self
            .quiz_repo
            .list_by_creator(user_id)
            .await
            .context("Failed to list quizzes")?;
        Ok(quizzes)
    }

    /// Questions without their answers
    pub async fn public_questions(&self, quiz_id: i64) -> ServiceResult<Vec<PublicQuestion>> {
        self.get(quiz_id).await?;
        let questions = self
            .quiz_repo
            .questions(quiz_id)
            .await
            .context("Failed to load questions")?;
        Ok(questions.iter().map(|q| q.public()).collect())
    }

    /// Grade a submission, store the result, then credit points
    pub async fn submit(
        &self,
        actor: &User,
        quiz_id: i64,
        input: SubmitQuizInput,
    ) -> ServiceResult<QuizOutcome> {
        let quiz = self.get(quiz_id).await?;
        if !quiz.is_active {
            return Err(ServiceError::not_found(format!("Quiz {}", quiz_id)));
        }
        let questions = self
            .quiz_repo
            .questions(quiz_id)
            .await
            .context("Failed to load questions")?;
        if questions.is_empty() {
            return Err(ServiceError::validation("This quiz has no questions"));
        }

        let outcome = grade(&questions, &input.answers);
        self.quiz_repo
            .record_result(&QuizResult {
                id: 0,
                quiz_id,
                user_id: actor.id,
                score: outcome.score,
                answers: input.answers,
                time_spent: input.time_spent.unwrap_or(0).max(0),
                completed_at: Utc::now(),
            })
            .await
            .context("Failed to store quiz result")?;
        self.users.add_points(actor.id, outcome.points_earned).await?;

        tracing::debug!(
            quiz_id,
            user_id = actor.id,
            score = outcome.score,
            points = outcome.points_earned,
            "Quiz submitted"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{register, TestContext};

    fn question(text: &str, options: &[&str], correct: i32) -> NewQuestionInput {
        NewQuestionInput {
            question: text.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: correct,
            explanation: Some("Because.".to_string()),
        }
    }

    fn quiz_input(questions: Vec<NewQuestionInput>) -> CreateQuizInput {
        CreateQuizInput {
            title: "Dune trivia".to_string(),
            description: "How well do you know Arrakis?".to_string(),
            book_id: None,
            difficulty: Some("hard".to_string()),
            time_limit: None,
            questions,
        }
    }

    fn three_questions() -> Vec<NewQuestionInput> {
        vec![
            question("Planet?", &["Arrakis", "Caladan"], 0),
            question("Spice?", &["Melange", "Salt", "Pepper"], 0),
            question("Author?", &["Asimov", "Herbert"], 1),
        ]
    }

    #[test]
    fn test_question_validation() {
        assert!(validate_questions(&[]).is_err());
        assert!(validate_questions(&[question("Q", &["only"], 0)]).is_err());
        assert!(validate_questions(&[question("Q", &["a", "b", "c", "d", "e", "f", "g"], 0)]).is_err());
        assert!(validate_questions(&[question("Q", &["a", "b"], 2)]).is_err());
        assert!(validate_questions(&[question("Q", &["a", "b"], -1)]).is_err());
        assert!(validate_questions(&[question(" ", &["a", "b"], 0)]).is_err());

        let ok = validate_questions(&[question(" Q ", &[" a ", "b"], 1)]).unwrap();
        assert_eq!(ok[0].question, "Q");
        assert_eq!(ok[0].options[0], "a");
    }

    #[tokio::test]
    async fn test_create_and_hide_answers() {
        let ctx = TestContext::new().await;
        let creator = register(&ctx, "creator").await;
        let quizzes = &ctx.services.quizzes;

        let quiz = quizzes.create(&creator, quiz_input(three_questions())).await.unwrap();
        assert_eq!(quiz.question_count, 3);
        assert_eq!(quiz.difficulty, Difficulty::Hard);
        assert_eq!(quiz.time_limit, DEFAULT_TIME_LIMIT);

        let questions = quizzes.public_questions(quiz.id).await.unwrap();
        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0].position, 1);
        assert_eq!(questions[2].question, "Author?");
        let json = serde_json::to_value(&questions[0]).unwrap();
        assert!(json.get("correctAnswer").is_none());

        assert_eq!(quizzes.list_active().await.unwrap().len(), 1);
        assert_eq!(quizzes.list_mine(&creator, creator.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let ctx = TestContext::new().await;
        let creator = register(&ctx, "creator").await;
        let quizzes = &ctx.services.quizzes;

        assert!(matches!(
            quizzes.create(&creator, quiz_input(Vec::new())).await,
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            quizzes
                .create(&creator, CreateQuizInput { difficulty: Some("insane".into()), ..quiz_input(three_questions()) })
                .await,
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            quizzes
                .create(&creator, CreateQuizInput { book_id: Some(42), ..quiz_input(three_questions()) })
                .await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_scores_and_credits() {
        let ctx = TestContext::new().await;
        let creator = register(&ctx, "creator").await;
        let player = register(&ctx, "player").await;
        let quizzes = &ctx.services.quizzes;
        let quiz = quizzes.create(&creator, quiz_input(three_questions())).await.unwrap();

        let outcome = quizzes
            .submit(
                &player,
                quiz.id,
                SubmitQuizInput {
                    quiz_id: None,
                    answers: vec![Some(0), Some(0), Some(0)],
                    time_spent: Some(42),
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.correct_answers, 2);
        assert_eq!(outcome.score, 67);
        assert_eq!(outcome.points_earned, 17);
        assert!(!outcome.results[2].correct);
        assert_eq!(outcome.results[2].correct_answer, 1);
        assert_eq!(ctx.services.users.get(player.id).await.unwrap().points, 17);

        // A perfect run from the creator moves the aggregates
        quizzes
            .submit(
                &creator,
                quiz.id,
                SubmitQuizInput {
                    quiz_id: None,
                    answers: vec![Some(0), Some(0), Some(1)],
                    time_spent: None,
                },
            )
            .await
            .unwrap();
        let quiz = quizzes.get(quiz.id).await.unwrap();
        assert_eq!(quiz.participant_count, 2);
        assert!((quiz.average_score - 83.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_failed_store_credits_nothing() {
        let ctx = TestContext::new().await;
        let creator = register(&ctx, "creator").await;
        let quizzes = &ctx.services.quizzes;
        let quiz = quizzes.create(&creator, quiz_input(three_questions())).await.unwrap();

        ctx.pool.execute("DROP TABLE quiz_results").await.unwrap();

        let result = quizzes
            .submit(
                &creator,
                quiz.id,
                SubmitQuizInput {
                    quiz_id: None,
                    answers: vec![Some(0), Some(0), Some(1)],
                    time_spent: None,
                },
            )
            .await;
        assert!(matches!(result, Err(ServiceError::InternalError(_))));
        assert_eq!(ctx.services.users.get(creator.id).await.unwrap().points, 0);
    }

    #[tokio::test]
    async fn test_low_score_earns_nothing() {
        let ctx = TestContext::new().await;
        let creator = register(&ctx, "creator").await;
        let quizzes = &ctx.services.quizzes;
        let quiz = quizzes.create(&creator, quiz_input(three_questions())).await.unwrap();

        let outcome = quizzes
            .submit(
                &creator,
                quiz.id,
                SubmitQuizInput { quiz_id: None, answers: vec![], time_spent: None },
            )
            .await
            .unwrap();
        assert_eq!(outcome.score, 0);
        assert_eq!(outcome.points_earned, 0);
        assert_eq!(ctx.services.users.get(creator.id).await.unwrap().points, 0);

        assert!(matches!(
            quizzes
                .submit(&creator, 999, SubmitQuizInput { quiz_id: None, answers: vec![], time_spent: None })
                .await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
