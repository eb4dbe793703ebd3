//! Book service
//!
//! Catalogue lookups: merged Open Library and local search, trending and
//! recent lists, and adding books without duplicating Open Library imports.

use crate::db::repositories::BookRepository;
use crate::models::{Book, BookCandidate, CreateBookInput, TrendingBook, TrendingPeriod};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::open_library::OpenLibraryClient;
use anyhow::Context;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

/// Maximum number of search results
pub const SEARCH_LIMIT: usize = 20;

/// Size of the trending and recent lists
pub const LIST_LIMIT: i64 = 10;

pub struct BookService {
    book_repo: Arc<dyn BookRepository>,
    open_library: Arc<OpenLibraryClient>,
}

impl BookService {
    pub fn new(book_repo: Arc<dyn BookRepository>, open_library: Arc<OpenLibraryClient>) -> Self {
        Self {
            book_repo,
            open_library,
        }
    }

    /// Search Open Library and the local catalogue.
    ///
    /// Remote hits come first; duplicates by (title, author) keep the first
    /// occurrence. When Open Library is unavailable only local hits are returned.
    pub async fn search(&self, query: &str) -> ServiceResult<Vec<BookCandidate>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ServiceError::validation("Search query is required"));
        }

        let remote = match self.open_library.search_candidates(query).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(query, error = %e, "Open Library search failed, using local results");
                Vec::new()
            }
        };

        let local = self
            .book_repo
            .search(query, SEARCH_LIMIT as i64)
            .await
            .context("Failed to search local books")?;

        Ok(merge_candidates(
            remote,
            local.into_iter().map(BookCandidate::from),
        ))
    }

    pub async fn trending(&self, period: TrendingPeriod) -> ServiceResult<Vec<TrendingBook>> {
        let books = self
            .book_repo
            .trending(period.since(Utc::now()), LIST_LIMIT)
            .await
            .context("Failed to load trending books")?;
        Ok(books)
    }

    pub async fn recent(&self) -> ServiceResult<Vec<Book>> {
        let books = self
            .book_repo
            .recent(LIST_LIMIT)
            .await
            .context("Failed to load recent books")?;
        Ok(books)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Book> {
        self.book_repo
            .get_by_id(id)
            .await
            .context("Failed to get book")?
            .ok_or_else(|| ServiceError::not_found(format!("Book {}", id)))
    }

    /// Add a book, or return the existing one with the same Open Library key
    pub async fn create_or_resolve(&self, mut input: CreateBookInput) -> ServiceResult<Book> {
        input.title = input.title.trim().to_string();
        input.author = input.author.trim().to_string();
        if input.title.is_empty() {
            return Err(ServiceError::validation("Book title is required"));
        }
        if input.author.is_empty() {
            return Err(ServiceError::validation("Book author is required"));
        }
        input.open_library_key = input
            .open_library_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        if let Some(key) = input.open_library_key.as_deref() {
            if let Some(existing) = self
                .book_repo
                .get_by_open_library_key(key)
                .await
                .context("Failed to look up Open Library key")?
            {
                return Ok(existing);
            }
        }

        let book = self
            .book_repo
            .create(&Book::from(input))
            .await
            .context("Failed to create book")?;
        tracing::debug!(book_id = book.id, title = %book.title, "Book added");
        Ok(book)
    }

    /// Recompute a book's rating aggregate
    pub async fn refresh_rating(&self, book_id: i64) -> ServiceResult<()> {
        self.book_repo
            .refresh_rating(book_id)
            .await
            .context("Failed to refresh book rating")?;
        Ok(())
    }
}

/// Concatenate candidate lists, dropping later (title, author) duplicates
/// and capping the result at [`SEARCH_LIMIT`].
pub fn merge_candidates(
    first: Vec<BookCandidate>,
    rest: impl IntoIterator<Item = BookCandidate>,
) -> Vec<BookCandidate> {
    let mut seen = HashSet::new();
    first
        .into_iter()
        .chain(rest)
        .filter(|c| seen.insert((c.title.to_lowercase(), c.author.to_lowercase())))
        .take(SEARCH_LIMIT)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenLibraryConfig;
    use crate::db::repositories::SqlxBookRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> BookService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let client = OpenLibraryClient::new(&OpenLibraryConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 1,
            ..OpenLibraryConfig::default()
        })
        .unwrap();
        BookService::new(SqlxBookRepository::boxed(pool), Arc::new(client))
    }

    fn candidate(title: &str, author: &str) -> BookCandidate {
        BookCandidate {
            id: None,
            title: title.to_string(),
            author: author.to_string(),
            isbn: None,
            cover_url: None,
            description: None,
            open_library_key: None,
            publish_year: None,
            page_count: None,
            subjects: Vec::new(),
        }
    }

    fn input(title: &str, key: Option<&str>) -> CreateBookInput {
        CreateBookInput {
            title: title.to_string(),
            author: "Frank Herbert".to_string(),
            open_library_key: key.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_dedupes_and_caps() {
        let remote = vec![candidate("Dune", "Frank Herbert"), candidate("Emma", "Jane Austen")];
        let local = vec![candidate("dune", "frank herbert"), candidate("Ubik", "Philip K. Dick")];
        let merged = merge_candidates(remote, local);
        let titles: Vec<_> = merged.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Dune", "Emma", "Ubik"]);

        let many: Vec<_> = (0..30).map(|i| candidate(&format!("Book {}", i), "A")).collect();
        assert_eq!(merge_candidates(many, Vec::new()).len(), SEARCH_LIMIT);
    }

    #[tokio::test]
    async fn test_search_falls_back_to_local() {
        let service = setup().await;
        service.create_or_resolve(input("Dune", None)).await.unwrap();
        service.create_or_resolve(input("Children of Dune", None)).await.unwrap();
        service.create_or_resolve(input("Emma", None)).await.unwrap();

        let hits = service.search("dune").await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|c| c.id.is_some()));
    }

    #[tokio::test]
    async fn test_search_requires_query() {
        let service = setup().await;
        assert!(matches!(
            service.search("   ").await,
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_open_library_key_resolves_existing() {
        let service = setup().await;
        let first = service
            .create_or_resolve(input("Dune", Some("/works/OL45804W")))
            .await
            .unwrap();
        let second = service
            .create_or_resolve(input("Dune (again)", Some("/works/OL45804W")))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.title, "Dune");

        let other = service.create_or_resolve(input("Dune", None)).await.unwrap();
        assert_ne!(other.id, first.id);
    }

    #[tokio::test]
    async fn test_create_validation_and_get() {
        let service = setup().await;
        assert!(matches!(
            service.create_or_resolve(input("  ", None)).await,
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(service.get(99).await, Err(ServiceError::NotFound(_))));

        let book = service.create_or_resolve(input("Dune", None)).await.unwrap();
        assert_eq!(service.get(book.id).await.unwrap().title, "Dune");
        assert_eq!(service.recent().await.unwrap().len(), 1);
        assert_eq!(service.trending(TrendingPeriod::All).await.unwrap().len(), 1);
    }
}
