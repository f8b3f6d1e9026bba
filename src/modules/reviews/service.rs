//! Review lifecycle. Every successful mutation ends with a rating refresh
//! on the affected book before the call returns.

use std::collections::HashMap;
use std::sync::Arc;

use bookreview_authz::{require_owner, require_owner_or_admin, Principal};
use bookreview_db::{
    BookId, BookStore, NewReview, Page, PageRequest, Review, ReviewId, ReviewStore, Store,
    StoreError, User, UserId, UserStore,
};
use bookreview_http::AppError;
use serde_json::json;

use super::aggregator::{RatingAggregator, ReviewMutation};
use super::models::{CreateReview, ReviewView, UpdateReview};
use crate::modules::books::models::BookSummary;
use crate::modules::users::models::UserSummary;
use crate::utils::validate;

const ALREADY_REVIEWED: &str = "You have already reviewed this book.";

#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn Store>,
    aggregator: RatingAggregator,
}

impl ReviewService {
    pub fn new(store: Arc<dyn Store>, aggregator: RatingAggregator) -> Self {
        Self { store, aggregator }
    }

    pub async fn create(
        &self,
        book_id: BookId,
        author: &User,
        input: CreateReview,
    ) -> Result<ReviewView, AppError> {
        let input = input.normalized();
        validate(&input)?;

        if self.store.get_book(book_id).await?.is_none() {
            return Err(AppError::not_found("Book not found. Cannot create review."));
        }
        if self.store.find_review_for(book_id, author.id).await?.is_some() {
            return Err(already_reviewed());
        }

        // The pre-check above races with concurrent creates; the store's
        // uniqueness check is what actually holds the line.
        let review = self
            .store
            .insert_review(NewReview {
                book: book_id,
                user: author.id,
                rating: input.stars(),
                comment: input.comment,
            })
            .await
            .map_err(|e| match e {
                StoreError::Duplicate { .. } => already_reviewed(),
                other => other.into(),
            })?;
        tracing::info!(review_id = %review.id, book_id = %book_id, user_id = %author.id, rating = review.rating, "review created");

        self.aggregator.refresh(book_id, ReviewMutation::Created).await;

        Ok(ReviewView::new(review, Some(UserSummary::from(author)), None))
    }

    /// Author only; admins cannot edit someone else's review.
    pub async fn update(
        &self,
        review_id: ReviewId,
        caller: &Principal,
        input: UpdateReview,
    ) -> Result<ReviewView, AppError> {
        let review = self.find(review_id).await?;
        require_owner(caller, review.user)?;

        let input = input.normalized();
        validate(&input)?;

        let updated = self
            .store
            .update_review(review_id, input.into())
            .await?
            .ok_or_else(|| AppError::not_found("Review not found."))?;
        tracing::info!(review_id = %updated.id, book_id = %updated.book, rating = updated.rating, "review updated");

        self.aggregator.refresh(updated.book, ReviewMutation::Updated).await;

        let author = self.store.get_user(updated.user).await?;
        Ok(ReviewView::new(
            updated,
            author.as_ref().map(UserSummary::from),
            None,
        ))
    }

    /// Author or admin. Returns the removed review.
    pub async fn delete(&self, review_id: ReviewId, caller: &Principal) -> Result<Review, AppError> {
        let review = self.find(review_id).await?;
        require_owner_or_admin(caller, review.user)?;

        let deleted = self
            .store
            .delete_review(review_id)
            .await?
            .ok_or_else(|| AppError::not_found("Review not found for deletion."))?;
        tracing::info!(review_id = %deleted.id, book_id = %deleted.book, by = %caller.user_id, "review deleted");

        self.aggregator.refresh(deleted.book, ReviewMutation::Deleted).await;

        Ok(deleted)
    }

    /// Newest first, authors resolved.
    pub async fn list_for_book(
        &self,
        book_id: BookId,
        page: PageRequest,
    ) -> Result<Page<ReviewView>, AppError> {
        if self.store.get_book(book_id).await?.is_none() {
            return Err(AppError::not_found("Book not found, cannot fetch reviews."));
        }

        let reviews = self.store.list_reviews_for_book(book_id, page).await?;
        let authors = self.authors(&reviews.items).await?;

        Ok(reviews.map(|review| {
            let user = authors.get(&review.user).cloned();
            ReviewView::new(review, user, None)
        }))
    }

    /// Newest first, authors and books resolved. The owner comes back too
    /// so callers can name them.
    pub async fn list_by_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<(User, Page<ReviewView>), AppError> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found, cannot fetch their reviews."))?;

        let reviews = self.store.list_reviews_by_user(user_id, page).await?;

        let mut books: HashMap<BookId, Option<BookSummary>> = HashMap::new();
        for review in &reviews.items {
            if !books.contains_key(&review.book) {
                let book = self.store.get_book(review.book).await?;
                books.insert(review.book, book.as_ref().map(BookSummary::from));
            }
        }

        let author = UserSummary::from(&user);
        let page = reviews.map(|review| {
            let book = books.get(&review.book).cloned().flatten();
            ReviewView::new(review, Some(author.clone()), book)
        });

        Ok((user, page))
    }

    async fn find(&self, review_id: ReviewId) -> Result<Review, AppError> {
        self.store
            .get_review(review_id)
            .await?
            .ok_or_else(|| AppError::not_found("Review not found."))
    }

    async fn authors(&self, reviews: &[Review]) -> Result<HashMap<UserId, UserSummary>, AppError> {
        let mut authors = HashMap::new();
        for review in reviews {
            if authors.contains_key(&review.user) {
                continue;
            }
            if let Some(user) = self.store.get_user(review.user).await? {
                authors.insert(user.id, UserSummary::from(&user));
            }
        }
        Ok(authors)
    }
}

fn already_reviewed() -> AppError {
    AppError::conflict(
        vec![json!({ "field": "book,user", "error": "duplicate" })],
        ALREADY_REVIEWED,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bookreview_db::{
        Book, BookPatch, BookQuery, MemoryStore, NewBook, NewUser, RatingStats, RatingStore,
        RatingSummary, ReviewPatch, StoreResult, UserPatch,
    };
    use uuid::Uuid;

    struct Fixture {
        store: Arc<MemoryStore>,
        service: ReviewService,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let service = ReviewService::new(store.clone(), RatingAggregator::new(store.clone()));
            Self { store, service }
        }

        /// The duplicate pre-check always passes, leaving uniqueness to the
        /// store.
        fn with_stale_lookup() -> Self {
            let store = Arc::new(MemoryStore::new());
            let racing: Arc<dyn Store> = Arc::new(StaleLookup(store.clone()));
            let service = ReviewService::new(racing, RatingAggregator::new(store.clone()));
            Self { store, service }
        }

        /// Reviews go through the service, but the aggregator never reaches
        /// a working store.
        fn with_broken_ratings() -> Self {
            let store = Arc::new(MemoryStore::new());
            let service = ReviewService::new(store.clone(), RatingAggregator::new(Arc::new(BrokenRatings)));
            Self { store, service }
        }

        async fn book(&self) -> BookId {
            self.store
                .insert_book(NewBook {
                    title: "The Left Hand of Darkness".to_string(),
                    author: "Ursula K. Le Guin".to_string(),
                    genre: "Science Fiction".to_string(),
                    description: "Winter.".to_string(),
                    ..Default::default()
                })
                .await
                .unwrap()
                .id
        }

        async fn user(&self, name: &str, is_admin: bool) -> User {
            self.store
                .insert_user(NewUser {
                    username: name.to_string(),
                    email: format!("{name}@example.com"),
                    password_hash: "hash".to_string(),
                    is_admin,
                    ..Default::default()
                })
                .await
                .unwrap()
        }

        async fn review(&self, book: BookId, author: &User, rating: u8) -> ReviewView {
            self.service
                .create(
                    book,
                    author,
                    CreateReview {
                        rating: f64::from(rating),
                        comment: format!("{rating} stars"),
                    },
                )
                .await
                .unwrap()
        }

        async fn aggregates(&self, book: BookId) -> (f64, u64) {
            let book = self.store.get_book(book).await.unwrap().unwrap();
            (book.avg_rating, book.ratings_count)
        }
    }

    struct BrokenRatings;

    #[async_trait]
    impl RatingStore for BrokenRatings {
        async fn summarize_ratings(&self, _book: BookId) -> StoreResult<RatingStats> {
            Err(StoreError::Unavailable("aggregation pipeline down".to_string()))
        }

        async fn set_rating_summary(&self, _book: BookId, _summary: RatingSummary) -> StoreResult<bool> {
            Err(StoreError::Unavailable("aggregation pipeline down".to_string()))
        }
    }

    /// Delegates to a memory store, but the existing-review lookup never sees
    /// a review, as when two creates for the same book and user interleave.
    struct StaleLookup(Arc<MemoryStore>);

    #[async_trait]
    impl BookStore for StaleLookup {
        async fn insert_book(&self, book: NewBook) -> StoreResult<Book> {
            self.0.insert_book(book).await
        }

        async fn get_book(&self, id: BookId) -> StoreResult<Option<Book>> {
            self.0.get_book(id).await
        }

        async fn find_book_by_isbn(&self, isbn: &str) -> StoreResult<Option<Book>> {
            self.0.find_book_by_isbn(isbn).await
        }

        async fn list_books(&self, query: &BookQuery) -> StoreResult<Page<Book>> {
            self.0.list_books(query).await
        }

        async fn update_book(&self, id: BookId, patch: BookPatch) -> StoreResult<Option<Book>> {
            self.0.update_book(id, patch).await
        }

        async fn delete_book(&self, id: BookId) -> StoreResult<Option<Book>> {
            self.0.delete_book(id).await
        }
    }

    #[async_trait]
    impl ReviewStore for StaleLookup {
        async fn insert_review(&self, review: NewReview) -> StoreResult<Review> {
            self.0.insert_review(review).await
        }

        async fn get_review(&self, id: ReviewId) -> StoreResult<Option<Review>> {
            self.0.get_review(id).await
        }

        async fn find_review_for(&self, _book: BookId, _user: UserId) -> StoreResult<Option<Review>> {
            tokio::task::yield_now().await;
            Ok(None)
        }

        async fn update_review(&self, id: ReviewId, patch: ReviewPatch) -> StoreResult<Option<Review>> {
            self.0.update_review(id, patch).await
        }

        async fn delete_review(&self, id: ReviewId) -> StoreResult<Option<Review>> {
            self.0.delete_review(id).await
        }

        async fn list_reviews_for_book(&self, book: BookId, page: PageRequest) -> StoreResult<Page<Review>> {
            self.0.list_reviews_for_book(book, page).await
        }

        async fn list_reviews_by_user(&self, user: UserId, page: PageRequest) -> StoreResult<Page<Review>> {
            self.0.list_reviews_by_user(user, page).await
        }
    }

    #[async_trait]
    impl UserStore for StaleLookup {
        async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
            self.0.insert_user(user).await
        }

        async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
            self.0.get_user(id).await
        }

        async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
            self.0.find_user_by_email(email).await
        }

        async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
            self.0.find_user_by_username(username).await
        }

        async fn list_users(&self) -> StoreResult<Vec<User>> {
            self.0.list_users().await
        }

        async fn update_user(&self, id: UserId, patch: UserPatch) -> StoreResult<Option<User>> {
            self.0.update_user(id, patch).await
        }

        async fn delete_user(&self, id: UserId) -> StoreResult<Option<User>> {
            self.0.delete_user(id).await
        }
    }

    #[async_trait]
    impl RatingStore for StaleLookup {
        async fn summarize_ratings(&self, book: BookId) -> StoreResult<RatingStats> {
            self.0.summarize_ratings(book).await
        }

        async fn set_rating_summary(&self, book: BookId, summary: RatingSummary) -> StoreResult<bool> {
            self.0.set_rating_summary(book, summary).await
        }
    }

    fn principal(user: &User) -> Principal {
        Principal {
            user_id: user.id,
            is_admin: user.is_admin,
        }
    }

    #[tokio::test]
    async fn three_reviews_average_to_four() {
        let fx = Fixture::new();
        let book = fx.book().await;

        for (i, rating) in [4, 5, 3].into_iter().enumerate() {
            let author = fx.user(&format!("reader{i}"), false).await;
            fx.review(book, &author, rating).await;
        }

        assert_eq!(fx.aggregates(book).await, (4.0, 3));
    }

    #[tokio::test]
    async fn aggregates_track_every_creation() {
        let fx = Fixture::new();
        let book = fx.book().await;
        let ratings = [5, 4, 4, 2, 1, 5, 3];

        for (i, rating) in ratings.into_iter().enumerate() {
            let author = fx.user(&format!("reader{i}"), false).await;
            fx.review(book, &author, rating).await;

            let seen = &ratings[..=i];
            let mean = seen.iter().map(|r| f64::from(*r)).sum::<f64>() / seen.len() as f64;
            let expected = (mean * 10.0).round() / 10.0;
            assert_eq!(fx.aggregates(book).await, (expected, seen.len() as u64));
        }
    }

    #[tokio::test]
    async fn updating_sole_review_moves_the_average() {
        let fx = Fixture::new();
        let book = fx.book().await;
        let author = fx.user("ana", false).await;
        let review = fx.review(book, &author, 3).await;
        assert_eq!(fx.aggregates(book).await, (3.0, 1));

        let updated = fx
            .service
            .update(
                review.id,
                &principal(&author),
                UpdateReview {
                    rating: Some(5.0),
                    comment: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.rating, 5);
        assert_eq!(updated.comment, "3 stars");
        assert_eq!(updated.user.unwrap().username, "ana");
        assert_eq!(fx.aggregates(book).await, (5.0, 1));
    }

    #[tokio::test]
    async fn deleting_only_review_resets_to_zero() {
        let fx = Fixture::new();
        let book = fx.book().await;
        let author = fx.user("ben", false).await;
        let review = fx.review(book, &author, 2).await;

        let deleted = fx.service.delete(review.id, &principal(&author)).await.unwrap();

        assert_eq!(deleted.book, book);
        assert_eq!(fx.aggregates(book).await, (0.0, 0));
    }

    #[tokio::test]
    async fn duplicate_review_is_rejected_and_aggregates_hold() {
        let fx = Fixture::new();
        let book = fx.book().await;
        let author = fx.user("cy", false).await;
        fx.review(book, &author, 4).await;

        let err = fx
            .service
            .create(
                book,
                &author,
                CreateReview {
                    rating: 1.0,
                    comment: "second thoughts".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict { .. }), "got {err:?}");
        assert_eq!(fx.aggregates(book).await, (4.0, 1));
    }

    #[tokio::test]
    async fn deleting_review_of_deleted_book_succeeds() {
        let fx = Fixture::new();
        let book = fx.book().await;
        let author = fx.user("dee", false).await;
        let review = fx.review(book, &author, 5).await;

        fx.store.delete_book(book).await.unwrap();

        let deleted = fx.service.delete(review.id, &principal(&author)).await.unwrap();
        assert_eq!(deleted.id, review.id);
        assert!(fx.store.get_review(review.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn aggregation_failure_does_not_fail_the_mutation() {
        let fx = Fixture::with_broken_ratings();
        let book = fx.book().await;
        let author = fx.user("eve", false).await;

        let review = fx.review(book, &author, 5).await;
        assert!(fx.store.get_review(review.id).await.unwrap().is_some());
        assert_eq!(fx.aggregates(book).await, (0.0, 0));

        fx.service
            .update(
                review.id,
                &principal(&author),
                UpdateReview {
                    rating: Some(1.0),
                    comment: None,
                },
            )
            .await
            .unwrap();
        fx.service.delete(review.id, &principal(&author)).await.unwrap();
        assert!(fx.store.get_review(review.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn review_for_missing_book_is_not_found() {
        let fx = Fixture::new();
        let author = fx.user("fay", false).await;

        let err = fx
            .service
            .create(
                Uuid::now_v7(),
                &author,
                CreateReview {
                    rating: 3.0,
                    comment: "where is it".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn invalid_rating_is_a_validation_error() {
        let fx = Fixture::new();
        let book = fx.book().await;
        let author = fx.user("gus", false).await;

        let err = fx
            .service
            .create(
                book,
                &author,
                CreateReview {
                    rating: 6.0,
                    comment: "too good".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(fx.aggregates(book).await, (0.0, 0));
    }

    #[tokio::test]
    async fn only_the_author_may_update() {
        let fx = Fixture::new();
        let book = fx.book().await;
        let author = fx.user("hal", false).await;
        let admin = fx.user("root", true).await;
        let review = fx.review(book, &author, 4).await;

        for caller in [&admin, &fx.user("ivy", false).await] {
            let err = fx
                .service
                .update(
                    review.id,
                    &principal(caller),
                    UpdateReview {
                        rating: Some(1.0),
                        comment: None,
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Forbidden { .. }));
        }

        assert_eq!(fx.aggregates(book).await, (4.0, 1));
    }

    #[tokio::test]
    async fn author_or_admin_may_delete() {
        let fx = Fixture::new();
        let book = fx.book().await;
        let author = fx.user("jo", false).await;
        let stranger = fx.user("kai", false).await;
        let admin = fx.user("root", true).await;
        let review = fx.review(book, &author, 4).await;

        let err = fx.service.delete(review.id, &principal(&stranger)).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
        assert_eq!(fx.aggregates(book).await, (4.0, 1));

        fx.service.delete(review.id, &principal(&admin)).await.unwrap();
        assert_eq!(fx.aggregates(book).await, (0.0, 0));
    }

    #[tokio::test]
    async fn listing_resolves_authors_and_books() {
        let fx = Fixture::new();
        let book = fx.book().await;
        let author = fx.user("lee", false).await;
        fx.review(book, &author, 4).await;

        let page = fx
            .service
            .list_for_book(book, PageRequest::new(1, 5))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].user.as_ref().unwrap().username, "lee");
        assert!(page.items[0].book.is_none());

        let (owner, page) = fx
            .service
            .list_by_user(author.id, PageRequest::new(1, 5))
            .await
            .unwrap();
        assert_eq!(owner.username, "lee");
        let summary = page.items[0].book.as_ref().unwrap();
        assert_eq!(summary.title, "The Left Hand of Darkness");

        let err = fx
            .service
            .list_for_book(Uuid::now_v7(), PageRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn concurrent_duplicate_creates_conflict_once() {
        let fx = Fixture::with_stale_lookup();
        let book = fx.book().await;
        let author = fx.user("twin", false).await;
        let input = |rating: f64| CreateReview {
            rating,
            comment: "Posted twice.".to_string(),
        };

        let (first, second) = tokio::join!(
            fx.service.create(book, &author, input(5.0)),
            fx.service.create(book, &author, input(1.0)),
        );

        let conflicts = [&first, &second]
            .into_iter()
            .filter(|result| matches!(result, Err(AppError::Conflict { .. })))
            .count();
        assert_eq!(conflicts, 1);
        assert_eq!(
            [&first, &second].into_iter().filter(|result| result.is_ok()).count(),
            1
        );

        let (_, count) = fx.aggregates(book).await;
        assert_eq!(count, 1);
    }
}
