use async_trait::async_trait;

use crate::error::StoreResult;
use crate::models::{
    Book, BookId, BookPatch, NewBook, NewReview, NewUser, RatingStats, RatingSummary, Review,
    ReviewId, ReviewPatch, User, UserId, UserPatch,
};
use crate::query::{BookQuery, Page, PageRequest};

#[async_trait]
pub trait BookStore: Send + Sync {
    /// Inserts a book with zeroed aggregates. Fails with `Duplicate` on a
    /// repeated ISBN.
    async fn insert_book(&self, book: NewBook) -> StoreResult<Book>;

    async fn get_book(&self, id: BookId) -> StoreResult<Option<Book>>;

    async fn find_book_by_isbn(&self, isbn: &str) -> StoreResult<Option<Book>>;

    async fn list_books(&self, query: &BookQuery) -> StoreResult<Page<Book>>;

    /// Applies the patch to the stored document, leaving the rating
    /// aggregates as they are. Returns `None` when the book does not exist.
    async fn update_book(&self, id: BookId, patch: BookPatch) -> StoreResult<Option<Book>>;

    async fn delete_book(&self, id: BookId) -> StoreResult<Option<Book>>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Fails with `Duplicate` when the user already reviewed the book.
    async fn insert_review(&self, review: NewReview) -> StoreResult<Review>;

    async fn get_review(&self, id: ReviewId) -> StoreResult<Option<Review>>;

    async fn find_review_for(&self, book: BookId, user: UserId) -> StoreResult<Option<Review>>;

    async fn update_review(&self, id: ReviewId, patch: ReviewPatch) -> StoreResult<Option<Review>>;

    /// Removes the review and hands back the removed document so callers can
    /// still act on its book reference.
    async fn delete_review(&self, id: ReviewId) -> StoreResult<Option<Review>>;

    /// Newest first.
    async fn list_reviews_for_book(&self, book: BookId, page: PageRequest) -> StoreResult<Page<Review>>;

    /// Newest first.
    async fn list_reviews_by_user(&self, user: UserId, page: PageRequest) -> StoreResult<Page<Review>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Duplicate` on a repeated email or username.
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Oldest first.
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    async fn update_user(&self, id: UserId, patch: UserPatch) -> StoreResult<Option<User>>;

    async fn delete_user(&self, id: UserId) -> StoreResult<Option<User>>;
}

/// The two operations the rating aggregator needs from the store.
#[async_trait]
pub trait RatingStore: Send + Sync {
    /// Count and unrounded mean of all reviews that reference `book`.
    async fn summarize_ratings(&self, book: BookId) -> StoreResult<RatingStats>;

    /// Single-document write of the aggregates. Returns `false` when the book
    /// no longer exists.
    async fn set_rating_summary(&self, book: BookId, summary: RatingSummary) -> StoreResult<bool>;
}

/// Every collection the service works with.
pub trait Store: BookStore + ReviewStore + UserStore + RatingStore {}

impl<T> Store for T where T: BookStore + ReviewStore + UserStore + RatingStore {}
