use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    Book, BookId, BookPatch, NewBook, NewReview, NewUser, RatingStats, RatingSummary, Review,
    ReviewId, ReviewPatch, User, UserId, UserPatch,
};
use crate::query::{BookQuery, BookSortField, Page, PageRequest, SortDirection};
use crate::store::{BookStore, RatingStore, ReviewStore, UserStore};

/// In-process document store. Each collection sits behind its own lock, so
/// a write is atomic per document but nothing spans collections.
#[derive(Debug, Default)]
pub struct MemoryStore {
    books: RwLock<HashMap<BookId, Book>>,
    reviews: RwLock<HashMap<ReviewId, Review>>,
    users: RwLock<HashMap<UserId, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (OffsetDateTime, Uuid)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn compare_books(a: &Book, b: &Book, field: BookSortField) -> Ordering {
    match field {
        BookSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        BookSortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        BookSortField::Author => a.author.to_lowercase().cmp(&b.author.to_lowercase()),
        BookSortField::AvgRating => a.avg_rating.total_cmp(&b.avg_rating),
        BookSortField::RatingsCount => a.ratings_count.cmp(&b.ratings_count),
        BookSortField::PublishedDate => a.published_date.cmp(&b.published_date),
    }
    .then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn insert_book(&self, book: NewBook) -> StoreResult<Book> {
        let mut books = self.books.write().await;

        if let Some(isbn) = &book.isbn {
            if books.values().any(|b| b.isbn.as_ref() == Some(isbn)) {
                return Err(StoreError::Duplicate { field: "isbn" });
            }
        }

        let stored = book.into_book(Uuid::now_v7(), OffsetDateTime::now_utc());
        books.insert(stored.id, stored.clone());

        tracing::debug!(target: "bookreview-db", book_id = %stored.id, "book inserted");
        Ok(stored)
    }

    async fn get_book(&self, id: BookId) -> StoreResult<Option<Book>> {
        Ok(self.books.read().await.get(&id).cloned())
    }

    async fn find_book_by_isbn(&self, isbn: &str) -> StoreResult<Option<Book>> {
        Ok(self
            .books
            .read()
            .await
            .values()
            .find(|b| b.isbn.as_deref() == Some(isbn))
            .cloned())
    }

    async fn list_books(&self, query: &BookQuery) -> StoreResult<Page<Book>> {
        let search = query.search.as_deref().map(str::to_lowercase);
        let genre = query.genre.as_deref().map(str::to_lowercase);

        let mut matching: Vec<Book> = self
            .books
            .read()
            .await
            .values()
            .filter(|b| {
                search.as_deref().map_or(true, |s| {
                    contains_ci(&b.title, s) || contains_ci(&b.author, s) || contains_ci(&b.genre, s)
                })
            })
            .filter(|b| genre.as_deref().map_or(true, |g| contains_ci(&b.genre, g)))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            let ordering = compare_books(a, b, query.sort.field);
            match query.sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        Ok(Page::slice(matching, query.page))
    }

    async fn update_book(&self, id: BookId, patch: BookPatch) -> StoreResult<Option<Book>> {
        let mut books = self.books.write().await;

        if let Some(isbn) = &patch.isbn {
            if books
                .values()
                .any(|b| b.id != id && b.isbn.as_ref() == Some(isbn))
            {
                return Err(StoreError::Duplicate { field: "isbn" });
            }
        }

        let Some(book) = books.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = patch.title {
            book.title = title;
        }
        if let Some(author) = patch.author {
            book.author = author;
        }
        if let Some(genre) = patch.genre {
            book.genre = genre;
        }
        if let Some(description) = patch.description {
            book.description = description;
        }
        if let Some(cover_image) = patch.cover_image {
            book.cover_image = cover_image;
        }
        if let Some(isbn) = patch.isbn {
            book.isbn = Some(isbn);
        }
        if let Some(published_date) = patch.published_date {
            book.published_date = Some(published_date);
        }
        if let Some(page_count) = patch.page_count {
            book.page_count = Some(page_count);
        }
        book.updated_at = OffsetDateTime::now_utc();

        Ok(Some(book.clone()))
    }

    async fn delete_book(&self, id: BookId) -> StoreResult<Option<Book>> {
        Ok(self.books.write().await.remove(&id))
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn insert_review(&self, review: NewReview) -> StoreResult<Review> {
        let mut reviews = self.reviews.write().await;

        if reviews
            .values()
            .any(|r| r.book == review.book && r.user == review.user)
        {
            return Err(StoreError::Duplicate { field: "book,user" });
        }

        let stored = review.into_review(Uuid::now_v7(), OffsetDateTime::now_utc());
        reviews.insert(stored.id, stored.clone());

        tracing::debug!(
            target: "bookreview-db",
            review_id = %stored.id,
            book_id = %stored.book,
            "review inserted"
        );
        Ok(stored)
    }

    async fn get_review(&self, id: ReviewId) -> StoreResult<Option<Review>> {
        Ok(self.reviews.read().await.get(&id).cloned())
    }

    async fn find_review_for(&self, book: BookId, user: UserId) -> StoreResult<Option<Review>> {
        Ok(self
            .reviews
            .read()
            .await
            .values()
            .find(|r| r.book == book && r.user == user)
            .cloned())
    }

    async fn update_review(&self, id: ReviewId, patch: ReviewPatch) -> StoreResult<Option<Review>> {
        let mut reviews = self.reviews.write().await;
        let Some(review) = reviews.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(rating) = patch.rating {
            review.rating = rating;
        }
        if let Some(comment) = patch.comment {
            review.comment = comment;
        }
        review.updated_at = OffsetDateTime::now_utc();

        Ok(Some(review.clone()))
    }

    async fn delete_review(&self, id: ReviewId) -> StoreResult<Option<Review>> {
        Ok(self.reviews.write().await.remove(&id))
    }

    async fn list_reviews_for_book(&self, book: BookId, page: PageRequest) -> StoreResult<Page<Review>> {
        let mut matching: Vec<Review> = self
            .reviews
            .read()
            .await
            .values()
            .filter(|r| r.book == book)
            .cloned()
            .collect();
        newest_first(&mut matching, |r| (r.created_at, r.id));

        Ok(Page::slice(matching, page))
    }

    async fn list_reviews_by_user(&self, user: UserId, page: PageRequest) -> StoreResult<Page<Review>> {
        let mut matching: Vec<Review> = self
            .reviews
            .read()
            .await
            .values()
            .filter(|r| r.user == user)
            .cloned()
            .collect();
        newest_first(&mut matching, |r| (r.created_at, r.id));

        Ok(Page::slice(matching, page))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate { field: "email" });
        }
        if users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate { field: "username" });
        }

        let stored = user.into_user(Uuid::now_v7(), OffsetDateTime::now_utc());
        users.insert(stored.id, stored.clone());

        Ok(stored)
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(users)
    }

    async fn update_user(&self, id: UserId, patch: UserPatch) -> StoreResult<Option<User>> {
        let mut users = self.users.write().await;

        if let Some(email) = &patch.email {
            if users.values().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::Duplicate { field: "email" });
            }
        }
        if let Some(username) = &patch.username {
            if users.values().any(|u| u.id != id && &u.username == username) {
                return Err(StoreError::Duplicate { field: "username" });
            }
        }

        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(username) = patch.username {
            user.username = username;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(password_hash) = patch.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(is_admin) = patch.is_admin {
            user.is_admin = is_admin;
        }
        if let Some(profile_pic) = patch.profile_pic {
            user.profile_pic = profile_pic;
        }
        if let Some(bio) = patch.bio {
            user.bio = bio;
        }
        user.updated_at = OffsetDateTime::now_utc();

        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.users.write().await.remove(&id))
    }
}

#[async_trait]
impl RatingStore for MemoryStore {
    async fn summarize_ratings(&self, book: BookId) -> StoreResult<RatingStats> {
        let reviews = self.reviews.read().await;
        let (count, sum) = reviews
            .values()
            .filter(|r| r.book == book)
            .fold((0u64, 0u64), |(count, sum), r| (count + 1, sum + u64::from(r.rating)));

        let average = if count == 0 {
            0.0
        } else {
            sum as f64 / count as f64
        };

        Ok(RatingStats { count, average })
    }

    async fn set_rating_summary(&self, book: BookId, summary: RatingSummary) -> StoreResult<bool> {
        let mut books = self.books.write().await;
        let Some(stored) = books.get_mut(&book) else {
            return Ok(false);
        };

        stored.avg_rating = summary.avg_rating;
        stored.ratings_count = summary.ratings_count;
        Ok(true)
    }
}
