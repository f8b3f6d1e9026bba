use std::fmt::Display;

use async_trait::async_trait;
use bson::{doc, DateTime as BsonDateTime, Document};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Cursor, Database, IndexModel};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    date_format, Book, BookId, BookPatch, NewBook, NewReview, NewUser, RatingStats, RatingSummary,
    Review, ReviewId, ReviewPatch, User, UserId, UserPatch,
};
use crate::query::{BookQuery, BookSort, BookSortField, Page, PageRequest, SortDirection};
use crate::store::{BookStore, RatingStore, ReviewStore, UserStore};

const DUPLICATE_KEY: i32 = 11000;

/// Unique index names and the field reported when one of them rejects a write.
const BOOK_INDEXES: &[(&str, &str)] = &[("isbn_unique", "isbn")];
const REVIEW_INDEXES: &[(&str, &str)] = &[("book_user_unique", "book,user")];
const USER_INDEXES: &[(&str, &str)] = &[("email_unique", "email"), ("username_unique", "username")];

/// MongoDB-backed store. Uniqueness is enforced by the indexes created in
/// [`MongoStore::connect`]; every write touches a single document.
#[derive(Debug)]
pub struct MongoStore {
    database: Database,
    books: Collection<BookDocument>,
    reviews: Collection<ReviewDocument>,
    users: Collection<UserDocument>,
}

impl MongoStore {
    /// Connect, check the server answers, and create the unique indexes.
    pub async fn connect(uri: &str, database: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri).await.map_err(unavailable)?;
        let database = client.database(database);
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(unavailable)?;

        let store = Self {
            books: database.collection("books"),
            reviews: database.collection("reviews"),
            users: database.collection("users"),
            database,
        };
        store.ensure_indexes().await?;

        tracing::info!(
            target: "bookreview-db",
            database = store.database.name(),
            "connected to MongoDB"
        );
        Ok(store)
    }

    async fn ensure_indexes(&self) -> StoreResult<()> {
        self.books
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "isbn": 1 })
                    .options(
                        IndexOptions::builder()
                            .name("isbn_unique".to_string())
                            .unique(true)
                            .partial_filter_expression(doc! { "isbn": { "$type": "string" } })
                            .build(),
                    )
                    .build(),
            )
            .await
            .map_err(unavailable)?;

        self.reviews
            .create_index(unique_index(doc! { "book": 1, "user": 1 }, "book_user_unique"))
            .await
            .map_err(unavailable)?;
        self.reviews
            .create_index(IndexModel::builder().keys(doc! { "user": 1 }).build())
            .await
            .map_err(unavailable)?;

        self.users
            .create_index(unique_index(doc! { "email": 1 }, "email_unique"))
            .await
            .map_err(unavailable)?;
        self.users
            .create_index(unique_index(doc! { "username": 1 }, "username_unique"))
            .await
            .map_err(unavailable)?;

        Ok(())
    }
}

fn unique_index(keys: Document, name: &str) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .name(name.to_string())
                .unique(true)
                .build(),
        )
        .build()
}

fn unavailable(err: MongoError) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn corrupt(what: &str, err: impl Display) -> StoreError {
    StoreError::Corrupt(format!("{what}: {err}"))
}

/// Maps duplicate-key rejections from the named unique indexes to
/// `StoreError::Duplicate`; anything else is a backend failure.
fn write_error(err: MongoError, indexes: &[(&str, &'static str)]) -> StoreError {
    let field = match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(failure)) => {
            duplicate_field(failure.code, &failure.message, indexes)
        }
        ErrorKind::Command(failure) => duplicate_field(failure.code, &failure.message, indexes),
        _ => None,
    };

    match field {
        Some(field) => StoreError::Duplicate { field },
        None => unavailable(err),
    }
}

fn duplicate_field(
    code: i32,
    message: &str,
    indexes: &[(&str, &'static str)],
) -> Option<&'static str> {
    if code != DUPLICATE_KEY {
        return None;
    }

    indexes
        .iter()
        .find(|(index, _)| message.contains(index))
        .or_else(|| indexes.first())
        .map(|(_, field)| *field)
}

fn id_filter(id: Uuid) -> Document {
    doc! { "_id": id.to_string() }
}

fn parse_id(raw: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| corrupt("_id", e))
}

/// Escapes regex metacharacters so user input matches literally.
fn escape_regex(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn contains_ci(text: &str) -> Document {
    doc! { "$regex": escape_regex(text), "$options": "i" }
}

fn book_filter(query: &BookQuery) -> Document {
    let mut filter = Document::new();
    if let Some(search) = query.search.as_deref() {
        filter.insert(
            "$or",
            vec![
                doc! { "title": contains_ci(search) },
                doc! { "author": contains_ci(search) },
                doc! { "genre": contains_ci(search) },
            ],
        );
    }
    if let Some(genre) = query.genre.as_deref() {
        filter.insert("genre", contains_ci(genre));
    }
    filter
}

fn book_sort(sort: BookSort) -> Document {
    let field = match sort.field {
        BookSortField::CreatedAt => "createdAt",
        BookSortField::Title => "title",
        BookSortField::Author => "author",
        BookSortField::AvgRating => "avgRating",
        BookSortField::RatingsCount => "ratingsCount",
        BookSortField::PublishedDate => "publishedDate",
    };
    let direction = match sort.direction {
        SortDirection::Asc => 1,
        SortDirection::Desc => -1,
    };

    let mut order = Document::new();
    order.insert(field, direction);
    order.insert("_id", direction);
    order
}

fn newest_first() -> Document {
    doc! { "createdAt": -1, "_id": -1 }
}

fn set_updated(mut set: Document) -> Document {
    set.insert("updatedAt", BsonDateTime::from_time_0_3(OffsetDateTime::now_utc()));
    doc! { "$set": set }
}

fn book_update(patch: BookPatch) -> Document {
    let mut set = Document::new();
    if let Some(title) = patch.title {
        set.insert("title", title);
    }
    if let Some(author) = patch.author {
        set.insert("author", author);
    }
    if let Some(genre) = patch.genre {
        set.insert("genre", genre);
    }
    if let Some(description) = patch.description {
        set.insert("description", description);
    }
    if let Some(cover_image) = patch.cover_image {
        set.insert("coverImage", cover_image);
    }
    if let Some(isbn) = patch.isbn {
        set.insert("isbn", isbn);
    }
    if let Some(published_date) = patch.published_date {
        set.insert("publishedDate", date_format::format(published_date));
    }
    if let Some(page_count) = patch.page_count {
        set.insert("pageCount", i64::from(page_count));
    }
    set_updated(set)
}

fn review_update(patch: ReviewPatch) -> Document {
    let mut set = Document::new();
    if let Some(rating) = patch.rating {
        set.insert("rating", i32::from(rating));
    }
    if let Some(comment) = patch.comment {
        set.insert("comment", comment);
    }
    set_updated(set)
}

fn user_update(patch: UserPatch) -> Document {
    let mut set = Document::new();
    if let Some(username) = patch.username {
        set.insert("username", username);
    }
    if let Some(email) = patch.email {
        set.insert("email", email);
    }
    if let Some(password_hash) = patch.password_hash {
        set.insert("passwordHash", password_hash);
    }
    if let Some(is_admin) = patch.is_admin {
        set.insert("isAdmin", is_admin);
    }
    if let Some(profile_pic) = patch.profile_pic {
        set.insert("profilePic", profile_pic);
    }
    if let Some(bio) = patch.bio {
        set.insert("bio", bio);
    }
    set_updated(set)
}

async fn collect<T, M>(mut cursor: Cursor<T>) -> StoreResult<Vec<M>>
where
    T: for<'de> Deserialize<'de>,
    M: TryFrom<T, Error = StoreError>,
{
    let mut items = Vec::new();
    while cursor.advance().await.map_err(unavailable)? {
        let document = cursor.deserialize_current().map_err(|e| corrupt("cursor", e))?;
        items.push(M::try_from(document)?);
    }
    Ok(items)
}

fn decode<T, M>(document: Option<T>) -> StoreResult<Option<M>>
where
    M: TryFrom<T, Error = StoreError>,
{
    document.map(M::try_from).transpose()
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookDocument {
    #[serde(rename = "_id")]
    id: String,
    title: String,
    author: String,
    genre: String,
    description: String,
    cover_image: String,
    isbn: Option<String>,
    published_date: Option<String>,
    page_count: Option<i64>,
    avg_rating: f64,
    ratings_count: i64,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

impl From<&Book> for BookDocument {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id.to_string(),
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre.clone(),
            description: book.description.clone(),
            cover_image: book.cover_image.clone(),
            isbn: book.isbn.clone(),
            published_date: book.published_date.map(date_format::format),
            page_count: book.page_count.map(i64::from),
            avg_rating: book.avg_rating,
            ratings_count: i64::try_from(book.ratings_count).unwrap_or(i64::MAX),
            created_at: BsonDateTime::from_time_0_3(book.created_at),
            updated_at: BsonDateTime::from_time_0_3(book.updated_at),
        }
    }
}

impl TryFrom<BookDocument> for Book {
    type Error = StoreError;

    fn try_from(document: BookDocument) -> StoreResult<Self> {
        Ok(Self {
            id: parse_id(&document.id)?,
            title: document.title,
            author: document.author,
            genre: document.genre,
            description: document.description,
            cover_image: document.cover_image,
            isbn: document.isbn,
            published_date: document
                .published_date
                .as_deref()
                .map(date_format::parse)
                .transpose()
                .map_err(|e| corrupt("publishedDate", e))?,
            page_count: document
                .page_count
                .map(u32::try_from)
                .transpose()
                .map_err(|e| corrupt("pageCount", e))?,
            avg_rating: document.avg_rating,
            ratings_count: u64::try_from(document.ratings_count)
                .map_err(|e| corrupt("ratingsCount", e))?,
            created_at: document.created_at.to_time_0_3(),
            updated_at: document.updated_at.to_time_0_3(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewDocument {
    #[serde(rename = "_id")]
    id: String,
    rating: i32,
    comment: String,
    book: String,
    user: String,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

impl From<&Review> for ReviewDocument {
    fn from(review: &Review) -> Self {
        Self {
            id: review.id.to_string(),
            rating: i32::from(review.rating),
            comment: review.comment.clone(),
            book: review.book.to_string(),
            user: review.user.to_string(),
            created_at: BsonDateTime::from_time_0_3(review.created_at),
            updated_at: BsonDateTime::from_time_0_3(review.updated_at),
        }
    }
}

impl TryFrom<ReviewDocument> for Review {
    type Error = StoreError;

    fn try_from(document: ReviewDocument) -> StoreResult<Self> {
        Ok(Self {
            id: parse_id(&document.id)?,
            rating: u8::try_from(document.rating).map_err(|e| corrupt("rating", e))?,
            comment: document.comment,
            book: parse_id(&document.book)?,
            user: parse_id(&document.user)?,
            created_at: document.created_at.to_time_0_3(),
            updated_at: document.updated_at.to_time_0_3(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDocument {
    #[serde(rename = "_id")]
    id: String,
    username: String,
    email: String,
    password_hash: String,
    is_admin: bool,
    profile_pic: String,
    bio: String,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

impl From<&User> for UserDocument {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            is_admin: user.is_admin,
            profile_pic: user.profile_pic.clone(),
            bio: user.bio.clone(),
            created_at: BsonDateTime::from_time_0_3(user.created_at),
            updated_at: BsonDateTime::from_time_0_3(user.updated_at),
        }
    }
}

impl TryFrom<UserDocument> for User {
    type Error = StoreError;

    fn try_from(document: UserDocument) -> StoreResult<Self> {
        Ok(Self {
            id: parse_id(&document.id)?,
            username: document.username,
            email: document.email,
            password_hash: document.password_hash,
            is_admin: document.is_admin,
            profile_pic: document.profile_pic,
            bio: document.bio,
            created_at: document.created_at.to_time_0_3(),
            updated_at: document.updated_at.to_time_0_3(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RatingRow {
    count: i64,
    average: f64,
}

#[async_trait]
impl BookStore for MongoStore {
    async fn insert_book(&self, book: NewBook) -> StoreResult<Book> {
        let stored = book.into_book(Uuid::now_v7(), OffsetDateTime::now_utc());
        self.books
            .insert_one(BookDocument::from(&stored))
            .await
            .map_err(|e| write_error(e, BOOK_INDEXES))?;

        tracing::debug!(target: "bookreview-db", book_id = %stored.id, "book inserted");
        Ok(stored)
    }

    async fn get_book(&self, id: BookId) -> StoreResult<Option<Book>> {
        decode(self.books.find_one(id_filter(id)).await.map_err(unavailable)?)
    }

    async fn find_book_by_isbn(&self, isbn: &str) -> StoreResult<Option<Book>> {
        decode(
            self.books
                .find_one(doc! { "isbn": isbn })
                .await
                .map_err(unavailable)?,
        )
    }

    async fn list_books(&self, query: &BookQuery) -> StoreResult<Page<Book>> {
        let filter = book_filter(query);
        let total = self
            .books
            .count_documents(filter.clone())
            .await
            .map_err(unavailable)?;
        let cursor = self
            .books
            .find(filter)
            .sort(book_sort(query.sort))
            .skip(query.page.skip())
            .limit(i64::try_from(query.page.page_size).unwrap_or(i64::MAX))
            .await
            .map_err(unavailable)?;

        Ok(Page::new(collect(cursor).await?, query.page, total))
    }

    async fn update_book(&self, id: BookId, patch: BookPatch) -> StoreResult<Option<Book>> {
        let updated = self
            .books
            .find_one_and_update(id_filter(id), book_update(patch))
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| write_error(e, BOOK_INDEXES))?;
        decode(updated)
    }

    async fn delete_book(&self, id: BookId) -> StoreResult<Option<Book>> {
        decode(
            self.books
                .find_one_and_delete(id_filter(id))
                .await
                .map_err(unavailable)?,
        )
    }
}

impl MongoStore {
    async fn review_page(&self, filter: Document, page: PageRequest) -> StoreResult<Page<Review>> {
        let total = self
            .reviews
            .count_documents(filter.clone())
            .await
            .map_err(unavailable)?;
        let cursor = self
            .reviews
            .find(filter)
            .sort(newest_first())
            .skip(page.skip())
            .limit(i64::try_from(page.page_size).unwrap_or(i64::MAX))
            .await
            .map_err(unavailable)?;

        Ok(Page::new(collect(cursor).await?, page, total))
    }
}

#[async_trait]
impl ReviewStore for MongoStore {
    async fn insert_review(&self, review: NewReview) -> StoreResult<Review> {
        let stored = review.into_review(Uuid::now_v7(), OffsetDateTime::now_utc());
        self.reviews
            .insert_one(ReviewDocument::from(&stored))
            .await
            .map_err(|e| write_error(e, REVIEW_INDEXES))?;

        tracing::debug!(
            target: "bookreview-db",
            review_id = %stored.id,
            book_id = %stored.book,
            "review inserted"
        );
        Ok(stored)
    }

    async fn get_review(&self, id: ReviewId) -> StoreResult<Option<Review>> {
        decode(self.reviews.find_one(id_filter(id)).await.map_err(unavailable)?)
    }

    async fn find_review_for(&self, book: BookId, user: UserId) -> StoreResult<Option<Review>> {
        decode(
            self.reviews
                .find_one(doc! { "book": book.to_string(), "user": user.to_string() })
                .await
                .map_err(unavailable)?,
        )
    }

    async fn update_review(&self, id: ReviewId, patch: ReviewPatch) -> StoreResult<Option<Review>> {
        let updated = self
            .reviews
            .find_one_and_update(id_filter(id), review_update(patch))
            .return_document(ReturnDocument::After)
            .await
            .map_err(unavailable)?;
        decode(updated)
    }

    async fn delete_review(&self, id: ReviewId) -> StoreResult<Option<Review>> {
        decode(
            self.reviews
                .find_one_and_delete(id_filter(id))
                .await
                .map_err(unavailable)?,
        )
    }

    async fn list_reviews_for_book(&self, book: BookId, page: PageRequest) -> StoreResult<Page<Review>> {
        self.review_page(doc! { "book": book.to_string() }, page).await
    }

    async fn list_reviews_by_user(&self, user: UserId, page: PageRequest) -> StoreResult<Page<Review>> {
        self.review_page(doc! { "user": user.to_string() }, page).await
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let stored = user.into_user(Uuid::now_v7(), OffsetDateTime::now_utc());
        self.users
            .insert_one(UserDocument::from(&stored))
            .await
            .map_err(|e| write_error(e, USER_INDEXES))?;
        Ok(stored)
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        decode(self.users.find_one(id_filter(id)).await.map_err(unavailable)?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        decode(
            self.users
                .find_one(doc! { "email": email })
                .await
                .map_err(unavailable)?,
        )
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        decode(
            self.users
                .find_one(doc! { "username": username })
                .await
                .map_err(unavailable)?,
        )
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let cursor = self
            .users
            .find(doc! {})
            .sort(doc! { "createdAt": 1, "_id": 1 })
            .await
            .map_err(unavailable)?;
        collect(cursor).await
    }

    async fn update_user(&self, id: UserId, patch: UserPatch) -> StoreResult<Option<User>> {
        let updated = self
            .users
            .find_one_and_update(id_filter(id), user_update(patch))
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| write_error(e, USER_INDEXES))?;
        decode(updated)
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<Option<User>> {
        decode(
            self.users
                .find_one_and_delete(id_filter(id))
                .await
                .map_err(unavailable)?,
        )
    }
}

#[async_trait]
impl RatingStore for MongoStore {
    async fn summarize_ratings(&self, book: BookId) -> StoreResult<RatingStats> {
        let pipeline = vec![
            doc! { "$match": { "book": book.to_string() } },
            doc! { "$group": {
                "_id": "$book",
                "count": { "$sum": 1 },
                "average": { "$avg": "$rating" },
            } },
        ];

        let mut cursor = self.reviews.aggregate(pipeline).await.map_err(unavailable)?;
        if !cursor.advance().await.map_err(unavailable)? {
            return Ok(RatingStats::default());
        }

        let document = cursor
            .deserialize_current()
            .map_err(|e| corrupt("rating summary", e))?;
        let row: RatingRow =
            bson::from_document(document).map_err(|e| corrupt("rating summary", e))?;

        Ok(RatingStats {
            count: u64::try_from(row.count).map_err(|e| corrupt("rating count", e))?,
            average: row.average,
        })
    }

    async fn set_rating_summary(&self, book: BookId, summary: RatingSummary) -> StoreResult<bool> {
        let ratings_count = i64::try_from(summary.ratings_count).unwrap_or(i64::MAX);
        let result = self
            .books
            .update_one(
                id_filter(book),
                doc! { "$set": {
                    "avgRating": summary.avg_rating,
                    "ratingsCount": ratings_count,
                } },
            )
            .await
            .map_err(unavailable)?;

        Ok(result.matched_count > 0)
    }
}
