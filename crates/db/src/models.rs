//! Documents persisted by the store.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

pub type BookId = Uuid;
pub type ReviewId = Uuid;
pub type UserId = Uuid;

pub const DEFAULT_COVER_IMAGE: &str = "https://placehold.co/300x450/E2E8F0/475569?text=No+Cover";
pub const DEFAULT_PROFILE_PIC: &str = "https://placehold.co/150x150/E2E8F0/475569?text=User";

/// A book document. `avg_rating` and `ratings_count` are owned by the rating
/// aggregator and are only written through [`crate::RatingStore`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: String,
    pub cover_image: String,
    pub isbn: Option<String>,
    #[serde(default, with = "date_format::option")]
    pub published_date: Option<Date>,
    pub page_count: Option<u32>,
    pub avg_rating: f64,
    pub ratings_count: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub isbn: Option<String>,
    pub published_date: Option<Date>,
    pub page_count: Option<u32>,
}

impl NewBook {
    /// The stored form: default cover applied, aggregates zeroed.
    pub fn into_book(self, id: BookId, now: OffsetDateTime) -> Book {
        Book {
            id,
            title: self.title,
            author: self.author,
            genre: self.genre,
            description: self.description,
            cover_image: self
                .cover_image
                .unwrap_or_else(|| DEFAULT_COVER_IMAGE.to_string()),
            isbn: self.isbn,
            published_date: self.published_date,
            page_count: self.page_count,
            avg_rating: 0.0,
            ratings_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of the client-writable book fields.
#[derive(Debug, Clone, Default)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub isbn: Option<String>,
    pub published_date: Option<Date>,
    pub page_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub rating: u8,
    pub comment: String,
    pub book: BookId,
    pub user: UserId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub book: BookId,
    pub user: UserId,
    pub rating: u8,
    pub comment: String,
}

impl NewReview {
    pub fn into_review(self, id: ReviewId, now: OffsetDateTime) -> Review {
        Review {
            id,
            rating: self.rating,
            comment: self.comment,
            book: self.book,
            user: self.user,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReviewPatch {
    pub rating: Option<u8>,
    pub comment: Option<String>,
}

/// A user account. Deliberately not `Serialize`: the password hash must never
/// leave the process, so HTTP handlers render their own views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub profile_pic: String,
    pub bio: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub profile_pic: Option<String>,
    pub bio: Option<String>,
}

impl NewUser {
    /// The stored form: default profile picture and empty bio applied.
    pub fn into_user(self, id: UserId, now: OffsetDateTime) -> User {
        User {
            id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            is_admin: self.is_admin,
            profile_pic: self
                .profile_pic
                .unwrap_or_else(|| DEFAULT_PROFILE_PIC.to_string()),
            bio: self.bio.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub is_admin: Option<bool>,
    pub profile_pic: Option<String>,
    pub bio: Option<String>,
}

/// Raw result of the count-and-average query over one book's reviews.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatingStats {
    pub count: u64,
    /// Unrounded mean; `0.0` when `count` is zero.
    pub average: f64,
}

/// The derived fields written back onto a book.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub avg_rating: f64,
    pub ratings_count: u64,
}

/// `YYYY-MM-DD` (de)serialization for calendar dates.
pub mod date_format {
    use time::{format_description::FormatItem, macros::format_description, Date};

    const FORMAT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]");

    pub fn parse(text: &str) -> Result<Date, time::error::Parse> {
        Date::parse(text, FORMAT)
    }

    pub fn format(date: Date) -> String {
        date.format(FORMAT).unwrap_or_else(|_| date.to_string())
    }

    pub mod option {
        use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
        use time::Date;

        pub fn serialize<S: Serializer>(value: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(date) => serializer.serialize_some(&super::format(*date)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Date>, D::Error> {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            match raw.as_deref().map(str::trim) {
                None | Some("") => Ok(None),
                Some(text) => super::parse(text).map(Some).map_err(D::Error::custom),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn book_serializes_camel_case_with_plain_dates() {
        let book = Book {
            id: Uuid::nil(),
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            genre: "Science Fiction".to_string(),
            description: "Spice.".to_string(),
            cover_image: DEFAULT_COVER_IMAGE.to_string(),
            isbn: None,
            published_date: Some(date!(1965 - 08 - 01)),
            page_count: Some(412),
            avg_rating: 4.5,
            ratings_count: 2,
            created_at: datetime!(2024-01-01 0:00 UTC),
            updated_at: datetime!(2024-01-01 0:00 UTC),
        };

        let value = serde_json::to_value(&book).unwrap();
        assert_eq!(value["publishedDate"], "1965-08-01");
        assert_eq!(value["avgRating"], 4.5);
        assert_eq!(value["ratingsCount"], 2);
        assert_eq!(value["coverImage"], DEFAULT_COVER_IMAGE);
    }

    #[test]
    fn blank_published_date_deserializes_to_none() {
        #[derive(Deserialize)]
        struct Probe {
            #[serde(default, with = "date_format::option")]
            published_date: Option<Date>,
        }

        let probe: Probe = serde_json::from_str(r#"{"published_date": ""}"#).unwrap();
        assert!(probe.published_date.is_none());

        let probe: Probe = serde_json::from_str(r#"{"published_date": "2001-09-11"}"#).unwrap();
        assert_eq!(probe.published_date, Some(date!(2001 - 09 - 11)));

        assert!(serde_json::from_str::<Probe>(r#"{"published_date": "11/09/2001"}"#).is_err());
    }
}
