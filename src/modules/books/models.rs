use bookreview_db::{date_format, Book, BookId, BookPatch, NewBook};
use garde::Validate;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::utils::trimmed;

/// Request model for creating a new book.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    #[serde(default)]
    #[garde(length(chars, min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[garde(length(chars, min = 1, max = 100))]
    pub author: String,
    #[serde(default)]
    #[garde(length(chars, min = 1, max = 50))]
    pub genre: String,
    #[serde(default)]
    #[garde(length(chars, min = 1, max = 2000))]
    pub description: String,
    #[serde(default)]
    #[garde(skip)]
    pub cover_image: Option<String>,
    #[serde(default)]
    #[garde(length(chars, max = 20))]
    pub isbn: Option<String>,
    #[serde(default, with = "date_format::option")]
    #[garde(skip)]
    pub published_date: Option<Date>,
    #[serde(default)]
    #[garde(range(min = 1))]
    pub page_count: Option<u32>,
}

impl CreateBook {
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            genre: self.genre.trim().to_string(),
            description: self.description.trim().to_string(),
            cover_image: trimmed(self.cover_image),
            isbn: trimmed(self.isbn),
            ..self
        }
    }
}

impl From<CreateBook> for NewBook {
    fn from(book: CreateBook) -> Self {
        Self {
            title: book.title,
            author: book.author,
            genre: book.genre,
            description: book.description,
            cover_image: book.cover_image,
            isbn: book.isbn,
            published_date: book.published_date,
            page_count: book.page_count,
        }
    }
}

/// Partial update; omitted or blank fields keep their stored value.
/// Rating aggregates are not part of this model and cannot be set by clients.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBook {
    #[serde(default)]
    #[garde(length(chars, min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(default)]
    #[garde(length(chars, min = 1, max = 100))]
    pub author: Option<String>,
    #[serde(default)]
    #[garde(length(chars, min = 1, max = 50))]
    pub genre: Option<String>,
    #[serde(default)]
    #[garde(length(chars, min = 1, max = 2000))]
    pub description: Option<String>,
    #[serde(default)]
    #[garde(skip)]
    pub cover_image: Option<String>,
    #[serde(default)]
    #[garde(length(chars, max = 20))]
    pub isbn: Option<String>,
    #[serde(default, with = "date_format::option")]
    #[garde(skip)]
    pub published_date: Option<Date>,
    #[serde(default)]
    #[garde(range(min = 1))]
    pub page_count: Option<u32>,
}

impl UpdateBook {
    pub fn normalized(self) -> Self {
        Self {
            title: trimmed(self.title),
            author: trimmed(self.author),
            genre: trimmed(self.genre),
            description: trimmed(self.description),
            cover_image: trimmed(self.cover_image),
            isbn: trimmed(self.isbn),
            ..self
        }
    }
}

impl From<UpdateBook> for BookPatch {
    fn from(book: UpdateBook) -> Self {
        Self {
            title: book.title,
            author: book.author,
            genre: book.genre,
            description: book.description,
            cover_image: book.cover_image,
            isbn: book.isbn,
            published_date: book.published_date,
            page_count: book.page_count,
        }
    }
}

/// Query parameters for the book listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBooksParams {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub search: Option<String>,
    pub genre: Option<String>,
    /// `<field>_<asc|desc>`
    pub sort_by: Option<String>,
}

/// Compact book reference embedded in review listings.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub cover_image: String,
}

impl From<&Book> for BookSummary {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            cover_image: book.cover_image.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookEnvelope {
    pub message: String,
    pub book: Book,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookListEnvelope {
    pub message: String,
    pub books: Vec<Book>,
    pub page: u64,
    pub pages: u64,
    pub total_books: u64,
}
