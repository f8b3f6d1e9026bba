use axum::{extract::State, http::StatusCode, Json};
use bookreview_authz::require_admin;
use bookreview_db::{BookId, BookQuery, BookSort, BookStore};
use bookreview_http::{ApiJson, ApiPath, ApiQuery, AppError};
use serde_json::{json, Value};

use super::models::{BookEnvelope, BookListEnvelope, CreateBook, ListBooksParams, UpdateBook};
use crate::extract::CurrentUser;
use crate::state::AppState;
use crate::utils::{page_request, trimmed, validate};

pub async fn list_books(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListBooksParams>,
) -> Result<Json<BookListEnvelope>, AppError> {
    let sort = match trimmed(params.sort_by) {
        Some(raw) => raw.parse::<BookSort>().map_err(AppError::bad_request)?,
        None => BookSort::default(),
    };
    let query = BookQuery {
        search: trimmed(params.search),
        genre: trimmed(params.genre),
        sort,
        page: page_request(
            params.page,
            params.page_size,
            state.pagination.books_page_size,
            state.pagination.max_page_size,
        ),
    };

    let page = state.store.list_books(&query).await?;

    Ok(Json(BookListEnvelope {
        message: "Books fetched successfully.".to_string(),
        books: page.items,
        page: page.page,
        pages: page.pages,
        total_books: page.total,
    }))
}

pub async fn get_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<BookId>,
) -> Result<Json<BookEnvelope>, AppError> {
    let book = state
        .store
        .get_book(id)
        .await?
        .ok_or_else(|| AppError::not_found("Book not found."))?;

    Ok(Json(BookEnvelope {
        message: "Book fetched successfully.".to_string(),
        book,
    }))
}

pub async fn create_book(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiJson(input): ApiJson<CreateBook>,
) -> Result<(StatusCode, Json<BookEnvelope>), AppError> {
    require_admin(&caller.principal)?;

    let input = input.normalized();
    validate(&input)?;

    if let Some(isbn) = &input.isbn {
        if state.store.find_book_by_isbn(isbn).await?.is_some() {
            return Err(AppError::conflict(
                vec![json!({ "field": "isbn", "error": "duplicate" })],
                format!("Book with ISBN {isbn} already exists."),
            ));
        }
    }

    let book = state.store.insert_book(input.into()).await?;
    tracing::info!(book_id = %book.id, admin = %caller.user.id, "book created");

    Ok((
        StatusCode::CREATED,
        Json(BookEnvelope {
            message: "Book created successfully.".to_string(),
            book,
        }),
    ))
}

pub async fn update_book(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiPath(id): ApiPath<BookId>,
    ApiJson(input): ApiJson<UpdateBook>,
) -> Result<Json<BookEnvelope>, AppError> {
    require_admin(&caller.principal)?;

    let input = input.normalized();
    validate(&input)?;

    let book = state
        .store
        .update_book(id, input.into())
        .await?
        .ok_or_else(|| AppError::not_found("Book not found."))?;
    tracing::info!(book_id = %book.id, admin = %caller.user.id, "book updated");

    Ok(Json(BookEnvelope {
        message: "Book updated successfully.".to_string(),
        book,
    }))
}

/// Reviews of a deleted book stay in place; the aggregator treats the
/// missing book as a no-op when they are later changed.
pub async fn delete_book(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiPath(id): ApiPath<BookId>,
) -> Result<Json<Value>, AppError> {
    require_admin(&caller.principal)?;

    let book = state
        .store
        .delete_book(id)
        .await?
        .ok_or_else(|| AppError::not_found("Book not found."))?;
    tracing::info!(book_id = %book.id, admin = %caller.user.id, "book deleted");

    Ok(Json(json!({
        "message": format!("Book '{}' deleted successfully.", book.title)
    })))
}
