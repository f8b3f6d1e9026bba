use axum::{extract::State, http::StatusCode, Json};
use bookreview_db::{BookId, ReviewId, UserId};
use bookreview_http::{ApiJson, ApiPath, ApiQuery, AppError};
use serde_json::{json, Value};

use super::models::{
    CreateReview, ListReviewsParams, ReviewEnvelope, ReviewListEnvelope, UpdateReview,
};
use crate::extract::CurrentUser;
use crate::state::AppState;
use crate::utils::page_request;

pub async fn list_book_reviews(
    State(state): State<AppState>,
    ApiPath(book_id): ApiPath<BookId>,
    ApiQuery(params): ApiQuery<ListReviewsParams>,
) -> Result<Json<ReviewListEnvelope>, AppError> {
    let page = state
        .reviews
        .list_for_book(book_id, reviews_page(&state, &params))
        .await?;

    Ok(Json(ReviewListEnvelope {
        message: "Reviews fetched successfully.".to_string(),
        reviews: page.items,
        page: page.page,
        pages: page.pages,
        total_reviews: page.total,
    }))
}

pub async fn list_user_reviews(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<UserId>,
    ApiQuery(params): ApiQuery<ListReviewsParams>,
) -> Result<Json<ReviewListEnvelope>, AppError> {
    let (user, page) = state
        .reviews
        .list_by_user(user_id, reviews_page(&state, &params))
        .await?;

    Ok(Json(ReviewListEnvelope {
        message: format!("Reviews by user {} fetched successfully.", user.username),
        reviews: page.items,
        page: page.page,
        pages: page.pages,
        total_reviews: page.total,
    }))
}

pub async fn create_review(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiPath(book_id): ApiPath<BookId>,
    ApiJson(input): ApiJson<CreateReview>,
) -> Result<(StatusCode, Json<ReviewEnvelope>), AppError> {
    let review = state.reviews.create(book_id, &caller.user, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ReviewEnvelope {
            message: "Review created successfully.".to_string(),
            review,
        }),
    ))
}

pub async fn update_review(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiPath(review_id): ApiPath<ReviewId>,
    ApiJson(input): ApiJson<UpdateReview>,
) -> Result<Json<ReviewEnvelope>, AppError> {
    let review = state
        .reviews
        .update(review_id, &caller.principal, input)
        .await?;

    Ok(Json(ReviewEnvelope {
        message: "Review updated successfully.".to_string(),
        review,
    }))
}

pub async fn delete_review(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiPath(review_id): ApiPath<ReviewId>,
) -> Result<Json<Value>, AppError> {
    state.reviews.delete(review_id, &caller.principal).await?;

    Ok(Json(json!({ "message": "Review deleted successfully." })))
}

fn reviews_page(state: &AppState, params: &ListReviewsParams) -> bookreview_db::PageRequest {
    page_request(
        params.page,
        params.page_size,
        state.pagination.reviews_page_size,
        state.pagination.max_page_size,
    )
}
