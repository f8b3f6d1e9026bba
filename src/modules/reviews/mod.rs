pub mod aggregator;
pub mod handlers;
pub mod models;
pub mod service;

use async_trait::async_trait;
use axum::{
    routing::{get, put},
    Router,
};
use bookreview_kernel::{InitCtx, Module};
use serde_json::json;

use crate::state::AppState;

/// Reviews and the rating aggregates they drive
pub struct ReviewsModule {
    state: AppState,
}

impl ReviewsModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for ReviewsModule {
    fn name(&self) -> &'static str {
        "reviews"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            page_size = ctx.settings.pagination.reviews_page_size,
            "reviews module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route(
                "/book/{book_id}",
                get(handlers::list_book_reviews).post(handlers::create_review),
            )
            .route("/user/{user_id}", get(handlers::list_user_reviews))
            .route(
                "/{review_id}",
                put(handlers::update_review).delete(handlers::delete_review),
            )
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = json!({
            "description": "Error",
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
        });
        let review = json!({
            "description": "Review",
            "content": { "application/json": { "schema": {
                "type": "object",
                "properties": {
                    "message": { "type": "string" },
                    "review": { "$ref": "#/components/schemas/Review" }
                }
            } } }
        });
        let review_page = json!({
            "description": "A page of reviews, newest first",
            "content": { "application/json": { "schema": {
                "type": "object",
                "properties": {
                    "message": { "type": "string" },
                    "reviews": { "type": "array", "items": { "$ref": "#/components/schemas/Review" } },
                    "page": { "type": "integer" },
                    "pages": { "type": "integer" },
                    "totalReviews": { "type": "integer" }
                }
            } } }
        });
        let paging = json!([
            { "name": "page", "in": "query", "schema": { "type": "integer", "minimum": 1 } },
            { "name": "pageSize", "in": "query", "schema": { "type": "integer", "minimum": 1 } }
        ]);
        let uuid_param = |name: &str| {
            json!({
                "name": name, "in": "path", "required": true,
                "schema": { "type": "string", "format": "uuid" }
            })
        };
        let with_paging = |param: serde_json::Value| {
            let mut params = vec![param];
            params.extend(paging.as_array().into_iter().flatten().cloned());
            params
        };

        Some(json!({
            "paths": {
                "/book/{book_id}": {
                    "get": {
                        "summary": "List reviews of a book",
                        "tags": ["Reviews"],
                        "parameters": with_paging(uuid_param("book_id")),
                        "responses": { "200": review_page, "404": error }
                    },
                    "post": {
                        "summary": "Review a book",
                        "description": "Recomputes the book's avgRating and ratingsCount before responding.",
                        "tags": ["Reviews"],
                        "security": [{ "bearerAuth": [] }],
                        "parameters": [uuid_param("book_id")],
                        "requestBody": {
                            "required": true,
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/CreateReview" } } }
                        },
                        "responses": {
                            "201": review,
                            "401": error,
                            "404": error,
                            "409": error,
                            "422": error
                        }
                    }
                },
                "/user/{user_id}": {
                    "get": {
                        "summary": "List reviews written by a user",
                        "tags": ["Reviews"],
                        "parameters": with_paging(uuid_param("user_id")),
                        "responses": { "200": review_page, "404": error }
                    }
                },
                "/{review_id}": {
                    "put": {
                        "summary": "Update own review",
                        "description": "Recomputes the book's avgRating and ratingsCount before responding.",
                        "tags": ["Reviews"],
                        "security": [{ "bearerAuth": [] }],
                        "parameters": [uuid_param("review_id")],
                        "requestBody": {
                            "required": true,
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/UpdateReview" } } }
                        },
                        "responses": {
                            "200": review,
                            "401": error,
                            "403": error,
                            "404": error,
                            "422": error
                        }
                    },
                    "delete": {
                        "summary": "Delete a review (author or admin)",
                        "description": "Recomputes the book's avgRating and ratingsCount before responding.",
                        "tags": ["Reviews"],
                        "security": [{ "bearerAuth": [] }],
                        "parameters": [uuid_param("review_id")],
                        "responses": {
                            "200": { "description": "Deleted" },
                            "401": error,
                            "403": error,
                            "404": error
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Review": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                            "comment": { "type": "string", "maxLength": 1000 },
                            "bookId": { "type": "string", "format": "uuid" },
                            "userId": { "type": "string", "format": "uuid" },
                            "user": { "$ref": "#/components/schemas/UserSummary" },
                            "book": { "$ref": "#/components/schemas/BookSummary" },
                            "createdAt": { "type": "string", "format": "date-time" },
                            "updatedAt": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "rating", "comment", "bookId", "userId"]
                    },
                    "BookSummary": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "coverImage": { "type": "string" }
                        }
                    },
                    "CreateReview": {
                        "type": "object",
                        "properties": {
                            "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                            "comment": { "type": "string", "minLength": 1, "maxLength": 1000 }
                        },
                        "required": ["rating", "comment"]
                    },
                    "UpdateReview": {
                        "type": "object",
                        "properties": {
                            "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                            "comment": { "type": "string", "minLength": 1, "maxLength": 1000 }
                        }
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "reviews module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "reviews module stopped");
        Ok(())
    }
}

/// Create a new instance of the reviews module
pub fn create_module(state: AppState) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(ReviewsModule::new(state))
}
