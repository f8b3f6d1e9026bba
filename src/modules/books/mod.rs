pub mod handlers;
pub mod models;

use async_trait::async_trait;
use axum::{routing::get, Router};
use bookreview_kernel::{InitCtx, Module};
use serde_json::json;

use crate::state::AppState;

/// Book catalogue: public reads, admin-only writes
pub struct BooksModule {
    state: AppState,
}

impl BooksModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            page_size = ctx.settings.pagination.books_page_size,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(handlers::list_books).post(handlers::create_book))
            .route(
                "/{id}",
                get(handlers::get_book)
                    .put(handlers::update_book)
                    .delete(handlers::delete_book),
            )
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = json!({
            "description": "Error",
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
        });
        let book_envelope = json!({
            "description": "Book",
            "content": { "application/json": { "schema": {
                "type": "object",
                "properties": {
                    "message": { "type": "string" },
                    "book": { "$ref": "#/components/schemas/Book" }
                }
            } } }
        });
        let id_param = json!({
            "name": "id", "in": "path", "required": true,
            "schema": { "type": "string", "format": "uuid" }
        });
        let book_body = |schema: &str| {
            json!({
                "required": true,
                "content": { "application/json": { "schema": { "$ref": format!("#/components/schemas/{schema}") } } }
            })
        };

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "page", "in": "query", "schema": { "type": "integer", "minimum": 1 } },
                            { "name": "pageSize", "in": "query", "schema": { "type": "integer", "minimum": 1 } },
                            { "name": "search", "in": "query", "schema": { "type": "string" } },
                            { "name": "genre", "in": "query", "schema": { "type": "string" } },
                            { "name": "sortBy", "in": "query", "schema": { "type": "string", "example": "avgRating_desc" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "A page of books",
                                "content": { "application/json": { "schema": {
                                    "type": "object",
                                    "properties": {
                                        "message": { "type": "string" },
                                        "books": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } },
                                        "page": { "type": "integer" },
                                        "pages": { "type": "integer" },
                                        "totalBooks": { "type": "integer" }
                                    }
                                } } }
                            },
                            "400": error
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "security": [{ "bearerAuth": [] }],
                        "requestBody": book_body("CreateBook"),
                        "responses": {
                            "201": book_envelope,
                            "401": error,
                            "403": error,
                            "409": error,
                            "422": error
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a book",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "responses": { "200": book_envelope, "404": error }
                    },
                    "put": {
                        "summary": "Update a book",
                        "tags": ["Books"],
                        "security": [{ "bearerAuth": [] }],
                        "parameters": [id_param],
                        "requestBody": book_body("UpdateBook"),
                        "responses": {
                            "200": book_envelope,
                            "401": error,
                            "403": error,
                            "404": error,
                            "409": error,
                            "422": error
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "security": [{ "bearerAuth": [] }],
                        "parameters": [id_param],
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
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "title": { "type": "string", "maxLength": 200 },
                            "author": { "type": "string", "maxLength": 100 },
                            "genre": { "type": "string", "maxLength": 50 },
                            "description": { "type": "string", "maxLength": 2000 },
                            "coverImage": { "type": "string" },
                            "isbn": { "type": "string", "nullable": true },
                            "publishedDate": { "type": "string", "format": "date", "nullable": true },
                            "pageCount": { "type": "integer", "nullable": true },
                            "avgRating": {
                                "type": "number",
                                "minimum": 0,
                                "maximum": 5,
                                "description": "Mean review rating rounded to one decimal; maintained by the service"
                            },
                            "ratingsCount": {
                                "type": "integer",
                                "minimum": 0,
                                "description": "Number of reviews; maintained by the service"
                            },
                            "createdAt": { "type": "string", "format": "date-time" },
                            "updatedAt": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "title", "author", "genre", "description", "avgRating", "ratingsCount"]
                    },
                    "CreateBook": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "genre": { "type": "string" },
                            "description": { "type": "string" },
                            "coverImage": { "type": "string" },
                            "isbn": { "type": "string" },
                            "publishedDate": { "type": "string", "format": "date" },
                            "pageCount": { "type": "integer", "minimum": 1 }
                        },
                        "required": ["title", "author", "genre", "description"]
                    },
                    "UpdateBook": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "genre": { "type": "string" },
                            "description": { "type": "string" },
                            "coverImage": { "type": "string" },
                            "isbn": { "type": "string" },
                            "publishedDate": { "type": "string", "format": "date" },
                            "pageCount": { "type": "integer", "minimum": 1 }
                        }
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(state: AppState) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new(state))
}
