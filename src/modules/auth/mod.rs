pub mod handlers;
pub mod models;

use async_trait::async_trait;
use axum::{routing::post, Router};
use bookreview_kernel::{InitCtx, Module};
use serde_json::json;

use crate::state::AppState;

/// Signup and login
pub struct AuthModule {
    state: AppState,
}

impl AuthModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for AuthModule {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            token_ttl_secs = self.state.signer.ttl().whole_seconds(),
            "auth module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/signup", post(handlers::signup))
            .route("/login", post(handlers::login))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = json!({
            "description": "Error",
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
        });

        Some(json!({
            "paths": {
                "/signup": {
                    "post": {
                        "summary": "Register an account",
                        "tags": ["Auth"],
                        "requestBody": {
                            "required": true,
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/SignupRequest" } } }
                        },
                        "responses": {
                            "201": {
                                "description": "Registered; log in to obtain a token",
                                "content": { "application/json": { "schema": {
                                    "type": "object",
                                    "properties": {
                                        "message": { "type": "string" },
                                        "user": { "$ref": "#/components/schemas/UserProfile" }
                                    }
                                } } }
                            },
                            "400": error,
                            "409": error,
                            "422": error
                        }
                    }
                },
                "/login": {
                    "post": {
                        "summary": "Log in",
                        "tags": ["Auth"],
                        "requestBody": {
                            "required": true,
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/LoginRequest" } } }
                        },
                        "responses": {
                            "200": {
                                "description": "Bearer token for the Authorization header",
                                "content": { "application/json": { "schema": {
                                    "type": "object",
                                    "properties": {
                                        "message": { "type": "string" },
                                        "user": { "$ref": "#/components/schemas/UserProfile" },
                                        "token": { "type": "string" }
                                    }
                                } } }
                            },
                            "400": error,
                            "401": error
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "SignupRequest": {
                        "type": "object",
                        "properties": {
                            "username": { "type": "string", "minLength": 3, "maxLength": 30 },
                            "email": { "type": "string", "format": "email" },
                            "password": { "type": "string", "minLength": 6 },
                            "profilePic": { "type": "string" },
                            "bio": { "type": "string", "maxLength": 250 }
                        },
                        "required": ["username", "email", "password"]
                    },
                    "LoginRequest": {
                        "type": "object",
                        "properties": {
                            "email": { "type": "string", "format": "email" },
                            "password": { "type": "string" }
                        },
                        "required": ["email", "password"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "auth module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "auth module stopped");
        Ok(())
    }
}

/// Create a new instance of the auth module
pub fn create_module(state: AppState) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(AuthModule::new(state))
}
