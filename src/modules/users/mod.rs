pub mod handlers;
pub mod models;

use anyhow::Context;
use async_trait::async_trait;
use axum::{routing::get, Router};
use bookreview_db::{NewUser, Store, UserStore};
use bookreview_kernel::{settings::BootstrapAdmin, InitCtx, Module};
use serde_json::json;

use crate::state::AppState;
use crate::utils::hash_password;

/// Profiles and admin account management
pub struct UsersModule {
    state: AppState,
}

impl UsersModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for UsersModule {
    fn name(&self) -> &'static str {
        "users"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if let Some(admin) = &ctx.settings.auth.bootstrap_admin {
            seed_admin(ctx.store.as_ref(), admin).await?;
        }

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "users module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(handlers::list_users))
            .route(
                "/profile",
                get(handlers::get_profile).put(handlers::update_profile),
            )
            .route(
                "/{id}",
                get(handlers::get_public_profile)
                    .put(handlers::update_user)
                    .delete(handlers::delete_user),
            )
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = json!({
            "description": "Error",
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
        });
        let profile = json!({
            "description": "User profile",
            "content": { "application/json": { "schema": {
                "type": "object",
                "properties": {
                    "message": { "type": "string" },
                    "user": { "$ref": "#/components/schemas/UserProfile" }
                }
            } } }
        });
        let id_param = json!({
            "name": "id", "in": "path", "required": true,
            "schema": { "type": "string", "format": "uuid" }
        });

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List users",
                        "tags": ["Users"],
                        "security": [{ "bearerAuth": [] }],
                        "responses": {
                            "200": {
                                "description": "All accounts",
                                "content": { "application/json": { "schema": {
                                    "type": "object",
                                    "properties": {
                                        "message": { "type": "string" },
                                        "users": { "type": "array", "items": { "$ref": "#/components/schemas/UserProfile" } }
                                    }
                                } } }
                            },
                            "401": error,
                            "403": error
                        }
                    }
                },
                "/profile": {
                    "get": {
                        "summary": "Get own profile",
                        "tags": ["Users"],
                        "security": [{ "bearerAuth": [] }],
                        "responses": { "200": profile, "401": error }
                    },
                    "put": {
                        "summary": "Update own profile",
                        "tags": ["Users"],
                        "security": [{ "bearerAuth": [] }],
                        "requestBody": {
                            "required": true,
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/UpdateProfile" } } }
                        },
                        "responses": { "200": profile, "401": error, "409": error, "422": error }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a public profile",
                        "tags": ["Users"],
                        "parameters": [id_param],
                        "responses": {
                            "200": {
                                "description": "Public profile",
                                "content": { "application/json": { "schema": {
                                    "type": "object",
                                    "properties": {
                                        "message": { "type": "string" },
                                        "user": { "$ref": "#/components/schemas/PublicProfile" }
                                    }
                                } } }
                            },
                            "404": error
                        }
                    },
                    "put": {
                        "summary": "Update a user (admin)",
                        "tags": ["Users"],
                        "security": [{ "bearerAuth": [] }],
                        "parameters": [id_param],
                        "requestBody": {
                            "required": true,
                            "content": { "application/json": { "schema": {
                                "type": "object",
                                "properties": {
                                    "username": { "type": "string" },
                                    "email": { "type": "string", "format": "email" },
                                    "isAdmin": { "type": "boolean" }
                                }
                            } } }
                        },
                        "responses": { "200": profile, "401": error, "403": error, "404": error, "409": error, "422": error }
                    },
                    "delete": {
                        "summary": "Delete a user (admin)",
                        "tags": ["Users"],
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
                    "UserProfile": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "username": { "type": "string" },
                            "email": { "type": "string", "format": "email" },
                            "isAdmin": { "type": "boolean" },
                            "profilePic": { "type": "string" },
                            "bio": { "type": "string" },
                            "createdAt": { "type": "string", "format": "date-time" },
                            "updatedAt": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "username", "email", "isAdmin"]
                    },
                    "PublicProfile": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "username": { "type": "string" },
                            "profilePic": { "type": "string" },
                            "bio": { "type": "string" },
                            "createdAt": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "username"]
                    },
                    "UserSummary": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "username": { "type": "string" },
                            "profilePic": { "type": "string" }
                        }
                    },
                    "UpdateProfile": {
                        "type": "object",
                        "properties": {
                            "username": { "type": "string", "minLength": 3, "maxLength": 30 },
                            "email": { "type": "string", "format": "email" },
                            "password": { "type": "string", "minLength": 6 },
                            "profilePic": { "type": "string" },
                            "bio": { "type": "string", "maxLength": 250 }
                        }
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "users module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "users module stopped");
        Ok(())
    }
}

/// Create the configured admin account unless the email is already taken.
async fn seed_admin(store: &dyn Store, admin: &BootstrapAdmin) -> anyhow::Result<()> {
    let email = admin.email.trim().to_lowercase();
    if store.find_user_by_email(&email).await?.is_some() {
        tracing::debug!(email = %email, "bootstrap admin already present");
        return Ok(());
    }

    let password_hash = hash_password(admin.password.clone())
        .await
        .context("failed to hash bootstrap admin password")?;

    let user = store
        .insert_user(NewUser {
            username: admin.username.trim().to_string(),
            email,
            password_hash,
            is_admin: true,
            ..Default::default()
        })
        .await
        .context("failed to create bootstrap admin")?;
    tracing::info!(user_id = %user.id, username = %user.username, "bootstrap admin created");

    Ok(())
}

/// Create a new instance of the users module
pub fn create_module(state: AppState) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(UsersModule::new(state))
}
