use bookreview_db::{User, UserId, UserPatch};
use garde::Validate;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::utils::trimmed;

/// Full account view returned to the account owner and to admins.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub profile_pic: String,
    pub bio: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            profile_pic: user.profile_pic.clone(),
            bio: user.bio.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// What anyone may see about an account: no email, no admin flag.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: UserId,
    pub username: String,
    pub profile_pic: String,
    pub bio: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&User> for PublicProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            profile_pic: user.profile_pic.clone(),
            bio: user.bio.clone(),
            created_at: user.created_at,
        }
    }
}

/// Review author reference.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub profile_pic: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            profile_pic: user.profile_pic.clone(),
        }
    }
}

/// Self-service profile update. Blank fields are ignored.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    #[serde(default)]
    #[garde(length(chars, min = 3, max = 30))]
    pub username: Option<String>,
    #[serde(default)]
    #[garde(email)]
    pub email: Option<String>,
    #[serde(default)]
    #[garde(length(chars, min = 6))]
    pub password: Option<String>,
    #[serde(default)]
    #[garde(skip)]
    pub profile_pic: Option<String>,
    #[serde(default)]
    #[garde(length(chars, max = 250))]
    pub bio: Option<String>,
}

impl UpdateProfile {
    pub fn normalized(self) -> Self {
        Self {
            username: trimmed(self.username),
            email: trimmed(self.email).map(|e| e.to_lowercase()),
            // passwords are taken verbatim
            password: self.password.filter(|p| !p.is_empty()),
            profile_pic: trimmed(self.profile_pic),
            bio: trimmed(self.bio),
        }
    }

    /// The store patch, given the already hashed password if one was sent.
    pub fn into_patch(self, password_hash: Option<String>) -> UserPatch {
        UserPatch {
            username: self.username,
            email: self.email,
            password_hash,
            is_admin: None,
            profile_pic: self.profile_pic,
            bio: self.bio,
        }
    }
}

/// Admin-side account update.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateUser {
    #[serde(default)]
    #[garde(length(chars, min = 3, max = 30))]
    pub username: Option<String>,
    #[serde(default)]
    #[garde(email)]
    pub email: Option<String>,
    #[serde(default)]
    #[garde(skip)]
    pub is_admin: Option<bool>,
}

impl AdminUpdateUser {
    pub fn normalized(self) -> Self {
        Self {
            username: trimmed(self.username),
            email: trimmed(self.email).map(|e| e.to_lowercase()),
            ..self
        }
    }
}

impl From<AdminUpdateUser> for UserPatch {
    fn from(update: AdminUpdateUser) -> Self {
        Self {
            username: update.username,
            email: update.email,
            is_admin: update.is_admin,
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileEnvelope {
    pub message: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct PublicProfileEnvelope {
    pub message: String,
    pub user: PublicProfile,
}

#[derive(Debug, Serialize)]
pub struct UserListEnvelope {
    pub message: String,
    pub users: Vec<UserProfile>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validate;
    use bookreview_http::AppError;
    use uuid::Uuid;

    fn user() -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::now_v7(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            is_admin: true,
            profile_pic: "pic".to_string(),
            bio: "Counts things.".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn public_profile_hides_private_fields() {
        let value = serde_json::to_value(PublicProfile::from(&user())).unwrap();
        assert_eq!(value["username"], "ada");
        assert!(value.get("email").is_none());
        assert!(value.get("isAdmin").is_none());
        assert!(!value.to_string().contains("argon2"));
    }

    #[test]
    fn full_profile_never_carries_the_hash() {
        let value = serde_json::to_value(UserProfile::from(&user())).unwrap();
        assert_eq!(value["isAdmin"], true);
        assert_eq!(value["email"], "ada@example.com");
        assert!(!value.to_string().contains("argon2"));
    }

    #[test]
    fn profile_update_normalizes_and_validates() {
        let update = UpdateProfile {
            username: Some("  ".to_string()),
            email: Some(" Ada@Example.COM ".to_string()),
            password: Some(String::new()),
            ..Default::default()
        }
        .normalized();

        assert_eq!(update.username, None);
        assert_eq!(update.email.as_deref(), Some("ada@example.com"));
        assert_eq!(update.password, None);
        assert!(validate(&update).is_ok());
    }

    #[test]
    fn short_password_and_long_bio_are_rejected() {
        let update = UpdateProfile {
            password: Some("12345".to_string()),
            bio: Some("x".repeat(251)),
            ..Default::default()
        };

        match validate(&update).unwrap_err() {
            AppError::Validation { details, .. } => assert_eq!(details.len(), 2),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
