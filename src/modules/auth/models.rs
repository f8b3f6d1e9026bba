use bookreview_db::NewUser;
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::modules::users::models::UserProfile;
use crate::utils::trimmed;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    #[garde(length(chars, min = 3, max = 30))]
    pub username: String,
    #[serde(default)]
    #[garde(email)]
    pub email: String,
    #[serde(default)]
    #[garde(length(chars, min = 6))]
    pub password: String,
    #[serde(default)]
    #[garde(skip)]
    pub profile_pic: Option<String>,
    #[serde(default)]
    #[garde(length(chars, max = 250))]
    pub bio: Option<String>,
}

impl SignupRequest {
    pub fn normalized(self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            profile_pic: trimmed(self.profile_pic),
            bio: trimmed(self.bio),
            ..self
        }
    }

    pub fn into_new_user(self, password_hash: String) -> NewUser {
        NewUser {
            username: self.username,
            email: self.email,
            password_hash,
            is_admin: false,
            profile_pic: self.profile_pic,
            bio: self.bio,
        }
    }
}

/// Both fields are optional at the type level so a missing one is a
/// `400` rather than a body rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: UserProfile,
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validate;

    #[test]
    fn signup_email_is_lowercased() {
        let request = SignupRequest {
            username: " reader ".to_string(),
            email: " Reader@Example.COM ".to_string(),
            password: "secret1".to_string(),
            profile_pic: Some(" ".to_string()),
            bio: None,
        }
        .normalized();

        assert_eq!(request.username, "reader");
        assert_eq!(request.email, "reader@example.com");
        assert_eq!(request.profile_pic, None);
        assert!(validate(&request).is_ok());
    }

    #[test]
    fn signup_rejects_bad_email_and_short_fields() {
        let request = SignupRequest {
            username: "ab".to_string(),
            email: "not-an-email".to_string(),
            password: "12345".to_string(),
            profile_pic: None,
            bio: None,
        };
        assert!(validate(&request).is_err());
    }
}
