use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::error::AuthError;
use crate::guard::Principal;

/// Claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: Uuid,
    pub is_admin: bool,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.sub,
            is_admin: self.is_admin,
        }
    }
}

/// Issues and verifies HS256 JWTs.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("key", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenSigner {
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, AuthError> {
        if secret.trim().is_empty() {
            return Err(AuthError::MissingSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: Uuid, is_admin: bool) -> Result<String, AuthError> {
        self.issue_at(user_id, is_admin, OffsetDateTime::now_utc())
    }

    pub fn issue_at(
        &self,
        user_id: Uuid,
        is_admin: bool,
        now: OffsetDateTime,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id,
            is_admin,
            iat: now.unix_timestamp(),
            exp: now.saturating_add(self.ttl).unix_timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            tracing::error!(target: "bookreview-authz", error = %e, "token encoding failed");
            AuthError::MalformedToken
        })
    }

    /// Checks signature, algorithm and `exp` against the current time.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

    fn signer() -> TokenSigner {
        TokenSigner::new("test-secret", Duration::days(30)).unwrap()
    }

    #[test]
    fn issued_token_verifies() {
        let user = Uuid::now_v7();
        let token = signer().issue(user, true).unwrap();

        let claims = signer().verify(&token).unwrap();
        assert_eq!(claims.sub, user);
        assert!(claims.is_admin);
        assert_eq!(claims.exp - claims.iat, Duration::days(30).whole_seconds());
        assert_eq!(claims.principal().user_id, user);
    }

    #[test]
    fn empty_secret_is_refused() {
        assert_eq!(
            TokenSigner::new("  ", Duration::days(1)).unwrap_err(),
            AuthError::MissingSecret
        );
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let other = TokenSigner::new("other-secret", Duration::days(30)).unwrap();
        let token = other.issue(Uuid::now_v7(), false).unwrap();

        assert_eq!(
            signer().verify(&token).unwrap_err(),
            AuthError::InvalidSignature
        );
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = signer().issue(Uuid::now_v7(), false).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let forged_claims = Claims {
            sub: Uuid::now_v7(),
            is_admin: true,
            iat: 0,
            exp: i64::MAX,
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(
            signer().verify(&forged).unwrap_err(),
            AuthError::InvalidSignature
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let issued = OffsetDateTime::now_utc() - Duration::days(31);
        let token = signer().issue_at(Uuid::now_v7(), false, issued).unwrap();

        assert_eq!(signer().verify(&token).unwrap_err(), AuthError::Expired);
    }

    #[test]
    fn token_signed_with_another_algorithm_is_rejected() {
        let claims = Claims {
            sub: Uuid::now_v7(),
            is_admin: true,
            iat: OffsetDateTime::now_utc().unix_timestamp(),
            exp: (OffsetDateTime::now_utc() + Duration::days(1)).unix_timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert_eq!(signer().verify(&token).unwrap_err(), AuthError::MalformedToken);
    }

    #[test]
    fn garbage_is_malformed() {
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.**"] {
            assert_eq!(
                signer().verify(token).unwrap_err(),
                AuthError::MalformedToken,
                "token {token:?}"
            );
        }
    }
}
