use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use tracing::debug;

/// Claims read from a bearer token WITHOUT verifying its signature.
///
/// This exists solely to attribute usage log entries to a requester.
/// Nothing here is an authorization decision; verified-token enforcement
/// lives in the API gateway in front of this service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnverifiedClaims {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "cognito:groups")]
    pub groups: Vec<String>,
}

/// Decode the payload of a JWT with signature, expiry and audience checks
/// disabled. Any malformed token yields an error the caller defaults away.
pub fn decode_unverified(token: &str) -> anyhow::Result<UnverifiedClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = Default::default();

    let data = decode::<UnverifiedClaims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

/// Requester identity for usage logging: caller IP, user agent, and the
/// email/role claims of the (unverified) bearer token. Extraction never
/// fails; every field degrades to a placeholder.
#[derive(Debug, Clone)]
pub struct RequestIdentity {
    pub ip_address: String,
    pub user_agent: String,
    pub email: String,
    pub role: String,
}

impl RequestIdentity {
    pub fn from_parts(parts: &Parts) -> Self {
        // First X-Forwarded-For hop is the original client
        let ip_address = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string());

        let user_agent = parts
            .headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let claims = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .and_then(|token| match decode_unverified(token) {
                Ok(claims) => Some(claims),
                Err(e) => {
                    debug!("Bearer token payload not decodable: {}", e);
                    None
                }
            })
            .unwrap_or_default();

        let email = claims
            .email
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| "unknown-email".to_string());

        let role = claims
            .groups
            .iter()
            .find(|g| g.as_str() == "admin" || g.as_str() == "user")
            .cloned()
            .unwrap_or_else(|| "unknown-role".to_string());

        Self {
            ip_address,
            user_agent,
            email,
            role,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestIdentity::from_parts(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims {
        email: String,
        #[serde(rename = "cognito:groups")]
        groups: Vec<String>,
        exp: usize,
    }

    fn token_for(email: &str, groups: &[&str]) -> String {
        let claims = TestClaims {
            email: email.to_string(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
            exp: 4_102_444_800, // 2100-01-01
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"some-unrelated-secret"),
        )
        .unwrap()
    }

    fn parts_for(headers: &[(&str, String)]) -> Parts {
        let mut builder = Request::builder().uri("/files/view/files/1-a.txt");
        for (name, value) in headers {
            builder = builder.header(*name, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_claims_decode_ignores_signature() {
        let token = token_for("alice@example.com", &["admin", "other"]);
        let claims = decode_unverified(&token).unwrap();
        assert_eq!(claims.email.as_deref(), Some("alice@example.com"));
        assert_eq!(claims.groups, vec!["admin", "other"]);
    }

    #[test]
    fn test_garbage_token_defaults_to_unknown() {
        let parts = parts_for(&[("authorization", "Bearer not.a.jwt".to_string())]);
        let identity = RequestIdentity::from_parts(&parts);
        assert_eq!(identity.email, "unknown-email");
        assert_eq!(identity.role, "unknown-role");
    }

    #[test]
    fn test_role_collapses_to_first_known_group() {
        let token = token_for("bob@example.com", &["moderator", "user", "admin"]);
        let parts = parts_for(&[("authorization", format!("Bearer {token}"))]);
        let identity = RequestIdentity::from_parts(&parts);
        assert_eq!(identity.email, "bob@example.com");
        assert_eq!(identity.role, "user");
    }

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let parts = parts_for(&[
            ("x-forwarded-for", "203.0.113.7, 10.0.0.2".to_string()),
            ("user-agent", "Mozilla/5.0".to_string()),
        ]);
        let identity = RequestIdentity::from_parts(&parts);
        assert_eq!(identity.ip_address, "203.0.113.7");
        assert_eq!(identity.user_agent, "Mozilla/5.0");
    }

    #[test]
    fn test_no_headers_at_all() {
        let parts = parts_for(&[]);
        let identity = RequestIdentity::from_parts(&parts);
        assert_eq!(identity.ip_address, "unknown");
        assert_eq!(identity.user_agent, "");
        assert_eq!(identity.email, "unknown-email");
    }
}
