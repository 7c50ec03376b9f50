use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use sha2::{Digest, Sha256};

use crate::error::ApiError;
use crate::foods::FoodService;

pub(crate) const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RequestContext {
    pub user_id: i32,
    pub roles: Vec<String>,
}

impl RequestContext {
    pub(crate) fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub(crate) fn require_admin(&self) -> Result<(), ApiError> {
        if self.has_role(ADMIN_ROLE) {
            Ok(())
        } else {
            log::info!("user {} denied admin operation", self.user_id);
            Err(ApiError::Forbidden)
        }
    }
}

pub(crate) fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

impl FromRequest for RequestContext {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token_hash = bearer_token(req).map(hash_token);
        let service = req.app_data::<web::Data<FoodService>>().cloned();

        Box::pin(async move {
            let token_hash = token_hash.ok_or(ApiError::Unauthenticated)?;
            let service = service.ok_or(ApiError::Internal("food service is not configured"))?;
            service
                .authenticate(token_hash)
                .await?
                .ok_or(ApiError::Unauthenticated)
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn token_digest_is_lowercase_hex_sha256() {
        assert_eq!(
            hash_token("secret"),
            "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b"
        );
    }

    #[test]
    fn bearer_token_is_read_from_authorization_header() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc123"))
            .to_http_request();
        assert_eq!(bearer_token(&req), Some("abc123"));

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "bearer   abc123"))
            .to_http_request();
        assert_eq!(bearer_token(&req), Some("abc123"));
    }

    #[test]
    fn other_schemes_are_ignored() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_http_request();
        assert_eq!(bearer_token(&req), None);

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer "))
            .to_http_request();
        assert_eq!(bearer_token(&req), None);

        assert_eq!(bearer_token(&TestRequest::default().to_http_request()), None);
    }

    #[test]
    fn only_admins_pass_the_admin_check() {
        let admin = RequestContext {
            user_id: 1,
            roles: vec!["admin".to_string(), "editor".to_string()],
        };
        assert!(admin.require_admin().is_ok());

        let member = RequestContext {
            user_id: 2,
            roles: vec!["member".to_string()],
        };
        assert!(matches!(member.require_admin(), Err(ApiError::Forbidden)));
    }
}
