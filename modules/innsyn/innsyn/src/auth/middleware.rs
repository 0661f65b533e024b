use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::header::AUTHORIZATION;
use http::{HeaderMap, StatusCode};

use super::claims::{ClaimsError, InnsynClaims, validate_claims};
use super::{InnloggetBruker, KeyProvider};
use crate::api::rest::error::{FrontendErrorMessage, unauthorized_response};
use crate::config::AuthConfig;

#[derive(Clone)]
pub struct AuthState {
    pub keys: Arc<dyn KeyProvider>,
    pub cfg: Arc<AuthConfig>,
}

impl AuthState {
    /// Validates the bearer token in `headers` and returns the citizen.
    ///
    /// # Errors
    /// `ClaimsError` describing the first failed check.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<InnloggetBruker, ClaimsError> {
        let token = bearer_token(headers).ok_or_else(|| ClaimsError::MissingClaim("Authorization".into()))?;
        let (header, raw) = self.keys.validate_and_decode(token).await?;
        let claims = InnsynClaims::from_value(&header, &raw)?;
        validate_claims(&claims, &self.cfg, chrono::Utc::now().timestamp())?;
        Ok(InnloggetBruker {
            fnr: claims.pid,
            client_id: claims.client_id,
            token: token.to_owned(),
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

/// Rejects unauthenticated requests; otherwise inserts [`InnloggetBruker`]
/// into the request extensions.
pub async fn require_innlogget_bruker(State(state): State<AuthState>, mut req: Request, next: Next) -> Response {
    match state.authenticate(req.headers()).await {
        Ok(bruker) => {
            req.extensions_mut().insert(bruker);
            next.run(req).await
        }
        Err(e) if e.is_forbidden() => {
            tracing::warn!(error = %e, "Token har for lavt sikkerhetsniv\u{e5}");
            (
                StatusCode::FORBIDDEN,
                axum::Json(FrontendErrorMessage::new("tilgang_error", "Ingen tilgang")),
            )
                .into_response()
        }
        Err(e) => {
            tracing::info!(error = %e, "Bruker er ikke autentisert, sender 401 med loginurl");
            unauthorized_response(&state.cfg.login_url)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::Router;
    use axum::body::Body;
    use axum::routing::get;
    use axum::{Extension, middleware};
    use jsonwebtoken::Header;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    /// Accepts any token and returns fixed claims.
    struct FixedClaims(Value);

    #[async_trait]
    impl KeyProvider for FixedClaims {
        async fn validate_and_decode(&self, token: &str) -> Result<(Header, Value), ClaimsError> {
            if token == "ugyldig" {
                return Err(ClaimsError::DecodeFailed("bad signature".into()));
            }
            Ok((Header::default(), self.0.clone()))
        }
    }

    fn app(claims: Value) -> Router {
        let state = AuthState {
            keys: Arc::new(FixedClaims(claims)),
            cfg: Arc::new(AuthConfig::default()),
        };
        Router::new()
            .route(
                "/hvem",
                get(|Extension(bruker): Extension<InnloggetBruker>| async move { bruker.fnr }),
            )
            .layer(middleware::from_fn_with_state(state, require_innlogget_bruker))
    }

    fn gyldige_claims() -> Value {
        let exp = chrono::Utc::now().timestamp() + 600;
        json!({"pid": "12345678910", "acr": "Level4", "iss": "selvbetjening", "exp": exp})
    }

    async fn call(app: Router, auth: Option<&str>) -> Response {
        let mut req = http::Request::builder().uri("/hvem");
        if let Some(auth) = auth {
            req = req.header(AUTHORIZATION, auth);
        }
        app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn valid_token_reaches_handler() {
        let res = call(app(gyldige_claims()), Some("Bearer abc")).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"12345678910");
    }

    #[tokio::test]
    async fn missing_or_bad_token_is_401_with_login_url() {
        let res = call(app(gyldige_claims()), None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = call(app(gyldige_claims()), Some("Bearer ugyldig")).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["loginUrl"], AuthConfig::default().login_url);
    }

    #[tokio::test]
    async fn low_acr_is_403() {
        let mut claims = gyldige_claims();
        claims["acr"] = json!("Level3");
        let res = call(app(claims), Some("Bearer abc")).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_acr_is_403() {
        let mut claims = gyldige_claims();
        claims.as_object_mut().unwrap().remove("acr");
        let res = call(app(claims), Some("Bearer abc")).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
