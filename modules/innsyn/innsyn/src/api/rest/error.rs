use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, FiksError};

const NOE_UVENTET_FEILET: &str = "Noe uventet feilet";
const UNEXPECTED_ERROR: &str = "unexpected_error";
const FIKS_ERROR: &str = "fiks_error";
const NORG_ERROR: &str = "norg_error";
const PDL_ERROR: &str = "pdl_error";
const FILOPPLASTING_ERROR: &str = "FILOPPLASTING_ERROR";
const TILGANG_ERROR: &str = "tilgang_error";
const XSRF_ERROR: &str = "xsrf_error";
const TOKEN_UTLOPT: &str = "Token utl\u{f8}pt";
const AUTHENTICATION_ERROR: &str = "azuread_authentication_error";

/// Error body the frontend understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontendErrorMessage {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

impl FrontendErrorMessage {
    #[must_use]
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
        }
    }
}

/// 401 body telling the frontend where to log in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendUnauthorizedMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    pub login_url: String,
}

#[must_use]
pub fn unauthorized_response(login_url: &str) -> Response {
    let body = FrontendUnauthorizedMessage {
        id: AUTHENTICATION_ERROR.to_owned(),
        error_type: AUTHENTICATION_ERROR.to_owned(),
        message: "Autentiseringsfeil".to_owned(),
        login_url: login_url.to_owned(),
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

fn fiks_status(e: &FiksError) -> (StatusCode, &'static str, &'static str) {
    match e {
        FiksError::NotFound(_) => (StatusCode::NOT_FOUND, FIKS_ERROR, "DigisosSak finnes ikke"),
        FiksError::Client { status: 401, .. } => (StatusCode::UNAUTHORIZED, TOKEN_UTLOPT, TOKEN_UTLOPT),
        FiksError::Client { .. }
        | FiksError::Server { .. }
        | FiksError::FileExists(_)
        | FiksError::Transport(_)
        | FiksError::Decode(_) => (StatusCode::INTERNAL_SERVER_ERROR, FIKS_ERROR, NOE_UVENTET_FEILET),
    }
}

/// Status, `type` and `message` for an error.
#[must_use]
pub fn classify(e: &DomainError) -> (StatusCode, String, String) {
    let (status, error_type, message) = match e {
        DomainError::Fiks(f) => fiks_status(f),
        DomainError::Norg(_) => (StatusCode::INTERNAL_SERVER_ERROR, NORG_ERROR, NOE_UVENTET_FEILET),
        DomainError::Pdl(_) => (StatusCode::INTERNAL_SERVER_ERROR, PDL_ERROR, NOE_UVENTET_FEILET),
        DomainError::VirusFunnet(_) => (StatusCode::PAYLOAD_TOO_LARGE, FILOPPLASTING_ERROR, "Mulig virus funnet"),
        DomainError::OpplastingFilnavnMismatch => (
            StatusCode::BAD_REQUEST,
            FILOPPLASTING_ERROR,
            "Det er mismatch mellom opplastede filer og metadata",
        ),
        DomainError::NedlastingFilnavnMismatch => (
            StatusCode::INTERNAL_SERVER_ERROR,
            FIKS_ERROR,
            "Det er mismatch mellom nedlastede filer og metadata",
        ),
        DomainError::Tilgang(_) => (StatusCode::FORBIDDEN, TILGANG_ERROR, "Ingen tilgang"),
        DomainError::Xsrf(_) => (StatusCode::UNAUTHORIZED, XSRF_ERROR, "Feil xsrf token"),
        DomainError::BadRequest(detail) => return (StatusCode::BAD_REQUEST, "bad_request".to_owned(), detail.clone()),
        DomainError::NotFound(detail) => return (StatusCode::NOT_FOUND, "not_found".to_owned(), detail.clone()),
        DomainError::Token(_) | DomainError::Unexpected(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_ERROR, NOE_UVENTET_FEILET)
        }
    };
    (status, error_type.to_owned(), message.to_owned())
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = classify(&self);
        match status {
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::PAYLOAD_TOO_LARGE => {
                tracing::warn!(error = %self, status = status.as_u16(), "Foresp\u{f8}rsel avvist");
            }
            StatusCode::FORBIDDEN => tracing::error!(error = %self, "Bruker har ikke tilgang til ressurs"),
            _ => tracing::error!(error = %self, status = status.as_u16(), "Noe feilet"),
        }
        (status, Json(FrontendErrorMessage::new(error_type, message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::{NorgError, PdlError, XsrfError};

    fn body(e: DomainError) -> (StatusCode, String, String) {
        classify(&e)
    }

    #[test]
    fn fiks_errors_are_mapped() {
        assert_eq!(
            body(FiksError::NotFound("x".into()).into()),
            (StatusCode::NOT_FOUND, "fiks_error".into(), "DigisosSak finnes ikke".into())
        );
        let (status, error_type, _) = body(
            FiksError::Client {
                status: 401,
                message: String::new(),
            }
            .into(),
        );
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_type, "Token utl\u{f8}pt");
        let (status, error_type, message) = body(
            FiksError::Server {
                status: 503,
                message: String::new(),
            }
            .into(),
        );
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_type, "fiks_error");
        assert_eq!(message, "Noe uventet feilet");
    }

    #[test]
    fn upstream_and_upload_errors_are_mapped() {
        assert_eq!(body(NorgError::Transport(String::new()).into()).1, "norg_error");
        assert_eq!(body(PdlError::Response(String::new()).into()).1, "pdl_error");
        assert_eq!(
            body(DomainError::VirusFunnet("a.pdf".into())),
            (StatusCode::PAYLOAD_TOO_LARGE, "FILOPPLASTING_ERROR".into(), "Mulig virus funnet".into())
        );
        assert_eq!(body(DomainError::OpplastingFilnavnMismatch).0, StatusCode::BAD_REQUEST);
        assert_eq!(body(DomainError::NedlastingFilnavnMismatch).1, "fiks_error");
    }

    #[test]
    fn access_and_request_errors_are_mapped() {
        assert_eq!(
            body(DomainError::tilgang("kode 6")),
            (StatusCode::FORBIDDEN, "tilgang_error".into(), "Ingen tilgang".into())
        );
        assert_eq!(body(XsrfError.into()).0, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body(DomainError::bad_request("mangler felt")),
            (StatusCode::BAD_REQUEST, "bad_request".into(), "mangler felt".into())
        );
        assert_eq!(body(DomainError::not_found("borte")).1, "not_found");
        assert_eq!(
            body(DomainError::Unexpected(anyhow::anyhow!("boom"))),
            (StatusCode::INTERNAL_SERVER_ERROR, "unexpected_error".into(), "Noe uventet feilet".into())
        );
    }

    #[tokio::test]
    async fn unauthorized_body_carries_login_url() {
        let res = unauthorized_response("https://login.test");
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["loginUrl"], "https://login.test");
        assert_eq!(json["id"], "azuread_authentication_error");
    }
}
