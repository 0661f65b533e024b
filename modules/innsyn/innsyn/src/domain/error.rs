use thiserror::Error;

/// Failures talking to the Fiks digisos api.
#[derive(Debug, Error)]
pub enum FiksError {
    #[error("Fiks fant ikke ressursen: {0}")]
    NotFound(String),
    #[error("Fiks svarte {status}: {message}")]
    Client { status: u16, message: String },
    #[error("Fiks feilet med {status}: {message}")]
    Server { status: u16, message: String },
    /// An ettersendelse with the same navEksternRefId is already stored.
    #[error("Ettersendelsen finnes allerede hos Fiks: {0}")]
    FileExists(String),
    #[error("Kall mot Fiks feilet: {0}")]
    Transport(String),
    #[error("Ugyldig svar fra Fiks: {0}")]
    Decode(String),
}

impl FiksError {
    /// Maps an upstream status to the matching variant.
    #[must_use]
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            404 => Self::NotFound(message),
            400..=499 => Self::Client { status, message },
            _ => Self::Server { status, message },
        }
    }
}

#[derive(Debug, Error)]
pub enum PdlError {
    #[error("PDL svarte med feil: {0}")]
    Response(String),
    #[error("Kall mot PDL feilet: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum NorgError {
    #[error("Norg fant ikke enhet {0}")]
    NotFound(String),
    #[error("Kall mot Norg feilet: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Tokenutveksling feilet: {0}")]
    Exchange(String),
    #[error("Kall mot token-endepunkt feilet: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
#[error("Feil xsrf token")]
pub struct XsrfError;

/// The error every service returns. The REST layer turns it into a
/// `FrontendErrorMessage` with the matching status code.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Fiks(#[from] FiksError),
    #[error(transparent)]
    Pdl(#[from] PdlError),
    #[error(transparent)]
    Norg(#[from] NorgError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Xsrf(#[from] XsrfError),
    #[error("Ingen tilgang: {0}")]
    Tilgang(String),
    #[error("Mulig virus funnet i {0}")]
    VirusFunnet(String),
    #[error("Det er mismatch mellom opplastede filer og metadata")]
    OpplastingFilnavnMismatch,
    #[error("Det er mismatch mellom nedlastede filer og metadata")]
    NedlastingFilnavnMismatch,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl DomainError {
    pub fn tilgang(message: impl Into<String>) -> Self {
        Self::Tilgang(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}
