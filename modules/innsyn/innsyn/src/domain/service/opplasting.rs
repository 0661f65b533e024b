//! Validation and forwarding of attachments the citizen uploads.
//!
//! Files arrive as a multipart form: a `metadata.json` part describing which
//! oppgave each file answers, plus the files themselves. A file is tied to
//! its metadata entry by the uuid the frontend put in its filename.

use std::sync::Arc;

use bytes::Bytes;
use chrono::NaiveDate;
use futures::future::try_join_all;
use innsyn_sdk::{JsonFiler, JsonVedlegg, JsonVedleggSpesifikasjon, LASTET_OPP_STATUS, VedleggHendelseType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::InnloggetBruker;
use crate::domain::error::DomainError;
use crate::domain::ports::{FilForOpplasting, VirusScan};
use crate::domain::service::fiks::FiksService;
use crate::domain::util::{contains_illegal_characters, lag_nav_ekstern_ref_id, sanitize_file_name, sha512_hex, split_file_name};

pub const MAKS_TOTAL_FILSTORRELSE: usize = 10 * 1024 * 1024;

/// Name of the multipart part carrying the metadata.
pub const METADATA_FILNAVN: &str = "metadata.json";

/// Base filenames are cut to this many characters before the uuid marker.
const MAKS_FILNAVN_LENGDE: usize = 50;

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PDF_MAGIC: &[u8] = b"%PDF-";

/// PDF readers accept the header anywhere in the first kilobyte.
const PDF_HEADER_SOK: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpplastetVedleggMetadata {
    #[serde(rename = "type")]
    pub vedlegg_type: String,
    pub tilleggsinfo: Option<String>,
    pub hendelsetype: Option<VedleggHendelseType>,
    pub hendelsereferanse: Option<String>,
    #[serde(default)]
    pub filer: Vec<OpplastetFilMetadata>,
    pub innsendelsesfrist: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpplastetFilMetadata {
    pub filnavn: String,
    pub uuid: Uuid,
}

/// One uploaded file part, as received.
#[derive(Debug, Clone)]
pub struct OpplastetFil {
    pub filnavn: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationValues {
    Ok,
    CouldNotLoadDocument,
    PdfIsEncrypted,
    IllegalFileType,
    IllegalFilename,
    FileTooLarge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilType {
    Pdf,
    Png,
    Jpeg,
}

impl FilType {
    #[must_use]
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.starts_with(PNG_MAGIC) {
            Some(Self::Png)
        } else if data.starts_with(JPEG_MAGIC) {
            Some(Self::Jpeg)
        } else if pdf_header_offset(data).is_some() {
            Some(Self::Pdf)
        } else {
            None
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => ".pdf",
            Self::Png => ".png",
            Self::Jpeg => ".jpg",
        }
    }

    #[must_use]
    pub fn mimetype(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OppgaveOpplastingResponse {
    #[serde(rename = "type")]
    pub vedlegg_type: String,
    pub tilleggsinfo: Option<String>,
    pub innsendelsesfrist: Option<NaiveDate>,
    pub hendelsetype: Option<VedleggHendelseType>,
    pub hendelsereferanse: Option<String>,
    pub filer: Vec<VedleggOpplastingResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VedleggOpplastingResponse {
    pub filnavn: String,
    pub status: ValidationValues,
}

/// A metadata file paired with its bytes and validation outcome.
struct ValidertFil {
    metadata: OpplastetFilMetadata,
    data: Bytes,
    status: ValidationValues,
    fil_type: Option<FilType>,
}

pub struct VedleggOpplastingService {
    fiks: Arc<FiksService>,
    virus_scan: Arc<dyn VirusScan>,
}

impl VedleggOpplastingService {
    #[must_use]
    pub fn new(fiks: Arc<FiksService>, virus_scan: Arc<dyn VirusScan>) -> Self {
        Self { fiks, virus_scan }
    }

    /// Splits the multipart files into metadata and attachments.
    ///
    /// # Errors
    /// `BadRequest` when `metadata.json` is missing or malformed.
    pub fn skill_ut_metadata(
        mut filer: Vec<OpplastetFil>,
    ) -> Result<(Vec<OpplastetVedleggMetadata>, Vec<OpplastetFil>), DomainError> {
        let Some(index) = filer.iter().position(|f| f.filnavn == METADATA_FILNAVN) else {
            return Err(DomainError::bad_request(format!(
                "Mangler metadata.json. Totalt antall filer var {}",
                filer.len()
            )));
        };
        let metadata_fil = filer.remove(index);
        let metadata: Vec<OpplastetVedleggMetadata> = serde_json::from_slice(&metadata_fil.data)
            .map_err(|e| DomainError::bad_request(format!("Ugyldig metadata.json: {e}")))?;
        Ok((metadata, filer))
    }

    /// Validates every file and, when all pass, uploads them to Fiks as one
    /// ettersendelse. Validation failures are reported per file and nothing
    /// is uploaded.
    ///
    /// # Errors
    /// `BadRequest` without files, `OpplastingFilnavnMismatch` when a
    /// metadata entry has no file, `VirusFunnet`, and upstream failures.
    #[tracing::instrument(skip(self, metadata, filer, bruker))]
    pub async fn send_vedlegg_til_fiks(
        &self,
        digisos_id: &str,
        metadata: Vec<OpplastetVedleggMetadata>,
        filer: Vec<OpplastetFil>,
        bruker: &InnloggetBruker,
    ) -> Result<Vec<OppgaveOpplastingResponse>, DomainError> {
        if filer.is_empty() {
            return Err(DomainError::bad_request("Ingen filer i forsendelse"));
        }
        let total: usize = filer.iter().map(|f| f.data.len()).sum();
        tracing::info!(antall = filer.len(), total, "Fors\u{f8}ker \u{e5} starte ettersendelse");

        let mut validert = Vec::with_capacity(metadata.len());
        for oppgave in &metadata {
            let paret = oppgave
                .filer
                .iter()
                .map(|m| finn_fil(m, &filer).map(|data| (m.clone(), data)))
                .collect::<Result<Vec<_>, _>>()?;
            let validerte = try_join_all(paret.into_iter().map(|(m, data)| self.valider(m, data))).await?;
            validert.push(validerte);
        }

        let alle_ok = validert.iter().flatten().all(|f| f.status == ValidationValues::Ok);
        if alle_ok {
            self.last_opp(digisos_id, &metadata, &validert, bruker).await?;
        } else {
            tracing::info!("Validering av vedlegg feilet, laster ikke opp");
        }
        Ok(metadata
            .into_iter()
            .zip(validert)
            .map(|(oppgave, filer)| to_response(oppgave, &filer))
            .collect())
    }

    async fn valider(&self, metadata: OpplastetFilMetadata, data: Bytes) -> Result<ValidertFil, DomainError> {
        if data.len() > MAKS_TOTAL_FILSTORRELSE {
            return Ok(ValidertFil::feilet(metadata, data, ValidationValues::FileTooLarge));
        }
        if contains_illegal_characters(&metadata.filnavn) {
            return Ok(ValidertFil::feilet(metadata, data, ValidationValues::IllegalFilename));
        }
        self.virus_scan.scan(&metadata.filnavn, &data).await?;

        let (status, fil_type) = validate_file_type(&metadata.filnavn, &data);
        Ok(ValidertFil {
            metadata,
            data,
            status,
            fil_type,
        })
    }

    async fn last_opp(
        &self,
        digisos_id: &str,
        metadata: &[OpplastetVedleggMetadata],
        validert: &[Vec<ValidertFil>],
        bruker: &InnloggetBruker,
    ) -> Result<(), DomainError> {
        let mut opplastinger = Vec::new();
        let mut vedlegg = Vec::with_capacity(metadata.len());
        for (oppgave, filer) in metadata.iter().zip(validert) {
            let mut json_filer = Vec::with_capacity(filer.len());
            for fil in filer {
                let Some(fil_type) = fil.fil_type else {
                    continue;
                };
                let filnavn = lag_filnavn(&fil.metadata, fil_type);
                json_filer.push(JsonFiler {
                    filnavn: filnavn.clone(),
                    sha512: Some(sha512_hex(&fil.data)),
                });
                opplastinger.push(FilForOpplasting {
                    filnavn,
                    mimetype: fil_type.mimetype().to_owned(),
                    storrelse: fil.data.len() as u64,
                    data: fil.data.clone(),
                });
            }
            vedlegg.push(JsonVedlegg {
                vedlegg_type: oppgave.vedlegg_type.clone(),
                tilleggsinfo: oppgave.tilleggsinfo.clone(),
                status: LASTET_OPP_STATUS.to_owned(),
                filer: json_filer,
                hendelse_type: oppgave.hendelsetype,
                hendelse_referanse: oppgave.hendelsereferanse.clone(),
            });
        }
        let spesifikasjon = JsonVedleggSpesifikasjon { vedlegg };

        let sak = self.fiks.hent_digisos_sak(digisos_id, bruker).await?;
        let nav_ekstern_ref_id = lag_nav_ekstern_ref_id(&sak);
        self.fiks
            .last_opp_ny_ettersendelse(&sak, &nav_ekstern_ref_id, &spesifikasjon, opplastinger, bruker)
            .await?;
        tracing::info!(%nav_ekstern_ref_id, "Ettersendelse lastet opp");
        Ok(())
    }
}

impl ValidertFil {
    fn feilet(metadata: OpplastetFilMetadata, data: Bytes, status: ValidationValues) -> Self {
        Self {
            metadata,
            data,
            status,
            fil_type: None,
        }
    }
}

fn finn_fil(metadata: &OpplastetFilMetadata, filer: &[OpplastetFil]) -> Result<Bytes, DomainError> {
    let uuid = metadata.uuid.to_string();
    filer
        .iter()
        .find(|f| f.filnavn.contains(&uuid))
        .map(|f| f.data.clone())
        .ok_or(DomainError::OpplastingFilnavnMismatch)
}

fn to_response(oppgave: OpplastetVedleggMetadata, filer: &[ValidertFil]) -> OppgaveOpplastingResponse {
    OppgaveOpplastingResponse {
        vedlegg_type: oppgave.vedlegg_type,
        tilleggsinfo: oppgave.tilleggsinfo,
        innsendelsesfrist: oppgave.innsendelsesfrist,
        hendelsetype: oppgave.hendelsetype,
        hendelsereferanse: oppgave.hendelsereferanse,
        filer: filer
            .iter()
            .map(|f| VedleggOpplastingResponse {
                filnavn: sanitize_file_name(&f.metadata.filnavn),
                status: f.status,
            })
            .collect(),
    }
}

/// Detects the file type from its first bytes and checks that PDFs can be
/// opened.
#[must_use]
pub fn validate_file_type(filnavn: &str, data: &[u8]) -> (ValidationValues, Option<FilType>) {
    let Some(fil_type) = FilType::detect(data) else {
        let forste: Vec<u8> = data.iter().take(8).copied().collect();
        tracing::warn!(filnavn, forste_bytes = ?forste, "Ukjent filtype");
        return (ValidationValues::IllegalFileType, None);
    };
    match fil_type {
        FilType::Pdf => (check_pdf(data), Some(fil_type)),
        FilType::Png | FilType::Jpeg => {
            let ext = filnavn.rsplit_once('.').map(|(_, ext)| ext.to_lowercase()).unwrap_or_default();
            if matches!(ext.as_str(), "jfif" | "pjpeg" | "pjp") {
                tracing::warn!(%ext, "Bildefil med filendelse vi ikke godtar");
                (ValidationValues::IllegalFileType, None)
            } else {
                (ValidationValues::Ok, Some(fil_type))
            }
        }
    }
}

fn pdf_header_offset(data: &[u8]) -> Option<usize> {
    let sok = &data[..data.len().min(PDF_HEADER_SOK)];
    sok.windows(PDF_MAGIC.len()).position(|w| w == PDF_MAGIC)
}

fn check_pdf(data: &[u8]) -> ValidationValues {
    let start = pdf_header_offset(data).unwrap_or(0);
    pdf_status(&lopdf::Document::load_mem(&data[start..]))
}

fn pdf_status(lastet: &lopdf::Result<lopdf::Document>) -> ValidationValues {
    match lastet {
        Ok(doc) if doc.is_encrypted() => {
            tracing::warn!("PDF er kryptert");
            ValidationValues::PdfIsEncrypted
        }
        Ok(_) => ValidationValues::Ok,
        Err(e) => {
            tracing::warn!(error = %e, "PDF kunne ikke lastes");
            ValidationValues::CouldNotLoadDocument
        }
    }
}

/// `<name, at most 50 chars>-<first uuid segment><ext>`
fn lag_filnavn(metadata: &OpplastetFilMetadata, fil_type: FilType) -> String {
    let sanitized = sanitize_file_name(&metadata.filnavn);
    let (navn, _) = split_file_name(&sanitized);
    let kort: String = navn.chars().take(MAKS_FILNAVN_LENGDE).collect();
    let uuid = metadata.uuid.to_string();
    let uuid_del = uuid.split('-').next().unwrap_or_default();
    format!("{kort}-{uuid_del}{}", fil_type.extension())
}
