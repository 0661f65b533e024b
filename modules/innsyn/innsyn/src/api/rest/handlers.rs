use axum::Json;
use axum::extract::{FromRequestParts, Multipart, Path, Query, State};
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::Extension;
use http::StatusCode;
use http::header::SET_COOKIE;
use http::request::Parts;
use innsyn_sdk::KlageInput;
use uuid::Uuid;

use super::dto::{SaksDetaljerQuery, SendKlageRequest, SoknadsStatusResponse, UtbetalingerQuery};
use crate::auth::InnloggetBruker;
use crate::domain::error::DomainError;
use crate::domain::service::forelopig_svar::ForelopigSvarResponse;
use crate::domain::service::hendelse::HendelseResponse;
use crate::domain::service::klage::{KlageDto, KlageUtkastDto};
use crate::domain::service::kommune::KommuneResponse;
use crate::domain::service::oppgave::{DokumentasjonkravResponse, OppgaveResponse, VilkarResponse};
use crate::domain::service::opplasting::{OppgaveOpplastingResponse, OpplastetFil, VedleggOpplastingService};
use crate::domain::service::saksoversikt::{SaksDetaljerResponse, SaksListeResponse};
use crate::domain::service::session::SessionMetadata;
use crate::domain::service::tilgang::Tilgang;
use crate::domain::service::utbetalinger::{NyeOgTidligereUtbetalingerResponse, UtbetalingerResponse};
use crate::domain::xsrf::XSRF_HEADER;
use crate::state::AppState;

type ApiResult<T> = Result<T, DomainError>;

const XSRF_COOKIE_PATH: &str = "/sosialhjelp/innsyn";

/// The `XSRF-TOKEN-INNSYN-API` request header, if present.
pub struct XsrfHeader(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for XsrfHeader {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .headers
                .get(XSRF_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned),
        ))
    }
}

async fn sjekk_xsrf(state: &AppState, bruker: &InnloggetBruker, header: &XsrfHeader) -> ApiResult<()> {
    state.xsrf.check(&bruker.fnr, header.0.as_deref()).await?;
    Ok(())
}

fn json_or_no_content<T: serde::Serialize>(items: &[T]) -> Response {
    if items.is_empty() {
        StatusCode::NO_CONTENT.into_response()
    } else {
        Json(items).into_response()
    }
}

pub async fn is_alive() -> StatusCode {
    StatusCode::OK
}

pub async fn is_ready() -> StatusCode {
    StatusCode::OK
}

pub async fn session_metadata(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
) -> Json<SessionMetadata> {
    Json(state.services.session.hent_session_metadata(&bruker).await)
}

pub async fn tilgang(State(state): State<AppState>, Extension(bruker): Extension<InnloggetBruker>) -> Json<Tilgang> {
    Json(state.services.tilgang.hent_tilgang(&bruker).await)
}

pub async fn alle_saker(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
) -> ApiResult<Json<Vec<SaksListeResponse>>> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    Ok(Json(state.services.saksoversikt.hent_alle_saker(&bruker).await?))
}

pub async fn saks_detaljer(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
    Query(query): Query<SaksDetaljerQuery>,
) -> ApiResult<Json<SaksDetaljerResponse>> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    Ok(Json(state.services.saksoversikt.hent_saks_detaljer(&query.id, &bruker).await?))
}

/// Also hands out today's XSRF token as a cookie.
pub async fn soknads_status(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    let token = state.xsrf.generate(&bruker.fnr).await?;
    let status = state.services.soknads_status.hent_soknads_status(&id, &bruker).await?;
    let cookie = format!("{XSRF_HEADER}={token}; Path={XSRF_COOKIE_PATH}");
    Ok((AppendHeaders([(SET_COOKIE, cookie)]), Json(SoknadsStatusResponse::from(status))))
}

pub async fn saks_status(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    let statuser = state.services.saks_status.hent_saks_statuser(&id, &bruker).await?;
    Ok(json_or_no_content(&statuser))
}

pub async fn forelopig_svar(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
    Path(id): Path<String>,
) -> ApiResult<Json<ForelopigSvarResponse>> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    Ok(Json(state.services.forelopig_svar.hent_forelopig_svar_status(&id, &bruker).await?))
}

pub async fn hendelser(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<HendelseResponse>>> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    Ok(Json(state.services.hendelser.hent_hendelser(&id, &bruker).await?))
}

pub async fn oppgaver(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<OppgaveResponse>>> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    Ok(Json(state.services.oppgaver.hent_oppgaver(&id, &bruker).await?))
}

pub async fn oppgaver_med_id(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
    Path((id, oppgave_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<OppgaveResponse>>> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    Ok(Json(
        state
            .services
            .oppgaver
            .hent_oppgaver_med_oppgave_id(&id, &oppgave_id, &bruker)
            .await?,
    ))
}

pub async fn vilkar(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<VilkarResponse>>> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    Ok(Json(state.services.oppgaver.get_vilkar(&id, &bruker).await?))
}

pub async fn dokumentasjonkrav(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<DokumentasjonkravResponse>>> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    Ok(Json(state.services.oppgaver.get_dokumentasjonkrav(&id, &bruker).await?))
}

pub async fn dokumentasjonkrav_med_id(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
    Path((id, dokumentasjonkrav_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<DokumentasjonkravResponse>>> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    Ok(Json(
        state
            .services
            .oppgaver
            .get_dokumentasjonkrav_med_id(&id, &dokumentasjonkrav_id, &bruker)
            .await?,
    ))
}

pub async fn har_levert_dokumentasjonkrav(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
    Path(id): Path<String>,
) -> ApiResult<Json<bool>> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    Ok(Json(state.services.oppgaver.har_levert_dokumentasjonkrav(&id, &bruker).await?))
}

pub async fn hent_vedlegg(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    let vedlegg = state.services.vedlegg.hent_vedlegg(&id, &bruker).await?;
    Ok(json_or_no_content(&vedlegg))
}

/// Multipart upload: one `metadata.json` part plus the files it describes.
pub async fn send_vedlegg(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
    Path(id): Path<String>,
    xsrf: XsrfHeader,
    mut multipart: Multipart,
) -> ApiResult<Json<Vec<OppgaveOpplastingResponse>>> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    sjekk_xsrf(&state, &bruker, &xsrf).await?;

    let mut filer = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DomainError::bad_request(format!("Ugyldig multipart: {e}")))?
    {
        let filnavn = field.file_name().map_or_else(String::new, str::to_owned);
        let data = field
            .bytes()
            .await
            .map_err(|e| DomainError::bad_request(format!("Kunne ikke lese {filnavn}: {e}")))?;
        filer.push(OpplastetFil { filnavn, data });
    }
    let (metadata, filer) = VedleggOpplastingService::skill_ut_metadata(filer)?;
    Ok(Json(
        state
            .services
            .opplasting
            .send_vedlegg_til_fiks(&id, metadata, filer, &bruker)
            .await?,
    ))
}

pub async fn kommune(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
    Path(id): Path<String>,
) -> ApiResult<Json<KommuneResponse>> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    Ok(Json(state.services.kommune.hent_kommune_response(&id, &bruker).await?))
}

pub async fn utbetalinger(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
    Query(query): Query<UtbetalingerQuery>,
) -> ApiResult<Json<Vec<UtbetalingerResponse>>> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    Ok(Json(state.services.utbetalinger.hent_utbetalinger(&bruker, query.month).await?))
}

pub async fn nye_utbetalinger(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
) -> ApiResult<Json<Vec<NyeOgTidligereUtbetalingerResponse>>> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    Ok(Json(state.services.utbetalinger.hent_nye_utbetalinger(&bruker).await?))
}

pub async fn tidligere_utbetalinger(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
) -> ApiResult<Json<Vec<NyeOgTidligereUtbetalingerResponse>>> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    Ok(Json(state.services.utbetalinger.hent_tidligere_utbetalinger(&bruker).await?))
}

pub async fn utbetalinger_for_sak(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<UtbetalingerResponse>>> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    Ok(Json(state.services.utbetalinger.hent_utbetalinger_for_sak(&id, &bruker).await?))
}

pub async fn hent_klager(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<KlageDto>>> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    Ok(Json(state.services.klage.hent_klager(&id, &bruker).await?))
}

pub async fn opprett_klage(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
    Path(id): Path<String>,
    xsrf: XsrfHeader,
) -> ApiResult<Json<Uuid>> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    sjekk_xsrf(&state, &bruker, &xsrf).await?;
    Ok(Json(state.services.klage.opprett_klage(&id, &bruker).await?))
}

pub async fn hent_klage_utkast(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
    Path((id, klage_id)): Path<(String, Uuid)>,
) -> ApiResult<Json<KlageUtkastDto>> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    Ok(Json(state.services.klage.hent_klage_utkast(&id, klage_id, &bruker).await?))
}

pub async fn oppdater_klage(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
    Path((id, klage_id)): Path<(String, Uuid)>,
    xsrf: XsrfHeader,
    Json(input): Json<KlageInput>,
) -> ApiResult<StatusCode> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    sjekk_xsrf(&state, &bruker, &xsrf).await?;
    state.services.klage.oppdater_klage(&id, klage_id, input, &bruker).await?;
    Ok(StatusCode::OK)
}

pub async fn send_klage(
    State(state): State<AppState>,
    Extension(bruker): Extension<InnloggetBruker>,
    Path(id): Path<String>,
    xsrf: XsrfHeader,
    Json(request): Json<SendKlageRequest>,
) -> ApiResult<StatusCode> {
    state.services.tilgang.sjekk_tilgang(&bruker).await?;
    sjekk_xsrf(&state, &bruker, &xsrf).await?;
    state.services.klage.send_klage(&id, request.klage_id, &bruker).await?;
    Ok(StatusCode::OK)
}
