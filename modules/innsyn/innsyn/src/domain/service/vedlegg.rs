use std::sync::Arc;

use chrono::NaiveDateTime;
use futures::future::try_join_all;
use innsyn_sdk::{
    DigisosSak, DokumentInfo, Ettersendelse, JsonFiler, JsonVedlegg, JsonVedleggSpesifikasjon, LASTET_OPP_STATUS,
    VedleggHendelseType,
};
use serde::Serialize;

use crate::auth::InnloggetBruker;
use crate::domain::error::DomainError;
use crate::domain::event::{EventService, Lenker};
use crate::domain::model::InternalDigisosSoker;
use crate::domain::service::fiks::FiksService;
use crate::domain::util::{remove_uuid_from_filename, sanitize_file_name, unix_millis_to_local};

/// The generated cover letter of an ettersendelse; never listed as a vedlegg.
const ETTERSENDELSE_PDF: &str = "ettersendelse.pdf";

/// One attachment type sent at one point in time, with its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalVedlegg {
    pub vedlegg_type: String,
    pub tilleggsinfo: Option<String>,
    pub hendelse_type: Option<VedleggHendelseType>,
    pub hendelse_referanse: Option<String>,
    pub dokument_info_list: Vec<DokumentInfo>,
    pub tidspunkt_lastet_opp: NaiveDateTime,
    pub innsendelsesfrist: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VedleggResponse {
    pub filnavn: String,
    pub storrelse: i64,
    pub url: String,
    #[serde(rename = "type")]
    pub vedlegg_type: String,
    pub tilleggsinfo: Option<String>,
    pub dato_lagt_til: NaiveDateTime,
}

pub struct VedleggService {
    fiks: Arc<FiksService>,
    events: Arc<EventService>,
    lenker: Lenker,
}

impl VedleggService {
    #[must_use]
    pub fn new(fiks: Arc<FiksService>, events: Arc<EventService>, lenker: Lenker) -> Self {
        Self { fiks, events, lenker }
    }

    /// Every file the citizen has sent on the case, flattened. Empty when
    /// nothing was sent.
    ///
    /// # Errors
    /// Upstream failures from Fiks, or `NedlastingFilnavnMismatch` when an
    /// ettersendelse's files do not match its specification.
    pub async fn hent_vedlegg(&self, digisos_id: &str, bruker: &InnloggetBruker) -> Result<Vec<VedleggResponse>, DomainError> {
        let sak = self.fiks.hent_digisos_sak(digisos_id, bruker).await?;
        let model = self.events.create_model(&sak, bruker).await?;
        let vedlegg = self.hent_alle_opplastede_vedlegg(&sak, &model, bruker).await?;

        let mut responses: Vec<VedleggResponse> = Vec::new();
        for v in vedlegg {
            for dokument in v.dokument_info_list {
                let response = VedleggResponse {
                    filnavn: remove_uuid_from_filename(&dokument.filnavn),
                    storrelse: dokument.storrelse,
                    url: self.lenker.dokumentlager(&dokument.dokumentlager_dokument_id),
                    vedlegg_type: v.vedlegg_type.clone(),
                    tilleggsinfo: v.tilleggsinfo.clone(),
                    dato_lagt_til: v.tidspunkt_lastet_opp,
                };
                if !responses.contains(&response) {
                    responses.push(response);
                }
            }
        }
        Ok(responses)
    }

    /// # Errors
    /// As [`Self::hent_vedlegg`].
    pub async fn hent_alle_opplastede_vedlegg(
        &self,
        sak: &DigisosSak,
        model: &InternalDigisosSoker,
        bruker: &InnloggetBruker,
    ) -> Result<Vec<InternalVedlegg>, DomainError> {
        let mut vedlegg = self.hent_soknad_vedlegg_med_status(LASTET_OPP_STATUS, sak, bruker).await?;
        vedlegg.extend(self.hent_ettersendte_vedlegg(sak, model, bruker).await?);
        Ok(vedlegg)
    }

    /// Attachments declared in the original application with `status`.
    ///
    /// # Errors
    /// Upstream failures from Fiks.
    pub async fn hent_soknad_vedlegg_med_status(
        &self,
        status: &str,
        sak: &DigisosSak,
        bruker: &InnloggetBruker,
    ) -> Result<Vec<InternalVedlegg>, DomainError> {
        let Some(original) = &sak.original_soknad_nav else {
            return Ok(Vec::new());
        };
        let Some(tidspunkt) = unix_millis_to_local(original.timestamp_sendt) else {
            return Ok(Vec::new());
        };
        let spesifikasjon: JsonVedleggSpesifikasjon = self
            .fiks
            .hent_dokument(&sak.fiks_digisos_id, &original.vedlegg_metadata, bruker)
            .await?;

        let vedlegg = spesifikasjon
            .vedlegg
            .into_iter()
            .filter(|v| v.status == status)
            .map(|v| InternalVedlegg {
                dokument_info_list: match_dokument_info_and_filer(&original.vedlegg, &v.filer),
                vedlegg_type: v.vedlegg_type,
                tilleggsinfo: v.tilleggsinfo,
                hendelse_type: v.hendelse_type,
                hendelse_referanse: v.hendelse_referanse,
                tidspunkt_lastet_opp: tidspunkt,
                innsendelsesfrist: None,
            })
            .collect();
        Ok(kombiner_alle_like_vedlegg(vedlegg))
    }

    /// Attachments uploaded after the application, through innsyn.
    ///
    /// # Errors
    /// Upstream failures from Fiks, or `NedlastingFilnavnMismatch`.
    pub async fn hent_ettersendte_vedlegg(
        &self,
        sak: &DigisosSak,
        model: &InternalDigisosSoker,
        bruker: &InnloggetBruker,
    ) -> Result<Vec<InternalVedlegg>, DomainError> {
        let ettersendelser = sak.ettersendelser();
        let spesifikasjoner = try_join_all(ettersendelser.iter().map(|e| {
            self.fiks
                .hent_dokument::<JsonVedleggSpesifikasjon>(&sak.fiks_digisos_id, &e.vedlegg_metadata, bruker)
        }))
        .await?;

        let mut alle = Vec::new();
        for (ettersendelse, spesifikasjon) in ettersendelser.iter().zip(spesifikasjoner) {
            alle.extend(vedlegg_fra_ettersendelse(ettersendelse, spesifikasjon, model)?);
        }
        Ok(kombiner_alle_like_vedlegg(alle))
    }
}

fn vedlegg_fra_ettersendelse(
    ettersendelse: &Ettersendelse,
    spesifikasjon: JsonVedleggSpesifikasjon,
    model: &InternalDigisosSoker,
) -> Result<Vec<InternalVedlegg>, DomainError> {
    let Some(tidspunkt) = unix_millis_to_local(ettersendelse.timestamp_sendt) else {
        tracing::warn!(nav_ekstern_ref_id = %ettersendelse.nav_ekstern_ref_id, "Ettersendelse har ugyldig timestampSendt");
        return Ok(Vec::new());
    };
    let filer: Vec<&DokumentInfo> = ettersendelse
        .vedlegg
        .iter()
        .filter(|v| v.filnavn != ETTERSENDELSE_PDF)
        .collect();

    let mut fil_index = 0;
    let mut vedlegg = Vec::new();
    for v in spesifikasjon.vedlegg.into_iter().filter(|v| v.status == LASTET_OPP_STATUS) {
        let start = fil_index;
        fil_index += v.filer.len();
        let dokument_info_list = if let Some(slice) = filer.get(start..fil_index) {
            let dokumenter: Vec<DokumentInfo> = slice.iter().map(|d| (*d).clone()).collect();
            if !filnavn_matcher(&dokumenter, &v.filer) {
                return Err(DomainError::NedlastingFilnavnMismatch);
            }
            dokumenter
        } else {
            tracing::error!(
                filer = fil_index,
                metadata = filer.len(),
                "Det er mismatch mellom nedlastede filer og metadata. Det er flere filer enn vi har metadata"
            );
            v.filer
                .iter()
                .map(|f| DokumentInfo {
                    filnavn: f.filnavn.clone(),
                    dokumentlager_dokument_id: "Error".to_owned(),
                    storrelse: -1,
                })
                .collect()
        };
        let innsendelsesfrist = innsendelsesfrist_fra_oppgave(model, &v);
        vedlegg.push(InternalVedlegg {
            vedlegg_type: v.vedlegg_type,
            tilleggsinfo: v.tilleggsinfo,
            hendelse_type: v.hendelse_type,
            hendelse_referanse: v.hendelse_referanse,
            dokument_info_list,
            tidspunkt_lastet_opp: tidspunkt,
            innsendelsesfrist,
        });
    }
    Ok(vedlegg)
}

fn match_dokument_info_and_filer(dokumenter: &[DokumentInfo], filer: &[JsonFiler]) -> Vec<DokumentInfo> {
    filer
        .iter()
        .flat_map(|f| dokumenter.iter().filter(move |d| d.filnavn == f.filnavn).cloned())
        .collect()
}

fn filnavn_matcher(dokumenter: &[DokumentInfo], filer: &[JsonFiler]) -> bool {
    dokumenter.len() == filer.len()
        && dokumenter
            .iter()
            .zip(filer)
            .all(|(d, f)| sanitize_file_name(&d.filnavn) == sanitize_file_name(&f.filnavn))
}

/// Latest deadline among oppgaver of the same type.
fn innsendelsesfrist_fra_oppgave(model: &InternalDigisosSoker, vedlegg: &JsonVedlegg) -> Option<NaiveDateTime> {
    model
        .oppgaver
        .iter()
        .filter(|o| o.tittel == vedlegg.vedlegg_type && o.tilleggsinfo == vedlegg.tilleggsinfo)
        .filter_map(|o| o.innsendelsesfrist)
        .max()
}

/// Merges vedlegg of the same type and tilleggsinfo sent within the same
/// minute.
#[must_use]
pub fn kombiner_alle_like_vedlegg(alle: Vec<InternalVedlegg>) -> Vec<InternalVedlegg> {
    let mut kombinert: Vec<InternalVedlegg> = Vec::new();
    for vedlegg in alle {
        let funnet = kombinert.iter_mut().find(|k| {
            innenfor_ett_minutt(k.tidspunkt_lastet_opp, vedlegg.tidspunkt_lastet_opp)
                && k.vedlegg_type == vedlegg.vedlegg_type
                && k.tilleggsinfo == vedlegg.tilleggsinfo
        });
        match funnet {
            Some(k) => k.dokument_info_list.extend(vedlegg.dokument_info_list),
            None => kombinert.push(vedlegg),
        }
    }
    kombinert
}

fn innenfor_ett_minutt(a: NaiveDateTime, b: NaiveDateTime) -> bool {
    a.signed_duration_since(b).num_minutes() == 0
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn tidspunkt(sekunder: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 10, 1)
            .unwrap()
            .and_hms_opt(12, 0, sekunder)
            .unwrap()
    }

    fn dokument(filnavn: &str) -> DokumentInfo {
        DokumentInfo {
            filnavn: filnavn.to_owned(),
            dokumentlager_dokument_id: format!("id-{filnavn}"),
            storrelse: 1,
        }
    }

    fn vedlegg(vedlegg_type: &str, tidspunkt_lastet_opp: NaiveDateTime, filer: &[&str]) -> InternalVedlegg {
        InternalVedlegg {
            vedlegg_type: vedlegg_type.to_owned(),
            tilleggsinfo: Some("annet".to_owned()),
            hendelse_type: None,
            hendelse_referanse: None,
            dokument_info_list: filer.iter().map(|f| dokument(f)).collect(),
            tidspunkt_lastet_opp,
            innsendelsesfrist: None,
        }
    }

    #[test]
    fn combines_same_type_within_a_minute() {
        let kombinert = kombiner_alle_like_vedlegg(vec![
            vedlegg("lonnslipp", tidspunkt(0), &["a.pdf"]),
            vedlegg("lonnslipp", tidspunkt(30), &["b.pdf"]),
            vedlegg("husleie", tidspunkt(30), &["c.pdf"]),
        ]);
        assert_eq!(kombinert.len(), 2);
        assert_eq!(kombinert[0].dokument_info_list.len(), 2);
        assert_eq!(kombinert[1].vedlegg_type, "husleie");
    }

    #[test]
    fn keeps_uploads_more_than_a_minute_apart() {
        let senere = tidspunkt(0) + chrono::Duration::minutes(5);
        let kombinert = kombiner_alle_like_vedlegg(vec![
            vedlegg("lonnslipp", tidspunkt(0), &["a.pdf"]),
            vedlegg("lonnslipp", senere, &["b.pdf"]),
        ]);
        assert_eq!(kombinert.len(), 2);
    }

    #[test]
    fn filename_match_ignores_surrounding_whitespace() {
        let filer = vec![JsonFiler {
            filnavn: "a.pdf ".to_owned(),
            sha512: None,
        }];
        assert!(filnavn_matcher(&[dokument("a.pdf")], &filer));
        assert!(!filnavn_matcher(&[dokument("b.pdf")], &filer));
        assert!(!filnavn_matcher(&[], &filer));
    }
}
