use innsyn_sdk::{JsonDokumentasjonEtterspurt, VedleggHendelseType};

use super::ApplyContext;
use crate::domain::error::DomainError;
use crate::domain::model::{Hendelse, HendelseTekstType, InternalDigisosSoker, Oppgave, SoknadsStatus, UrlResponse};
use crate::domain::util::{sha256_hex, to_local_date_time};

pub(super) fn apply(
    model: &mut InternalDigisosSoker,
    hendelse: &JsonDokumentasjonEtterspurt,
    ctx: &ApplyContext<'_>,
) -> Result<(), DomainError> {
    let tidspunkt = to_local_date_time(&hendelse.hendelsestidspunkt)?;
    let antall_for = model.oppgaver.len();

    let oppgaver = hendelse
        .dokumenter
        .iter()
        .map(|d| {
            let innsendelsesfrist = d.innsendelsesfrist.as_deref().map(to_local_date_time).transpose()?;
            Ok(Oppgave {
                oppgave_id: sha256_hex(d.innsendelsesfrist.as_deref().unwrap_or_default()),
                tittel: d.dokumenttype.clone(),
                tilleggsinfo: d.tilleggsinformasjon.clone(),
                hendelsetype: Some(VedleggHendelseType::DokumentasjonEtterspurt),
                hendelsereferanse: d.dokumentreferanse.clone(),
                innsendelsesfrist,
                tidspunkt_for_krav: tidspunkt,
                er_fra_innsyn: true,
            })
        })
        .collect::<Result<Vec<_>, DomainError>>()?;
    model.oppgaver = oppgaver;

    if model.status == SoknadsStatus::Ferdigbehandlet {
        tracing::warn!("Dokumentasjon etterspurt etter at s\u{f8}knaden er ferdigbehandlet");
    }

    if hendelse.dokumenter.is_empty() {
        let hadde_oppgaver = antall_for > 0;
        if hadde_oppgaver && !matches!(model.status, SoknadsStatus::Ferdigbehandlet | SoknadsStatus::BehandlesIkke) {
            model
                .historikk
                .push(Hendelse::new(HendelseTekstType::EttersporIkkeMerDokumentasjon, tidspunkt));
        }
    } else if let Some(brev) = &hendelse.forvaltningsbrev {
        model.historikk.push(
            Hendelse::new(HendelseTekstType::EttersporMerDokumentasjon, tidspunkt).with_url(UrlResponse {
                lenketekst: HendelseTekstType::VisBrevetLenketekst,
                link: ctx.lenker.filreferanse(&brev.referanse),
            }),
        );
    }
    tracing::info!(antall = hendelse.dokumenter.len(), "Hendelse: dokumentasjon etterspurt");
    Ok(())
}

#[cfg(test)]
mod tests {
    use innsyn_sdk::{JsonDokumenter, JsonFilreferanse, JsonForvaltningsbrev};

    use super::*;
    use crate::domain::testing::{FNR, FakeNorg, FakeToggles, lenker};

    fn dokument(frist: Option<&str>) -> JsonDokumenter {
        JsonDokumenter {
            dokumenttype: "Str\u{f8}mfaktura".to_owned(),
            tilleggsinformasjon: Some("for mai".to_owned()),
            innsendelsesfrist: frist.map(ToOwned::to_owned),
            dokumentreferanse: Some("dok-ref".to_owned()),
        }
    }

    fn hendelse(dokumenter: Vec<JsonDokumenter>) -> JsonDokumentasjonEtterspurt {
        JsonDokumentasjonEtterspurt {
            hendelsestidspunkt: "2018-10-11T13:37:00.134Z".to_owned(),
            forvaltningsbrev: Some(JsonForvaltningsbrev {
                referanse: JsonFilreferanse::Dokumentlager { id: "brev".to_owned() },
            }),
            dokumenter,
        }
    }

    #[test]
    fn replaces_oppgaver_and_links_the_letter() {
        let lenker = lenker();
        let ctx = ApplyContext {
            lenker: &lenker,
            norg: &FakeNorg::default(),
            toggles: &FakeToggles::default(),
            fnr: FNR,
            is_papir_soknad: false,
        };
        let mut model = InternalDigisosSoker::default();
        apply(&mut model, &hendelse(vec![dokument(Some("2018-10-20T07:37:00.134Z")), dokument(None)]), &ctx).unwrap();

        assert_eq!(model.oppgaver.len(), 2);
        let oppgave = &model.oppgaver[0];
        assert_eq!(oppgave.oppgave_id, sha256_hex("2018-10-20T07:37:00.134Z"));
        assert_eq!(oppgave.hendelsetype, Some(VedleggHendelseType::DokumentasjonEtterspurt));
        assert_eq!(oppgave.hendelsereferanse.as_deref(), Some("dok-ref"));
        assert!(oppgave.innsendelsesfrist.is_some());
        assert!(oppgave.er_fra_innsyn);
        assert_eq!(model.oppgaver[1].oppgave_id, sha256_hex(""));
        assert_eq!(model.historikk[0].hendelse_type, HendelseTekstType::EttersporMerDokumentasjon);
    }

    #[test]
    fn emptied_list_tells_that_nothing_more_is_needed() {
        let lenker = lenker();
        let ctx = ApplyContext {
            lenker: &lenker,
            norg: &FakeNorg::default(),
            toggles: &FakeToggles::default(),
            fnr: FNR,
            is_papir_soknad: false,
        };
        let mut model = InternalDigisosSoker::default();
        apply(&mut model, &hendelse(vec![dokument(None)]), &ctx).unwrap();
        apply(&mut model, &hendelse(Vec::new()), &ctx).unwrap();

        assert!(model.oppgaver.is_empty());
        assert_eq!(model.historikk[1].hendelse_type, HendelseTekstType::EttersporIkkeMerDokumentasjon);
    }

    #[test]
    fn emptied_list_is_silent_when_ferdigbehandlet() {
        let lenker = lenker();
        let ctx = ApplyContext {
            lenker: &lenker,
            norg: &FakeNorg::default(),
            toggles: &FakeToggles::default(),
            fnr: FNR,
            is_papir_soknad: false,
        };
        let mut model = InternalDigisosSoker::default();
        apply(&mut model, &hendelse(vec![dokument(None)]), &ctx).unwrap();
        model.status = SoknadsStatus::Ferdigbehandlet;
        apply(&mut model, &hendelse(Vec::new()), &ctx).unwrap();

        assert_eq!(model.historikk.len(), 1);
    }
}
