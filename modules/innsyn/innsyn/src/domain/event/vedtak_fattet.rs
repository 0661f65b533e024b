use innsyn_sdk::JsonVedtakFattet;

use super::ApplyContext;
use crate::domain::error::DomainError;
use crate::domain::model::{
    DEFAULT_SAK_REFERANSE, DEFAULT_SAK_TITTEL, Hendelse, HendelseTekstType, InternalDigisosSoker, Sak, SaksStatus,
    UrlResponse, Vedtak,
};
use crate::domain::util::to_local_date_time;

pub(super) fn apply(
    model: &mut InternalDigisosSoker,
    hendelse: &JsonVedtakFattet,
    ctx: &ApplyContext<'_>,
) -> Result<(), DomainError> {
    let tidspunkt = to_local_date_time(&hendelse.hendelsestidspunkt)?;
    let url = ctx.lenker.filreferanse(&hendelse.vedtaksfil.referanse);
    let saksreferanse = hendelse.saksreferanse.as_deref();

    let index = match model
        .saker
        .iter()
        .position(|s| Some(s.referanse.as_str()) == saksreferanse || s.referanse == DEFAULT_SAK_REFERANSE)
    {
        Some(index) => index,
        None => {
            model.saker.push(Sak::new(
                saksreferanse.unwrap_or(DEFAULT_SAK_REFERANSE),
                Some(SaksStatus::UnderBehandling),
                Some(DEFAULT_SAK_TITTEL.to_owned()),
            ));
            model.saker.len() - 1
        }
    };
    let sak = &mut model.saker[index];
    sak.vedtak.push(Vedtak {
        id: hendelse.vedtaksfil.referanse.id().to_owned(),
        utfall: hendelse.utfall.map(Into::into),
        vedtaksfil_url: url.clone(),
        dato: tidspunkt.date(),
    });

    let tittel = sak.tittel.clone();
    let tekst_type = if tittel.is_some() {
        HendelseTekstType::SakFerdigbehandletMedTittel
    } else {
        HendelseTekstType::SakFerdigbehandletUtenTittel
    };
    tracing::info!(saksreferanse = ?saksreferanse, "Hendelse: vedtak fattet");
    model.historikk.push(
        Hendelse::new(tekst_type, tidspunkt)
            .with_url(UrlResponse {
                lenketekst: HendelseTekstType::VisBrevetLenketekst,
                link: url,
            })
            .with_tekst_argument(tittel)
            .with_saks_referanse(hendelse.saksreferanse.clone()),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use innsyn_sdk::{JsonFilreferanse, JsonUtfall, JsonVedtaksfil};

    use super::*;
    use crate::domain::model::UtfallVedtak;
    use crate::domain::testing::{FNR, FakeNorg, FakeToggles, lenker};

    fn hendelse(saksreferanse: Option<&str>) -> JsonVedtakFattet {
        JsonVedtakFattet {
            hendelsestidspunkt: "2018-10-12T13:37:00.134Z".to_owned(),
            saksreferanse: saksreferanse.map(ToOwned::to_owned),
            utfall: Some(JsonUtfall::Innvilget),
            vedtaksfil: JsonVedtaksfil {
                referanse: JsonFilreferanse::Dokumentlager {
                    id: "vedtak-1".to_owned(),
                },
            },
        }
    }

    #[test]
    fn vedtak_on_known_sak() {
        let lenker = lenker();
        let ctx = ApplyContext {
            lenker: &lenker,
            norg: &FakeNorg::default(),
            toggles: &FakeToggles::default(),
            fnr: FNR,
            is_papir_soknad: false,
        };
        let mut model = InternalDigisosSoker {
            saker: vec![Sak::new("SAK1", Some(SaksStatus::UnderBehandling), Some("Livsopphold".to_owned()))],
            ..InternalDigisosSoker::default()
        };
        apply(&mut model, &hendelse(Some("SAK1")), &ctx).unwrap();

        let vedtak = &model.saker[0].vedtak[0];
        assert_eq!(vedtak.id, "vedtak-1");
        assert_eq!(vedtak.utfall, Some(UtfallVedtak::Innvilget));
        assert_eq!(vedtak.vedtaksfil_url, "https://dokumentlager.test/dokumentlager/nedlasting/niva4/vedtak-1?inline=true");
        let linje = &model.historikk[0];
        assert_eq!(linje.hendelse_type, HendelseTekstType::SakFerdigbehandletMedTittel);
        assert_eq!(linje.tekst_argument.as_deref(), Some("Livsopphold"));
        assert_eq!(linje.url.as_ref().unwrap().lenketekst, HendelseTekstType::VisBrevetLenketekst);
    }

    #[test]
    fn vedtak_without_sak_creates_default_sak() {
        let lenker = lenker();
        let ctx = ApplyContext {
            lenker: &lenker,
            norg: &FakeNorg::default(),
            toggles: &FakeToggles::default(),
            fnr: FNR,
            is_papir_soknad: false,
        };
        let mut model = InternalDigisosSoker::default();
        apply(&mut model, &hendelse(None), &ctx).unwrap();
        apply(&mut model, &hendelse(None), &ctx).unwrap();

        assert_eq!(model.saker.len(), 1);
        assert_eq!(model.saker[0].referanse, DEFAULT_SAK_REFERANSE);
        assert_eq!(model.saker[0].tittel.as_deref(), Some(DEFAULT_SAK_TITTEL));
        assert_eq!(model.saker[0].vedtak.len(), 2);
        assert_eq!(model.historikk[0].saks_referanse, None);
    }
}
