use innsyn_sdk::JsonForelopigSvar;

use super::ApplyContext;
use crate::domain::error::DomainError;
use crate::domain::model::{Hendelse, HendelseTekstType, InternalDigisosSoker, UrlResponse};
use crate::domain::util::to_local_date_time;

pub(super) fn apply(
    model: &mut InternalDigisosSoker,
    hendelse: &JsonForelopigSvar,
    ctx: &ApplyContext<'_>,
) -> Result<(), DomainError> {
    let tidspunkt = to_local_date_time(&hendelse.hendelsestidspunkt)?;
    let link = ctx.lenker.filreferanse(&hendelse.forvaltningsbrev.referanse);

    model.forelopig_svar.har_mottatt_forelopig_svar = true;
    model.forelopig_svar.link = Some(link.clone());

    tracing::info!("Hendelse: forel\u{f8}pig svar");
    model.historikk.push(
        Hendelse::new(HendelseTekstType::BrevOmSaksbeandlingstid, tidspunkt).with_url(UrlResponse {
            lenketekst: HendelseTekstType::VisBrevetLenketekst,
            link,
        }),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use innsyn_sdk::{JsonFilreferanse, JsonForvaltningsbrev};

    use super::*;
    use crate::domain::testing::{FNR, FakeNorg, FakeToggles, lenker};

    #[test]
    fn marks_svar_received_with_link() {
        let lenker = lenker();
        let ctx = ApplyContext {
            lenker: &lenker,
            norg: &FakeNorg::default(),
            toggles: &FakeToggles::default(),
            fnr: FNR,
            is_papir_soknad: false,
        };
        let mut model = InternalDigisosSoker::default();
        let hendelse = JsonForelopigSvar {
            hendelsestidspunkt: "2018-10-10T13:37:00.134Z".to_owned(),
            forvaltningsbrev: JsonForvaltningsbrev {
                referanse: JsonFilreferanse::Svarut {
                    id: "brev".to_owned(),
                    nr: 2,
                },
            },
        };
        apply(&mut model, &hendelse, &ctx).unwrap();

        assert!(model.forelopig_svar.har_mottatt_forelopig_svar);
        assert_eq!(
            model.forelopig_svar.link.as_deref(),
            Some("https://svarut.test/forsendelse/brev/2?inline=true")
        );
        assert_eq!(model.historikk[0].hendelse_type, HendelseTekstType::BrevOmSaksbeandlingstid);
    }
}
