use innsyn_sdk::JsonTildeltNavKontor;

use super::ApplyContext;
use crate::domain::error::DomainError;
use crate::domain::model::{Hendelse, HendelseTekstType, HistorikkType, InternalDigisosSoker, Soknadsmottaker};
use crate::domain::util::to_local_date_time;

const UKJENT_KONTOR: &str = "et annet NAV-kontor";

pub(super) async fn apply(
    model: &mut InternalDigisosSoker,
    hendelse: &JsonTildeltNavKontor,
    ctx: &ApplyContext<'_>,
) -> Result<(), DomainError> {
    if model.tildelt_nav_kontor.as_deref() == Some(hendelse.nav_kontor.as_str()) {
        return Ok(());
    }
    let tidspunkt = to_local_date_time(&hendelse.hendelsestidspunkt)?;

    // Assigned to the office that received it: nothing was forwarded.
    if model.soknadsmottaker.as_ref().map(|m| m.nav_enhetsnummer.as_str()) == Some(hendelse.nav_kontor.as_str()) {
        model.tildelt_nav_kontor = Some(hendelse.nav_kontor.clone());
        return Ok(());
    }
    model.tildelt_nav_kontor = Some(hendelse.nav_kontor.clone());

    let destinasjon = match ctx.norg.hent_nav_enhet(&hendelse.nav_kontor).await {
        Ok(enhet) => Some(enhet.navn),
        Err(e) => {
            tracing::warn!(nav_kontor = %hendelse.nav_kontor, error = %e, "Fant ikke NAV-kontor i Norg");
            None
        }
    };
    model.soknadsmottaker = Some(Soknadsmottaker {
        nav_enhetsnummer: hendelse.nav_kontor.clone(),
        nav_enhetsnavn: destinasjon.clone().unwrap_or_else(|| UKJENT_KONTOR.to_owned()),
    });

    // A paper application's first assignment is where it starts, not a forward.
    let forste_tildeling = !model
        .historikk
        .iter()
        .any(|h| h.historikk_type == Some(HistorikkType::TildeltNavKontor));
    let tekst_type = match (ctx.is_papir_soknad && forste_tildeling, destinasjon.is_some()) {
        (true, true) => HendelseTekstType::SoknadVideresendtPapirsoknadMedNorgEnhet,
        (true, false) => HendelseTekstType::SoknadVideresendtPapirsoknadUtenNorgEnhet,
        (false, true) => HendelseTekstType::SoknadVideresendtMedNorgEnhet,
        (false, false) => HendelseTekstType::SoknadVideresendtUtenNorgEnhet,
    };

    tracing::info!(tidspunkt = %hendelse.hendelsestidspunkt, tekst = ?tekst_type, "Hendelse: tildelt NAV-kontor");
    model.historikk.push(
        Hendelse::new(tekst_type, tidspunkt)
            .with_historikk_type(HistorikkType::TildeltNavKontor)
            .with_tekst_argument(destinasjon),
    );
    Ok(())
}
