use innsyn_sdk::{JsonDokumentasjonkrav, VedleggHendelseType};

use super::{ApplyContext, DOKUMENTASJONKRAV_ENABLED};
use crate::domain::error::DomainError;
use crate::domain::model::{Dokumentasjonkrav, Hendelse, HendelseTekstType, InternalDigisosSoker};
use crate::domain::util::{to_local_date_time, to_optional_local_date};

pub(super) fn apply(
    model: &mut InternalDigisosSoker,
    hendelse: &JsonDokumentasjonkrav,
    ctx: &ApplyContext<'_>,
) -> Result<(), DomainError> {
    let tidspunkt = to_local_date_time(&hendelse.hendelsestidspunkt)?;

    let refererte = model
        .utbetalinger
        .iter()
        .filter(|u| hendelse.utbetalingsreferanse.contains(&u.referanse))
        .count();
    if refererte == 0 {
        tracing::warn!(
            dokumentasjonkravreferanse = %hendelse.dokumentasjonkravreferanse,
            "Fant ingen utbetalinger \u{e5} knytte dokumentasjonkrav til"
        );
        return Ok(());
    }

    let frist = to_optional_local_date(hendelse.frist.as_deref())?;
    let krav = Dokumentasjonkrav {
        dokumentasjonkrav_id: Dokumentasjonkrav::id_for_frist(frist),
        referanse: hendelse.dokumentasjonkravreferanse.clone(),
        hendelsetype: VedleggHendelseType::Dokumentasjonkrav,
        tittel: hendelse.tittel.clone(),
        beskrivelse: hendelse.beskrivelse.clone(),
        status: hendelse.status.into(),
        dato_lagt_til: tidspunkt,
        frist,
        utbetalings_referanse: hendelse.utbetalingsreferanse.clone(),
    };

    for utbetaling in model
        .utbetalinger
        .iter_mut()
        .filter(|u| hendelse.utbetalingsreferanse.contains(&u.referanse))
    {
        upsert(&mut utbetaling.dokumentasjonkrav, &krav);
    }
    upsert(&mut model.dokumentasjonkrav, &krav);

    if ctx.toggles.is_enabled(DOKUMENTASJONKRAV_ENABLED, Some(ctx.fnr), false) {
        model
            .historikk
            .push(Hendelse::new(HendelseTekstType::Dokumentasjonkrav, tidspunkt));
    }
    Ok(())
}

fn upsert(liste: &mut Vec<Dokumentasjonkrav>, krav: &Dokumentasjonkrav) {
    match liste.iter_mut().find(|k| k.referanse == krav.referanse) {
        Some(existing) => {
            existing.dokumentasjonkrav_id.clone_from(&krav.dokumentasjonkrav_id);
            existing.tittel.clone_from(&krav.tittel);
            existing.beskrivelse.clone_from(&krav.beskrivelse);
            existing.status = krav.status;
            existing.frist = krav.frist;
            existing.utbetalings_referanse.clone_from(&krav.utbetalings_referanse);
        }
        None => liste.push(krav.clone()),
    }
}
