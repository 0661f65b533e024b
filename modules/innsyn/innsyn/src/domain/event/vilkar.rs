use innsyn_sdk::JsonVilkar;

use crate::domain::error::DomainError;
use crate::domain::model::{InternalDigisosSoker, Vilkar};
use crate::domain::util::to_local_date_time;

pub(super) fn apply(model: &mut InternalDigisosSoker, hendelse: &JsonVilkar) -> Result<(), DomainError> {
    let tidspunkt = to_local_date_time(&hendelse.hendelsestidspunkt)?;
    let vilkar = Vilkar {
        referanse: hendelse.vilkarreferanse.clone(),
        tittel: hendelse.tittel.clone(),
        beskrivelse: hendelse.beskrivelse.clone(),
        status: hendelse.status.into(),
        dato_lagt_til: tidspunkt,
        dato_sist_endret: tidspunkt,
        utbetalings_referanse: hendelse.utbetalingsreferanse.clone(),
    };

    upsert(&mut model.vilkar, &vilkar);

    // Drop the vilkar from sak-attached utbetalinger it no longer points at.
    for utbetaling in model
        .utbetalinger
        .iter_mut()
        .filter(|u| u.saksreferanse.is_some() && !hendelse.utbetalingsreferanse.contains(&u.referanse))
    {
        utbetaling.vilkar.retain(|v| v.referanse != vilkar.referanse);
    }

    let mut funnet = false;
    for utbetaling in model
        .utbetalinger
        .iter_mut()
        .filter(|u| u.saksreferanse.is_some() && hendelse.utbetalingsreferanse.contains(&u.referanse))
    {
        upsert(&mut utbetaling.vilkar, &vilkar);
        funnet = true;
    }
    if !funnet {
        tracing::warn!(
            vilkarreferanse = %hendelse.vilkarreferanse,
            "Fant ingen utbetalinger \u{e5} knytte vilk\u{e5}r til"
        );
    }
    Ok(())
}

fn upsert(liste: &mut Vec<Vilkar>, vilkar: &Vilkar) {
    match liste.iter_mut().find(|v| v.referanse == vilkar.referanse) {
        Some(existing) => {
            existing.dato_sist_endret = vilkar.dato_sist_endret;
            existing.tittel.clone_from(&vilkar.tittel);
            existing.beskrivelse.clone_from(&vilkar.beskrivelse);
            existing.status = vilkar.status;
            existing.utbetalings_referanse.clone_from(&vilkar.utbetalings_referanse);
        }
        None => liste.push(vilkar.clone()),
    }
}

#[cfg(test)]
mod tests {
    use innsyn_sdk::JsonOppgaveStatus;

    use super::*;
    use crate::domain::model::Oppgavestatus;
    use crate::domain::testing::utbetaling;

    fn hendelse(tidspunkt: &str, utbetalinger: &[&str], beskrivelse: &str) -> JsonVilkar {
        JsonVilkar {
            hendelsestidspunkt: tidspunkt.to_owned(),
            vilkarreferanse: "vilkar-1".to_owned(),
            utbetalingsreferanse: utbetalinger.iter().map(|u| (*u).to_owned()).collect(),
            saksreferanse: None,
            tittel: Some("Aktivitetsplikt".to_owned()),
            beskrivelse: Some(beskrivelse.to_owned()),
            status: JsonOppgaveStatus::Relevant,
        }
    }

    #[test]
    fn attaches_to_referenced_sak_utbetalinger_only() {
        let mut model = InternalDigisosSoker {
            utbetalinger: vec![
                utbetaling("U1", Some("SAK1")),
                utbetaling("U2", Some("SAK1")),
                utbetaling("U3", None),
            ],
            ..InternalDigisosSoker::default()
        };
        apply(&mut model, &hendelse("2018-10-12T13:37:00.134Z", &["U1", "U3"], "en")).unwrap();

        assert_eq!(model.vilkar.len(), 1);
        assert_eq!(model.utbetalinger[0].vilkar.len(), 1);
        assert!(model.utbetalinger[1].vilkar.is_empty());
        assert!(model.utbetalinger[2].vilkar.is_empty());
        assert_eq!(model.vilkar[0].status, Oppgavestatus::Relevant);
    }

    #[test]
    fn update_keeps_dato_lagt_til_and_moves_between_utbetalinger() {
        let mut model = InternalDigisosSoker {
            utbetalinger: vec![utbetaling("U1", Some("SAK1")), utbetaling("U2", Some("SAK1"))],
            ..InternalDigisosSoker::default()
        };
        apply(&mut model, &hendelse("2018-10-12T13:37:00.134Z", &["U1"], "en")).unwrap();
        apply(&mut model, &hendelse("2018-10-14T13:37:00.134Z", &["U2"], "to")).unwrap();

        assert_eq!(model.vilkar.len(), 1);
        let vilkar = &model.vilkar[0];
        assert!(vilkar.dato_sist_endret > vilkar.dato_lagt_til);
        assert_eq!(vilkar.beskrivelse.as_deref(), Some("to"));
        assert!(model.utbetalinger[0].vilkar.is_empty());
        assert_eq!(model.utbetalinger[1].vilkar[0].beskrivelse.as_deref(), Some("to"));
    }

    #[test]
    fn without_matching_utbetaling_only_model_list_is_updated() {
        let mut model = InternalDigisosSoker::default();
        apply(&mut model, &hendelse("2018-10-12T13:37:00.134Z", &["U9"], "en")).unwrap();
        assert_eq!(model.vilkar.len(), 1);
    }
}
