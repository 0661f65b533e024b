use innsyn_sdk::JsonUtbetaling;
use rust_decimal::Decimal;

use crate::domain::error::DomainError;
use crate::domain::model::{DEFAULT_SAK_REFERANSE, InternalDigisosSoker, Utbetaling, UtbetalingsStatus};
use crate::domain::util::{to_local_date_time, to_optional_local_date};

pub(super) fn apply(model: &mut InternalDigisosSoker, hendelse: &JsonUtbetaling) -> Result<(), DomainError> {
    let dato_hendelse = to_local_date_time(&hendelse.hendelsestidspunkt)?;

    // Unknown saksreferanse falls back to the default sak, if one exists.
    let saksreferanse = hendelse
        .saksreferanse
        .as_deref()
        .and_then(|r| model.sak(r))
        .or_else(|| model.sak(DEFAULT_SAK_REFERANSE))
        .map(|s| s.referanse.clone());

    let annen_mottaker = hendelse.annen_mottaker.unwrap_or(true);
    let utbetaling = Utbetaling {
        referanse: hendelse.utbetalingsreferanse.clone(),
        saksreferanse,
        status: hendelse.status.map_or(UtbetalingsStatus::PlanlagtUtbetaling, Into::into),
        belop: hendelse
            .belop
            .and_then(|b| Decimal::try_from(b).ok())
            .unwrap_or_default(),
        beskrivelse: hendelse.beskrivelse.clone(),
        forfallsdato: to_optional_local_date(hendelse.forfallsdato.as_deref())?,
        utbetalingsdato: to_optional_local_date(hendelse.utbetalingsdato.as_deref())?,
        stoppetdato: to_optional_local_date(hendelse.stoppetdato.as_deref())?,
        fom: to_optional_local_date(hendelse.fom.as_deref())?,
        tom: to_optional_local_date(hendelse.tom.as_deref())?,
        mottaker: hendelse.mottaker.clone(),
        annen_mottaker,
        kontonummer: if annen_mottaker { None } else { hendelse.kontonummer.clone() },
        utbetalingsmetode: hendelse.utbetalingsmetode.clone(),
        vilkar: Vec::new(),
        dokumentasjonkrav: Vec::new(),
        dato_hendelse,
    };

    tracing::info!(
        referanse = %utbetaling.referanse,
        status = ?utbetaling.status,
        "Hendelse: utbetaling"
    );
    match model.utbetalinger.iter_mut().find(|u| u.referanse == utbetaling.referanse) {
        Some(existing) => *existing = utbetaling,
        None => model.utbetalinger.push(utbetaling),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use innsyn_sdk::JsonUtbetalingStatus;

    use super::*;
    use crate::domain::model::{Sak, SaksStatus};

    fn hendelse(saksreferanse: Option<&str>, status: Option<JsonUtbetalingStatus>) -> JsonUtbetaling {
        JsonUtbetaling {
            hendelsestidspunkt: "2018-10-12T13:37:00.134Z".to_owned(),
            utbetalingsreferanse: "Betaling 1".to_owned(),
            saksreferanse: saksreferanse.map(ToOwned::to_owned),
            status,
            belop: Some(1234.5),
            beskrivelse: Some("Nodhjelp".to_owned()),
            forfallsdato: Some("2018-10-20".to_owned()),
            utbetalingsdato: None,
            stoppetdato: None,
            fom: None,
            tom: None,
            annen_mottaker: Some(false),
            mottaker: Some("Kari".to_owned()),
            kontonummer: Some("12345678901".to_owned()),
            utbetalingsmetode: None,
        }
    }

    fn model_med_sak(referanse: &str) -> InternalDigisosSoker {
        InternalDigisosSoker {
            saker: vec![Sak::new(referanse, Some(SaksStatus::UnderBehandling), None)],
            ..InternalDigisosSoker::default()
        }
    }

    #[test]
    fn attaches_to_named_sak() {
        let mut model = model_med_sak("SAK1");
        apply(&mut model, &hendelse(Some("SAK1"), Some(JsonUtbetalingStatus::Utbetalt))).unwrap();

        let utbetaling = &model.utbetalinger[0];
        assert_eq!(utbetaling.saksreferanse.as_deref(), Some("SAK1"));
        assert_eq!(utbetaling.status, UtbetalingsStatus::Utbetalt);
        assert_eq!(utbetaling.belop, Decimal::new(12_345, 1));
        assert_eq!(utbetaling.forfallsdato, NaiveDate::from_ymd_opt(2018, 10, 20));
        assert_eq!(utbetaling.kontonummer.as_deref(), Some("12345678901"));
        assert_eq!(model.utbetalinger_for_sak("SAK1").count(), 1);
    }

    #[test]
    fn unknown_sak_falls_back_to_default_or_none() {
        let mut model = InternalDigisosSoker::default();
        apply(&mut model, &hendelse(Some("UKJENT"), None)).unwrap();
        assert_eq!(model.utbetalinger[0].saksreferanse, None);
        assert_eq!(model.utbetalinger[0].status, UtbetalingsStatus::PlanlagtUtbetaling);

        let mut model = model_med_sak(DEFAULT_SAK_REFERANSE);
        apply(&mut model, &hendelse(Some("UKJENT"), None)).unwrap();
        assert_eq!(model.utbetalinger[0].saksreferanse.as_deref(), Some(DEFAULT_SAK_REFERANSE));
    }

    #[test]
    fn same_referanse_replaces_and_can_move_between_saker() {
        let mut model = InternalDigisosSoker {
            saker: vec![
                Sak::new("SAK1", Some(SaksStatus::UnderBehandling), None),
                Sak::new("SAK2", Some(SaksStatus::UnderBehandling), None),
            ],
            ..InternalDigisosSoker::default()
        };
        apply(&mut model, &hendelse(Some("SAK1"), None)).unwrap();
        apply(&mut model, &hendelse(Some("SAK2"), Some(JsonUtbetalingStatus::Utbetalt))).unwrap();

        assert_eq!(model.utbetalinger.len(), 1);
        assert_eq!(model.utbetalinger_for_sak("SAK1").count(), 0);
        assert_eq!(model.utbetalinger_for_sak("SAK2").count(), 1);
    }

    #[test]
    fn annen_mottaker_hides_kontonummer() {
        let mut model = InternalDigisosSoker::default();
        let mut h = hendelse(None, None);
        h.annen_mottaker = None;
        h.belop = None;
        apply(&mut model, &h).unwrap();

        assert!(model.utbetalinger[0].annen_mottaker);
        assert_eq!(model.utbetalinger[0].kontonummer, None);
        assert_eq!(model.utbetalinger[0].belop, Decimal::ZERO);
    }
}
