use std::sync::Arc;

use chrono::{Datelike, Months, NaiveDate};
use futures::future::try_join_all;
use innsyn_sdk::DigisosSak;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::auth::InnloggetBruker;
use crate::domain::error::DomainError;
use crate::domain::event::EventService;
use crate::domain::model::{Utbetaling, UtbetalingsStatus};
use crate::domain::service::fiks::FiksService;
use crate::domain::util::{group_by, now_oslo, today_oslo, unix_millis_to_local};

pub const UTBETALING_DEFAULT_TITTEL: &str = "Utbetaling";

/// How far back the nye/tidligere views look.
const NYE_OG_TIDLIGERE_MANEDER: u32 = 15;

const MANEDER: [&str; 12] = [
    "januar",
    "februar",
    "mars",
    "april",
    "mai",
    "juni",
    "juli",
    "august",
    "september",
    "oktober",
    "november",
    "desember",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UtbetalingerResponse {
    pub ar: i32,
    pub maned: String,
    #[serde(rename = "foersteIManeden")]
    pub forste_i_maneden: NaiveDate,
    pub utbetalinger: Vec<ManedUtbetaling>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NyeOgTidligereUtbetalingerResponse {
    pub ar: i32,
    pub maned: u32,
    pub utbetalinger_for_maned: Vec<ManedUtbetaling>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManedUtbetaling {
    pub referanse: String,
    pub tittel: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub belop: Decimal,
    pub utbetalingsdato: Option<NaiveDate>,
    pub forfallsdato: Option<NaiveDate>,
    pub status: UtbetalingsStatus,
    pub fiks_digisos_id: String,
    pub fom: Option<NaiveDate>,
    pub tom: Option<NaiveDate>,
    pub mottaker: Option<String>,
    pub annen_mottaker: bool,
    pub kontonummer: Option<String>,
    pub utbetalingsmetode: Option<String>,
}

impl ManedUtbetaling {
    fn from_utbetaling(utbetaling: &Utbetaling, fiks_digisos_id: &str) -> Self {
        Self {
            referanse: utbetaling.referanse.clone(),
            tittel: utbetaling
                .beskrivelse
                .clone()
                .unwrap_or_else(|| UTBETALING_DEFAULT_TITTEL.to_owned()),
            belop: utbetaling.belop,
            utbetalingsdato: utbetaling.utbetalingsdato,
            forfallsdato: utbetaling.forfallsdato,
            status: utbetaling.status,
            fiks_digisos_id: fiks_digisos_id.to_owned(),
            fom: utbetaling.fom,
            tom: utbetaling.tom,
            mottaker: utbetaling.mottaker.clone(),
            annen_mottaker: utbetaling.annen_mottaker,
            kontonummer: utbetaling.kontonummer.clone(),
            utbetalingsmetode: utbetaling.utbetalingsmetode.clone(),
        }
    }

    /// Paid out date, or due date for payments not yet paid.
    fn dato(&self) -> Option<NaiveDate> {
        self.utbetalingsdato.or(self.forfallsdato)
    }
}

pub struct UtbetalingerService {
    fiks: Arc<FiksService>,
    events: Arc<EventService>,
}

impl UtbetalingerService {
    #[must_use]
    pub fn new(fiks: Arc<FiksService>, events: Arc<EventService>) -> Self {
        Self { fiks, events }
    }

    /// Paid utbetalinger on every case changed in the last `months` months,
    /// grouped per month, newest first.
    ///
    /// # Errors
    /// Upstream failures from Fiks or malformed hendelser.
    #[tracing::instrument(skip(self, bruker))]
    pub async fn hent_utbetalinger(&self, bruker: &InnloggetBruker, months: u32) -> Result<Vec<UtbetalingerResponse>, DomainError> {
        let utbetalinger = self
            .utbetalinger_for_alle_saker(bruker, months, |u| {
                u.status == UtbetalingsStatus::Utbetalt && u.utbetalingsdato.is_some()
            })
            .await?;
        Ok(per_maned(utbetalinger))
    }

    /// Planned or stopped utbetalinger due after today, plus every planned
    /// one regardless of date.
    ///
    /// # Errors
    /// Upstream failures from Fiks or malformed hendelser.
    #[tracing::instrument(skip_all)]
    pub async fn hent_nye_utbetalinger(&self, bruker: &InnloggetBruker) -> Result<Vec<NyeOgTidligereUtbetalingerResponse>, DomainError> {
        let today = today_oslo();
        let utbetalinger = self
            .utbetalinger_for_alle_saker(bruker, NYE_OG_TIDLIGERE_MANEDER, |u| {
                matches!(u.status, UtbetalingsStatus::PlanlagtUtbetaling | UtbetalingsStatus::Stoppet)
            })
            .await?;
        let nye = utbetalinger
            .into_iter()
            .filter(|u| u.dato().is_some_and(|d| d > today) || u.status == UtbetalingsStatus::PlanlagtUtbetaling);
        Ok(nye_og_tidligere(nye, true))
    }

    /// Paid or stopped utbetalinger dated today or earlier, plus every paid
    /// one regardless of date.
    ///
    /// # Errors
    /// Upstream failures from Fiks or malformed hendelser.
    #[tracing::instrument(skip_all)]
    pub async fn hent_tidligere_utbetalinger(
        &self,
        bruker: &InnloggetBruker,
    ) -> Result<Vec<NyeOgTidligereUtbetalingerResponse>, DomainError> {
        let today = today_oslo();
        let utbetalinger = self
            .utbetalinger_for_alle_saker(bruker, NYE_OG_TIDLIGERE_MANEDER, |u| {
                matches!(u.status, UtbetalingsStatus::Utbetalt | UtbetalingsStatus::Stoppet)
            })
            .await?;
        let tidligere = utbetalinger
            .into_iter()
            .filter(|u| u.dato().is_some_and(|d| d <= today) || u.status == UtbetalingsStatus::Utbetalt);
        Ok(nye_og_tidligere(tidligere, false))
    }

    /// All dated utbetalinger on one case, per month.
    ///
    /// # Errors
    /// Upstream failures from Fiks or malformed hendelser.
    #[tracing::instrument(skip(self, bruker))]
    pub async fn hent_utbetalinger_for_sak(
        &self,
        digisos_id: &str,
        bruker: &InnloggetBruker,
    ) -> Result<Vec<UtbetalingerResponse>, DomainError> {
        let sak = self.fiks.hent_digisos_sak(digisos_id, bruker).await?;
        let utbetalinger = self
            .manedsutbetalinger(&sak, bruker, |u| u.utbetalingsdato.is_some())
            .await?;
        Ok(per_maned(utbetalinger))
    }

    async fn utbetalinger_for_alle_saker(
        &self,
        bruker: &InnloggetBruker,
        months: u32,
        filter: impl Fn(&Utbetaling) -> bool + Copy,
    ) -> Result<Vec<ManedUtbetaling>, DomainError> {
        let saker = self.fiks.hent_alle_digisos_saker(bruker).await?;
        if saker.is_empty() {
            tracing::info!("Fant ingen s\u{f8}knader for bruker");
            return Ok(Vec::new());
        }
        let nyere = saker.iter().filter(|s| is_newer_than_months(s, months));
        let per_sak = try_join_all(nyere.map(|s| self.manedsutbetalinger(s, bruker, filter))).await?;
        Ok(per_sak.into_iter().flatten().collect())
    }

    async fn manedsutbetalinger(
        &self,
        sak: &DigisosSak,
        bruker: &InnloggetBruker,
        filter: impl Fn(&Utbetaling) -> bool,
    ) -> Result<Vec<ManedUtbetaling>, DomainError> {
        let model = self.events.hent_alle_utbetalinger(sak, bruker).await?;
        Ok(model
            .utbetalinger
            .iter()
            .filter(|u| filter(u))
            .inspect(|u| log_manglende_dato(u, &sak.kommunenummer))
            .map(|u| ManedUtbetaling::from_utbetaling(u, &sak.fiks_digisos_id))
            .collect())
    }
}

fn is_newer_than_months(sak: &DigisosSak, months: u32) -> bool {
    let Some(grense) = now_oslo().checked_sub_months(Months::new(months)) else {
        return true;
    };
    unix_millis_to_local(sak.sist_endret).is_some_and(|endret| endret > grense)
}

#[must_use]
pub fn maned_navn(maned: u32) -> &'static str {
    maned
        .checked_sub(1)
        .and_then(|i| usize::try_from(i).ok())
        .and_then(|i| MANEDER.get(i))
        .copied()
        .unwrap_or_default()
}

fn sorted_desc(mut utbetalinger: Vec<ManedUtbetaling>) -> Vec<ManedUtbetaling> {
    utbetalinger.sort_by(|a, b| b.dato().cmp(&a.dato()));
    utbetalinger
}

/// Groups by the month of the payout date, newest month first.
fn per_maned(utbetalinger: Vec<ManedUtbetaling>) -> Vec<UtbetalingerResponse> {
    let datert = sorted_desc(utbetalinger)
        .into_iter()
        .filter_map(|u| u.utbetalingsdato.map(|d| (d, u)));
    group_by(datert, |(d, _)| (d.year(), d.month()))
        .into_iter()
        .filter_map(|((ar, maned), gruppe)| {
            Some(UtbetalingerResponse {
                ar,
                maned: maned_navn(maned).to_owned(),
                forste_i_maneden: NaiveDate::from_ymd_opt(ar, maned, 1)?,
                utbetalinger: gruppe.into_iter().map(|(_, u)| u).collect(),
            })
        })
        .collect()
}

/// Groups by month of [`ManedUtbetaling::dato`]; `stigende` picks the
/// order of months and of utbetalinger inside each month.
fn nye_og_tidligere(
    utbetalinger: impl Iterator<Item = ManedUtbetaling>,
    stigende: bool,
) -> Vec<NyeOgTidligereUtbetalingerResponse> {
    let mut datert: Vec<(NaiveDate, ManedUtbetaling)> = utbetalinger.filter_map(|u| u.dato().map(|d| (d, u))).collect();
    if stigende {
        datert.sort_by_key(|(d, _)| *d);
    } else {
        datert.sort_by(|(a, _), (b, _)| b.cmp(a));
    }
    group_by(datert, |(d, _)| (d.year(), d.month()))
        .into_iter()
        .map(|((ar, maned), gruppe)| NyeOgTidligereUtbetalingerResponse {
            ar,
            maned,
            utbetalinger_for_maned: gruppe.into_iter().map(|(_, u)| u).collect(),
        })
        .collect()
}

fn log_manglende_dato(utbetaling: &Utbetaling, kommunenummer: &str) {
    let mangler = match utbetaling.status {
        UtbetalingsStatus::Utbetalt => utbetaling.utbetalingsdato.is_none(),
        UtbetalingsStatus::PlanlagtUtbetaling => utbetaling.forfallsdato.is_none(),
        UtbetalingsStatus::Stoppet => utbetaling.forfallsdato.is_none() || utbetaling.utbetalingsdato.is_none(),
        UtbetalingsStatus::Annullert => false,
    };
    if mangler {
        tracing::info!(
            referanse = %utbetaling.referanse,
            status = ?utbetaling.status,
            kommunenummer,
            "Utbetaling mangler utbetalingsdato eller forfallsdato"
        );
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn maned_utbetaling(referanse: &str, utbetalingsdato: Option<NaiveDate>, forfallsdato: Option<NaiveDate>) -> ManedUtbetaling {
        ManedUtbetaling {
            referanse: referanse.to_owned(),
            tittel: UTBETALING_DEFAULT_TITTEL.to_owned(),
            belop: Decimal::new(10_000, 2),
            utbetalingsdato,
            forfallsdato,
            status: UtbetalingsStatus::Utbetalt,
            fiks_digisos_id: "123".to_owned(),
            fom: None,
            tom: None,
            mottaker: None,
            annen_mottaker: false,
            kontonummer: None,
            utbetalingsmetode: None,
        }
    }

    fn dato(ar: i32, maned: u32, dag: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(ar, maned, dag)
    }

    #[test]
    fn month_names_are_norwegian() {
        assert_eq!(maned_navn(1), "januar");
        assert_eq!(maned_navn(12), "desember");
        assert_eq!(maned_navn(0), "");
    }

    #[test]
    fn groups_per_month_newest_first() {
        let grupper = per_maned(vec![
            maned_utbetaling("a", dato(2020, 1, 15), None),
            maned_utbetaling("b", dato(2020, 2, 1), None),
            maned_utbetaling("c", dato(2020, 1, 20), None),
            maned_utbetaling("uten dato", None, dato(2020, 3, 1)),
        ]);

        assert_eq!(grupper.len(), 2);
        assert_eq!(grupper[0].maned, "februar");
        assert_eq!(grupper[1].forste_i_maneden, dato(2020, 1, 1).unwrap());
        let referanser: Vec<&str> = grupper[1].utbetalinger.iter().map(|u| u.referanse.as_str()).collect();
        assert_eq!(referanser, vec!["c", "a"]);
    }

    #[test]
    fn nye_fall_back_to_forfallsdato_and_sort_ascending() {
        let grupper = nye_og_tidligere(
            vec![
                maned_utbetaling("senere", None, dato(2031, 5, 1)),
                maned_utbetaling("snart", None, dato(2031, 4, 1)),
            ]
            .into_iter(),
            true,
        );
        assert_eq!(grupper.len(), 2);
        assert_eq!(grupper[0].maned, 4);
        assert_eq!(grupper[1].utbetalinger_for_maned[0].referanse, "senere");
    }

    #[test]
    fn belop_serializes_as_number() {
        let json = serde_json::to_value(maned_utbetaling("a", dato(2020, 1, 1), None)).unwrap();
        assert_eq!(json["belop"], serde_json::json!(100.0));
        assert_eq!(json["status"], "UTBETALT");
    }
}
