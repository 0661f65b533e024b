use innsyn_sdk::{JsonSoknadsStatus, JsonSoknadsStatusStatus};

use super::strip_enhetsnavn_for_kommune;
use crate::domain::error::DomainError;
use crate::domain::model::{Hendelse, HendelseTekstType, InternalDigisosSoker};
use crate::domain::util::to_local_date_time;

pub(super) fn apply(model: &mut InternalDigisosSoker, hendelse: &JsonSoknadsStatus) -> Result<(), DomainError> {
    let tidspunkt = to_local_date_time(&hendelse.hendelsestidspunkt)?;
    model.status = hendelse.status.into();

    let linje = match hendelse.status {
        JsonSoknadsStatusStatus::Mottatt => {
            let kontor = model
                .soknadsmottaker
                .as_ref()
                .map(|m| strip_enhetsnavn_for_kommune(&m.nav_enhetsnavn));
            Hendelse::new(HendelseTekstType::SoknadMottattHosKommune, tidspunkt).with_tekst_argument(kontor)
        }
        JsonSoknadsStatusStatus::UnderBehandling => Hendelse::new(HendelseTekstType::SoknadUnderBehandling, tidspunkt),
        JsonSoknadsStatusStatus::Ferdigbehandlet => Hendelse::new(HendelseTekstType::SoknadFerdigbehandlet, tidspunkt),
        JsonSoknadsStatusStatus::BehandlesIkke => Hendelse::new(HendelseTekstType::SoknadBehandlesIkke, tidspunkt),
    };

    tracing::info!(
        tidspunkt = %hendelse.hendelsestidspunkt,
        status = ?hendelse.status,
        "Hendelse: s\u{f8}knadsstatus"
    );
    model.historikk.push(linje);
    Ok(())
}
