use innsyn_sdk::JsonSaksStatus;

use crate::domain::error::DomainError;
use crate::domain::model::{Hendelse, HendelseTekstType, InternalDigisosSoker, Sak, SaksStatus, SoknadsStatus};
use crate::domain::util::to_local_date_time;

pub(super) fn apply(model: &mut InternalDigisosSoker, hendelse: &JsonSaksStatus) -> Result<(), DomainError> {
    let tidspunkt = to_local_date_time(&hendelse.hendelsestidspunkt)?;
    let status = hendelse.status.map(SaksStatus::from);

    if let Some(sak) = model.saker.iter_mut().find(|s| s.referanse == hendelse.referanse) {
        let forrige = sak.saks_status;
        sak.tittel.clone_from(&hendelse.tittel);
        let Some(status) = status else {
            return Ok(());
        };
        sak.saks_status = Some(status);
        if forrige != Some(status) && matches!(status, SaksStatus::IkkeInnsyn | SaksStatus::BehandlesIkke) {
            let tekst_type = if hendelse.tittel.is_some() {
                HendelseTekstType::SoknadKanIkkeViseStatusMedTittel
            } else {
                HendelseTekstType::SoknadKanIkkeViseStatusUtenTittel
            };
            model.historikk.push(
                Hendelse::new(tekst_type, tidspunkt)
                    .with_tekst_argument(hendelse.tittel.clone())
                    .with_saks_referanse(Some(hendelse.referanse.clone())),
            );
        }
        return Ok(());
    }

    if model.status == SoknadsStatus::Ferdigbehandlet {
        tracing::warn!(
            referanse = %hendelse.referanse,
            "Ny sak opprettet etter at s\u{f8}knaden er ferdigbehandlet"
        );
    }
    let status = status.unwrap_or(SaksStatus::UnderBehandling);
    model
        .saker
        .push(Sak::new(hendelse.referanse.clone(), Some(status), hendelse.tittel.clone()));

    let med_tittel = hendelse.tittel.is_some();
    let tekst_type = match status {
        SaksStatus::UnderBehandling if med_tittel => HendelseTekstType::SakUnderBehandlingMedTittel,
        SaksStatus::UnderBehandling => HendelseTekstType::SakUnderBehandlingUtenTittel,
        SaksStatus::BehandlesIkke | SaksStatus::IkkeInnsyn if med_tittel => {
            HendelseTekstType::SakKanIkkeViseStatusMedTittel
        }
        SaksStatus::BehandlesIkke | SaksStatus::IkkeInnsyn => HendelseTekstType::SakKanIkkeViseStatusUtenTittel,
        SaksStatus::Ferdigbehandlet | SaksStatus::Feilregistrert => return Ok(()),
    };
    tracing::info!(referanse = %hendelse.referanse, status = ?status, "Hendelse: ny sak");
    model.historikk.push(
        Hendelse::new(tekst_type, tidspunkt)
            .with_tekst_argument(hendelse.tittel.clone())
            .with_saks_referanse(Some(hendelse.referanse.clone())),
    );
    Ok(())
}
