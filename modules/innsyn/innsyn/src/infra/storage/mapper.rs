//! Entity to domain model mappers.

use sea_orm::ActiveValue::Set;

use super::entity;
use crate::domain::model::KlageUtkast;

impl TryFrom<entity::Model> for KlageUtkast {
    type Error = serde_json::Error;

    fn try_from(model: entity::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            fiks_digisos_id: model.fiks_digisos_id,
            klage_tekst: model.klage_tekst,
            vedtak_refs: serde_json::from_str(&model.vedtak_refs)?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// # Errors
/// Returns error if the vedtak refs cannot be serialized.
pub fn to_active_model(utkast: &KlageUtkast) -> Result<entity::ActiveModel, serde_json::Error> {
    Ok(entity::ActiveModel {
        id: Set(utkast.id),
        fiks_digisos_id: Set(utkast.fiks_digisos_id.clone()),
        klage_tekst: Set(utkast.klage_tekst.clone()),
        vedtak_refs: Set(serde_json::to_string(&utkast.vedtak_refs)?),
        created_at: Set(utkast.created_at),
        updated_at: Set(utkast.updated_at),
    })
}
