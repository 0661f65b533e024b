//! `SeaORM` repository for klage drafts.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use super::entity::{self, Column, Entity};
use super::mapper::to_active_model;
use crate::domain::model::KlageUtkast;
use crate::domain::ports::KlageUtkastRepository;

pub struct SeaOrmKlageUtkastRepository {
    db: DatabaseConnection,
}

impl SeaOrmKlageUtkastRepository {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_domain(model: entity::Model) -> anyhow::Result<KlageUtkast> {
    let id = model.id;
    KlageUtkast::try_from(model).map_err(|e| anyhow::anyhow!("klage_utkast {id} har ugyldige vedtak_refs: {e}"))
}

#[async_trait]
impl KlageUtkastRepository for SeaOrmKlageUtkastRepository {
    async fn insert(&self, utkast: &KlageUtkast) -> anyhow::Result<()> {
        Entity::insert(to_active_model(utkast)?).exec(&self.db).await?;
        Ok(())
    }

    async fn update(&self, utkast: &KlageUtkast) -> anyhow::Result<bool> {
        let result = Entity::update_many()
            .set(to_active_model(utkast)?)
            .filter(Column::Id.eq(utkast.id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<KlageUtkast>> {
        Entity::find_by_id(id).one(&self.db).await?.map(to_domain).transpose()
    }

    async fn list_for_sak(&self, fiks_digisos_id: &str) -> anyhow::Result<Vec<KlageUtkast>> {
        Entity::find()
            .filter(Column::FiksDigisosId.eq(fiks_digisos_id))
            .order_by_asc(Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }
}
