use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(KlageUtkast::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(KlageUtkast::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(KlageUtkast::FiksDigisosId).text().not_null())
                    .col(ColumnDef::new(KlageUtkast::KlageTekst).text())
                    .col(ColumnDef::new(KlageUtkast::VedtakRefs).text().not_null())
                    .col(
                        ColumnDef::new(KlageUtkast::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(KlageUtkast::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_klage_utkast_fiks_digisos_id")
                    .table(KlageUtkast::Table)
                    .col(KlageUtkast::FiksDigisosId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(KlageUtkast::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum KlageUtkast {
    Table,
    Id,
    FiksDigisosId,
    KlageTekst,
    VedtakRefs,
    CreatedAt,
    UpdatedAt,
}
