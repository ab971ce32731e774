use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_groups_table::Groups;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Songs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Songs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Songs::GroupId).integer().not_null())
                    .col(ColumnDef::new(Songs::Title).string_len(500).not_null())
                    .col(ColumnDef::new(Songs::ReleaseDate).date().not_null())
                    .col(ColumnDef::new(Songs::Text).text().not_null().default(""))
                    .col(ColumnDef::new(Songs::Link).string_len(2048).not_null().default(""))
                    .col(
                        ColumnDef::new(Songs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_songs_group_id")
                            .from(Songs::Table, Songs::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A title is unique within its group
        manager
            .create_index(
                Index::create()
                    .name("idx_songs_group_id_title")
                    .table(Songs::Table)
                    .col(Songs::GroupId)
                    .col(Songs::Title)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_songs_release_date")
                    .table(Songs::Table)
                    .col(Songs::ReleaseDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_songs_link")
                    .table(Songs::Table)
                    .col(Songs::Link)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Songs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Songs {
    Table,
    Id,
    GroupId,
    Title,
    ReleaseDate,
    Text,
    Link,
    CreatedAt,
}
