//! Initial schema migration.
//!
//! Creates the two tables the access-control service mirrors daemon state
//! into:
//!
//! - `users`: account records (the daemon identifies prints by username)
//! - `fingerprints`: best-effort mirror of enrolled prints, one row per
//!   (user, finger)

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Username,
    Password,
    CreatedAt,
}

#[derive(Iden)]
enum Fingerprints {
    Table,
    Id,
    UserId,
    Finger,
    Label,
    TemplateRef,
    EnrolledAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Username).string().not_null())
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-users-username-unique")
                    .table(Users::Table)
                    .col(Users::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Fingerprints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Fingerprints::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Fingerprints::UserId).integer().not_null())
                    .col(ColumnDef::new(Fingerprints::Finger).string().not_null())
                    .col(ColumnDef::new(Fingerprints::Label).string())
                    .col(ColumnDef::new(Fingerprints::TemplateRef).string())
                    .col(
                        ColumnDef::new(Fingerprints::EnrolledAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-fingerprints-user_id")
                            .from(Fingerprints::Table, Fingerprints::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One mirror row per (user, finger); re-enrolling replaces it.
        manager
            .create_index(
                Index::create()
                    .name("idx-fingerprints-user_id-finger-unique")
                    .table(Fingerprints::Table)
                    .col(Fingerprints::UserId)
                    .col(Fingerprints::Finger)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Fingerprints::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
