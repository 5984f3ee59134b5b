//! Users table.
//!
//! Passwords are stored as given, matching the system this service fronts.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub username: String,
    pub password: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::fingerprints::Entity")]
    Fingerprints,
}

impl Related<super::fingerprints::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Fingerprints.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
