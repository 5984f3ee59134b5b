//! Fingerprints table.
//!
//! Rows mirror what the daemon holds for a user; they carry no biometric
//! data, only the finger name, an optional label and an opaque template
//! reference. The daemon is the source of truth and the mirror may drift.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "fingerprints")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub finger: String,
    pub label: Option<String>,
    pub template_ref: Option<String>,
    pub enrolled_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Opaque reference recorded for daemon-managed templates.
pub fn template_ref(finger: crate::Finger) -> String {
    format!("fprintd://{finger}")
}
