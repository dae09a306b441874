use sea_orm::entity::prelude::*;

/// Stored value of `status` for a key that has not been consumed.
pub const STATUS_UNUSED: &str = "unused";
/// Stored value of `status` for a consumed key. Terminal.
pub const STATUS_USED: &str = "used";

/// Bearer access key. `expires_at = NULL` means the key never expires.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "access_keys")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub status: String,
    pub used_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
