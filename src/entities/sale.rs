use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// One billed transaction for a caterer.
///
/// A sale is immutable once created except for appended payments and explicit
/// status overrides. `status` is nullable: an absent value means the
/// effective status is derived from amounts by the status resolver.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(
        min = 1,
        max = 50,
        message = "Sale number must be between 1 and 50 characters"
    ))]
    pub sale_number: String,

    pub caterer_id: Uuid,
    pub sale_date: DateTime<Utc>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub grand_total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub charges: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub discounts: Decimal,
    pub status: Option<String>,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    // Caterer deletion must never cascade into sales history.
    #[sea_orm(
        belongs_to = "super::caterer::Entity",
        from = "Column::CatererId",
        to = "super::caterer::Column::Id",
        on_delete = "Restrict"
    )]
    Caterer,
    #[sea_orm(has_many = "super::sale_item::Entity")]
    Items,
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::caterer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Caterer.def()
    }
}

impl Related<super::sale_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
