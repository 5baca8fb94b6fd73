//! ExtraInfo entity
//!
//! System-managed metadata absent from the vendor feed. Exactly one row per
//! order (shared primary key); reports use outer joins so a missing row
//! degrades to nulls instead of dropping the order.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "extra_info")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    pub order_number: Option<String>,

    /// Bracketed tag tokens, see `crate::tags`
    #[sea_orm(column_type = "Text", nullable)]
    pub tags: Option<String>,

    pub reminder_receiver: Option<String>,

    pub cdl_flag: bool,
    pub checked: bool,
    pub check_anyway: bool,
    pub attention: bool,

    /// Suppresses the SLA notification window until this date passes
    pub override_reminder_time: Option<Date>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::Id",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
