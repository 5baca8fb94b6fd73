//! CDLOrder entity
//!
//! Present only for orders under the Controlled Digital Lending workflow;
//! shares its primary key with the order row. Creation also sets the `[CDL]`
//! tag and `cdl_flag` on extra_info; revocation clears both.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// CDL item status vocabulary
pub const CDL_STATUSES: [&str; 6] = [
    "CDL Silent",
    "Circ PDF Available",
    "Vendor PDF Available",
    "CDL DVD",
    "Requested",
    "On Loan",
];

/// Physical copy status vocabulary
pub const PHYSICAL_COPY_STATUSES: [&str; 3] = ["Not Arrived", "On Shelf", "DVD"];

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cdl_info")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub book_id: i32,

    pub cdl_item_status: Option<String>,

    pub order_request_date: Option<Date>,
    pub order_purchased_date: Option<Date>,
    pub due_date: Option<Date>,

    pub physical_copy_status: Option<String>,

    pub scanning_vendor_payment_date: Option<Date>,
    pub pdf_delivery_date: Option<Date>,

    /// Free text in the source system, not a parseable date
    pub back_to_karms_date: Option<String>,

    pub bobcat_permanent_link: Option<String>,
    pub circ_pdf_url: Option<String>,
    pub vendor_file_url: Option<String>,
    pub file_password: Option<String>,
    pub author: Option<String>,
    pub pages: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::BookId",
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
