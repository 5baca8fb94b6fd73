//! Order entity
//!
//! One row per bibliographic acquisition order, fed by the vendor report
//! ingestion. A barcode containing a hyphen is a placeholder that has not
//! been finalized yet.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "nyc_orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub bsn: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub title: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub arrival_text: Option<String>,

    pub arrival_date: Option<Date>,
    pub arrival_operator: Option<String>,
    pub arrival_status: Option<String>,
    pub items_created: Option<String>,

    pub barcode: Option<String>,

    pub ips_code: Option<String>,
    pub ips: Option<String>,
    pub ips_date: Option<Date>,
    pub ips_update_date: Option<Date>,
    pub ips_code_operator: Option<String>,

    pub item_status: Option<String>,
    pub material: Option<String>,
    pub collection: Option<String>,

    pub update_date: Option<Date>,
    pub created_date: Option<Date>,

    pub sublibrary: Option<String>,
    pub order_status: Option<String>,
    pub invoice_status: Option<String>,
    pub material_type: Option<String>,
    pub order_number: Option<String>,
    pub order_type: Option<String>,
    pub total_price: Option<f64>,
    pub order_unit: Option<String>,
    pub order_status_update_date: Option<Date>,

    pub vendor_code: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub library_note: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::extra_info::Entity")]
    ExtraInfo,

    #[sea_orm(has_many = "super::tracking_note::Entity")]
    TrackingNote,

    #[sea_orm(has_one = "super::cdl_order::Entity")]
    CdlOrder,

    #[sea_orm(
        belongs_to = "super::vendor::Entity",
        from = "Column::VendorCode",
        to = "super::vendor::Column::VendorCode"
    )]
    Vendor,
}

impl Related<super::extra_info::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExtraInfo.def()
    }
}

impl Related<super::tracking_note::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrackingNote.def()
    }
}

impl Related<super::cdl_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CdlOrder.def()
    }
}

impl Related<super::vendor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vendor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// A barcode with the placeholder hyphen has not been finalized by the
    /// cataloging pass and must not be used as a stable key
    pub fn barcode_finalized(&self) -> bool {
        match &self.barcode {
            Some(b) => !b.contains('-') && !b.is_empty(),
            None => false,
        }
    }
}
