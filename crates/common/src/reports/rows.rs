//! Typed joined-view rows
//!
//! Each report shape materializes into an explicit struct with named fields
//! instead of a blind union of the joined tables, so a column shared by two
//! tables can never silently clobber another (joined-table columns that
//! would collide are aliased in the select, e.g. the note date).
//!
//! `*Row` structs mirror the select column list; `*Record` structs are the
//! wire form, with the stored tag string decoded (and the CDL flag surfaced
//! as a tag) for presentation.

use sea_orm::prelude::{Date, DateTime};
use sea_orm::FromQueryResult;
use serde::Serialize;

use crate::tags;

/// Flattened row for the order-shaped reports
/// (general, overdue Rush-Local, Shanghai)
#[derive(Debug, Clone, Default, FromQueryResult)]
pub struct OrderReportRow {
    // nyc_orders
    pub id: i32,
    pub bsn: String,
    pub title: Option<String>,
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
    pub library_note: Option<String>,

    // extra_info (outer join: absent row degrades to nulls)
    pub tags: Option<String>,
    pub checked: Option<bool>,
    pub attention: Option<bool>,
    pub check_anyway: Option<bool>,
    pub cdl_flag: Option<bool>,
    pub override_reminder_time: Option<Date>,

    // notes (outer join)
    pub tracking_note: Option<String>,
    pub taken_by: Option<String>,
    pub note_date: Option<DateTime>,
}

/// Flattened row for the CDL-shaped reports (CDL, overdue CDL)
#[derive(Debug, Clone, Default, FromQueryResult)]
pub struct CdlReportRow {
    // nyc_orders
    pub id: i32,
    pub bsn: String,
    pub title: Option<String>,
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
    pub library_note: Option<String>,

    // extra_info
    pub tags: Option<String>,
    pub checked: Option<bool>,
    pub attention: Option<bool>,
    pub check_anyway: Option<bool>,
    pub cdl_flag: Option<bool>,
    pub override_reminder_time: Option<Date>,

    // notes
    pub tracking_note: Option<String>,
    pub taken_by: Option<String>,
    pub note_date: Option<DateTime>,

    // cdl_info
    pub cdl_item_status: Option<String>,
    pub order_request_date: Option<Date>,
    pub order_purchased_date: Option<Date>,
    pub due_date: Option<Date>,
    pub physical_copy_status: Option<String>,
    pub scanning_vendor_payment_date: Option<Date>,
    pub pdf_delivery_date: Option<Date>,
    pub back_to_karms_date: Option<String>,
    pub bobcat_permanent_link: Option<String>,
    pub circ_pdf_url: Option<String>,
    pub vendor_file_url: Option<String>,
    pub file_password: Option<String>,
    pub author: Option<String>,
    pub pages: Option<String>,
}

/// Wire form of an order-shaped report row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: i32,
    pub bsn: String,
    pub title: Option<String>,
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
    pub library_note: Option<String>,

    /// Decoded tag list, CDL flag surfaced per the presentation rule
    pub tags: Vec<String>,
    pub checked: Option<bool>,
    pub attention: Option<bool>,
    pub check_anyway: Option<bool>,
    pub cdl_flag: Option<bool>,
    pub override_reminder_time: Option<Date>,

    pub tracking_note: Option<String>,
    pub taken_by: Option<String>,
    pub note_date: Option<DateTime>,
}

impl From<OrderReportRow> for OrderRecord {
    fn from(row: OrderReportRow) -> Self {
        let tags = tags::surface(row.tags.as_deref(), row.cdl_flag.unwrap_or(false));
        Self {
            id: row.id,
            bsn: row.bsn,
            title: row.title,
            arrival_text: row.arrival_text,
            arrival_date: row.arrival_date,
            arrival_operator: row.arrival_operator,
            arrival_status: row.arrival_status,
            items_created: row.items_created,
            barcode: row.barcode,
            ips_code: row.ips_code,
            ips: row.ips,
            ips_date: row.ips_date,
            ips_update_date: row.ips_update_date,
            ips_code_operator: row.ips_code_operator,
            item_status: row.item_status,
            material: row.material,
            collection: row.collection,
            update_date: row.update_date,
            created_date: row.created_date,
            sublibrary: row.sublibrary,
            order_status: row.order_status,
            invoice_status: row.invoice_status,
            material_type: row.material_type,
            order_number: row.order_number,
            order_type: row.order_type,
            total_price: row.total_price,
            order_unit: row.order_unit,
            order_status_update_date: row.order_status_update_date,
            vendor_code: row.vendor_code,
            library_note: row.library_note,
            tags,
            checked: row.checked,
            attention: row.attention,
            check_anyway: row.check_anyway,
            cdl_flag: row.cdl_flag,
            override_reminder_time: row.override_reminder_time,
            tracking_note: row.tracking_note,
            taken_by: row.taken_by,
            note_date: row.note_date,
        }
    }
}

/// Wire form of a CDL-shaped report row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CdlOrderRecord {
    #[serde(flatten)]
    pub order: OrderRecord,

    pub cdl_item_status: Option<String>,
    pub order_request_date: Option<Date>,
    pub order_purchased_date: Option<Date>,
    pub due_date: Option<Date>,
    pub physical_copy_status: Option<String>,
    pub scanning_vendor_payment_date: Option<Date>,
    pub pdf_delivery_date: Option<Date>,
    pub back_to_karms_date: Option<String>,
    pub bobcat_permanent_link: Option<String>,
    pub circ_pdf_url: Option<String>,
    pub vendor_file_url: Option<String>,
    pub file_password: Option<String>,
    pub author: Option<String>,
    pub pages: Option<String>,
}

impl From<CdlReportRow> for CdlOrderRecord {
    fn from(row: CdlReportRow) -> Self {
        let order = OrderRecord::from(OrderReportRow {
            id: row.id,
            bsn: row.bsn,
            title: row.title,
            arrival_text: row.arrival_text,
            arrival_date: row.arrival_date,
            arrival_operator: row.arrival_operator,
            arrival_status: row.arrival_status,
            items_created: row.items_created,
            barcode: row.barcode,
            ips_code: row.ips_code,
            ips: row.ips,
            ips_date: row.ips_date,
            ips_update_date: row.ips_update_date,
            ips_code_operator: row.ips_code_operator,
            item_status: row.item_status,
            material: row.material,
            collection: row.collection,
            update_date: row.update_date,
            created_date: row.created_date,
            sublibrary: row.sublibrary,
            order_status: row.order_status,
            invoice_status: row.invoice_status,
            material_type: row.material_type,
            order_number: row.order_number,
            order_type: row.order_type,
            total_price: row.total_price,
            order_unit: row.order_unit,
            order_status_update_date: row.order_status_update_date,
            vendor_code: row.vendor_code,
            library_note: row.library_note,
            tags: row.tags,
            checked: row.checked,
            attention: row.attention,
            check_anyway: row.check_anyway,
            cdl_flag: row.cdl_flag,
            override_reminder_time: row.override_reminder_time,
            tracking_note: row.tracking_note,
            taken_by: row.taken_by,
            note_date: row.note_date,
        });
        Self {
            order,
            cdl_item_status: row.cdl_item_status,
            order_request_date: row.order_request_date,
            order_purchased_date: row.order_purchased_date,
            due_date: row.due_date,
            physical_copy_status: row.physical_copy_status,
            scanning_vendor_payment_date: row.scanning_vendor_payment_date,
            pdf_delivery_date: row.pdf_delivery_date,
            back_to_karms_date: row.back_to_karms_date,
            bobcat_permanent_link: row.bobcat_permanent_link,
            circ_pdf_url: row.circ_pdf_url,
            vendor_file_url: row.vendor_file_url,
            file_password: row.file_password,
            author: row.author,
            pages: row.pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_decodes_tags() {
        let row = OrderReportRow {
            id: 7,
            tags: Some("[Rush][Local]".into()),
            cdl_flag: Some(false),
            ..Default::default()
        };
        let record = OrderRecord::from(row);
        assert_eq!(record.tags, vec!["Rush", "Local"]);
    }

    #[test]
    fn test_record_surfaces_cdl_flag_as_tag() {
        let row = OrderReportRow {
            tags: Some("[Rush]".into()),
            cdl_flag: Some(true),
            ..Default::default()
        };
        assert_eq!(OrderRecord::from(row).tags, vec!["Rush", "CDL"]);
    }

    #[test]
    fn test_record_tolerates_missing_extra_info() {
        // outer join produced no extra_info row at all
        let row = OrderReportRow::default();
        let record = OrderRecord::from(row);
        assert!(record.tags.is_empty());
        assert_eq!(record.checked, None);
    }

    #[test]
    fn test_record_tolerates_malformed_tags() {
        let row = OrderReportRow {
            tags: Some("Rush,Local".into()),
            cdl_flag: Some(true),
            ..Default::default()
        };
        // malformed stored string degrades to the enrichment only
        assert_eq!(OrderRecord::from(row).tags, vec!["CDL"]);
    }

    #[test]
    fn test_cdl_record_flattens_order_fields() {
        let row = CdlReportRow {
            id: 3,
            tags: Some("[CDL]".into()),
            cdl_flag: Some(true),
            author: Some("someone".into()),
            ..Default::default()
        };
        let record = CdlOrderRecord::from(row);
        assert_eq!(record.order.id, 3);
        assert_eq!(record.order.tags, vec!["CDL"]);
        assert_eq!(record.author.as_deref(), Some("someone"));

        // serde flatten keeps the wire shape flat
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["author"], "someone");
    }
}
