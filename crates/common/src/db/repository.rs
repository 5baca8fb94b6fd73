//! Repository pattern for database operations
//!
//! Write operations are individually transactional: each logical unit (an
//! order patch, a CDL grant/revocation, a vendor change) commits on its own.
//! Business-rule preconditions are validated synchronously and rejected
//! with descriptive errors, never silently ignored.

use chrono::NaiveDate;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::tags::{self, Tag};

/// CDL sub-update carried inside an order patch
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CdlPatch {
    pub cdl_item_status: Option<String>,
    pub order_request_date: Option<NaiveDate>,
    pub order_purchased_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub physical_copy_status: Option<String>,
    pub scanning_vendor_payment_date: Option<NaiveDate>,
    pub pdf_delivery_date: Option<NaiveDate>,
    pub back_to_karms_date: Option<String>,
    pub bobcat_permanent_link: Option<String>,
    pub circ_pdf_url: Option<String>,
    pub vendor_file_url: Option<String>,
    pub file_password: Option<String>,
    pub author: Option<String>,
    pub pages: Option<String>,
}

/// Order patch request: every field optional, absent fields untouched
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    pub book_id: i32,
    #[serde(default)]
    pub tracking_note: Option<String>,
    #[serde(default)]
    pub taken_by: Option<String>,
    #[serde(default)]
    pub checked: Option<bool>,
    #[serde(default)]
    pub check_anyway: Option<bool>,
    #[serde(default)]
    pub attention: Option<bool>,
    #[serde(default)]
    pub override_reminder_time: Option<NaiveDate>,
    #[serde(default)]
    pub sensitive: Option<bool>,
    #[serde(default)]
    pub cdl: Option<CdlPatch>,
}

/// Distinct values surfaced for client-side filter pickers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaData {
    pub ips_code: Vec<String>,
    pub tags: Vec<String>,
    pub vendors: Vec<String>,
    pub oldest_date: Option<NaiveDate>,
    pub material: Vec<String>,
    pub material_type: Vec<String>,
    pub cdl_tags: Vec<String>,
    pub physical_copy_status: Vec<String>,
}

/// Repository for data access operations
// Holds a `DbPool`, so its `Clone` is gated the same way: unavailable under
// the `mock` feature used by this crate's unit tests (and unused there),
// present everywhere else — including the gateway's `AppState`.
#[cfg_attr(not(feature = "mock"), derive(Clone))]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Order Operations
    // ========================================================================

    /// Find order by ID
    pub async fn find_order_by_id(&self, id: i32) -> Result<Option<Order>> {
        OrderEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Apply an order patch: note upsert, review flags, sensitivity, CDL
    /// sub-update. One transaction per patch.
    pub async fn patch_order(&self, patch: OrderPatch) -> Result<()> {
        let txn = self.write_conn().begin().await?;

        let order = OrderEntity::find_by_id(patch.book_id)
            .one(&txn)
            .await?
            .ok_or(AppError::OrderNotFound { id: patch.book_id })?;

        // sensitivity marking keys off the barcode, so a placeholder
        // barcode is rejected before anything is written
        if patch.sensitive == Some(true) && !order.barcode_finalized() {
            return Err(AppError::BarcodeNotFinalized {
                barcode: order.barcode.unwrap_or_default(),
            });
        }

        let extra = ExtraInfoEntity::find_by_id(patch.book_id)
            .one(&txn)
            .await?
            .ok_or(AppError::OrderNotFound { id: patch.book_id })?;

        if patch.check_anyway == Some(true) {
            let rush_local = extra
                .tags
                .as_deref()
                .map(|t| {
                    tags::has_tag(t, Tag::Rush.as_str()) && tags::has_tag(t, Tag::Local.as_str())
                })
                .unwrap_or(false);
            if !rush_local && !extra.cdl_flag {
                return Err(AppError::PreconditionFailed {
                    message: format!(
                        "order {} is neither Rush+Local nor CDL; check-anyway has no report to surface it in",
                        patch.book_id
                    ),
                });
            }
        }

        let current_tags = extra.tags.clone();
        let mut active: ExtraInfoActiveModel = extra.into();
        if let Some(checked) = patch.checked {
            active.checked = Set(checked);
        }
        if let Some(check_anyway) = patch.check_anyway {
            active.check_anyway = Set(check_anyway);
        }
        if let Some(attention) = patch.attention {
            active.attention = Set(attention);
        }
        if let Some(date) = patch.override_reminder_time {
            active.override_reminder_time = Set(Some(date));
        }
        if patch.sensitive == Some(true) {
            active.tags = Set(Some(tags::append(current_tags.as_deref(), Tag::Sensitive)?));
        }
        active.update(&txn).await?;

        if let Some(note) = &patch.tracking_note {
            self.upsert_note_in(&txn, patch.book_id, note, patch.taken_by.as_deref())
                .await?;
        }

        if let Some(cdl) = &patch.cdl {
            self.patch_cdl_in(&txn, patch.book_id, cdl).await?;
        }

        txn.commit().await?;
        crate::metrics::record_patch("order");
        tracing::info!(book_id = patch.book_id, "order patched");
        Ok(())
    }

    /// Bulk-set the checked flag; an optional date also sets the reminder
    /// override on the same rows
    pub async fn set_checked(
        &self,
        ids: &[i32],
        checked: bool,
        date: Option<NaiveDate>,
    ) -> Result<u64> {
        let mut update = ExtraInfoEntity::update_many()
            .col_expr(ExtraInfoColumn::Checked, Expr::value(checked))
            .filter(ExtraInfoColumn::Id.is_in(ids.to_vec()));
        if let Some(date) = date {
            update = update.col_expr(ExtraInfoColumn::OverrideReminderTime, Expr::value(date));
        }
        let result = update.exec(self.write_conn()).await?;
        crate::metrics::record_patch("checked");
        Ok(result.rows_affected)
    }

    /// Bulk-set the attention flag
    pub async fn set_attention(&self, ids: &[i32], attention: bool) -> Result<u64> {
        let result = ExtraInfoEntity::update_many()
            .col_expr(ExtraInfoColumn::Attention, Expr::value(attention))
            .filter(ExtraInfoColumn::Id.is_in(ids.to_vec()))
            .exec(self.write_conn())
            .await?;
        crate::metrics::record_patch("attention");
        Ok(result.rows_affected)
    }

    // ========================================================================
    // Tracking Note Operations
    // ========================================================================

    async fn upsert_note_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        book_id: i32,
        note: &str,
        taken_by: Option<&str>,
    ) -> Result<()> {
        let now = chrono::Utc::now().naive_utc();
        let existing = TrackingNoteEntity::find()
            .filter(TrackingNoteColumn::BookId.eq(book_id))
            .one(conn)
            .await?;

        match existing {
            Some(found) => {
                let mut active: TrackingNoteActiveModel = found.into();
                active.tracking_note = Set(Some(note.to_string()));
                if let Some(author) = taken_by {
                    active.taken_by = Set(Some(author.to_string()));
                }
                active.date = Set(Some(now));
                active.update(conn).await?;
            }
            None => {
                let active = TrackingNoteActiveModel {
                    book_id: Set(book_id),
                    tracking_note: Set(Some(note.to_string())),
                    taken_by: Set(taken_by.map(str::to_string)),
                    date: Set(Some(now)),
                    ..Default::default()
                };
                active.insert(conn).await?;
            }
        }
        Ok(())
    }

    /// Delete the tracking note of an order
    pub async fn delete_note(&self, book_id: i32) -> Result<bool> {
        let result = TrackingNoteEntity::delete_many()
            .filter(TrackingNoteColumn::BookId.eq(book_id))
            .exec(self.write_conn())
            .await?;
        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // CDL Operations
    // ========================================================================

    /// Flag an order for the CDL workflow: creates the cdl_info row and sets
    /// both the `[CDL]` tag and the cdl_flag in the same transaction
    pub async fn create_cdl(&self, book_id: i32) -> Result<CdlOrder> {
        let txn = self.write_conn().begin().await?;

        let extra = ExtraInfoEntity::find_by_id(book_id)
            .one(&txn)
            .await?
            .ok_or(AppError::OrderNotFound { id: book_id })?;

        if CdlOrderEntity::find_by_id(book_id).one(&txn).await?.is_some() {
            return Err(AppError::AlreadyCdl { id: book_id });
        }

        let cdl = CdlOrderActiveModel {
            book_id: Set(book_id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let current_tags = extra.tags.clone();
        let mut active: ExtraInfoActiveModel = extra.into();
        active.cdl_flag = Set(true);
        active.tags = Set(Some(tags::append(current_tags.as_deref(), Tag::Cdl)?));
        active.update(&txn).await?;

        txn.commit().await?;
        tracing::info!(book_id, "order flagged for CDL");
        Ok(cdl)
    }

    /// Revoke CDL status: deletes the cdl_info row and clears the tag and
    /// flag
    pub async fn revoke_cdl(&self, book_id: i32) -> Result<()> {
        let txn = self.write_conn().begin().await?;

        let deleted = CdlOrderEntity::delete_by_id(book_id).exec(&txn).await?;
        if deleted.rows_affected == 0 {
            return Err(AppError::CdlOrderNotFound { id: book_id });
        }

        let extra = ExtraInfoEntity::find_by_id(book_id)
            .one(&txn)
            .await?
            .ok_or(AppError::OrderNotFound { id: book_id })?;
        let current_tags = extra.tags.clone();
        let mut active: ExtraInfoActiveModel = extra.into();
        active.cdl_flag = Set(false);
        active.tags = Set(Some(tags::remove(current_tags.as_deref(), Tag::Cdl)?));
        active.update(&txn).await?;

        txn.commit().await?;
        tracing::info!(book_id, "CDL status revoked");
        Ok(())
    }

    async fn patch_cdl_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        book_id: i32,
        patch: &CdlPatch,
    ) -> Result<()> {
        let cdl = CdlOrderEntity::find_by_id(book_id)
            .one(conn)
            .await?
            .ok_or(AppError::CdlOrderNotFound { id: book_id })?;

        let mut active: CdlOrderActiveModel = cdl.into();
        if let Some(v) = &patch.cdl_item_status {
            active.cdl_item_status = Set(Some(v.clone()));
        }
        if let Some(v) = patch.order_request_date {
            active.order_request_date = Set(Some(v));
        }
        if let Some(v) = patch.order_purchased_date {
            active.order_purchased_date = Set(Some(v));
        }
        if let Some(v) = patch.due_date {
            active.due_date = Set(Some(v));
        }
        if let Some(v) = &patch.physical_copy_status {
            active.physical_copy_status = Set(Some(v.clone()));
        }
        if let Some(v) = patch.scanning_vendor_payment_date {
            active.scanning_vendor_payment_date = Set(Some(v));
        }
        if let Some(v) = patch.pdf_delivery_date {
            active.pdf_delivery_date = Set(Some(v));
        }
        if let Some(v) = &patch.back_to_karms_date {
            active.back_to_karms_date = Set(Some(v.clone()));
        }
        if let Some(v) = &patch.bobcat_permanent_link {
            active.bobcat_permanent_link = Set(Some(v.clone()));
        }
        if let Some(v) = &patch.circ_pdf_url {
            active.circ_pdf_url = Set(Some(v.clone()));
        }
        if let Some(v) = &patch.vendor_file_url {
            active.vendor_file_url = Set(Some(v.clone()));
        }
        if let Some(v) = &patch.file_password {
            active.file_password = Set(Some(v.clone()));
        }
        if let Some(v) = &patch.author {
            active.author = Set(Some(v.clone()));
        }
        if let Some(v) = &patch.pages {
            active.pages = Set(Some(v.clone()));
        }
        active.update(conn).await?;
        Ok(())
    }

    // ========================================================================
    // Vendor Operations
    // ========================================================================

    /// List every vendor
    pub async fn list_vendors(&self) -> Result<Vec<Vendor>> {
        VendorEntity::find()
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find vendor by code
    pub async fn find_vendor(&self, code: &str) -> Result<Option<Vendor>> {
        VendorEntity::find_by_id(code)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Create a new vendor
    pub async fn add_vendor(&self, vendor: Vendor) -> Result<Vendor> {
        let active = VendorActiveModel {
            vendor_code: Set(vendor.vendor_code),
            notify_in: Set(vendor.notify_in),
            local: Set(vendor.local),
        };
        active.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Update an existing vendor
    pub async fn update_vendor(&self, vendor: Vendor) -> Result<Vendor> {
        let existing = self
            .find_vendor(&vendor.vendor_code)
            .await?
            .ok_or_else(|| AppError::VendorNotFound {
                code: vendor.vendor_code.clone(),
            })?;

        let mut active: VendorActiveModel = existing.into();
        active.notify_in = Set(vendor.notify_in);
        active.local = Set(vendor.local);
        active.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete a vendor by code
    pub async fn delete_vendor(&self, code: &str) -> Result<()> {
        let result = VendorEntity::delete_by_id(code)
            .exec(self.write_conn())
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::VendorNotFound {
                code: code.to_string(),
            });
        }
        Ok(())
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Distinct values for the client-side filter pickers
    pub async fn metadata(&self) -> Result<MetaData> {
        let conn = self.read_conn();

        let ips_code = self.distinct_order_column(OrderColumn::IpsCode).await?;
        let vendors = self.distinct_order_column(OrderColumn::VendorCode).await?;
        let material = self.distinct_order_column(OrderColumn::Material).await?;
        let material_type = self.distinct_order_column(OrderColumn::MaterialType).await?;

        let oldest_date: Option<Option<NaiveDate>> = OrderEntity::find()
            .select_only()
            .column_as(
                Expr::col((OrderEntity, OrderColumn::CreatedDate)).min(),
                "oldest",
            )
            .into_tuple()
            .one(conn)
            .await?;

        Ok(MetaData {
            ips_code,
            tags: Tag::ALL.iter().map(|t| t.as_str().to_string()).collect(),
            vendors,
            oldest_date: oldest_date.flatten(),
            material,
            material_type,
            cdl_tags: cdl_order::CDL_STATUSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            physical_copy_status: cdl_order::PHYSICAL_COPY_STATUSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        })
    }

    async fn distinct_order_column(&self, column: OrderColumn) -> Result<Vec<String>> {
        let values: Vec<Option<String>> = OrderEntity::find()
            .select_only()
            .column(column)
            .distinct()
            .into_tuple()
            .all(self.read_conn())
            .await?;
        Ok(values.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn pool_from(conn: DatabaseConnection) -> DbPool {
        DbPool {
            primary: conn,
            replica: None,
        }
    }

    fn order_row(id: i32, barcode: &str) -> Order {
        Order {
            id,
            bsn: "000123".into(),
            title: Some("A Title".into()),
            arrival_text: None,
            arrival_date: None,
            arrival_operator: None,
            arrival_status: None,
            items_created: None,
            barcode: Some(barcode.into()),
            ips_code: None,
            ips: None,
            ips_date: None,
            ips_update_date: None,
            ips_code_operator: None,
            item_status: None,
            material: None,
            collection: None,
            update_date: None,
            created_date: None,
            sublibrary: None,
            order_status: Some("NW".into()),
            invoice_status: None,
            material_type: None,
            order_number: Some("PO-1".into()),
            order_type: None,
            total_price: None,
            order_unit: None,
            order_status_update_date: None,
            vendor_code: "VND".into(),
            library_note: None,
        }
    }

    fn extra_row(id: i32, tags: &str, cdl_flag: bool) -> ExtraInfo {
        ExtraInfo {
            id,
            order_number: Some("PO-1".into()),
            tags: Some(tags.into()),
            reminder_receiver: None,
            cdl_flag,
            checked: false,
            check_anyway: false,
            attention: false,
            override_reminder_time: None,
        }
    }

    #[tokio::test]
    async fn test_sensitivity_rejects_placeholder_barcode() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![order_row(1, "31124-")]])
            .into_connection();
        let repo = Repository::new(pool_from(db));

        let err = repo
            .patch_order(OrderPatch {
                book_id: 1,
                tracking_note: None,
                taken_by: None,
                checked: None,
                check_anyway: None,
                attention: None,
                override_reminder_time: None,
                sensitive: Some(true),
                cdl: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BarcodeNotFinalized { .. }));
    }

    #[tokio::test]
    async fn test_check_anyway_requires_rush_local_or_cdl() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![order_row(1, "31124000")]])
            .append_query_results([vec![extra_row(1, "[Rush]", false)]])
            .into_connection();
        let repo = Repository::new(pool_from(db));

        let err = repo
            .patch_order(OrderPatch {
                book_id: 1,
                tracking_note: None,
                taken_by: None,
                checked: None,
                check_anyway: Some(true),
                attention: None,
                override_reminder_time: None,
                sensitive: None,
                cdl: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed { .. }));
    }

    #[tokio::test]
    async fn test_missing_order_surfaces_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<Order>::new()])
            .into_connection();
        let repo = Repository::new(pool_from(db));

        let err = repo
            .patch_order(OrderPatch {
                book_id: 99,
                tracking_note: None,
                taken_by: None,
                checked: Some(true),
                check_anyway: None,
                attention: None,
                override_reminder_time: None,
                sensitive: None,
                cdl: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::OrderNotFound { id: 99 }));
    }
}
