//! SeaORM entity models
//!
//! Database entities for the Shelfwise order store

pub mod cdl_order;
pub mod extra_info;
pub mod order;
pub mod tracking_note;
pub mod vendor;

pub use order::{
    Entity as OrderEntity,
    Model as Order,
    ActiveModel as OrderActiveModel,
    Column as OrderColumn,
};

pub use extra_info::{
    Entity as ExtraInfoEntity,
    Model as ExtraInfo,
    ActiveModel as ExtraInfoActiveModel,
    Column as ExtraInfoColumn,
};

pub use tracking_note::{
    Entity as TrackingNoteEntity,
    Model as TrackingNote,
    ActiveModel as TrackingNoteActiveModel,
    Column as TrackingNoteColumn,
};

pub use cdl_order::{
    Entity as CdlOrderEntity,
    Model as CdlOrder,
    ActiveModel as CdlOrderActiveModel,
    Column as CdlOrderColumn,
};

pub use vendor::{
    Entity as VendorEntity,
    Model as Vendor,
    ActiveModel as VendorActiveModel,
    Column as VendorColumn,
};
