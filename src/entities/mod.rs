//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod gap_item;
pub mod gqr_entry;
pub mod item_master;
pub mod pre_gr_entry;
pub mod purchase_order;
pub mod session;
pub mod sieve_size;
pub mod supplier;
pub mod system_state;
pub mod unit;
pub mod user_profile;

// Re-export specific types to avoid conflicts
pub use gap_item::{Column as GapItemColumn, Entity as GapItem, Model as GapItemModel};
pub use gqr_entry::{Column as GqrEntryColumn, Entity as GqrEntry, Model as GqrEntryModel};
pub use item_master::{Column as ItemMasterColumn, Entity as ItemMaster, Model as ItemMasterModel};
pub use pre_gr_entry::{Column as PreGrEntryColumn, Entity as PreGrEntry, Model as PreGrEntryModel};
pub use purchase_order::{
    Column as PurchaseOrderColumn, Entity as PurchaseOrder, Model as PurchaseOrderModel,
};
pub use session::{Column as SessionColumn, Entity as Session, Model as SessionModel};
pub use sieve_size::{Column as SieveSizeColumn, Entity as SieveSize, Model as SieveSizeModel};
pub use supplier::{Column as SupplierColumn, Entity as Supplier, Model as SupplierModel};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};
pub use unit::{Column as UnitColumn, Entity as Unit, Model as UnitModel};
pub use user_profile::{
    Column as UserProfileColumn, Entity as UserProfile, Model as UserProfileModel,
};
