// smartcocoon-core: Polling coordinator and host entities on top of smartcocoon-api.

pub mod coordinator;
pub mod entity;
pub mod error;
pub mod registry;

// ── Primary re-exports ──────────────────────────────────────────────
pub use coordinator::{Coordinator, CoordinatorConfig, Snapshot};
pub use entity::{
    DeviceInfo, Entity, EntityCategory, EntityDescription, Platform, Selection, register,
};
pub use error::CoreError;
pub use registry::{DeviceEntry, DeviceIdentifier, orphaned_devices};
