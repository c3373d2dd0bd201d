pub mod containers;
pub mod notifications;
pub mod storage;
pub mod system;
pub mod vms;

pub use containers::{ContainerProvider, SimContainerProvider};
pub use notifications::{NotificationStore, SharedNotificationStore};
pub use storage::{SimStorageProvider, StorageProvider};
pub use system::{SimSystemProvider, SystemProvider};
pub use vms::{SimVirtualizationProvider, VirtualizationProvider};
