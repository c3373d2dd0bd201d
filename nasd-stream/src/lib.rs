pub mod channel;
pub mod hub;
pub mod queue;
pub mod subscription;

pub use channel::{ChannelPolicy, ChannelRegistry, SnapshotFn, SnapshotFuture};
pub use hub::StreamHub;
pub use queue::ConnectionQueue;
pub use subscription::{fingerprint, SubscriptionState};
