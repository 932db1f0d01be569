pub mod manager;
pub mod slice;
pub mod transport;

pub use manager::ViewportSubscriptionManager;
pub use slice::{windows_around, Slice, Window};
pub use transport::{related_data_filter, RelatedDataSink, RelatedDataTransport};
