//! Transaction-event consumers.
//!
//! Three consumer groups hang off the topic exchange: the shipping
//! label generator and the inventory updater each bind their own queue
//! to `transaction.successful`, and the notification dispatcher binds
//! to `transaction.unsuccessful`. Each implements the broker's
//! [`MessageHandler`](broker::MessageHandler) seam: validate, apply
//! side effects, and return a verdict; rejected and failed messages are
//! parked by the consumer loop rather than redelivered.

pub mod error;
pub mod inventory;
pub mod label;
pub mod notification;
pub mod shipping;
pub mod store;

pub use error::LabelError;
pub use inventory::InventoryConsumer;
pub use label::{
    Address, HttpLabelProvider, InMemoryLabelProvider, LabelProvider, LabelPurchase, Parcel,
    PurchaseStatus, Rate, ShipmentRequest,
};
pub use notification::NotificationConsumer;
pub use shipping::ShippingConsumer;
pub use store::{InMemoryShippingStore, ShippingRecord, ShippingStatus, ShippingStore};
