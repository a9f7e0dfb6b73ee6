//! Resumable HTTPS transfer, retry policy, and the progress event bus
//! (§4.7, §4.10).

pub mod error;
pub mod events;
pub mod http;
pub mod retry;

pub use error::{Result, TransferError};
pub use events::{Event, EventBus, EventHandler};
pub use http::{Downloader, Uploader};
pub use retry::RetryPolicy;
