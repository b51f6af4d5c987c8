// SPDX-License-Identifier: Apache-2.0, MIT
pub mod ddl;
pub mod error;
pub mod pg;
pub mod sink;
pub mod traits;

pub use error::StorageError;
pub use pg::PgEconomyRepository;
pub use sink::{DedupingSink, NotificationSink, TracingNotificationSink};
pub use traits::EconomyRepository;
