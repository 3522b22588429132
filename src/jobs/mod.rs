//! Background jobs.

mod notification_job;

pub use notification_job::{
    notification_job_handler, LogNotifier, NotificationJob, Notifier, QueueNotifier,
};

#[cfg(any(test, feature = "test-utils"))]
pub use notification_job::MockNotifier;
