pub mod admin;
pub mod attendance;
pub mod batch_delete;
pub mod course;
pub mod enrollment;
pub mod import;
pub mod maintenance;
pub mod pending_feed;
pub mod schedule;
pub mod season;

pub use admin::AdminService;
pub use attendance::AttendanceTracker;
pub use batch_delete::{BatchDeleter, DeletionSummary};
pub use course::CourseService;
pub use enrollment::EnrollmentWorkflow;
pub use import::ImportService;
pub use maintenance::MaintenanceService;
pub use pending_feed::{PendingFeed, PendingSubscription};
pub use season::SeasonLifecycleManager;
