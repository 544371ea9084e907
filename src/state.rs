use std::sync::Arc;

use sqlx::SqlitePool;

use crate::identity::AccountClient;
use crate::services::{
    AdminService, AttendanceTracker, CourseService, EnrollmentWorkflow, ImportService,
    MaintenanceService, PendingFeed, SeasonLifecycleManager,
};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub feed: PendingFeed,
    pub accounts: Arc<dyn AccountClient>,
    pub batch_group_size: usize,
}

impl AppState {
    pub fn new(db: SqlitePool, accounts: Arc<dyn AccountClient>, batch_group_size: usize) -> Self {
        Self {
            db,
            feed: PendingFeed::new(),
            accounts,
            batch_group_size,
        }
    }

    pub fn seasons(&self) -> SeasonLifecycleManager {
        SeasonLifecycleManager::new(self.db.clone(), self.feed.clone(), self.batch_group_size)
    }

    pub fn courses(&self) -> CourseService {
        CourseService::new(self.db.clone())
    }

    pub fn imports(&self) -> ImportService {
        ImportService::new(self.db.clone())
    }

    pub fn enrollments(&self) -> EnrollmentWorkflow {
        EnrollmentWorkflow::new(self.db.clone(), self.feed.clone())
    }

    pub fn attendance(&self) -> AttendanceTracker {
        AttendanceTracker::new(self.db.clone())
    }

    pub fn admins(&self) -> AdminService {
        AdminService::new(self.db.clone(), self.accounts.clone())
    }

    pub fn maintenance(&self) -> MaintenanceService {
        MaintenanceService::new(self.db.clone(), self.feed.clone(), self.batch_group_size)
    }
}
