pub mod admin;
pub mod attendance;
pub mod batch;
pub mod course;
pub mod enrollment;
pub mod season;

pub use admin::{Admin, InviteAdminRequest, InviteAdminResponse, Principal, Role};
pub use attendance::{
    AttendanceEntry, AttendanceRecord, AttendanceStats, AttendanceStatus, BulkSetAttendanceRequest,
};
pub use batch::{BatchReport, ItemError, ItemOutcome};
pub use course::{Category, Course, Day, Level, NewCourseRequest, ScheduleSlot, UpdateCourseRequest};
pub use enrollment::{
    BatchApproveRequest, Enrollment, EnrollmentStatus, RejectEnrollmentRequest,
    SubmitEnrollmentRequest,
};
pub use season::{NewSeasonRequest, Season, SeasonRow, SeasonState, SeasonStats, SetActiveRequest};
