use crate::api::attendance::PunchRequest;
use crate::api::payroll::{GenerateBulkPayroll, GeneratePayroll};
use crate::api::settings::EffectiveAttendancePolicy;
use crate::api::shifts::{AssignShift, CreateShift};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, DailyAttendance};
use crate::model::payroll::{AttendanceSummary, PayrollFigures, PayrollRecord};
use crate::model::policy::{
    AttendancePolicy, AttendancePolicyVersion, PayrollPolicy, PayrollPolicyVersion,
};
use crate::model::punch::{EventKind, PunchEvent, PunchSource};
use crate::model::shift::{ShiftAssignment, ShiftDefinition};
use crate::service::attendance::PunchReceipt;
use crate::service::payroll::{BulkPayrollEntry, PayrollBreakdown, PayrollOutcome};
use crate::store::WriteOutcome;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Attendance & Payroll API",
        version = "1.0.0",
        description = r#"
## Attendance & Payroll

Punch-driven attendance with shift-aware daily summaries and monthly payroll.

### Attendance
- Check-in, check-out and break punches are stored as immutable events
- Every punch recomputes the employee's day: hours, breaks, lateness, early exit, overtime and status
- Night shifts are attributed to the date they start on

### Payroll
- Monthly generation from the attendance summary, salary structure and the active payroll policy
- Generating payroll locks the month's attendance; locked days are never rewritten

### Settings
- Attendance policies are versioned, each day uses the version in force on it
- One payroll policy is active at a time

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::break_start,
        crate::api::attendance::break_end,
        crate::api::attendance::recalculate,
        crate::api::attendance::lock_day,
        crate::api::attendance::unlock_day,

        crate::api::payroll::generate_payroll,
        crate::api::payroll::generate_bulk,

        crate::api::settings::get_payroll_policy,
        crate::api::settings::update_payroll_policy,
        crate::api::settings::get_attendance_policy,
        crate::api::settings::create_attendance_policy,

        crate::api::shifts::create_shift,
        crate::api::shifts::deactivate_shift,
        crate::api::shifts::assign_shift
    ),
    components(
        schemas(
            PunchRequest,
            PunchReceipt,
            PunchEvent,
            EventKind,
            PunchSource,
            WriteOutcome,
            DailyAttendance,
            AttendanceRecord,
            AttendanceStatus,
            GeneratePayroll,
            GenerateBulkPayroll,
            PayrollOutcome,
            PayrollRecord,
            PayrollFigures,
            PayrollBreakdown,
            AttendanceSummary,
            BulkPayrollEntry,
            AttendancePolicy,
            AttendancePolicyVersion,
            EffectiveAttendancePolicy,
            PayrollPolicy,
            PayrollPolicyVersion,
            CreateShift,
            AssignShift,
            ShiftDefinition,
            ShiftAssignment
        )
    ),
    tags(
        (name = "Attendance", description = "Punches, recomputation and payroll locks"),
        (name = "Payroll", description = "Monthly payroll generation"),
        (name = "Settings", description = "Attendance and payroll policies"),
        (name = "Shifts", description = "Shift definitions and assignments"),
    )
)]
pub struct ApiDoc;
