use actix_web::web;

use crate::service::attendance::AttendanceService;
use crate::service::payroll::PayrollService;
use crate::store::mysql::MySqlStore;

pub mod attendance;
pub mod payroll;
pub mod settings;
pub mod shifts;

pub type AttendanceSvc = web::Data<AttendanceService<MySqlStore>>;
pub type PayrollSvc = web::Data<PayrollService<MySqlStore>>;
