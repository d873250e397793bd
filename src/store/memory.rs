use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime};

use super::{AttendanceStore, PayrollStore, WriteOutcome};
use crate::error::StoreError;
use crate::model::attendance::{AttendanceRecord, DailyAttendance};
use crate::model::payroll::{PayrollFigures, PayrollRecord, SalaryStructure};
use crate::model::policy::{AttendancePolicy, PayrollPolicy};
use crate::model::punch::{NewPunchEvent, PunchEvent};
use crate::model::shift::ShiftDefinition;

#[derive(Default)]
struct State {
    shifts: HashMap<u64, Vec<(NaiveDate, Option<NaiveDate>, ShiftDefinition)>>,
    holidays: HashSet<NaiveDate>,
    leaves: HashMap<u64, Vec<(NaiveDate, NaiveDate)>>,
    attendance_policies: Vec<(NaiveDateTime, AttendancePolicy)>,
    payroll_policy: Option<PayrollPolicy>,
    salaries: HashMap<u64, SalaryStructure>,
    base_salaries: HashMap<u64, f64>,
    employees: Vec<u64>,
    events: Vec<PunchEvent>,
    attendance: BTreeMap<(u64, NaiveDate), AttendanceRecord>,
    payroll: BTreeMap<(u64, i32, u32), PayrollRecord>,
    fail_policy_reads: bool,
}

/// In-memory store for service tests.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().expect("memory store poisoned");
        f(&mut state)
    }

    pub fn assign_shift(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: Option<NaiveDate>,
        shift: ShiftDefinition,
    ) {
        self.with(|s| s.shifts.entry(employee_id).or_default().push((from, to, shift)));
    }

    pub fn add_holiday(&self, date: NaiveDate) {
        self.with(|s| s.holidays.insert(date));
    }

    pub fn approve_leave(&self, employee_id: u64, from: NaiveDate, to: NaiveDate) {
        self.with(|s| s.leaves.entry(employee_id).or_default().push((from, to)));
    }

    pub fn add_attendance_policy(&self, created_at: NaiveDateTime, policy: AttendancePolicy) {
        self.with(|s| s.attendance_policies.push((created_at, policy)));
    }

    pub fn fail_policy_reads(&self) {
        self.with(|s| s.fail_policy_reads = true);
    }

    pub fn set_payroll_policy(&self, policy: PayrollPolicy) {
        self.with(|s| s.payroll_policy = Some(policy));
    }

    pub fn set_salary(&self, employee_id: u64, salary: SalaryStructure) {
        self.with(|s| s.salaries.insert(employee_id, salary));
    }

    pub fn set_base_salary(&self, employee_id: u64, base: f64) {
        self.with(|s| s.base_salaries.insert(employee_id, base));
    }

    pub fn add_employee(&self, employee_id: u64) {
        self.with(|s| s.employees.push(employee_id));
    }

    pub fn put_attendance(&self, record: AttendanceRecord) {
        self.with(|s| {
            let key = (record.attendance.employee_id, record.attendance.date);
            s.attendance.insert(key, record);
        });
    }

    pub fn events(&self) -> Vec<PunchEvent> {
        self.with(|s| s.events.clone())
    }

    pub fn payroll_rows(&self) -> usize {
        self.with(|s| s.payroll.len())
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn shift_for(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<ShiftDefinition>, StoreError> {
        Ok(self.with(|s| {
            s.shifts.get(&employee_id).and_then(|assignments| {
                assignments
                    .iter()
                    .filter(|(from, to, _)| *from <= date && to.is_none_or(|to| to >= date))
                    .max_by_key(|(from, _, _)| *from)
                    .map(|(_, _, shift)| shift.clone())
            })
        }))
    }

    async fn is_holiday(&self, date: NaiveDate) -> Result<bool, StoreError> {
        Ok(self.with(|s| s.holidays.contains(&date)))
    }

    async fn has_approved_leave(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        Ok(self.with(|s| {
            s.leaves
                .get(&employee_id)
                .is_some_and(|leaves| leaves.iter().any(|(from, to)| *from <= date && date <= *to))
        }))
    }

    async fn attendance_policy_as_of(
        &self,
        as_of: NaiveDateTime,
    ) -> Result<Option<AttendancePolicy>, StoreError> {
        self.with(|s| {
            if s.fail_policy_reads {
                return Err(StoreError::Unavailable("policy table offline".into()));
            }
            Ok(s.attendance_policies
                .iter()
                .filter(|(created_at, _)| *created_at <= as_of)
                .max_by_key(|(created_at, _)| *created_at)
                .map(|(_, policy)| policy.clone()))
        })
    }

    async fn events_between(
        &self,
        employee_id: u64,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<PunchEvent>, StoreError> {
        Ok(self.with(|s| {
            let mut events: Vec<PunchEvent> = s
                .events
                .iter()
                .filter(|e| e.employee_id == employee_id && e.event_time >= from && e.event_time <= to)
                .cloned()
                .collect();
            events.sort_by_key(|e| (e.event_time, e.event_id));
            events
        }))
    }

    async fn append_event(&self, event: NewPunchEvent) -> Result<PunchEvent, StoreError> {
        Ok(self.with(|s| {
            let stored = PunchEvent {
                event_id: s.events.len() as u64 + 1,
                employee_id: event.employee_id,
                kind: event.kind,
                event_time: event.event_time,
                source: event.source,
                meta: event.meta,
            };
            s.events.push(stored.clone());
            stored
        }))
    }

    async fn upsert_unless_locked(
        &self,
        attendance: &DailyAttendance,
    ) -> Result<WriteOutcome, StoreError> {
        Ok(self.with(|s| {
            let key = (attendance.employee_id, attendance.date);
            match s.attendance.get_mut(&key) {
                Some(existing) if existing.is_payroll_locked => WriteOutcome::Locked,
                Some(existing) => {
                    existing.attendance = attendance.clone();
                    WriteOutcome::Written
                }
                None => {
                    s.attendance.insert(
                        key,
                        AttendanceRecord {
                            attendance: attendance.clone(),
                            is_payroll_locked: false,
                            locked_at: None,
                        },
                    );
                    WriteOutcome::Written
                }
            }
        }))
    }

    async fn attendance_for(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self.with(|s| s.attendance.get(&(employee_id, date)).cloned()))
    }

    async fn set_day_lock(
        &self,
        employee_id: u64,
        date: NaiveDate,
        locked: bool,
    ) -> Result<bool, StoreError> {
        Ok(self.with(|s| match s.attendance.get_mut(&(employee_id, date)) {
            Some(record) => {
                record.is_payroll_locked = locked;
                record.locked_at = locked.then(|| Local::now().naive_local());
                true
            }
            None => false,
        }))
    }
}

#[async_trait]
impl PayrollStore for MemoryStore {
    async fn active_payroll_policy(&self) -> Result<Option<PayrollPolicy>, StoreError> {
        Ok(self.with(|s| s.payroll_policy.clone()))
    }

    async fn salary_structure_for(
        &self,
        employee_id: u64,
        _date: NaiveDate,
    ) -> Result<Option<SalaryStructure>, StoreError> {
        Ok(self.with(|s| s.salaries.get(&employee_id).cloned()))
    }

    async fn base_salary(&self, employee_id: u64) -> Result<Option<f64>, StoreError> {
        Ok(self.with(|s| s.base_salaries.get(&employee_id).copied()))
    }

    async fn attendance_between(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        Ok(self.with(|s| {
            s.attendance
                .range((employee_id, from)..=(employee_id, to))
                .map(|(_, record)| record.clone())
                .collect()
        }))
    }

    async fn save_payroll(
        &self,
        figures: &PayrollFigures,
        lock_period: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<PayrollRecord, StoreError> {
        Ok(self.with(|s| {
            let now = Local::now().naive_local();
            let key = (figures.employee_id, figures.year, figures.month);
            let payroll_id = s
                .payroll
                .get(&key)
                .map(|existing| existing.payroll_id)
                .unwrap_or(s.payroll.len() as u64 + 1);
            let record = PayrollRecord {
                payroll_id,
                figures: figures.clone(),
                generated_at: now,
            };
            s.payroll.insert(key, record.clone());

            if let Some((first, last)) = lock_period {
                for (_, row) in s
                    .attendance
                    .range_mut((figures.employee_id, first)..=(figures.employee_id, last))
                {
                    if !row.is_payroll_locked {
                        row.is_payroll_locked = true;
                        row.locked_at = Some(now);
                    }
                }
            }
            record
        }))
    }

    async fn active_employee_ids(&self) -> Result<Vec<u64>, StoreError> {
        Ok(self.with(|s| s.employees.clone()))
    }
}
