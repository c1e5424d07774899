//! C7: billing state machine, §4.7. Calendar-accurate cycle arithmetic
//! (day-of-month preserving, clamped to the target month's length) plus
//! the four operations and the hourly expiration sweeper.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use shared::errors::ApiError;
use tracing::info;
use uuid::Uuid;

use crate::domain::{
    BillingCycle, BillingStatus, NewBillingHistoryEntry, NewPayment, Payment, User,
};
use crate::domain::value_objects::BillingEventKind;
use crate::repository::{BillingHistoryRepository, PaymentRepository, UserRepository};

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let next_month_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("year/month combination is always valid here");
    (next_month_first - Duration::days(1)).day()
}

/// Adds `months` calendar months to `dt`, preserving day-of-month where
/// possible and clamping to the target month's last day otherwise
/// (e.g. Jan 31 + 1 month = Feb 28/29), per §4.7.2.
fn add_months(dt: DateTime<Utc>, months: i32) -> DateTime<Utc> {
    let total = dt.year() * 12 + dt.month0() as i32 + months;
    let new_year = total.div_euclid(12);
    let new_month = (total.rem_euclid(12) + 1) as u32;
    let clamped_day = dt.day().min(last_day_of_month(new_year, new_month));

    let naive_date = NaiveDate::from_ymd_opt(new_year, new_month, clamped_day)
        .expect("clamped day is always valid for its own month");
    Utc.from_utc_datetime(&naive_date.and_time(dt.time()))
}

/// Adds one cycle's duration to `start`, per §4.7.2.
pub fn add_cycle(start: DateTime<Utc>, cycle: BillingCycle) -> DateTime<Utc> {
    match cycle {
        BillingCycle::Daily => start + Duration::days(1),
        BillingCycle::Weekly => start + Duration::days(7),
        BillingCycle::Monthly => add_months(start, 1),
        BillingCycle::ThreeMonths => add_months(start, 3),
        BillingCycle::HalfYear => add_months(start, 6),
        BillingCycle::Yearly => add_months(start, 12),
    }
}

fn days_remaining(end: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (end - now).num_seconds().max(0);
    (seconds as f64 / 86_400.0).ceil() as i64
}

/// Derives a user's billing posture, §4.7.3. End dates are exclusive upper
/// bounds (a login at the exact expiry millisecond is rejected), so
/// "active" requires the end strictly in the future.
pub fn status(user: &User) -> BillingStatus {
    let now = Utc::now();

    if user.is_trial_active {
        if let Some(end) = user.trial_end_date {
            return if end > now {
                BillingStatus::Active { days_remaining: days_remaining(end, now) }
            } else {
                BillingStatus::Expired
            };
        }
    }

    if user.is_billing_active {
        if let Some(end) = user.billing_cycle_end_date {
            return if end > now {
                BillingStatus::Active { days_remaining: days_remaining(end, now) }
            } else {
                BillingStatus::Expired
            };
        }
    }

    BillingStatus::NoPlan
}

pub struct SweepSummary {
    pub users_disabled: u64,
}

#[derive(Clone)]
pub struct BillingService {
    users: UserRepository,
    payments: PaymentRepository,
    billing_history: BillingHistoryRepository,
}

impl BillingService {
    pub fn new(
        users: UserRepository,
        payments: PaymentRepository,
        billing_history: BillingHistoryRepository,
    ) -> Self {
        Self { users, payments, billing_history }
    }

    pub fn status_for(&self, user: &User) -> BillingStatus {
        status(user)
    }

    /// §4.7.3 `start-cycle`.
    pub async fn start_cycle(
        &self,
        user_id: Uuid,
        cycle: BillingCycle,
        start_date: Option<DateTime<Utc>>,
    ) -> Result<User, ApiError> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: "user".to_string() })?;

        let start = start_date.unwrap_or_else(Utc::now);
        let end = add_cycle(start, cycle);

        user.is_trial_active = false;
        user.trial_start_date = None;
        user.trial_end_date = None;
        user.is_billing_active = true;
        user.billing_cycle_start_date = Some(start);
        user.billing_cycle_end_date = Some(end);
        user.billing_cycle = Some(cycle.to_string());

        let updated = self.users.update_billing_fields(&user).await?;

        self.record_history_best_effort(
            user_id,
            BillingEventKind::CycleStarted,
            json!({ "cycle": cycle.to_string(), "start": start, "end": end }),
        )
        .await;

        info!(%user_id, cycle = %cycle, "billing cycle started");
        Ok(updated)
    }

    /// §4.7.3 `add-payment`: prepayments stack from the current cycle end
    /// (or now, if none). Per the resolved open question, this never
    /// reactivates a disabled account — `status` is left untouched.
    pub async fn add_payment(
        &self,
        user_id: Uuid,
        cycle: BillingCycle,
        amount: Decimal,
        memo: Option<String>,
        created_by: Uuid,
    ) -> Result<(User, Payment), ApiError> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: "user".to_string() })?;

        let now = Utc::now();
        let cycle_start = user.billing_cycle_end_date.unwrap_or(now).max(now);
        let cycle_end = add_cycle(cycle_start, cycle);

        let payment = self
            .payments
            .create(NewPayment {
                user_id,
                amount,
                cycle,
                cycle_start_date: cycle_start,
                cycle_end_date: cycle_end,
                memo,
                created_by,
            })
            .await?;

        user.is_trial_active = false;
        user.trial_start_date = None;
        user.trial_end_date = None;
        user.is_billing_active = true;
        user.billing_cycle_start_date = Some(cycle_start);
        user.billing_cycle_end_date = Some(cycle_end);
        user.billing_cycle = Some(cycle.to_string());

        let updated = self.users.update_billing_fields(&user).await?;

        self.record_history_best_effort(
            user_id,
            BillingEventKind::PaymentAdded,
            json!({ "amount": amount.to_string(), "cycle": cycle.to_string(), "cycleEnd": cycle_end }),
        )
        .await;

        info!(%user_id, %amount, "payment recorded");
        Ok((updated, payment))
    }

    /// §4.7.3 `set-trial`.
    pub async fn set_trial(&self, user_id: Uuid, hours: i64) -> Result<User, ApiError> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: "user".to_string() })?;

        let start = Utc::now();
        let end = start + Duration::hours(hours);

        user.is_trial_active = true;
        user.is_billing_active = false;
        user.trial_start_date = Some(start);
        user.trial_end_date = Some(end);
        user.billing_cycle_start_date = None;
        user.billing_cycle_end_date = None;
        user.billing_cycle = None;

        let updated = self.users.update_billing_fields(&user).await?;

        self.record_history_best_effort(
            user_id,
            BillingEventKind::TrialStarted,
            json!({ "hours": hours, "end": end }),
        )
        .await;

        info!(%user_id, hours, "trial started");
        Ok(updated)
    }

    /// §4.7.5: disables every non-disabled user past its trial or cycle
    /// end. Idempotent — the `WHERE status <> 'disabled'` guard in the
    /// repository update means a second run with no intervening writes
    /// disables nobody and emits no further history.
    pub async fn run_sweep(&self) -> Result<SweepSummary, ApiError> {
        let started = Utc::now();
        let candidates = self.users.users_with_expired_billing().await?;
        let mut disabled = 0u64;

        for user in candidates {
            if self.users.disable_if_not_already(user.user_id).await? {
                disabled += 1;
                let reason = if user.is_trial_active { "trial_expired" } else { "billing_cycle_expired" };
                self.record_history_best_effort(
                    user.user_id,
                    BillingEventKind::AutoDisabled,
                    json!({ "reason": reason }),
                )
                .await;
            }
        }

        let duration_ms = (Utc::now() - started).num_milliseconds();
        info!(users_disabled = disabled, duration_ms, "billing sweep complete");
        Ok(SweepSummary { users_disabled: disabled })
    }

    async fn record_history_best_effort(
        &self,
        user_id: Uuid,
        event: BillingEventKind,
        metadata: serde_json::Value,
    ) {
        if let Err(err) = self
            .billing_history
            .create(NewBillingHistoryEntry { user_id, event, metadata })
            .await
        {
            tracing::error!(%user_id, %err, "failed to record billing history entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn monthly_cycle_preserves_day_of_month() {
        let end = add_cycle(at(2024, 1, 15), BillingCycle::Monthly);
        assert_eq!((end.year(), end.month(), end.day()), (2024, 2, 15));
    }

    #[test]
    fn monthly_cycle_clamps_to_last_day_of_shorter_month() {
        let end = add_cycle(at(2024, 1, 31), BillingCycle::Monthly);
        // 2024 is a leap year: Feb has 29 days.
        assert_eq!((end.year(), end.month(), end.day()), (2024, 2, 29));
    }

    #[test]
    fn yearly_cycle_adds_twelve_months() {
        let end = add_cycle(at(2024, 3, 10), BillingCycle::Yearly);
        assert_eq!((end.year(), end.month(), end.day()), (2025, 3, 10));
    }

    #[test]
    fn daily_and_weekly_use_fixed_durations() {
        assert_eq!(add_cycle(at(2024, 1, 1), BillingCycle::Daily), at(2024, 1, 2));
        assert_eq!(add_cycle(at(2024, 1, 1), BillingCycle::Weekly), at(2024, 1, 8));
    }

    #[test]
    fn status_reports_no_plan_when_no_flags_set() {
        let user = sample_user();
        assert_eq!(status(&user), BillingStatus::NoPlan);
    }

    #[test]
    fn status_reports_expired_exactly_at_boundary() {
        let mut user = sample_user();
        user.is_trial_active = true;
        user.trial_end_date = Some(Utc::now() - Duration::milliseconds(1));
        assert_eq!(status(&user), BillingStatus::Expired);
    }

    #[test]
    fn status_reports_active_with_days_remaining() {
        let mut user = sample_user();
        user.is_billing_active = true;
        user.billing_cycle_end_date = Some(Utc::now() + Duration::days(10));
        match status(&user) {
            BillingStatus::Active { days_remaining } => assert!((9..=10).contains(&days_remaining)),
            other => panic!("expected active, got {other:?}"),
        }
    }

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            user_id: Uuid::new_v4(),
            email: "bob@example.com".into(),
            hashed_password: "hash".into(),
            role: "user".into(),
            status: "active".into(),
            current_session_token: None,
            last_login_at: None,
            last_login_ip: None,
            is_trial_active: false,
            is_billing_active: false,
            trial_start_date: None,
            trial_end_date: None,
            billing_cycle_start_date: None,
            billing_cycle_end_date: None,
            billing_cycle: None,
            created_at: now,
            updated_at: now,
        }
    }
}
