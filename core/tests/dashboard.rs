use autocare_core::{
    call_outcome::{record_call, Actor, CallResult, NewCallRecord, UserRole},
    clock::{Clock, FixedClock},
    config::LifecycleRules,
    customer::{Customer, CustomerGrade, CustomerStatus, HappyCallWindow, Priority},
    dashboard::DashboardSummary,
    engine::update_priority_tags,
    store::CrmStore,
    types::CustomerId,
};
use chrono::{Duration, NaiveDate};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn tagged(n: u32, expiry_offset: i64, visits: i64) -> Customer {
    let mut c = Customer::new(format!("고객{n}"), format!("010-7000-{n:04}"), format!("5{n}라5555"))
        .with_inspection_expiry(today() + Duration::days(expiry_offset))
        .with_visit_count(visits);
    update_priority_tags(&mut c, today());
    c
}

fn rules() -> LifecycleRules {
    LifecycleRules::default()
}

fn insert(store: &CrmStore, c: &Customer) -> CustomerId {
    store.insert_customer(c, FixedClock::at(today()).now()).unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Counts follow the stored tags and expiry dates.
#[test]
fn summary_counts_engine_fields() {
    let store = CrmStore::in_memory().unwrap();
    store.migrate().unwrap();

    let mut happy = tagged(1, 500, 1);
    happy.last_inspection_completed = Some(today() - Duration::days(100));
    update_priority_tags(&mut happy, today());
    insert(&store, &happy);
    insert(&store, &tagged(2, 30, 2));                                   // due soon, returning
    insert(&store, &tagged(3, -100, 3));                                 // overdue, active
    insert(&store, &tagged(4, -800, 1));                                 // first-time lost
    insert(&store, &tagged(5, -2000, 4).with_grade(CustomerGrade::Vip)); // scrapped, vip

    let summary = DashboardSummary::compute(&store, today(), &rules()).unwrap();

    assert_eq!(summary.total_customers, 5);
    assert_eq!(summary.status_count(CustomerStatus::Active), 3);
    assert_eq!(summary.status_count(CustomerStatus::FirstTimeLost), 1);
    assert_eq!(summary.status_count(CustomerStatus::PossiblyScrapped), 1);
    assert_eq!(summary.active, 3);
    assert_eq!(summary.first_time_lost, 1);
    assert_eq!(summary.long_term_absent, 1);
    assert_eq!(summary.due_soon, 1);
    assert_eq!(summary.overdue, 3);
    assert_eq!(summary.vip, 1);
    assert_eq!(summary.frequent_visitors, 2);
    assert_eq!(summary.priority_count(Priority::High), 1);
    assert_eq!(summary.priority_count(Priority::Low), 2);
    assert_eq!(summary.happy_call(HappyCallWindow::ThreeMonth).total, 1);
    assert_eq!(summary.returning_targets.total, 3);
}

/// A call today moves a customer from remaining to completed.
#[test]
fn todays_calls_advance_target_progress() {
    let store = CrmStore::in_memory().unwrap();
    store.migrate().unwrap();
    let clock = FixedClock::at(today());
    let overdue_a = insert(&store, &tagged(1, -10, 0));
    insert(&store, &tagged(2, -20, 0));

    let before = DashboardSummary::compute(&store, today(), &rules()).unwrap();
    assert_eq!(before.overdue_targets.remaining, 2);
    assert_eq!(before.overdue_targets.progress, 0.0);

    let call = NewCallRecord::new(overdue_a, CallResult::Connected, "reminded about inspection");
    record_call(&store, &call, &Actor::new("agent1", UserRole::Agent), &clock).unwrap();

    let after = DashboardSummary::compute(&store, today(), &rules()).unwrap();
    assert_eq!(after.overdue_targets.total, 2);
    assert_eq!(after.overdue_targets.remaining, 1);
    assert_eq!(after.overdue_targets.completed, 1);
    assert_eq!(after.overdue_targets.progress, 50.0);
    assert_eq!(after.calls_today, 1);
    assert_eq!(after.connected_today, 1);
    assert_eq!(after.customers_called_today, 1);

    let tomorrow = DashboardSummary::compute(&store, today() + Duration::days(1), &rules()).unwrap();
    assert_eq!(tomorrow.calls_today, 0, "yesterday's call does not count tomorrow");
}

/// The due-soon count follows the configured window.
#[test]
fn due_soon_uses_configured_window() {
    let store = CrmStore::in_memory().unwrap();
    store.migrate().unwrap();
    insert(&store, &tagged(1, 20, 0));
    insert(&store, &tagged(2, 60, 0));

    let default = DashboardSummary::compute(&store, today(), &rules()).unwrap();
    assert_eq!(default.due_soon, 2);

    let narrow = LifecycleRules { due_soon_days: 30, ..rules() };
    let summary = DashboardSummary::compute(&store, today(), &narrow).unwrap();
    assert_eq!(summary.due_soon, 1);
}

/// Follow-ups are split into due today, overdue and answered today.
#[test]
fn follow_up_counts_by_schedule() {
    let store = CrmStore::in_memory().unwrap();
    store.migrate().unwrap();
    let clock = FixedClock::at(today());
    let agent = Actor::new("agent1", UserRole::Agent);
    let id = insert(&store, &tagged(1, 200, 0));

    let scheduled = |days: i64| NewCallRecord {
        requires_follow_up: true,
        follow_up_date: Some(today() + Duration::days(days)),
        ..NewCallRecord::new(id, CallResult::CallbackRequested, "call back")
    };
    record_call(&store, &scheduled(0), &agent, &clock).unwrap();
    record_call(&store, &scheduled(-3), &agent, &clock).unwrap();
    let answered = record_call(&store, &scheduled(-5), &agent, &clock).unwrap();
    record_call(&store, &scheduled(7), &agent, &clock).unwrap();

    let child = NewCallRecord {
        parent_call_id: Some(answered.call_id),
        ..NewCallRecord::new(id, CallResult::NoAnswer, "tried again")
    };
    record_call(&store, &child, &agent, &clock).unwrap();

    let summary = DashboardSummary::compute(&store, today(), &rules()).unwrap();
    assert_eq!(summary.open_follow_ups, 3);
    assert_eq!(summary.follow_ups_due_today, 1);
    assert_eq!(summary.overdue_follow_ups, 1, "the answered one no longer counts");
    assert_eq!(summary.follow_up_calls_today, 1);
}

/// Completion rate is customers called today over the targets still open.
#[test]
fn target_completion_rate_follows_calls() {
    let store = CrmStore::in_memory().unwrap();
    store.migrate().unwrap();
    let clock = FixedClock::at(today());
    let called = insert(&store, &tagged(1, -10, 0));
    insert(&store, &tagged(2, -20, 0));
    insert(&store, &tagged(3, -30, 0));

    let before = DashboardSummary::compute(&store, today(), &rules()).unwrap();
    assert_eq!(before.today_target_completion_rate, 0.0);

    let call = NewCallRecord::new(called, CallResult::Connected, "reminded");
    record_call(&store, &call, &Actor::new("agent1", UserRole::Agent), &clock).unwrap();

    let after = DashboardSummary::compute(&store, today(), &rules()).unwrap();
    assert_eq!(after.targets_remaining(), 2);
    assert_eq!(after.today_target_completion_rate, 50.0);
}
