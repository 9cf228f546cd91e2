use autocare_core::{
    clock::FixedClock,
    config::CrmConfig,
    customer::{Customer, CustomerStatus, HappyCallWindow, Priority},
    recompute_job::{RecomputeChanges, RecomputeJob, RecomputeOptions},
    store::{CrmStore, CustomerFilter},
    types::CustomerId,
};
use chrono::{Duration, NaiveDate};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn day0() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// Store with customers inserted untagged, as of `day0`.
fn store_with(customers: &[Customer]) -> (CrmStore, Vec<CustomerId>) {
    let store = CrmStore::in_memory().unwrap();
    store.migrate().unwrap();
    let now = day0().and_hms_opt(9, 0, 0).unwrap();
    let ids = customers
        .iter()
        .map(|c| store.insert_customer(c, now).unwrap())
        .collect();
    (store, ids)
}

fn customer(n: u32) -> Customer {
    Customer::new(format!("고객{n}"), format!("010-0000-{n:04}"), format!("1{n}가1234"))
}

fn run(store: &CrmStore, options: &RecomputeOptions) -> autocare_core::recompute_job::RecomputeReport {
    let clock = FixedClock::at(options.reference_date);
    RecomputeJob::new(store, &CrmConfig::default_test(), &clock)
        .run(options)
        .unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Moving the reference date forward ages customers through the statuses.
#[test]
fn customers_age_as_reference_date_moves() {
    init_logging();
    let (store, ids) = store_with(&[
        customer(1).with_inspection_expiry(day0()).with_visit_count(1),
        customer(2).with_inspection_expiry(day0()).with_visit_count(4),
    ]);

    let first = run(&store, &RecomputeOptions::on(day0()));
    assert_eq!(first.succeeded, 2);
    assert_eq!(first.changes.status_transitions, 0, "both still active on expiry day");

    let later = day0() + Duration::days(731);
    let report = run(&store, &RecomputeOptions::on(later));
    assert_eq!(report.changes.status_transitions, 2);
    assert_eq!(report.changes.overdue_tags, 2);

    let once = store.get_customer(ids[0]).unwrap();
    let often = store.get_customer(ids[1]).unwrap();
    assert_eq!(once.tags.customer_status, CustomerStatus::FirstTimeLost);
    assert_eq!(often.tags.customer_status, CustomerStatus::LongTermLost);
    assert_eq!(once.tags.priority, Priority::Low);
    assert_eq!(store.events_of_type("status_changed").unwrap().len(), 2);
}

/// Running twice on the same date reports no changes the second time.
#[test]
fn second_run_is_a_no_op() {
    init_logging();
    let (store, _) = store_with(&[
        customer(1)
            .with_inspection_expiry(day0() - Duration::days(40))
            .with_last_inspection_completed(day0() - Duration::days(400)),
        customer(2).with_inspection_expiry(day0() + Duration::days(300)).with_visit_count(3),
    ]);
    let options = RecomputeOptions { extract_date: Some(day0()), ..RecomputeOptions::on(day0()) };

    let first = run(&store, &options);
    assert_eq!(first.changes.inspection_dates, 2);
    assert_eq!(first.changes.happy_calls, 1);

    let second = run(&store, &options);
    assert_eq!(second.succeeded, 2);
    assert_eq!(second.changes, RecomputeChanges::default(), "nothing should change on a rerun");
}

/// `customer_id` narrows the run to one record; `limit` caps it.
#[test]
fn id_filter_and_limit_narrow_the_run() {
    init_logging();
    let customers: Vec<_> = (1..=5)
        .map(|n| customer(n).with_inspection_expiry(day0() - Duration::days(10)))
        .collect();
    let (store, ids) = store_with(&customers);

    let one = run(&store, &RecomputeOptions { customer_id: Some(ids[2]), ..RecomputeOptions::on(day0()) });
    assert_eq!(one.total, 1);
    assert!(store.get_customer(ids[2]).unwrap().tags.is_inspection_overdue);
    assert!(!store.get_customer(ids[0]).unwrap().tags.is_inspection_overdue);

    let capped = run(&store, &RecomputeOptions { limit: Some(2), ..RecomputeOptions::on(day0()) });
    assert_eq!(capped.total, 2);
    assert_eq!(
        store.count_customers(CustomerFilter::InspectionOverdue, day0(), false).unwrap(),
        5,
        "the date filter counts expiry, not the tag"
    );
}

/// The happy-call window follows the last completed inspection.
#[test]
fn happy_call_window_moves_with_time() {
    init_logging();
    let (store, ids) = store_with(&[customer(1)
        .with_inspection_expiry(day0() + Duration::days(700))
        .with_last_inspection_completed(day0() - Duration::days(100))]);

    run(&store, &RecomputeOptions::on(day0()));
    assert_eq!(store.get_customer(ids[0]).unwrap().tags.happy_call, Some(HappyCallWindow::ThreeMonth));

    run(&store, &RecomputeOptions::on(day0() + Duration::days(300)));
    assert_eq!(store.get_customer(ids[0]).unwrap().tags.happy_call, Some(HappyCallWindow::TwelveMonth));

    run(&store, &RecomputeOptions::on(day0() + Duration::days(700)));
    assert_eq!(store.get_customer(ids[0]).unwrap().tags.happy_call, None, "past 730 days, no window");
}
