use autocare_core::{
    call_outcome::{
        add_follow_up, check_follow_up_integrity, delete_call, record_call, Actor, CallResult,
        FollowUpAction, FollowUpActionType, InterestType, NewCallRecord, UserRole,
    },
    clock::{Clock, FixedClock},
    customer::{ContactStatus, Customer},
    error::CrmError,
    store::CrmStore,
    types::CustomerId,
};
use chrono::{NaiveDate, NaiveTime};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn clock() -> FixedClock {
    FixedClock::at(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
        .with_time(NaiveTime::from_hms_opt(10, 30, 0).unwrap())
}

fn agent(name: &str) -> Actor {
    Actor::new(name, UserRole::Agent)
}

fn store_with_customer() -> (CrmStore, CustomerId) {
    let store = CrmStore::in_memory().unwrap();
    store.migrate().unwrap();
    let id = store
        .insert_customer(&Customer::new("박민수", "010-5555-0001", "33다3333"), clock().now())
        .unwrap();
    (store, id)
}

fn call_needing_follow_up(customer_id: CustomerId) -> NewCallRecord {
    NewCallRecord {
        requires_follow_up: true,
        ..NewCallRecord::new(customer_id, CallResult::CallbackRequested, "call back next week")
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Notes are mandatory.
#[test]
fn empty_notes_are_rejected() {
    let (store, id) = store_with_customer();
    let call = NewCallRecord::new(id, CallResult::Connected, "   ");
    let err = record_call(&store, &call, &agent("agent1"), &clock()).unwrap_err();
    assert!(matches!(err, CrmError::InvalidInput(_)), "got {err}");
}

/// Calls to unknown customers fail and store nothing.
#[test]
fn unknown_customer_is_rejected() {
    let (store, _) = store_with_customer();
    let call = NewCallRecord::new(999, CallResult::Connected, "hello");
    let err = record_call(&store, &call, &agent("agent1"), &clock()).unwrap_err();
    assert!(matches!(err, CrmError::CustomerNotFound { id: 999 }), "got {err}");
    assert_eq!(store.event_count().unwrap(), 0);
}

/// A callback request moves a pending customer to contacted.
#[test]
fn callback_request_marks_contacted() {
    let (store, id) = store_with_customer();
    let outcome = record_call(&store, &call_needing_follow_up(id), &agent("agent1"), &clock()).unwrap();

    assert_eq!(outcome.contact_status, ContactStatus::Contacted);
    assert!(outcome.completed_follow_ups.is_empty());
    assert_eq!(store.get_customer(id).unwrap().contact_status, ContactStatus::Contacted);
    assert_eq!(store.pending_follow_up_count().unwrap(), 1);
}

/// A connected call without a parent closes every open follow-up.
#[test]
fn connected_call_closes_open_follow_ups() {
    let (store, id) = store_with_customer();
    let first = record_call(&store, &call_needing_follow_up(id), &agent("agent1"), &clock()).unwrap();
    let second = record_call(&store, &call_needing_follow_up(id), &agent("agent2"), &clock()).unwrap();

    let connected = NewCallRecord {
        interest_type: Some(InterestType::Insurance),
        ..NewCallRecord::new(id, CallResult::Connected, "interested in renewal")
    };
    let outcome = record_call(&store, &connected, &agent("agent1"), &clock()).unwrap();

    assert_eq!(outcome.completed_follow_ups, vec![first.call_id, second.call_id]);
    assert_eq!(outcome.contact_status, ContactStatus::Interested);
    assert_eq!(store.pending_follow_up_count().unwrap(), 0);
    assert_eq!(store.events_of_type("follow_up_completed").unwrap().len(), 2);
}

/// An unanswered call does not touch open follow-ups.
#[test]
fn unanswered_call_leaves_follow_ups_open() {
    let (store, id) = store_with_customer();
    record_call(&store, &call_needing_follow_up(id), &agent("agent1"), &clock()).unwrap();

    let busy = NewCallRecord::new(id, CallResult::Busy, "line busy");
    let outcome = record_call(&store, &busy, &agent("agent1"), &clock()).unwrap();

    assert!(outcome.completed_follow_ups.is_empty());
    assert_eq!(store.pending_follow_up_count().unwrap(), 1);
}

/// A call naming its parent closes only that parent.
#[test]
fn explicit_parent_is_closed() {
    let (store, id) = store_with_customer();
    let first = record_call(&store, &call_needing_follow_up(id), &agent("agent1"), &clock()).unwrap();
    let second = record_call(&store, &call_needing_follow_up(id), &agent("agent1"), &clock()).unwrap();

    let child = NewCallRecord {
        parent_call_id: Some(second.call_id),
        ..NewCallRecord::new(id, CallResult::NoAnswer, "no answer on follow-up")
    };
    let outcome = record_call(&store, &child, &agent("agent1"), &clock()).unwrap();

    assert_eq!(outcome.completed_follow_ups, vec![second.call_id]);
    assert!(!store.get_call_record(first.call_id).unwrap().follow_up_completed);
    assert!(store.get_call_record(second.call_id).unwrap().follow_up_completed);
}

/// A dangling parent id rejects the call and stores nothing.
#[test]
fn missing_parent_rejects_the_call() {
    let (store, id) = store_with_customer();
    let orphan = NewCallRecord {
        parent_call_id: Some(4242),
        ..NewCallRecord::new(id, CallResult::Connected, "follow-up to nothing")
    };
    let err = record_call(&store, &orphan, &agent("agent1"), &clock()).unwrap_err();

    assert!(matches!(err, CrmError::CallRecordNotFound { id: 4242 }), "got {err}");
    assert!(store.calls_for_customer(id).unwrap().is_empty());
    assert_eq!(store.event_count().unwrap(), 0);
    assert_eq!(store.get_customer(id).unwrap().contact_status, ContactStatus::Pending);
}

/// A deleted parent is treated as missing.
#[test]
fn deleted_parent_rejects_the_call() {
    let (store, id) = store_with_customer();
    let parent = record_call(&store, &call_needing_follow_up(id), &agent("agent1"), &clock()).unwrap();
    delete_call(&store, parent.call_id, &agent("agent1"), &clock()).unwrap();

    let child = NewCallRecord {
        parent_call_id: Some(parent.call_id),
        ..NewCallRecord::new(id, CallResult::Connected, "answering a deleted call")
    };
    let err = record_call(&store, &child, &agent("agent1"), &clock()).unwrap_err();
    assert!(matches!(err, CrmError::CallRecordNotFound { .. }), "got {err}");
}

/// Conversion wins over any interest type.
#[test]
fn converted_call_marks_converted() {
    let (store, id) = store_with_customer();
    let call = NewCallRecord {
        interest_type: Some(InterestType::None),
        is_converted: true,
        ..NewCallRecord::new(id, CallResult::Connected, "signed up")
    };
    let outcome = record_call(&store, &call, &agent("agent1"), &clock()).unwrap();
    assert_eq!(outcome.contact_status, ContactStatus::Converted);
}

/// Agents may delete only their own calls; managers any.
#[test]
fn soft_delete_respects_ownership() {
    let (store, id) = store_with_customer();
    let call = NewCallRecord::new(id, CallResult::Connected, "hello");
    let outcome = record_call(&store, &call, &agent("agent1"), &clock()).unwrap();

    let err = delete_call(&store, outcome.call_id, &agent("agent2"), &clock()).unwrap_err();
    assert!(matches!(err, CrmError::InvalidInput(_)));

    delete_call(&store, outcome.call_id, &Actor::new("manager1", UserRole::Manager), &clock()).unwrap();
    let record = store.get_call_record(outcome.call_id).unwrap();
    assert!(record.is_deleted);
    assert_eq!(record.deleted_by.as_deref(), Some("manager1"));
    assert!(store.calls_for_customer(id).unwrap().is_empty(), "deleted calls are hidden");
}

/// Deleting twice fails and keeps the first deletion's audit fields.
#[test]
fn second_delete_is_rejected() {
    let (store, id) = store_with_customer();
    let call = NewCallRecord::new(id, CallResult::Connected, "hello");
    let outcome = record_call(&store, &call, &agent("agent1"), &clock()).unwrap();
    delete_call(&store, outcome.call_id, &agent("agent1"), &clock()).unwrap();

    let later = clock().with_time(NaiveTime::from_hms_opt(15, 0, 0).unwrap());
    let admin = Actor::new("admin", UserRole::Admin);
    let err = delete_call(&store, outcome.call_id, &admin, &later).unwrap_err();
    assert!(matches!(err, CrmError::CallRecordNotFound { .. }), "got {err}");

    let record = store.get_call_record(outcome.call_id).unwrap();
    assert_eq!(record.deleted_by.as_deref(), Some("agent1"));
    assert_eq!(record.deleted_at, Some(clock().now()));
}

/// The integrity check closes parents whose child call exists, then reports.
#[test]
fn integrity_check_repairs_stale_parents() {
    let (store, id) = store_with_customer();
    let parent = record_call(&store, &call_needing_follow_up(id), &agent("agent1"), &clock()).unwrap();
    let child = NewCallRecord {
        parent_call_id: Some(parent.call_id),
        ..NewCallRecord::new(id, CallResult::Busy, "busy")
    };
    let child_id = store.insert_call_record(&child, "agent1", clock().now()).unwrap();
    assert!(child_id > parent.call_id);
    record_call(&store, &call_needing_follow_up(id), &agent("agent1"), &clock()).unwrap();

    let report = check_follow_up_integrity(&store).unwrap();
    assert_eq!(report.fixed, 1);
    assert_eq!(report.total_required, 2);
    assert_eq!(report.completed, 1);
    assert_eq!(report.pending, 1);
    assert_eq!(report.completion_rate, 50.0);

    let again = check_follow_up_integrity(&store).unwrap();
    assert_eq!(again.fixed, 0, "second check has nothing to repair");
}

/// A typed follow-up action stores a connected child call and closes the parent.
#[test]
fn typed_follow_up_action_closes_parent() {
    let (store, id) = store_with_customer();
    let parent = record_call(&store, &call_needing_follow_up(id), &agent("agent1"), &clock()).unwrap();

    let action = FollowUpAction {
        scheduled_date: NaiveDate::from_ymd_opt(2024, 6, 5),
        ..FollowUpAction::new(Some(FollowUpActionType::VisitScheduled), "visit booked for friday")
    };
    let outcome = add_follow_up(&store, parent.call_id, &action, &agent("agent2"), &clock()).unwrap();

    assert!(outcome.parent_completed);
    let child_id = outcome.child_call_id.expect("typed action stores a call");
    let child = store.get_call_record(child_id).unwrap();
    assert_eq!(child.parent_call_id, Some(parent.call_id));
    assert_eq!(child.call_result, CallResult::Connected);
    assert_eq!(child.notes, "[follow-up] visit booked for friday");
    assert_eq!(child.caller, "agent2");
    assert!(store.get_call_record(parent.call_id).unwrap().follow_up_completed);
    assert_eq!(
        store.get_customer(id).unwrap().contact_status,
        ContactStatus::Contacted,
        "follow-up actions leave contact status alone"
    );

    let logged = store.follow_up_actions_for_call(parent.call_id).unwrap();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].id, outcome.action_id);
    assert_eq!(logged[0].action_type, Some(FollowUpActionType::VisitScheduled));
    assert_eq!(logged[0].scheduled_date, NaiveDate::from_ymd_opt(2024, 6, 5));
}

/// An untyped action is only a note.
#[test]
fn untyped_follow_up_action_is_a_note() {
    let (store, id) = store_with_customer();
    let parent = record_call(&store, &call_needing_follow_up(id), &agent("agent1"), &clock()).unwrap();

    let outcome = add_follow_up(
        &store,
        parent.call_id,
        &FollowUpAction::new(None, "left a message with reception"),
        &agent("agent1"),
        &clock(),
    )
    .unwrap();

    assert_eq!(outcome.child_call_id, None);
    assert!(!outcome.parent_completed);
    assert!(!store.get_call_record(parent.call_id).unwrap().follow_up_completed);
    assert_eq!(store.calls_for_customer(id).unwrap().len(), 1);
    assert_eq!(store.follow_up_actions_for_call(parent.call_id).unwrap().len(), 1);
}

/// Follow-up actions need notes and a live call.
#[test]
fn follow_up_action_needs_notes_and_live_call() {
    let (store, id) = store_with_customer();
    let parent = record_call(&store, &call_needing_follow_up(id), &agent("agent1"), &clock()).unwrap();
    let closed = FollowUpAction::new(Some(FollowUpActionType::Closed), "");
    let err = add_follow_up(&store, parent.call_id, &closed, &agent("agent1"), &clock()).unwrap_err();
    assert!(matches!(err, CrmError::InvalidInput(_)), "got {err}");

    let note = FollowUpAction::new(Some(FollowUpActionType::Closed), "done");
    let err = add_follow_up(&store, 999, &note, &agent("agent1"), &clock()).unwrap_err();
    assert!(matches!(err, CrmError::CallRecordNotFound { id: 999 }), "got {err}");

    delete_call(&store, parent.call_id, &agent("agent1"), &clock()).unwrap();
    let err = add_follow_up(&store, parent.call_id, &note, &agent("agent1"), &clock()).unwrap_err();
    assert!(matches!(err, CrmError::CallRecordNotFound { .. }), "got {err}");
    assert!(store.follow_up_actions_for_call(parent.call_id).unwrap().is_empty());
}
