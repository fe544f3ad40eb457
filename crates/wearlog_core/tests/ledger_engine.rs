use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rusqlite::Connection;
use std::sync::Barrier;
use std::thread;
use uuid::Uuid;
use wearlog_core::db::{open_db, open_db_in_memory};
use wearlog_core::{
    DayBoundaryZone, DerivedState, EventFilter, EventKind, EventStore, Garment, GarmentEvent,
    GarmentId, GarmentRepository, InMemoryEventStore, LedgerEngine, LedgerError, LedgerPhase,
    NewGarment, SqliteEventStore, SqliteGarmentRepository, StoreError, StoreResult, UserId,
};

fn utc() -> DayBoundaryZone {
    "UTC".parse().unwrap()
}

fn day(d: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 8, d, hour, 0, 0).unwrap()
}

fn memory_engine() -> (InMemoryEventStore, GarmentId) {
    let store = InMemoryEventStore::new();
    let id = Uuid::new_v4();
    store.register_garment(id).unwrap();
    (store, id)
}

fn insert_garment(conn: &Connection) -> GarmentId {
    let repo = SqliteGarmentRepository::try_new(conn).unwrap();
    let garment = Garment::create(
        UserId::new("uid-1").unwrap(),
        NewGarment {
            name: "Jeans".to_string(),
            image_ref: "garment-images/jeans.png".to_string(),
            size: Some("32".to_string()),
        },
        day(1, 0),
    )
    .unwrap();
    repo.create_garment(&garment).unwrap()
}

fn log_len(store: &impl EventStore, id: GarmentId) -> usize {
    store.query(id, &EventFilter::all()).unwrap().len()
}

#[test]
fn empty_log_derives_no_history() {
    let (store, id) = memory_engine();
    let engine = LedgerEngine::new(&store, utc());

    let state = engine.derive(id).unwrap();
    assert_eq!(
        state,
        DerivedState {
            last_wash_at: None,
            wears_since_last_wash: 0,
        }
    );
    assert_eq!(state.phase(), LedgerPhase::NoHistory);
}

#[test]
fn first_wear_on_empty_history_round_trips() {
    let (store, id) = memory_engine();
    let engine = LedgerEngine::new(&store, utc());

    let recorded = engine.record(id, EventKind::Wear, day(1, 8)).unwrap();
    assert_eq!(recorded.last_wash_at, None);
    assert_eq!(recorded.wears_since_last_wash, 1);
    assert_eq!(engine.derive(id).unwrap(), recorded);
    assert_eq!(recorded.phase(), LedgerPhase::NeverWashed(1));
}

#[test]
fn mixed_history_scenario_on_sqlite() {
    let conn = open_db_in_memory().unwrap();
    let id = insert_garment(&conn);
    let store = SqliteEventStore::try_new(&conn).unwrap();
    let engine = LedgerEngine::new(&store, utc());

    engine.record(id, EventKind::Wear, day(1, 8)).unwrap();
    let err = engine.record(id, EventKind::Wear, day(1, 19)).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::RejectedDuplicate { kind: EventKind::Wear, date }
            if date == NaiveDate::from_ymd_opt(2024, 8, 1).unwrap()
    ));
    engine.record(id, EventKind::Wear, day(2, 8)).unwrap();
    engine.record(id, EventKind::Wash, day(3, 8)).unwrap();
    let state = engine.record(id, EventKind::Wear, day(4, 8)).unwrap();

    assert_eq!(state.last_wash_at, Some(day(3, 8)));
    assert_eq!(state.wears_since_last_wash, 1);
    assert_eq!(log_len(&store, id), 4);
}

#[test]
fn derive_is_repeatable_without_writes() {
    let (store, id) = memory_engine();
    let engine = LedgerEngine::new(&store, utc());
    engine.record(id, EventKind::Wear, day(1, 8)).unwrap();
    engine.record(id, EventKind::Wash, day(2, 8)).unwrap();
    engine.record(id, EventKind::Wear, day(3, 8)).unwrap();

    let first = engine.derive(id).unwrap();
    for _ in 0..5 {
        assert_eq!(engine.derive(id).unwrap(), first);
    }
    assert_eq!(log_len(&store, id), 3);
}

#[test]
fn wash_resets_count_and_sets_last_wash() {
    let (store, id) = memory_engine();
    let engine = LedgerEngine::new(&store, utc());
    for d in 1..=4 {
        engine.record(id, EventKind::Wear, day(d, 8)).unwrap();
    }

    let state = engine.record(id, EventKind::Wash, day(5, 21)).unwrap();
    assert_eq!(state.wears_since_last_wash, 0);
    assert_eq!(state.last_wash_at, Some(day(5, 21)));
    assert_eq!(state.phase(), LedgerPhase::SinceWash(0));
}

#[test]
fn wear_and_wash_on_same_day_are_independent() {
    let (store, id) = memory_engine();
    let engine = LedgerEngine::new(&store, utc());

    engine.record(id, EventKind::Wear, day(6, 8)).unwrap();
    let state = engine.record(id, EventKind::Wash, day(6, 22)).unwrap();
    assert_eq!(state.wears_since_last_wash, 0);
    assert!(!engine.can_log(id, EventKind::Wear, day(6, 23)).unwrap());
    assert!(!engine.can_log(id, EventKind::Wash, day(6, 23)).unwrap());
    assert!(engine.can_log(id, EventKind::Wear, day(7, 0)).unwrap());
}

#[test]
fn wear_count_grows_monotonically_between_washes() {
    let (store, id) = memory_engine();
    let engine = LedgerEngine::new(&store, utc());
    engine.record(id, EventKind::Wash, day(1, 8)).unwrap();

    let mut previous = 0;
    for d in 2..=9 {
        let state = engine.record(id, EventKind::Wear, day(d, 8)).unwrap();
        assert!(state.wears_since_last_wash >= previous);
        assert_eq!(state.wears_since_last_wash, d - 1);
        previous = state.wears_since_last_wash;
    }
}

#[test]
fn can_log_is_read_only() {
    let (store, id) = memory_engine();
    let engine = LedgerEngine::new(&store, utc());

    assert!(engine.can_log(id, EventKind::Wash, day(3, 9)).unwrap());
    assert!(engine.can_log(id, EventKind::Wash, day(3, 17)).unwrap());
    assert_eq!(log_len(&store, id), 0);
}

#[test]
fn closed_gate_rejects_record_and_keeps_log_length() {
    let (store, id) = memory_engine();
    let engine = LedgerEngine::new(&store, utc());
    engine.record(id, EventKind::Wear, day(3, 9)).unwrap();
    let before = engine.derive(id).unwrap();

    assert!(!engine.can_log(id, EventKind::Wear, day(3, 23)).unwrap());
    let err = engine.record(id, EventKind::Wear, day(3, 23)).unwrap_err();
    assert!(matches!(err, LedgerError::RejectedDuplicate { .. }));
    assert_eq!(log_len(&store, id), 1);
    assert_eq!(engine.derive(id).unwrap(), before);
}

#[test]
fn day_boundary_follows_configured_zone() {
    let (store, id) = memory_engine();
    let tokyo = LedgerEngine::new(&store, "Asia/Tokyo".parse().unwrap());

    // 2024-08-01 14:00 UTC is 23:00 in Tokyo; 16:00 UTC is already Aug 2 there.
    tokyo.record(id, EventKind::Wear, day(1, 14)).unwrap();
    assert!(tokyo.can_log(id, EventKind::Wear, day(1, 16)).unwrap());
    tokyo.record(id, EventKind::Wear, day(1, 16)).unwrap();

    let utc_engine = LedgerEngine::new(&store, utc());
    assert!(!utc_engine.can_log(id, EventKind::Wear, day(1, 20)).unwrap());
    assert_eq!(utc_engine.derive(id).unwrap().wears_since_last_wash, 2);
}

#[test]
fn window_edges_are_half_open() {
    let (store, id) = memory_engine();
    let engine = LedgerEngine::new(&store, utc());
    let midnight = Utc.with_ymd_and_hms(2024, 8, 10, 0, 0, 0).unwrap();

    engine
        .record(id, EventKind::Wash, midnight - Duration::milliseconds(1))
        .unwrap();
    assert!(engine.can_log(id, EventKind::Wash, midnight).unwrap());
    engine.record(id, EventKind::Wash, midnight).unwrap();
    assert!(!engine
        .can_log(id, EventKind::Wash, midnight + Duration::hours(23))
        .unwrap());
}

#[test]
fn daily_eligibility_reports_both_kinds() {
    let (store, id) = memory_engine();
    let engine = LedgerEngine::new(&store, utc());
    engine.record(id, EventKind::Wear, day(5, 7)).unwrap();

    let eligibility = engine.daily_eligibility(id, day(5, 12)).unwrap();
    assert_eq!(eligibility.date, NaiveDate::from_ymd_opt(2024, 8, 5).unwrap());
    assert!(!eligibility.can_wear);
    assert!(eligibility.can_wash);
    assert!(eligibility.allows(EventKind::Wash));
}

#[test]
fn unknown_garment_is_not_found_for_every_operation() {
    let store = InMemoryEventStore::new();
    let engine = LedgerEngine::new(&store, utc());
    let missing = Uuid::new_v4();

    assert!(matches!(engine.derive(missing), Err(LedgerError::NotFound(id)) if id == missing));
    assert!(matches!(
        engine.can_log(missing, EventKind::Wear, day(1, 8)),
        Err(LedgerError::NotFound(_))
    ));
    assert!(matches!(
        engine.record(missing, EventKind::Wash, day(1, 8)),
        Err(LedgerError::NotFound(_))
    ));
}

/// Store whose backing service is always down.
struct DownStore;

impl EventStore for DownStore {
    fn append(&self, _event: &GarmentEvent) -> StoreResult<()> {
        Err(StoreError::LockPoisoned)
    }

    fn query(&self, _garment_id: GarmentId, _filter: &EventFilter) -> StoreResult<Vec<GarmentEvent>> {
        Err(StoreError::LockPoisoned)
    }
}

#[test]
fn unavailable_store_is_surfaced_not_masked() {
    let engine = LedgerEngine::new(DownStore, utc());
    let id = Uuid::new_v4();

    assert!(matches!(engine.derive(id), Err(LedgerError::StoreUnavailable(_))));
    assert!(matches!(
        engine.record(id, EventKind::Wear, day(1, 8)),
        Err(LedgerError::StoreUnavailable(_))
    ));
}

/// Store that only implements the two required operations, so `record`
/// goes through the default check-then-append path.
struct PlainStore(InMemoryEventStore);

impl EventStore for PlainStore {
    fn append(&self, event: &GarmentEvent) -> StoreResult<()> {
        self.0.append(event)
    }

    fn query(&self, garment_id: GarmentId, filter: &EventFilter) -> StoreResult<Vec<GarmentEvent>> {
        self.0.query(garment_id, filter)
    }
}

#[test]
fn default_conditional_append_still_gates_sequential_writes() {
    let (inner, id) = memory_engine();
    let engine = LedgerEngine::new(PlainStore(inner), utc());

    engine.record(id, EventKind::Wash, day(2, 8)).unwrap();
    let err = engine.record(id, EventKind::Wash, day(2, 9)).unwrap_err();
    assert!(matches!(err, LedgerError::RejectedDuplicate { .. }));
    assert_eq!(engine.derive(id).unwrap().last_wash_at, Some(day(2, 8)));
}

const RACERS: usize = 8;

fn race_same_day_wears(
    racers: usize,
    record: impl Fn() -> Result<DerivedState, LedgerError> + Sync,
) -> Vec<Result<DerivedState, LedgerError>> {
    let barrier = Barrier::new(racers);
    thread::scope(|scope| {
        let handles: Vec<_> = (0..racers)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    record()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    })
}

fn assert_single_winner(results: &[Result<DerivedState, LedgerError>]) {
    let winners = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(winners, 1, "results: {results:?}");
    for result in results {
        match result {
            Ok(_)
            | Err(LedgerError::RejectedDuplicate { .. })
            | Err(LedgerError::StoreUnavailable(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}

#[test]
fn concurrent_same_day_records_write_once_in_memory() {
    let (store, id) = memory_engine();

    for d in 5..=7 {
        let results = race_same_day_wears(RACERS, || {
            LedgerEngine::new(&store, utc()).record(id, EventKind::Wear, day(d, 9))
        });
        assert_single_winner(&results);
    }

    let log = store.query(id, &EventFilter::all()).unwrap();
    assert_eq!(log.len(), 3, "one wear per day");
}

#[test]
fn concurrent_same_day_records_write_once_on_sqlite_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wearlog.sqlite3");
    let id = insert_garment(&open_db(&path).unwrap());

    for d in 5..=7 {
        let results = race_same_day_wears(RACERS, || {
            let conn = open_db(&path).unwrap();
            let store = SqliteEventStore::try_new(&conn).unwrap();
            LedgerEngine::new(store, utc()).record(id, EventKind::Wear, day(d, 9))
        });
        assert_single_winner(&results);
    }

    let conn = open_db(&path).unwrap();
    let store = SqliteEventStore::try_new(&conn).unwrap();
    for d in 5..=7 {
        let same_day = EventFilter::of_kind(EventKind::Wear).between(day(d, 0), day(d, 23));
        assert_eq!(store.query(id, &same_day).unwrap().len(), 1);
    }
    assert_eq!(log_len(&store, id), 3);
}
