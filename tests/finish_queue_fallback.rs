use std::cell::RefCell;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use chamadad::api::{ApiError, BatchSink, RosterProvider};
use chamadad::db;
use chamadad::model::{AttendanceRecord, PeriodMarks, SessionParams, Student};
use chamadad::queue::OfflineQueue;
use chamadad::session::{AttendanceSession, FinishOutcome, Phase, SessionEvent};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

struct FixedRoster(Vec<Student>);

impl RosterProvider for FixedRoster {
    fn roster(&self, _class_id: &str) -> Result<Vec<Student>, ApiError> {
        Ok(self.0.clone())
    }
}

struct OfflineSink;

impl BatchSink for OfflineSink {
    fn submit(&self, _records: &[AttendanceRecord]) -> Result<(), ApiError> {
        Err(ApiError::Transport("sem conexao".into()))
    }
}

struct RejectingSink;

impl BatchSink for RejectingSink {
    fn submit(&self, _records: &[AttendanceRecord]) -> Result<(), ApiError> {
        Err(ApiError::Server("planilha bloqueada".into()))
    }
}

struct CapturingSink(RefCell<Vec<Vec<AttendanceRecord>>>);

impl BatchSink for CapturingSink {
    fn submit(&self, records: &[AttendanceRecord]) -> Result<(), ApiError> {
        self.0.borrow_mut().push(records.to_vec());
        Ok(())
    }
}

fn walked_session() -> AttendanceSession {
    let roster = FixedRoster(vec![
        Student {
            id: "A1".into(),
            display_name: "Ana".into(),
        },
        Student {
            id: "A2".into(),
            display_name: "Bruno".into(),
        },
    ]);
    let mut session = AttendanceSession::new(SessionParams {
        teacher_id: "P1".into(),
        class_id: "T1".into(),
        subject_id: "D1".into(),
        date: "2025-03-10".into(),
    })
    .unwrap();
    session.load_roster(&roster).unwrap();
    session
        .record_and_advance(PeriodMarks::default(), "")
        .unwrap();
    session
        .record_and_advance(PeriodMarks::default(), "")
        .unwrap();
    session
}

#[test]
fn transport_failure_completes_and_parks_the_batch() {
    let workspace = temp_dir("chamada-fallback-transport");
    let conn = db::open_db(&workspace).unwrap();
    let queue = OfflineQueue::new(&conn);

    let mut session = walked_session();
    let submitted = session.records().to_vec();

    let outcome = session
        .finish(PeriodMarks::default(), "", &OfflineSink, &queue)
        .expect("finish never fails on a network error");
    assert_eq!(outcome, FinishOutcome::Queued { count: 2 });
    assert_eq!(session.phase(), Phase::Completed);

    let pending = queue.pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].records, submitted);
}

#[test]
fn server_rejection_is_also_deferred_not_lost() {
    let workspace = temp_dir("chamada-fallback-server");
    let conn = db::open_db(&workspace).unwrap();
    let queue = OfflineQueue::new(&conn);

    let mut session = walked_session();
    let outcome = session
        .finish(PeriodMarks::default(), "", &RejectingSink, &queue)
        .unwrap();
    assert_eq!(outcome, FinishOutcome::Queued { count: 2 });
    assert_eq!(queue.pending().unwrap().len(), 1);
}

#[test]
fn finished_event_reports_queued_delivery() {
    let workspace = temp_dir("chamada-fallback-event");
    let conn = db::open_db(&workspace).unwrap();
    let queue = OfflineQueue::new(&conn);

    let mut session = walked_session();
    let events = std::rc::Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    session.subscribe(Box::new(move |e| sink.borrow_mut().push(e.clone())));

    session
        .finish(PeriodMarks::default(), "", &OfflineSink, &queue)
        .unwrap();
    assert_eq!(
        events.borrow().last(),
        Some(&SessionEvent::SessionFinished { queued: true })
    );
}

#[test]
fn queued_batch_drains_once_connectivity_returns() {
    let workspace = temp_dir("chamada-fallback-drain");
    let conn = db::open_db(&workspace).unwrap();
    let queue = OfflineQueue::new(&conn);

    let mut session = walked_session();
    session
        .finish(PeriodMarks::default(), "", &OfflineSink, &queue)
        .unwrap();

    let sink = CapturingSink(RefCell::new(Vec::new()));
    let report = queue.drain(&sink).unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(report.remaining, 0);
    assert!(queue.is_empty().unwrap());
    assert_eq!(sink.0.borrow()[0].len(), 2);
}
