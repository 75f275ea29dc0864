//! Session flows driven end to end over an in-memory serial link.

use airpump_core::{MemorySink, ServiceKind};
use airpump_protocol::ProtocolEvent;
use airpump_serial::mock::{MockDevice, MockOpener};
use airpump_serial::{ConnectionManager, SerialError};
use airpump_session::{Session, SessionDriver, SessionError, SessionState, reduce};
use proptest::prelude::*;
use std::sync::Arc;

const PATH: &str = "/dev/ttyUSB0";

async fn connected() -> (Arc<ConnectionManager<MockOpener>>, MockDevice) {
    let (opener, mut handle) = MockOpener::new();
    let manager = Arc::new(ConnectionManager::with_opener(opener));
    manager.open(PATH, 115_200).await.unwrap();
    let device = handle.next_device().await.unwrap();
    (manager, device)
}

fn driver(
    session: Session,
    manager: &Arc<ConnectionManager<MockOpener>>,
) -> SessionDriver<MemorySink, MockOpener> {
    SessionDriver::new(session, manager.clone(), MemorySink::new())
}

fn inflation_session(target: f64) -> Session {
    Session::builder(ServiceKind::Inflation)
        .with_price(30)
        .with_target(target)
        .with_details("205/55R16 (front)")
        .build()
}

/// Write a marker line so the device can tell that nothing else was sent
/// before it.
async fn expect_only(
    manager: &ConnectionManager<MockOpener>,
    device: &mut MockDevice,
    lines: &[&str],
) {
    manager.write("MARK").await.unwrap();
    for expected in lines {
        assert_eq!(device.read_line().await.as_deref(), Some(*expected));
    }
    assert_eq!(device.read_line().await.as_deref(), Some("MARK"));
}

// ============================================================================
// Payment
// ============================================================================

#[tokio::test]
async fn test_payment_command_sent_once() {
    let (manager, mut device) = connected().await;
    let mut driver = driver(Session::new(ServiceKind::TireInfo, 10), &manager);

    driver.begin().await.unwrap();
    driver.begin().await.unwrap();
    driver.begin().await.unwrap();

    expect_only(&manager, &mut device, &["PAYMENT:10"]).await;
}

#[tokio::test]
async fn test_payment_uses_absolute_running_total() {
    let (manager, mut device) = connected().await;
    let lines = manager.subscribe();
    let mut driver = driver(Session::new(ServiceKind::TireInfo, 10), &manager);
    driver.begin().await.unwrap();

    for line in ["INSERTED: 5", "INSERTED:10.9", "PAYMENT COMPLETE"] {
        device.send_line(line).await.unwrap();
    }

    assert_eq!(driver.run(lines).await, SessionState::Completed);

    let inserted: Vec<u32> = driver
        .session()
        .history()
        .iter()
        .filter_map(|t| match t.to {
            SessionState::Payment { inserted, .. } => Some(inserted),
            _ => None,
        })
        .collect();
    assert_eq!(inserted, vec![5, 10]);

    let records = driver.sink().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].service, ServiceKind::TireInfo);
    assert_eq!(records[0].amount, 10);
}

#[tokio::test]
async fn test_free_service_skips_payment() {
    let (manager, mut device) = connected().await;
    let mut driver = driver(Session::new(ServiceKind::DotCheck, 0), &manager);

    driver.begin().await.unwrap();
    driver.begin().await.unwrap();

    assert_eq!(driver.state(), SessionState::Completed);
    expect_only(&manager, &mut device, &[]).await;

    let records = driver.sink().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].amount, 0);
}

#[tokio::test]
async fn test_free_inflation_still_inflates() {
    let (manager, mut device) = connected().await;
    let lines = manager.subscribe();
    let session = Session::builder(ServiceKind::Inflation)
        .with_price(0)
        .with_target(32.0)
        .build();
    let mut driver = driver(session, &manager);

    driver.begin().await.unwrap();
    assert_eq!(driver.state(), SessionState::Connect);
    assert!(driver.sink().is_empty());

    driver.confirm_connected().unwrap();
    assert!(driver.start_inflation().await.unwrap());
    expect_only(&manager, &mut device, &["INFLATE:32"]).await;

    device.send_line("PRESSURE:32").await.unwrap();
    assert_eq!(driver.run(lines).await, SessionState::Completed);

    let records = driver.sink().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].service, ServiceKind::Inflation);
    assert_eq!(records[0].amount, 0);
}

#[tokio::test]
async fn test_begin_without_link_reports_write_error() {
    let (opener, _handle) = MockOpener::new();
    let manager = Arc::new(ConnectionManager::with_opener(opener));
    let mut driver = driver(Session::new(ServiceKind::TireInfo, 10), &manager);

    let err = driver.begin().await.unwrap_err();
    assert!(matches!(err, SessionError::Serial(SerialError::NotOpen)));
    assert_eq!(
        driver.state(),
        SessionState::Payment {
            required: 10,
            inserted: 0
        }
    );
    assert!(driver.sink().is_empty());
}

// ============================================================================
// Inflation
// ============================================================================

#[tokio::test]
async fn test_inflation_completes_on_reaching_target() {
    let (manager, mut device) = connected().await;
    let mut lines = manager.subscribe();
    let mut driver = driver(inflation_session(32.0), &manager);
    let watch = driver.watch();

    driver.begin().await.unwrap();
    assert_eq!(device.read_line().await.as_deref(), Some("PAYMENT:30"));

    device.send_line("INSERTED:30").await.unwrap();
    device.send_line("PAYMENT COMPLETE").await.unwrap();
    let state = driver
        .run_until(&mut lines, |s| *s == SessionState::Connect)
        .await;
    assert_eq!(state, SessionState::Connect);

    driver.confirm_connected().unwrap();
    assert!(driver.start_inflation().await.unwrap());
    assert!(!driver.start_inflation().await.unwrap());
    assert_eq!(device.read_line().await.as_deref(), Some("INFLATE:32"));

    // No completion keyword: the reading alone finishes the session.
    for line in ["PRESSURE:24", "PRESSURE:29.6", "PRESSURE:32"] {
        device.send_line(line).await.unwrap();
    }
    assert_eq!(driver.run(lines).await, SessionState::Completed);
    assert_eq!(*watch.borrow(), SessionState::Completed);

    let records = driver.sink().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].service, ServiceKind::Inflation);
    assert_eq!(records[0].amount, 30);
    assert_eq!(records[0].details.as_deref(), Some("205/55R16 (front)"));
}

#[tokio::test]
async fn test_inflation_completes_on_keyword() {
    let (manager, mut device) = connected().await;
    let lines = manager.subscribe();
    let mut driver = driver(inflation_session(35.0), &manager);

    driver.handle_line("PAYMENT COMPLETE").await;
    driver.confirm_connected().unwrap();
    driver.start_inflation().await.unwrap();
    assert_eq!(device.read_line().await.as_deref(), Some("INFLATE:35"));

    device.send_line("PRESSURE:30").await.unwrap();
    device.send_line("Target reached").await.unwrap();

    assert_eq!(driver.run(lines).await, SessionState::Completed);
    let last = driver.session().last_transitions(2);
    assert!(last[0].to.is_inflation_done());
}

#[tokio::test]
async fn test_readings_before_start_are_ignored() {
    let (manager, _device) = connected().await;
    let mut driver = driver(inflation_session(32.0), &manager);

    driver.handle_line("PAYMENT COMPLETE").await;
    driver.confirm_connected().unwrap();

    let state = driver.handle_line("PRESSURE:40").await;
    assert_eq!(
        state,
        SessionState::Inflate {
            target: 32,
            current: None,
            started: false,
            completed: false,
        }
    );
}

#[tokio::test]
async fn test_invalid_target_sends_nothing() {
    let (manager, mut device) = connected().await;
    let mut driver = driver(inflation_session(0.0), &manager);

    driver.handle_line("PAYMENT COMPLETE").await;
    driver.confirm_connected().unwrap();

    let err = driver.start_inflation().await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidTarget(_)));
    assert!(matches!(
        driver.state(),
        SessionState::Inflate { started: false, .. }
    ));

    expect_only(&manager, &mut device, &[]).await;
}

#[tokio::test]
async fn test_start_before_payment_is_rejected() {
    let (manager, _device) = connected().await;
    let mut driver = driver(inflation_session(32.0), &manager);

    let err = driver.start_inflation().await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidTransition { .. }));
}

// ============================================================================
// Line handling
// ============================================================================

#[tokio::test]
async fn test_noise_does_not_change_state() {
    let (manager, mut device) = connected().await;
    let lines = manager.subscribe();
    let mut driver = driver(Session::new(ServiceKind::DotCheck, 10), &manager);

    for line in [
        "arduino boot v1.2",
        "INSERTED: abc",
        "",
        "PRESSURE:",
        "\u{fffd}\u{fffd}",
        "PAYMENT COMPLETE",
    ] {
        device.send_raw(format!("{line}\r\n").as_bytes()).await.unwrap();
    }

    assert_eq!(driver.run(lines).await, SessionState::Completed);
    assert_eq!(driver.session().history().len(), 1);
}

// ============================================================================
// Reducer properties
// ============================================================================

fn event() -> impl Strategy<Value = ProtocolEvent> {
    prop_oneof![
        (0u32..100).prop_map(|amount_so_far| ProtocolEvent::PaymentInserted { amount_so_far }),
        Just(ProtocolEvent::PaymentComplete),
        (0u32..80).prop_map(|psi| ProtocolEvent::PressureReading { psi }),
        Just(ProtocolEvent::InflationComplete),
        "[ -~]{0,16}".prop_map(|raw| ProtocolEvent::Unrecognized { raw }),
    ]
}

fn service() -> impl Strategy<Value = ServiceKind> {
    prop_oneof![
        Just(ServiceKind::TireInfo),
        Just(ServiceKind::DotCheck),
        Just(ServiceKind::Inflation),
    ]
}

proptest! {
    #[test]
    fn prop_completed_is_absorbing(service in service(), events in prop::collection::vec(event(), 0..32)) {
        let mut state = SessionState::Completed;
        for event in &events {
            state = reduce(service, state, event);
        }
        prop_assert_eq!(state, SessionState::Completed);
    }

    #[test]
    fn prop_inserted_is_last_report(amounts in prop::collection::vec(0u32..500, 1..16)) {
        let mut state = SessionState::initial(ServiceKind::TireInfo, 1_000);
        for amount_so_far in &amounts {
            state = reduce(
                ServiceKind::TireInfo,
                state,
                &ProtocolEvent::PaymentInserted { amount_so_far: *amount_so_far },
            );
        }
        prop_assert_eq!(
            state,
            SessionState::Payment { required: 1_000, inserted: *amounts.last().unwrap() }
        );
    }

    #[test]
    fn prop_unrecognized_never_changes_state(
        service in service(),
        events in prop::collection::vec(event(), 0..16),
        raw in "[ -~]{0,32}",
    ) {
        let mut state = SessionState::initial(service, 20);
        for event in &events {
            state = reduce(service, state, event);
        }
        let after = reduce(service, state, &ProtocolEvent::Unrecognized { raw });
        prop_assert_eq!(after, state);
    }

    #[test]
    fn prop_reading_at_or_above_target_completes(target in 1u32..60, over in 0u32..20) {
        let state = SessionState::Inflate { target, current: None, started: true, completed: false };
        let state = reduce(
            ServiceKind::Inflation,
            state,
            &ProtocolEvent::PressureReading { psi: target + over },
        );
        prop_assert!(state.is_inflation_done());
    }

    #[test]
    fn prop_every_step_is_a_legal_transition(
        service in service(),
        events in prop::collection::vec(event(), 0..32),
    ) {
        let mut state = SessionState::initial(service, 20);
        for event in &events {
            let next = reduce(service, state, event);
            if next != state {
                prop_assert!(state.can_transition_to(&next), "{} -> {}", state, next);
            }
            state = next;
        }
    }
}
