//! Session Tests
//!
//! End-to-end tests: session -> store -> throttle -> API -> channel -> simulated host.

use std::sync::Arc;
use std::time::Duration;

use aqua::coordinator::WriteOutcome;
use aqua::ipc::{Fault, Inbox, ReplyPayload, SimulatedEqualizer};
use aqua::state::{EqualizerState, Filter, FilterId, FilterType, Filters};
use aqua::{AquaConfig, AquaError, EqualizerSession, ErrorCode};
use pretty_assertions::assert_eq;
use test_case::test_case;

struct Rig {
    session: EqualizerSession,
    host: Arc<SimulatedEqualizer>,
    inbox: Inbox,
}

fn rig_with(initial: &EqualizerState, config: AquaConfig) -> Rig {
    let inbox = Inbox::new();
    let host = Arc::new(SimulatedEqualizer::new(inbox.clone(), initial));
    let session = EqualizerSession::connect(host.clone(), inbox.clone(), config);
    Rig {
        session,
        host,
        inbox,
    }
}

/// Default host state, health check already done
async fn ready_rig() -> Rig {
    let rig = rig_with(&EqualizerState::default(), AquaConfig::default());
    rig.session.health_check().await.unwrap();
    rig
}

fn sent_to(host: &SimulatedEqualizer, command: &str) -> Vec<Vec<i64>> {
    host.received()
        .into_iter()
        .filter(|e| e.command() == command)
        .map(|e| e.args)
        .collect()
}

fn three_band_state() -> EqualizerState {
    EqualizerState {
        is_enabled: true,
        is_auto_pre_amp_on: false,
        is_graph_view_on: true,
        pre_amp: -2.5,
        filters: vec![
            Filter::new(FilterId::new(), 100.0, 3.0, 0.7, FilterType::LowShelfCornerQ),
            Filter::new(FilterId::new(), 1000.0, -4.5, 2.0, FilterType::Peak),
            Filter::new(FilterId::new(), 8000.0, 0.0, 1.0, FilterType::HighShelfCornerQ),
        ]
        .into(),
    }
}

// === Health Check ===

#[tokio::test]
async fn test_health_check_initialises_store() {
    let initial = three_band_state();
    let rig = rig_with(&initial, AquaConfig::default());
    assert!(rig.session.store().is_loading());

    rig.session.health_check().await.unwrap();

    assert_eq!(*rig.session.snapshot(), initial);
    let status = rig.session.store().status();
    assert!(!status.is_loading);
    assert!(status.global_error.is_none());
}

#[tokio::test]
async fn test_failed_health_check_raises_then_recovers() {
    let rig = rig_with(&EqualizerState::default(), AquaConfig::default());
    rig.host.set_fault(Some(Fault::NotRunning));

    let err = rig.session.health_check().await.unwrap_err();
    assert_eq!(err, AquaError::from(ErrorCode::NotRunning));
    let status = rig.session.store().status();
    assert!(!status.is_loading);
    assert_eq!(status.global_error.map(|d| d.code), Some(ErrorCode::NotRunning));

    rig.host.set_fault(None);
    rig.session.health_check().await.unwrap();
    assert!(rig.session.store().global_error().is_none());
}

#[test_case(Fault::NotInstalled, ErrorCode::NotInstalled ; "not installed")]
#[test_case(Fault::NotRunning, ErrorCode::NotRunning ; "not running")]
#[test_case(Fault::NotReady, ErrorCode::NotReady ; "not ready")]
#[test_case(Fault::Malformed, ErrorCode::Unknown ; "malformed reply")]
#[tokio::test]
async fn test_fault_maps_to_error_code(fault: Fault, expected: ErrorCode) {
    let rig = ready_rig().await;
    let id = rig.session.snapshot().filters.ids()[0];
    rig.host.set_fault(Some(fault));

    let err = rig.session.set_type(id, FilterType::Notch).await.unwrap_err();

    assert_eq!(err.description().map(|d| d.code), Some(expected));
    assert_eq!(rig.session.store().global_error().map(|d| d.code), Some(expected));
}

// === Writes ===

#[tokio::test]
async fn test_out_of_range_gain_sends_nothing() {
    let rig = ready_rig().await;
    let id = rig.session.snapshot().filters.ids()[3];
    let before = rig.host.received_count();

    let err = rig.session.set_gain(id, 45.0).await.unwrap_err();

    assert_eq!(err.error_code(), "INVALID_ARGUMENT");
    assert_eq!(rig.host.received_count(), before);
    assert_eq!(rig.session.snapshot().filters.get(id).unwrap().gain, 0.0);
    assert!(rig.session.store().global_error().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_gain_is_visible_before_reply() {
    let rig = ready_rig().await;
    rig.host.set_latency(Duration::from_millis(200));
    let id = rig.session.snapshot().filters.ids()[5];
    let before = rig.host.received_count();

    let write = rig.session.set_gain(id, 20.0);
    let observe = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(rig.inbox.pending_count(), 1);
        rig.session.snapshot().filters.get(id).unwrap().gain
    };
    let (outcome, seen) = tokio::join!(write, observe);

    assert_eq!(outcome.unwrap(), WriteOutcome::Sent);
    assert_eq!(seen, 20.0);
    assert_eq!(rig.host.received_count(), before + 1);
    assert_eq!(sent_to(&rig.host, "setFilterGain"), vec![vec![5, 20_000]]);
}

#[tokio::test(start_paused = true)]
async fn test_throttle_schedule_sends_first_and_latest() {
    let rig = ready_rig().await;
    let id = rig.session.snapshot().filters.ids()[2];
    let mut rx = rig.session.store().subscribe();

    let mut outcomes = Vec::new();
    let mut seen = Vec::new();
    let mut last = 0;
    for (at, value) in [(0, 1.0), (30, 2.0), (60, 3.0), (130, 4.0)] {
        tokio::time::advance(Duration::from_millis(at - last)).await;
        last = at;
        outcomes.push(rig.session.set_gain(id, value).await.unwrap());
        seen.push(rx.borrow_and_update().filters.get(id).unwrap().gain);
    }

    assert_eq!(
        outcomes,
        vec![
            WriteOutcome::Sent,
            WriteOutcome::Throttled,
            WriteOutcome::Throttled,
            WriteOutcome::Sent
        ]
    );
    assert_eq!(seen, vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(
        sent_to(&rig.host, "setFilterGain"),
        vec![vec![2, 1_000], vec![2, 4_000]]
    );
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_write_blocks_the_next() {
    let rig = ready_rig().await;
    rig.host.set_latency(Duration::from_millis(150));
    let id = rig.session.snapshot().filters.ids()[0];

    let first = rig.session.set_frequency(id, 40.0);
    let second = async {
        tokio::time::sleep(Duration::from_millis(120)).await;
        rig.session.set_frequency(id, 45.0).await
    };
    let (a, b) = tokio::join!(first, second);

    assert_eq!(a.unwrap(), WriteOutcome::Sent);
    assert_eq!(b.unwrap(), WriteOutcome::Throttled);
    assert_eq!(rig.session.snapshot().filters.get(id).unwrap().frequency, 45.0);
    assert_eq!(sent_to(&rig.host, "setFilterFrequency"), vec![vec![0, 40]]);
}

#[tokio::test(start_paused = true)]
async fn test_parameters_throttle_independently() {
    let rig = ready_rig().await;
    let ids = rig.session.snapshot().filters.ids();

    assert_eq!(rig.session.set_gain(ids[0], 1.0).await.unwrap(), WriteOutcome::Sent);
    assert_eq!(rig.session.set_gain(ids[1], 1.0).await.unwrap(), WriteOutcome::Sent);
    assert_eq!(rig.session.set_quality(ids[0], 2.0).await.unwrap(), WriteOutcome::Sent);
    assert_eq!(rig.session.set_preamp(-1.0).await.unwrap(), WriteOutcome::Sent);
}

// === Timeouts ===

#[tokio::test(start_paused = true)]
async fn test_timeout_leaves_no_listener() {
    let rig = ready_rig().await;
    rig.host.set_fault(Some(Fault::Silent));

    let err = rig.session.api().get_preamp().await.unwrap_err();
    assert_eq!(err, AquaError::from(ErrorCode::Timeout));
    assert_eq!(rig.inbox.pending_count(), 0);

    // the host finally answers the abandoned call
    let stale = rig.host.received().pop().unwrap();
    assert!(!rig.inbox.deliver(stale.reply(ReplyPayload::value(1))));

    // the next call on the same channel resolves once, with its own reply
    rig.host.set_fault(None);
    assert_eq!(rig.session.api().get_preamp().await.unwrap(), 0.0);
    assert_eq!(rig.inbox.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_write_keeps_optimistic_value() {
    let rig = ready_rig().await;
    let id = rig.session.snapshot().filters.ids()[1];
    rig.host.set_fault(Some(Fault::Silent));

    let start = tokio::time::Instant::now();
    let err = rig.session.set_gain(id, -6.0).await.unwrap_err();

    assert!(start.elapsed() >= Duration::from_secs(10));
    assert_eq!(err.description().map(|d| d.code), Some(ErrorCode::Timeout));
    assert_eq!(rig.session.snapshot().filters.get(id).unwrap().gain, -6.0);
    assert_eq!(
        rig.session.store().global_error().map(|d| d.code),
        Some(ErrorCode::Timeout)
    );
}

// === Bands ===

#[tokio::test]
async fn test_add_and_remove_band() {
    let rig = ready_rig().await;

    let id = rig.session.add_band(Some(3000.0)).await.unwrap();
    assert_eq!(rig.session.snapshot().filters.len(), 11);
    assert_eq!(rig.session.snapshot().filters.index_of(id), Some(10));
    assert_eq!(rig.host.host_state().filters.len(), 11);
    assert_eq!(rig.host.host_state().filters.entries()[10].frequency, 3000.0);

    rig.session.remove_band(id).await.unwrap();
    assert_eq!(rig.session.snapshot().filters.len(), 10);
    assert_eq!(rig.host.host_state().filters.len(), 10);

    let err = rig.session.remove_band(id).await.unwrap_err();
    assert_eq!(err.error_code(), "UNKNOWN_FILTER");
}

#[tokio::test]
async fn test_add_band_suggests_frequency() {
    let rig = ready_rig().await;
    let id = rig.session.add_band(None).await.unwrap();

    // geometric mean of the 16 kHz band and the 20 kHz ceiling
    assert_eq!(rig.session.snapshot().filters.get(id).unwrap().frequency, 17889.0);
}

#[tokio::test]
async fn test_band_limits_fail_before_sending() {
    let single = EqualizerState {
        filters: vec![Filter::with_frequency(FilterId::new(), 1000.0)].into(),
        ..EqualizerState::default()
    };
    let rig = rig_with(&single, AquaConfig::default());
    rig.session.health_check().await.unwrap();
    let id = rig.session.snapshot().filters.ids()[0];
    let before = rig.host.received_count();

    let err = rig.session.remove_band(id).await.unwrap_err();
    assert_eq!(err.error_code(), "BAND_LIMIT");
    assert_eq!(rig.host.received_count(), before);

    for _ in 1..20 {
        rig.session.add_band(Some(500.0)).await.unwrap();
    }
    let err = rig.session.add_band(Some(500.0)).await.unwrap_err();
    assert_eq!(err.error_code(), "BAND_LIMIT");
    assert_eq!(rig.session.snapshot().filters.len(), 20);
}

#[tokio::test]
async fn test_index_follows_removal() {
    let rig = ready_rig().await;
    let ids = rig.session.snapshot().filters.ids();

    rig.session.remove_band(ids[0]).await.unwrap();
    rig.session.set_gain(ids[2], 7.5).await.unwrap();

    // third band is now in slot 1 on both sides
    assert_eq!(sent_to(&rig.host, "setFilterGain"), vec![vec![1, 7_500]]);
    assert_eq!(rig.host.host_state().filters.entries()[1].gain, 7.5);
}

#[tokio::test]
async fn test_frequencies_stored_in_whole_hz() {
    let rig = ready_rig().await;
    let id = rig.session.snapshot().filters.ids()[5];

    rig.session.set_frequency(id, 1000.4).await.unwrap();
    assert_eq!(rig.session.snapshot().filters.get(id).unwrap().frequency, 1000.0);
    assert_eq!(rig.host.host_state().filters.entries()[5].frequency, 1000.0);

    let added = rig.session.add_band(Some(2500.6)).await.unwrap();
    assert_eq!(rig.session.snapshot().filters.get(added).unwrap().frequency, 2501.0);
    assert_eq!(rig.host.host_state().filters.entries()[10].frequency, 2501.0);
}

#[tokio::test]
async fn test_health_check_rejects_shared_band_id() {
    let id = FilterId::new();
    let shared = EqualizerState {
        filters: vec![
            Filter::with_frequency(id, 100.0),
            Filter::with_frequency(id, 5000.0),
        ]
        .into(),
        ..EqualizerState::default()
    };
    let rig = rig_with(&shared, AquaConfig::default());

    let err = rig.session.health_check().await.unwrap_err();
    assert_eq!(err.error_code(), "UNKNOWN");
    assert!(!rig.session.snapshot().filters.contains(id));
    assert_eq!(
        rig.session.store().global_error().map(|d| d.code),
        Some(ErrorCode::Unknown)
    );
}

// === Auto-preamp ===

#[tokio::test]
async fn test_refresh_auto_preamp_writes_correction() {
    let rig = ready_rig().await;
    let id = rig.session.snapshot().filters.ids()[5];
    rig.session.set_gain(id, 10.0).await.unwrap();

    let response = rig.session.refresh_auto_preamp().await.unwrap();

    assert_eq!(response.auto_preamp, -10.0);
    assert_eq!(rig.session.snapshot().pre_amp, -10.0);
    assert_eq!(rig.host.host_state().pre_amp, -10.0);
}

#[tokio::test]
async fn test_refresh_without_auto_preamp_only_computes() {
    let initial = three_band_state();
    let rig = rig_with(&initial, AquaConfig::default());
    rig.session.health_check().await.unwrap();
    let before = rig.host.received_count();

    let response = rig.session.refresh_auto_preamp().await.unwrap();

    assert!(response.auto_preamp < 0.0);
    assert_eq!(rig.session.snapshot().pre_amp, -2.5);
    assert_eq!(rig.host.received_count(), before);
}

#[tokio::test]
async fn test_graph_view_is_local_only() {
    let rig = ready_rig().await;
    let before = rig.host.received_count();

    rig.session.set_graph_view(false);

    assert!(!rig.session.snapshot().is_graph_view_on);
    assert_eq!(rig.host.received_count(), before);
}

#[tokio::test]
async fn test_enable_round_trip() {
    let rig = ready_rig().await;
    rig.session.set_enabled(false).await.unwrap();

    assert!(!rig.session.snapshot().is_enabled);
    assert!(!rig.session.api().get_enable().await.unwrap());
}

#[test]
fn test_default_filters_are_ten_flat_peaks() {
    let filters = Filters::defaults();
    assert_eq!(filters.len(), 10);
    assert!(filters
        .iter()
        .all(|f| f.gain == 0.0 && f.quality == 1.0 && f.filter_type == FilterType::Peak));
}
