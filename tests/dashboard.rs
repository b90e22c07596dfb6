use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use field_analytics::memory::{
    write_snapshot, ManualClock, ModeDataStore, ModeDataset, SnapshotLoader,
};
use field_analytics::remote::{ApiResponse, Method, Transport, TransportError};
use field_analytics::services::{Dashboard, RemoteSource, Section, SnapshotSource, StatsSource};
use field_analytics::stats::{
    BowlKind, DeliveryLength, FieldSetup, IntentReading, LengthSet, MetricContext, Mode,
    ProtectionStats, RunClass, SectorRow, SectorTable, ZoneRecord,
};
use field_analytics::utils::ClientSettings;

use DeliveryLength::{Full, Short};

fn ctx(lengths: &[DeliveryLength]) -> MetricContext {
    MetricContext::new(
        Mode::new("T20").unwrap(),
        "X",
        BowlKind::new("pace bowler"),
        LengthSet::new(lengths.iter().copied()),
    )
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
}

// ──────────────────────────────────────────────────────────────────────────────
// SNAPSHOT SOURCE
// ──────────────────────────────────────────────────────────────────────────────

fn setup(running: f64, boundary: f64, outfield: &[f64]) -> FieldSetup {
    FieldSetup {
        outfielder_positions: outfield.to_vec(),
        protection_stats: ProtectionStats {
            overall: (running + boundary) / 2.0,
            running,
            boundary,
        },
        ..FieldSetup::default()
    }
}

fn zone(total: f64, straight: f64) -> ZoneRecord {
    let fields = BTreeMap::from([
        ("total_runs".to_string(), total),
        ("st_runs".to_string(), straight),
    ]);
    ZoneRecord {
        classes: BTreeMap::from([(RunClass::Overall, fields)]),
    }
}

fn sector(ev_run: f64, ev_bd: f64) -> SectorTable {
    SectorTable {
        rows: vec![SectorRow {
            theta_center_deg: 0.0,
            ev_run,
            ev_bd,
        }],
    }
}

fn scenario_dataset() -> ModeDataset {
    let pace = BowlKind::pace();
    let mut ds = ModeDataset::empty(Mode::new("T20").unwrap());

    ds.ball_counts.insert(
        "X".into(),
        BTreeMap::from([(pace.clone(), BTreeMap::from([(Full, 80), (Short, 20)]))]),
    );
    ds.field_setups.insert(
        "X".into(),
        BTreeMap::from([(
            pace.clone(),
            BTreeMap::from([
                (Full, BTreeMap::from([(5, setup(20.0, 40.0, &[45.0, 135.0]))])),
                (Short, BTreeMap::from([(5, setup(50.0, 60.0, &[200.0, 300.0]))])),
            ]),
        )]),
    );
    ds.sector_ev.insert(
        "X".into(),
        BTreeMap::from([(
            pace.clone(),
            BTreeMap::from([
                (Full, sector(1.0, 2.0)),
                (Short, sector(2.0, 0.0)),
            ]),
        )]),
    );
    ds.zone_strength.insert(
        "X".into(),
        BTreeMap::from([(
            pace.clone(),
            BTreeMap::from([(Full, zone(100.0, 40.0)), (Short, zone(20.0, 10.0))]),
        )]),
    );
    ds.intent_reliability.insert(
        "X".into(),
        BTreeMap::from([(
            pace,
            BTreeMap::from([(
                "intrel".to_string(),
                BTreeMap::from([
                    (Full, IntentReading { value: 1.2, balls: 80 }),
                    (Short, IntentReading { value: 0.7, balls: 4 }),
                ]),
            )]),
        )]),
    );
    ds
}

fn snapshot_dashboard(root: &std::path::Path) -> Dashboard {
    let store = Arc::new(ModeDataStore::new(Arc::new(SnapshotLoader::new(root))));
    Dashboard::new(Arc::new(SnapshotSource::new(store)))
}

#[tokio::test]
async fn test_boundary_protection_is_weighted_by_balls_faced() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), &scenario_dataset()).unwrap();
    let dashboard = snapshot_dashboard(dir.path());

    let merged = dashboard.protection_stats(&ctx(&[Full, Short]), 5).await.unwrap();
    assert_close(merged.value.boundary, 44.0);
    assert_close(merged.value.running, 26.0);
    assert_eq!(merged.balls, 100);

    let single = dashboard.protection_stats(&ctx(&[Short]), 5).await.unwrap();
    assert_eq!(single.value.boundary, 60.0);
    assert_eq!(single.value.running, 50.0);
}

#[tokio::test]
async fn test_field_setup_uses_dominant_length() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), &scenario_dataset()).unwrap();
    let dashboard = snapshot_dashboard(dir.path());

    let setup = dashboard.field_setup(&ctx(&[Short, Full]), 5).await.unwrap().unwrap();
    assert_eq!(setup.outfielder_positions, vec![45.0, 135.0]);
    assert!(dashboard.field_setup(&ctx(&[Full]), 7).await.unwrap().is_none());
    assert_eq!(dashboard.outfielder_options(&ctx(&[Full, Short])).await.unwrap(), vec![5]);
}

#[tokio::test]
async fn test_zone_shares_come_from_merged_counts() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), &scenario_dataset()).unwrap();
    let dashboard = snapshot_dashboard(dir.path());

    let shares = dashboard.zone_shares(&ctx(&[Full, Short])).await.unwrap();
    // (80·40 + 20·10) / (80·100 + 20·20), not the weighted mean of 40 % and 50 %.
    assert_close(shares[&RunClass::Overall].straight, 3400.0 / 8400.0 * 100.0);
    assert_eq!(shares[&RunClass::Running].straight, 0.0);
}

#[tokio::test]
async fn test_full_report_from_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), &scenario_dataset()).unwrap();
    let dashboard = snapshot_dashboard(dir.path());

    let report = dashboard.report(&ctx(&[Full, Short]), None).await;
    assert_eq!(report.outfielders, Some(5));
    assert!(report.field_setup.is_ready());
    assert!(report.sector_ev.is_ready());
    let sector = report.sector_ev.ready().unwrap();
    assert_close(sector.value.rows[0].ev_run, 1.2);
    assert_close(sector.value.rows[0].ev_bd, 1.6);

    let intent = report.intent_reliability.ready().unwrap();
    assert_eq!(intent.keys().copied().collect::<Vec<_>>(), vec![Full]);

    assert_eq!(report.shot_profile, Section::Empty);
    assert_eq!(report.similar_batters, Section::Empty);
    assert_eq!(report.wagon_wheel, Section::Empty);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["protection"]["status"], "ready");
    assert_eq!(json["protection"]["data"]["value"]["boundary"], 44.0);
    assert_eq!(json["shot_profile"]["status"], "empty");
}

#[tokio::test]
async fn test_paired_intent_keeps_lengths_both_metrics_cover() {
    let dir = tempfile::tempdir().unwrap();
    let mut dataset = scenario_dataset();
    let metrics = dataset
        .intent_reliability
        .get_mut("X")
        .and_then(|kinds| kinds.get_mut(&BowlKind::pace()))
        .unwrap();
    metrics.insert(
        "othsr".to_string(),
        BTreeMap::from([
            (Full, IntentReading { value: 1.5, balls: 80 }),
            (Short, IntentReading { value: 1.1, balls: 20 }),
        ]),
    );
    metrics.insert(
        "othcon".to_string(),
        BTreeMap::from([
            (Full, IntentReading { value: 0.9, balls: 70 }),
            (Short, IntentReading { value: 0.6, balls: 8 }),
        ]),
    );
    write_snapshot(dir.path(), &dataset).unwrap();
    let dashboard = snapshot_dashboard(dir.path());

    let pairs = dashboard
        .paired_intent(&ctx(&[Full, Short]), "othsr", "othcon")
        .await
        .unwrap();
    assert_eq!(pairs.keys().copied().collect::<Vec<_>>(), vec![Full]);
    assert_eq!(pairs[&Full].balls, 70);
    assert_eq!(pairs[&Full].control, 0.9);
}

#[tokio::test]
async fn test_unknown_batter_is_empty_not_error() {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path(), &scenario_dataset()).unwrap();
    let dashboard = snapshot_dashboard(dir.path());

    let nobody = MetricContext::new(
        Mode::new("T20").unwrap(),
        "Nobody",
        BowlKind::pace(),
        LengthSet::single(Full),
    );
    let merged = dashboard.sector_ev(&nobody).await.unwrap();
    assert!(merged.is_empty());
    assert_eq!(merged.balls, 0);

    let report = dashboard.report(&nobody, None).await;
    assert_eq!(report.weights, Section::Empty);
    assert_eq!(report.field_setup, Section::Empty);
    assert_eq!(report.protection, Section::Empty);
}

#[tokio::test]
async fn test_unknown_mode_fails_every_section() {
    let dir = tempfile::tempdir().unwrap();
    let dashboard = snapshot_dashboard(dir.path());
    let report = dashboard.report(&ctx(&[Full]), Some(5)).await;
    assert!(matches!(report.sector_ev, Section::Failed(_)));
    assert!(matches!(report.field_setup, Section::Failed(_)));
}

// ──────────────────────────────────────────────────────────────────────────────
// REMOTE SOURCE
// ──────────────────────────────────────────────────────────────────────────────

/// Answers by path and counts how often each path was hit.
struct RoutedTransport {
    routes: HashMap<&'static str, (u16, Value)>,
    calls: Mutex<HashMap<String, usize>>,
}

impl RoutedTransport {
    fn new(routes: Vec<(&'static str, u16, Value)>) -> Self {
        Self {
            routes: routes.into_iter().map(|(path, code, body)| (path, (code, body))).collect(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    async fn calls(&self, path: &str) -> usize {
        self.calls.lock().await.get(path).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Transport for RoutedTransport {
    async fn send(
        &self,
        method: Method,
        path: &str,
        _body: Option<&Value>,
    ) -> Result<ApiResponse, TransportError> {
        assert_eq!(method, Method::Post);
        *self.calls.lock().await.entry(path.to_string()).or_default() += 1;
        match self.routes.get(path) {
            Some((code, body)) => Ok(ApiResponse::new(*code, body.to_string())),
            None => Ok(ApiResponse::new(404, json!({ "detail": "no route" }).to_string())),
        }
    }
}

fn remote_routes() -> Vec<(&'static str, u16, Value)> {
    vec![
        ("/list-batters", 200, json!({ "batters": ["X", "Y"] })),
        ("/list-bowl-kinds", 200, json!({ "bowl_kinds": ["Pace bowler", "spin"] })),
        (
            "/list-lengths",
            200,
            json!({ "lengths": ["SHORT", "FULL"], "ball_counts": { "FULL": 80, "SHORT": 20 } }),
        ),
        ("/list-outfielder-options", 200, json!({ "outfielders": [5, 4] })),
        (
            "/field-setup",
            200,
            json!({ "field_setup": {
                "outfielder_positions": [45.0],
                "special_fielders": { "30_yard_wall": 90.0 }
            } }),
        ),
        (
            "/protection-stats",
            200,
            json!({ "protection_stats": {
                "FULL": { "overall": 30.0, "running": 20.0, "boundary": 40.0 },
                "SHORT": { "overall": 55.0, "running": 50.0, "boundary": 60.0 }
            } }),
        ),
        (
            "/sector-ev",
            200,
            json!({ "sector_ev": {
                "FULL": [{ "theta_center_deg": 0.0, "ev_run": 1.0, "ev_bd": 2.0 }],
                "SHORT": [{ "theta_center_deg": 0.0, "ev_run": 2.0, "ev_bd": 0.0 }]
            } }),
        ),
        (
            "/zone-strength",
            200,
            json!({
                "zone_strength": {
                    "FULL": { "overall": { "total_runs": 100.0, "st_runs": 40.0 } }
                },
                "score_360": { "FULL": { "360_score": 72.0 }, "SHORT": { "360_score": 52.0 } }
            }),
        ),
        ("/shot-profile", 503, json!({})),
        (
            "/similar-batters",
            200,
            json!({ "similarity_data": [
                { "length": "FULL", "batter": "X", "similarity": 1.0 },
                { "length": "FULL", "batter": "Y", "similarity": 0.9 },
                { "length": "SHORT", "batter": "Y", "similarity": 0.5 },
                { "length": "SHORT", "batter": "Z", "similarity": 0.8 }
            ] }),
        ),
        (
            "/intent-reliability",
            200,
            json!({ "intent_reliability": {
                "FULL": { "value": 1.2, "balls": 80 },
                "SHORT": { "value": 0.8, "balls": 5 }
            } }),
        ),
        (
            "/intent-impact",
            200,
            json!({ "intent_impact": {
                "batter_ith_ball_count": { "1": 10.0, "2": 10.0 },
                "batter_ith_ball_raw_runs": { "1": 15.0, "2": 20.0 },
                "non_striker_ith_ball_raw_runs": { "1": 10.0, "2": 10.0 }
            } }),
        ),
        (
            "/wagon-wheel",
            200,
            json!({ "wagon_wheel": {
                "FULL": [{ "angle_deg": 45.0, "runs": 4 }],
                "SHORT": [{ "angle_deg": 200.0, "runs": 1, "distance": 30.0 }]
            } }),
        ),
    ]
}

/// Default routes with `path` answered by `code` and `body` instead.
fn routes_with(path: &'static str, code: u16, body: Value) -> Vec<(&'static str, u16, Value)> {
    let mut routes: Vec<_> = remote_routes().into_iter().filter(|(p, _, _)| *p != path).collect();
    routes.push((path, code, body));
    routes
}

fn remote(transport: Arc<RoutedTransport>, clock: Arc<ManualClock>) -> Arc<RemoteSource> {
    Arc::new(RemoteSource::with_transport(transport, &ClientSettings::default(), clock))
}

#[tokio::test(start_paused = true)]
async fn test_remote_report_isolates_failed_section() {
    let transport = Arc::new(RoutedTransport::new(remote_routes()));
    let dashboard = Dashboard::new(remote(transport.clone(), Arc::new(ManualClock::new())));

    let report = dashboard.report(&ctx(&[Full, Short]), None).await;

    assert_eq!(report.outfielders, Some(4));
    match &report.shot_profile {
        Section::Failed(notice) => assert!(notice.contains("unavailable")),
        other => panic!("expected a failed section, got {other:?}"),
    }
    assert_eq!(transport.calls("/shot-profile").await, 4);

    assert_close(report.protection.ready().unwrap().value.boundary, 44.0);
    assert_close(report.ability_360.ready().unwrap().value.scores["360_score"], 68.0);
    assert_eq!(
        report.field_setup.ready().unwrap().special_fielders.thirty_yard_wall,
        Some(90.0)
    );

    let similar = report.similar_batters.ready().unwrap();
    let names: Vec<&str> = similar.iter().map(|s| s.batter.as_str()).collect();
    assert_eq!(names, vec!["Y", "Z"]);
    assert_close(similar[0].similarity, 0.82);
    assert_close(similar[1].similarity, 0.16);

    let curve = report.intent_impact.ready().unwrap();
    assert_close(curve[1].raw, 1.5);

    let shots = report.wagon_wheel.ready().unwrap();
    assert_eq!(shots.len(), 2);
    assert_eq!(shots[1].length, Some(Short));

    // Zone strength and the 360 scores share one response.
    assert_eq!(transport.calls("/zone-strength").await, 1);
}

#[tokio::test]
async fn test_remote_listings_normalise() {
    let transport = Arc::new(RoutedTransport::new(remote_routes()));
    let source = remote(transport, Arc::new(ManualClock::new()));
    let mode = Mode::new("T20").unwrap();

    assert_eq!(source.batters(&mode).await.unwrap(), vec!["X", "Y"]);
    assert_eq!(
        source.bowl_kinds(&mode, "X").await.unwrap(),
        vec![BowlKind::pace(), BowlKind::spin()]
    );
    assert_eq!(source.lengths(&mode, "X", &BowlKind::pace()).await.unwrap(), vec![Full, Short]);
    assert_eq!(
        source.weights(&mode, "X", &BowlKind::pace()).await.unwrap().total(),
        100
    );
    assert_eq!(source.weights(&mode, "", &BowlKind::pace()).await.unwrap().total(), 0);
}

#[tokio::test]
async fn test_remote_cache_serves_repeat_and_reordered_queries() {
    let transport = Arc::new(RoutedTransport::new(remote_routes()));
    let clock = Arc::new(ManualClock::new());
    let source = remote(transport.clone(), clock.clone());
    let dashboard = Dashboard::new(source.clone());

    let first = dashboard.sector_ev(&ctx(&[Full, Short])).await.unwrap();
    let second = dashboard.sector_ev(&ctx(&[Short, Full])).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(transport.calls("/sector-ev").await, 1);

    clock.advance(ClientSettings::default().cache.ttl + Duration::from_secs(1));
    dashboard.sector_ev(&ctx(&[Full, Short])).await.unwrap();
    assert_eq!(transport.calls("/sector-ev").await, 2);

    let dropped = source.api().cache().invalidate_mode(&Mode::new("T20").unwrap()).await;
    assert!(dropped > 0);
    assert!(source.api().cache().is_empty().await);
}

#[tokio::test]
async fn test_remote_missing_route_is_fatal_once() {
    let routes = remote_routes()
        .into_iter()
        .filter(|(path, _, _)| *path != "/sector-ev")
        .collect();
    let transport = Arc::new(RoutedTransport::new(routes));
    let dashboard = Dashboard::new(remote(transport.clone(), Arc::new(ManualClock::new())));

    let err = dashboard.sector_ev(&ctx(&[Full])).await.unwrap_err();
    assert!(err.to_string().contains("no route"));
    assert_eq!(transport.calls("/sector-ev").await, 1);
}

#[tokio::test]
async fn test_failed_outfielder_listing_fails_field_sections() {
    let routes = routes_with("/list-outfielder-options", 500, json!({ "detail": "listing broke" }));
    let transport = Arc::new(RoutedTransport::new(routes));
    let dashboard = Dashboard::new(remote(transport.clone(), Arc::new(ManualClock::new())));

    let report = dashboard.report(&ctx(&[Full, Short]), None).await;

    assert_eq!(report.outfielders, None);
    for section in [
        serde_json::to_value(&report.field_setup).unwrap(),
        serde_json::to_value(&report.protection).unwrap(),
    ] {
        assert_eq!(section["status"], "failed");
        assert!(section["data"].as_str().unwrap().contains("listing broke"));
    }
    assert_eq!(transport.calls("/field-setup").await, 0);
    assert!(report.sector_ev.is_ready());
}

#[tokio::test]
async fn test_null_intent_value_is_dropped_not_fatal() {
    let routes = routes_with(
        "/intent-reliability",
        200,
        json!({ "intent_reliability": {
            "FULL": { "value": 1.2, "balls": 80 },
            "GOOD_LENGTH": { "value": null, "balls": 40 }
        } }),
    );
    let transport = Arc::new(RoutedTransport::new(routes));
    let dashboard = Dashboard::new(remote(transport, Arc::new(ManualClock::new())));

    let readings = dashboard
        .intent_reliability(&ctx(&[Full, DeliveryLength::GoodLength]), "intrel")
        .await
        .unwrap();

    assert_eq!(readings.keys().copied().collect::<Vec<_>>(), vec![Full]);
    assert_eq!(readings[&Full].value, 1.2);
}
