use std::sync::Arc;

use deploy_api::k8s::stats::UsagePoint;
use deploy_api::routes::deployments::{
    GetDeploymentStatSeriesResponse, GetDeploymentStatsResponse, ReadDeploymentResponse,
    SetDeploymentRequest, SetDeploymentResponse,
};
use deploy_telemetry::tracing::init_test_tracing;
use reqwest::StatusCode;
use uuid::Uuid;

use crate::support::mocks::{
    MockClientFactory, MockCluster, MockDirectory, MockMetrics, admitted_route, generation,
    run_environment_namespaces, running_pod, service,
};
use crate::support::test_app::{TestApp, spawn_test_app};

mod support;

const SPACE: &str = "myspace";
const APPLICATION: &str = "myapp";
const ENVIRONMENT: &str = "run";

struct Setup {
    app: TestApp,
    space_id: Uuid,
    cluster: Arc<MockCluster>,
}

/// Spawns the app over one deployed application: a single generation with
/// one running pod, a matching service and an admitted route.
async fn setup_deployment() -> Setup {
    init_test_tracing();

    let space_id = Uuid::new_v4();
    let cluster = Arc::new(MockCluster {
        replication_controllers: vec![generation(SPACE, APPLICATION, 2, 1)],
        pods: vec![running_pod(SPACE, APPLICATION, "myapp-2-abcde")],
        services: vec![service(APPLICATION)],
        routes: vec![admitted_route(
            APPLICATION,
            "myapp.example.com",
            "2019-01-01T00:00:00Z",
        )],
        ..Default::default()
    });
    let metrics = Arc::new(MockMetrics {
        point: Some(UsagePoint {
            time: 1_527_796_723_000.0,
            cores: 0.5,
            memory: 128.0 * 1024.0 * 1024.0,
        }),
        series: (0..30)
            .map(|i| UsagePoint {
                time: 1_527_796_723_000.0 + (i as f64) * 30_000.0,
                cores: 0.1,
                memory: 1024.0,
            })
            .collect(),
    });

    let factory = Arc::new(MockClientFactory {
        cluster: cluster.clone(),
        metrics,
    });
    let directory = Arc::new(MockDirectory {
        spaces: vec![(space_id, SPACE.to_string())],
        namespaces: run_environment_namespaces(SPACE),
    });

    let app = spawn_test_app(factory, directory).await;

    Setup {
        app,
        space_id,
        cluster,
    }
}

#[tokio::test]
async fn read_deployment_returns_the_snapshot() {
    let setup = setup_deployment().await;

    let response = setup
        .app
        .read_deployment(setup.space_id, APPLICATION, ENVIRONMENT)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let deployment: ReadDeploymentResponse = response
        .json()
        .await
        .expect("failed to deserialize response");
    assert_eq!(deployment.application, APPLICATION);
    assert_eq!(deployment.environment, ENVIRONMENT);
    assert_eq!(deployment.version, "1.0");
    assert_eq!(deployment.generation, "uid-myapp-2");
    assert_eq!(deployment.previous, None);
    assert_eq!(
        deployment.pods,
        vec![("Running".to_string(), "1".to_string())]
    );
    assert_eq!(deployment.pods_total, 1);
    assert_eq!(deployment.url.as_deref(), Some("http://myapp.example.com"));
}

#[tokio::test]
async fn read_deployment_without_matching_service_has_no_url() {
    init_test_tracing();

    let space_id = Uuid::new_v4();
    let cluster = Arc::new(MockCluster {
        replication_controllers: vec![generation(SPACE, APPLICATION, 1, 1)],
        pods: vec![running_pod(SPACE, APPLICATION, "myapp-1-abcde")],
        // The only service selects labels no pod template carries.
        services: vec![service("unrelated")],
        routes: vec![admitted_route(
            "unrelated",
            "unrelated.example.com",
            "2019-01-01T00:00:00Z",
        )],
        ..Default::default()
    });
    let factory = Arc::new(MockClientFactory {
        cluster,
        metrics: Arc::new(MockMetrics::default()),
    });
    let directory = Arc::new(MockDirectory {
        spaces: vec![(space_id, SPACE.to_string())],
        namespaces: run_environment_namespaces(SPACE),
    });
    let app = spawn_test_app(factory, directory).await;

    let response = app.read_deployment(space_id, APPLICATION, ENVIRONMENT).await;

    assert_eq!(response.status(), StatusCode::OK);
    let deployment: ReadDeploymentResponse = response
        .json()
        .await
        .expect("failed to deserialize response");
    assert_eq!(deployment.url, None);
}

#[tokio::test]
async fn read_deployment_for_unknown_application_is_not_found() {
    let setup = setup_deployment().await;

    let response = setup
        .app
        .read_deployment(setup.space_id, "unknown", ENVIRONMENT)
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn read_deployment_for_unknown_environment_is_not_found() {
    let setup = setup_deployment().await;

    let response = setup
        .app
        .read_deployment(setup.space_id, APPLICATION, "unknown")
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn read_deployment_for_unknown_space_is_not_found() {
    let setup = setup_deployment().await;

    let response = setup
        .app
        .read_deployment(Uuid::new_v4(), APPLICATION, ENVIRONMENT)
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn scale_deployment_returns_the_previous_count() {
    let setup = setup_deployment().await;

    let response = setup
        .app
        .set_deployment(
            setup.space_id,
            APPLICATION,
            ENVIRONMENT,
            &SetDeploymentRequest { pods: 5 },
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let scaled: SetDeploymentResponse = response
        .json()
        .await
        .expect("failed to deserialize response");
    assert_eq!(scaled.previous_pods, 1);

    let recorded = setup.cluster.scaled.lock().unwrap();
    assert_eq!(
        *recorded,
        vec![("myspace-run".to_string(), "myapp-2".to_string(), 5)]
    );
}

#[tokio::test]
async fn scale_deployment_with_negative_count_is_bad_request() {
    let setup = setup_deployment().await;

    let response = setup
        .app
        .set_deployment(
            setup.space_id,
            APPLICATION,
            ENVIRONMENT,
            &SetDeploymentRequest { pods: -1 },
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_deployment_removes_routes_services_and_generations() {
    let setup = setup_deployment().await;

    let response = setup
        .app
        .delete_deployment(setup.space_id, APPLICATION, ENVIRONMENT)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let deleted = setup.cluster.deleted.lock().unwrap();
    assert_eq!(
        *deleted,
        vec![
            "route/myapp-route".to_string(),
            "service/myapp".to_string(),
            "replicationcontroller/myapp-2".to_string(),
        ]
    );
}

#[tokio::test]
async fn deployment_stats_combine_pods_and_usage() {
    let setup = setup_deployment().await;

    let response = setup
        .app
        .deployment_stats(setup.space_id, APPLICATION, ENVIRONMENT, None)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let stats: GetDeploymentStatsResponse = response
        .json()
        .await
        .expect("failed to deserialize response");
    assert_eq!(stats.pods, vec![("Running".to_string(), "1".to_string())]);
    assert_eq!(stats.pods_total, 1);
    let usage = stats.usage.expect("usage sample missing");
    assert_eq!(usage.cores, 0.5);
}

#[tokio::test]
async fn stat_series_is_downsampled_to_the_limit() {
    let setup = setup_deployment().await;
    let start = 1_527_796_723_000.0;
    let end = start + 30.0 * 30_000.0;

    let response = setup
        .app
        .deployment_stat_series(setup.space_id, APPLICATION, ENVIRONMENT, start, end, 5)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let series: GetDeploymentStatSeriesResponse = response
        .json()
        .await
        .expect("failed to deserialize response");
    assert_eq!(series.start, start);
    assert_eq!(series.end, end);
    assert!(series.samples.len() <= 5);
    assert_eq!(series.samples.first().unwrap().time, start);
    assert_eq!(
        series.samples.last().unwrap().time,
        start + 29.0 * 30_000.0
    );
}

#[tokio::test]
async fn stat_series_with_inverted_window_is_bad_request() {
    let setup = setup_deployment().await;

    let response = setup
        .app
        .deployment_stat_series(setup.space_id, APPLICATION, ENVIRONMENT, 2000.0, 1000.0, 5)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stat_series_with_zero_limit_is_bad_request() {
    let setup = setup_deployment().await;

    let response = setup
        .app
        .deployment_stat_series(setup.space_id, APPLICATION, ENVIRONMENT, 1000.0, 2000.0, 0)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
