#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;

use deploy_api::config::ApiConfig;
use deploy_api::directory::SpaceDirectory;
use deploy_api::k8s::ClientFactory;
use deploy_api::routes::deployments::SetDeploymentRequest;
use deploy_api::startup::run;
use deploy_config::{Environment, load_config};
use deploy_telemetry::metrics::init_metrics;
use rand::random_range;
use reqwest::{IntoUrl, RequestBuilder};
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub api_key: String,
    server_handle: tokio::task::JoinHandle<Result<(), std::io::Error>>,
}

impl TestApp {
    fn get_authenticated<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.api_client.get(url).bearer_auth(self.api_key.clone())
    }

    fn put_authenticated<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.api_client.put(url).bearer_auth(self.api_key.clone())
    }

    fn delete_authenticated<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.api_client
            .delete(url)
            .bearer_auth(self.api_key.clone())
    }

    pub async fn health_check(&self) -> reqwest::Response {
        self.api_client
            .get(format!("{}/health_check", &self.address))
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn metrics(&self) -> reqwest::Response {
        self.api_client
            .get(format!("{}/metrics", &self.address))
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn get_unauthenticated(&self, path: &str) -> reqwest::Response {
        self.api_client
            .get(format!("{}{path}", &self.address))
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn read_space(&self, space_id: Uuid) -> reqwest::Response {
        self.get_authenticated(format!("{}/v1/spaces/{space_id}", &self.address))
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn read_application(&self, space_id: Uuid, application: &str) -> reqwest::Response {
        self.get_authenticated(format!(
            "{}/v1/spaces/{space_id}/applications/{application}",
            &self.address
        ))
        .send()
        .await
        .expect("failed to execute request")
    }

    pub async fn read_deployment(
        &self,
        space_id: Uuid,
        application: &str,
        environment: &str,
    ) -> reqwest::Response {
        self.get_authenticated(format!(
            "{}/v1/spaces/{space_id}/applications/{application}/deployments/{environment}",
            &self.address
        ))
        .send()
        .await
        .expect("failed to execute request")
    }

    pub async fn set_deployment(
        &self,
        space_id: Uuid,
        application: &str,
        environment: &str,
        request: &SetDeploymentRequest,
    ) -> reqwest::Response {
        self.put_authenticated(format!(
            "{}/v1/spaces/{space_id}/applications/{application}/deployments/{environment}",
            &self.address
        ))
        .json(request)
        .send()
        .await
        .expect("failed to execute request")
    }

    pub async fn delete_deployment(
        &self,
        space_id: Uuid,
        application: &str,
        environment: &str,
    ) -> reqwest::Response {
        self.delete_authenticated(format!(
            "{}/v1/spaces/{space_id}/applications/{application}/deployments/{environment}",
            &self.address
        ))
        .send()
        .await
        .expect("failed to execute request")
    }

    pub async fn deployment_stats(
        &self,
        space_id: Uuid,
        application: &str,
        environment: &str,
        start: Option<f64>,
    ) -> reqwest::Response {
        let mut url = format!(
            "{}/v1/spaces/{space_id}/applications/{application}/deployments/{environment}/stats",
            &self.address
        );
        if let Some(start) = start {
            url.push_str(&format!("?start={start}"));
        }
        self.get_authenticated(url)
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn deployment_stat_series(
        &self,
        space_id: Uuid,
        application: &str,
        environment: &str,
        start: f64,
        end: f64,
        limit: usize,
    ) -> reqwest::Response {
        self.get_authenticated(format!(
            "{}/v1/spaces/{space_id}/applications/{application}/deployments/{environment}/statseries?start={start}&end={end}&limit={limit}",
            &self.address
        ))
        .send()
        .await
        .expect("failed to execute request")
    }

    pub async fn space_environments(&self, space_id: Uuid) -> reqwest::Response {
        self.get_authenticated(format!(
            "{}/v1/spaces/{space_id}/environments",
            &self.address
        ))
        .send()
        .await
        .expect("failed to execute request")
    }

    pub async fn read_environment(&self, environment: &str) -> reqwest::Response {
        self.get_authenticated(format!(
            "{}/v1/environments/{environment}",
            &self.address
        ))
        .send()
        .await
        .expect("failed to execute request")
    }
}

pub async fn spawn_test_app(
    factory: Arc<dyn ClientFactory>,
    directory: Arc<dyn SpaceDirectory>,
) -> TestApp {
    // We set the environment to dev.
    Environment::Dev.set();

    let base_address = "127.0.0.1";
    let listener =
        TcpListener::bind(format!("{base_address}:0")).expect("failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let config = load_config::<ApiConfig>().expect("failed to read configuration");

    // We choose a random API key from the ones configured to show that
    // rotation works.
    let api_key_index = random_range(0..config.api_keys.len());
    let api_key = config.api_keys[api_key_index].clone();

    let metrics_handle = init_metrics().expect("failed to install metrics recorder");

    let server = run(config, listener, factory, directory, metrics_handle)
        .await
        .expect("failed to bind address");

    let server_handle = tokio::spawn(server);

    TestApp {
        address: format!("http://{base_address}:{port}"),
        api_client: reqwest::Client::new(),
        api_key,
        server_handle,
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        // Abort the server task so the listener is released promptly.
        self.server_handle.abort();
    }
}
