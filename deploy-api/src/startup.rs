use std::{net::TcpListener, sync::Arc};

use actix_web::{App, HttpServer, Responder, dev::Server, web};
use actix_web_httpauth::middleware::HttpAuthentication;
use deploy_telemetry::metrics::init_metrics;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing_actix_web::TracingLogger;
use utoipa::OpenApi;

use crate::{
    authentication::auth_validator,
    config::ApiConfig,
    directory::{HttpSpaceDirectory, SpaceDirectory},
    k8s::http::HttpClientFactory,
    k8s::quota::{EnvironmentQuota, QuotaUsage},
    k8s::stats::UsagePoint,
    k8s::ClientFactory,
    routes::{
        ErrorMessage,
        applications::{ReadApplicationResponse, read_application},
        deployments::{
            GetDeploymentStatSeriesResponse, GetDeploymentStatsResponse, ReadDeploymentResponse,
            SetDeploymentRequest, SetDeploymentResponse, delete_deployment,
            get_deployment_stat_series, get_deployment_stats, read_deployment, set_deployment,
        },
        environments::{
            ReadEnvironmentResponse, ReadEnvironmentsResponse, list_space_environments,
            read_environment,
        },
        health_check::health_check,
        metrics::metrics,
        spaces::{ReadSpaceResponse, read_space},
    },
    span_builder::ApiRootSpanBuilder,
};

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(config: ApiConfig) -> Result<Self, anyhow::Error> {
        config.cluster.validate()?;
        config.metrics.validate()?;
        config.directory.validate()?;

        let address = format!("{}:{}", config.application.host, config.application.port);
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();

        let factory = Arc::new(HttpClientFactory::new(
            config.cluster.clone(),
            config.metrics.clone(),
        )) as Arc<dyn ClientFactory>;
        let directory =
            Arc::new(HttpSpaceDirectory::new(&config.directory)?) as Arc<dyn SpaceDirectory>;

        let metrics_handle = init_metrics()?;

        let server = run(config, listener, factory, directory, metrics_handle).await?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub async fn run(
    config: ApiConfig,
    listener: TcpListener,
    factory: Arc<dyn ClientFactory>,
    directory: Arc<dyn SpaceDirectory>,
    metrics_handle: PrometheusHandle,
) -> Result<Server, anyhow::Error> {
    let config = web::Data::new(config);
    let factory: web::Data<dyn ClientFactory> = web::Data::from(factory);
    let directory: web::Data<dyn SpaceDirectory> = web::Data::from(directory);

    #[derive(OpenApi)]
    #[openapi(
        paths(
            crate::routes::health_check::health_check,
            crate::routes::metrics::metrics,
            crate::routes::spaces::read_space,
            crate::routes::applications::read_application,
            crate::routes::deployments::read_deployment,
            crate::routes::deployments::set_deployment,
            crate::routes::deployments::delete_deployment,
            crate::routes::deployments::get_deployment_stats,
            crate::routes::deployments::get_deployment_stat_series,
            crate::routes::environments::list_space_environments,
            crate::routes::environments::read_environment,
        ),
        components(schemas(
            ErrorMessage,
            ReadSpaceResponse,
            ReadApplicationResponse,
            ReadDeploymentResponse,
            SetDeploymentRequest,
            SetDeploymentResponse,
            GetDeploymentStatsResponse,
            GetDeploymentStatSeriesResponse,
            ReadEnvironmentResponse,
            ReadEnvironmentsResponse,
            UsagePoint,
            EnvironmentQuota,
            QuotaUsage,
        ))
    )]
    struct ApiDoc;

    let openapi = ApiDoc::openapi();

    let server = HttpServer::new(move || {
        let tracing_logger = TracingLogger::<ApiRootSpanBuilder>::new();
        let authentication = HttpAuthentication::bearer(auth_validator);
        App::new()
            .wrap(tracing_logger)
            .service(health_check)
            .service(metrics)
            .route("/api-docs/openapi.json", web::get().to(serve_openapi))
            .service(
                web::scope("v1")
                    .wrap(authentication)
                    //spaces
                    .service(read_space)
                    //applications
                    .service(read_application)
                    //deployments
                    .service(read_deployment)
                    .service(set_deployment)
                    .service(delete_deployment)
                    .service(get_deployment_stats)
                    .service(get_deployment_stat_series)
                    //environments
                    .service(list_space_environments)
                    .service(read_environment),
            )
            .app_data(config.clone())
            .app_data(factory.clone())
            .app_data(directory.clone())
            .app_data(web::Data::new(openapi.clone()))
            .app_data(web::ThinData(metrics_handle.clone()))
    })
    .listen(listener)?
    .run();

    Ok(server)
}

async fn serve_openapi(openapi: web::Data<utoipa::openapi::OpenApi>) -> impl Responder {
    web::Json(openapi.as_ref().clone())
}
