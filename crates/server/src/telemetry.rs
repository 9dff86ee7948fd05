use axum::{body::Body, http::Request, response::Response};
use opentelemetry::{
    global,
    trace::{SpanKind, TraceContextExt, Tracer},
    Context, KeyValue,
};
use opentelemetry_otlp::tonic_types::{metadata::MetadataMap, transport::ClientTlsConfig};
use opentelemetry_otlp::{WithExportConfig, WithTonicConfig};
use shared_types::Session;
use std::{
    future::Future,
    pin::Pin,
    sync::OnceLock,
    task::{Context as TaskContext, Poll},
};
use tower::{Layer, Service};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_SERVICE_NAME: &str = "competency-portal";

/// Keep the LoggerProvider alive for the process lifetime.
static LOGGER_PROVIDER: OnceLock<opentelemetry_sdk::logs::SdkLoggerProvider> = OnceLock::new();

/// Runtime for the OTLP gRPC exporters. Tonic's `connect_lazy()` spawns onto
/// the current Tokio runtime, which `dioxus::serve` may not have entered yet
/// when it runs our init closure.
static OTEL_RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();

/// Collector connection settings shared by the trace and log exporters.
struct CollectorConfig {
    endpoint: String,
    ingestion_key: Option<String>,
}

impl CollectorConfig {
    fn from_env() -> Option<Self> {
        let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;
        let ingestion_key = std::env::var("SIGNOZ_INGESTION_KEY")
            .ok()
            .filter(|k| !k.is_empty());
        Some(Self {
            endpoint,
            ingestion_key,
        })
    }

    fn tls(&self) -> Option<ClientTlsConfig> {
        self.endpoint
            .starts_with("https://")
            .then(|| ClientTlsConfig::new().with_native_roots())
    }

    fn metadata(&self) -> Option<MetadataMap> {
        let key = self.ingestion_key.as_deref()?.parse().ok()?;
        let mut metadata = MetadataMap::new();
        metadata.insert("signoz-ingestion-key", key);
        Some(metadata)
    }
}

/// Set up OTLP export of traces and `log` records.
///
/// Dioxus owns the tracing subscriber; this only registers the global
/// TracerProvider (fed by [`OtelTraceLayer`]) and bridges the `log` crate.
///
/// Reads config from environment:
///   - `OTEL_EXPORTER_OTLP_ENDPOINT`: collector gRPC address, e.g. `http://localhost:4317`
///   - `OTEL_SERVICE_NAME`: service name tag (default: `competency-portal`)
///   - `SIGNOZ_INGESTION_KEY`: collector access token (optional)
///   - `DEPLOY_ENV`: deployment environment tag (default: `development`)
pub fn init_telemetry() {
    let _ = dotenvy::dotenv();

    let Some(collector) = CollectorConfig::from_env() else {
        eprintln!("OTEL_EXPORTER_OTLP_ENDPOINT not set, skipping OTLP telemetry");
        return;
    };

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());
    let environment = std::env::var("DEPLOY_ENV").unwrap_or_else(|_| "development".to_string());

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(1)
        .build()
    {
        Ok(rt) => OTEL_RUNTIME.get_or_init(|| rt),
        Err(e) => {
            eprintln!("Could not start telemetry runtime ({e}), skipping OTLP telemetry");
            return;
        }
    };
    let _guard = rt.enter();

    let mut span_builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&collector.endpoint);
    if let Some(tls) = collector.tls() {
        span_builder = span_builder.with_tls_config(tls);
    }
    if let Some(metadata) = collector.metadata() {
        span_builder = span_builder.with_metadata(metadata);
    }

    let mut log_builder = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(&collector.endpoint);
    if let Some(tls) = collector.tls() {
        log_builder = log_builder.with_tls_config(tls);
    }
    if let Some(metadata) = collector.metadata() {
        log_builder = log_builder.with_metadata(metadata);
    }

    let (span_exporter, log_exporter) = match (span_builder.build(), log_builder.build()) {
        (Ok(spans), Ok(logs)) => (spans, logs),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Failed to create OTLP exporter ({e}), skipping OTLP telemetry");
            return;
        }
    };

    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(service_name)
        .with_attribute(KeyValue::new("service.version", APP_VERSION))
        .with_attribute(KeyValue::new("deployment.environment", environment))
        .build();

    let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(span_exporter)
        .with_resource(resource.clone())
        .build();
    global::set_tracer_provider(tracer_provider);

    let logger_provider = LOGGER_PROVIDER.get_or_init(|| {
        opentelemetry_sdk::logs::SdkLoggerProvider::builder()
            .with_batch_exporter(log_exporter)
            .with_resource(resource)
            .build()
    });

    // The `log` bridge is independent of the Dioxus-owned `tracing` subscriber.
    let bridge = opentelemetry_appender_log::OpenTelemetryLogBridge::new(logger_provider);
    match log::set_boxed_logger(Box::new(bridge)) {
        Ok(()) => log::set_max_level(log::LevelFilter::Info),
        Err(_) => eprintln!("Log bridge skipped, log crate logger already set"),
    }

    eprintln!(
        "Telemetry initialized v{APP_VERSION}, traces + logs exporting to {}",
        collector.endpoint
    );
}

/// Which grant a `/auth/callback` query carries, for span attributes.
/// Values are never recorded, only the kind.
fn callback_grant_kind(query: Option<&str>) -> &'static str {
    let query = query.unwrap_or_default();
    let has = |key: &str| {
        query
            .split('&')
            .any(|pair| pair.split('=').next() == Some(key))
    };
    if has("error") {
        "error"
    } else if has("code") {
        "pkce"
    } else if has("token_hash") {
        "one_time_token"
    } else {
        "stored"
    }
}

/// Route template for span names: the provider segment of
/// `/auth/authorize/{provider}` is folded so spans group per endpoint.
fn route_name(path: &str) -> String {
    match path.strip_prefix("/auth/authorize/") {
        Some(_) => "/auth/authorize/{provider}".to_string(),
        None => path.to_string(),
    }
}

/// Tower layer that creates an OpenTelemetry span for each HTTP request.
///
/// Captures: method, route, request ID, response status, the sign-in grant
/// kind on callbacks, and the session user (if the auth middleware found one).
#[derive(Clone)]
pub struct OtelTraceLayer;

impl<S> Layer<S> for OtelTraceLayer {
    type Service = OtelTraceService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        OtelTraceService { inner }
    }
}

#[derive(Clone)]
pub struct OtelTraceService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for OtelTraceService<S>
where
    S: Service<Request<Body>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let tracer = global::tracer(DEFAULT_SERVICE_NAME);
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let route = route_name(&path);

        let request_id = req
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let mut attributes = vec![
            KeyValue::new("http.method", method.clone()),
            KeyValue::new("http.target", path.clone()),
            KeyValue::new("http.route", route.clone()),
            KeyValue::new("http.request_id", request_id),
        ];

        if path == "/auth/callback" {
            attributes.push(KeyValue::new(
                "auth.grant",
                callback_grant_kind(req.uri().query()),
            ));
        }

        match req.extensions().get::<Session>() {
            Some(session) => attributes.extend([
                KeyValue::new("user.id", session.user.id.clone()),
                KeyValue::new("auth.status", "authenticated"),
            ]),
            None => attributes.push(KeyValue::new("auth.status", "anonymous")),
        }

        let span = tracer
            .span_builder(format!("{method} {route}"))
            .with_kind(SpanKind::Server)
            .with_attributes(attributes)
            .start(&tracer);

        let cx = Context::current_with_span(span);
        let mut inner = self.inner.clone();

        let guard = cx.clone().attach();
        let future = inner.call(req);
        drop(guard);

        Box::pin(async move {
            let response = future.await?;

            let span = cx.span();
            let status = response.status();
            span.set_attribute(KeyValue::new("http.status_code", status.as_u16() as i64));
            if let Some(location) = response.headers().get("location").and_then(|v| v.to_str().ok()) {
                span.set_attribute(KeyValue::new("http.redirect", location.to_string()));
            }

            if status.is_server_error() {
                span.set_status(opentelemetry::trace::Status::error(status.to_string()));
            } else if status.is_client_error() {
                span.set_attribute(KeyValue::new("error.type", "client_error"));
            }

            Ok(response)
        })
    }
}
