use dioxus::prelude::*;
use shared_types::FeatureFlags;

mod auth;
mod routes;
use auth::AuthState;
use routes::Route;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; background: #f5f6f8; color: #1d2330; }
.page { max-width: 44rem; margin: 4rem auto; padding: 2rem; background: #fff; border-radius: 8px; }
.page h1 { margin-top: 0; }
.topbar { display: flex; justify-content: space-between; align-items: center; padding: 0.75rem 1.5rem; background: #1d2330; color: #fff; }
.topbar form { margin: 0; }
.button { display: inline-block; padding: 0.5rem 1rem; border-radius: 6px; border: 1px solid #1d2330; background: #fff; color: #1d2330; text-decoration: none; cursor: pointer; }
.providers { display: flex; gap: 0.75rem; flex-wrap: wrap; }
.error { color: #a31515; }
.muted { color: #5c6370; }
"#;

fn main() {
    #[cfg(feature = "server")]
    dioxus::serve(|| async move {
        let config = server::config::load_config();

        if config.features.telemetry {
            server::telemetry::init_telemetry();
        }
        server::health::record_start_time();

        let state = server::state::AppState::from_env(config)?;
        server::state::install(state.clone());

        let mut router = dioxus::server::router(App)
            .merge(server::openapi::api_router(state.clone(), &config.features));

        if config.features.telemetry {
            router = router.layer(server::telemetry::OtelTraceLayer);
        }

        let router = router
            .layer(axum::middleware::from_fn_with_state(
                state,
                server::auth::middleware::auth_middleware,
            ))
            .layer(tower_http::request_id::PropagateRequestIdLayer::x_request_id())
            .layer(tower_http::request_id::SetRequestIdLayer::x_request_id(
                tower_http::request_id::MakeRequestUuid,
            ));
        Ok(router)
    });

    #[cfg(not(feature = "server"))]
    dioxus::launch(App);
}

#[component]
fn App() -> Element {
    // Fetch feature flags once and provide via context (defaults all-off on error)
    let flags_resource =
        use_server_future(move || async move { server::api::get_feature_flags().await })?;

    let flags = flags_resource
        .read()
        .as_ref()
        .cloned()
        .unwrap_or(Ok(FeatureFlags::default()))
        .unwrap_or_default();

    use_context_provider(|| flags);
    use_context_provider(AuthState::new);

    rsx! {
        document::Title { "Competency Portal" }
        document::Style { {STYLE} }
        SuspenseBoundary {
            fallback: |_| rsx! {
                div { class: "page",
                    p { class: "muted", "Loading..." }
                }
            },
            Router::<Route> {}
        }
    }
}
