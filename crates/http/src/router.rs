//! Router builder for the HTTP server

use axum::{
    extract::Request,
    http::{header, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use utoipa::{
    openapi::{InfoBuilder, OpenApi as OpenApiDoc, OpenApiBuilder},
    OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use bookstore_kernel::ModuleRegistry;

use crate::{error::AppError, health, MakeRequestUuidV7};

/// Versioned prefix every module is mounted under
pub const API_PREFIX: &str = "/api/v1";

/// Builder for constructing the main HTTP router.
///
/// Routes are collected first; middleware is applied in [`RouterBuilder::build`]
/// so that it wraps every route regardless of call order.
pub struct RouterBuilder {
    router: Router,
    tracing: bool,
    cors: bool,
    request_id: bool,
    timeout: Option<Duration>,
}

impl RouterBuilder {
    /// Create a new router builder
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            tracing: false,
            cors: false,
            request_id: false,
            timeout: None,
        }
    }

    /// Add a route to the router
    pub fn route(mut self, path: &str, route: axum::routing::MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Mount `api_routes` and every module's router under [`API_PREFIX`]
    pub fn mount_modules(mut self, registry: &ModuleRegistry, api_routes: Router) -> Self {
        let mut api = api_routes;
        for module in registry.modules() {
            tracing::info!(
                module = module.name(),
                "mounting module routes under {}",
                API_PREFIX
            );
            api = api.merge(module.routes());
        }
        self.router = self.router.nest(API_PREFIX, api);
        self
    }

    /// Add tracing middleware
    pub fn with_tracing(mut self) -> Self {
        self.tracing = true;
        self
    }

    /// Add CORS middleware
    pub fn with_cors(mut self) -> Self {
        self.cors = true;
        self
    }

    /// Add request ID middleware
    pub fn with_request_id(mut self) -> Self {
        self.request_id = true;
        self
    }

    /// Add timeout middleware
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(Duration::from_millis(timeout_ms));
        self
    }

    /// Serve the merged OpenAPI document of all modules at `/api/schema`
    /// with Swagger UI at `/api/docs`
    pub fn with_openapi(mut self, registry: &ModuleRegistry) -> Self {
        let openapi = merged_openapi(registry);
        self.router = self
            .router
            .merge(SwaggerUi::new("/api/docs").url("/api/schema", openapi));
        self
    }

    /// Build the final router
    pub fn build(self) -> Router {
        let mut router = self.router.fallback(route_not_found);

        if let Some(timeout) = self.timeout {
            router = router.layer(TimeoutLayer::new(timeout));
        }
        router = router.layer(middleware::from_fn(envelope_bare_errors));
        if self.tracing {
            router = router.layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                    .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
            );
        }
        if self.request_id {
            router = router
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7));
        }
        if self.cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        router
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect OpenAPI fragments from every module, prefixing their paths
fn merged_openapi(registry: &ModuleRegistry) -> OpenApiDoc {
    let mut openapi = OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title("Bookstore API")
                .version(env!("CARGO_PKG_VERSION"))
                .description(Some("Bookstore catalog management API")),
        )
        .build();

    openapi.merge(health::HealthApi::openapi());

    for module in registry.modules() {
        let Some(mut fragment) = module.openapi() else {
            continue;
        };
        fragment.paths.paths = std::mem::take(&mut fragment.paths.paths)
            .into_iter()
            .map(|(path, item)| (format!("{API_PREFIX}{path}"), item))
            .collect();
        openapi.merge(fragment);
    }

    openapi
}

/// Give axum's 405 and the timeout layer's 408 the standard error body.
async fn envelope_bare_errors(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let response = next.run(request).await;

    let error = match response.status() {
        StatusCode::METHOD_NOT_ALLOWED => AppError::MethodNotAllowed { method },
        StatusCode::REQUEST_TIMEOUT => AppError::Timeout,
        _ => return response,
    };

    let allow = response.headers().get(header::ALLOW).cloned();
    let mut enveloped = error.into_response();
    if let Some(allow) = allow {
        enveloped.headers_mut().insert(header::ALLOW, allow);
    }
    enveloped
}

async fn route_not_found(uri: Uri) -> AppError {
    AppError::not_found("Not found", format!("No route matches {}", uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::Request,
        routing::get,
    };
    use bookstore_kernel::Module;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;
    use utoipa::openapi::path::{HttpMethod, OperationBuilder, PathItem};

    struct EchoModule;

    #[async_trait]
    impl Module for EchoModule {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn routes(&self) -> Router {
            Router::new().route("/echo/", get(|| async { "echo" }))
        }
    }

    #[tokio::test]
    async fn test_module_mounting_under_prefix() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(EchoModule));
        let router = RouterBuilder::new()
            .mount_modules(&registry, Router::new())
            .build();

        let response = router
            .oneshot(Request::get("/api/v1/echo/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_uses_error_envelope() {
        let router = RouterBuilder::new().build();

        let response = router
            .oneshot(Request::get("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_wrong_method_uses_error_envelope() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(EchoModule));
        let router = RouterBuilder::new()
            .mount_modules(&registry, Router::new())
            .build();

        let response = router
            .oneshot(Request::post("/api/v1/echo/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(response.headers().contains_key(header::ALLOW));

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Method not allowed");
    }

    #[tokio::test]
    async fn test_timeout_uses_error_envelope() {
        let router = RouterBuilder::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    "done"
                }),
            )
            .with_timeout(10)
            .build();

        let response = router
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Request timeout");
    }

    #[tokio::test]
    async fn test_middleware_chain_sets_request_id() {
        let router = RouterBuilder::new()
            .route("/ping", get(|| async { "pong" }))
            .with_tracing()
            .with_cors()
            .with_request_id()
            .with_timeout(5000)
            .build();

        let response = router
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[test]
    fn test_openapi_paths_are_prefixed() {
        struct DocModule;

        #[async_trait]
        impl Module for DocModule {
            fn name(&self) -> &'static str {
                "doc"
            }

            fn openapi(&self) -> Option<OpenApiDoc> {
                let mut doc = OpenApiBuilder::new().build();
                doc.paths.paths.insert(
                    "/things/".to_string(),
                    PathItem::new(HttpMethod::Get, OperationBuilder::new().build()),
                );
                Some(doc)
            }
        }

        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(DocModule));

        let doc = merged_openapi(&registry);
        assert!(doc.paths.paths.contains_key("/api/v1/things/"));
        assert!(doc.paths.paths.contains_key("/health/"));
    }
}
