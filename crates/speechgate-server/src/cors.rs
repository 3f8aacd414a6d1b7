use http::Method;
use http::header::HeaderName;
use speechgate_config::{AnyOrArray, CorsConfig};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Build the CORS layer for the browser front-end
///
/// Entries that do not parse as an origin, method or header name are
/// skipped with a warning rather than failing startup.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let mut layer = CorsLayer::new();

    layer = match &config.origins {
        AnyOrArray::Any => layer.allow_origin(AllowOrigin::any()),
        AnyOrArray::List(origins) => layer.allow_origin(parse_all::<http::HeaderValue>("origin", origins)),
    };

    layer = match &config.methods {
        AnyOrArray::Any => layer.allow_methods(AllowMethods::any()),
        AnyOrArray::List(methods) => layer.allow_methods(parse_all::<Method>("method", methods)),
    };

    layer = match &config.headers {
        AnyOrArray::Any => layer.allow_headers(AllowHeaders::any()),
        AnyOrArray::List(headers) => layer.allow_headers(parse_all::<HeaderName>("header", headers)),
    };

    if let Some(duration) = config.max_age_duration() {
        layer = layer.max_age(duration);
    }

    layer
}

fn parse_all<T: std::str::FromStr>(kind: &str, values: &[String]) -> Vec<T> {
    values
        .iter()
        .filter_map(|value| {
            value
                .parse()
                .inspect_err(|_| tracing::warn!("ignoring invalid CORS {kind}: {value}"))
                .ok()
        })
        .collect()
}
