use crate::*;

use axum::{body::Body, extract::Request, response::Response};
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    trace::TraceLayer,
};
use tracing::Span;
pub use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

fn pretty_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
        .add_directive("h2=info".parse().expect("valid directive"))
        .add_directive("hyper=info".parse().expect("valid directive"))
}

/// Initializes log collection, does nothing if a subscriber is already set
pub fn init_tracing_subscriber() {
    let shell_layer = fmt::layer()
        .with_timer(ChronoUtc::new("%k:%M:%S".to_owned()))
        .with_filter(pretty_filter());

    if tracing_subscriber::registry()
        .with(shell_layer)
        .try_init()
        .is_err()
    {
        debug!("tracing subscriber was already initialized");
    }
}

pub fn trace_layer() -> TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    impl Fn(&Request<Body>) -> Span + Clone + Copy,
    (),
    impl Fn(&Response<Body>, std::time::Duration, &Span) + Clone + Copy,
    (),
    (),
> {
    TraceLayer::new_for_http()
        .on_eos(())
        .on_body_chunk(())
        .on_request(())
        .on_response(|resp: &Response, latency: std::time::Duration, _span: &Span| {
            let millis = latency.as_secs_f64() * 1000.0;
            let status = resp.status();
            if status == StatusCode::NOT_MODIFIED {
                trace!("'{status}' in {millis:.1}ms");
            } else {
                debug!("'{status}' in {millis:.1}ms");
            }
        })
        .make_span_with(|request: &Request| {
            let method = request.method().as_str();
            let uri = request.uri().to_string();
            tracing::debug_span!("->", method, uri)
        })
}
