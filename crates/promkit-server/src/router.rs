//! Axum router wiring.
//!
//! `instrument` adds the metrics route and the inbound middleware to any
//! router. Routes must be added before calling it; routes added afterwards
//! are not instrumented.
//!
//! With `enable_default_endpoint`, the host router must not already have a
//! route on the metrics path: axum panics on overlapping routes.

use axum::{middleware, routing::get, Router};

use crate::{app_state::AppState, middleware::inbound, module::PromModule, ops};

pub fn build_router(state: AppState) -> Router {
    let app = Router::new()
        .route("/healthz", get(ops::healthz))
        .fallback(ops::not_found);
    instrument(app, state.prom()).with_state(state)
}

pub fn instrument<S>(router: Router<S>, prom: &PromModule) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let router = if prom.options().enable_default_endpoint {
        let registry = prom.registry();
        router.route(
            &prom.options().metrics_path(),
            get(move || ops::metrics(registry)),
        )
    } else {
        router
    };
    router.layer(middleware::from_fn_with_state(prom.inbound(), inbound::track))
}
