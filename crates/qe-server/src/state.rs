//! Pre-computed application state shared across all handlers (mirrors the
//! `AppState` pattern in the docs server this crate is grounded on).

use std::sync::Arc;

use qe_core::Registry;
use qe_exec::Executor;

pub struct AppState {
    pub registry: Arc<Registry>,
    pub executor: Arc<dyn Executor>,
    /// `"postgres"` or `"mongo"` — drives both builder selection and the
    /// `GET /info` response (§6.2, §6.4).
    pub db_type: &'static str,
}
