use std::sync::Arc;

use flowgraph_engine::Engine;
use flowgraph_storage::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub engine: Arc<Engine>,
}
