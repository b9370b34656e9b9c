use std::sync::Arc;

use askdb_memory::ContextWindow;
use askdb_sql::SqlDatabase;

/// State that outlives one question: the database handle and the
/// conversation so far. One per user conversation, never shared.
pub struct Session {
    db: Arc<dyn SqlDatabase>,
    context: ContextWindow,
}

impl Session {
    pub fn new(db: Arc<dyn SqlDatabase>, context_length: usize) -> Self {
        Self {
            db,
            context: ContextWindow::new(context_length),
        }
    }

    pub fn database(&self) -> &dyn SqlDatabase {
        self.db.as_ref()
    }

    pub fn context(&self) -> &ContextWindow {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ContextWindow {
        &mut self.context
    }
}
