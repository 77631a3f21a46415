use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, VortexError};
use crate::interfaces::handler::Handler;

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, kind: &str, handler: Arc<dyn Handler>) -> Result<()> {
        if self.handlers.contains_key(kind) {
            return Err(VortexError::DuplicateHandler(kind.to_string()));
        }
        self.handlers.insert(kind.to_string(), handler);
        Ok(())
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(kind).cloned()
    }

    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::message::Envelope;
    use crate::node::Node;

    async fn noop(_node: Node, _msg: Envelope) -> Result<()> {
        Ok(())
    }

    #[test]
    fn rejects_second_handler_for_a_type() {
        let mut registry = HandlerRegistry::new();
        registry.register("read", Arc::new(noop)).unwrap();
        registry.register("echo", Arc::new(noop)).unwrap();

        let err = registry.register("read", Arc::new(noop)).unwrap_err();
        assert!(matches!(err, VortexError::DuplicateHandler(kind) if kind == "read"));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("write").is_none());
        assert_eq!(registry.types(), vec!["echo", "read"]);
    }
}
