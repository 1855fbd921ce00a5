//! Best-effort persistence of a single document
//!
//! Read and write failures are logged, counted and reflected in component
//! health. They are never returned to the caller; the owning store keeps
//! its in-memory state authoritative.

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

use super::{load_json, save_json, DocumentStore};
use crate::health::HealthRegistry;
use crate::observability::{SentinelMetrics, StructuredLogger};

/// Observability sinks shared by every persisted document
#[derive(Clone)]
pub struct Instrumentation {
    pub health: HealthRegistry,
    pub metrics: SentinelMetrics,
    pub logger: StructuredLogger,
}

impl Instrumentation {
    pub fn new(instance: &str) -> Self {
        Self {
            health: HealthRegistry::new(),
            metrics: SentinelMetrics::new(),
            logger: StructuredLogger::new(instance),
        }
    }
}

/// One named document on a backend, tied to the health component that owns it
#[derive(Clone)]
pub struct DocumentHandle {
    backend: Arc<dyn DocumentStore>,
    document: &'static str,
    component: &'static str,
    instrumentation: Instrumentation,
}

impl DocumentHandle {
    pub fn new(
        backend: Arc<dyn DocumentStore>,
        document: &'static str,
        component: &'static str,
        instrumentation: Instrumentation,
    ) -> Self {
        instrumentation.health.register(component);
        Self {
            backend,
            document,
            component,
            instrumentation,
        }
    }

    pub fn document(&self) -> &'static str {
        self.document
    }

    /// Load the document, treating missing, unreadable and corrupt documents alike as absent
    pub fn load<T: DeserializeOwned>(&self) -> Option<T> {
        match load_json(self.backend.as_ref(), self.document) {
            Ok(value) => value,
            Err(e) => {
                self.report_failure("load", &e.to_string());
                None
            }
        }
    }

    /// Save the document; returns whether the write reached the backend
    pub fn save<T: Serialize + ?Sized>(&self, value: &T) -> bool {
        match save_json(self.backend.as_ref(), self.document, value) {
            Ok(()) => {
                self.instrumentation.health.set_healthy(self.component);
                true
            }
            Err(e) => {
                self.report_failure("save", &e.to_string());
                false
            }
        }
    }

    fn report_failure(&self, operation: &str, error: &str) {
        self.instrumentation
            .logger
            .log_storage_error(self.document, operation, error);
        self.instrumentation.metrics.inc_storage_errors(self.document);
        self.instrumentation.health.set_degraded(
            self.component,
            format!("{} of '{}' failed: {}", operation, self.document, error),
        );
    }
}
