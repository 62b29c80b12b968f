//! Model-wide error sink.
//!
//! Actor threads cannot return errors to the thread that runs the model, so
//! they report them here instead.

use std::sync::Arc;

use dirigent_core::Error;
use parking_lot::Mutex;
use tracing::error;

/// An error together with the name of the component that raised it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedError {
    pub source: String,
    pub error: Error,
}

/// Cloneable collector of reported errors.
#[derive(Debug, Clone, Default)]
pub struct ErrorSink {
    reported: Arc<Mutex<Vec<ReportedError>>>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, source: impl Into<String>, error: Error) {
        let source = source.into();
        error!(source = %source, error = %error, "Error reported to model");
        self.reported.lock().push(ReportedError { source, error });
    }

    /// Snapshot of everything reported so far.
    pub fn errors(&self) -> Vec<ReportedError> {
        self.reported.lock().clone()
    }

    /// Remove and return everything reported so far.
    pub fn take(&self) -> Vec<ReportedError> {
        std::mem::take(&mut *self.reported.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.reported.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_collect_reports_across_clones() {
        let sink = ErrorSink::new();
        let clone = sink.clone();
        clone.report("ramp", Error::illegal_action("ramp", "boom"));

        assert_eq!(sink.errors().len(), 1);
        assert_eq!(sink.take().first().map(|r| r.source.as_str()), Some("ramp"));
        assert!(sink.is_empty());
    }
}
