use tracing::Span;

/// Logging context handed to long-running components.
///
/// Carries the component name and a root span; everything the component
/// logs is recorded inside that span. Built explicitly by the process entry
/// point (or by a test) and passed down, so two components in one process
/// can log under different names.
#[derive(Debug, Clone)]
pub struct LogContext {
    component: &'static str,
    span: Span,
}

impl LogContext {
    pub fn new(component: &'static str) -> Self {
        let span = tracing::info_span!("component", name = component);
        Self { component, span }
    }

    /// Context whose span records nothing.
    pub fn disabled() -> Self {
        Self {
            component: "disabled",
            span: Span::none(),
        }
    }

    pub fn component(&self) -> &'static str {
        self.component
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Child context for a sub-unit of the same component.
    pub fn child(&self, unit: &'static str) -> Self {
        let span = tracing::info_span!(parent: &self.span, "unit", name = unit);
        Self {
            component: self.component,
            span,
        }
    }
}
