//! The message contract for topic payloads.

/// A payload deliverable over the platform topic.
///
/// Messages are:
/// - **immutable** (treat them as facts)
/// - delivered **at-least-once** (consumers must be idempotent)
/// - **unordered across keys** (ordered only within one ordering key)
pub trait Message: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable message name/type identifier (e.g. "consumo.estoque").
    fn message_type(&self) -> &'static str;

    /// Ordering key for this message, when delivery order matters.
    ///
    /// Messages sharing a key are delivered in publish order; across different
    /// keys there is no guarantee. Cascade signals key by target id so stage
    /// runs for one document never race each other.
    fn ordering_key(&self) -> Option<String> {
        None
    }
}
