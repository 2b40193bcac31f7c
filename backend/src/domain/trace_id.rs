//! Request-scoped trace identifier for correlation across logs and errors.
//!
//! `TraceId` follows a request through the system via task-local storage, so
//! the current identifier is available without explicit parameter threading.
//!
//! Tokio task-local variables are not inherited across spawned tasks. Use
//! [`TraceId::scope`] when moving work onto other tasks.

use std::future::Future;

use tokio::task_local;
use uuid::Uuid;

/// Response header carrying the trace identifier.
pub const TRACE_ID_HEADER: &str = "trace-id";

task_local! {
    static TRACE_ID: TraceId;
}

/// Per-request trace identifier exposed via task-local storage.
///
/// # Examples
/// ```
/// use ed_queue::domain::TraceId;
///
/// async fn handler() {
///     if let Some(id) = TraceId::current() {
///         println!("trace id: {id}");
///     }
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceId(Uuid);

impl TraceId {
    /// Generate a new random trace identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the current trace identifier if one is in scope.
    #[must_use]
    pub fn current() -> Option<Self> {
        TRACE_ID.try_with(|id| *id).ok()
    }

    /// Accept an identifier supplied by a caller, such as a kiosk.
    ///
    /// Surrounding whitespace is ignored. Malformed values and the nil UUID
    /// are rejected so the caller falls back to [`TraceId::generate`].
    #[must_use]
    pub fn from_header_value(raw: &str) -> Option<Self> {
        let uuid = Uuid::parse_str(raw.trim()).ok()?;
        (!uuid.is_nil()).then_some(Self(uuid))
    }

    /// Execute the provided future with the supplied trace identifier in scope.
    ///
    /// # Examples
    /// ```
    /// use ed_queue::domain::TraceId;
    ///
    /// # tokio::runtime::Runtime::new().expect("runtime").block_on(async {
    /// let trace_id: TraceId = "00000000-0000-0000-0000-000000000000"
    ///     .parse()
    ///     .expect("valid UUID");
    /// let observed = TraceId::scope(trace_id, async move { TraceId::current() }).await;
    /// assert_eq!(observed, Some(trace_id));
    /// # });
    /// ```
    pub async fn scope<Fut>(trace_id: TraceId, fut: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        TRACE_ID.scope(trace_id, fut).await
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TraceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}
