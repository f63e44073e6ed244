//! Per-call invocation context.

/// How a tool call reached the server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InvocationContext {
    /// Local stdio connection; no caller credential
    #[default]
    Stdio,

    /// HTTP/SSE connection, carrying the bearer credential it authenticated
    /// with when authentication is enabled
    Network { credential: Option<String> },
}

impl InvocationContext {
    /// The caller's credential, usable as a Hyperbrowser API key
    pub fn credential(&self) -> Option<&str> {
        match self {
            InvocationContext::Stdio => None,
            InvocationContext::Network { credential } => credential.as_deref(),
        }
    }
}
