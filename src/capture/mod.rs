//! Capture pipeline for relayed traffic.
//!
//! # Data Flow
//! ```text
//! body bytes
//!     → sink.rs (form decode)
//!     → telemetry extraction (request to the status endpoint only)
//!     → classify.rs (pick the .xml extension)
//!     → redact.rs (optional <update> removal)
//!     → pretty.rs (indent markup)
//!     → filename.rs (artifact name)
//!     → storage directory
//! ```
//!
//! # Design Decisions
//! - Capture never fails the request; every error is logged and absorbed
//! - One artifact per (method, target, direction); repeats overwrite

pub mod classify;
pub mod filename;
pub mod pretty;
pub mod redact;
pub mod sink;

use axum::http::{Method, Uri};

pub use classify::{is_status_document, is_well_formed_markup};
pub use filename::{build_identifier, Charset};
pub use pretty::prettify;
pub use redact::redact_updates;
pub use sink::{CaptureError, CaptureSink};

/// Which side of the exchange a body belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Response,
}

impl Direction {
    /// Artifact name suffix for this direction.
    pub fn suffix(self) -> &'static str {
        match self {
            Direction::Request => "",
            Direction::Response => "response",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Request => "request",
            Direction::Response => "response",
        }
    }
}

/// The parts of an inbound request that name its artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: String,
    pub path: String,
    pub raw_query: Option<String>,
    /// Path and query exactly as received, when known.
    pub request_target: Option<String>,
}

impl RequestDescriptor {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            raw_query: None,
            request_target: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.raw_query = Some(query.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.request_target = Some(target.into());
        self
    }

    /// Describe a request from its method and URI.
    pub fn from_parts(method: &Method, uri: &Uri) -> Self {
        let mut descriptor = Self::new(method.as_str(), uri.path());
        if let Some(query) = uri.query() {
            descriptor = descriptor.with_query(query);
        }
        if let Some(target) = uri.path_and_query() {
            descriptor = descriptor.with_target(target.as_str());
        }
        descriptor
    }

    /// The request target, rebuilt from path and query when not recorded.
    pub fn target(&self) -> String {
        if let Some(target) = self.request_target.as_deref().filter(|t| !t.is_empty()) {
            return target.to_string();
        }
        match self.raw_query.as_deref() {
            Some(query) if !query.is_empty() => format!("{}?{}", self.path, query),
            _ => self.path.clone(),
        }
    }
}
