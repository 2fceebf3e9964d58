//! Session module
//!
//! A session pairs one capture loop and one input dispatcher targeting the
//! same window over one pair of connections.

pub mod capture;
pub mod dispatcher;
pub mod host;

pub use capture::{CaptureReport, CaptureSession, CaptureStop};
pub use dispatcher::{DispatchReport, DispatchStop, InputDispatcher};
pub use host::{spawn_session, SessionHandle, SessionHost, SessionReport};
