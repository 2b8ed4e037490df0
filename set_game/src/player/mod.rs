//! Player seats.
//!
//! Every seat runs a [`PlayerSession`] on its own thread. Computer seats also
//! run an [`AiWorker`] that feeds random moves into the session and parks
//! whenever the session is not collecting.

pub mod ai;
pub mod session;

pub use ai::{AiGate, AiWorker};
pub use session::{PlayerSession, SessionSnapshot, Submission};
