//! Realtime audio output for tonelab.

mod cpal_backend;
mod error;

pub use cpal_backend::{CpalContext, CpalProvider};
pub use error::AudioError;
