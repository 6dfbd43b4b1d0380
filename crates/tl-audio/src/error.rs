//! Output device errors.

use thiserror::Error;
use tl_engine::ContextError;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoDevice,
    #[error("device init error: {0}")]
    DeviceInit(#[from] cpal::DefaultStreamConfigError),
    #[error("stream create error: {0}")]
    StreamCreate(#[from] cpal::BuildStreamError),
    #[error("playback error: {0}")]
    Playback(#[from] cpal::PlayStreamError),
}

impl From<AudioError> for ContextError {
    fn from(err: AudioError) -> Self {
        ContextError::Unavailable(err.to_string())
    }
}
