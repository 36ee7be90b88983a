//! Playback side of a resolution.
//!
//! A [`Playback`] backend receives the winning candidate's source identifier
//! and starts it on whatever device it is bound to. Backends carry their own
//! device context (host, port, queue behaviour); the resolver never passes
//! any. Failures surface to the caller unchanged and are not retried.

use crate::error::PlaybackError;

pub trait Playback {
    fn play(&self, source_identifier: &str) -> Result<(), PlaybackError>;
}

impl<F> Playback for F
where
    F: Fn(&str) -> Result<(), PlaybackError>,
{
    fn play(&self, source_identifier: &str) -> Result<(), PlaybackError> {
        self(source_identifier)
    }
}
