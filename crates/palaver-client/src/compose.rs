//! Per-conversation compose state: the text draft and the voice recorder.
//!
//! The recorder is a two-state machine. Audio chunks arrive from whatever
//! capture backend the embedding application uses; this module only buffers
//! them and enforces the legal transitions.

use crate::error::ComposeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
}

#[derive(Debug, Default)]
pub struct Composer {
    draft: String,
    recording: Option<Vec<u8>>,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn clear_draft(&mut self) {
        self.draft.clear();
    }

    pub fn recording_state(&self) -> RecordingState {
        if self.recording.is_some() {
            RecordingState::Recording
        } else {
            RecordingState::Idle
        }
    }

    /// Begin a new recording. A recording already in progress must be
    /// finished or cancelled first.
    pub fn start_recording(&mut self) -> Result<(), ComposeError> {
        if self.recording.is_some() {
            return Err(ComposeError::AlreadyRecording);
        }
        self.recording = Some(Vec::new());
        Ok(())
    }

    /// Append one captured audio chunk to the recording in progress.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Result<(), ComposeError> {
        match self.recording.as_mut() {
            Some(buffer) => {
                buffer.extend_from_slice(chunk);
                Ok(())
            }
            None => Err(ComposeError::NotRecording),
        }
    }

    /// Stop recording and take the buffered audio. The recorder returns to
    /// idle even on error, so a stray stop never wedges the machine.
    pub fn finish_recording(&mut self) -> Result<Vec<u8>, ComposeError> {
        match self.recording.take() {
            Some(audio) if audio.is_empty() => Err(ComposeError::EmptyRecording),
            Some(audio) => Ok(audio),
            None => Err(ComposeError::NotRecording),
        }
    }

    /// Discard the recording in progress, if any.
    pub fn cancel_recording(&mut self) {
        self.recording = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_concatenate_in_order() {
        let mut composer = Composer::new();
        composer.start_recording().unwrap();
        composer.push_chunk(b"abc").unwrap();
        composer.push_chunk(b"def").unwrap();

        assert_eq!(composer.finish_recording().unwrap(), b"abcdef");
        assert_eq!(composer.recording_state(), RecordingState::Idle);
    }

    #[test]
    fn double_start_is_rejected() {
        let mut composer = Composer::new();
        composer.start_recording().unwrap();
        assert_eq!(
            composer.start_recording(),
            Err(ComposeError::AlreadyRecording)
        );
        // The original recording is unaffected.
        composer.push_chunk(b"x").unwrap();
        assert_eq!(composer.finish_recording().unwrap(), b"x");
    }

    #[test]
    fn push_and_finish_require_a_recording() {
        let mut composer = Composer::new();
        assert_eq!(composer.push_chunk(b"x"), Err(ComposeError::NotRecording));
        assert_eq!(
            composer.finish_recording().unwrap_err(),
            ComposeError::NotRecording
        );
    }

    #[test]
    fn empty_recording_is_rejected_and_recorder_resets() {
        let mut composer = Composer::new();
        composer.start_recording().unwrap();

        assert_eq!(
            composer.finish_recording().unwrap_err(),
            ComposeError::EmptyRecording
        );
        assert_eq!(composer.recording_state(), RecordingState::Idle);
        // A fresh recording works immediately afterwards.
        composer.start_recording().unwrap();
    }

    #[test]
    fn cancel_discards_the_buffer() {
        let mut composer = Composer::new();
        composer.start_recording().unwrap();
        composer.push_chunk(b"audio").unwrap();
        composer.cancel_recording();

        assert_eq!(composer.recording_state(), RecordingState::Idle);
        assert_eq!(
            composer.finish_recording().unwrap_err(),
            ComposeError::NotRecording
        );
    }

    #[test]
    fn draft_survives_recording() {
        let mut composer = Composer::new();
        composer.set_draft("half-typed");
        composer.start_recording().unwrap();
        composer.push_chunk(b"x").unwrap();
        composer.finish_recording().unwrap();

        assert_eq!(composer.draft(), "half-typed");
    }
}
