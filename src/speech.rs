//! Console stand-ins for the speech collaborator.
//!
//! [`ConsoleSpeaker`] writes each line to an output stream, optionally pausing
//! for as long as it would take to say it aloud. [`LinePrompt`] asks whether to
//! continue and reads the answer from an input stream.

use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::delivery::{ContinuePrompt, Continuation, Speaker};
use crate::errors::SummaryError;
use crate::intent::{self, Intent};

pub const CONTINUE_QUESTION: &str = "Would you like to hear the next summary? [Y/n] ";

pub struct ConsoleSpeaker<W> {
    out: W,
    words_per_minute: u32,
}

impl<W: AsyncWrite + Unpin> ConsoleSpeaker<W> {
    /// `words_per_minute == 0` disables pacing.
    pub fn new(out: W, words_per_minute: u32) -> Self {
        Self {
            out,
            words_per_minute,
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn speaking_time(&self, text: &str) -> Duration {
        if self.words_per_minute == 0 {
            return Duration::ZERO;
        }
        let words = text.split_whitespace().count() as u64;
        Duration::from_millis(words * 60_000 / self.words_per_minute as u64)
    }
}

impl<W: AsyncWrite + Unpin> Speaker for ConsoleSpeaker<W> {
    async fn speak(&mut self, text: &str) -> Result<(), SummaryError> {
        let speech_error = |e: std::io::Error| SummaryError::Speech(e.to_string());
        self.out
            .write_all(format!("{text}\n").as_bytes())
            .await
            .map_err(speech_error)?;
        self.out.flush().await.map_err(speech_error)?;

        let pause = self.speaking_time(text);
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
        Ok(())
    }
}

/// Reads continue/stop answers line by line.
pub struct LinePrompt<'a, R, W> {
    input: &'a mut R,
    out: W,
}

impl<'a, R, W> LinePrompt<'a, R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: &'a mut R, out: W) -> Self {
        Self { input, out }
    }
}

impl<R, W> ContinuePrompt for LinePrompt<'_, R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    async fn confirm_continue(&mut self, remaining: usize) -> Continuation {
        if remaining == 0 {
            return Continuation::Continue;
        }
        if self.out.write_all(CONTINUE_QUESTION.as_bytes()).await.is_err()
            || self.out.flush().await.is_err()
        {
            return Continuation::Stop;
        }

        let mut answer = String::new();
        match self.input.read_line(&mut answer).await {
            Ok(0) | Err(_) => Continuation::Stop,
            Ok(_) => match intent::parse(&answer) {
                Intent::Stop => Continuation::Stop,
                other => {
                    debug!(answer = %answer.trim(), ?other, "Continuing delivery");
                    Continuation::Continue
                }
            },
        }
    }
}

/// Answers "continue" without asking.
pub struct AlwaysContinue;

impl ContinuePrompt for AlwaysContinue {
    async fn confirm_continue(&mut self, _remaining: usize) -> Continuation {
        Continuation::Continue
    }
}
