use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::AlertChannel;

/// Plays a local audio asset once per trigger.
///
/// Playback does not block the frame loop: the output stream is kept alive by the
/// channel until the next trigger or until the channel is dropped with its session.
pub struct BuzzerChannel {
    path: PathBuf,
    #[cfg(feature = "audio-rodio")]
    playback: Option<Playback>,
}

#[cfg(feature = "audio-rodio")]
struct Playback {
    _stream: rodio::OutputStream,
    _sink: rodio::Sink,
}

impl BuzzerChannel {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            #[cfg(feature = "audio-rodio")]
            playback: None,
        }
    }

    fn open_asset(&self) -> Result<File> {
        File::open(&self.path)
            .with_context(|| format!("failed to open buzzer audio {}", self.path.display()))
    }

    #[cfg(feature = "audio-rodio")]
    fn play(&mut self, file: File) -> Result<()> {
        use std::io::BufReader;

        let (stream, handle) =
            rodio::OutputStream::try_default().context("no audio output device available")?;
        let sink = rodio::Sink::try_new(&handle).context("failed to create audio sink")?;
        let source = rodio::Decoder::new(BufReader::new(file))
            .with_context(|| format!("failed to decode {}", self.path.display()))?;
        sink.append(source);
        self.playback = Some(Playback {
            _stream: stream,
            _sink: sink,
        });
        Ok(())
    }

    #[cfg(not(feature = "audio-rodio"))]
    fn play(&mut self, _file: File) -> Result<()> {
        anyhow::bail!("buzzer playback requires the audio-rodio feature")
    }
}

impl AlertChannel for BuzzerChannel {
    fn name(&self) -> &'static str {
        "buzzer"
    }

    fn fire(&mut self) -> Result<()> {
        let file = self.open_asset()?;
        self.play(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_asset_is_reported() {
        let mut buzzer = BuzzerChannel::new("/nonexistent/buzzer.mp3");
        let err = buzzer.fire().unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/buzzer.mp3"));
    }
}
