//! Sound loading and playback for the Sprig engine.
//!
//! Sounds are decoded up front with [`AudioSystem::load`], which hands back
//! a dense [`SoundId`] in load order, and started with
//! [`AudioSystem::play`].

use std::path::Path;

use kira::manager::backend::DefaultBackend;
use kira::manager::{AudioManager, AudioManagerSettings};
use kira::sound::static_sound::{StaticSoundData, StaticSoundHandle};
use kira::tween::Tween;
use kira::Volume;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Audio device unavailable: {0}")]
    Device(String),
    #[error("Failed to load {path}: {reason}")]
    Load { path: String, reason: String },
    #[error("Unknown sound id {0}")]
    UnknownSound(usize),
    #[error("Failed to play sound {id}: {reason}")]
    Play { id: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, AudioError>;

/// Index of a loaded sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoundId(pub usize);

/// Sounds addressed by dense ids in load order.
#[derive(Debug, Clone)]
pub struct SoundLibrary<T> {
    sounds: Vec<T>,
}

impl<T> Default for SoundLibrary<T> {
    fn default() -> Self {
        Self { sounds: Vec::new() }
    }
}

impl<T> SoundLibrary<T> {
    pub fn insert(&mut self, sound: T) -> SoundId {
        self.sounds.push(sound);
        SoundId(self.sounds.len() - 1)
    }

    pub fn get(&self, id: SoundId) -> Result<&T> {
        self.sounds.get(id.0).ok_or(AudioError::UnknownSound(id.0))
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }
}

/// Output device plus the loaded sounds.
///
/// A muted system decodes and validates sounds but never opens a device.
pub struct AudioSystem {
    manager: Option<AudioManager<DefaultBackend>>,
    library: SoundLibrary<StaticSoundData>,
    playing: Vec<StaticSoundHandle>,
}

impl AudioSystem {
    /// Open the default output device.
    pub fn new() -> Result<Self> {
        let manager = AudioManager::<DefaultBackend>::new(AudioManagerSettings::default())
            .map_err(|e| AudioError::Device(format!("{e:?}")))?;
        info!("Audio output opened");
        Ok(Self {
            manager: Some(manager),
            library: SoundLibrary::default(),
            playing: Vec::new(),
        })
    }

    /// A system without an output device.
    pub fn muted() -> Self {
        Self {
            manager: None,
            library: SoundLibrary::default(),
            playing: Vec::new(),
        }
    }

    /// Open the default device, falling back to [`Self::muted`].
    pub fn new_or_muted() -> Self {
        Self::new().unwrap_or_else(|e| {
            warn!("{e}; continuing without sound");
            Self::muted()
        })
    }

    pub fn is_muted(&self) -> bool {
        self.manager.is_none()
    }

    /// Decode a sound file.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<SoundId> {
        let path = path.as_ref();
        let data = StaticSoundData::from_file(path).map_err(|e| AudioError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let id = self.library.insert(data);
        info!("Loaded sound {} as {}", path.display(), id.0);
        Ok(id)
    }

    /// Start a loaded sound. `gain` is a linear amplitude factor.
    pub fn play(&mut self, id: SoundId, looping: bool, gain: f64) -> Result<()> {
        let mut data = self.library.get(id)?.clone().volume(Volume::Amplitude(gain));
        if looping {
            data = data.loop_region(..);
        }

        let Some(manager) = self.manager.as_mut() else {
            return Ok(());
        };
        let handle = manager.play(data).map_err(|e| AudioError::Play {
            id: id.0,
            reason: format!("{e:?}"),
        })?;
        self.playing.push(handle);
        Ok(())
    }

    /// Stop everything that is playing.
    pub fn stop_all(&mut self) {
        for mut handle in self.playing.drain(..) {
            handle.stop(Tween::default());
        }
    }

    pub fn sound_count(&self) -> usize {
        self.library.len()
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dense_in_load_order() {
        let mut library = SoundLibrary::default();
        let music = library.insert("music");
        let steps = library.insert("steps");
        assert_eq!(music, SoundId(0));
        assert_eq!(steps, SoundId(1));
        assert_eq!(*library.get(steps).unwrap(), "steps");
    }

    #[test]
    fn unknown_id_is_an_error() {
        let library: SoundLibrary<&str> = SoundLibrary::default();
        assert!(matches!(
            library.get(SoundId(3)),
            Err(AudioError::UnknownSound(3))
        ));
    }

    #[test]
    fn muted_system_rejects_missing_files_and_ids() {
        let mut audio = AudioSystem::muted();
        assert!(audio.is_muted());
        assert!(matches!(
            audio.load("does/not/exist.wav"),
            Err(AudioError::Load { .. })
        ));
        assert!(matches!(
            audio.play(SoundId(0), true, 1.0),
            Err(AudioError::UnknownSound(0))
        ));
        assert_eq!(audio.sound_count(), 0);
    }
}
