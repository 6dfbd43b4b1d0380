//! VoiceRegistry: id → click voice, created lazily and never removed.

use slotmap::SlotMap;
use std::collections::HashMap;
use std::ops::{Index, IndexMut};
use tl_ir::PitchClass;

use crate::context::{AudioContext, ContextError};
use crate::voice::{ClickVoice, VoiceKey};

/// Owns every click voice ever started.
#[derive(Clone, Debug, Default)]
pub struct VoiceRegistry {
    voices: SlotMap<VoiceKey, ClickVoice>,
    by_id: HashMap<String, VoiceKey>,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `id`, creating it if absent.
    ///
    /// A new voice synthesizes its click for `pitch` and gets its own gain
    /// node. An existing voice is returned untouched: its pitch class was
    /// fixed by the first call and `pitch` is ignored.
    pub fn get_or_create<C: AudioContext>(
        &mut self,
        id: &str,
        pitch: PitchClass,
        ctx: &mut C,
        gain: f32,
    ) -> Result<VoiceKey, ContextError> {
        if let Some(&key) = self.by_id.get(id) {
            return Ok(key);
        }

        let buffer = tl_ir::synthesize(ctx.sample_rate(), pitch);
        let gain = ctx.create_gain(gain)?;
        let key = self.voices.insert(ClickVoice::new(id, buffer, gain));
        self.by_id.insert(id.to_owned(), key);
        log::debug!("created click voice '{id}' ({pitch:?}, gain node {})", gain.0);
        Ok(key)
    }

    pub fn key(&self, id: &str) -> Option<VoiceKey> {
        self.by_id.get(id).copied()
    }

    pub fn get(&self, key: VoiceKey) -> Option<&ClickVoice> {
        self.voices.get(key)
    }

    pub fn get_mut(&mut self, key: VoiceKey) -> Option<&mut ClickVoice> {
        self.voices.get_mut(key)
    }

    pub fn by_id(&self, id: &str) -> Option<&ClickVoice> {
        self.key(id).and_then(|key| self.voices.get(key))
    }

    pub fn by_id_mut(&mut self, id: &str) -> Option<&mut ClickVoice> {
        let key = self.key(id)?;
        self.voices.get_mut(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (VoiceKey, &ClickVoice)> {
        self.voices.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (VoiceKey, &mut ClickVoice)> {
        self.voices.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

impl Index<VoiceKey> for VoiceRegistry {
    type Output = ClickVoice;

    fn index(&self, key: VoiceKey) -> &ClickVoice {
        &self.voices[key]
    }
}

impl IndexMut<VoiceKey> for VoiceRegistry {
    fn index_mut(&mut self, key: VoiceKey) -> &mut ClickVoice {
        &mut self.voices[key]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::OfflineContext;

    #[test]
    fn creates_once_per_id() {
        let mut ctx = OfflineContext::new(48000);
        let mut reg = VoiceRegistry::new();

        let a = reg.get_or_create("a", PitchClass::High, &mut ctx, 0.5).unwrap();
        let again = reg.get_or_create("a", PitchClass::High, &mut ctx, 0.5).unwrap();
        assert_eq!(a, again);
        assert_eq!(reg.len(), 1);
        assert_eq!(ctx.gain_count(), 1);
    }

    #[test]
    fn first_pitch_class_wins() {
        let mut ctx = OfflineContext::new(48000);
        let mut reg = VoiceRegistry::new();

        reg.get_or_create("v", PitchClass::Low, &mut ctx, 0.5).unwrap();
        let before = reg.by_id("v").unwrap().buffer().clone();
        reg.get_or_create("v", PitchClass::High, &mut ctx, 0.5).unwrap();

        let voice = reg.by_id("v").unwrap();
        assert_eq!(voice.pitch(), PitchClass::Low);
        assert!(voice.buffer().ptr_eq(&before));
    }

    #[test]
    fn distinct_ids_get_distinct_gain_nodes() {
        let mut ctx = OfflineContext::new(44100);
        let mut reg = VoiceRegistry::new();
        reg.get_or_create("poly-1", PitchClass::High, &mut ctx, 0.5).unwrap();
        reg.get_or_create("poly-2", PitchClass::Low, &mut ctx, 0.5).unwrap();

        let g1 = reg.by_id("poly-1").unwrap().gain();
        let g2 = reg.by_id("poly-2").unwrap().gain();
        assert_ne!(g1, g2);
        assert_eq!(reg.by_id("poly-2").unwrap().buffer().len(), 176);
    }

    #[test]
    fn new_voice_is_idle() {
        let mut ctx = OfflineContext::new(44100);
        let mut reg = VoiceRegistry::new();
        reg.get_or_create("x", PitchClass::High, &mut ctx, 0.5).unwrap();
        let v = reg.by_id("x").unwrap();
        assert!(!v.is_running());
        assert!(v.rearm().is_none());
        assert!(reg.by_id("missing").is_none());
    }
}
