//! Sustained sine tones keyed by id.
//!
//! All tones share one gain node on the output, created with the first
//! tone. Oscillators are stopped, never destroyed, so a tone can be
//! restarted without allocating anything on the context.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::context::{AudioContext, ContextError, GainId, OscillatorId};

/// Id used when a caller does not name a tone.
pub const DEFAULT_TONE: &str = "default";

/// State of one continuous tone.
#[derive(Clone, Debug, PartialEq)]
pub struct Tone {
    osc: OscillatorId,
    frequency: f64,
    started: bool,
}

impl Tone {
    pub fn oscillator(&self) -> OscillatorId {
        self.osc
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

#[derive(Clone, Debug)]
pub struct OscillatorBank {
    tones: BTreeMap<String, Tone>,
    bus: Option<GainId>,
    bus_gain: f32,
}

impl OscillatorBank {
    /// `bus_gain` is the linear level of the shared tone gain node.
    pub fn new(bus_gain: f32) -> Self {
        Self {
            tones: BTreeMap::new(),
            bus: None,
            bus_gain,
        }
    }

    /// Sound `id` at `frequency`, creating its oscillator on first use.
    /// Starting a tone that is already sounding only retunes it.
    pub fn start<C: AudioContext>(
        &mut self,
        ctx: &mut C,
        id: &str,
        frequency: f64,
    ) -> Result<(), ContextError> {
        let bus = match self.bus {
            Some(bus) => bus,
            None => {
                let bus = ctx.create_gain(self.bus_gain)?;
                self.bus = Some(bus);
                bus
            }
        };

        let tone = match self.tones.entry(id.to_owned()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let osc = ctx.create_oscillator(frequency, bus)?;
                log::debug!("created tone '{id}' at {frequency} Hz");
                entry.insert(Tone {
                    osc,
                    frequency,
                    started: false,
                })
            }
        };

        if tone.frequency != frequency {
            ctx.set_oscillator_frequency(tone.osc, frequency);
            tone.frequency = frequency;
        }
        if !tone.started {
            ctx.start_oscillator(tone.osc);
            tone.started = true;
            log::debug!("tone '{id}' started at {frequency} Hz");
        }
        Ok(())
    }

    /// Silence `id`. Returns whether it was sounding.
    pub fn stop<C: AudioContext>(&mut self, ctx: &mut C, id: &str) -> bool {
        match self.tones.get_mut(id) {
            Some(tone) if tone.started => {
                ctx.stop_oscillator(tone.osc);
                tone.started = false;
                log::debug!("tone '{id}' stopped");
                true
            }
            _ => false,
        }
    }

    /// Retune `id` without retriggering it. Returns false for an unknown id.
    pub fn set_frequency<C: AudioContext>(&mut self, ctx: &mut C, id: &str, frequency: f64) -> bool {
        let Some(tone) = self.tones.get_mut(id) else {
            return false;
        };
        if tone.frequency != frequency {
            ctx.set_oscillator_frequency(tone.osc, frequency);
            tone.frequency = frequency;
        }
        true
    }

    /// Silence every tone. Returns how many were sounding.
    pub fn stop_all<C: AudioContext>(&mut self, ctx: &mut C) -> usize {
        let mut stopped = 0;
        for tone in self.tones.values_mut().filter(|t| t.started) {
            ctx.stop_oscillator(tone.osc);
            tone.started = false;
            stopped += 1;
        }
        stopped
    }

    pub fn tone(&self, id: &str) -> Option<&Tone> {
        self.tones.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tone)> {
        self.tones.iter().map(|(id, tone)| (id.as_str(), tone))
    }

    /// The shared tone gain node, once any tone has been created.
    pub fn bus(&self) -> Option<GainId> {
        self.bus
    }

    pub fn len(&self) -> usize {
        self.tones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tones.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::OfflineContext;

    fn bank() -> OscillatorBank {
        OscillatorBank::new(0.25)
    }

    #[test]
    fn one_oscillator_per_id() {
        let mut ctx = OfflineContext::new(48000);
        let mut b = bank();
        b.start(&mut ctx, DEFAULT_TONE, 440.0).unwrap();
        b.start(&mut ctx, DEFAULT_TONE, 440.0).unwrap();
        b.start(&mut ctx, "other", 220.0).unwrap();

        assert_eq!(b.len(), 2);
        assert_eq!(ctx.oscillator_count(), 2);
        // both tones share the bus
        assert_eq!(ctx.gain_count(), 1);
    }

    #[test]
    fn restart_reuses_the_oscillator() {
        let mut ctx = OfflineContext::new(48000);
        let mut b = bank();
        b.start(&mut ctx, "t", 300.0).unwrap();
        let osc = b.tone("t").unwrap().oscillator();
        assert!(b.stop(&mut ctx, "t"));
        assert!(!b.stop(&mut ctx, "t"));

        b.start(&mut ctx, "t", 600.0).unwrap();
        let tone = b.tone("t").unwrap();
        assert_eq!(tone.oscillator(), osc);
        assert_eq!(tone.frequency(), 600.0);
        assert!(tone.is_started());
        assert_eq!(ctx.oscillator_count(), 1);
    }

    #[test]
    fn set_frequency_keeps_tone_running() {
        let mut ctx = OfflineContext::new(48000);
        let mut b = bank();
        b.start(&mut ctx, "t", 300.0).unwrap();
        assert!(b.set_frequency(&mut ctx, "t", 310.0));
        let tone = b.tone("t").unwrap();
        assert!(tone.is_started());
        assert_eq!(tone.frequency(), 310.0);

        assert!(!b.set_frequency(&mut ctx, "nope", 100.0));
        assert!(b.tone("nope").is_none());
    }

    #[test]
    fn stop_all_counts_only_sounding_tones() {
        let mut ctx = OfflineContext::new(48000);
        let mut b = bank();
        assert_eq!(b.stop_all(&mut ctx), 0);
        b.start(&mut ctx, "a", 200.0).unwrap();
        b.start(&mut ctx, "b", 300.0).unwrap();
        b.stop(&mut ctx, "a");

        assert_eq!(b.stop_all(&mut ctx), 1);
        assert!(b.iter().all(|(_, t)| !t.is_started()));
    }
}
