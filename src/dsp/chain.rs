//! Effect Chain
//!
//! Effects are applied in chain order (index 0 first), each one rendering
//! the previous one's output. Used for the podcast segments (clip, then
//! fade) and the combined experiment (fade, then tempo change).

use serde_json::Value;

use super::Effect;
use crate::engine::AudioBuffer;
use crate::error::Result;

/// Ordered list of effects
#[derive(Clone, Default)]
pub struct EffectChain {
    effects: Vec<Box<dyn Effect>>,
}

impl EffectChain {
    /// Create a new empty effect chain
    pub fn new() -> Self {
        Self {
            effects: Vec::new(),
        }
    }

    /// Append an effect, builder style
    pub fn with(mut self, effect: Box<dyn Effect>) -> Self {
        self.push(effect);
        self
    }

    /// Append an effect at the end of the chain
    pub fn push(&mut self, effect: Box<dyn Effect>) {
        self.effects.push(effect);
    }

    /// Render `input` through every effect in order
    ///
    /// An empty chain returns a copy of the input.
    pub fn process(&self, input: &AudioBuffer) -> Result<AudioBuffer> {
        let mut buffer = input.clone();
        for effect in &self.effects {
            buffer = effect.process(&buffer)?;
        }
        Ok(buffer)
    }

    /// Suffixes of all effects, concatenated in chain order
    pub fn file_suffix(&self) -> String {
        self.effects.iter().map(|e| e.file_suffix()).collect()
    }

    /// Get the number of effects in the chain
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Check if the chain is empty
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Iterate over effects
    pub fn iter(&self) -> impl Iterator<Item = &dyn Effect> {
        self.effects.iter().map(|e| e.as_ref())
    }

    /// Describe the chain as JSON
    pub fn to_json(&self) -> Value {
        let effects: Vec<Value> = self
            .effects
            .iter()
            .map(|e| {
                serde_json::json!({
                    "type": e.effect_type(),
                    "params": e.get_params(),
                })
            })
            .collect();

        serde_json::json!({ "effects": effects })
    }
}

impl Effect for EffectChain {
    fn process(&self, input: &AudioBuffer) -> Result<AudioBuffer> {
        EffectChain::process(self, input)
    }

    fn effect_type(&self) -> &'static str {
        "chain"
    }

    fn display_name(&self) -> &str {
        "Effect Chain"
    }

    fn file_suffix(&self) -> String {
        EffectChain::file_suffix(self)
    }

    fn get_params(&self) -> Value {
        self.to_json()
    }

    fn box_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{Clip, Fade, TimeStretch};
    use crate::engine::generate_test_tone;

    #[test]
    fn test_chain_new() {
        let chain = EffectChain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.len(), 0);
        assert_eq!(chain.file_suffix(), "");
    }

    #[test]
    fn test_empty_chain_passthrough() {
        let input = generate_test_tone(440.0, 0.5, 8000);
        assert_eq!(EffectChain::new().process(&input).unwrap(), input);
    }

    #[test]
    fn test_fade_then_tempo() {
        let chain = EffectChain::new()
            .with(Box::new(Fade::default()))
            .with(Box::new(TimeStretch::new(1.2).unwrap()));

        assert_eq!(chain.file_suffix(), "_fade_12x");

        let input = generate_test_tone(220.0, 6.0, 8000);
        let output = chain.process(&input).unwrap();
        assert!((output.duration_secs() - 5.0).abs() < 0.01);
        // The fade survives the stretch
        assert!(output.samples[0][0].abs() < 1e-3);
    }

    #[test]
    fn test_order_matters() {
        let input = generate_test_tone(220.0, 4.0, 8000);
        let clip_first = EffectChain::new()
            .with(Box::new(Clip::Head(1000)))
            .with(Box::new(Fade::fade_in(500)));

        let output = clip_first.process(&input).unwrap();
        assert_eq!(output.len(), 8000);
        assert_eq!(output.samples[0][0], 0.0);
    }

    #[test]
    fn test_to_json_lists_effects() {
        let chain = EffectChain::new()
            .with(Box::new(Fade::fade_in(3000)))
            .with(Box::new(TimeStretch::new(1.5).unwrap()));

        let json = chain.to_json();
        assert_eq!(json["effects"][0]["type"], "fade");
        assert_eq!(json["effects"][1]["params"]["rate"], 1.5);
    }
}
