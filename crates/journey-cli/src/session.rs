//! A generation session fed by the mock inference source: tokenizes the
//! prompt, then samples one token at a time whenever the scene goes idle.

use journey_core::mock::{generate_all_layers, generate_mock_candidates, sample_top_p};
use journey_core::{
    FrameOutput, GenerationStatus, HeadlessBackend, Scene, SceneConfig, SceneEvent, Token,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;

const TEMPERATURE: f64 = 0.8;
const TOP_P: f64 = 0.9;

pub struct Session {
    scene: Scene<HeadlessBackend>,
    rng: SmallRng,
    prompt_len: usize,
    to_generate: usize,
    generated: usize,
    finished: bool,
}

impl Session {
    pub fn new(
        config: SceneConfig,
        prompt: &str,
        to_generate: usize,
        seed: u64,
    ) -> anyhow::Result<Self> {
        let tokens = tokenize(prompt);
        anyhow::ensure!(!tokens.is_empty(), "prompt has no tokens");

        let total_layers = config.total_layers();
        let mut scene = Scene::new(config, HeadlessBackend::new())?;
        let mut rng = SmallRng::seed_from_u64(seed);

        scene.set_status(GenerationStatus::Tokenizing);
        let prompt_len = tokens.len();
        scene.set_attention(generate_all_layers(prompt_len, total_layers, &mut rng));
        scene.set_tokens(tokens);
        scene.set_status(GenerationStatus::Inferring);
        tracing::debug!("session: {prompt_len} prompt tokens, {to_generate} to generate");

        Ok(Self {
            scene,
            rng,
            prompt_len,
            to_generate,
            generated: 0,
            finished: false,
        })
    }

    /// Tick the scene. When it settles, sample the next token or, once
    /// every token is generated, mark the session finished.
    pub fn frame(&mut self, now_ms: f64) -> FrameOutput {
        let mut output = self.scene.tick(now_ms);
        if output.needs_redraw || self.finished {
            return output;
        }

        if self.generated < self.to_generate {
            self.sample_next();
            output.needs_redraw = true;
        } else {
            self.scene.set_status(GenerationStatus::Complete);
            self.finished = true;
        }
        output
    }

    fn sample_next(&mut self) {
        self.scene.set_status(GenerationStatus::Sampling);
        let candidates = generate_mock_candidates(TEMPERATURE, &mut self.rng);
        let probs: Vec<f64> = candidates.iter().map(|c| c.probability).collect();
        let pick = &candidates[sample_top_p(&probs, TOP_P, &mut self.rng)];
        let token = Token::new(pick.token_id, pick.token.clone(), self.generated);
        tracing::debug!("sampled '{}' (p={:.3})", token.text, pick.probability);

        self.scene.set_candidates(candidates);
        self.scene.push_generated(token);
        self.generated += 1;

        let count = self.prompt_len + self.generated;
        let layers = self.scene.config().total_layers();
        self.scene.set_attention(generate_all_layers(count, layers, &mut self.rng));
        self.scene.set_status(GenerationStatus::Inferring);
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        self.scene.drain_events().collect()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn prompt_len(&self) -> usize {
        self.prompt_len
    }

    pub fn generated(&self) -> usize {
        self.generated
    }

    pub fn scene(&self) -> &Scene<HeadlessBackend> {
        &self.scene
    }

    pub fn into_scene(self) -> Scene<HeadlessBackend> {
        self.scene
    }
}

/// Whitespace tokenizer with FNV-1a ids, standing in for a real vocabulary.
pub fn tokenize(prompt: &str) -> Vec<Token> {
    prompt
        .split_whitespace()
        .enumerate()
        .map(|(i, word)| Token::new(token_id(word), word, i))
        .collect()
}

fn token_id(word: &str) -> u32 {
    word.bytes().fold(0x811c_9dc5, |hash: u32, b| {
        (hash ^ b as u32).wrapping_mul(0x0100_0193)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("  the cat  the ");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2].position, 2);
        assert_eq!(tokens[0].id, tokens[2].id, "same word, same id");
        assert_ne!(tokens[0].id, tokens[1].id);
    }

    #[test]
    fn test_empty_prompt_rejected() {
        assert!(Session::new(SceneConfig::default(), "   ", 0, 1).is_err());
    }

    #[test]
    fn test_session_generates_then_finishes() {
        let mut session = Session::new(SceneConfig::default(), "hello world", 2, 7).unwrap();
        let mut now = 0.0;
        while !session.is_finished() {
            session.frame(now);
            now += 1000.0 / 30.0;
            assert!(now < 300_000.0, "session never finished");
        }
        assert_eq!(session.generated(), 2);
        assert_eq!(session.scene().completed(), 4);
        assert_eq!(session.scene().status(), GenerationStatus::Complete);
        assert!(!session.scene().ring().is_empty());
    }
}
