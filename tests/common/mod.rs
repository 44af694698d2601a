//! Shared test doubles: deterministic embedders and a scripted language model.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use docqa::{ChatMessage, EmbeddingProvider, LanguageModel, QaError};

/// Deterministic hash-based embeddings: the vector direction depends only on
/// the text content. Records every embedded text so tests can assert which
/// queries reached the provider.
pub struct HashEmbedder {
    dimensions: usize,
    calls: Mutex<Vec<String>>,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> docqa::Result<Vec<f32>> {
        self.calls.lock().unwrap().push(text.to_string());

        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut emb = vec![0.0f32; self.dimensions];
        for (i, v) in emb.iter_mut().enumerate() {
            // Reduce before casting: a ~1e19 u64 cast straight to f32 loses
            // the +i entirely, collapsing every component to the same value.
            let h = hash.wrapping_add((i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
            *v = ((h % 10_000) as f32).sin();
        }
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            emb.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Embeds every text as the same unit vector, so every chunk scores a cosine
/// similarity of exactly 1.0 against every query.
pub struct ConstantEmbedder {
    dimensions: usize,
}

impl ConstantEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for ConstantEmbedder {
    async fn embed(&self, _text: &str) -> docqa::Result<Vec<f32>> {
        let mut emb = vec![0.0f32; self.dimensions];
        emb[0] = 1.0;
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Replays a fixed sequence of replies and records every call. Running out
/// of replies fails the call the way a real provider failure would.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<(String, Vec<ChatMessage>)>>,
}

impl ScriptedModel {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every (system instruction, messages) pair this model has seen.
    pub fn calls(&self) -> Vec<(String, Vec<ChatMessage>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, system: &str, messages: &[ChatMessage]) -> docqa::Result<String> {
        self.calls.lock().unwrap().push((system.to_string(), messages.to_vec()));
        self.replies.lock().unwrap().pop_front().ok_or_else(|| QaError::Generation {
            provider: "scripted".to_string(),
            message: "no scripted reply available".to_string(),
        })
    }
}
