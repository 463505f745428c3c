//! Fakes and fixtures shared by unit tests

use async_trait::async_trait;
use bytes::Bytes;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, LlmProvider, ObjectStore};

/// Deterministic bag-of-words embedder
///
/// Each lowercase token is hashed into one of `dimensions` buckets.
pub struct HashEmbedder {
    dimensions: usize,
    model: String,
    available: bool,
    delay: Option<Duration>,
    embed_calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            model: "hash-embedder".to_string(),
            available: true,
            delay: None,
            embed_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Sleep for `delay` on every embed call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// An embedder whose model can never be loaded
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(8)
        }
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn ensure_ready(&self) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(Error::ModelUnavailable(format!("{} is not pulled", self.model)))
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let digest = Sha256::digest(token.as_bytes());
            let bucket = u64::from_le_bytes([
                digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
            ]) as usize
                % self.dimensions;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        Ok(vector)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Scripted language model that records the prompts it receives
pub struct FakeLlm {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl FakeLlm {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A model whose every call fails
    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        self.reply
            .clone()
            .ok_or_else(|| Error::generation("model crashed"))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.reply.is_some())
    }

    fn model(&self) -> &str {
        "fake-llm"
    }
}

/// In-memory bucket with scriptable failures
#[derive(Default)]
pub struct FakeObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    transient_failures: Mutex<HashMap<String, u32>>,
    denied: Mutex<HashSet<String>>,
    get_calls: Mutex<HashMap<String, u32>>,
}

impl FakeObjectStore {
    pub fn insert(&self, key: &str, data: Vec<u8>) {
        self.objects.lock().insert(key.to_string(), data);
    }

    /// Fail the next `times` downloads of `key` with a transient error
    pub fn fail_transiently(&self, key: &str, times: u32) {
        self.transient_failures.lock().insert(key.to_string(), times);
    }

    pub fn deny(&self, key: &str) {
        self.denied.lock().insert(key.to_string());
    }

    pub fn get_calls(&self, key: &str) -> u32 {
        self.get_calls.lock().get(key).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn get_object(&self, key: &str) -> Result<Bytes> {
        *self.get_calls.lock().entry(key.to_string()).or_insert(0) += 1;

        if self.denied.lock().contains(key) {
            return Err(Error::PermissionDenied(key.to_string()));
        }
        if let Some(remaining) = self.transient_failures.lock().get_mut(key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::Transient(format!("{}: connection reset", key)));
            }
        }
        self.objects
            .lock()
            .get(key)
            .map(|data| Bytes::from(data.clone()))
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    async fn list_objects(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.objects.lock().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn bucket(&self) -> &str {
        "test-bucket"
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Build a PDF with one page per entry, each line its own text object
pub fn pdf_with_pages(pages: &[&[&str]]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
            operations.push(Operation::new("Td", vec![40.into(), (800 - 14 * i as i64).into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let encoded = content.encode().unwrap();
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Distinct sentences for multi-chunk pages
pub fn long_page_lines(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("Line {} describes item number {} in the catalogue.", i, i * 7))
        .collect()
}
