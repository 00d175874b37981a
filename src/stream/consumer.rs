//! Analysis stream consumer
//!
//! Opens one analysis stream at a time, drives its bytes through a fresh
//! `StreamEventDecoder` and folds the events into an `AnalysisView` that
//! subscribers follow through a watch channel. Starting a new stream replaces
//! the previous one; a stale stream notices its generation is gone and stops
//! without touching the view.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use super::decoder::{StreamEventDecoder, StructuredEvent};
use crate::error::Result;
use crate::languages::Language;

/// Body of the analysis request
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

const ERROR_MARKER: &str = "[错误]";

/// Body of `POST /ai`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisRequest {
    pub code: String,
    pub language: Language,
    pub error_info: String,
}

impl AnalysisRequest {
    pub fn new(code: impl Into<String>, language: Language, error_info: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language,
            error_info: error_info.into(),
        }
    }
}

/// Opens analysis streams
#[async_trait]
pub trait AnalysisTransport: Send + Sync {
    /// `Ok(None)` when the server answered without a readable body
    async fn open(&self, request: &AnalysisRequest) -> Result<Option<ByteStream>>;
}

/// What a renderer shows for the current analysis
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisView {
    pub text: String,
    pub loading: bool,
}

impl AnalysisView {
    fn append(&mut self, segment: &str) -> bool {
        if segment.is_empty() {
            return false;
        }
        self.text.push_str(segment);
        self.loading = false;
        true
    }

    fn clear_loading(&mut self) -> bool {
        std::mem::replace(&mut self.loading, false)
    }
}

/// How a stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisEnd {
    Done,
    Error,
    /// Body ended without a terminal event
    EndOfStream,
    NoBody,
    /// A newer stream took over the view
    Superseded,
}

enum Step {
    Continue,
    Finished(AnalysisEnd),
}

pub struct AnalysisStreamConsumer {
    transport: Arc<dyn AnalysisTransport>,
    view: watch::Sender<AnalysisView>,
    generation: AtomicU64,
}

impl AnalysisStreamConsumer {
    pub fn new(transport: impl AnalysisTransport + 'static) -> Self {
        let (view, _) = watch::channel(AnalysisView::default());
        Self {
            transport: Arc::new(transport),
            view,
            generation: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AnalysisView> {
        self.view.subscribe()
    }

    /// Snapshot of the current view
    pub fn view(&self) -> AnalysisView {
        self.view.borrow().clone()
    }

    /// Run one analysis stream to its end, replacing any stream in progress
    ///
    /// Transport failures are returned after the loading flag is cleared;
    /// text received before the failure stays in the view.
    pub async fn start(&self, request: &AnalysisRequest) -> Result<AnalysisEnd> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.view.send_modify(|view| {
            view.text.clear();
            view.loading = true;
        });
        let _loading = LoadingGuard {
            consumer: self,
            generation,
        };

        let Some(mut body) = self.transport.open(request).await? else {
            info!("Analysis stream {} has no body", generation);
            return Ok(AnalysisEnd::NoBody);
        };

        let mut decoder = StreamEventDecoder::new();
        let mut text = Utf8Decoder::default();

        while let Some(chunk) = body.next().await {
            let fragment = text.decode(&chunk?);
            let feed = decoder.feed(&fragment);
            if let Step::Finished(end) = self.apply_all(generation, feed.events) {
                debug!("Analysis stream {} finished: {:?}", generation, end);
                return Ok(end);
            }
        }

        let mut events = decoder.feed(&text.finish()).events;
        events.extend(decoder.finalize());
        match self.apply_all(generation, events) {
            Step::Finished(end) => Ok(end),
            Step::Continue => {
                debug!("Analysis stream {} ended without a terminal event", generation);
                Ok(AnalysisEnd::EndOfStream)
            }
        }
    }

    fn apply_all(&self, generation: u64, events: Vec<StructuredEvent>) -> Step {
        if !self.is_current(generation) {
            return Step::Finished(AnalysisEnd::Superseded);
        }
        for event in &events {
            if let Step::Finished(end) = self.apply(generation, event) {
                return Step::Finished(end);
            }
        }
        Step::Continue
    }

    fn apply(&self, generation: u64, event: &StructuredEvent) -> Step {
        let mut step = Step::Continue;
        self.view.send_if_modified(|view| {
            if !self.is_current(generation) {
                step = Step::Finished(AnalysisEnd::Superseded);
                return false;
            }
            match event {
                StructuredEvent::Chunk { data } => view.append(data),
                StructuredEvent::Error { message } => {
                    step = Step::Finished(AnalysisEnd::Error);
                    let mut modified = view.clear_loading();
                    if !message.is_empty() {
                        modified |= view.append(&format!("\n{} {}", ERROR_MARKER, message));
                    }
                    modified
                }
                StructuredEvent::Done => {
                    step = Step::Finished(AnalysisEnd::Done);
                    view.clear_loading()
                }
                StructuredEvent::Other { data, message } => {
                    view.append(if data.is_empty() { message } else { data })
                }
            }
        });
        step
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}

/// Clears the loading flag when a stream exits, unless a newer stream owns it
struct LoadingGuard<'a> {
    consumer: &'a AnalysisStreamConsumer,
    generation: u64,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let consumer = self.consumer;
        let generation = self.generation;
        consumer.view.send_if_modified(|view| {
            consumer.is_current(generation) && view.clear_loading()
        });
    }
}

/// UTF-8 decoding that carries a split character over to the next chunk
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();
        let mut rest: &[u8] = &self.pending;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    // valid_up_to guarantees this prefix is UTF-8
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = rest.to_vec();
        out
    }

    fn finish(self) -> String {
        String::from_utf8_lossy(&self.pending).into_owned()
    }
}
