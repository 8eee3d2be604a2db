//! Per-connection pool of compressors and decompressors.
//!
//! Codecs are registered once and shared between connections; the streams they
//! create are not. A [`CodecCache`] creates at most one compressor and one
//! decompressor per token, on first use, and hands the same instance out
//! again for every later request on the connection. Whoever starts a new
//! stream on a handed out instance resets it first.

use std::sync::Arc;

use crate::codec::compress::{Codec, Compressor, Decompressor, Deflate, Gzip, Zstd};
use crate::utils::eq_ignore_case;

struct Slot {
    codec: Arc<dyn Codec>,
    compressor: Option<Box<dyn Compressor>>,
    decompressor: Option<Box<dyn Decompressor>>,
}

pub struct CodecCache {
    slots: Vec<Slot>,
}

impl CodecCache {
    /// Registers `codecs` in order of server preference.
    pub fn new<I>(codecs: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Codec>>,
    {
        let slots = codecs.into_iter().map(|codec| Slot { codec, compressor: None, decompressor: None }).collect();
        Self { slots }
    }

    /// A cache without any codec; only `identity` is supported.
    pub fn empty() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn supports(&self, token: &str) -> bool {
        self.position(token).is_some()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|slot| slot.codec.token())
    }

    /// Value advertised in the `Accept-Encoding` response header.
    pub fn accept_encoding(&self) -> String {
        if self.slots.is_empty() {
            return "identity".to_string();
        }

        self.tokens().collect::<Vec<_>>().join(", ")
    }

    /// The connection's compressor for `token`, created on first use.
    pub fn compressor(&mut self, token: &str) -> Option<&mut dyn Compressor> {
        let index = self.position(token)?;
        let slot = &mut self.slots[index];
        let compressor = slot.compressor.get_or_insert_with(|| slot.codec.new_compressor());
        Some(compressor.as_mut())
    }

    /// The connection's decompressor for `token`, created on first use.
    pub fn decompressor(&mut self, token: &str) -> Option<&mut dyn Decompressor> {
        let index = self.position(token)?;
        let slot = &mut self.slots[index];
        let decompressor = slot.decompressor.get_or_insert_with(|| slot.codec.new_decompressor());
        Some(decompressor.as_mut())
    }

    fn position(&self, token: &str) -> Option<usize> {
        self.slots.iter().position(|slot| eq_ignore_case(slot.codec.token(), token))
    }
}

impl Default for CodecCache {
    /// `gzip`, `deflate` and `zstd`, in that order.
    fn default() -> Self {
        let codecs: [Arc<dyn Codec>; 3] = [Arc::new(Gzip), Arc::new(Deflate), Arc::new(Zstd)];
        Self::new(codecs)
    }
}

impl std::fmt::Debug for CodecCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.tokens()).finish()
    }
}
