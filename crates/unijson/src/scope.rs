//! Codec context visible to `serde` while a composite is dumped or built.
//!
//! Field dump and keyword construction go through a type's own `Serialize`
//! and `Deserialize` impls, which know nothing about the codec. While they
//! run, the active [`Encoder`] or [`Decoder`] sits on a thread-local stack so
//! that [`Value`](crate::Value) fields holding composites can still be
//! encoded to tagged mappings and rebuilt from them.

use std::cell::RefCell;

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::EncodeError;

struct EncodeFrame {
    encoder: Encoder,
    failure: Option<EncodeError>,
}

std::thread_local! {
    static ENCODERS: RefCell<Vec<EncodeFrame>> = const { RefCell::new(Vec::new()) };
    static DECODERS: RefCell<Vec<Decoder>> = const { RefCell::new(Vec::new()) };
}

struct EncodeGuard;

impl Drop for EncodeGuard {
    fn drop(&mut self) {
        ENCODERS.with_borrow_mut(|stack| stack.pop());
    }
}

struct DecodeGuard;

impl Drop for DecodeGuard {
    fn drop(&mut self) {
        DECODERS.with_borrow_mut(|stack| stack.pop());
    }
}

/// Run `f` with `encoder` active. Also returns the first nested encoding
/// failure recorded while `f` ran.
pub(crate) fn encoding<R>(encoder: &Encoder, f: impl FnOnce() -> R) -> (R, Option<EncodeError>) {
    ENCODERS.with_borrow_mut(|stack| {
        stack.push(EncodeFrame {
            encoder: encoder.clone(),
            failure: None,
        })
    });
    let guard = EncodeGuard;
    let out = f();
    let failure = ENCODERS.with_borrow_mut(|stack| stack.last_mut().and_then(|frame| frame.failure.take()));
    drop(guard);
    (out, failure)
}

/// Run `f` with `decoder` active.
pub(crate) fn decoding<R>(decoder: &Decoder, f: impl FnOnce() -> R) -> R {
    DECODERS.with_borrow_mut(|stack| stack.push(decoder.clone()));
    let _guard = DecodeGuard;
    f()
}

pub(crate) fn active_encoder() -> Option<Encoder> {
    ENCODERS.with_borrow(|stack| stack.last().map(|frame| frame.encoder.clone()))
}

pub(crate) fn active_decoder() -> Option<Decoder> {
    DECODERS.with_borrow(|stack| stack.last().cloned())
}

/// Keep the first nested failure of the innermost encoding frame.
pub(crate) fn record_failure(err: EncodeError) {
    ENCODERS.with_borrow_mut(|stack| {
        if let Some(frame) = stack.last_mut() {
            frame.failure.get_or_insert(err);
        }
    });
}
