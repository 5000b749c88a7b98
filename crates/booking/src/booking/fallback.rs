use std::future::Future;
use std::pin::Pin;

use crate::models::Language;

use super::prompts::{Notice, notice};

pub type FallbackFuture<'a> = Pin<Box<dyn Future<Output = String> + Send + 'a>>;

/// Answers chat turns that are not part of a booking. A conversational
/// backend can sit behind this; the engine only needs a reply string.
pub trait ChatFallback: Send + Sync {
    fn reply<'a>(&'a self, message: &'a str, language: Language) -> FallbackFuture<'a>;
}

/// Localized canned answer pointing the user at the booking flow.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticFallback;

impl ChatFallback for StaticFallback {
    fn reply<'a>(&'a self, _message: &'a str, language: Language) -> FallbackFuture<'a> {
        Box::pin(async move { notice(Notice::Fallback, language).to_string() })
    }
}
