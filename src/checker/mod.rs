// src/checker/mod.rs
// =============================================================================
// This module contains all link validation logic.
//
// Submodules:
// - html: turns raw hrefs into a filtered candidate set, measures page text
// - http: judges one link (HEAD with GET fallback, or a content fetch)
// - validator: the bounded pool that runs a whole pass under a time budget
// =============================================================================

mod html;
mod http;
mod validator;

pub use html::LinkScope;
pub use validator::LinkValidator;
