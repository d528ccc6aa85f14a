//! Pipeline stages for text-and-images → PDF generation.
//!
//! Each submodule implements exactly one step, so each can be tested without
//! the others (and without a network).
//!
//! ## Data Flow
//!
//! ```text
//! ingest ──▶ encode ──▶ (document) ──▶ request ──▶ transport ──▶ response
//! (limits)   (data URL)  (editing)      (payload)   (reqwest)     (outcome)
//! ```
//!
//! 1. [`ingest`]   : apply the count/type/size rules to a batch of files and
//!    decode the survivors concurrently, keeping input order
//! 2. [`encode`]   : sniff the real format, read the header, base64-wrap;
//!    runs in `spawn_blocking`
//! 3. [`request`]  : validate the document and serialise the canonical
//!    payload as a JSON body (`POST`) or query parameters (`GET`)
//! 4. [`transport`]: the only stage with network I/O
//! 5. [`response`] : classify the reply into exactly one outcome, following
//!    at most one pointer to the finished PDF

pub mod encode;
pub mod ingest;
pub mod request;
pub mod response;
pub mod transport;
