//! typm-core: the patient surveyor of web-font geometry
//!
//! Fonts lie about their size. Two faces declared at the same pixel size
//! can render text at wildly different widths and heights, and the only
//! witness that never fibs is an actual rendering engine. This library
//! orchestrates that witness: it loads each font from a catalog into a
//! live rendering session, renders a canonical set of probe characters
//! and strings, and reads back the on-screen geometry so that consumers
//! can do layout math or pick substitutions without ever loading the
//! font themselves.
//!
//! ## The measurement, in five movements
//!
//! **Probes** ([`probe`]): a deterministic, deduplicated roster of
//! visible characters built from configured codepoint ranges, each with
//! a canonical `U+XXXX` identifier.
//!
//! **Batches** ([`batch`]): probes are partitioned into bounded windows
//! so no single document asks too much of the engine.
//!
//! **Sessions** ([`session`]): one live handle to the rendering engine,
//! exposing exactly four capabilities: present a document, read element
//! geometry, wait (best-effort) for a font to become shapeable, close.
//!
//! **Retries** ([`retry`]): web fonts load over networks and networks
//! misbehave, so every unit of work gets bounded retries with backoff
//! and a safe fallback. One stubborn font never sinks the run.
//!
//! **Results** ([`store`]): widths rounded to fixed precision, prior
//! output backed up before overwrite, per-font or aggregate artifacts,
//! and a manifest summarizing the whole expedition.
//!
//! The drivers in [`pipeline`] walk a catalog in order, optionally
//! across several independent sessions, and [`scale`] runs the smaller
//! baseline-relative size measurement.
//!
//! Made with care at FontLab https://www.fontlab.com/

pub mod batch;
pub mod catalog;
pub mod markup;
pub mod measure;
pub mod pipeline;
pub mod probe;
pub mod retry;
pub mod scale;
pub mod session;
pub mod store;
