//! Purpose: Typed text-column codecs shared by the `coltext` CLI and row-storage callers.
//! Exports: `api` (codecs, column registry, schema config, `MappingView`, errors).
//! Role: Serialization layer between an application and a text-only column store.
//! Invariants: Codecs are pure and synchronous; no codec owns persistent state.
//! Invariants: `api` is the only public path; `core` stays internal.
pub mod api;
mod core;
