//! Synchronous XML API client for follow-up capture and void calls.

pub mod client;

pub use client::CaptureVoidClient;
