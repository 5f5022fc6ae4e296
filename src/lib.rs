// Kreol Toxicity: toxic / non-toxic classification for Kreol text.
//
// This is the library root. Serving runs preprocess -> features -> toxicity
// -> inference behind the web API; training fits the same pieces offline.

pub mod config;
pub mod features;
pub mod history;
pub mod inference;
pub mod normalize;
pub mod output;
pub mod preprocess;
pub mod toxicity;
pub mod training;
pub mod web;
