//! # Doc Analyzer
//!
//! Incremental document analysis for research folders.
//!
//! Doc Analyzer walks one or more folders of papers, theses, sermons and
//! slide decks, extracts their text, asks a language model for structured
//! bibliographic metadata, and keeps the results in a JSON ledger keyed by
//! absolute path. Each run only analyzes files the ledger has not seen, and
//! every run regenerates a Word report and a RIS bibliography from the full
//! ledger.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌───────────┐   ┌───────────┐   ┌──────────┐
//! │ Discover  │──▶│  Extract  │──▶│  Analyze  │──▶│  Ledger  │
//! │ walkdir   │   │ txt/docx/ │   │ Anthropic │   │   JSON   │
//! └───────────┘   │ pptx/pdf  │   └───────────┘   └────┬─────┘
//!                 └───────────┘                        │
//!                                      ┌───────────────┤
//!                                      ▼               ▼
//!                                 ┌──────────┐   ┌──────────┐
//!                                 │  Report  │   │   RIS    │
//!                                 │  (docx)  │   │  export  │
//!                                 └──────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! analyzer run --dry-run        # list files that would be analyzed
//! analyzer run                  # analyze new files, write report + RIS
//! analyzer report               # regenerate outputs from the ledger
//! analyzer status               # ledger summary
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Analysis, document types and ledger records |
//! | [`error`] | Typed errors for extraction, analysis and output |
//! | [`ledger`] | Ledger persistence |
//! | [`discover`] | Finding new files under the roots |
//! | [`extract`] | Text extraction per file type |
//! | [`llm`] | Completion model abstraction and Anthropic client |
//! | [`analyze`] | Prompting and response parsing |
//! | [`pipeline`] | Per-file processing loop |
//! | [`progress`] | Run progress reporting |
//! | [`aggregate`] | Ledger to analysis list |
//! | [`report`] | Word report generation |
//! | [`ris`] | RIS bibliography export |
//! | [`output`] | Output paths and lock-aware writes |
//! | [`export`] | Rendering both outputs from the ledger |
//! | [`stats`] | Ledger statistics |

pub mod aggregate;
pub mod analyze;
pub mod config;
pub mod discover;
pub mod error;
pub mod export;
pub mod extract;
pub mod ledger;
pub mod llm;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod ris;
pub mod stats;
