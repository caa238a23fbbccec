//! Analytics front-end core for precomputed multi-armed-bandit simulation results.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Controller  │────►│   Resolver   │────►│ Table Store  │
//! │ (selection)  │     │ (table ids)  │     │ (csv, cache) │
//! └──────────────┘     └──────────────┘     └──────────────┘
//!        ▲                                         │
//!        │                                         ▼
//!  ┌──────────────┐    ┌──────────────┐     ┌──────────────┐
//!  │  Chart set   │◄───│ Chart specs  │◄────│ Aggregation  │
//!  │ (6 panels)   │    │  (builder)   │     │ (pure fns)   │
//!  └──────────────┘    └──────────────┘     └──────────────┘
//! ```

pub mod aggregate;
pub mod algorithms;
pub mod chart;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod migrate;
pub mod pipeline;
pub mod resolver;
pub mod selection;
pub mod server;
pub mod store;
