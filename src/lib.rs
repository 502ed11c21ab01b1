//! moa-console - terminal front end for Mixture-of-Agents prompting
//!
//! One prompt goes to a user-selected set of models discovered from the
//! service; each model's answer lands in its own tab and the synthesized
//! answer in a fixed aggregate panel, all rendered from markdown with
//! embedded math.

pub mod backend;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod orchestrator;
pub mod paths;
pub mod render;
pub mod selection;
pub mod task;
pub mod tui;
pub mod view;

pub use backend::{HttpBackend, MoaBackend};
pub use catalog::{ModelGroups, ModelId};
pub use config::Config;
pub use controller::Controller;
pub use render::{ContentRenderer, SafeMarkup};
pub use view::SharedView;
