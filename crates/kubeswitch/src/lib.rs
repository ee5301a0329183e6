//! kubeswitch - Kubeconfig Discovery & Switching
//!
//! Discovers kubeconfig files across stores, lets an operator pick one and
//! materializes the selection as a session-scoped file. A separate hook
//! scheduler runs maintenance commands on an interval.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐     ┌────────────┐     ┌────────────┐     ┌──────────────┐
//! │  PathSpec  │     │   Store    │     │ Discovery  │     │ Materializer │
//! │  resolver  │────▶│  registry  │────▶│  + picker  │────▶│ (switch_tmp) │
//! └────────────┘     └────────────┘     └────────────┘     └──────────────┘
//!                     filesystem / vault
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod hooks;
pub mod materialize;
pub mod paths;
pub mod store;
pub mod switcher;

pub use config::{Environment, SwitchConfig, SwitchOptions, SwitchSettings};
pub use discovery::{Discovery, Picker, Previewer, Selection};
pub use error::{ConfigurationError, DiscoveryError, FetchError, SwitchError};
pub use materialize::{ActiveSwitch, Materializer};
pub use store::{Candidate, Kubeconfig, KubeconfigStore, PathSpec, StoreKind, StoreRegistry};
pub use switcher::{run_switch, SwitchOutcome};
