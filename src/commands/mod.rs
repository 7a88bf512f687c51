//! CLI command implementations
//!
//! Target commands receive an attached [`Target`](riotee_core::target::Target)
//! from [`crate::probes::with_target`]; probe commands get the vendor command
//! link from [`crate::probes::with_probe`].

mod list;
pub mod probe;
pub mod program;
pub mod target;

pub use list::list_probes;
