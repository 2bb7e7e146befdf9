//! ferri - recon output into a bug bounty database
//!
//! ferri sits at the end of a shell pipeline. Every line a recon tool prints
//! (a domain, a subdomain, a URL, a host:port) becomes a target under a
//! program derived from the first line, and every sighting is appended to an
//! observation log. Re-running the same batch never duplicates programs or
//! targets.
//!
//! ```text
//! subfinder -d example.com | ferri --source subfinder
//! ```

pub mod config;
pub mod recon;

pub use config::Config;
