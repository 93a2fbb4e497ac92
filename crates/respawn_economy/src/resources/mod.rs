//! # Resource Exchange
//!
//! Counting and removing exchange materials across a player's containers.
//!
//! ```text
//! scan()  ── eligible containers ── sum matching stacks ──> available
//! debit() ── eligible containers ── take until required ──> DebitReport
//!                                        │
//!                                        └─ nested bag touched? write it back
//! ```
//!
//! Both sides skip the same containers (see `ContainerRole::is_eligible`),
//! so a debit never reaches items the scan did not count.

pub mod debit;
pub mod scan;

pub use debit::{debit, DebitReport};
pub use scan::scan;
