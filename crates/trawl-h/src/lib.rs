pub mod cdp;
pub mod page;
mod retry;

pub use page::{ChromiumLauncher, ChromiumPage};
