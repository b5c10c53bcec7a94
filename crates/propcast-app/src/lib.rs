// Library root: the scraping side of propcast, exposed for integration tests
// and the `propcast` binary.

pub mod cycle;
pub mod directory;
pub mod fetch;
pub mod page;
pub mod runner;
