pub mod daemons;
pub mod scrape;
pub mod serve;
