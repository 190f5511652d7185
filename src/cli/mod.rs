pub mod aum;
pub mod growth;
pub mod monitor;
pub mod repair;
pub mod setup;
pub mod ui;
