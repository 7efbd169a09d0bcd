//! Adapters implementing core ports for the console front end.

pub mod ui;

pub use ui::TracingUi;
