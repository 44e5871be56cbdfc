pub mod board_controller;
pub use board_controller::{BoardController, BoardSource};
pub mod board_metrics;
pub mod case_validation;
pub mod change_feed;
pub mod clock;
pub mod days_overdue;
pub mod in_flight;
pub mod period_filter;
pub mod stage_index;
pub mod status_ledger;
pub mod transition_policy;
