pub mod dashboard;
pub mod ledger;
pub mod refresh;
pub mod ui;
