pub mod ledger;
pub mod profile;
pub mod settings;
pub mod word_filter;
