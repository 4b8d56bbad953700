//! CSV input of meetup events and CSV output of settlement results.

pub mod event_reader;
pub mod report_writer;
