pub mod dedupe_events;
