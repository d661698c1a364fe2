//! Slack bot that answers three keyword commands in one channel: an
//! inspiring quote, a Chuck Norris joke, and a help text.

pub mod bot;
pub mod commands;
pub mod config;
pub mod platform;
pub mod responses;
pub mod sources;
