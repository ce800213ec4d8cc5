// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

mod listing;

pub mod arguments;
pub mod binding;
pub mod client;
pub mod command;
pub mod config;
pub mod connection;
pub mod errors;
pub mod exchange;
pub mod queue;
pub mod state;
pub mod topology;

pub use listing::{output_to_map, output_to_map_with, split_values, strip_listing_to_done};
