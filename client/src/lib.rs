mod client;

pub use client::Client;
pub use line_server_net::{data_types::*, protocol};
