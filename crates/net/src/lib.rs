//! Counselbook Network Library
//!
//! A thin RPC boundary over the booking service.
//!
//! # Architecture
//!
//! - **Server**: accepts connections; every request runs on a blocking
//!   worker with its own database connection
//! - **Client**: sends one request at a time and waits for the answer
//! - **Protocol**: Length-prefixed JSON messages
//!
//! # Usage
//!
//! ```ignore
//! let handler = Handler::new(db_path, Duration::from_secs(5), 60);
//! let server = Server::start(SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)), handler).await?;
//!
//! let mut client = Client::connect(server.addr()).await?;
//! let slots = client.available_slots(counselor_id, date).await?;
//! let booking = client.create_booking(student_id, slots[0].id, None).await?;
//! ```

pub mod client;
pub mod error;
mod frame;
pub mod handler;
pub mod protocol;
pub mod server;

pub use client::Client;
pub use counselbook_core::config::DEFAULT_PORT;
pub use error::{Error, Result};
pub use handler::Handler;
pub use protocol::{Request, Response};
pub use server::Server;
