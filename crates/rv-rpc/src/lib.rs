//! JSON-RPC server exposing the Store, remote, comment drafts, and
//! plugin results to client UIs over newline-delimited stdin/stdout.

pub mod handler;
pub mod protocol;
pub mod render;
pub mod server;

pub use handler::RpcHandler;
pub use protocol::{param, RpcError, RpcRequest, RpcResponse};
pub use server::serve;
