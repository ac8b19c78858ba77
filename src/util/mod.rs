mod rpc_network;
mod handle;

pub use rpc_network::{RpcNetwork, MAX_FRAME_LENGTH, stream_to_rpc_network};
pub use handle::Handle;
