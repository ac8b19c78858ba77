use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

/// Largest frame either side accepts: everything a 4-byte length prefix can
/// express. Responses carry the whole log, which only grows.
pub const MAX_FRAME_LENGTH: usize = u32::MAX as usize;

/// A TCP stream split into 4-byte big-endian length-prefixed frames.
pub type RpcNetwork = Framed<TcpStream, LengthDelimitedCodec>;

pub fn stream_to_rpc_network(stream: TcpStream) -> RpcNetwork {
    let _ = stream.set_nodelay(true);

    let codec = LengthDelimitedCodec::builder()
        .length_field_length(4)
        .max_frame_length(MAX_FRAME_LENGTH)
        .big_endian()
        .new_codec();

    Framed::new(stream, codec)
}
