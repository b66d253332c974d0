//! Raw byte-stream codec for the storage request/response protocol (§4.3):
//! the wire framing is "write whole request, half-close, read to EOF, write
//! whole response, close" — callers above this layer (node_storage) supply
//! and interpret the JSON-encoded payloads themselves.

use async_trait::async_trait;
use futures::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use libp2p::request_response::Codec;
use libp2p::StreamProtocol;

const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Default)]
pub struct BytesCodec;

#[async_trait]
impl Codec for BytesCodec {
	type Protocol = StreamProtocol;
	type Request = Vec<u8>;
	type Response = Vec<u8>;

	async fn read_request<T>(&mut self, _: &StreamProtocol, io: &mut T) -> std::io::Result<Vec<u8>>
	where
		T: AsyncRead + Unpin + Send,
	{
		read_bounded(io).await
	}

	async fn read_response<T>(&mut self, _: &StreamProtocol, io: &mut T) -> std::io::Result<Vec<u8>>
	where
		T: AsyncRead + Unpin + Send,
	{
		read_bounded(io).await
	}

	async fn write_request<T>(
		&mut self,
		_: &StreamProtocol,
		io: &mut T,
		req: Vec<u8>,
	) -> std::io::Result<()>
	where
		T: AsyncWrite + Unpin + Send,
	{
		io.write_all(&req).await?;
		io.close().await
	}

	async fn write_response<T>(
		&mut self,
		_: &StreamProtocol,
		io: &mut T,
		resp: Vec<u8>,
	) -> std::io::Result<()>
	where
		T: AsyncWrite + Unpin + Send,
	{
		io.write_all(&resp).await?;
		io.close().await
	}
}

async fn read_bounded<T: AsyncRead + Unpin + Send>(io: &mut T) -> std::io::Result<Vec<u8>> {
	let mut buf = Vec::new();
	io.take(MAX_MESSAGE_SIZE as u64).read_to_end(&mut buf).await?;
	Ok(buf)
}
