//! Envelope Codec
//!
//! Envelopes travel as bincode bodies behind a 4-byte big-endian length
//! prefix. Encoding and decoding of bodies is kept apart from I/O so it
//! can be tested without sockets.

use crate::domain::entities::Envelope;
use crate::domain::error::CodecError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest body accepted from a peer.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Encode an envelope into a length-prefixed frame.
pub fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>, CodecError> {
    let data = bincode::serialize(envelope)?;
    if data.len() > MAX_FRAME_BYTES {
        return Err(CodecError::FrameTooLarge {
            len: data.len(),
            max: MAX_FRAME_BYTES,
        });
    }

    let mut frame = Vec::with_capacity(4 + data.len());
    frame.extend_from_slice(&(data.len() as u32).to_be_bytes());
    frame.extend_from_slice(&data);
    Ok(frame)
}

/// Decode a frame length from its 4-byte header.
pub fn decode_length(buf: &[u8; 4]) -> usize {
    u32::from_be_bytes(*buf) as usize
}

/// Decode an envelope body (without its length prefix).
pub fn decode_envelope(data: &[u8]) -> Result<Envelope, CodecError> {
    Ok(bincode::deserialize(data)?)
}

/// Read one envelope, blocking until a full frame arrives.
///
/// A clean EOF before the header is [`CodecError::Closed`].
pub async fn read_envelope<R>(reader: &mut R) -> Result<Envelope, CodecError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut len_buf).await {
        return Err(match e.kind() {
            std::io::ErrorKind::UnexpectedEof => CodecError::Closed,
            _ => CodecError::Io(e),
        });
    }

    let len = decode_length(&len_buf);
    if len > MAX_FRAME_BYTES {
        return Err(CodecError::FrameTooLarge {
            len,
            max: MAX_FRAME_BYTES,
        });
    }

    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).await?;
    decode_envelope(&data)
}

/// Write one envelope and flush it.
pub async fn write_envelope<W>(writer: &mut W, envelope: &Envelope) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_envelope(envelope)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Payload;
    use crate::domain::value_objects::{op, BackendAddress, BackendList};

    #[test]
    fn test_encode_prefixes_length() {
        let frame = encode_envelope(&Envelope::ack()).unwrap();
        let header: [u8; 4] = frame[..4].try_into().unwrap();
        assert_eq!(decode_length(&header), frame.len() - 4);
    }

    #[test]
    fn test_decode_list_payload() {
        let list = BackendList::new(vec![
            BackendAddress::new("10.0.0.1", 9001),
            BackendAddress::new("10.0.0.2", 9002),
        ]);
        let frame = encode_envelope(&Envelope::list_reply(list.clone())).unwrap();

        let decoded = decode_envelope(&frame[4..]).unwrap();
        assert_eq!(decoded.operation, op::LIST_REPLY);
        assert_eq!(decoded.payload, Payload::List(list));
    }

    #[test]
    fn test_decode_garbage_is_malformed() {
        let result = decode_envelope(&[0xff, 0xff, 0xff]);
        assert!(matches!(result, Err(CodecError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_read_after_write_over_duplex() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let sent = Envelope::new(
            op::REGISTER,
            Payload::Address(BackendAddress::new("127.0.0.1", 9001)),
        );

        write_envelope(&mut client, &sent).await.unwrap();
        write_envelope(&mut client, &Envelope::bare(op::GET_LIST)).await.unwrap();

        assert_eq!(read_envelope(&mut server).await.unwrap(), sent);
        assert_eq!(
            read_envelope(&mut server).await.unwrap().operation,
            op::GET_LIST
        );
    }

    #[tokio::test]
    async fn test_read_on_closed_stream() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);

        let result = read_envelope(&mut server).await;
        assert!(matches!(result, Err(CodecError::Closed)));
    }

    #[tokio::test]
    async fn test_read_truncated_body() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&10u32.to_be_bytes()).await.unwrap();
        client.write_all(&[1, 2, 3]).await.unwrap();
        drop(client);

        let result = read_envelope(&mut server).await;
        assert!(matches!(result, Err(CodecError::Io(_))));
    }

    #[tokio::test]
    async fn test_read_rejects_oversized_frame() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let len = (MAX_FRAME_BYTES as u32) + 1;
        client.write_all(&len.to_be_bytes()).await.unwrap();

        let result = read_envelope(&mut server).await;
        assert!(matches!(result, Err(CodecError::FrameTooLarge { .. })));
    }
}
