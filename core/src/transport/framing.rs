//! Length-prefixed message framing shared by both transport roles.

use crate::transport::TransportError;
use tokio::io::{AsyncRead, AsyncReadExt};

pub const LENGTH_PREFIX_LEN: usize = 4;
pub const MAX_MESSAGE_LEN: usize = 1 << 20;

pub async fn read_exact_or_none<R>(reader: &mut R, len: usize) -> Result<Option<Vec<u8>>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; len];
    match reader.read_exact(&mut buffer).await {
        Ok(_) => Ok(Some(buffer)),
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(err) => Err(TransportError::Io(err)),
    }
}

/// Reads one prefixed message; `None` on a clean or mid-message close.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<Vec<u8>>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let prefix = match read_exact_or_none(reader, LENGTH_PREFIX_LEN).await? {
        Some(prefix) => prefix,
        None => return Ok(None),
    };
    let len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    if len > MAX_MESSAGE_LEN {
        return Err(TransportError::MessageTooLarge(len));
    }
    read_exact_or_none(reader, len).await
}

pub fn encode_message(payload: &[u8]) -> Result<Vec<u8>, TransportError> {
    if payload.len() > MAX_MESSAGE_LEN {
        return Err(TransportError::MessageTooLarge(payload.len()));
    }
    let mut message = Vec::with_capacity(LENGTH_PREFIX_LEN + payload.len());
    message.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    message.extend_from_slice(payload);
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_back_prefixed_messages_in_order() {
        let mut wire = encode_message(b"first").unwrap();
        wire.extend(encode_message(b"").unwrap());
        wire.extend(encode_message(&[0xAA, 0x55]).unwrap());
        let mut reader = wire.as_slice();

        assert_eq!(read_message(&mut reader).await.unwrap(), Some(b"first".to_vec()));
        assert_eq!(read_message(&mut reader).await.unwrap(), Some(Vec::new()));
        assert_eq!(read_message(&mut reader).await.unwrap(), Some(vec![0xAA, 0x55]));
        assert_eq!(read_message(&mut reader).await.unwrap(), None);
    }

    #[tokio::test]
    async fn close_mid_message_yields_none() {
        let wire = encode_message(b"truncated").unwrap();
        let mut reader = &wire[..wire.len() - 3];
        assert_eq!(read_message(&mut reader).await.unwrap(), None);

        let mut short_prefix: &[u8] = &[0, 0];
        assert_eq!(read_message(&mut short_prefix).await.unwrap(), None);
    }

    #[tokio::test]
    async fn oversized_prefix_is_rejected() {
        let wire = ((MAX_MESSAGE_LEN + 1) as u32).to_be_bytes();
        let mut reader = &wire[..];
        assert!(matches!(
            read_message(&mut reader).await,
            Err(TransportError::MessageTooLarge(_))
        ));
        assert!(encode_message(&vec![0; MAX_MESSAGE_LEN + 1]).is_err());
    }

    #[test]
    fn prefix_is_big_endian() {
        let message = encode_message(&[7; 258]).unwrap();
        assert_eq!(&message[..4], &[0, 0, 1, 2]);
        assert_eq!(message.len(), 262);
    }
}
