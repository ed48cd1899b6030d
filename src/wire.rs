//! Length-prefixed message framing for the client/server transport.
//!
//! Every message on the stream socket is `u32 LE length | payload`.
//! Framing carries arbitrary UTF-8 payloads, so multi-line responses
//! (the stats dump) need no in-band terminator.

use std::io::{Read, Write};

use bytes::{BufMut, BytesMut};

use crate::{Error, Result};

/// Refuse frames larger than this; nothing the protocol produces comes
/// close.
const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Write one framed message.
pub fn write_frame<W: Write>(writer: &mut W, payload: &str) -> Result<()> {
    let bytes = payload.as_bytes();
    if bytes.len() > MAX_FRAME_BYTES {
        return Err(Error::invalid_argument("frame too large"));
    }

    let mut buf = BytesMut::with_capacity(4 + bytes.len());
    buf.put_u32_le(bytes.len() as u32);
    buf.put_slice(bytes);
    writer.write_all(&buf)?;
    writer.flush()?;
    Ok(())
}

/// Read one framed message.
///
/// Returns `Ok(None)` when the peer closed the connection cleanly at a
/// frame boundary.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<String>> {
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(header) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(Error::corruption(format!("frame length {} too large", len)));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    String::from_utf8(payload)
        .map(Some)
        .map_err(|_| Error::corruption("frame payload is not UTF-8"))
}
