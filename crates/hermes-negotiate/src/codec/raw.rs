use super::{write_all, Encoder, Payload, Sink};
use hermes_core::{HermesError, HermesResult, MimeType};

/// Passes raw bytes through untouched; any other payload is rejected.
pub struct ByteEncoder<'w> {
    sink: Sink<'w>,
}

impl<'w> ByteEncoder<'w> {
    /// Creates a byte encoder over `sink`.
    pub fn new(sink: Sink<'w>) -> Self {
        Self { sink }
    }
}

impl Encoder for ByteEncoder<'_> {
    fn encode(&mut self, payload: Payload<'_>) -> HermesResult<()> {
        match payload {
            Payload::Bytes(bytes) => {
                write_all(&mut *self.sink, &MimeType::APPLICATION_OCTET_STREAM, bytes)
            }
            Payload::Value(_) => Err(HermesError::UnsupportedPayload {
                codec: MimeType::APPLICATION_OCTET_STREAM,
            }),
        }
    }
}

/// Encoder constructor for `application/octet-stream`.
pub fn byte_encoder<'w>(sink: Sink<'w>) -> Box<dyn Encoder + 'w> {
    Box::new(ByteEncoder::new(sink))
}

/// Writes nothing. Used for redirect responses, where only headers matter.
///
/// Not registered by default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEncoder;

impl Encoder for NoopEncoder {
    fn encode(&mut self, _payload: Payload<'_>) -> HermesResult<()> {
        Ok(())
    }
}

/// Encoder constructor for [`NoopEncoder`].
pub fn noop_encoder<'w>(_sink: Sink<'w>) -> Box<dyn Encoder + 'w> {
    Box::new(NoopEncoder)
}
