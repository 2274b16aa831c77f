//! Serialization and delivery of rendered ball-panel frames.

mod sender;
mod serializer;
#[cfg(feature = "websocket")]
mod websocket;

use log::debug;
use rollcall_config::{SenderType, SerializerType, TransportConfig};
use rollcall_core::DrawCommand;
use serde::Serialize;

pub use self::sender::{FileSender, NullSender, Sender, StdioSender, TransportError};
pub use self::serializer::{
    BinarySerializer, JsonSerializer, SerializationError, SerializeObject, Serializer,
};
#[cfg(feature = "websocket")]
pub use self::websocket::WebSocketSender;

/// One rendered frame as it goes over the wire.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RenderedFrame<'a> {
    /// Host-side render counter.
    pub sequence: u64,
    /// Scheduler tick the drawn snapshot came from.
    pub tick: u64,
    pub bodies: usize,
    pub commands: &'a [DrawCommand],
}

/// Pairs a serializer with a sender and applies the frame skipping policy.
pub struct TransportController {
    serializer: Box<dyn Serializer>,
    sender: Box<dyn Sender>,
    update_frequency: Option<u32>,
    offered: u64,
}

impl TransportController {
    pub fn new(serializer: Box<dyn Serializer>, sender: Box<dyn Sender>) -> Self {
        Self {
            serializer,
            sender,
            update_frequency: None,
            offered: 0,
        }
    }

    /// Only every `frequency`th frame offered is actually sent.
    pub fn with_update_frequency(mut self, frequency: Option<u32>) -> Self {
        self.update_frequency = frequency.filter(|&f| f > 1);
        self
    }

    pub fn from_config(config: &TransportConfig) -> Result<Self, TransportError> {
        let serializer: Box<dyn Serializer> = match config.serializer {
            SerializerType::Json => Box::new(JsonSerializer),
            SerializerType::Binary => Box::new(BinarySerializer),
        };

        let sender: Box<dyn Sender> = match config.sender.sender_type {
            SenderType::Stdio => Box::new(StdioSender::new()),
            SenderType::File => {
                let options = config.sender.get_file_options();
                Box::new(FileSender::new(&options.output_path)?)
            }
            SenderType::Null => Box::new(NullSender),
            SenderType::WebSocket => Self::websocket_sender(config, serializer.is_text())?,
        };

        Ok(Self::new(serializer, sender).with_update_frequency(config.update_frequency))
    }

    #[cfg(feature = "websocket")]
    fn websocket_sender(
        config: &TransportConfig,
        text: bool,
    ) -> Result<Box<dyn Sender>, TransportError> {
        let options = config.sender.get_websocket_options();
        Ok(Box::new(WebSocketSender::start(&options.host, options.port, text)?))
    }

    #[cfg(not(feature = "websocket"))]
    fn websocket_sender(
        _config: &TransportConfig,
        _text: bool,
    ) -> Result<Box<dyn Sender>, TransportError> {
        Err(TransportError::Configuration(
            "WebSocket sender configured but the websocket feature is not enabled".to_string(),
        ))
    }

    /// Serializes and sends `frame` unless the frequency policy skips it.
    /// Returns whether the frame was sent.
    pub fn send_frame(&mut self, frame: &RenderedFrame<'_>) -> Result<bool, TransportError> {
        self.offered += 1;
        if let Some(freq) = self.update_frequency {
            if self.offered % u64::from(freq) != 0 {
                return Ok(false);
            }
        }

        let data = self.serializer.serialize_to_bytes(frame)?;
        self.sender.send(&data)?;
        debug!("Sent frame {} ({} bytes)", frame.sequence, data.len());
        Ok(true)
    }

    pub fn flush(&self) -> Result<(), TransportError> {
        self.sender.flush()
    }

    pub fn client_count(&self) -> Option<usize> {
        self.sender.client_count()
    }
}
