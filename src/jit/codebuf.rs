//! Code buffer for building machine code.
//!
//! A thin growable byte buffer the encoder writes into before the bytes
//! are copied to executable memory. Labels are resolved before encoding
//! starts, so no patching machinery is needed here.

/// A buffer for building machine code.
#[derive(Default)]
pub struct CodeBuffer {
    code: Vec<u8>,
}

impl CodeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            code: Vec::with_capacity(capacity),
        }
    }

    /// Get the current size of the code.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Emit a single byte.
    pub fn emit_u8(&mut self, byte: u8) {
        self.code.push(byte);
    }

    /// Emit a 32-bit value (little-endian).
    pub fn emit_u32(&mut self, value: u32) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit multiple bytes.
    pub fn emit_bytes(&mut self, bytes: &[u8]) {
        self.code.extend_from_slice(bytes);
    }

    /// Get the code bytes (for inspection).
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Consume the buffer and return the raw code bytes.
    pub fn into_code(self) -> Vec<u8> {
        self.code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_bytes() {
        let mut buf = CodeBuffer::new();
        buf.emit_u8(0x90);
        buf.emit_bytes(&[0x0f, 0x84]);
        buf.emit_u32(0xDEADBEEF);

        assert_eq!(buf.len(), 7);
        assert_eq!(buf.code(), &[0x90, 0x0f, 0x84, 0xEF, 0xBE, 0xAD, 0xDE]);
    }

    #[test]
    fn test_into_code() {
        let mut buf = CodeBuffer::with_capacity(4);
        buf.emit_u32(1);
        assert_eq!(buf.into_code(), vec![1, 0, 0, 0]);
    }
}
