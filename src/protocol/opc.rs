use crate::error::EncodeError;
use crate::layout::Layout;
use crate::pixel::Color;

/// Size of the OPC header: channel, command, length high, length low
pub const HEADER_LEN: usize = 4;

/// Channel 0 addresses every output on the server
pub const BROADCAST_CHANNEL: u8 = 0;

/// "Set pixel colors" command
pub const CMD_SET_PIXELS: u8 = 0;

/// Bytes per transmitted pixel (RGB, alpha is never sent)
pub const BYTES_PER_LED: usize = 3;

/// Largest LED count whose payload fits the 16-bit length field
pub const MAX_LEDS: usize = u16::MAX as usize / BYTES_PER_LED;

/// Decoded OPC header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub channel: u8,
    pub command: u8,
    pub length: u16,
}

/// Parse the 4-byte header at the start of `data`
pub fn parse_header(data: &[u8]) -> Option<Header> {
    if data.len() < HEADER_LEN {
        return None;
    }
    Some(Header {
        channel: data[0],
        command: data[1],
        length: u16::from_be_bytes([data[2], data[3]]),
    })
}

/// Reusable OPC "set pixel colors" packet.
///
/// The buffer is only reallocated when the LED count changes, so steady-state
/// encoding does not allocate.
#[derive(Debug, Clone, Default)]
pub struct Packet {
    data: Vec<u8>,
}

impl Packet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resize for `count` LEDs and rewrite the header if the size changed
    pub fn set_led_count(&mut self, count: usize) -> Result<(), EncodeError> {
        if count > MAX_LEDS {
            return Err(EncodeError::TooManyLeds {
                count,
                max: MAX_LEDS,
            });
        }

        let payload_len = count * BYTES_PER_LED;
        let packet_len = HEADER_LEN + payload_len;
        if self.data.len() != packet_len {
            self.data.resize(packet_len, 0);
            self.data[0] = BROADCAST_CHANNEL;
            self.data[1] = CMD_SET_PIXELS;
            self.data[2..4].copy_from_slice(&(payload_len as u16).to_be_bytes());
        }
        Ok(())
    }

    /// Number of LEDs the packet currently carries
    pub fn led_count(&self) -> usize {
        self.data.len().saturating_sub(HEADER_LEN) / BYTES_PER_LED
    }

    /// Write one LED's color at logical position `index`
    fn set_led(&mut self, index: usize, color: Color) {
        let start = HEADER_LEN + index * BYTES_PER_LED;
        self.data[start..start + BYTES_PER_LED].copy_from_slice(&color.to_rgb_bytes());
    }

    /// Fill the packet from `pixels` following `layout`.
    ///
    /// On error the packet contents are unspecified and must not be sent.
    pub fn encode_from(&mut self, pixels: &[Color], layout: &Layout) -> Result<(), EncodeError> {
        self.set_led_count(layout.len())?;

        for (index, &offset) in layout.offsets().iter().enumerate() {
            let color = pixels
                .get(offset)
                .copied()
                .ok_or(EncodeError::OffsetOutOfBounds {
                    index,
                    offset,
                    len: pixels.len(),
                })?;
            self.set_led(index, color);
        }
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl AsRef<[u8]> for Packet {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Encode `pixels` into a fresh OPC packet
pub fn encode(pixels: &[Color], layout: &Layout) -> Result<Vec<u8>, EncodeError> {
    let mut packet = Packet::new();
    packet.encode_from(pixels, layout)?;
    Ok(packet.data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(len: usize) -> Vec<Color> {
        (0..len)
            .map(|i| Color::from_argb(0x80, i as u8, (i * 2) as u8, (i * 3) as u8))
            .collect()
    }

    #[test]
    fn test_packet_framing() {
        let mut layout = Layout::new(10);
        layout.register_led(0, 0, 0);
        layout.register_led(1, 1, 0);
        layout.register_led(2, 2, 0);

        let packet = encode(&gradient(100), &layout).unwrap();
        assert_eq!(packet.len(), 13);

        let header = parse_header(&packet).unwrap();
        assert_eq!(header.channel, BROADCAST_CHANNEL);
        assert_eq!(header.command, CMD_SET_PIXELS);
        assert_eq!(header.length, 9);
        assert_eq!(&packet[2..4], &[0x00, 0x09]);
    }

    #[test]
    fn test_payload_follows_layout() {
        let width = 10;
        let mut layout = Layout::new(width);
        layout.register_led(0, 7, 3);
        layout.register_led(1, 0, 0);
        layout.register_led(4, 9, 9);
        layout.register_led(2, 5, 5);

        let pixels = gradient(width * 10);
        let packet = encode(&pixels, &layout).unwrap();
        assert_eq!(packet.len(), HEADER_LEN + 5 * BYTES_PER_LED);

        for (i, &offset) in layout.offsets().iter().enumerate() {
            let start = HEADER_LEN + i * BYTES_PER_LED;
            let c = pixels[offset];
            assert_eq!(&packet[start..start + 3], &[c.red(), c.green(), c.blue()]);
        }
    }

    #[test]
    fn test_alpha_not_transmitted() {
        let mut layout = Layout::new(1);
        layout.register_led(0, 0, 0);
        let packet = encode(&[Color::from_argb(0xAB, 1, 2, 3)], &layout).unwrap();
        assert_eq!(packet, vec![0, 0, 0, 3, 1, 2, 3]);
    }

    #[test]
    fn test_offset_out_of_bounds() {
        let mut layout = Layout::new(10);
        layout.register_led(0, 0, 0);
        layout.register_led(1, 5, 2);

        let err = encode(&gradient(20), &layout).unwrap_err();
        assert_eq!(
            err,
            EncodeError::OffsetOutOfBounds {
                index: 1,
                offset: 25,
                len: 20
            }
        );
    }

    #[test]
    fn test_empty_layout() {
        let layout = Layout::new(10);
        let packet = encode(&[], &layout).unwrap();
        assert_eq!(packet, vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_too_many_leds() {
        let mut packet = Packet::new();
        assert!(packet.set_led_count(MAX_LEDS).is_ok());
        assert_eq!(
            packet.set_led_count(MAX_LEDS + 1),
            Err(EncodeError::TooManyLeds {
                count: MAX_LEDS + 1,
                max: MAX_LEDS
            })
        );
    }

    #[test]
    fn test_packet_reuse_and_resize() {
        let mut layout = Layout::new(4);
        layout.register_led(0, 1, 0);
        let pixels = gradient(16);

        let mut packet = Packet::new();
        packet.encode_from(&pixels, &layout).unwrap();
        assert_eq!(packet.led_count(), 1);

        layout.register_led(3, 2, 1);
        packet.encode_from(&pixels, &layout).unwrap();
        assert_eq!(packet.led_count(), 4);
        assert_eq!(parse_header(packet.as_bytes()).unwrap().length, 12);
        assert_eq!(&packet.as_bytes()[13..16], &pixels[6].to_rgb_bytes());
    }
}
