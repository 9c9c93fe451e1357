use clap::ValueEnum;
use std::thread;
use std::time::Duration;

use opc_client::pixel::filled_buffer;
use opc_client::{ClientHandle, Color, PixelBuffer};

/// Demo patterns the CLI can drive
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Pattern {
    /// Whole framebuffer white, submitted once
    Solid,
    /// A lit column sweeping across the framebuffer
    Chase,
}

/// Render frame number `frame` of `pattern`
pub fn render(pattern: Pattern, width: usize, height: usize, frame: u64) -> PixelBuffer {
    match pattern {
        Pattern::Solid => filled_buffer(width, height, Color::WHITE),
        Pattern::Chase => {
            let mut pixels = filled_buffer(width, height, Color::BLACK);
            if width == 0 {
                return pixels;
            }
            let column = (frame % width as u64) as usize;
            // Fade the tail so the sweep reads as motion on sparse strips
            let tail = (width / 20).max(1);
            for step in 0..tail {
                let x = (column + width - step) % width;
                let level = (255 - 255 * step / tail) as u8;
                for y in 0..height {
                    pixels[x + width * y] = Color::rgb(level, level / 2, 0);
                }
            }
            pixels
        }
    }
}

/// Feed `handle` with frames until the client stops
pub fn spawn_generator(
    handle: ClientHandle,
    pattern: Pattern,
    width: usize,
    height: usize,
    fps: u32,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        if pattern == Pattern::Solid {
            handle.submit_frame(render(pattern, width, height, 0));
            return;
        }

        let period = Duration::from_secs_f64(1.0 / fps.max(1) as f64);
        let mut frame = 0u64;
        while !handle.is_stopped() {
            handle.submit_frame(render(pattern, width, height, frame));
            frame = frame.wrapping_add(1);
            thread::sleep(period);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_is_white() {
        let pixels = render(Pattern::Solid, 8, 2, 3);
        assert_eq!(pixels.len(), 16);
        assert!(pixels.iter().all(|&c| c == Color::WHITE));
    }

    #[test]
    fn test_chase_moves() {
        let width = 40;
        let a = render(Pattern::Chase, width, 2, 0);
        let b = render(Pattern::Chase, width, 2, 5);
        assert_eq!(a[0].red(), 255);
        assert_eq!(a[width].red(), 255); // whole column lit
        assert_eq!(b[5].red(), 255);
        assert_ne!(a, b);
    }

    #[test]
    fn test_chase_wraps() {
        let width = 10;
        let pixels = render(Pattern::Chase, width, 1, 23);
        assert_eq!(pixels[3].red(), 255);
    }
}
