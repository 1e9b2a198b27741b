//! Sixel capture
//!
//! Picks DECSIXEL device control strings out of pty output and keeps the
//! body as an opaque payload. Nothing is decoded; the payload is replayed
//! to the host terminal when the grid is drawn.
//!
//! Events carry the offset into the scanned chunk just past the byte that
//! triggered them, so the caller can bring its screen model up to the same
//! point before reading the cursor. A sixel string finishes on the ESC of
//! its terminator.

use tracing::{debug, trace};
use vte::{Params, Parser, Perform};

/// Payloads past this size are dropped
const MAX_PAYLOAD: usize = 16 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SixelEvent {
    /// A sixel string began; the image anchors at the cursor here
    Start { offset: usize },
    /// The sixel string ended
    Finished {
        offset: usize,
        pixel_width: u32,
        data: Vec<u8>,
    },
    /// The screen was erased or switched, so earlier images are gone
    Cleared { offset: usize },
}

/// Stateful sixel scanner
///
/// A sixel string may span several reads; parser state carries over.
pub struct SixelScanner {
    parser: Parser,
    capture: Capture,
}

#[derive(Default)]
struct Capture {
    payload: Option<Vec<u8>>,
    overflow: bool,
    events: Vec<PendingEvent>,
}

enum PendingEvent {
    Start,
    Finished(Option<Vec<u8>>),
    Cleared,
}

impl Default for SixelScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl SixelScanner {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
            capture: Capture::default(),
        }
    }

    /// Scan one chunk of output
    pub fn advance(&mut self, bytes: &[u8]) -> Vec<SixelEvent> {
        let mut events = Vec::new();
        for (i, &byte) in bytes.iter().enumerate() {
            self.parser.advance(&mut self.capture, byte);
            for pending in self.capture.events.drain(..) {
                let offset = i + 1;
                events.push(match pending {
                    PendingEvent::Start => SixelEvent::Start { offset },
                    PendingEvent::Finished(payload) => {
                        let (pixel_width, data) = split_raster(payload.unwrap_or_default());
                        SixelEvent::Finished {
                            offset,
                            pixel_width,
                            data,
                        }
                    }
                    PendingEvent::Cleared => SixelEvent::Cleared { offset },
                });
            }
        }
        events
    }
}

/// Split off a leading `"Pan;Pad;Ph;Pv` raster header
///
/// Returns the horizontal extent `Ph` (0 when absent) and the rest.
fn split_raster(payload: Vec<u8>) -> (u32, Vec<u8>) {
    if payload.first() != Some(&b'"') {
        return (0, payload);
    }
    let end = payload[1..]
        .iter()
        .position(|b| !(b.is_ascii_digit() || *b == b';'))
        .map_or(payload.len(), |n| n + 1);

    let pixel_width = payload[1..end]
        .split(|b| *b == b';')
        .nth(2)
        .and_then(|ph| std::str::from_utf8(ph).ok())
        .and_then(|ph| ph.parse().ok())
        .unwrap_or(0);
    (pixel_width, payload[end..].to_vec())
}

fn clears_screen(params: &Params, intermediates: &[u8], action: char) -> bool {
    let mut values = params.iter().map(|p| p.first().copied().unwrap_or(0));
    match (intermediates, action) {
        // ED 2 and ED 3
        ([], 'J') => values.any(|v| v == 2 || v == 3),
        // Alternate screen on or off
        ([b'?'], 'h' | 'l') => values.any(|v| matches!(v, 47 | 1047 | 1049)),
        _ => false,
    }
}

impl Perform for Capture {
    fn hook(&mut self, _params: &Params, intermediates: &[u8], ignore: bool, action: char) {
        if action != 'q' || ignore || !intermediates.is_empty() {
            return;
        }
        trace!("sixel start");
        self.payload = Some(Vec::new());
        self.overflow = false;
        self.events.push(PendingEvent::Start);
    }

    fn put(&mut self, byte: u8) {
        let Some(payload) = self.payload.as_mut() else {
            return;
        };
        if payload.len() >= MAX_PAYLOAD {
            self.overflow = true;
            return;
        }
        payload.push(byte);
    }

    fn unhook(&mut self) {
        let Some(payload) = self.payload.take() else {
            return;
        };
        if self.overflow {
            debug!("sixel payload over {} bytes dropped", MAX_PAYLOAD);
            self.events.push(PendingEvent::Finished(None));
        } else {
            self.events.push(PendingEvent::Finished(Some(payload)));
        }
    }

    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], ignore: bool, action: char) {
        if !ignore && clears_screen(params, intermediates, action) {
            self.events.push(PendingEvent::Cleared);
        }
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], _ignore: bool, byte: u8) {
        // RIS
        if intermediates.is_empty() && byte == b'c' {
            self.events.push(PendingEvent::Cleared);
        }
    }
}
