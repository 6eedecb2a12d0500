//! Discrete input events and the bounded queue drained at the start of each tick.

use std::collections::VecDeque;

/// Host input translated into engine terms.
///
/// Pointer positions are in physical pixels relative to the client area.
/// `Wheel::delta_y` follows the browser convention: positive zooms out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown { x: f32, y: f32 },
    PointerMove { x: f32, y: f32 },
    PointerUp { x: f32, y: f32 },
    PointerLeave,
    Wheel { delta_y: f32 },
    /// New client-area size in physical pixels
    Resize { width: u32, height: u32 },
    /// Zero both simulation grids
    ResetSimulation,
}

impl InputEvent {
    fn is_move(&self) -> bool {
        matches!(self, InputEvent::PointerMove { .. })
    }
}

/// Bounded FIFO of input events.
///
/// On overflow, moves coalesce into a trailing move and wheel deltas sum into
/// a trailing wheel event; otherwise the oldest queued move is evicted. Only
/// when nothing can be merged or evicted is the incoming event dropped.
#[derive(Debug)]
pub struct InputQueue {
    events: VecDeque<InputEvent>,
    capacity: usize,
    dropped: u64,
    overflowing: bool,
}

impl InputQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
            overflowing: false,
        }
    }

    /// Enqueue an event. Returns `false` if the event had to be dropped.
    pub fn push(&mut self, event: InputEvent) -> bool {
        if self.events.len() < self.capacity {
            self.events.push_back(event);
            return true;
        }

        if !self.overflowing {
            log::warn!(
                "Input queue full ({} events), coalescing until the next tick",
                self.capacity
            );
            self.overflowing = true;
        }

        match (self.events.back_mut(), event) {
            (Some(last @ InputEvent::PointerMove { .. }), InputEvent::PointerMove { .. }) => {
                *last = event;
                return true;
            }
            (
                Some(InputEvent::Wheel { delta_y: queued }),
                InputEvent::Wheel { delta_y },
            ) => {
                *queued += delta_y;
                return true;
            }
            _ => {}
        }

        if let Some(index) = self.events.iter().position(InputEvent::is_move) {
            self.events.remove(index);
            self.events.push_back(event);
            return true;
        }

        self.dropped += 1;
        log::warn!("Input queue saturated, dropped {:?}", event);
        false
    }

    /// Take every pending event in arrival order.
    pub fn drain(&mut self) -> Vec<InputEvent> {
        self.overflowing = false;
        self.events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events discarded since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
