//! Fixed-capacity event table.
//!
//! Rows are appended up to [`CAPACITY`] and never move: a row's position is its identity and
//! determines its cell on the LED matrix (`CAPACITY - 1 - index`, so the matrix fills from its
//! far end while the table fills from the front). Scheduling flips an existing unscheduled row,
//! removal clears the flag, and nothing is ever compacted.

use crate::error::ScheduleRejected;
use crate::indicator::{IndicatorGrid, Rgb};

/// Maximum number of rows, equal to the number of matrix cells
pub const CAPACITY: usize = 25;
/// Allocation window for new events, inclusive
pub const FIRST_HOUR: u8 = 8;
pub const LAST_HOUR: u8 = 21;
/// Longest stored id or description, in characters
pub const TEXT_MAX: usize = 49;
const MAX_HOUR: u8 = 23;
const MAX_MINUTE: u8 = 59;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    /// Correlation token assigned by the upload service
    pub id: String,
    pub description: String,
    pub hour: u8,
    pub minute: u8,
    /// Matrix cell of the row's position, fixed when the row is appended
    pub indicator_slot: usize,
    pub completed: bool,
    pub scheduled: bool,
}

impl Event {
    fn template(description: &str, index: usize) -> Self {
        Self {
            description: truncate(description),
            indicator_slot: slot_for_index(index),
            ..Self::default()
        }
    }
}

/// Where a confirmed reply was booked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub index: usize,
    pub hour: u8,
    pub minute: u8,
    pub indicator_slot: usize,
}

/// Matrix cell owned by table row `index`
pub fn slot_for_index(index: usize) -> usize {
    CAPACITY - 1 - index
}

/// Deterministic cell colour for an event time
pub fn slot_color(hour: u8, minute: u8) -> Rgb {
    let (hour, minute) = (hour as u32, minute as u32);
    Rgb::new(
        (hour * 10 % 256) as u8,
        (minute * 4 % 256) as u8,
        ((hour + minute) * 5 % 256) as u8,
    )
}

fn truncate(text: &str) -> String {
    text.chars().take(TEXT_MAX).collect()
}

pub struct EventStore {
    events: [Event; CAPACITY],
    count: usize,
    grid: IndicatorGrid,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: std::array::from_fn(|_| Event::default()),
            count: 0,
            grid: IndicatorGrid::default(),
        }
    }

    /// Number of rows ever appended
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == CAPACITY
    }

    pub fn get(&self, index: usize) -> Option<&Event> {
        self.events[..self.count].get(index)
    }

    pub fn events(&self) -> &[Event] {
        &self.events[..self.count]
    }

    pub fn scheduled_count(&self) -> usize {
        self.events().iter().filter(|e| e.scheduled).count()
    }

    /// Current matrix colours, one cell per row position
    pub fn grid(&self) -> &IndicatorGrid {
        &self.grid
    }

    /// Ensure an unscheduled row exists for `description` and return its index.
    ///
    /// An existing unscheduled row with the same description is reused; otherwise a row is
    /// appended, which fails once the table holds [`CAPACITY`] rows.
    pub fn add_template(&mut self, description: &str) -> Result<usize, ScheduleRejected> {
        let description = truncate(description);
        if let Some(index) = self.find_unscheduled(&description) {
            return Ok(index);
        }
        if self.is_full() {
            log::warn!("📋 Event table full ({} rows)", CAPACITY);
            return Err(ScheduleRejected::TableFull);
        }

        let index = self.count;
        self.events[index] = Event::template(&description, index);
        self.count += 1;
        log::debug!("📋 Template row {} created for '{}'", index, description);
        Ok(index)
    }

    /// First hour in `FIRST_HOUR..=LAST_HOUR` with no scheduled event
    pub fn allocate_free_hour(&self) -> Option<u8> {
        (FIRST_HOUR..=LAST_HOUR).find(|hour| !self.hour_taken(*hour))
    }

    /// Whether a scheduled row already occupies `hour`
    pub fn hour_taken(&self, hour: u8) -> bool {
        self.events()
            .iter()
            .any(|event| event.scheduled && event.hour == hour)
    }

    /// Schedule the first unscheduled row matching `description`.
    ///
    /// Never creates a row. Returns the row index on success, or `None` without touching the
    /// table when no row matches, the time is not a valid time of day, or the hour is taken.
    pub fn schedule(&mut self, description: &str, hour: u8, minute: u8) -> Option<usize> {
        if hour > MAX_HOUR || minute > MAX_MINUTE {
            log::warn!("📅 Refusing invalid time {:02}:{:02}", hour, minute);
            return None;
        }
        if self.hour_taken(hour) {
            log::warn!("📅 Hour {:02} already has an event", hour);
            return None;
        }
        let index = self.find_unscheduled(&truncate(description))?;
        let slot = slot_for_index(index);

        let event = &mut self.events[index];
        event.scheduled = true;
        event.completed = false;
        event.hour = hour;
        event.minute = minute;

        self.grid.set(slot, slot_color(hour, minute));
        log::info!(
            "📅 Scheduled '{}' at {:02}:{:02} (slot {})",
            event.description,
            hour,
            minute,
            slot
        );
        Some(index)
    }

    /// Copy the service's correlation token into row `index`
    pub fn set_id(&mut self, index: usize, id: &str) {
        if index < self.count {
            self.events[index].id = truncate(id);
        }
    }

    /// Mark row `index` done and switch its matrix cell off. No-op outside `0..len()`.
    pub fn confirm_and_remove(&mut self, index: usize) {
        if index >= self.count {
            return;
        }

        let event = &mut self.events[index];
        if event.scheduled {
            event.completed = true;
            log::info!("✅ Completed '{}'", event.description);
        }
        event.scheduled = false;
        self.grid.set(slot_for_index(index), Rgb::OFF);
    }

    /// Oldest-inserted scheduled row, regardless of its time of day
    pub fn next_scheduled(&self) -> Option<(usize, &Event)> {
        self.events()
            .iter()
            .enumerate()
            .find(|(_, event)| event.scheduled)
    }

    /// Book a confirmed reply: allocate an hour, ensure a template row, schedule it on the hour
    /// and attach the service id.
    pub fn book(&mut self, description: &str, id: &str) -> Result<Booking, ScheduleRejected> {
        let hour = self
            .allocate_free_hour()
            .ok_or(ScheduleRejected::NoFreeHour)?;
        self.add_template(description)?;
        let index = self
            .schedule(description, hour, 0)
            .ok_or(ScheduleRejected::TableFull)?;
        self.set_id(index, id);

        Ok(Booking {
            index,
            hour,
            minute: 0,
            indicator_slot: slot_for_index(index),
        })
    }

    fn find_unscheduled(&self, description: &str) -> Option<usize> {
        self.events()
            .iter()
            .position(|event| !event.scheduled && event.description == description)
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}
