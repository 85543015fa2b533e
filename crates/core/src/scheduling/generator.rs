//! Slot generation from availability templates
//!
//! Also carries the counselor-side schedule edits: templates and blocking.

use chrono::{Duration, NaiveDate, NaiveTime};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::invariants;
use crate::models::{day_of_week, AvailabilityTemplate, TimeSlot};
use crate::storage::{AvailabilityStore, Database, SlotStore};

/// Default session granularity
pub const DEFAULT_SESSION_MINUTES: u32 = 60;

/// Expands availability templates into dated slots
pub struct SlotGenerator<'a> {
    db: &'a Database,
    session_length: Duration,
}

impl<'a> SlotGenerator<'a> {
    pub fn new(db: &'a Database, session_minutes: u32) -> Result<Self> {
        if session_minutes == 0 || session_minutes > 24 * 60 {
            return Err(Error::Validation(format!(
                "session length must be 1-1440 minutes, got {}",
                session_minutes
            )));
        }
        Ok(Self {
            db,
            session_length: Duration::minutes(i64::from(session_minutes)),
        })
    }

    pub fn session_length(&self) -> Duration {
        self.session_length
    }

    /// Make sure every session offered by the counselor's active templates
    /// exists as a slot on `date`.
    ///
    /// Slots that already exist are never touched, whatever their status.
    /// Returns how many slots were created; zero when nothing matches.
    #[instrument(skip(self))]
    pub fn ensure_slots(&self, counselor_id: Uuid, date: NaiveDate) -> Result<usize> {
        let created = self.db.transaction(|conn| {
            let templates =
                AvailabilityStore::new(conn).active_for_day(counselor_id, day_of_week(date))?;
            let slots = SlotStore::new(conn);

            let mut created = 0;
            for template in templates.iter().filter(|t| t.applies_to(date)) {
                invariants::assert_template_invariants(template);
                for (start, end) in template.session_ranges(self.session_length) {
                    let slot = TimeSlot::new(counselor_id, date, start, end);
                    if slots.insert_if_absent(&slot)? {
                        created += 1;
                    }
                }
            }
            Ok(created)
        })?;

        if created > 0 {
            info!(%counselor_id, %date, created, "Generated time slots");
        } else {
            debug!(%counselor_id, %date, "No new time slots");
        }
        Ok(created)
    }

    /// Ensure slots for `date`, then list the claimable ones by start time
    #[instrument(skip(self))]
    pub fn available_slots(&self, counselor_id: Uuid, date: NaiveDate) -> Result<Vec<TimeSlot>> {
        self.ensure_slots(counselor_id, date)?;
        self.db.slots().list_available(counselor_id, date)
    }

    /// Every slot for `date` in any status, by start time
    pub fn slots_on(&self, counselor_id: Uuid, date: NaiveDate) -> Result<Vec<TimeSlot>> {
        self.db.slots().list_for_date(counselor_id, date)
    }

    /// Register a new weekly window for a counselor
    #[instrument(skip(self))]
    pub fn add_template(
        &self,
        counselor_id: Uuid,
        day_of_week: u8,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<AvailabilityTemplate> {
        let template = AvailabilityTemplate::new(counselor_id, day_of_week, start_time, end_time)?;
        self.db.availability().create(&template)?;
        info!(template_id = %template.id, %counselor_id, day_of_week, "Availability template added");
        Ok(template)
    }

    pub fn templates(&self, counselor_id: Uuid) -> Result<Vec<AvailabilityTemplate>> {
        self.db.availability().list_for_counselor(counselor_id)
    }

    /// Soft-enable or soft-disable a template. Existing slots stay.
    #[instrument(skip(self))]
    pub fn set_template_active(&self, template_id: Uuid, is_active: bool) -> Result<()> {
        self.db.availability().set_active(template_id, is_active)?;
        info!(%template_id, is_active, "Availability template toggled");
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn update_template(
        &self,
        template_id: Uuid,
        day_of_week: u8,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<AvailabilityTemplate> {
        let store = self.db.availability();
        store.update_window(template_id, day_of_week, start_time, end_time)?;
        store
            .find_by_id(template_id)?
            .ok_or_else(|| Error::NotFound(format!("availability template {}", template_id)))
    }

    /// Close an available slot to bookings
    #[instrument(skip(self))]
    pub fn block_slot(&self, slot_id: Uuid) -> Result<TimeSlot> {
        self.db.slots().block(slot_id)?;
        info!(%slot_id, "Slot blocked");
        self.find_slot(slot_id)
    }

    /// Reopen a blocked slot
    #[instrument(skip(self))]
    pub fn unblock_slot(&self, slot_id: Uuid) -> Result<TimeSlot> {
        self.db.slots().unblock(slot_id)?;
        info!(%slot_id, "Slot unblocked");
        self.find_slot(slot_id)
    }

    fn find_slot(&self, slot_id: Uuid) -> Result<TimeSlot> {
        self.db
            .slots()
            .find_by_id(slot_id)?
            .ok_or_else(|| Error::NotFound(format!("time slot {}", slot_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::SlotStatus;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    #[test]
    fn test_one_hour_window_gives_one_slot() {
        let db = Database::open_in_memory().unwrap();
        let generator = SlotGenerator::new(&db, 60).unwrap();
        let counselor = Uuid::new_v4();
        generator.add_template(counselor, 1, hm(9, 0), hm(10, 0)).unwrap();

        assert_eq!(generator.ensure_slots(counselor, monday()).unwrap(), 1);
        let slots = generator.slots_on(counselor, monday()).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start_time, hm(9, 0));
        assert_eq!(slots[0].end_time, hm(10, 0));
        assert_eq!(slots[0].status, SlotStatus::Available);
    }

    #[test]
    fn test_ensure_slots_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let generator = SlotGenerator::new(&db, 30).unwrap();
        let counselor = Uuid::new_v4();
        generator.add_template(counselor, 1, hm(9, 0), hm(11, 0)).unwrap();

        assert_eq!(generator.ensure_slots(counselor, monday()).unwrap(), 4);
        let first = generator.slots_on(counselor, monday()).unwrap();
        assert_eq!(generator.ensure_slots(counselor, monday()).unwrap(), 0);
        let second = generator.slots_on(counselor, monday()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_progressed_slots_are_not_reset() {
        let db = Database::open_in_memory().unwrap();
        let generator = SlotGenerator::new(&db, 60).unwrap();
        let counselor = Uuid::new_v4();
        generator.add_template(counselor, 1, hm(9, 0), hm(11, 0)).unwrap();
        generator.ensure_slots(counselor, monday()).unwrap();

        let slots = generator.slots_on(counselor, monday()).unwrap();
        db.slots().claim(slots[0].id).unwrap();
        generator.block_slot(slots[1].id).unwrap();

        generator.ensure_slots(counselor, monday()).unwrap();
        let after = generator.slots_on(counselor, monday()).unwrap();
        assert_eq!(after.len(), 2);
        assert_eq!(after[0].status, SlotStatus::Pending);
        assert_eq!(after[1].status, SlotStatus::Blocked);
        assert!(generator.available_slots(counselor, monday()).unwrap().is_empty());
    }

    #[test]
    fn test_no_template_is_a_noop() {
        let db = Database::open_in_memory().unwrap();
        let generator = SlotGenerator::new(&db, 60).unwrap();
        let counselor = Uuid::new_v4();
        // Tuesday only
        generator.add_template(counselor, 2, hm(9, 0), hm(10, 0)).unwrap();

        assert_eq!(generator.ensure_slots(counselor, monday()).unwrap(), 0);
        assert!(generator.slots_on(counselor, monday()).unwrap().is_empty());
    }

    #[test]
    fn test_inactive_template_generates_nothing() {
        let db = Database::open_in_memory().unwrap();
        let generator = SlotGenerator::new(&db, 60).unwrap();
        let counselor = Uuid::new_v4();
        let template = generator.add_template(counselor, 1, hm(9, 0), hm(10, 0)).unwrap();
        generator.set_template_active(template.id, false).unwrap();

        assert_eq!(generator.ensure_slots(counselor, monday()).unwrap(), 0);
        assert_eq!(generator.templates(counselor).unwrap().len(), 1);
    }

    #[test]
    fn test_overlapping_templates_share_slots() {
        let db = Database::open_in_memory().unwrap();
        let generator = SlotGenerator::new(&db, 60).unwrap();
        let counselor = Uuid::new_v4();
        generator.add_template(counselor, 1, hm(9, 0), hm(11, 0)).unwrap();
        generator.add_template(counselor, 1, hm(10, 0), hm(12, 0)).unwrap();

        assert_eq!(generator.ensure_slots(counselor, monday()).unwrap(), 3);
        let starts: Vec<_> = generator
            .available_slots(counselor, monday())
            .unwrap()
            .into_iter()
            .map(|s| s.start_time)
            .collect();
        assert_eq!(starts, vec![hm(9, 0), hm(10, 0), hm(11, 0)]);
    }

    #[test]
    fn test_short_remainder_is_dropped() {
        let db = Database::open_in_memory().unwrap();
        let generator = SlotGenerator::new(&db, 45).unwrap();
        let counselor = Uuid::new_v4();
        generator.add_template(counselor, 1, hm(9, 0), hm(10, 0)).unwrap();

        assert_eq!(generator.ensure_slots(counselor, monday()).unwrap(), 1);
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            SlotGenerator::new(&db, 0),
            Err(Error::Validation(_))
        ));

        let generator = SlotGenerator::new(&db, 60).unwrap();
        assert!(matches!(
            generator.add_template(Uuid::new_v4(), 1, hm(10, 0), hm(9, 0)),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            generator.add_template(Uuid::new_v4(), 7, hm(9, 0), hm(10, 0)),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            generator.block_slot(Uuid::new_v4()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_fractional_times_are_validation_errors() {
        let db = Database::open_in_memory().unwrap();
        let generator = SlotGenerator::new(&db, 60).unwrap();
        let counselor = Uuid::new_v4();
        let half_past = NaiveTime::from_hms_milli_opt(9, 0, 0, 500).unwrap();

        let err = generator
            .add_template(
                counselor,
                1,
                NaiveTime::from_hms_milli_opt(9, 0, 0, 200).unwrap(),
                NaiveTime::from_hms_milli_opt(9, 0, 0, 800).unwrap(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(matches!(
            generator.add_template(counselor, 1, half_past, hm(11, 0)),
            Err(Error::Validation(_))
        ));
        assert!(generator.templates(counselor).unwrap().is_empty());

        let template = generator.add_template(counselor, 1, hm(9, 0), hm(11, 0)).unwrap();
        assert!(matches!(
            generator.update_template(template.id, 1, half_past, hm(11, 0)),
            Err(Error::Validation(_))
        ));
        let stored = db.availability().find_by_id(template.id).unwrap().unwrap();
        assert_eq!(stored.start_time, hm(9, 0));
    }

    #[test]
    fn test_update_template_changes_future_generation() {
        let db = Database::open_in_memory().unwrap();
        let generator = SlotGenerator::new(&db, 60).unwrap();
        let counselor = Uuid::new_v4();
        let template = generator.add_template(counselor, 1, hm(9, 0), hm(10, 0)).unwrap();

        let updated = generator
            .update_template(template.id, 1, hm(14, 0), hm(16, 0))
            .unwrap();
        assert_eq!(updated.start_time, hm(14, 0));

        let starts: Vec<_> = generator
            .available_slots(counselor, monday())
            .unwrap()
            .into_iter()
            .map(|s| s.start_time)
            .collect();
        assert_eq!(starts, vec![hm(14, 0), hm(15, 0)]);
    }
}
