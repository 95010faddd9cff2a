use tokio::time::Instant;

use crate::data::Pacing;

/// Earliest instant the next query may be admitted.
///
/// `None` means admission is allowed immediately: nothing has been admitted
/// yet, or pacing is disabled.
pub fn admission_deadline(last_admission: Option<Instant>, pacing: Pacing) -> Option<Instant> {
    if pacing.is_unpaced() {
        return None;
    }
    last_admission.map(|last| last + pacing.interval())
}

pub fn slot_open(deadline: Option<Instant>, now: Instant) -> bool {
    deadline.is_none_or(|deadline| deadline <= now)
}
