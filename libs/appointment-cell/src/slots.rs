/// The closed set of bookable start times for a clinic day, in day order.
/// Appointment writes carrying any other `time` value are rejected.
pub const TIME_SLOTS: [&str; 8] = [
    "8:00 AM", "9:00 AM", "10:00 AM", "11:00 AM", "1:00 PM", "2:00 PM", "3:00 PM", "4:00 PM",
];

pub fn is_valid_slot(time: &str) -> bool {
    TIME_SLOTS.contains(&time)
}

/// Position of a slot within the clinic day, if it is one.
pub fn slot_rank(time: &str) -> Option<usize> {
    TIME_SLOTS.iter().position(|s| *s == time)
}

/// Validation detail listing the allowed values.
pub fn allowed_slots_message() -> String {
    format!("time must be one of: {}", TIME_SLOTS.join(", "))
}
