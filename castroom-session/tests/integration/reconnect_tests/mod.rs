mod test_backoff_schedule_and_exhaustion;
mod test_in_place_reconnect_preserves_identity;
mod test_triggers_ignored_while_reconnect_in_flight;
