mod test_strict_policy_waits_for_gesture;
mod test_unmuted_rejection_forces_muted_retry;
