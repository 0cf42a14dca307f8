/// Clients are allowed to hold a lease for no more than 5 seconds; we add 2
/// seconds to account for clock drift of at most 1 second between any two
/// workers (spec.md §3, §5).
pub const LOCK_LIFETIME: i64 = 7;

/// Sleep between lock-acquisition retries on the operation's own target path.
pub const LOCK_RETRY_TARGET_SECS: u64 = 2;

/// Sleep between lock-acquisition retries when acquiring a parent lock after
/// the target lock is already held (spec.md §4.4 "1 second when acquiring a
/// parent lock after child lock").
pub const LOCK_RETRY_PARENT_SECS: u64 = 1;

/// Reserved shard id for `increase_system_counter`. The "writer ID" parameter
/// in the original is marked for removal; this core is single-shard
/// (spec.md §9 Open Questions).
pub const COUNTER_SHARD: u8 = 0;
