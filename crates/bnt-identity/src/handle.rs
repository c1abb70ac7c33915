//! Collision-free display handles derived from human-readable seeds.
//!
//! Allocation is a cheap existence probe, not a reservation: two callers
//! racing on the same base can both pass the check. The unique index on the
//! accounts table is the authority; [`crate::resolve`] retries once when the
//! write loses that race.
use bnt_core::HANDLE_FALLBACK;
use bnt_core::HANDLE_LIMIT;
use bnt_core::HANDLE_PROBES;

/// Existence probe against the set of taken handles.
#[allow(async_fn_in_trait)]
pub trait HandleProbe {
    type Err;
    async fn taken(&self, handle: &str) -> Result<bool, Self::Err>;
}

/// Canonical handle base: lowercase, `[a-z0-9]` only, at most
/// [`HANDLE_LIMIT`] characters, with a fixed fallback for empty results.
pub fn normalize(seed: &str) -> String {
    let base = seed
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(HANDLE_LIMIT)
        .collect::<String>();
    match base.is_empty() {
        true => HANDLE_FALLBACK.to_string(),
        false => base,
    }
}

/// Returns the first free handle among `base`, `base1`, `base2`, …
///
/// After [`HANDLE_PROBES`] occupied candidates the probe gives up and
/// appends the current timestamp in nanoseconds, which terminates the
/// search with a unique value with overwhelming probability. Only probe
/// I/O can fail; the algorithm itself always produces a usable handle.
pub async fn allocate<P>(probe: &P, seed: &str) -> Result<String, P::Err>
where
    P: HandleProbe,
{
    let base = normalize(seed);
    if !probe.taken(&base).await? {
        return Ok(base);
    }
    for n in 1..HANDLE_PROBES {
        let candidate = format!("{}{}", base, n);
        if !probe.taken(&candidate).await? {
            return Ok(candidate);
        }
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    log::warn!("[handle] probe budget exhausted for {}, using timestamp", base);
    Ok(format!("{}{}", base, nanos))
}
