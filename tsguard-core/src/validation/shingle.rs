//! Effective shingle size derivation.

/// Resolves the shingle size a detector runs with.
///
/// Priority: an explicit size wins, then `seasonality / ratio` (floored),
/// then `default`. A zero `ratio` cannot derive anything and falls through
/// to `default`.
///
/// # Arguments
/// * `explicit` - Shingle size set on the detector, already range-checked
/// * `seasonality` - Suggested seasonality in detection intervals
/// * `default` - System default shingle size
/// * `ratio` - Seasonality to shingle size ratio
pub fn resolve_shingle_size(
    explicit: Option<u32>,
    seasonality: Option<u32>,
    default: u32,
    ratio: u32,
) -> u32 {
    if let Some(size) = explicit {
        return size;
    }
    match seasonality {
        Some(seasonality) if ratio > 0 => seasonality / ratio,
        _ => default,
    }
}
