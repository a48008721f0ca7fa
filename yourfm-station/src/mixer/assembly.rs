//! Playlist assembly
//!
//! Samples both pools at the configured ratio and interleaves them so a
//! selected-artist track comes up after every short run of discovery tracks.

use rand::seq::SliceRandom;
use rand::Rng;

use super::types::CandidateTrack;

/// Split `target_total` into `(discovery, selected)` counts
pub fn split_targets(target_total: usize, discovery_ratio: f64) -> (usize, usize) {
    let ratio = discovery_ratio.clamp(0.0, 1.0);
    let discovery = ((target_total as f64) * ratio).floor() as usize;
    let discovery = discovery.min(target_total);
    (discovery, target_total - discovery)
}

/// Shuffle, sample and interleave the two pools
///
/// A pool that cannot fill its share hands the shortfall to the other pool;
/// the result is never padded, so it is shorter than `target_total` when both
/// pools together are too small.
pub fn assemble<R: Rng + ?Sized>(
    mut selected: Vec<CandidateTrack>,
    mut discovery: Vec<CandidateTrack>,
    target_total: usize,
    discovery_ratio: f64,
    interleave_run: usize,
    rng: &mut R,
) -> Vec<CandidateTrack> {
    let (target_discovery, target_selected) = split_targets(target_total, discovery_ratio);

    selected.shuffle(rng);
    discovery.shuffle(rng);

    let mut take_discovery = target_discovery.min(discovery.len());
    let mut take_selected = target_selected.min(selected.len());
    let discovery_short = target_discovery - take_discovery;
    let selected_short = target_selected - take_selected;
    take_selected = (take_selected + discovery_short).min(selected.len());
    take_discovery = (take_discovery + selected_short).min(discovery.len());

    discovery.truncate(take_discovery);
    selected.truncate(take_selected);

    interleave(discovery, selected, interleave_run.max(1))
}

/// Emit up to `run` discovery tracks, then one selected track, until both are empty
fn interleave(
    discovery: Vec<CandidateTrack>,
    selected: Vec<CandidateTrack>,
    run: usize,
) -> Vec<CandidateTrack> {
    let mut output = Vec::with_capacity(discovery.len() + selected.len());
    let mut discovery = discovery.into_iter().peekable();
    let mut selected = selected.into_iter().peekable();

    while discovery.peek().is_some() || selected.peek().is_some() {
        output.extend(discovery.by_ref().take(run));
        output.extend(selected.next());
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn pool(prefix: &str, count: usize, is_discovery: bool) -> Vec<CandidateTrack> {
        (0..count)
            .map(|i| CandidateTrack {
                uri: format!("spotify:track:{}{}", prefix, i),
                name: format!("{} {}", prefix, i),
                artist: format!("{} artist", prefix),
                artist_id: format!("{}-artist", prefix),
                album: String::new(),
                image: None,
                duration_ms: 180_000,
                preview_url: None,
                is_discovery,
            })
            .collect()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn longest_discovery_run(tracks: &[CandidateTrack]) -> usize {
        let mut longest = 0;
        let mut current = 0;
        for track in tracks {
            if track.is_discovery {
                current += 1;
                longest = longest.max(current);
            } else {
                current = 0;
            }
        }
        longest
    }

    #[test]
    fn test_split_targets() {
        assert_eq!(split_targets(50, 0.8), (40, 10));
        assert_eq!(split_targets(7, 0.8), (5, 2));
        assert_eq!(split_targets(10, 1.5), (10, 0));
        assert_eq!(split_targets(10, -1.0), (0, 10));
    }

    #[test]
    fn test_full_pools_give_forty_and_ten() {
        let out = assemble(pool("s", 30, false), pool("d", 120, true), 50, 0.8, 4, &mut rng());

        assert_eq!(out.len(), 50);
        assert_eq!(out.iter().filter(|t| t.is_discovery).count(), 40);
        assert_eq!(out.iter().filter(|t| !t.is_discovery).count(), 10);
        assert!(longest_discovery_run(&out) <= 4);
    }

    #[test]
    fn test_cadence_is_four_then_one() {
        let out = assemble(pool("s", 10, false), pool("d", 40, true), 50, 0.8, 4, &mut rng());
        for (i, track) in out.iter().enumerate() {
            assert_eq!(track.is_discovery, i % 5 != 4, "position {}", i);
        }
    }

    #[test]
    fn test_empty_selected_pool_gives_all_discovery() {
        let out = assemble(Vec::new(), pool("d", 80, true), 50, 0.8, 4, &mut rng());
        assert_eq!(out.len(), 50);
        assert!(out.iter().all(|t| t.is_discovery));
    }

    #[test]
    fn test_discovery_shortfall_goes_to_selected() {
        let out = assemble(pool("s", 30, false), pool("d", 5, true), 50, 0.8, 4, &mut rng());
        assert_eq!(out.iter().filter(|t| t.is_discovery).count(), 5);
        assert_eq!(out.iter().filter(|t| !t.is_discovery).count(), 30);
        assert_eq!(out.len(), 35);
    }

    #[test]
    fn test_small_pools_are_not_padded() {
        let out = assemble(pool("s", 2, false), pool("d", 3, true), 50, 0.8, 4, &mut rng());
        assert_eq!(out.len(), 5);
        let uris: HashSet<_> = out.iter().map(|t| t.uri.as_str()).collect();
        assert_eq!(uris.len(), 5);
    }

    #[test]
    fn test_final_partial_group_may_run_long() {
        // Selected pool exhausted early; remaining discovery tracks trail at the end
        let out = assemble(pool("s", 1, false), pool("d", 49, true), 50, 0.8, 4, &mut rng());
        assert_eq!(out.len(), 50);
        assert!(!out[4].is_discovery);
        assert!(out[5..].iter().all(|t| t.is_discovery));
    }

    #[test]
    fn test_different_seeds_give_different_orders() {
        let a = assemble(pool("s", 20, false), pool("d", 100, true), 50, 0.8, 4, &mut StdRng::seed_from_u64(1));
        let b = assemble(pool("s", 20, false), pool("d", 100, true), 50, 0.8, 4, &mut StdRng::seed_from_u64(2));
        assert_ne!(a, b);
    }

    #[test]
    fn test_zero_target_is_empty() {
        let out = assemble(pool("s", 5, false), pool("d", 5, true), 0, 0.8, 4, &mut rng());
        assert!(out.is_empty());
    }
}
