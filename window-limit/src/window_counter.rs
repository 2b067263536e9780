use std::num::NonZeroUsize;

/// A circular buffer of per-slice hit counts with an incrementally maintained
/// total.
///
/// The window always spans every slot of the buffer: `begin` is the oldest
/// slice and `end` the slice currently collecting hits. Advancing the window
/// evicts the oldest slice and reuses its slot for the new one, so every
/// operation is O(1).
///
/// There is no internal synchronisation. Callers sharing a counter between
/// threads must serialise access themselves, as
/// [`AdmissionController`](crate::AdmissionController) does with its mutex.
#[derive(Debug, Clone)]
pub struct WindowCounter {
    slots: Vec<u64>,
    begin: usize,
    end: usize,
    active_sum: u64,
}

impl WindowCounter {
    /// Creates an empty counter with `num_slices` slices per window.
    pub fn new(num_slices: NonZeroUsize) -> Self {
        let num_slices = num_slices.get();
        Self {
            slots: vec![0; num_slices],
            begin: 0,
            end: num_slices - 1,
            active_sum: 0,
        }
    }

    /// Records one hit in the current (newest) slice.
    #[inline]
    pub fn add_hit(&mut self) {
        self.slots[self.end] += 1;
        self.active_sum += 1;
    }

    /// Evicts the oldest slice and opens a fresh, empty one.
    pub fn next_time_frame(&mut self) {
        self.active_sum -= self.slots[self.begin];
        self.begin = self.next_index(self.begin);
        self.end = self.next_index(self.end);
        self.slots[self.end] = 0;

        debug_assert_eq!(
            self.window_sum(),
            self.active_sum,
            "running total diverged from the window contents"
        );
    }

    /// Total hits recorded across the slices currently inside the window.
    #[inline]
    pub fn active_sum(&self) -> u64 {
        self.active_sum
    }

    /// Number of slices in the window.
    pub fn num_slices(&self) -> usize {
        self.slots.len()
    }

    /// Recomputes the window total from scratch by walking the circular range
    /// `[begin, end]`.
    ///
    /// This is O(n) and only meant for verification.
    pub fn window_sum(&self) -> u64 {
        let len = self.slots.len();
        let span = (self.end + len - self.begin) % len + 1;
        (0..span)
            .map(|offset| self.slots[(self.begin + offset) % len])
            .sum()
    }

    #[inline]
    fn next_index(&self, index: usize) -> usize {
        if index + 1 < self.slots.len() {
            index + 1
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use rand::Rng;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn counter(num_slices: usize) -> WindowCounter {
        WindowCounter::new(NonZeroUsize::new(num_slices).unwrap())
    }

    #[test]
    fn it_starts_empty_spanning_the_whole_buffer() {
        let wc = counter(4);
        assert_eq!(wc.active_sum(), 0);
        assert_eq!(wc.num_slices(), 4);
        assert_eq!(wc.begin, 0);
        assert_eq!(wc.end, 3);
    }

    #[test]
    fn it_counts_hits_in_the_newest_slice() {
        let mut wc = counter(4);
        for _ in 0..7 {
            wc.add_hit();
        }
        assert_eq!(wc.active_sum(), 7);
        assert_eq!(wc.slots, vec![0, 0, 0, 7]);
    }

    #[test]
    fn it_evicts_hits_after_a_full_rotation() {
        let mut wc = counter(3);
        wc.add_hit();
        wc.add_hit();

        // The hits live in the last slot, which is the third to be evicted.
        wc.next_time_frame();
        assert_eq!(wc.active_sum(), 2);
        wc.next_time_frame();
        assert_eq!(wc.active_sum(), 2);
        wc.next_time_frame();
        assert_eq!(wc.active_sum(), 0);
    }

    #[test]
    fn it_wraps_indices_around_the_buffer() {
        let mut wc = counter(3);
        for _ in 0..3 {
            wc.next_time_frame();
        }
        assert_eq!(wc.begin, 0);
        assert_eq!(wc.end, 2);

        wc.next_time_frame();
        assert_eq!(wc.begin, 1);
        assert_eq!(wc.end, 0);
    }

    #[test]
    fn it_decays_to_zero_after_n_idle_frames() {
        let mut wc = counter(10);
        for frame in 0..10 {
            for _ in 0..frame {
                wc.add_hit();
            }
            wc.next_time_frame();
        }
        assert!(wc.active_sum() > 0);

        for _ in 0..10 {
            wc.next_time_frame();
        }
        assert_eq!(wc.active_sum(), 0);
        assert_eq!(wc.window_sum(), 0);
    }

    #[test]
    fn it_handles_a_single_slice() {
        let mut wc = counter(1);
        wc.add_hit();
        wc.add_hit();
        assert_eq!(wc.active_sum(), 2);

        wc.next_time_frame();
        assert_eq!(wc.active_sum(), 0);

        wc.add_hit();
        assert_eq!(wc.active_sum(), 1);
    }

    // Compare against a model that remembers which frame each hit arrived in
    // and forgets it once it is `n` frames old.
    #[test]
    fn it_matches_an_independent_model() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for num_slices in [1, 2, 3, 7, 64] {
            let mut wc = counter(num_slices);
            let mut model: VecDeque<u64> = VecDeque::from(vec![0; num_slices]);

            for _ in 0..5_000 {
                if rng.random_bool(0.7) {
                    wc.add_hit();
                    *model.back_mut().unwrap() += 1;
                } else {
                    wc.next_time_frame();
                    model.pop_front();
                    model.push_back(0);
                }

                let expected: u64 = model.iter().sum();
                assert_eq!(wc.active_sum(), expected);
                assert_eq!(wc.window_sum(), expected);
            }
        }
    }
}
