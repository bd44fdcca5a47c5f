//! Process-group communicators.

use crate::error::{ScatterError, ScatterResult};
use num_complex::Complex64;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// A group of cooperating processes, seen from one member.
pub trait Communicator: Send + Sync {
    fn size(&self) -> usize;
    fn rank(&self) -> usize;

    /// Sum the members' stage-1 amplitudes element-wise and leave the total
    /// in every member's buffer. Every member calls this once per work item,
    /// in work-item id order, before the transform stage. Single-member
    /// groups have nothing to sum.
    fn reduce_amplitudes(&self, _amplitudes: &mut [Complex64]) -> ScatterResult<()> {
        Ok(())
    }
}

/// The only member of a one-process group.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCommunicator;

impl Communicator for LocalCommunicator {
    fn size(&self) -> usize {
        1
    }

    fn rank(&self) -> usize {
        0
    }
}

#[derive(Debug, Default)]
struct Collective {
    generation: u64,
    arrived: usize,
    sum: Vec<Complex64>,
    result: Vec<Complex64>,
}

#[derive(Debug)]
struct GroupShared {
    size: usize,
    state: Mutex<Collective>,
    cond: Condvar,
}

impl GroupShared {
    fn lock(&self) -> MutexGuard<'_, Collective> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One member of an in-process group whose members run on separate threads.
///
/// `reduce_amplitudes` blocks until every member has contributed.
#[derive(Debug, Clone)]
pub struct GroupCommunicator {
    rank: usize,
    shared: Arc<GroupShared>,
}

impl GroupCommunicator {
    /// All members of a new group, indexed by rank.
    pub fn group(size: usize) -> Vec<GroupCommunicator> {
        let shared = Arc::new(GroupShared {
            size: size.max(1),
            state: Mutex::new(Collective::default()),
            cond: Condvar::new(),
        });
        (0..size.max(1))
            .map(|rank| GroupCommunicator {
                rank,
                shared: shared.clone(),
            })
            .collect()
    }
}

impl Communicator for GroupCommunicator {
    fn size(&self) -> usize {
        self.shared.size
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn reduce_amplitudes(&self, amplitudes: &mut [Complex64]) -> ScatterResult<()> {
        let mut state = self.shared.lock();

        if state.arrived == 0 {
            state.sum = vec![Complex64::new(0.0, 0.0); amplitudes.len()];
        } else if state.sum.len() != amplitudes.len() {
            return Err(ScatterError::SignalLength {
                expected: state.sum.len(),
                actual: amplitudes.len(),
            });
        }
        for (total, value) in state.sum.iter_mut().zip(amplitudes.iter()) {
            *total += *value;
        }
        state.arrived += 1;

        let generation = state.generation;
        if state.arrived == self.shared.size {
            state.result = std::mem::take(&mut state.sum);
            state.arrived = 0;
            state.generation += 1;
            self.shared.cond.notify_all();
        } else {
            // The result of this generation survives until every member has
            // contributed to the next one, so late readers still see it.
            state = self
                .shared
                .cond
                .wait_while(state, |s| s.generation == generation)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }

        amplitudes.copy_from_slice(&state.result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_local_reduce_is_identity() {
        let mut data = vec![Complex64::new(1.5, -2.0); 3];
        LocalCommunicator.reduce_amplitudes(&mut data).unwrap();
        assert_eq!(data, vec![Complex64::new(1.5, -2.0); 3]);
    }

    #[test]
    fn test_group_sums_every_round() {
        let members = GroupCommunicator::group(3);
        assert_eq!(members[2].rank(), 2);
        assert_eq!(members[0].size(), 3);

        let handles: Vec<_> = members
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    let mut rounds = Vec::new();
                    for round in 0..20 {
                        let value = (comm.rank() + 1) as f64 * (round + 1) as f64;
                        let mut data = vec![Complex64::new(value, 1.0); 2];
                        comm.reduce_amplitudes(&mut data).unwrap();
                        rounds.push(data);
                    }
                    rounds
                })
            })
            .collect();

        for handle in handles {
            let rounds = handle.join().unwrap();
            for (round, data) in rounds.iter().enumerate() {
                // (1 + 2 + 3) * (round + 1), imaginary parts 3 * 1.
                let expected = Complex64::new(6.0 * (round + 1) as f64, 3.0);
                assert_eq!(data, &vec![expected; 2]);
            }
        }
    }

    #[test]
    fn test_single_member_group() {
        let members = GroupCommunicator::group(1);
        let mut data = vec![Complex64::new(2.0, 0.0)];
        members[0].reduce_amplitudes(&mut data).unwrap();
        assert_eq!(data, vec![Complex64::new(2.0, 0.0)]);
    }
}
