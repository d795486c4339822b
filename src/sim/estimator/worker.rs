use parking_lot::{Mutex, RwLock};

/// Index of the calling worker inside the current thread pool (0 outside one).
pub fn worker_index() -> usize {
    rayon::current_thread_index().unwrap_or(0)
}

/// One slot of `T` per worker.
///
/// Each worker only touches its own slot, so the inner locks are never
/// contended. The outer lock is taken for writing only when slots are added.
#[derive(Debug)]
pub struct PerWorker<T> {
    slots: RwLock<Vec<Mutex<T>>>,
}

impl<T: Default> PerWorker<T> {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(vec![Mutex::new(T::default())]),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Makes sure at least `n` slots exist.
    pub fn ensure(&self, n: usize) {
        let mut slots = self.slots.write();
        while slots.len() < n {
            slots.push(Mutex::new(T::default()));
        }
    }

    /// Runs `f` on the calling worker's slot.
    pub fn with_current<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let index = worker_index();
        {
            let slots = self.slots.read();
            if let Some(slot) = slots.get(index) {
                return f(&mut slot.lock());
            }
        }
        self.ensure(index + 1);
        let slots = self.slots.read();
        f(&mut slots[index].lock())
    }

    /// Runs `f` on every slot.
    pub fn for_each(&self, mut f: impl FnMut(&mut T)) {
        for slot in self.slots.read().iter() {
            f(&mut slot.lock());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_slot_outside_pool() {
        let slots: PerWorker<u32> = PerWorker::new();
        assert_eq!(slots.len(), 1);
        slots.with_current(|v| *v += 2);
        assert_eq!(slots.with_current(|v| *v), 2);
    }

    #[test]
    fn test_ensure_only_grows() {
        let slots: PerWorker<u32> = PerWorker::new();
        slots.ensure(4);
        assert_eq!(slots.len(), 4);
        slots.ensure(2);
        assert_eq!(slots.len(), 4);
        let mut count = 0;
        slots.for_each(|_| count += 1);
        assert_eq!(count, 4);
    }

    #[test]
    fn test_workers_use_separate_slots() {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(3)
            .build()
            .unwrap();
        let slots: PerWorker<Vec<usize>> = PerWorker::new();
        slots.ensure(3);
        pool.broadcast(|ctx| slots.with_current(|v| v.push(ctx.index())));

        let mut seen = Vec::new();
        slots.for_each(|v| seen.push(v.clone()));
        assert_eq!(seen, vec![vec![0], vec![1], vec![2]]);
    }
}
