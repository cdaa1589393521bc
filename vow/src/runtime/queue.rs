use std::collections::VecDeque;

/// A unit of deferred work.
pub(crate) type Job = Box<dyn FnOnce()>;

/// FIFO of jobs standing in for a microtask queue.
///
/// Jobs live in one of two lanes:
///
/// - the **microtask lane**, which receives callback deliveries and
///   thenable adoptions,
/// - the **next-turn lane**, whose jobs only become runnable once the
///   microtask lane has fully drained.
///
/// Promoting the next-turn lane marks the end of a turn.
pub(crate) struct TaskQueue {
    microtasks: VecDeque<Job>,
    next_turn: VecDeque<Job>,
    turn: u64,
}

impl TaskQueue {
    pub(crate) const fn new() -> Self {
        Self {
            microtasks: VecDeque::new(),
            next_turn: VecDeque::new(),
            turn: 0,
        }
    }

    pub(crate) fn push(&mut self, job: Job) {
        self.microtasks.push_back(job);
    }

    pub(crate) fn push_next_turn(&mut self, job: Job) {
        self.next_turn.push_back(job);
    }

    /// Pops the next runnable job, promoting the next-turn lane when the
    /// microtask lane is empty.
    pub(crate) fn pop(&mut self) -> Option<Job> {
        if self.microtasks.is_empty() && !self.next_turn.is_empty() {
            std::mem::swap(&mut self.microtasks, &mut self.next_turn);
            self.turn += 1;

            tracing::debug!(turn = self.turn, jobs = self.microtasks.len(), "turn advanced");
        }

        self.microtasks.pop_front()
    }

    /// Number of queued jobs across both lanes.
    pub(crate) fn len(&self) -> usize {
        self.microtasks.len() + self.next_turn.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.microtasks.is_empty() && self.next_turn.is_empty()
    }

    pub(crate) fn turn(&self) -> u64 {
        self.turn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, name: &'static str) -> Job {
        let log = log.clone();
        Box::new(move || log.borrow_mut().push(name))
    }

    #[test]
    fn pops_in_fifo_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut queue = TaskQueue::new();

        queue.push(recorder(&log, "a"));
        queue.push(recorder(&log, "b"));
        queue.push(recorder(&log, "c"));

        while let Some(job) = queue.pop() {
            job();
        }

        assert_eq!(*log.borrow(), ["a", "b", "c"]);
    }

    #[test]
    fn next_turn_waits_for_microtasks() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut queue = TaskQueue::new();

        queue.push_next_turn(recorder(&log, "later"));
        queue.push(recorder(&log, "first"));
        queue.push(recorder(&log, "second"));

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.turn(), 0);

        while let Some(job) = queue.pop() {
            job();
        }

        assert_eq!(*log.borrow(), ["first", "second", "later"]);
        assert_eq!(queue.turn(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn empty_queue_does_not_advance_turn() {
        let mut queue = TaskQueue::new();

        assert!(queue.pop().is_none());
        assert_eq!(queue.turn(), 0);
    }
}
