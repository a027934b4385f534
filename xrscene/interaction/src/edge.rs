/// Rising edge detector. The first observation only sets the baseline and never fires.
#[derive(Clone, Debug, Default)]
pub struct EdgeDetector {
    last_state: Option<bool>,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, state: bool) -> bool {
        let fired = state && self.last_state == Some(false);
        self.last_state = Some(state);

        fired
    }

    pub fn last_state(&self) -> Option<bool> {
        self.last_state
    }

    pub fn reset(&mut self) {
        self.last_state = None;
    }
}

/// Samples a predicate once per update and invokes the callback on each false to true transition.
pub struct StateChangeDetector<S, C> {
    get_state: S,
    callback: C,
    edge: EdgeDetector,
}

impl<S, C: FnMut()> StateChangeDetector<S, C> {
    pub fn new(get_state: S, callback: C) -> Self {
        Self {
            get_state,
            callback,
            edge: EdgeDetector::new(),
        }
    }

    /// Returns true when the callback was invoked.
    pub fn update<T>(&mut self, sample: T) -> bool
    where
        S: FnMut(T) -> bool,
    {
        let state = (self.get_state)(sample);
        let fired = self.edge.observe(state);
        if fired {
            (self.callback)();
        }

        fired
    }

    pub fn last_state(&self) -> Option<bool> {
        self.edge.last_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[test]
    fn fires_on_rising_edges_only() {
        let inputs = [false, false, true, true, false, true];
        let fired_at = RefCell::new(vec![]);
        let current = Cell::new(0);

        let mut detector = StateChangeDetector::new(
            |index: usize| inputs[index],
            || fired_at.borrow_mut().push(current.get()),
        );

        for index in 0..inputs.len() {
            current.set(index);
            detector.update(index);
        }

        assert_eq!(*fired_at.borrow(), [2, 5]);
    }

    #[test]
    fn first_true_observation_does_not_fire() {
        let mut edge = EdgeDetector::new();

        assert!(!edge.observe(true));
        assert!(!edge.observe(true));
        assert!(!edge.observe(false));
        assert!(edge.observe(true));
    }

    #[test]
    fn reset_clears_the_baseline() {
        let mut edge = EdgeDetector::new();
        edge.observe(false);
        edge.reset();

        assert_eq!(edge.last_state(), None);
        assert!(!edge.observe(true));
    }

    #[test]
    fn update_returns_fired_flag() {
        let mut count = 0;
        let mut detector = StateChangeDetector::new(|state: bool| state, || count += 1);

        let fired = [false, true, false, true, true]
            .into_iter()
            .map(|state| detector.update(state))
            .collect::<Vec<_>>();

        drop(detector);
        assert_eq!(fired, [false, true, false, true, false]);
        assert_eq!(count, 2);
    }
}
