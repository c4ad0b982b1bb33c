//! A replaceable implementation of one VM trait method, which counts its calls.

pub type MockClosure<I, R> = Box<dyn Fn(I) -> R + Send + Sync>;

enum Behavior<I, R> {
    /// Every call runs the same closure.
    Fixed(MockClosure<I, R>),
    /// Call `n` runs closure `n % len`.
    Sequence(Vec<MockClosure<I, R>>),
}

/// `I` is the argument tuple of the mocked method, `R` its return type.
pub struct MockMethod<I, R> {
    behavior: Behavior<I, R>,
    calls: usize,
}

impl<I, R> Default for MockMethod<I, R> {
    fn default() -> Self {
        Self::new_unimplemented()
    }
}

impl<I, R> MockMethod<I, R> {
    /// Panics when called.
    pub fn new_unimplemented() -> Self {
        Self::new_fixed(Box::new(|_| unimplemented!("This mock method has no behavior")))
    }

    /// Returns `R::default()`.
    pub fn new_default() -> Self
    where
        R: Default,
    {
        Self::new_fixed(Box::new(|_| R::default()))
    }

    pub fn new_fixed(closure: MockClosure<I, R>) -> Self {
        MockMethod {
            behavior: Behavior::Fixed(closure),
            calls: 0,
        }
    }

    /// Cycle through `closures`, one per call.
    pub fn new_sequence(closures: Vec<MockClosure<I, R>>) -> Self {
        assert!(!closures.is_empty(), "A mock sequence needs a closure");
        MockMethod {
            behavior: Behavior::Sequence(closures),
            calls: 0,
        }
    }

    pub fn call(&mut self, args: I) -> R {
        let n = self.calls;
        self.calls += 1;
        match &self.behavior {
            Behavior::Fixed(closure) => closure(args),
            Behavior::Sequence(closures) => closures[n % closures.len()](args),
        }
    }

    pub fn is_called(&self) -> bool {
        self.calls > 0
    }

    pub fn call_count(&self) -> usize {
        self.calls
    }
}
