/// Dirty bit of one sync phase. Set on every mutation that affects the phase, consumed when the phase runs, so
/// any number of writes between two ticks result in a single sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DirtyFlag {
    dirty: bool,
}

impl DirtyFlag {
    pub(crate) fn clean() -> Self {
        Self { dirty: false }
    }

    pub(crate) fn mark(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn mark_if(&mut self, condition: bool) {
        self.dirty |= condition;
    }

    /// Returns true if the flag was set, and clears it.
    pub(crate) fn take(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    #[cfg(test)]
    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Event that can happen only once in the lifetime of its owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct OneShot {
    happened: bool,
}

impl OneShot {
    /// Returns true on the first call only.
    pub(crate) fn fire(&mut self) -> bool {
        !std::mem::replace(&mut self.happened, true)
    }

    pub(crate) fn happened(&self) -> bool {
        self.happened
    }
}
