use rustc_hash::FxHashMap;

/// Per-unit generator for synthesized identifiers.
///
/// Each prefix has its own counter, so `__tmp0` and `__scrut0` can coexist.
/// One instance is created per translation unit and threaded through every
/// phase that invents names; nothing here is global.
#[derive(Debug, Default)]
pub struct NameGen {
    counters: FxHashMap<String, u32>,
}

impl NameGen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next raw counter value for `prefix`.
    pub fn next(&mut self, prefix: &str) -> u32 {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        let value = *counter;
        *counter += 1;
        value
    }

    /// Fresh identifier of the form `__<prefix><n>`.
    pub fn fresh(&mut self, prefix: &str) -> String {
        let n = self.next(prefix);
        format!("__{prefix}{n}")
    }

    /// Value the next call to [`NameGen::next`] would return.
    pub fn peek(&self, prefix: &str) -> u32 {
        self.counters.get(prefix).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_per_prefix() {
        let mut names = NameGen::new();
        assert_eq!(names.fresh("tmp"), "__tmp0");
        assert_eq!(names.fresh("tmp"), "__tmp1");
        assert_eq!(names.fresh("scrut"), "__scrut0");
        assert_eq!(names.peek("tmp"), 2);
    }

    #[test]
    fn separate_instances_do_not_share_state() {
        let mut a = NameGen::new();
        let mut b = NameGen::new();
        a.next("marker");
        a.next("marker");
        assert_eq!(b.next("marker"), 0);
    }
}
