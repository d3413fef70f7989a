use crate::compiler::PlannedBlock;
use crate::trace::BlockResult;
use serde_json::Value;

/// The upstream signals a block sees on each of its connected input handles.
///
/// A handle *fires* when at least one of its sources fired the source handle
/// it is wired to. The value is taken from the first firing source in
/// execution order.
pub(crate) struct ResolvedInputs<'a> {
    handles: Vec<(&'static str, Option<&'a Value>)>,
}

impl<'a> ResolvedInputs<'a> {
    /// Reads the inputs of `block` from the results recorded so far.
    /// `recorded[i]` must be the result of step `i` of the same plan.
    pub(crate) fn resolve(block: &PlannedBlock, recorded: &'a [BlockResult]) -> Self {
        let handles = block
            .inputs
            .iter()
            .map(|binding| {
                let value = binding.sources.iter().find_map(|source| {
                    recorded
                        .get(source.step)
                        .and_then(|result| result.output.get(&source.handle))
                });
                (binding.handle, value)
            })
            .collect();
        Self { handles }
    }

    pub(crate) fn fired(&self, handle: &str) -> bool {
        self.value(handle).is_some()
    }

    pub(crate) fn value(&self, handle: &str) -> Option<&'a Value> {
        self.handles
            .iter()
            .find(|(name, _)| *name == handle)
            .and_then(|(_, value)| *value)
    }

    /// `true` for blocks without any input handles, i.e. input blocks.
    pub(crate) fn is_unwired(&self) -> bool {
        self.handles.is_empty()
    }

    pub(crate) fn any_fired(&self) -> bool {
        self.handles.iter().any(|(_, value)| value.is_some())
    }

    /// Fired/silent state of every connected handle, in declaration order.
    pub(crate) fn signals(&self) -> impl Iterator<Item = bool> + '_ {
        self.handles.iter().map(|(_, value)| value.is_some())
    }

    /// Text the block should inspect: a string carried on `input`, else `fallback`.
    pub(crate) fn subject<'b>(&self, fallback: &'b str) -> &'b str
    where
        'a: 'b,
    {
        self.value("input")
            .and_then(Value::as_str)
            .unwrap_or(fallback)
    }
}
