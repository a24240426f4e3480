//! Accumulation of streamed tool calls.

/// Argument fragments of one in-progress tool call, in arrival order.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct FragmentStore {
    fragments: Vec<String>,
}

impl FragmentStore {
    pub(crate) fn push(&mut self, fragment: impl Into<String>) {
        self.fragments.push(fragment.into());
    }

    pub(crate) fn flatten(&self) -> String {
        self.fragments.concat()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Arguments {
    Pending(FragmentStore),
    Finalized(String),
}

#[derive(Debug, Clone, PartialEq)]
struct ToolCallRecord {
    id: Option<String>,
    name: String,
    arguments: Arguments,
}

/// A closed record whose argument string is complete but not yet parsed.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FinalizedRecord {
    pub(crate) id: Option<String>,
    pub(crate) name: String,
    pub(crate) arguments: String,
}

/// Ordered tool calls seen so far in one stream.
///
/// Only the last record can be open: starting a new call closes the previous one.
#[derive(Debug, Default)]
pub(crate) struct ToolCallAccumulator {
    records: Vec<ToolCallRecord>,
}

impl ToolCallAccumulator {
    /// Close the open record, if any, and open a new one seeded with `first_fragment`.
    pub(crate) fn start(&mut self, id: Option<String>, name: String, first_fragment: String) {
        self.close_open();
        tracing::debug!(tool = %name, "decoder: tool call started");
        let mut store = FragmentStore::default();
        store.push(first_fragment);
        self.records.push(ToolCallRecord {
            id,
            name,
            arguments: Arguments::Pending(store),
        });
    }

    /// Append a fragment to the open record. Returns `false` if none is open.
    pub(crate) fn append(&mut self, fragment: String) -> bool {
        match self.records.last_mut() {
            Some(ToolCallRecord {
                arguments: Arguments::Pending(store),
                ..
            }) => {
                store.push(fragment);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn has_open(&self) -> bool {
        matches!(
            self.records.last(),
            Some(ToolCallRecord {
                arguments: Arguments::Pending(_),
                ..
            })
        )
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    fn close_open(&mut self) {
        if let Some(record) = self.records.last_mut()
            && let Arguments::Pending(store) = &record.arguments
        {
            record.arguments = Arguments::Finalized(store.flatten());
        }
    }

    /// Close the open record and hand out every record in arrival order.
    pub(crate) fn finish(&mut self) -> Vec<FinalizedRecord> {
        self.close_open();
        std::mem::take(&mut self.records)
            .into_iter()
            .map(|record| FinalizedRecord {
                id: record.id,
                name: record.name,
                arguments: match record.arguments {
                    Arguments::Finalized(arguments) => arguments,
                    Arguments::Pending(store) => store.flatten(),
                },
            })
            .collect()
    }
}
