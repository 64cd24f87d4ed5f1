//! In-memory record store.

use pixcal_core::{AttrValue, CalibHit, Edge, Error, RecordStore, Result};
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

#[derive(Debug, Default)]
struct HitTable {
    records: Vec<CalibHit>,
    written: Vec<bool>,
    attrs: BTreeMap<String, AttrValue>,
}

/// [`RecordStore`] backed by plain vectors.
///
/// Reserved slots hold default records until written. Useful for tests and
/// for inspecting results before committing them to a file.
#[derive(Debug, Default)]
pub struct MemoryStore {
    datasets: HashMap<String, HitTable>,
    refs: HashMap<(String, String), Vec<Edge>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records of a dataset, including reserved but unwritten slots.
    #[must_use]
    pub fn hits(&self, dataset: &str) -> Option<&[CalibHit]> {
        self.datasets.get(dataset).map(|t| t.records.as_slice())
    }

    /// Number of reserved slots in a dataset.
    #[must_use]
    pub fn len(&self, dataset: &str) -> usize {
        self.datasets.get(dataset).map_or(0, |t| t.records.len())
    }

    /// Returns true if every reserved slot of the dataset has been written.
    #[must_use]
    pub fn is_complete(&self, dataset: &str) -> bool {
        self.datasets
            .get(dataset)
            .is_some_and(|t| t.written.iter().all(|&w| w))
    }

    /// Edges of the reference table `parent -> child`.
    #[must_use]
    pub fn refs(&self, parent: &str, child: &str) -> Option<&[Edge]> {
        self.refs
            .get(&(parent.to_string(), child.to_string()))
            .map(Vec::as_slice)
    }

    /// Returns true if the reference table `parent -> child` exists.
    #[must_use]
    pub fn has_ref(&self, parent: &str, child: &str) -> bool {
        self.refs
            .contains_key(&(parent.to_string(), child.to_string()))
    }

    /// All attributes of a dataset.
    #[must_use]
    pub fn attrs(&self, dataset: &str) -> Option<&BTreeMap<String, AttrValue>> {
        self.datasets.get(dataset).map(|t| &t.attrs)
    }

    /// A single attribute of a dataset.
    #[must_use]
    pub fn attr(&self, dataset: &str, name: &str) -> Option<&AttrValue> {
        self.datasets.get(dataset).and_then(|t| t.attrs.get(name))
    }

    /// Dataset names, sorted.
    #[must_use]
    pub fn datasets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.datasets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn table_mut(&mut self, dataset: &str) -> Result<&mut HitTable> {
        self.datasets
            .get_mut(dataset)
            .ok_or_else(|| Error::Store(format!("unknown dataset {dataset}")))
    }
}

impl RecordStore for MemoryStore {
    fn create_dataset(&mut self, dataset: &str) -> Result<()> {
        if self.datasets.contains_key(dataset) {
            return Err(Error::Store(format!("dataset {dataset} already exists")));
        }
        self.datasets.insert(dataset.to_string(), HitTable::default());
        Ok(())
    }

    fn create_ref(&mut self, parent: &str, child: &str) -> Result<()> {
        self.refs
            .entry((parent.to_string(), child.to_string()))
            .or_default();
        Ok(())
    }

    fn reserve(&mut self, dataset: &str, count: usize) -> Result<Range<u64>> {
        let table = self.table_mut(dataset)?;
        let start = table.records.len();
        let end = start + count;
        table.records.resize(end, CalibHit::default());
        table.written.resize(end, false);
        Ok(start as u64..end as u64)
    }

    fn write_hits(&mut self, dataset: &str, slice: Range<u64>, hits: &[CalibHit]) -> Result<()> {
        let table = self.table_mut(dataset)?;
        let to_index =
            |id: u64| usize::try_from(id).map_err(|_| Error::IdOverflow(id));
        let (start, end) = (to_index(slice.start)?, to_index(slice.end)?);
        if start > end || end > table.records.len() {
            return Err(Error::Store(format!(
                "slice {start}..{end} outside reserved range of {dataset} (len {})",
                table.records.len()
            )));
        }
        if end - start != hits.len() {
            return Err(Error::Store(format!(
                "slice {start}..{end} does not fit {} hits",
                hits.len()
            )));
        }
        table.records[start..end].copy_from_slice(hits);
        table.written[start..end].fill(true);
        Ok(())
    }

    fn write_ref(&mut self, parent: &str, child: &str, edges: &[Edge]) -> Result<()> {
        let table = self
            .refs
            .get_mut(&(parent.to_string(), child.to_string()))
            .ok_or_else(|| Error::Store(format!("no reference table {parent} -> {child}")))?;
        table.extend_from_slice(edges);
        Ok(())
    }

    fn set_attrs(&mut self, dataset: &str, attrs: &[(&str, AttrValue)]) -> Result<()> {
        let table = self.table_mut(dataset)?;
        for (name, value) in attrs {
            table.attrs.insert((*name).to_string(), value.clone());
        }
        Ok(())
    }
}
