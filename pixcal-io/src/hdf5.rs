//! HDF5 record store.
//!
//! Each hit dataset is a group holding one extendable column per record
//! field (`id`, `x`, `y`, `z`, `t_drift`, `ts_pps`, `Q`, `E`), each with a
//! `units` attribute. Reference tables live at `{parent}/ref/{child}` as
//! paired `parent`/`child` index columns. Dataset attributes are written on
//! the dataset group.

use crate::{Error, Result};
use hdf5::types::{H5Type, VarLenUnicode};
use hdf5::{Dataset, File, Group};
use ndarray::{s, ArrayView1};
use pixcal_core::hit::CALIB_HIT_FIELDS;
use pixcal_core::{AttrValue, CalibHit, Edge, RecordStore};
use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;
use std::str::FromStr;

/// Options for HDF5 output datasets.
#[derive(Clone, Debug)]
pub struct Hdf5WriteOptions {
    /// Rows per HDF5 chunk.
    pub chunk_rows: usize,
    /// Deflate level, if any.
    pub compression: Option<u8>,
    /// Enable the shuffle filter.
    pub shuffle: bool,
}

impl Default for Hdf5WriteOptions {
    fn default() -> Self {
        Self {
            chunk_rows: 10_000,
            compression: Some(1),
            shuffle: true,
        }
    }
}

struct HitColumns {
    group: Group,
    id: Dataset,
    x: Dataset,
    y: Dataset,
    z: Dataset,
    t_drift: Dataset,
    ts_pps: Dataset,
    q: Dataset,
    e: Dataset,
    reserved: usize,
}

impl HitColumns {
    fn create(group: Group, options: &Hdf5WriteOptions) -> Result<Self> {
        let f64_column = |name: &str| create_extendable_dataset::<f64>(&group, name, options);
        let id = create_extendable_dataset::<u32>(&group, "id", options)?;
        let x = f64_column("x")?;
        let y = f64_column("y")?;
        let z = f64_column("z")?;
        let t_drift = f64_column("t_drift")?;
        let ts_pps = create_extendable_dataset::<u64>(&group, "ts_pps", options)?;
        let q = f64_column("Q")?;
        let e = f64_column("E")?;

        let columns = Self {
            group,
            id,
            x,
            y,
            z,
            t_drift,
            ts_pps,
            q,
            e,
            reserved: 0,
        };
        for (dataset, (_, units)) in columns.all().into_iter().zip(CALIB_HIT_FIELDS) {
            set_dataset_units(dataset, units)?;
        }
        Ok(columns)
    }

    fn all(&self) -> [&Dataset; 8] {
        [
            &self.id,
            &self.x,
            &self.y,
            &self.z,
            &self.t_drift,
            &self.ts_pps,
            &self.q,
            &self.e,
        ]
    }

    fn write(&self, start: usize, hits: &[CalibHit]) -> Result<()> {
        let f64_column = |f: fn(&CalibHit) -> f64| hits.iter().map(f).collect::<Vec<f64>>();
        write_at(&self.id, start, &hits.iter().map(|h| h.id).collect::<Vec<_>>())?;
        write_at(&self.x, start, &f64_column(|h| h.x))?;
        write_at(&self.y, start, &f64_column(|h| h.y))?;
        write_at(&self.z, start, &f64_column(|h| h.z))?;
        write_at(&self.t_drift, start, &f64_column(|h| h.t_drift))?;
        write_at(&self.ts_pps, start, &hits.iter().map(|h| h.ts_pps).collect::<Vec<_>>())?;
        write_at(&self.q, start, &f64_column(|h| h.q))?;
        write_at(&self.e, start, &f64_column(|h| h.e))?;
        Ok(())
    }
}

struct RefColumns {
    parent: Dataset,
    child: Dataset,
    len: usize,
}

/// [`RecordStore`] writing to an HDF5 file.
pub struct Hdf5Store {
    file: File,
    options: Hdf5WriteOptions,
    datasets: HashMap<String, HitColumns>,
    refs: HashMap<(String, String), RefColumns>,
}

impl Hdf5Store {
    /// Creates (truncating) an HDF5 file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, options: Hdf5WriteOptions) -> Result<Self> {
        let file = File::create(path)?;
        set_attr_str(&file, "pixcal_format_version", "1.0")?;
        Ok(Self {
            file,
            options,
            datasets: HashMap::new(),
            refs: HashMap::new(),
        })
    }

    /// Flushes buffered data to disk.
    ///
    /// # Errors
    /// Returns an error if HDF5 I/O fails.
    pub fn flush(&self) -> Result<()> {
        Ok(self.file.flush()?)
    }

    fn columns(&mut self, dataset: &str) -> Result<&mut HitColumns> {
        self.datasets
            .get_mut(dataset)
            .ok_or_else(|| Error::InvalidFormat(format!("unknown dataset {dataset}")))
    }

    fn create_hit_dataset(&mut self, dataset: &str) -> Result<()> {
        if self.datasets.contains_key(dataset) {
            return Err(Error::InvalidFormat(format!(
                "dataset {dataset} already exists"
            )));
        }
        let group = ensure_group(&self.file, dataset)?;
        let columns = HitColumns::create(group, &self.options)?;
        self.datasets.insert(dataset.to_string(), columns);
        Ok(())
    }

    fn create_ref_table(&mut self, parent: &str, child: &str) -> Result<()> {
        let key = (parent.to_string(), child.to_string());
        if self.refs.contains_key(&key) {
            return Ok(());
        }
        let group = ensure_group(&self.file, &format!("{parent}/ref/{child}"))?;
        let columns = RefColumns {
            parent: create_extendable_dataset::<u64>(&group, "parent", &self.options)?,
            child: create_extendable_dataset::<u64>(&group, "child", &self.options)?,
            len: 0,
        };
        set_attr_str(&group, "parent_dset", parent)?;
        set_attr_str(&group, "child_dset", child)?;
        self.refs.insert(key, columns);
        Ok(())
    }

    fn reserve_rows(&mut self, dataset: &str, count: usize) -> Result<Range<u64>> {
        let columns = self.columns(dataset)?;
        let start = columns.reserved;
        let end = start + count;
        if count > 0 {
            for column in columns.all() {
                column.resize((end,))?;
            }
        }
        columns.reserved = end;
        Ok(start as u64..end as u64)
    }

    fn write_rows(&mut self, dataset: &str, slice: Range<u64>, hits: &[CalibHit]) -> Result<()> {
        let columns = self.columns(dataset)?;
        let to_index = |id: u64| {
            usize::try_from(id).map_err(|_| Error::CoreError(pixcal_core::Error::IdOverflow(id)))
        };
        let (start, end) = (to_index(slice.start)?, to_index(slice.end)?);
        if start > end || end > columns.reserved || end - start != hits.len() {
            return Err(Error::InvalidFormat(format!(
                "cannot write {} hits to {dataset}[{start}..{end}] (reserved {})",
                hits.len(),
                columns.reserved
            )));
        }
        columns.write(start, hits)
    }

    fn append_edges(&mut self, parent: &str, child: &str, edges: &[Edge]) -> Result<()> {
        let table = self
            .refs
            .get_mut(&(parent.to_string(), child.to_string()))
            .ok_or_else(|| Error::InvalidFormat(format!("no reference table {parent} -> {child}")))?;
        if edges.is_empty() {
            return Ok(());
        }
        let parents: Vec<u64> = edges.iter().map(|e| e.parent).collect();
        let children: Vec<u64> = edges.iter().map(|e| e.child).collect();
        append_slice(&table.parent, table.len, &parents)?;
        append_slice(&table.child, table.len, &children)?;
        table.len += edges.len();
        Ok(())
    }

    fn write_attrs(&mut self, dataset: &str, attrs: &[(&str, AttrValue)]) -> Result<()> {
        let group = &self.columns(dataset)?.group;
        for (name, value) in attrs {
            match value {
                AttrValue::Str(v) => set_attr_str(group, name, v)?,
                AttrValue::Int(v) => set_attr_scalar(group, name, v)?,
                AttrValue::Float(v) => set_attr_scalar(group, name, v)?,
                AttrValue::Bool(v) => set_attr_scalar(group, name, v)?,
            }
        }
        Ok(())
    }
}

impl RecordStore for Hdf5Store {
    fn create_dataset(&mut self, dataset: &str) -> pixcal_core::Result<()> {
        Ok(self.create_hit_dataset(dataset)?)
    }

    fn create_ref(&mut self, parent: &str, child: &str) -> pixcal_core::Result<()> {
        Ok(self.create_ref_table(parent, child)?)
    }

    fn reserve(&mut self, dataset: &str, count: usize) -> pixcal_core::Result<Range<u64>> {
        Ok(self.reserve_rows(dataset, count)?)
    }

    fn write_hits(
        &mut self,
        dataset: &str,
        slice: Range<u64>,
        hits: &[CalibHit],
    ) -> pixcal_core::Result<()> {
        Ok(self.write_rows(dataset, slice, hits)?)
    }

    fn write_ref(&mut self, parent: &str, child: &str, edges: &[Edge]) -> pixcal_core::Result<()> {
        Ok(self.append_edges(parent, child, edges)?)
    }

    fn set_attrs(&mut self, dataset: &str, attrs: &[(&str, AttrValue)]) -> pixcal_core::Result<()> {
        Ok(self.write_attrs(dataset, attrs)?)
    }
}

/// Reads a hit dataset written by [`Hdf5Store`].
///
/// # Errors
/// Returns an error if HDF5 I/O fails or the columns differ in length.
pub fn read_hits_hdf5<P: AsRef<Path>>(path: P, dataset: &str) -> Result<Vec<CalibHit>> {
    let file = File::open(path)?;
    let group = file.group(dataset)?;

    let id = read_dataset_vec::<u32>(&group, "id")?;
    let x = read_dataset_vec::<f64>(&group, "x")?;
    let y = read_dataset_vec::<f64>(&group, "y")?;
    let z = read_dataset_vec::<f64>(&group, "z")?;
    let t_drift = read_dataset_vec::<f64>(&group, "t_drift")?;
    let ts_pps = read_dataset_vec::<u64>(&group, "ts_pps")?;
    let q = read_dataset_vec::<f64>(&group, "Q")?;
    let e = read_dataset_vec::<f64>(&group, "E")?;

    let n = id.len();
    let lens = [x.len(), y.len(), z.len(), t_drift.len(), ts_pps.len(), q.len(), e.len()];
    if lens.iter().any(|&len| len != n) {
        return Err(Error::InvalidFormat(format!(
            "column length mismatch in {dataset}"
        )));
    }

    Ok((0..n)
        .map(|i| CalibHit {
            id: id[i],
            x: x[i],
            y: y[i],
            z: z[i],
            t_drift: t_drift[i],
            ts_pps: ts_pps[i],
            q: q[i],
            e: e[i],
        })
        .collect())
}

/// Reads the reference table `parent -> child` written by [`Hdf5Store`].
///
/// # Errors
/// Returns an error if HDF5 I/O fails or the table is malformed.
pub fn read_refs_hdf5<P: AsRef<Path>>(path: P, parent: &str, child: &str) -> Result<Vec<Edge>> {
    let file = File::open(path)?;
    let group = file.group(&format!("{parent}/ref/{child}"))?;
    let parents = read_dataset_vec::<u64>(&group, "parent")?;
    let children = read_dataset_vec::<u64>(&group, "child")?;
    if parents.len() != children.len() {
        return Err(Error::InvalidFormat(format!(
            "reference table {parent} -> {child} has unpaired columns"
        )));
    }
    Ok(parents
        .into_iter()
        .zip(children)
        .map(Edge::from)
        .collect())
}

/// Reads a string attribute from a dataset group.
///
/// # Errors
/// Returns an error if the file or group cannot be opened.
pub fn read_attr_string<P: AsRef<Path>>(
    path: P,
    dataset: &str,
    name: &str,
) -> Result<Option<String>> {
    let file = File::open(path)?;
    let group = file.group(dataset)?;
    match group.attr(name) {
        Ok(attr) => {
            let value: VarLenUnicode = attr.read_scalar()?;
            Ok(Some(value.to_string()))
        }
        Err(_) => Ok(None),
    }
}

fn ensure_group(root: &Group, path: &str) -> Result<Group> {
    let mut group = root.group("/")?;
    for part in path.split('/').filter(|p| !p.is_empty()) {
        group = match group.group(part) {
            Ok(existing) => existing,
            Err(_) => group.create_group(part)?,
        };
    }
    Ok(group)
}

fn create_extendable_dataset<T: H5Type>(
    group: &Group,
    name: &str,
    options: &Hdf5WriteOptions,
) -> Result<Dataset> {
    let mut builder = group
        .new_dataset::<T>()
        .shape((0..,))
        .chunk((options.chunk_rows.max(1),));

    if let Some(level) = options.compression {
        builder = builder.deflate(level);
    }

    if options.shuffle {
        builder = builder.shuffle();
    }

    Ok(builder.create(name)?)
}

fn write_at<T: H5Type>(dataset: &Dataset, offset: usize, data: &[T]) -> Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    let end = offset + data.len();
    let view = ArrayView1::from(data);
    dataset.write_slice(view, s![offset..end])?;
    Ok(())
}

fn append_slice<T: H5Type>(dataset: &Dataset, offset: usize, data: &[T]) -> Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    dataset.resize((offset + data.len(),))?;
    write_at(dataset, offset, data)
}

fn read_dataset_vec<T: H5Type>(group: &Group, name: &str) -> Result<Vec<T>> {
    let dataset = group.dataset(name)?;
    Ok(dataset.read_raw::<T>()?)
}

fn set_dataset_units(dataset: &Dataset, units: &str) -> Result<()> {
    let value = to_var_len_unicode(units)?;
    dataset
        .new_attr::<VarLenUnicode>()
        .create("units")?
        .write_scalar(&value)?;
    Ok(())
}

fn set_attr_str(group: &Group, name: &str, value: &str) -> Result<()> {
    let value = to_var_len_unicode(value)?;
    group
        .new_attr::<VarLenUnicode>()
        .create(name)?
        .write_scalar(&value)?;
    Ok(())
}

fn set_attr_scalar<T: H5Type>(group: &Group, name: &str, value: &T) -> Result<()> {
    group.new_attr::<T>().create(name)?.write_scalar(value)?;
    Ok(())
}

fn to_var_len_unicode(value: &str) -> Result<VarLenUnicode> {
    VarLenUnicode::from_str(value)
        .map_err(|e| Error::InvalidFormat(format!("invalid utf-8 attribute: {e}")))
}
