// File: crates/chart-data/src/dimensions.rs
// Summary: Resolves which data dimension feeds which coordinate/visual role, with names and types.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use tracing::debug;

use crate::ordinal::OrdinalRegistry;
use crate::schema::{DimensionLayout, SeriesDataSchema};
use crate::source::{BeOrdinal, DimensionRef, EncodeDefine, Source, SourceDimension};
use crate::types::{DimensionType, VisualDimension, OMIT_DIMENSION_THRESHOLD};

/// A visual role slot: `Some(i)` is position `i` within the role, `None` opts the
/// dimension out of the role (`tooltip: false`).
pub type VisualSlot = Option<usize>;

/// One resolved series dimension.
#[derive(Clone, Debug, Default)]
pub struct SeriesDimensionDefine {
    pub name: Option<String>,
    pub display_name: Option<String>,
    /// `None` until declared or inferred; reads as float.
    pub dim_type: Option<DimensionType>,
    pub coord_dim: Option<String>,
    pub coord_dim_index: Option<usize>,
    /// Column of the backing store.
    pub store_dim_index: usize,
    pub other_dims: BTreeMap<VisualDimension, VisualSlot>,
    pub ordinal_meta: Option<Rc<OrdinalRegistry>>,
    /// Carried along without being required by the coordinate system.
    pub is_extra_coord: bool,
    /// Synthesized by stacking; never backed by user data.
    pub is_calculation_coord: bool,
    pub default_tooltip: Option<bool>,
}

impl SeriesDimensionDefine {
    pub fn resolved_type(&self) -> DimensionType {
        self.dim_type.unwrap_or_default()
    }

    pub fn is_ordinal(&self) -> bool {
        self.dim_type == Some(DimensionType::Ordinal)
    }

    fn apply_role(&mut self, role: &str, index: usize, coord_names: &mut HashSet<String>) {
        match VisualDimension::from_name(role) {
            Some(visual) => {
                self.other_dims.insert(visual, Some(index));
            }
            None => {
                self.coord_dim = Some(role.to_string());
                self.coord_dim_index = Some(index);
                coord_names.insert(role.to_string());
            }
        }
    }

    /// Fill unset fields from a coordinate requirement.
    fn take_defaults(&mut self, coord: &CoordDimension) {
        if self.dim_type.is_none() {
            self.dim_type = coord.dim_type;
        }
        if self.ordinal_meta.is_none() {
            self.ordinal_meta = coord.ordinal_meta.clone();
        }
    }
}

/// A named sub-dimension of a coordinate, e.g. the four values of a candlestick.
#[derive(Clone, Debug, PartialEq)]
pub struct CoordSubDimension {
    pub name: String,
    pub default_tooltip: Option<bool>,
}

impl From<&str> for CoordSubDimension {
    fn from(name: &str) -> Self {
        Self { name: name.to_string(), default_tooltip: None }
    }
}

/// A dimension the coordinate system requires (`x`, `y`, `radius`, ...).
#[derive(Clone, Debug, Default)]
pub struct CoordDimension {
    pub name: String,
    pub dim_type: Option<DimensionType>,
    /// Visual roles every data dimension mapped here also takes, unless already set.
    pub other_dims: BTreeMap<VisualDimension, VisualSlot>,
    /// Arity of the coordinate; one data dimension when absent.
    pub dims_def: Option<Vec<CoordSubDimension>>,
    pub ordinal_meta: Option<Rc<OrdinalRegistry>>,
}

impl CoordDimension {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn with_type(mut self, dim_type: DimensionType) -> Self {
        self.dim_type = Some(dim_type);
        self
    }

    pub fn with_other_dim(mut self, visual: VisualDimension, slot: VisualSlot) -> Self {
        self.other_dims.insert(visual, slot);
        self
    }

    pub fn with_dims_def<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<CoordSubDimension>,
    {
        self.dims_def = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_ordinal_meta(mut self, meta: Rc<OrdinalRegistry>) -> Self {
        self.ordinal_meta = Some(meta);
        self
    }

    fn arity(&self) -> usize {
        self.dims_def.as_ref().map_or(1, |d| d.len().max(1))
    }
}

impl From<&str> for CoordDimension {
    fn from(name: &str) -> Self {
        CoordDimension::new(name)
    }
}

/// Produces an encode when the caller gives none; receives the source and dimension count.
pub type EncodeDefaulter = Rc<dyn Fn(&Source, usize) -> EncodeDefine>;

#[derive(Clone, Default)]
pub struct SchemaOptions {
    pub coord_dimensions: Vec<CoordDimension>,
    /// User dimensions; the source's own definitions when absent.
    pub dimensions_define: Option<Vec<SourceDimension>>,
    /// Encode; falls back to the source encode, then to `encode_defaulter`.
    pub encode_define: Option<EncodeDefine>,
    pub encode_defaulter: Option<EncodeDefaulter>,
    pub dimensions_count: Option<usize>,
    /// Allow skipping unreferenced dimensions of wide sources.
    pub can_omit_unused_dimensions: bool,
    /// Coordinate name for unassigned dimensions instead of `value`.
    pub generate_coord: Option<String>,
    pub generate_coord_count: Option<usize>,
}

impl SchemaOptions {
    pub fn with_coords<I, C>(coords: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CoordDimension>,
    {
        Self { coord_dimensions: coords.into_iter().map(Into::into).collect(), ..Default::default() }
    }
}

/// Encode entry after resolving names against the dimension list.
enum EncodeSlot {
    /// A single negative index: the coordinate is deliberately left unmapped.
    Disabled,
    /// `(position within coordinate, data dimension)`; empty means auto-assign.
    Dims(Vec<(usize, usize)>),
}

struct Builder<'a> {
    dims_def: &'a [SourceDimension],
    name_to_index: &'a HashMap<String, usize>,
    slots: Vec<Option<usize>>,
    result: Vec<SeriesDimensionDefine>,
    /// Declared names repeated on a later dimension, keyed by store column.
    duplicate_names: HashMap<usize, String>,
}

impl Builder<'_> {
    fn item(&mut self, dim: usize) -> &mut SeriesDimensionDefine {
        if let Some(idx) = self.slots[dim] {
            return &mut self.result[idx];
        }
        let mut item = SeriesDimensionDefine { store_dim_index: dim, ..Default::default() };
        let dims_def = self.dims_def;
        if let Some(def) = dims_def.get(dim) {
            if let Some(name) = &def.name {
                item.display_name = Some(name.clone());
                if self.name_to_index.get(name) == Some(&dim) {
                    item.name = Some(name.clone());
                } else {
                    // Repeated names are suffixed once every other name is known.
                    self.duplicate_names.insert(dim, name.clone());
                }
            }
            if def.dim_type.is_some() {
                item.dim_type = def.dim_type;
            }
            if def.display_name.is_some() {
                item.display_name = def.display_name.clone();
            }
        }
        self.slots[dim] = Some(self.result.len());
        self.result.push(item);
        let last = self.result.len() - 1;
        &mut self.result[last]
    }

    fn has_coord(&self, dim: usize) -> bool {
        self.slots[dim].is_some_and(|idx| self.result[idx].coord_dim.is_some())
    }
}

/// Resolve the dimensions of a series over `source`.
pub fn prepare_series_data_schema(source: &Source, options: SchemaOptions) -> SeriesDataSchema {
    let header = &source.header;
    let coords = &options.coord_dimensions;
    let using_source_dims = options.dimensions_define.is_none();
    let dims_def: &[SourceDimension] = match &options.dimensions_define {
        Some(dims) => dims,
        None => header.dimensions_define.as_deref().unwrap_or(&[]),
    };
    let dim_count = dimension_count(source, coords, dims_def, options.dimensions_count);
    let omit = options.can_omit_unused_dimensions && dim_count > OMIT_DIMENSION_THRESHOLD;

    let mut name_to_index: HashMap<String, usize> = HashMap::new();
    for (i, def) in dims_def.iter().enumerate() {
        if let Some(name) = &def.name {
            name_to_index.entry(name.clone()).or_insert(i);
        }
    }

    let encode = options
        .encode_define
        .clone()
        .or_else(|| header.encode_define.clone())
        .or_else(|| options.encode_defaulter.as_ref().map(|f| f(source, dim_count)));

    let mut b = Builder {
        dims_def,
        name_to_index: &name_to_index,
        slots: vec![None; dim_count],
        result: Vec::new(),
        duplicate_names: HashMap::new(),
    };
    if !omit {
        for i in 0..dim_count {
            b.item(i);
        }
    }

    let mut coord_names: HashSet<String> = HashSet::new();
    let mut encode_map: HashMap<String, EncodeSlot> = HashMap::new();
    for (role, refs) in encode.iter().flat_map(|e| e.entries.iter()) {
        if let [DimensionRef::Index(i)] = refs.as_slice() {
            if *i < 0 {
                encode_map.insert(role.clone(), EncodeSlot::Disabled);
                continue;
            }
        }
        let mut valid = Vec::new();
        for (pos, dim_ref) in refs.iter().enumerate() {
            let dim = match dim_ref {
                DimensionRef::Index(i) => usize::try_from(*i).ok(),
                DimensionRef::Name(name) => name_to_index.get(name).copied(),
            };
            if let Some(dim) = dim.filter(|d| *d < dim_count) {
                valid.push((pos, dim));
                b.item(dim).apply_role(role, pos, &mut coord_names);
            }
        }
        encode_map.insert(role.clone(), EncodeSlot::Dims(valid));
    }

    let mut avail = 0;
    for coord in coords {
        let mut dims = match encode_map.get(&coord.name) {
            Some(EncodeSlot::Disabled) => continue,
            Some(EncodeSlot::Dims(dims)) => dims.clone(),
            None => Vec::new(),
        };
        if dims.is_empty() {
            for pos in 0..coord.arity() {
                while avail < dim_count && b.has_coord(avail) {
                    avail += 1;
                }
                if avail < dim_count {
                    dims.push((pos, avail));
                    avail += 1;
                }
            }
        }
        for (pos, dim) in dims {
            let item = b.item(dim);
            // The coordinate system's type wins over a type read from the source itself.
            if using_source_dims && coord.dim_type.is_some() {
                item.dim_type = coord.dim_type;
            }
            item.take_defaults(coord);
            item.apply_role(&coord.name, pos, &mut coord_names);
            if item.name.is_none() {
                if let Some(sub) = coord.dims_def.as_ref().and_then(|d| d.get(pos)) {
                    item.name = Some(sub.name.clone());
                    item.display_name = Some(sub.name.clone());
                    item.default_tooltip = sub.default_tooltip;
                }
            }
            for (visual, slot) in &coord.other_dims {
                item.other_dims.entry(*visual).or_insert(*slot);
            }
        }
    }

    let mut dimensions = b.result;
    let mut taken_names: HashSet<String> = name_to_index.keys().cloned().collect();
    for item in &mut dimensions {
        if item.name.is_none() {
            if let Some(base) = b.duplicate_names.get(&item.store_dim_index) {
                item.name = Some(gen_name(base, &mut taken_names, false));
            }
        }
    }

    if omit {
        for item in &mut dimensions {
            if item.name.is_none() {
                item.name = item.coord_dim.as_deref().map(|c| gen_name(c, &mut taken_names, false));
            }
        }
        dimensions.sort_by_key(|d| d.store_dim_index);
    } else {
        let extra = options.generate_coord.as_deref().unwrap_or("value");
        let from_zero = options.generate_coord_count.is_some();
        let mut generate_left: i64 = match options.generate_coord {
            Some(_) => options.generate_coord_count.unwrap_or(1) as i64,
            None => 0,
        };
        for item in &mut dimensions {
            if item.coord_dim.is_none() {
                item.coord_dim = Some(gen_name(extra, &mut coord_names, from_zero));
                item.coord_dim_index = Some(0);
                if options.generate_coord.is_none() || generate_left <= 0 {
                    item.is_extra_coord = true;
                }
                generate_left -= 1;
            }
            if item.name.is_none() {
                item.name = item.coord_dim.as_deref().map(|c| gen_name(c, &mut taken_names, false));
            }
            let labels_item = item.other_dims.get(&VisualDimension::ItemName).is_some_and(Option::is_some)
                || item.other_dims.get(&VisualDimension::SeriesName).is_some_and(Option::is_some);
            if item.dim_type.is_none()
                && (source.guess_ordinal(item.store_dim_index) == BeOrdinal::Must
                    || (item.is_extra_coord && labels_item))
            {
                item.dim_type = Some(DimensionType::Ordinal);
            }
        }
    }

    debug!(dim_count, resolved = dimensions.len(), omitted = omit, "series dimensions resolved");
    let layout = if omit { DimensionLayout::Omitted } else { DimensionLayout::Full };
    SeriesDataSchema::new(source.header.clone(), dimensions, dim_count, layout)
}

/// `prepare_series_data_schema` returning only the dimension list.
pub fn create_dimensions(source: &Source, options: SchemaOptions) -> Vec<SeriesDimensionDefine> {
    prepare_series_data_schema(source, options).dimensions
}

fn dimension_count(
    source: &Source,
    coords: &[CoordDimension],
    dims_def: &[SourceDimension],
    override_count: Option<usize>,
) -> usize {
    let detected = source.header.dimensions_detected_count.filter(|n| *n > 0).unwrap_or(1);
    let base = detected.max(coords.len()).max(dims_def.len()).max(override_count.unwrap_or(0));
    coords
        .iter()
        .filter_map(|c| c.dims_def.as_ref().map(Vec::len))
        .fold(base, usize::max)
}

/// `base`, or `base0`, `base1`, ... when taken (always suffixed when `from_zero`).
fn gen_name(base: &str, taken: &mut HashSet<String>, from_zero: bool) -> String {
    let name = if from_zero || taken.contains(base) {
        let mut i = 0;
        while taken.contains(&format!("{base}{i}")) {
            i += 1;
        }
        format!("{base}{i}")
    } else {
        base.to_string()
    };
    taken.insert(name.clone());
    name
}
