use crate::branch::BranchParameters;
use crate::error::{CapsuleError, ParamError};
use crate::field::{apply_map_entry, field, fields_to_map, read_fields, write_fields, FieldDescriptor};
use crate::lod::{LevelOfDetailParameters, ReductionType};
use crate::parameters::{check_version, Parameters};
use crate::savable::{read_records, write_records, InputCapsule, OutputCapsule, Savable};
use crate::value::{MapValue, ParamMap, VERSION_KEY};

pub const BRANCHES_KEY: &str = "branches";
pub const ROOTS_KEY: &str = "roots";
pub const LODS_KEY: &str = "lodLevels";

pub const DEFAULT_DEPTH: usize = 4;
pub const DEFAULT_BASE_SCALE: f32 = 1.0;
pub const DEFAULT_TRUNK_RADIUS: f32 = 0.5 * 0.3;
pub const DEFAULT_TRUNK_HEIGHT: f32 = 6.0 * 0.3;
pub const DEFAULT_ROOT_HEIGHT: f32 = 1.0 * 0.3;
pub const DEFAULT_Y_OFFSET: f32 = 1.0 * 0.3;
pub const DEFAULT_FLEX_HEIGHT: f32 = 2.0;
pub const DEFAULT_TRUNK_FLEXIBILITY: f32 = 1.0;
pub const DEFAULT_BRANCH_FLEXIBILITY: f32 = 1.0;
pub const DEFAULT_U_REPEAT: i32 = 4;
pub const DEFAULT_V_SCALE: f32 = 0.45;
pub const DEFAULT_LEAF_SCALE: f32 = 1.0;
pub const DEFAULT_GENERATE_LEAVES: bool = false;
pub const DEFAULT_USE_WIND: bool = false;
pub const DEFAULT_SEED: i32 = 0;

/// Branch levels past this index start disabled.
const MAX_DEFAULT_BRANCH_LEVEL: usize = 3;

/// Complete description of one tree: per-depth branch and root styles, LOD
/// bands ordered by distance, and whole-tree settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeParameters {
    branches: Vec<BranchParameters>,
    roots: Vec<BranchParameters>,
    lod_levels: Vec<LevelOfDetailParameters>,

    pub base_scale: f32,
    pub trunk_radius: f32,
    pub trunk_height: f32,
    pub root_height: f32,
    pub y_offset: f32,
    pub flex_height: f32,
    pub trunk_flexibility: f32,
    pub branch_flexibility: f32,
    pub texture_u_repeat: i32,
    pub texture_v_scale: f32,
    pub leaf_scale: f32,
    pub generate_leaves: bool,
    pub use_wind: bool,
    /// Input for the generator's deterministic randomization.
    pub seed: i32,
}

// Map keys are the editor-facing property names; capsule tags are the older
// field names. Both are part of the persisted format.
static TREE_FIELDS: [FieldDescriptor<TreeParameters>; 14] = [
    field!("baseScale", "baseScale", base_scale: f32 = DEFAULT_BASE_SCALE),
    field!("trunkRadius", "trunkRadius", trunk_radius: f32 = DEFAULT_TRUNK_RADIUS),
    field!("trunkHeight", "trunkHeight", trunk_height: f32 = DEFAULT_TRUNK_HEIGHT),
    field!("rootHeight", "rootHeight", root_height: f32 = DEFAULT_ROOT_HEIGHT),
    field!("YOffset", "yOffset", y_offset: f32 = DEFAULT_Y_OFFSET),
    field!("flexHeight", "flexHeight", flex_height: f32 = DEFAULT_FLEX_HEIGHT),
    field!("trunkFlexibility", "trunkFlexibility", trunk_flexibility: f32 = DEFAULT_TRUNK_FLEXIBILITY),
    field!("branchFlexibility", "branchFlexibility", branch_flexibility: f32 = DEFAULT_BRANCH_FLEXIBILITY),
    field!("textureURepeat", "uRepeat", texture_u_repeat: i32 = DEFAULT_U_REPEAT),
    field!("textureVScale", "vScale", texture_v_scale: f32 = DEFAULT_V_SCALE),
    field!("leafScale", "leafScale", leaf_scale: f32 = DEFAULT_LEAF_SCALE),
    field!("generateLeaves", "generateLeaves", generate_leaves: bool = DEFAULT_GENERATE_LEAVES),
    field!("useWind", "useWind", use_wind: bool = DEFAULT_USE_WIND),
    field!("seed", "seed", seed: i32 = DEFAULT_SEED),
];

impl Default for TreeParameters {
    fn default() -> Self {
        Self::with_depth(DEFAULT_DEPTH)
    }
}

impl TreeParameters {
    /// Build the stock layout with `depth` branch and root levels.
    pub fn with_depth(depth: usize) -> Self {
        let mut branches: Vec<BranchParameters> = (0..depth)
            .map(|level| BranchParameters {
                enabled: level <= MAX_DEFAULT_BRANCH_LEVEL,
                ..BranchParameters::default()
            })
            .collect();
        if let Some(trunk) = branches.first_mut() {
            trunk.inherit = false;
        }

        let mut roots: Vec<BranchParameters> = (0..depth).map(|_| BranchParameters::disabled()).collect();
        if let Some(root) = roots.get_mut(0) {
            root.enabled = true;
            root.inherit = false;
            root.length_segments = 1;
            root.segment_variation = 0.0;
            root.taper = 1.0;
            root.side_joint_count = 5;
            root.inclination = 0.5;
            root.length_scale = 1.1;
        }
        if let Some(root) = roots.get_mut(1) {
            root.enabled = true;
            root.inherit = false;
            root.taper = 0.5;
            root.gravity = 0.1;
            root.length_scale = 1.0;
        }
        if let Some(root) = roots.get_mut(2) {
            root.enabled = true;
        }

        let full_depth = i32::try_from(depth).unwrap_or(i32::MAX);
        let lod_levels = vec![
            LevelOfDetailParameters::new(20.0, ReductionType::Normal, full_depth, full_depth, i32::MAX),
            LevelOfDetailParameters::new(40.0, ReductionType::FlatPoly, 2, 2, 4),
            LevelOfDetailParameters::new(60.0, ReductionType::FlatPoly, 2, 2, 3),
            LevelOfDetailParameters::new(f32::MAX, ReductionType::FlatPoly, 2, 2, 3),
        ];

        Self {
            branches,
            roots,
            lod_levels,
            base_scale: DEFAULT_BASE_SCALE,
            trunk_radius: DEFAULT_TRUNK_RADIUS,
            trunk_height: DEFAULT_TRUNK_HEIGHT,
            root_height: DEFAULT_ROOT_HEIGHT,
            y_offset: DEFAULT_Y_OFFSET,
            flex_height: DEFAULT_FLEX_HEIGHT,
            trunk_flexibility: DEFAULT_TRUNK_FLEXIBILITY,
            branch_flexibility: DEFAULT_BRANCH_FLEXIBILITY,
            texture_u_repeat: DEFAULT_U_REPEAT,
            texture_v_scale: DEFAULT_V_SCALE,
            leaf_scale: DEFAULT_LEAF_SCALE,
            generate_leaves: DEFAULT_GENERATE_LEAVES,
            use_wind: DEFAULT_USE_WIND,
            seed: DEFAULT_SEED,
        }
    }

    /// Number of branch levels.
    pub fn depth(&self) -> usize {
        self.branches.len()
    }

    pub fn branch(&self, index: usize) -> Option<&BranchParameters> {
        self.branches.get(index)
    }

    pub fn branch_mut(&mut self, index: usize) -> Option<&mut BranchParameters> {
        self.branches.get_mut(index)
    }

    pub fn branches(&self) -> &[BranchParameters] {
        &self.branches
    }

    pub fn root(&self, index: usize) -> Option<&BranchParameters> {
        self.roots.get(index)
    }

    pub fn root_mut(&mut self, index: usize) -> Option<&mut BranchParameters> {
        self.roots.get_mut(index)
    }

    pub fn roots(&self) -> &[BranchParameters] {
        &self.roots
    }

    pub fn lod(&self, index: usize) -> Option<&LevelOfDetailParameters> {
        self.lod_levels.get(index)
    }

    pub fn lod_mut(&mut self, index: usize) -> Option<&mut LevelOfDetailParameters> {
        self.lod_levels.get_mut(index)
    }

    pub fn lod_levels(&self) -> &[LevelOfDetailParameters] {
        &self.lod_levels
    }

    pub fn lod_count(&self) -> usize {
        self.lod_levels.len()
    }

    // ── Effective sequences ─────────────────────────────────────

    pub fn iter_effective_branches(&self) -> Effective<'_> {
        Effective::new(&self.branches)
    }

    pub fn iter_effective_roots(&self) -> Effective<'_> {
        Effective::new(&self.roots)
    }

    /// The enabled branch prefix with inheriting levels replaced by their anchor.
    pub fn effective_branches(&self) -> Vec<&BranchParameters> {
        self.iter_effective_branches().collect()
    }

    pub fn effective_roots(&self) -> Vec<&BranchParameters> {
        self.iter_effective_roots().collect()
    }

    // ── Structural editing ──────────────────────────────────────
    //
    // `index = None` appends. Elements are identified by position: look a
    // borrowed element up with `index_of_*`, then pass that index to
    // `remove_*`, which hands back the element that sat there.

    pub fn add_branch(&mut self, item: BranchParameters, index: Option<usize>) -> Result<usize, ParamError> {
        insert_at(&mut self.branches, item, index)
    }

    /// Remove the branch at `index` (as found by [`Self::index_of_branch`]).
    pub fn remove_branch(&mut self, index: usize) -> Result<BranchParameters, ParamError> {
        remove_at(&mut self.branches, index)
    }

    pub fn index_of_branch(&self, item: &BranchParameters) -> Option<usize> {
        position_of(&self.branches, item)
    }

    pub fn add_root(&mut self, item: BranchParameters, index: Option<usize>) -> Result<usize, ParamError> {
        insert_at(&mut self.roots, item, index)
    }

    /// Remove the root at `index` (as found by [`Self::index_of_root`]).
    pub fn remove_root(&mut self, index: usize) -> Result<BranchParameters, ParamError> {
        remove_at(&mut self.roots, index)
    }

    pub fn index_of_root(&self, item: &BranchParameters) -> Option<usize> {
        position_of(&self.roots, item)
    }

    pub fn add_lod_level(
        &mut self,
        item: LevelOfDetailParameters,
        index: Option<usize>,
    ) -> Result<usize, ParamError> {
        insert_at(&mut self.lod_levels, item, index)
    }

    /// Remove the band at `index` (as found by [`Self::index_of_lod_level`]).
    pub fn remove_lod_level(&mut self, index: usize) -> Result<LevelOfDetailParameters, ParamError> {
        remove_at(&mut self.lod_levels, index)
    }

    pub fn index_of_lod_level(&self, item: &LevelOfDetailParameters) -> Option<usize> {
        position_of(&self.lod_levels, item)
    }
}

fn insert_at<T>(items: &mut Vec<T>, item: T, index: Option<usize>) -> Result<usize, ParamError> {
    let len = items.len();
    let index = index.unwrap_or(len);
    if index > len {
        return Err(ParamError::IndexOutOfRange { index, len });
    }
    items.insert(index, item);
    Ok(index)
}

fn remove_at<T>(items: &mut Vec<T>, index: usize) -> Result<T, ParamError> {
    if index >= items.len() {
        return Err(ParamError::NotFound {
            index,
            len: items.len(),
        });
    }
    Ok(items.remove(index))
}

fn position_of<T>(items: &[T], item: &T) -> Option<usize> {
    items.iter().position(|candidate| std::ptr::eq(candidate, item))
}

/// Replace `items` with one record per map in `value`, resizing first.
///
/// Existing records keep their position, new slots start from the record
/// default, and every slot is then updated from its map.
fn list_from_map<T: Parameters>(items: &mut Vec<T>, key: &str, value: &MapValue) -> Result<(), ParamError> {
    let MapValue::List(maps) = value else {
        return Err(ParamError::TypeMismatch {
            key: key.to_string(),
            expected: "list",
            found: value.type_name(),
        });
    };
    if items.len() != maps.len() {
        log::debug!("resizing '{}' from {} to {} entries", key, items.len(), maps.len());
        items.resize_with(maps.len(), T::default);
    }
    for (item, map) in items.iter_mut().zip(maps) {
        item.from_map(map)?;
    }
    Ok(())
}

fn list_to_map<T: Parameters>(items: &[T]) -> MapValue {
    MapValue::List(items.iter().map(|item| item.to_map()).collect())
}

impl Parameters for TreeParameters {
    const NAME: &'static str = "TreeParameters";

    fn fields() -> &'static [FieldDescriptor<Self>] {
        &TREE_FIELDS
    }

    fn to_map(&self) -> ParamMap {
        let mut map = fields_to_map(self, Self::fields(), Self::FORMAT_VERSION);
        map.insert(BRANCHES_KEY.to_string(), list_to_map(&self.branches));
        map.insert(ROOTS_KEY.to_string(), list_to_map(&self.roots));
        map.insert(LODS_KEY.to_string(), list_to_map(&self.lod_levels));
        map
    }

    fn from_map(&mut self, map: &ParamMap) -> Result<(), ParamError> {
        check_version(Self::NAME, Self::FORMAT_VERSION, map);
        let mut next = self.clone();
        for (key, value) in map {
            match key.as_str() {
                VERSION_KEY => {}
                BRANCHES_KEY => list_from_map(&mut next.branches, key, value)?,
                ROOTS_KEY => list_from_map(&mut next.roots, key, value)?,
                LODS_KEY => list_from_map(&mut next.lod_levels, key, value)?,
                _ => apply_map_entry(&mut next, Self::fields(), Self::NAME, key, value)?,
            }
        }
        *self = next;
        Ok(())
    }
}

impl Savable for TreeParameters {
    fn class_tag(&self) -> &'static str {
        Self::NAME
    }

    fn write(&self, out: &mut dyn OutputCapsule) -> Result<(), CapsuleError> {
        write_records(out, BRANCHES_KEY, &self.branches)?;
        write_records(out, ROOTS_KEY, &self.roots)?;
        write_records(out, LODS_KEY, &self.lod_levels)?;
        write_fields(self, Self::fields(), out);
        Ok(())
    }

    /// On error `self` is left unchanged.
    fn read(&mut self, input: &dyn InputCapsule) -> Result<(), CapsuleError> {
        let mut next = self.clone();
        next.branches = read_records(input, BRANCHES_KEY)?;
        next.roots = read_records(input, ROOTS_KEY)?;
        next.lod_levels = read_records(input, LODS_KEY)?;
        read_fields(&mut next, Self::fields(), input)?;
        *self = next;
        Ok(())
    }
}

/// Iterator over an effective branch or root sequence.
///
/// Stops at the first disabled level. Inheriting levels yield the most
/// recent non-inheriting level; the first level anchors the chain whatever
/// its flag.
#[derive(Debug, Clone)]
pub struct Effective<'a> {
    levels: &'a [BranchParameters],
    next: usize,
    last: Option<&'a BranchParameters>,
}

impl<'a> Effective<'a> {
    fn new(levels: &'a [BranchParameters]) -> Self {
        Self {
            levels,
            next: 0,
            last: None,
        }
    }
}

impl<'a> Iterator for Effective<'a> {
    type Item = &'a BranchParameters;

    fn next(&mut self) -> Option<Self::Item> {
        let level = self.levels.get(self.next).filter(|level| level.enabled)?;
        self.next += 1;
        match self.last {
            Some(last) if level.inherit => Some(last),
            _ => {
                self.last = Some(level);
                Some(level)
            }
        }
    }
}

impl<'a> IntoIterator for &'a TreeParameters {
    type Item = &'a BranchParameters;
    type IntoIter = Effective<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_effective_branches()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(enabled: bool, inherit: bool, taper: f32) -> BranchParameters {
        BranchParameters {
            enabled,
            inherit,
            taper,
            ..BranchParameters::default()
        }
    }

    #[test]
    fn test_default_layout() {
        let tree = TreeParameters::default();
        assert_eq!(tree.depth(), 4);
        assert!(tree.branches().iter().all(|b| b.enabled));
        assert!(!tree.branches()[0].inherit);
        assert_eq!(tree.roots().iter().filter(|r| r.enabled).count(), 3);
        assert!(!tree.roots()[3].enabled);

        let distances: Vec<f32> = tree.lod_levels().iter().map(|l| l.distance).collect();
        assert_eq!(distances, vec![20.0, 40.0, 60.0, f32::MAX]);
        let reductions: Vec<ReductionType> = tree.lod_levels().iter().map(|l| l.reduction).collect();
        assert_eq!(
            reductions,
            vec![
                ReductionType::Normal,
                ReductionType::FlatPoly,
                ReductionType::FlatPoly,
                ReductionType::FlatPoly
            ]
        );
        let caps: Vec<i32> = tree.lod_levels().iter().map(|l| l.max_radial_segments).collect();
        assert_eq!(caps, vec![i32::MAX, 4, 3, 3]);
        assert_eq!(tree.lod(0).unwrap().branch_depth, 4);
        assert_eq!(tree.lod(2).unwrap().root_depth, 2);
    }

    #[test]
    fn test_deep_layout_disables_extra_branches() {
        let tree = TreeParameters::with_depth(6);
        let enabled: Vec<bool> = tree.branches().iter().map(|b| b.enabled).collect();
        assert_eq!(enabled, vec![true, true, true, true, false, false]);
        assert_eq!(tree.effective_branches().len(), 4);
        assert_eq!(tree.lod(0).unwrap().branch_depth, 6);
    }

    #[test]
    fn test_shallow_layout_does_not_panic() {
        let tree = TreeParameters::with_depth(1);
        assert_eq!(tree.roots().len(), 1);
        assert_eq!(tree.effective_roots().len(), 1);
        assert!(TreeParameters::with_depth(0).effective_branches().is_empty());
    }

    #[test]
    fn test_default_effective_roots() {
        let tree = TreeParameters::default();
        let effective = tree.effective_roots();
        assert_eq!(effective.len(), 3);
        assert!(std::ptr::eq(effective[0], &tree.roots()[0]));
        assert!(std::ptr::eq(effective[1], &tree.roots()[1]));
        assert!(std::ptr::eq(effective[2], &tree.roots()[1]));
    }

    #[test]
    fn test_effective_stops_at_first_disabled() {
        let mut tree = TreeParameters::with_depth(0);
        tree.add_branch(level(true, false, 0.1), None).unwrap();
        tree.add_branch(level(true, true, 0.2), None).unwrap();
        tree.add_branch(level(false, false, 0.3), None).unwrap();
        tree.add_branch(level(true, false, 0.4), None).unwrap();

        let effective = tree.effective_branches();
        assert_eq!(effective.len(), 2);
        assert!(std::ptr::eq(effective[0], &tree.branches()[0]));
        assert!(std::ptr::eq(effective[1], &tree.branches()[0]));
    }

    #[test]
    fn test_inherit_runs_collapse_to_nearest_anchor() {
        let mut tree = TreeParameters::with_depth(0);
        for (inherit, taper) in [(false, 0.1), (true, 0.2), (false, 0.3), (true, 0.4), (true, 0.5)] {
            tree.add_branch(level(true, inherit, taper), None).unwrap();
        }
        let mut tapers = Vec::new();
        for branch in &tree {
            tapers.push(branch.taper);
        }
        assert_eq!(tapers, vec![0.1, 0.1, 0.3, 0.3, 0.3]);
    }

    #[test]
    fn test_add_branch_shifts_following() {
        let mut tree = TreeParameters::default();
        let before: Vec<BranchParameters> = tree.branches().to_vec();
        let x = level(true, false, 9.0);

        assert_eq!(tree.add_branch(x.clone(), Some(2)), Ok(2));
        assert_eq!(tree.depth(), 5);
        assert_eq!(tree.branches()[2], x);
        assert_eq!(tree.branches()[3], before[2]);
        assert_eq!(tree.branches()[4], before[3]);

        let removed = tree.remove_branch(2).unwrap();
        assert_eq!(removed, x);
        assert_eq!(tree.branches(), &before[..]);
    }

    #[test]
    fn test_remove_by_looked_up_index_returns_original_position() {
        let mut tree = TreeParameters::default();
        let x = level(true, false, 9.0);
        tree.add_branch(x.clone(), Some(2)).unwrap();

        let index = tree.index_of_branch(&tree.branches()[2]).unwrap();
        assert_eq!(index, 2);
        assert_eq!(tree.remove_branch(index), Ok(x));

        let last = tree.lod_count() - 1;
        let index = tree.index_of_lod_level(&tree.lod_levels()[last]).unwrap();
        assert_eq!(index, last);
        assert_eq!(tree.remove_lod_level(index).unwrap().distance, f32::MAX);
    }

    #[test]
    fn test_add_out_of_range_changes_nothing() {
        let mut tree = TreeParameters::default();
        let err = tree.add_root(BranchParameters::default(), Some(9)).unwrap_err();
        assert_eq!(err, ParamError::IndexOutOfRange { index: 9, len: 4 });
        assert_eq!(tree.roots().len(), 4);
    }

    #[test]
    fn test_remove_missing_reports_not_found() {
        let mut tree = TreeParameters::default();
        let before = tree.clone();
        assert_eq!(tree.remove_lod_level(4), Err(ParamError::NotFound { index: 4, len: 4 }));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_index_of_uses_identity() {
        let tree = TreeParameters::default();
        let third = &tree.branches()[2];
        assert_eq!(tree.index_of_branch(third), Some(2));

        // Equal by value, but not one of ours.
        let copy = tree.branches()[2].clone();
        assert_eq!(tree.index_of_branch(&copy), None);
        assert_eq!(tree.index_of_lod_level(&tree.lod_levels()[3]), Some(3));
        assert_eq!(tree.index_of_root(&tree.roots()[0]), Some(0));
    }

    #[test]
    fn test_map_keys() {
        let map = TreeParameters::default().to_map();
        for key in ["YOffset", "textureURepeat", "textureVScale", "useWind", "seed", BRANCHES_KEY, LODS_KEY] {
            assert!(map.contains_key(key), "missing key {key}");
        }
        assert!(!map.contains_key("uRepeat"));
        assert!(!map.contains_key("depth"));
    }

    #[test]
    fn test_map_roundtrip() {
        let mut tree = TreeParameters::with_depth(6);
        tree.base_scale = 2.3;
        tree.y_offset = -0.25;
        tree.texture_u_repeat = 7;
        tree.use_wind = true;
        tree.seed = 1234;
        tree.branch_mut(1).unwrap().twist = 0.33;
        tree.lod_mut(2).unwrap().reduction = ReductionType::Impostor;

        let mut loaded = TreeParameters::default();
        loaded.from_map(&tree.to_map()).unwrap();
        assert_eq!(loaded, tree);
    }

    #[test]
    fn test_from_map_resizes_lists() {
        let mut source = TreeParameters::default();
        source.add_lod_level(LevelOfDetailParameters::new(500.0, ReductionType::Impostor, 1, 1, 3), None).unwrap();
        source.remove_root(3).unwrap();
        source.remove_root(2).unwrap();

        let mut target = TreeParameters::default();
        target.from_map(&source.to_map()).unwrap();
        assert_eq!(target.lod_count(), 5);
        assert_eq!(target.lod(4).unwrap().reduction, ReductionType::Impostor);
        assert_eq!(target.roots().len(), 2);
    }

    #[test]
    fn test_from_map_rejects_non_list() {
        let mut map = ParamMap::new();
        map.insert(BRANCHES_KEY.to_string(), MapValue::Int(3));
        let err = TreeParameters::default().from_map(&map).unwrap_err();
        assert!(matches!(err, ParamError::TypeMismatch { expected: "list", .. }));
    }

    #[test]
    fn test_from_map_unknown_key() {
        let mut map = ParamMap::new();
        map.insert("depth".to_string(), MapValue::Int(3));
        let err = TreeParameters::default().from_map(&map).unwrap_err();
        assert_eq!(
            err,
            ParamError::UnknownField {
                record: "TreeParameters",
                key: "depth".to_string()
            }
        );
    }

    #[test]
    fn test_nested_error_leaves_tree_untouched() {
        let mut map = TreeParameters::with_depth(2).to_map();
        if let Some(MapValue::List(branches)) = map.get_mut(BRANCHES_KEY) {
            branches[1].insert("bogus".to_string(), MapValue::Bool(true));
        }
        let mut tree = TreeParameters::default();
        assert!(tree.from_map(&map).is_err());
        assert_eq!(tree, TreeParameters::default());
    }
}
