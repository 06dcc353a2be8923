//! Keyed accumulation of normalized restraint rows.
//!
//! One frame per `(subtype, constraint type, potential type, rdc code,
//! orientation id)` key; list ids advance per subtype as frames are
//! created lazily and are reclaimed when an error path left a frame empty.
use crate::types::RestraintSubtype;
use serde::Serialize;
use std::collections::BTreeMap;

/// Save-frame key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SfKey {
    pub subtype: RestraintSubtype,
    pub constraint_type: Option<String>,
    pub potential_type: Option<String>,
    pub rdc_code: Option<String>,
    pub orientation_id: Option<i32>,
}

impl SfKey {
    pub fn new(subtype: RestraintSubtype) -> Self {
        SfKey {
            subtype,
            constraint_type: None,
            potential_type: None,
            rdc_code: None,
            orientation_id: None,
        }
    }

    pub fn with_constraint_type(mut self, constraint_type: &str) -> Self {
        self.constraint_type = Some(constraint_type.to_string());
        self
    }

    pub fn with_potential_type(mut self, potential_type: &str) -> Self {
        self.potential_type = Some(potential_type.to_string());
        self
    }

    pub fn with_rdc_code(mut self, rdc_code: &str, orientation_id: i32) -> Self {
        self.rdc_code = Some(rdc_code.to_string());
        self.orientation_id = Some(orientation_id);
        self
    }
}

/// One emitted restraint row: a monotone per-frame index plus named
/// columns in insertion order.
#[derive(Debug, Clone, Serialize)]
pub struct SfRow {
    pub index_id: i32,
    pub columns: Vec<(String, String)>,
}

/// Distance frames start `simple` and are promoted to `ambi` on first
/// evidence of ambiguity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConstraintSubsubtype {
    Simple,
    Ambi,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveFrame {
    pub key: SfKey,
    pub list_id: i32,
    pub sf_framecode: String,
    pub subsubtype: ConstraintSubsubtype,
    pub rows: Vec<SfRow>,
}

impl SaveFrame {
    pub fn add_row(&mut self, columns: Vec<(String, String)>) -> i32 {
        let index_id = self.rows.len() as i32 + 1;
        self.rows.push(SfRow { index_id, columns });
        index_id
    }

    pub fn promote_to_ambi(&mut self) {
        self.subsubtype = ConstraintSubsubtype::Ambi;
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct SaveFrameAccumulator {
    list_id_counter: BTreeMap<RestraintSubtype, i32>,
    frames: Vec<SaveFrame>,
}

impl SaveFrameAccumulator {
    pub fn new() -> Self {
        SaveFrameAccumulator::default()
    }

    /// The frame for a key, created lazily; creation bumps the subtype's
    /// list-id counter.
    pub fn get_sf(&mut self, key: &SfKey) -> &mut SaveFrame {
        if let Some(pos) = self.frames.iter().position(|f| &f.key == key) {
            return &mut self.frames[pos];
        }
        let counter = self.list_id_counter.entry(key.subtype).or_insert(0);
        *counter += 1;
        let list_id = *counter;
        let sf_framecode = format!("{}_restraint_list_{}", key.subtype, list_id);
        let idx = self.frames.len();
        self.frames.push(SaveFrame {
            key: key.clone(),
            list_id,
            sf_framecode,
            subsubtype: ConstraintSubsubtype::Simple,
            rows: Vec::new(),
        });
        &mut self.frames[idx]
    }

    /// Drop empty frames. A list id is reclaimed only when the trimmed
    /// frame holds the subtype's current top id, and at most once per
    /// subtype; ids below a retained frame stay spent.
    pub fn trim_empty(&mut self) {
        let mut trimmed_top: BTreeMap<RestraintSubtype, i32> = BTreeMap::new();
        self.frames.retain(|f| {
            if f.is_empty() {
                let top = trimmed_top.entry(f.key.subtype).or_insert(f.list_id);
                *top = (*top).max(f.list_id);
                false
            } else {
                true
            }
        });
        for (subtype, top) in trimmed_top {
            if let Some(counter) = self.list_id_counter.get_mut(&subtype) {
                if *counter == top {
                    *counter -= 1;
                }
            }
        }
    }

    pub fn frames(&self) -> &[SaveFrame] {
        &self.frames
    }

    pub fn list_id_counter(&self) -> &BTreeMap<RestraintSubtype, i32> {
        &self.list_id_counter
    }

    /// Non-zero content counts per subtype.
    pub fn content_subtype(&self) -> BTreeMap<RestraintSubtype, usize> {
        let mut counts = BTreeMap::new();
        for frame in &self.frames {
            if !frame.is_empty() {
                *counts.entry(frame.key.subtype).or_insert(0) += 1;
            }
        }
        counts
    }

    /// `(list-id counters, frames grouped by key)`.
    pub fn sf_dict(&self) -> (BTreeMap<RestraintSubtype, i32>, BTreeMap<SfKey, Vec<&SaveFrame>>) {
        let mut grouped: BTreeMap<SfKey, Vec<&SaveFrame>> = BTreeMap::new();
        for frame in &self.frames {
            grouped.entry(frame.key.clone()).or_default().push(frame);
        }
        (self.list_id_counter.clone(), grouped)
    }

    pub fn total_rows(&self) -> usize {
        self.frames.iter().map(|f| f.rows.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_creation_and_counters() {
        let mut acc = SaveFrameAccumulator::new();
        let key = SfKey::new(RestraintSubtype::Dist).with_constraint_type("NOE");
        let frame = acc.get_sf(&key);
        assert_eq!(frame.list_id, 1);
        frame.add_row(vec![("target_value".into(), "4.0".into())]);

        let key2 = SfKey::new(RestraintSubtype::Dist).with_constraint_type("hydrogen bond");
        assert_eq!(acc.get_sf(&key2).list_id, 2);

        // same key returns the same frame, no counter bump
        assert_eq!(acc.get_sf(&key).list_id, 1);
        assert_eq!(acc.list_id_counter()[&RestraintSubtype::Dist], 2);
    }

    #[test]
    fn test_trim_reclaims_list_id() {
        let mut acc = SaveFrameAccumulator::new();
        let key = SfKey::new(RestraintSubtype::Dist);
        acc.get_sf(&key).add_row(vec![("k".into(), "v".into())]);
        let empty_key = SfKey::new(RestraintSubtype::Dist).with_constraint_type("NOE");
        acc.get_sf(&empty_key);
        assert_eq!(acc.list_id_counter()[&RestraintSubtype::Dist], 2);

        acc.trim_empty();
        assert_eq!(acc.frames().len(), 1);
        assert_eq!(acc.list_id_counter()[&RestraintSubtype::Dist], 1);
    }

    #[test]
    fn test_trim_keeps_counter_above_live_frame() {
        let mut acc = SaveFrameAccumulator::new();
        // the empty frame takes list id 1, the row-bearing frame takes 2
        let empty_key = SfKey::new(RestraintSubtype::Dist).with_constraint_type("NOE");
        acc.get_sf(&empty_key);
        let key = SfKey::new(RestraintSubtype::Dist);
        acc.get_sf(&key).add_row(vec![("k".into(), "v".into())]);

        acc.trim_empty();
        assert_eq!(acc.frames().len(), 1);
        assert_eq!(acc.frames()[0].list_id, 2);
        // id 1 is spent below a live frame and cannot be reclaimed
        assert_eq!(acc.list_id_counter()[&RestraintSubtype::Dist], 2);
    }

    #[test]
    fn test_index_ids_monotone() {
        let mut acc = SaveFrameAccumulator::new();
        let key = SfKey::new(RestraintSubtype::Dihed);
        let frame = acc.get_sf(&key);
        assert_eq!(frame.add_row(vec![]), 1);
        assert_eq!(frame.add_row(vec![]), 2);
        assert_eq!(frame.add_row(vec![]), 3);
        assert_eq!(acc.total_rows(), 3);
    }

    #[test]
    fn test_subsubtype_promotion() {
        let mut acc = SaveFrameAccumulator::new();
        let key = SfKey::new(RestraintSubtype::Dist);
        let frame = acc.get_sf(&key);
        assert_eq!(frame.subsubtype, ConstraintSubsubtype::Simple);
        frame.promote_to_ambi();
        assert_eq!(frame.subsubtype, ConstraintSubsubtype::Ambi);
    }
}
